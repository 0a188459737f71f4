// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use axum::serve::Serve;
use tokio::net::TcpListener;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::configuration::ConsumerOptions;
use crate::relay::RelayBuffer;
use crate::routes;
use crate::state::ConsumerState;
use crate::template::PageTemplate;

pub struct AppState {
    pub state: Arc<ConsumerState>,
    pub relay: Arc<RelayBuffer<String>>,
    pub template: Arc<PageTemplate>,
    pub status_timeout: Duration,
    pub web_dir: PathBuf,
}

pub struct Application {
    port: u16,
    server: Serve<TcpListener, Router, Router>,
}

impl Application {
    pub async fn build(
        options: &ConsumerOptions,
        state: Arc<ConsumerState>,
        relay: Arc<RelayBuffer<String>>,
        template: Arc<PageTemplate>,
    ) -> Result<Self, std::io::Error> {
        let address = format!("{}:{}", options.host, options.port);
        let listener = TcpListener::bind(address).await?;

        let app_state = AppState {
            state,
            relay,
            template,
            status_timeout: options.status_timeout(),
            web_dir: options.web_dir.clone(),
        };
        let server = axum::serve(listener, create_router(app_state));
        let port = server.local_addr()?.port();

        tracing::info!("[consumer] listening at http://{}:{}", options.host, port);

        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

/// Builds the router. Exposed so tests can drive it without binding a socket.
pub fn create_router(app_state: AppState) -> Router {
    let web = ServeDir::new(&app_state.web_dir);
    let favicon = ServeFile::new(app_state.web_dir.join("favicon.ico"));

    Router::new()
        .route("/", get(routes::index))
        .route("/api/message", get(routes::api_message))
        .route("/health", get(routes::health))
        .nest_service("/web", web)
        .route_service("/favicon.ico", favicon)
        .fallback(routes::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(app_state))
}
