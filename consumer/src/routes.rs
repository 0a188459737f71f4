// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! HTTP route handlers for the status exposer.
//!
//! | Method | Path | Handler | Description |
//! |--------|------|---------|-------------|
//! | GET | `/` | [`index`] | Status page with the latest relayed message |
//! | GET | `/api/message` | [`api_message`] | Same view as JSON |
//! | GET | `/health` | [`health`] | Liveness and consumer phase |
//! | * | anything else | [`not_found`] | `404` JSON error |
//!
//! Static assets under `/web` and `/favicon.ico` are served by
//! [`create_router`](crate::application::create_router).

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::Html;

use crate::application::AppState;
use crate::constants;
use crate::errors::AppError;
use crate::models::{HealthResponse, StatusView};

/// Waits up to the configured timeout for the next relayed message.
///
/// Every request waits on its own; concurrent requests compete for the same
/// relay slot and at most one of them receives a given message.
async fn next_view(state: &AppState) -> StatusView {
    let message = match state.relay.receive(state.status_timeout).await {
        Some(message) => message,
        None => {
            tracing::debug!(
                "[consumer] no message within {:?}, returning timeout notice",
                state.status_timeout
            );
            constants::TIMEOUT_MESSAGE.to_string()
        }
    };

    StatusView {
        encrypted: state.state.key_available(),
        message,
    }
}

/// Renders the status page.
#[tracing::instrument(skip(state))]
pub async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    let view = next_view(&state).await;
    Html(state.template.render(&view))
}

/// Returns the status view as JSON.
///
/// # Response
///
/// ```json
/// {"encrypted": true, "message": "Message Id 12345: hello"}
/// ```
#[tracing::instrument(skip(state))]
pub async fn api_message(State(state): State<Arc<AppState>>) -> Json<StatusView> {
    Json(next_view(&state).await)
}

/// Fallback for unknown paths.
pub async fn not_found() -> AppError {
    AppError::NotFound
}

/// Health check endpoint. Never waits on the relay.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        phase: state.state.phase(),
        processed: state.state.processed(),
        encrypted: state.state.key_available(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    use crate::relay::RelayBuffer;
    use crate::state::{ConsumerState, Phase};
    use crate::template::PageTemplate;

    fn app_state(timeout: Duration) -> Arc<AppState> {
        Arc::new(AppState {
            state: Arc::new(ConsumerState::new()),
            relay: Arc::new(RelayBuffer::new()),
            template: Arc::new(PageTemplate::parse("{{mode}}|{{message}}").unwrap()),
            status_timeout: timeout,
            web_dir: PathBuf::from("/nonexistent"),
        })
    }

    #[tokio::test]
    async fn test_health() {
        let state = app_state(Duration::from_millis(10));
        state.state.set_phase(Phase::Consuming);
        state.state.record_processed();

        let Json(body) = health(State(state)).await;
        assert_eq!(body.status, "ok");
        assert_eq!(body.phase, Phase::Consuming);
        assert_eq!(body.processed, 1);
        assert!(!body.encrypted);
    }

    #[tokio::test]
    async fn test_index_renders_relayed_message() {
        let state = app_state(Duration::from_secs(1));
        state.relay.try_publish("hello".to_string());

        let Html(body) = index(State(state)).await;
        assert_eq!(body, "Plaintext|hello");
    }

    #[tokio::test]
    async fn test_index_reports_decrypted_mode_when_key_loaded() {
        let state = app_state(Duration::from_secs(1));
        state.state.set_key_available();
        state.relay.try_publish("secret".to_string());

        let Html(body) = index(State(state)).await;
        assert_eq!(body, "Decrypted|secret");
    }

    #[tokio::test(start_paused = true)]
    async fn test_api_message_times_out() {
        let state = app_state(Duration::from_secs(10));

        let Json(view) = api_message(State(state)).await;
        assert!(!view.encrypted);
        assert_eq!(view.message, constants::TIMEOUT_MESSAGE);
    }
}
