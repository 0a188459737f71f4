// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use skr_consumer::application::Application;
use skr_consumer::configuration::{ConsumerOptions, SourceKind};
use skr_consumer::constants::SHUTDOWN_GRACE;
use skr_consumer::crypto::KeyMaterial;
use skr_consumer::errors::ConfigError;
use skr_consumer::keys::{HttpKeyService, KeyProvider};
use skr_consumer::relay::RelayBuffer;
use skr_consumer::shutdown::{Shutdown, ShutdownReason, listen_for_signals};
use skr_consumer::state::ConsumerState;
use skr_consumer::stream::{LinesSource, StreamConsumer, StreamSource};
use skr_consumer::telemetry;
use skr_consumer::template::PageTemplate;

/// Everything the consumer task and the HTTP server share.
struct Runtime {
    options: ConsumerOptions,
    key: Option<Arc<KeyMaterial>>,
    state: Arc<ConsumerState>,
    relay: Arc<RelayBuffer<String>>,
    shutdown: Arc<Shutdown>,
    template: Arc<PageTemplate>,
}

#[tokio::main]
async fn main() -> ExitCode {
    println!("[consumer] init");

    // get configuration options from flags and environment variables
    let options = ConsumerOptions::parse();
    telemetry::init(options.log_file.as_deref());

    match run(options).await {
        Ok(reason) => {
            tracing::info!("[consumer] exiting: {}", reason);
            ExitCode::from(u8::try_from(reason.exit_code()).unwrap_or(1))
        }
        Err(err) => {
            tracing::error!("[consumer] startup failed: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(options: ConsumerOptions) -> anyhow::Result<ShutdownReason> {
    tracing::info!("[consumer] {:?}", &options);
    options.validate()?;

    let template = Arc::new(PageTemplate::from_option(options.template.as_deref())?);
    let state = Arc::new(ConsumerState::new());

    let key = if options.skip_key_release {
        tracing::warn!("[consumer] skipping key release, messages are shown as received");
        None
    } else {
        let service = HttpKeyService::new(options.skr_endpoint.clone())?;
        KeyProvider::new(
            service,
            options.key_release_request(),
            options.backoff_policy(),
        )
        .with_status_probe(options.probe_key_service)
        .acquire(&state)
        .await
    };
    if key.is_none() && options.require_key {
        anyhow::bail!("no decryption key available and require-key is set");
    }

    let runtime = Runtime {
        options,
        key,
        state,
        relay: Arc::new(RelayBuffer::new()),
        shutdown: Arc::new(Shutdown::new()),
        template,
    };

    match runtime.options.source {
        SourceKind::Stdin => serve(runtime, LinesSource::stdin()).await,
        SourceKind::Kafka => serve_kafka(runtime).await,
    }
}

#[cfg(feature = "kafka")]
async fn serve_kafka(runtime: Runtime) -> anyhow::Result<ShutdownReason> {
    let options = &runtime.options;
    let source = skr_consumer::kafka::KafkaSource::new(
        &options.brokers,
        &options.consumer_group,
        &options.topic,
    )
    .map_err(|err| ConfigError::SourceUnavailable(err.to_string()))?;
    serve(runtime, source).await
}

#[cfg(not(feature = "kafka"))]
async fn serve_kafka(_runtime: Runtime) -> anyhow::Result<ShutdownReason> {
    Err(ConfigError::SourceUnavailable(
        "kafka support was not compiled in, rebuild with --features kafka".to_string(),
    )
    .into())
}

async fn serve<S>(runtime: Runtime, source: S) -> anyhow::Result<ShutdownReason>
where
    S: StreamSource + 'static,
{
    let Runtime {
        options,
        key,
        state,
        relay,
        shutdown,
        template,
    } = runtime;

    let consumer = StreamConsumer::new(
        source,
        key,
        relay.clone(),
        state.clone(),
        shutdown.clone(),
        options.consumer_settings(),
    );
    let mut consumer_task = tokio::spawn(consumer.run());

    let ready = tokio::select! {
        phase = state.wait_ready() => {
            tracing::info!("[consumer] stream consumer is {}", phase);
            true
        }
        _ = shutdown.triggered() => false,
    };

    let server = if ready {
        let application = Application::build(&options, state.clone(), relay, template).await?;
        Some(tokio::spawn(async move {
            if let Err(err) = application.run_until_stopped().await {
                tracing::error!("[consumer] http server stopped: {}", err);
            }
        }))
    } else {
        None
    };

    let signals = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { listen_for_signals(&shutdown).await }
    });

    let reason = shutdown.triggered().await;

    match tokio::time::timeout(SHUTDOWN_GRACE, &mut consumer_task).await {
        Ok(Ok(Ok(exit))) => tracing::info!("[consumer] stream consumer finished: {:?}", exit),
        Ok(Ok(Err(_))) => {}
        Ok(Err(err)) => tracing::error!("[consumer] stream consumer task failed: {}", err),
        Err(_) => {
            tracing::warn!(
                "[consumer] stream consumer did not stop within {:?}, aborting",
                SHUTDOWN_GRACE
            );
            consumer_task.abort();
        }
    }

    if let Some(server) = server {
        server.abort();
    }
    signals.abort();

    Ok(reason)
}
