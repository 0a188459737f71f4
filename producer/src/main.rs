// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::process::ExitCode;

use clap::Parser;
use skr_producer::configuration::{ProducerOptions, SinkKind};
use skr_producer::crypto::PublicKey;
use skr_producer::publisher::{self, PublishSummary};
use skr_producer::sink::{StreamSink, WriterSink};
use skr_producer::telemetry;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    let options = ProducerOptions::parse();
    telemetry::init(options.log_file.as_deref());

    match run(options).await {
        Ok(summary) => {
            tracing::info!(
                "[producer] done: {} batches, {} sent, {} failed",
                summary.batches,
                summary.sent,
                summary.failed
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!("[producer] {:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(options: ProducerOptions) -> anyhow::Result<PublishSummary> {
    options.validate()?;

    let key = PublicKey::load(options.pubkey.as_deref(), &options.pubkey_path)?;
    tracing::info!("[producer] loaded {}-bit RSA public key", key.bits());

    let token = CancellationToken::new();
    tokio::spawn({
        let token = token.clone();
        async move {
            let name = wait_for_signal().await;
            tracing::info!("[producer] received {}", name);
            token.cancel();
        }
    });

    match options.sink {
        SinkKind::Stdout => publish(&options, &key, WriterSink::stdout(), token).await,
        SinkKind::Kafka => publish_kafka(&options, &key, token).await,
    }
}

async fn publish<S: StreamSink>(
    options: &ProducerOptions,
    key: &PublicKey,
    mut sink: S,
    token: CancellationToken,
) -> anyhow::Result<PublishSummary> {
    Ok(publisher::run(&options.publisher_settings(), key, &mut sink, token).await)
}

#[cfg(feature = "kafka")]
async fn publish_kafka(
    options: &ProducerOptions,
    key: &PublicKey,
    token: CancellationToken,
) -> anyhow::Result<PublishSummary> {
    let sink = skr_producer::kafka::KafkaSink::new(&options.brokers, &options.topic)?;
    publish(options, key, sink, token).await
}

#[cfg(not(feature = "kafka"))]
async fn publish_kafka(
    _options: &ProducerOptions,
    _key: &PublicKey,
    _token: CancellationToken,
) -> anyhow::Result<PublishSummary> {
    Err(skr_producer::errors::ProducerError::SinkUnavailable(
        "kafka support was not compiled in, rebuild with --features kafka".to_string(),
    )
    .into())
}

async fn wait_for_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %error, "[producer] failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::warn!(error = %error, "[producer] failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}
