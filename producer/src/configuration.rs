// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::errors::ProducerError;
use crate::publisher::PublisherSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SinkKind {
    Kafka,
    Stdout,
}

/// Kafka when the `kafka` feature is compiled in, stdout otherwise.
pub const DEFAULT_SINK: SinkKind = if cfg!(feature = "kafka") {
    SinkKind::Kafka
} else {
    SinkKind::Stdout
};

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct ProducerOptions {
    /// Message sink; defaults to kafka only in builds with the `kafka` feature
    #[arg(long, value_enum, default_value_t = DEFAULT_SINK, env("STREAM_SINK"))]
    pub sink: SinkKind,
    #[arg(long, default_value = "my-topic", env("TOPIC"))]
    pub topic: String,
    #[arg(long, default_value = "my-cluster-kafka-bootstrap:9092", env("BROKERS"))]
    pub brokers: String,
    #[arg(long, env("MSG"))]
    pub msg: String,
    /// PEM encoded RSA public key; takes precedence over --pubkey-path
    #[arg(long, env("PUBKEY"), hide_env_values = true)]
    pub pubkey: Option<String>,
    #[arg(long, default_value = "public_key.pem", env("PUBKEY_PATH"))]
    pub pubkey_path: PathBuf,
    #[arg(long, env("SOURCE_TAG"))]
    pub source_tag: Option<String>,
    #[arg(long, default_value = "1000", env("INTERVAL_MS"))]
    pub interval_ms: u64,
    #[arg(long, default_value = "2", env("BATCH"))]
    pub batch: usize,
    #[arg(long, env("COUNT"))]
    pub count: Option<u64>,
    #[arg(long, env("LOG_FILE"))]
    pub log_file: Option<PathBuf>,
}

impl ProducerOptions {
    pub fn validate(&self) -> Result<(), ProducerError> {
        if self.msg.is_empty() {
            return Err(ProducerError::Invalid("msg", "must not be empty".to_string()));
        }
        if self.batch == 0 {
            return Err(ProducerError::Invalid("batch", "must be at least 1".to_string()));
        }
        if self.interval_ms == 0 {
            return Err(ProducerError::Invalid("interval-ms", "must be positive".to_string()));
        }
        if self.sink == SinkKind::Kafka && self.topic.trim().is_empty() {
            return Err(ProducerError::Invalid("topic", "must not be empty".to_string()));
        }
        if self
            .source_tag
            .as_deref()
            .is_some_and(|tag| tag.contains(['\t', '\n']))
        {
            return Err(ProducerError::Invalid(
                "source-tag",
                "must not contain tabs or newlines".to_string(),
            ));
        }
        Ok(())
    }

    pub fn publisher_settings(&self) -> PublisherSettings {
        PublisherSettings {
            msg: self.msg.clone(),
            source_tag: self.source_tag.clone().filter(|tag| !tag.is_empty()),
            interval: Duration::from_millis(self.interval_ms),
            batch: self.batch,
            count: self.count,
        }
    }
}
