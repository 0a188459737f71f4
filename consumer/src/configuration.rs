// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};

use crate::constants::{DEFAULT_STATUS_TIMEOUT, HTTP_PORT};
use crate::errors::ConfigError;
use crate::models::KeyReleaseRequest;
use crate::retry::BackoffPolicy;
use crate::stream::ConsumerSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    Kafka,
    Stdin,
}

/// Kafka when the `kafka` feature is compiled in, stdin otherwise.
pub const DEFAULT_SOURCE: SourceKind = if cfg!(feature = "kafka") {
    SourceKind::Kafka
} else {
    SourceKind::Stdin
};

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct ConsumerOptions {
    #[arg(long, default_value = "0.0.0.0", env("CONSUMER_HTTP_HOST"))]
    pub host: String,
    #[arg(long, default_value = "3333", env("CONSUMER_HTTP_PORT"))]
    pub port: u16,

    /// Message source; defaults to kafka only in builds with the `kafka` feature
    #[arg(long, value_enum, default_value_t = DEFAULT_SOURCE, env("STREAM_SOURCE"))]
    pub source: SourceKind,
    #[arg(long, default_value = "my-topic", env("TOPIC"))]
    pub topic: String,
    #[arg(long, default_value = "my-cluster-kafka-bootstrap:9092", env("BROKERS"))]
    pub brokers: String,
    #[arg(long, default_value = "strimzikafkaconsumergroupid", env("CONSUMERGROUP"))]
    pub consumer_group: String,
    #[arg(long, env("SOURCE_FILTER"))]
    pub source_filter: Option<String>,
    #[arg(long, env("MAX_MESSAGES"))]
    pub max_messages: Option<u64>,
    #[arg(long, default_value = "1000", env("POLL_TIMEOUT_MS"))]
    pub poll_timeout_ms: u64,

    #[arg(long, env("LOG_FILE"))]
    pub log_file: Option<PathBuf>,

    #[arg(long, default_value = "http://localhost:8080", env("SKR_ENDPOINT"))]
    pub skr_endpoint: String,
    #[arg(long, default_value = "", env("SkrClientMAAEndpoint"))]
    pub maa_endpoint: String,
    #[arg(long, default_value = "", env("SkrClientAKVEndpoint"))]
    pub akv_endpoint: String,
    #[arg(long, default_value = "", env("SkrClientKID"))]
    pub kid: String,
    #[arg(long, default_value = "false", env("SKIP_KEY_RELEASE"), action = ArgAction::SetTrue)]
    pub skip_key_release: bool,
    #[arg(long, default_value = "false", env("REQUIRE_KEY"), action = ArgAction::SetTrue)]
    pub require_key: bool,
    #[arg(long, default_value = "false", env("PROBE_KEY_SERVICE"), action = ArgAction::SetTrue)]
    pub probe_key_service: bool,
    #[arg(long, default_value = "5", env("RETRY_ATTEMPTS"))]
    pub retry_attempts: u32,
    #[arg(long, default_value = "1000", env("RETRY_INITIAL_MS"))]
    pub retry_initial_ms: u64,
    #[arg(long, default_value = "30000", env("RETRY_MAX_MS"))]
    pub retry_max_ms: u64,

    #[arg(long, default_value = "10", env("STATUS_TIMEOUT_SECS"))]
    pub status_timeout_secs: u64,
    #[arg(long, env("TEMPLATE_PATH"))]
    pub template: Option<PathBuf>,
    #[arg(long, default_value = "/web", env("WEB_DIR"))]
    pub web_dir: PathBuf,
}

impl Default for ConsumerOptions {
    fn default() -> Self {
        ConsumerOptions {
            host: "127.0.0.1".to_string(),
            port: HTTP_PORT,
            source: SourceKind::Stdin,
            topic: "my-topic".to_string(),
            brokers: "my-cluster-kafka-bootstrap:9092".to_string(),
            consumer_group: "strimzikafkaconsumergroupid".to_string(),
            source_filter: None,
            max_messages: None,
            poll_timeout_ms: 1000,
            log_file: None,
            skr_endpoint: "http://localhost:8080".to_string(),
            maa_endpoint: String::new(),
            akv_endpoint: String::new(),
            kid: String::new(),
            skip_key_release: true,
            require_key: false,
            probe_key_service: false,
            retry_attempts: 5,
            retry_initial_ms: 1000,
            retry_max_ms: 30000,
            status_timeout_secs: DEFAULT_STATUS_TIMEOUT.as_secs(),
            template: None,
            web_dir: PathBuf::from("/web"),
        }
    }
}

impl ConsumerOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry-attempts",
                "must be at least 1".to_string(),
            ));
        }
        if self.retry_initial_ms > self.retry_max_ms {
            return Err(ConfigError::Invalid(
                "retry-initial-ms",
                format!("must not exceed retry-max-ms ({})", self.retry_max_ms),
            ));
        }
        if self.status_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "status-timeout-secs",
                "must be positive".to_string(),
            ));
        }
        if self.poll_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll-timeout-ms",
                "must be positive".to_string(),
            ));
        }
        if self.max_messages == Some(0) {
            return Err(ConfigError::Invalid(
                "max-messages",
                "must be positive when set".to_string(),
            ));
        }
        if self.source == SourceKind::Kafka {
            if self.topic.trim().is_empty() {
                return Err(ConfigError::Invalid("topic", "must not be empty".to_string()));
            }
            if self.brokers.trim().is_empty() {
                return Err(ConfigError::Invalid("brokers", "must not be empty".to_string()));
            }
        }
        Ok(())
    }

    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            self.retry_attempts,
            Duration::from_millis(self.retry_initial_ms),
            Duration::from_millis(self.retry_max_ms),
        )
    }

    pub fn key_release_request(&self) -> KeyReleaseRequest {
        KeyReleaseRequest {
            maa_endpoint: self.maa_endpoint.clone(),
            akv_endpoint: self.akv_endpoint.clone(),
            kid: self.kid.clone(),
        }
    }

    pub fn consumer_settings(&self) -> ConsumerSettings {
        ConsumerSettings {
            source_filter: self.source_filter.clone().filter(|tag| !tag.is_empty()),
            max_messages: self.max_messages,
            poll_timeout: Duration::from_millis(self.poll_timeout_ms),
        }
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_secs(self.status_timeout_secs)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_command_line() {
        let options = ConsumerOptions::try_parse_from(["skr-consumer"]).unwrap();
        assert_eq!(options.port, 3333);
        assert_eq!(options.source, DEFAULT_SOURCE);
        assert_eq!(options.topic, "my-topic");
        assert_eq!(options.skr_endpoint, "http://localhost:8080");
        assert!(!options.skip_key_release);
        assert_eq!(options.backoff_policy(), BackoffPolicy::default());
        assert_eq!(options.status_timeout(), Duration::from_secs(10));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_default_source_matches_build() {
        #[cfg(feature = "kafka")]
        assert_eq!(DEFAULT_SOURCE, SourceKind::Kafka);
        #[cfg(not(feature = "kafka"))]
        assert_eq!(DEFAULT_SOURCE, SourceKind::Stdin);

        let options = ConsumerOptions::try_parse_from(["skr-consumer"]).unwrap();
        assert_eq!(options.source, DEFAULT_SOURCE);
    }

    #[test]
    fn test_flags_override_defaults() {
        let options = ConsumerOptions::try_parse_from([
            "skr-consumer",
            "--source",
            "stdin",
            "--source-filter",
            "demo",
            "--max-messages",
            "100",
            "--skip-key-release",
            "--kid",
            "key-1",
        ])
        .unwrap();
        assert_eq!(options.source, SourceKind::Stdin);
        assert!(options.skip_key_release);
        assert_eq!(options.key_release_request().kid, "key-1");

        let settings = options.consumer_settings();
        assert_eq!(settings.source_filter.as_deref(), Some("demo"));
        assert_eq!(settings.max_messages, Some(100));
    }

    #[test]
    fn test_empty_source_filter_means_no_filter() {
        let options = ConsumerOptions {
            source_filter: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(options.consumer_settings().source_filter, None);
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let options = ConsumerOptions {
            retry_attempts: 0,
            ..Default::default()
        };
        assert!(matches!(
            options.validate(),
            Err(ConfigError::Invalid("retry-attempts", _))
        ));
    }

    #[test]
    fn test_validate_rejects_inverted_backoff() {
        let options = ConsumerOptions {
            retry_initial_ms: 60_000,
            ..Default::default()
        };
        assert!(matches!(
            options.validate(),
            Err(ConfigError::Invalid("retry-initial-ms", _))
        ));
    }

    #[test]
    fn test_validate_rejects_empty_kafka_topic() {
        let options = ConsumerOptions {
            source: SourceKind::Kafka,
            topic: " ".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            options.validate(),
            Err(ConfigError::Invalid("topic", _))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_message_limit() {
        let options = ConsumerOptions {
            max_messages: Some(0),
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }
}
