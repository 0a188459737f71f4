// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Errors surfaced to HTTP clients.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum AppError {
    #[error("not found")]
    NotFound,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound => (StatusCode::NOT_FOUND, "Not Found".to_string()),
        };

        let body = Json(json!({"code": status.as_u16(), "message": message}));

        (status, body).into_response()
    }
}

/// Startup configuration problems. Never retried.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("invalid option {0}: {1}")]
    Invalid(&'static str, String),
    #[error("unable to read template {0}: {1}")]
    Template(String, String),
    #[error("stream source unavailable: {0}")]
    SourceUnavailable(String),
}

/// Failures talking to the key release service or turning its answer into a key.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum KeyError {
    #[error("key service request failed: {0}")]
    Transport(String),
    #[error("key service returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("key service returned an empty body")]
    MissingBody,
    #[error("malformed key release response: {0}")]
    MalformedResponse(String),
    #[error("malformed JWK field {0}: {1}")]
    MalformedField(&'static str, String),
    #[error("invalid RSA key: {0}")]
    InvalidKey(String),
}

impl KeyError {
    /// Transport failures and error statuses may clear up; a bad key will not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Status { .. })
    }
}

impl From<reqwest::Error> for KeyError {
    fn from(source: reqwest::Error) -> Self {
        KeyError::Transport(source.to_string())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DecryptError {
    #[error("unable to base64 decode message: {0}")]
    Base64(String),
    #[error("unable to decrypt message: {0}")]
    Rsa(String),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum StreamError {
    #[error("timed out waiting for the stream")]
    Timeout,
    #[error("consumer group rebalance in progress: {0}")]
    Rebalance(String),
    #[error("transient stream error: {0}")]
    Transient(String),
    #[error("stream closed")]
    Closed,
    #[error("fatal stream error: {0}")]
    Fatal(String),
}

impl StreamError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::Rebalance(_) | Self::Transient(_)
        )
    }
}

impl From<std::io::Error> for StreamError {
    fn from(source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::Interrupted | std::io::ErrorKind::WouldBlock => {
                StreamError::Transient(source.to_string())
            }
            std::io::ErrorKind::TimedOut => StreamError::Timeout,
            _ => StreamError::Fatal(source.to_string()),
        }
    }
}

/// Outcome of a [`crate::retry::retry`] loop that never succeeded.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum RetryError<E: std::fmt::Display> {
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },
    #[error("non-retryable error after {attempts} attempts: {last}")]
    Aborted { attempts: u32, last: E },
}

impl<E: std::fmt::Display> RetryError<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } | Self::Aborted { attempts, .. } => *attempts,
        }
    }

    pub fn into_last(self) -> E {
        match self {
            Self::Exhausted { last, .. } | Self::Aborted { last, .. } => last,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn test_app_error_response_body() {
        let response = AppError::NotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], 404);
        assert_eq!(json["message"], "Not Found");
    }

    #[test]
    fn test_key_error_retry_classification() {
        assert!(KeyError::Transport("refused".into()).is_retryable());
        assert!(
            KeyError::Status {
                status: 503,
                body: String::new()
            }
            .is_retryable()
        );
        assert!(!KeyError::MissingBody.is_retryable());
        assert!(!KeyError::MalformedField("n", "bad".into()).is_retryable());
        assert!(!KeyError::InvalidKey("bad".into()).is_retryable());
    }

    #[test]
    fn test_stream_error_transient_classification() {
        assert!(StreamError::Timeout.is_transient());
        assert!(StreamError::Rebalance("gen 3".into()).is_transient());
        assert!(!StreamError::Closed.is_transient());
        assert!(!StreamError::Fatal("auth".into()).is_transient());
    }

    #[test]
    fn test_io_error_maps_to_stream_error() {
        let timeout = std::io::Error::new(std::io::ErrorKind::TimedOut, "slow");
        assert_eq!(StreamError::from(timeout), StreamError::Timeout);

        let broken = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        assert!(matches!(StreamError::from(broken), StreamError::Fatal(_)));
    }

    #[test]
    fn test_retry_error_accessors() {
        let err: RetryError<KeyError> = RetryError::Exhausted {
            attempts: 5,
            last: KeyError::MissingBody,
        };
        assert_eq!(err.attempts(), 5);
        assert_eq!(err.into_last(), KeyError::MissingBody);
    }
}
