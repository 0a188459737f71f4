// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! One-shot shutdown signal shared by every long-running loop.
//!
//! Either an OS signal or an internal condition (message limit reached, stream
//! closed or failed) may trigger it. Only the first trigger counts; its reason
//! is kept and later triggers are ignored.

use std::fmt;
use std::sync::OnceLock;

use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Signal(&'static str),
    MessageLimit(u64),
    SourceClosed,
    StreamFailure,
}

impl ShutdownReason {
    /// Process exit code for this reason.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::StreamFailure => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal(name) => write!(f, "received {name}"),
            Self::MessageLimit(count) => write!(f, "finished receiving {count} messages"),
            Self::SourceClosed => f.write_str("stream source closed"),
            Self::StreamFailure => f.write_str("stream source failed"),
        }
    }
}

#[derive(Debug, Default)]
pub struct Shutdown {
    token: CancellationToken,
    reason: OnceLock<ShutdownReason>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the signal. Returns `true` only for the call that actually fired it.
    pub fn trigger(&self, reason: ShutdownReason) -> bool {
        if self.reason.set(reason).is_err() {
            tracing::debug!("[consumer] shutdown already in progress, ignoring {}", reason);
            return false;
        }
        tracing::info!("[consumer] shutting down: {}", reason);
        self.token.cancel();
        true
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn reason(&self) -> Option<ShutdownReason> {
        self.reason.get().copied()
    }

    /// Resolves once the signal has fired, immediately if it already has.
    pub async fn triggered(&self) -> ShutdownReason {
        self.token.cancelled().await;
        // the reason is stored before the token is cancelled
        self.reason().unwrap_or(ShutdownReason::StreamFailure)
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

/// Waits for SIGINT or SIGTERM, then triggers `shutdown`.
pub async fn listen_for_signals(shutdown: &Shutdown) {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %error, "[consumer] failed to install Ctrl+C handler");
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
                tracing::warn!(error = %error, "[consumer] failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let name = tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
        // nothing left to listen for once something else has fired
        _ = shutdown.token.cancelled() => return,
    };

    shutdown.trigger(ShutdownReason::Signal(name));
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_first_trigger_wins() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.is_triggered());
        assert_eq!(shutdown.reason(), None);

        assert!(shutdown.trigger(ShutdownReason::Signal("SIGTERM")));
        assert!(!shutdown.trigger(ShutdownReason::MessageLimit(100)));

        assert!(shutdown.is_triggered());
        assert_eq!(shutdown.reason(), Some(ShutdownReason::Signal("SIGTERM")));
    }

    #[tokio::test]
    async fn test_concurrent_triggers_fire_once() {
        let shutdown = Arc::new(Shutdown::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let shutdown = shutdown.clone();
                tokio::spawn(async move { shutdown.trigger(ShutdownReason::MessageLimit(i)) })
            })
            .collect();

        let mut fired = 0;
        for handle in handles {
            if handle.await.unwrap() {
                fired += 1;
            }
        }
        assert_eq!(fired, 1);
    }

    #[tokio::test]
    async fn test_triggered_wakes_all_waiters() {
        let shutdown = Arc::new(Shutdown::new());
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let shutdown = shutdown.clone();
                tokio::spawn(async move { shutdown.triggered().await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(10)).await;
        shutdown.trigger(ShutdownReason::MessageLimit(3));

        for waiter in waiters {
            assert_eq!(waiter.await.unwrap(), ShutdownReason::MessageLimit(3));
        }
    }

    #[tokio::test]
    async fn test_triggered_resolves_immediately_after_fire() {
        let shutdown = Shutdown::new();
        shutdown.trigger(ShutdownReason::SourceClosed);
        assert_eq!(shutdown.triggered().await, ShutdownReason::SourceClosed);
    }

    #[tokio::test]
    async fn test_signal_listener_returns_when_already_triggered() {
        let shutdown = Shutdown::new();
        shutdown.trigger(ShutdownReason::MessageLimit(1));
        tokio::time::timeout(Duration::from_secs(1), listen_for_signals(&shutdown))
            .await
            .unwrap();
        assert_eq!(shutdown.reason(), Some(ShutdownReason::MessageLimit(1)));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ShutdownReason::Signal("SIGINT").exit_code(), 0);
        assert_eq!(ShutdownReason::MessageLimit(10).exit_code(), 0);
        assert_eq!(ShutdownReason::SourceClosed.exit_code(), 0);
        assert_eq!(ShutdownReason::StreamFailure.exit_code(), 1);
    }
}
