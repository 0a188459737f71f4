// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Shared consumer state.
//!
//! Each field has a single writer: the key provider sets [`ConsumerState::set_key_available`],
//! the stream consumer owns the processed counter and the lifecycle phase. Every
//! other component only reads. Readers that look before the first write simply
//! see the defaults (no key, zero records, [`Phase::Starting`]).

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::watch;

/// Lifecycle of the stream consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Starting,
    Ready,
    Consuming,
    Draining,
    Stopped,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Consuming => "consuming",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

pub struct ConsumerState {
    key_available: AtomicBool,
    processed: AtomicU64,
    phase: watch::Sender<Phase>,
}

impl Default for ConsumerState {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsumerState {
    pub fn new() -> Self {
        let (phase, _) = watch::channel(Phase::Starting);
        Self {
            key_available: AtomicBool::new(false),
            processed: AtomicU64::new(0),
            phase,
        }
    }

    pub fn key_available(&self) -> bool {
        self.key_available.load(Ordering::Acquire)
    }

    pub fn set_key_available(&self) {
        self.key_available.store(true, Ordering::Release);
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Bumps the processed counter and returns the new total.
    pub fn record_processed(&self) -> u64 {
        self.processed.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Moves to `phase`, returning true if that changed anything.
    pub fn set_phase(&self, phase: Phase) -> bool {
        self.phase.send_if_modified(|current| {
            if *current == phase {
                return false;
            }
            tracing::debug!("[consumer] phase {} -> {}", current, phase);
            *current = phase;
            true
        })
    }

    /// Resolves once the consumer has left [`Phase::Starting`].
    pub async fn wait_ready(&self) -> Phase {
        let mut rx = self.phase.subscribe();
        match rx.wait_for(|phase| *phase != Phase::Starting).await {
            Ok(phase) => *phase,
            // the sender lives in `self`, so it cannot be dropped while we borrow it
            Err(_) => Phase::Stopped,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_defaults_before_first_write() {
        let state = ConsumerState::new();
        assert!(!state.key_available());
        assert_eq!(state.processed(), 0);
        assert_eq!(state.phase(), Phase::Starting);
    }

    #[test]
    fn test_processed_counter_is_monotonic() {
        let state = ConsumerState::new();
        assert_eq!(state.record_processed(), 1);
        assert_eq!(state.record_processed(), 2);
        assert_eq!(state.processed(), 2);
    }

    #[test]
    fn test_set_phase_reports_changes() {
        let state = ConsumerState::new();
        assert!(state.set_phase(Phase::Ready));
        assert!(!state.set_phase(Phase::Ready));
        assert!(state.set_phase(Phase::Consuming));
        assert_eq!(state.phase(), Phase::Consuming);
    }

    #[tokio::test]
    async fn test_wait_ready_resolves_after_transition() {
        let state = Arc::new(ConsumerState::new());
        let waiter = {
            let state = state.clone();
            tokio::spawn(async move { state.wait_ready().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        state.set_phase(Phase::Ready);
        assert_eq!(waiter.await.unwrap(), Phase::Ready);
    }

    #[tokio::test]
    async fn test_wait_ready_returns_immediately_when_already_past_starting() {
        let state = ConsumerState::new();
        state.set_phase(Phase::Stopped);
        assert_eq!(state.wait_ready().await, Phase::Stopped);
    }

    #[test]
    fn test_phase_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(Phase::Draining).unwrap(),
            serde_json::json!("draining")
        );
    }
}
