// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Single-slot hand-off between the stream consumer and HTTP handlers.
//!
//! The slot holds at most one unread value. Publishing never waits: a new value
//! replaces whatever is still unread, so a viewer sees the freshest message and
//! never a backlog. Each receiver waits on its own deadline and every published
//! value is delivered to at most one receiver. Losing values is expected.

use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

// Deadline used when `now + timeout` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

pub struct RelayBuffer<T> {
    slot: Mutex<Option<T>>,
    notify: Notify,
}

impl<T> Default for RelayBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RelayBuffer<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            notify: Notify::new(),
        }
    }

    /// Stores `value` without waiting. Returns `false` when it displaced an
    /// unread value, `true` when the slot was empty.
    pub fn try_publish(&self, value: T) -> bool {
        let displaced = {
            let mut slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            slot.replace(value)
        };
        self.notify.notify_waiters();
        displaced.is_none()
    }

    /// Takes the pending value, if any, without waiting.
    pub fn try_take(&self) -> Option<T> {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    pub fn is_empty(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_none()
    }

    /// Waits up to `timeout` for a value. `None` means the deadline passed first.
    pub async fn receive(&self, timeout: Duration) -> Option<T> {
        let now = Instant::now();
        let deadline = now
            .checked_add(timeout)
            .unwrap_or_else(|| now + FAR_FUTURE);
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // register before checking the slot so a publish in between is not missed
            notified.as_mut().enable();

            if let Some(value) = self.try_take() {
                return Some(value);
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                // one last look: a value may have landed right at the deadline
                return self.try_take();
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_publish_into_empty_slot() {
        let relay = RelayBuffer::new();
        assert!(relay.is_empty());
        assert!(relay.try_publish("first"));
        assert!(!relay.is_empty());
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let relay = RelayBuffer::new();
        assert!(relay.try_publish("first"));
        assert!(!relay.try_publish("second"));

        assert_eq!(relay.receive(Duration::from_millis(10)).await, Some("second"));
        // the first value was dropped, not queued
        assert_eq!(relay.try_take(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_receive_times_out_at_deadline() {
        let relay: RelayBuffer<String> = RelayBuffer::new();
        let start = Instant::now();

        assert_eq!(relay.receive(Duration::from_secs(10)).await, None);

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(10));
        assert!(elapsed < Duration::from_secs(10) + Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_receive_with_huge_timeout_does_not_overflow() {
        let relay = RelayBuffer::new();
        relay.try_publish("hi");
        assert_eq!(relay.receive(Duration::from_secs(u64::MAX)).await, Some("hi"));
    }

    #[tokio::test]
    async fn test_receive_with_max_timeout_wakes_on_publish() {
        let relay = Arc::new(RelayBuffer::new());
        let receiver = {
            let relay = relay.clone();
            tokio::spawn(async move { relay.receive(Duration::MAX).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        relay.try_publish(42u32);

        assert_eq!(receiver.await.unwrap(), Some(42));
    }

    #[tokio::test]
    async fn test_receive_wakes_on_publish() {
        let relay = Arc::new(RelayBuffer::new());
        let receiver = {
            let relay = relay.clone();
            tokio::spawn(async move { relay.receive(Duration::from_secs(5)).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        relay.try_publish("hello".to_string());

        assert_eq!(receiver.await.unwrap(), Some("hello".to_string()));
        assert!(relay.is_empty());
    }

    #[tokio::test]
    async fn test_value_goes_to_exactly_one_receiver() {
        let relay = Arc::new(RelayBuffer::new());
        let receivers: Vec<_> = (0..3)
            .map(|_| {
                let relay = relay.clone();
                tokio::spawn(async move { relay.receive(Duration::from_millis(200)).await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(20)).await;
        relay.try_publish(7u32);

        let mut delivered = 0;
        for receiver in receivers {
            if let Some(value) = receiver.await.unwrap() {
                assert_eq!(value, 7);
                delivered += 1;
            }
        }
        assert_eq!(delivered, 1);
    }

    #[tokio::test]
    async fn test_publish_never_blocks_without_receivers() {
        let relay = RelayBuffer::new();
        for i in 0..1000 {
            relay.try_publish(i);
        }
        assert_eq!(relay.try_take(), Some(999));
    }
}
