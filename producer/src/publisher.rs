// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Periodic demo publisher.
//!
//! Every interval one demo message is built, encrypted once, and sent `batch`
//! times. Encryption and send failures are logged and the loop carries on with
//! the next interval.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::crypto::PublicKey;
use crate::message::demo_message;
use crate::sink::{OutboundRecord, StreamSink};

#[derive(Debug, Clone)]
pub struct PublisherSettings {
    pub msg: String,
    pub source_tag: Option<String>,
    pub interval: Duration,
    pub batch: usize,
    pub count: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishSummary {
    pub batches: u64,
    pub sent: u64,
    pub failed: u64,
}

/// Publishes until `token` is cancelled or `settings.count` batches went out.
#[tracing::instrument(skip_all, fields(batch = settings.batch, interval = ?settings.interval))]
pub async fn run<S: StreamSink>(
    settings: &PublisherSettings,
    key: &PublicKey,
    sink: &mut S,
    token: CancellationToken,
) -> PublishSummary {
    let mut summary = PublishSummary::default();
    let mut ticker = tokio::time::interval(settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        if settings.count.is_some_and(|count| summary.batches >= count) {
            tracing::info!("[producer] sent {} batches, stopping", summary.batches);
            break;
        }

        tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::info!("[producer] shutdown requested");
                break;
            }
            _ = ticker.tick() => {}
        }

        publish_batch(settings, key, sink, &mut summary).await;
        summary.batches += 1;
    }

    if let Err(err) = sink.flush().await {
        tracing::warn!("[producer] final flush failed: {}", err);
    }
    summary
}

async fn publish_batch<S: StreamSink>(
    settings: &PublisherSettings,
    key: &PublicKey,
    sink: &mut S,
    summary: &mut PublishSummary,
) {
    let message = demo_message(&settings.msg);
    let payload = match key.encrypt(message.as_bytes()) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::error!("[producer] encrypting message failed: {}", err);
            summary.failed += settings.batch as u64;
            return;
        }
    };

    let record = OutboundRecord {
        payload,
        source_tag: settings.source_tag.clone(),
    };
    for _ in 0..settings.batch {
        match sink.send(&record).await {
            Ok(()) => summary.sent += 1,
            Err(err) => {
                tracing::error!("[producer] error sending event: {}", err);
                summary.failed += 1;
            }
        }
    }
    if let Err(err) = sink.flush().await {
        tracing::warn!("[producer] flush failed: {}", err);
    }
    tracing::info!("[producer] sent batch of {} events", settings.batch);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::errors::ProducerError;
    use rsa::pkcs8::{EncodePublicKey, LineEnding};
    use rsa::{RsaPrivateKey, RsaPublicKey};
    use std::sync::OnceLock;

    fn public_key() -> PublicKey {
        static PEM: OnceLock<String> = OnceLock::new();
        let pem = PEM.get_or_init(|| {
            let private = RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
            RsaPublicKey::from(&private)
                .to_public_key_pem(LineEnding::LF)
                .unwrap()
        });
        PublicKey::from_pem(pem).unwrap()
    }

    #[derive(Default)]
    struct RecordingSink {
        records: Vec<OutboundRecord>,
        fail_sends: bool,
    }

    impl StreamSink for RecordingSink {
        async fn send(&mut self, record: &OutboundRecord) -> Result<(), ProducerError> {
            if self.fail_sends {
                return Err(ProducerError::Send("broker down".into()));
            }
            self.records.push(record.clone());
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), ProducerError> {
            Ok(())
        }
    }

    fn settings(msg: &str, count: Option<u64>) -> PublisherSettings {
        PublisherSettings {
            msg: msg.to_string(),
            source_tag: Some("demo".to_string()),
            interval: Duration::from_secs(1),
            batch: 2,
            count,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_after_count_batches() {
        let mut sink = RecordingSink::default();
        let summary = run(
            &settings("hello", Some(3)),
            &public_key(),
            &mut sink,
            CancellationToken::new(),
        )
        .await;

        assert_eq!(
            summary,
            PublishSummary {
                batches: 3,
                sent: 6,
                failed: 0
            }
        );
        assert_eq!(sink.records.len(), 6);
        assert!(sink.records.iter().all(|r| r.source_tag.as_deref() == Some("demo")));
        // both records of a batch carry the same ciphertext
        assert_eq!(sink.records[0], sink.records[1]);
        assert_ne!(sink.records[1], sink.records[2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_the_loop() {
        let token = CancellationToken::new();
        token.cancel();

        let mut sink = RecordingSink::default();
        let summary = run(&settings("hello", None), &public_key(), &mut sink, token).await;
        assert_eq!(summary, PublishSummary::default());
        assert!(sink.records.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_failures_do_not_stop_publishing() {
        let mut sink = RecordingSink {
            fail_sends: true,
            ..Default::default()
        };
        let summary = run(
            &settings("hello", Some(2)),
            &public_key(),
            &mut sink,
            CancellationToken::new(),
        )
        .await;
        assert_eq!(summary.batches, 2);
        assert_eq!(summary.failed, 4);
        assert_eq!(summary.sent, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_message_is_skipped() {
        let mut sink = RecordingSink::default();
        let summary = run(
            &settings(&"x".repeat(200), Some(1)),
            &public_key(),
            &mut sink,
            CancellationToken::new(),
        )
        .await;
        assert_eq!(summary.failed, 2);
        assert!(sink.records.is_empty());
    }
}
