// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Kafka [`StreamSource`] backed by `rdkafka`.
//!
//! Offsets start at the newest message for a fresh consumer group. A handled
//! record's offset is stored on [`StreamSource::commit`] and flushed by the
//! client's periodic auto-commit, so only acknowledged records are committed.

use std::time::Duration;

use chrono::DateTime;
use rdkafka::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::message::{BorrowedMessage, Headers, Message};

use crate::errors::StreamError;
use crate::stream::{StreamRecord, StreamSource};

pub struct KafkaSource {
    consumer: Option<StreamConsumer>,
    topic: String,
}

impl KafkaSource {
    pub fn new(brokers: &str, group_id: &str, topic: &str) -> Result<Self, StreamError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group_id)
            .set("auto.offset.reset", "latest")
            .set("enable.auto.commit", "true")
            .set("enable.auto.offset.store", "false")
            .set("enable.partition.eof", "false")
            .create()
            .map_err(|err| StreamError::Fatal(err.to_string()))?;

        tracing::info!(
            "[consumer] kafka consumer created for {} (group {}) at {}",
            topic,
            group_id,
            brokers
        );

        Ok(Self {
            consumer: Some(consumer),
            topic: topic.to_string(),
        })
    }

    fn consumer(&self) -> Result<&StreamConsumer, StreamError> {
        self.consumer.as_ref().ok_or(StreamError::Closed)
    }
}

fn to_record(message: &BorrowedMessage<'_>) -> StreamRecord {
    let mut record = StreamRecord::new(message.payload().unwrap_or_default());
    record.topic = message.topic().to_string();
    record.partition = message.partition();
    record.offset = message.offset();
    record.timestamp = message
        .timestamp()
        .to_millis()
        .and_then(DateTime::from_timestamp_millis);

    if let Some(headers) = message.headers() {
        for header in headers.iter() {
            if let Some(value) = header.value {
                record
                    .annotations
                    .insert(header.key.to_string(), String::from_utf8_lossy(value).into_owned());
            }
        }
    }
    record
}

fn classify(err: KafkaError) -> StreamError {
    match err.rdkafka_error_code() {
        Some(RDKafkaErrorCode::RebalanceInProgress)
        | Some(RDKafkaErrorCode::IllegalGeneration)
        | Some(RDKafkaErrorCode::UnknownMemberId) => StreamError::Rebalance(err.to_string()),
        Some(RDKafkaErrorCode::OperationTimedOut) | Some(RDKafkaErrorCode::RequestTimedOut) => {
            StreamError::Timeout
        }
        Some(RDKafkaErrorCode::Fatal)
        | Some(RDKafkaErrorCode::Destroy)
        | Some(RDKafkaErrorCode::SaslAuthenticationFailed)
        | Some(RDKafkaErrorCode::TopicAuthorizationFailed)
        | Some(RDKafkaErrorCode::GroupAuthorizationFailed) => StreamError::Fatal(err.to_string()),
        _ => StreamError::Transient(err.to_string()),
    }
}

impl StreamSource for KafkaSource {
    async fn subscribe(&mut self) -> Result<(), StreamError> {
        self.consumer()?
            .subscribe(&[self.topic.as_str()])
            .map_err(|err| StreamError::Fatal(err.to_string()))?;
        tracing::info!("[consumer] subscribed to {}", self.topic);
        Ok(())
    }

    async fn poll(&mut self, timeout: Duration) -> Result<Option<StreamRecord>, StreamError> {
        let consumer = self.consumer()?;
        match tokio::time::timeout(timeout, consumer.recv()).await {
            Err(_) => Ok(None),
            Ok(Ok(message)) => Ok(Some(to_record(&message))),
            Ok(Err(err)) => Err(classify(err)),
        }
    }

    fn commit(&mut self, record: &StreamRecord) -> Result<(), StreamError> {
        self.consumer()?
            .store_offset(&record.topic, record.partition, record.offset)
            .map_err(classify)
    }

    async fn close(&mut self) {
        if let Some(consumer) = self.consumer.take() {
            consumer.unsubscribe();
            tracing::info!("[consumer] kafka consumer closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rebalance_is_transient() {
        let err = classify(KafkaError::MessageConsumption(
            RDKafkaErrorCode::RebalanceInProgress,
        ));
        assert!(matches!(err, StreamError::Rebalance(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn test_timeout_is_transient() {
        let err = classify(KafkaError::MessageConsumption(
            RDKafkaErrorCode::OperationTimedOut,
        ));
        assert_eq!(err, StreamError::Timeout);
    }

    #[test]
    fn test_destroyed_handle_is_fatal() {
        let err = classify(KafkaError::MessageConsumption(RDKafkaErrorCode::Destroy));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_broker_transport_failure_is_transient() {
        let err = classify(KafkaError::MessageConsumption(
            RDKafkaErrorCode::BrokerTransportFailure,
        ));
        assert!(err.is_transient());
    }
}
