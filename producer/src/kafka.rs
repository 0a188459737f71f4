// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Kafka [`StreamSink`] backed by an `rdkafka` `FutureProducer`. The source tag
//! travels as a `source` header.

use std::time::Duration;

use rdkafka::ClientConfig;
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;

use crate::errors::ProducerError;
use crate::sink::{OutboundRecord, StreamSink};

const SOURCE_HEADER: &str = "source";
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

pub struct KafkaSink {
    producer: FutureProducer,
    topic: String,
}

impl KafkaSink {
    pub fn new(brokers: &str, topic: &str) -> Result<Self, ProducerError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", DELIVERY_TIMEOUT.as_millis().to_string())
            .create()
            .map_err(|err| ProducerError::SinkUnavailable(err.to_string()))?;

        tracing::info!("[producer] kafka producer created for {} at {}", topic, brokers);

        Ok(Self {
            producer,
            topic: topic.to_string(),
        })
    }
}

fn headers(record: &OutboundRecord) -> OwnedHeaders {
    let headers = OwnedHeaders::new();
    match &record.source_tag {
        Some(tag) => headers.insert(Header {
            key: SOURCE_HEADER,
            value: Some(tag.as_str()),
        }),
        None => headers,
    }
}

impl StreamSink for KafkaSink {
    async fn send(&mut self, record: &OutboundRecord) -> Result<(), ProducerError> {
        let outgoing = FutureRecord::<(), _>::to(&self.topic)
            .payload(record.payload.as_str())
            .headers(headers(record));

        self.producer
            .send(outgoing, Timeout::After(DELIVERY_TIMEOUT))
            .await
            .map(|_| ())
            .map_err(|(err, _)| ProducerError::Send(err.to_string()))
    }

    async fn flush(&mut self) -> Result<(), ProducerError> {
        self.producer
            .flush(Timeout::After(DELIVERY_TIMEOUT))
            .map_err(|err| ProducerError::Send(err.to_string()))
    }
}
