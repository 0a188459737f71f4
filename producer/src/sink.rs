// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Destinations for produced records.
//!
//! [`WriterSink`] writes one record per line, prefixed with `source=<tag>` and a
//! tab when the record carries a tag. That is the format the consumer's
//! line source reads, so the two binaries can be piped together.

use std::future::Future;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::errors::ProducerError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRecord {
    pub payload: String,
    pub source_tag: Option<String>,
}

pub trait StreamSink: Send {
    fn send(
        &mut self,
        record: &OutboundRecord,
    ) -> impl Future<Output = Result<(), ProducerError>> + Send;

    fn flush(&mut self) -> impl Future<Output = Result<(), ProducerError>> + Send;
}

pub struct WriterSink<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl WriterSink<tokio::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

pub fn encode_line(record: &OutboundRecord) -> String {
    match &record.source_tag {
        Some(tag) => format!("source={}\t{}\n", tag, record.payload),
        None => format!("{}\n", record.payload),
    }
}

impl<W: AsyncWrite + Unpin + Send> StreamSink for WriterSink<W> {
    async fn send(&mut self, record: &OutboundRecord) -> Result<(), ProducerError> {
        self.writer
            .write_all(encode_line(record).as_bytes())
            .await
            .map_err(ProducerError::from)
    }

    async fn flush(&mut self) -> Result<(), ProducerError> {
        self.writer.flush().await.map_err(ProducerError::from)
    }
}
