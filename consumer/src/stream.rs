// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Stream sources and the consumer loop that drains them.
//!
//! # Consumer lifecycle
//!
//! ```text
//! Starting -> Ready -> Consuming <-> Draining -> Stopped
//! ```
//!
//! The loop subscribes, reports [`Phase::Ready`] once, and then handles records in
//! the order the source delivers them:
//!
//! 1. records whose `source` annotation differs from the configured filter are
//!    acknowledged and otherwise ignored
//! 2. the payload is decrypted (or passed through when no key is loaded)
//! 3. the text is offered to the [`RelayBuffer`] without waiting
//! 4. the record is acknowledged to the source
//!
//! An empty poll or a transient error moves the loop to [`Phase::Draining`]; the
//! next record brings it back to [`Phase::Consuming`]. The shutdown signal is
//! checked on every iteration and raced against every poll.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::constants::{SOURCE_ANNOTATION, STREAM_ERROR_PAUSE};
use crate::crypto::{Decrypted, KeyMaterial, decrypt};
use crate::errors::StreamError;
use crate::relay::RelayBuffer;
use crate::shutdown::{Shutdown, ShutdownReason};
use crate::state::{ConsumerState, Phase};

/// One record pulled from the stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamRecord {
    pub payload: Vec<u8>,
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub timestamp: Option<DateTime<Utc>>,
    pub annotations: BTreeMap<String, String>,
}

impl StreamRecord {
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            ..Default::default()
        }
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }

    pub fn source_tag(&self) -> Option<&str> {
        self.annotation(SOURCE_ANNOTATION)
    }
}

/// An ordered stream of records, such as a topic partition or a pipe.
///
/// `poll` returning `Ok(None)` means nothing arrived within the timeout.
pub trait StreamSource: Send {
    fn subscribe(&mut self) -> impl Future<Output = Result<(), StreamError>> + Send;

    fn poll(
        &mut self,
        timeout: Duration,
    ) -> impl Future<Output = Result<Option<StreamRecord>, StreamError>> + Send;

    /// Acknowledges a handled record so it is not delivered again.
    fn commit(&mut self, record: &StreamRecord) -> Result<(), StreamError>;

    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Reads one record per line, e.g. from stdin.
///
/// A line may start with `source=<tag>` followed by a tab, which becomes the
/// record's `source` annotation. Offsets are zero-based line numbers.
pub struct LinesSource<R> {
    reader: Option<R>,
    name: String,
    pending: Vec<u8>,
    next_offset: i64,
    committed: Option<i64>,
}

impl<R> LinesSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(reader: R, name: impl Into<String>) -> Self {
        Self {
            reader: Some(reader),
            name: name.into(),
            pending: Vec::new(),
            next_offset: 0,
            committed: None,
        }
    }

    pub fn committed(&self) -> Option<i64> {
        self.committed
    }

    fn take_record(&mut self) -> StreamRecord {
        let mut line = std::mem::take(&mut self.pending);
        while matches!(line.last(), Some(b'\n' | b'\r')) {
            line.pop();
        }

        let tagged = line
            .strip_prefix(b"source=")
            .and_then(|rest| {
                let tab = rest.iter().position(|byte| *byte == b'\t')?;
                Some((&rest[..tab], &rest[tab + 1..]))
            });
        let mut record = match tagged {
            Some((tag, payload)) => StreamRecord::new(payload)
                .with_annotation(SOURCE_ANNOTATION, String::from_utf8_lossy(tag)),
            None => StreamRecord::new(line.as_slice()),
        };
        record.topic = self.name.clone();
        record.offset = self.next_offset;
        record.timestamp = Some(Utc::now());
        self.next_offset += 1;
        record
    }
}

impl LinesSource<tokio::io::BufReader<tokio::io::Stdin>> {
    pub fn stdin() -> Self {
        Self::new(tokio::io::BufReader::new(tokio::io::stdin()), "stdin")
    }
}

impl<R> StreamSource for LinesSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn subscribe(&mut self) -> Result<(), StreamError> {
        if self.reader.is_none() {
            return Err(StreamError::Closed);
        }
        Ok(())
    }

    async fn poll(&mut self, timeout: Duration) -> Result<Option<StreamRecord>, StreamError> {
        let Some(reader) = self.reader.as_mut() else {
            return Err(StreamError::Closed);
        };

        // read_until keeps partial lines in `pending` if the wait is cut short
        let read = match tokio::time::timeout(timeout, reader.read_until(b'\n', &mut self.pending))
            .await
        {
            Err(_) => return Ok(None),
            Ok(read) => read?,
        };

        if read == 0 && self.pending.is_empty() {
            self.reader = None;
            return Err(StreamError::Closed);
        }
        Ok(Some(self.take_record()))
    }

    fn commit(&mut self, record: &StreamRecord) -> Result<(), StreamError> {
        self.committed = Some(record.offset);
        Ok(())
    }

    async fn close(&mut self) {
        self.reader = None;
    }
}

/// Settings for [`StreamConsumer`].
#[derive(Debug, Clone)]
pub struct ConsumerSettings {
    pub source_filter: Option<String>,
    pub max_messages: Option<u64>,
    pub poll_timeout: Duration,
}

impl Default for ConsumerSettings {
    fn default() -> Self {
        Self {
            source_filter: None,
            max_messages: None,
            poll_timeout: crate::constants::DEFAULT_POLL_TIMEOUT,
        }
    }
}

/// How a consumer run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerExit {
    /// The shutdown signal fired.
    Shutdown,
    /// The source reported it has no more records.
    SourceClosed,
}

pub struct StreamConsumer<S> {
    source: S,
    key: Option<Arc<KeyMaterial>>,
    relay: Arc<RelayBuffer<String>>,
    state: Arc<ConsumerState>,
    shutdown: Arc<Shutdown>,
    settings: ConsumerSettings,
}

impl<S: StreamSource> StreamConsumer<S> {
    pub fn new(
        source: S,
        key: Option<Arc<KeyMaterial>>,
        relay: Arc<RelayBuffer<String>>,
        state: Arc<ConsumerState>,
        shutdown: Arc<Shutdown>,
        settings: ConsumerSettings,
    ) -> Self {
        Self {
            source,
            key,
            relay,
            state,
            shutdown,
            settings,
        }
    }

    /// Runs until shutdown, the source closing, or a fatal stream error. The
    /// source is closed before returning in every case.
    #[tracing::instrument(skip(self), fields(filter = ?self.settings.source_filter))]
    pub async fn run(mut self) -> Result<ConsumerExit, StreamError> {
        let result = self.consume().await;

        self.source.close().await;
        self.state.set_phase(Phase::Stopped);

        match &result {
            Ok(ConsumerExit::SourceClosed) => {
                self.shutdown.trigger(ShutdownReason::SourceClosed);
            }
            Ok(ConsumerExit::Shutdown) => {}
            Err(err) => {
                tracing::error!("[consumer] stream consumer stopped: {}", err);
                self.shutdown.trigger(ShutdownReason::StreamFailure);
            }
        }
        tracing::info!(
            "[consumer] consumer closed after {} messages",
            self.state.processed()
        );
        result
    }

    async fn consume(&mut self) -> Result<ConsumerExit, StreamError> {
        let token = self.shutdown.token();
        tokio::select! {
            biased;
            _ = token.cancelled() => return Ok(ConsumerExit::Shutdown),
            subscribed = self.source.subscribe() => subscribed?,
        }

        self.state.set_phase(Phase::Ready);
        tracing::info!("[consumer] consumer up and running");

        loop {
            if self.shutdown.is_triggered() {
                return Ok(ConsumerExit::Shutdown);
            }

            let polled = tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(ConsumerExit::Shutdown),
                polled = self.source.poll(self.settings.poll_timeout) => polled,
            };

            match polled {
                Ok(Some(record)) => {
                    self.state.set_phase(Phase::Consuming);
                    self.handle(record);
                }
                Ok(None) => {
                    self.state.set_phase(Phase::Draining);
                }
                Err(StreamError::Closed) => {
                    tracing::info!("[consumer] message channel was closed");
                    return Ok(ConsumerExit::SourceClosed);
                }
                Err(err) if err.is_transient() => {
                    tracing::warn!("[consumer] {}, polling again", err);
                    self.state.set_phase(Phase::Draining);
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => return Ok(ConsumerExit::Shutdown),
                        _ = tokio::time::sleep(STREAM_ERROR_PAUSE) => {}
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn handle(&mut self, record: StreamRecord) {
        let filter = self.settings.source_filter.as_deref();
        if filter.is_some_and(|filter| record.source_tag() != Some(filter)) {
            tracing::debug!(
                partition = record.partition,
                offset = record.offset,
                "[consumer] skipping record from source {:?}",
                record.source_tag()
            );
            self.commit(&record);
            return;
        }

        let decrypted = decrypt(&record.payload, self.key.as_deref());
        if let Decrypted::Unreadable(err) = &decrypted {
            tracing::error!(
                partition = record.partition,
                offset = record.offset,
                "[consumer] {}",
                err
            );
        }
        let message = decrypted.into_message();

        tracing::info!(
            partition = record.partition,
            offset = record.offset,
            timestamp = ?record.timestamp,
            "[consumer] message received: value={}",
            message
        );

        if !self.relay.try_publish(message) {
            tracing::debug!("[consumer] replaced an unread message in the relay");
        }

        self.commit(&record);

        let processed = self.state.record_processed();
        if self.settings.max_messages.is_some_and(|limit| processed >= limit) {
            self.shutdown.trigger(ShutdownReason::MessageLimit(processed));
        }
    }

    fn commit(&mut self, record: &StreamRecord) {
        if let Err(err) = self.source.commit(record) {
            tracing::warn!(
                partition = record.partition,
                offset = record.offset,
                "[consumer] failed to commit record: {}",
                err
            );
        }
    }
}
