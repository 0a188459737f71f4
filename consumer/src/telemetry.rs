// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

const DEFAULT_FILTER: &str = "info,tower_http=debug";

/// Opens `path` for appending, creating it if needed.
pub fn open_log_file(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Installs the global JSON subscriber. Logs go to `log_file` when it can be
/// opened and to stdout otherwise.
pub fn init(log_file: Option<&Path>) {
    let mut fallback = None;
    let writer = match log_file.map(|path| (path, open_log_file(path))) {
        Some((_, Ok(file))) => BoxMakeWriter::new(Mutex::new(file)),
        Some((path, Err(err))) => {
            fallback = Some(format!("{}: {}", path.display(), err));
            BoxMakeWriter::new(std::io::stdout)
        }
        None => BoxMakeWriter::new(std::io::stdout),
    };

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.into()),
        ))
        .with_writer(writer)
        // span context is already part of every message prefix
        .with_current_span(false)
        // ANSI escapes show up verbatim in container log collectors
        .with_ansi(false)
        .without_time()
        .with_target(false)
        .init();

    if let Some(reason) = fallback {
        tracing::warn!("[consumer] unable to open log file {}, logging to stdout", reason);
    }
}
