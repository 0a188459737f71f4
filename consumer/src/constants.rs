// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::time::Duration;

pub const HTTP_PORT: u16 = 3333;
pub const KEY_RELEASE_PATH: &str = "/key/release";
pub const KEY_STATUS_PATH: &str = "/status";
/// The key service may declare any content length; bodies are truncated here.
pub const MAX_KEY_RESPONSE_SIZE: usize = 32 * 1024 * 1024; // 32 MiB
pub const KEY_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_RETRY_ATTEMPTS: u32 = 5;
pub const DEFAULT_RETRY_INITIAL: Duration = Duration::from_secs(1);
pub const DEFAULT_RETRY_MAX: Duration = Duration::from_secs(30);

pub const DEFAULT_STATUS_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(1);
/// Pause after a transient stream error before polling again.
pub const STREAM_ERROR_PAUSE: Duration = Duration::from_millis(250);
/// How long `main` waits for the consumer to close the source after shutdown fires.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

pub const SOURCE_ANNOTATION: &str = "source";

pub const TIMEOUT_MESSAGE: &str =
    "Timeout waiting to read data from Kafka.  Please refresh the page to try again.";
pub const UNREADABLE_MESSAGE: &str = "<unable to decrypt message>";
