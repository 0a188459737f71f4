// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! # SKR Consumer
//!
//! Stream consumer for the secure key release demo.
//!
//! At startup the consumer asks the secure key release (SKR) sidecar for an RSA
//! private key. The sidecar only releases it after attesting the confidential
//! environment. The consumer then reads records from a stream, decrypts each
//! payload with RSA-OAEP and hands the newest text to an HTTP status page.
//!
//! ## Architecture
//!
//! ```text
//! SKR sidecar --(JWK)--> keys ---> crypto
//!                                    |
//! Kafka / stdin --> stream ----------+--> relay --> routes --> browser
//!                     |
//!                  shutdown <-- SIGINT / SIGTERM / message limit
//! ```
//!
//! Without a key, payloads are shown as they arrive. The relay holds at most
//! one message; a newer message replaces an unread one.
//!
//! ## Modules
//!
//! - [`application`]: HTTP server setup with Axum and static assets
//! - [`configuration`]: CLI and environment options with clap
//! - [`constants`]: Timeouts, limits and fixed messages
//! - [`crypto`]: JWK to RSA key conversion and payload decryption
//! - [`errors`]: Error types per concern, HTTP error mapping
//! - `kafka`: Kafka stream source (feature `kafka`)
//! - [`keys`]: Key release client with retry
//! - [`models`]: Wire and view types
//! - [`relay`]: Single-slot, last-write-wins hand-off to HTTP handlers
//! - [`retry`]: Bounded exponential backoff
//! - [`routes`]: HTTP route handlers (index, api_message, health)
//! - [`shutdown`]: One-shot shutdown signal and OS signal listener
//! - [`state`]: Shared consumer state and lifecycle phase
//! - [`stream`]: Stream source abstraction, stdin source and the consumer loop
//! - [`telemetry`]: Tracing subscriber setup
//! - [`template`]: Status page rendering
//!
//! ## Usage
//!
//! ```bash
//! skr-producer --sink stdout --msg hello --pubkey-path key.pem \
//!     | skr-consumer --source stdin --skr-endpoint http://localhost:8080 --kid my-key
//! ```

pub mod application;
pub mod configuration;
pub mod constants;
pub mod crypto;
pub mod errors;
#[cfg(feature = "kafka")]
pub mod kafka;
pub mod keys;
pub mod models;
pub mod relay;
pub mod retry;
pub mod routes;
pub mod shutdown;
pub mod state;
pub mod stream;
pub mod telemetry;
pub mod template;
