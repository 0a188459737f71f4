// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! # SKR Producer
//!
//! Demo producer for the secure key release consumer. It builds
//! `Message Id <n>: <msg>` texts, encrypts them with the RSA public key whose
//! private half is held by the key release service, and publishes them.
//!
//! ## Modules
//!
//! - [`configuration`]: CLI and environment options with clap
//! - [`crypto`]: RSA-OAEP encryption with a PEM public key
//! - [`errors`]: Producer error type
//! - `kafka`: Kafka sink (feature `kafka`)
//! - [`message`]: Demo message text
//! - [`publisher`]: Interval publishing loop
//! - [`sink`]: Sink abstraction and the line-oriented writer sink
//! - [`telemetry`]: Tracing subscriber setup

pub mod configuration;
pub mod crypto;
pub mod errors;
#[cfg(feature = "kafka")]
pub mod kafka;
pub mod message;
pub mod publisher;
pub mod sink;
pub mod telemetry;
