// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ProducerError {
    #[error("invalid option {0}: {1}")]
    Invalid(&'static str, String),
    #[error("unable to read public key {0}: {1}")]
    PublicKeyFile(String, String),
    #[error("invalid public key: {0}")]
    PublicKey(String),
    #[error("failed to encrypt with the public key: {0}")]
    Encrypt(String),
    #[error("failed to send record: {0}")]
    Send(String),
    #[error("sink unavailable: {0}")]
    SinkUnavailable(String),
}

impl From<std::io::Error> for ProducerError {
    fn from(source: std::io::Error) -> Self {
        ProducerError::Send(source.to_string())
    }
}
