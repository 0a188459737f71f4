// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Key acquisition from the secure key release (SKR) sidecar.
//!
//! The sidecar listens on loopback and only hands out the private key after it
//! has attested the environment to the attestation service. The flow is:
//!
//! 1. optionally probe `GET /status` until the sidecar answers
//! 2. `POST /key/release` with the attestation endpoint, key vault endpoint and key id
//! 3. parse the returned JWK into [`KeyMaterial`]
//!
//! Transport failures and error statuses are retried with exponential backoff.
//! When every attempt fails the consumer keeps running without a key and passes
//! messages through untouched.

use std::future::Future;
use std::sync::Arc;

use reqwest::Client;
use zeroize::Zeroize;

use crate::constants::{
    KEY_RELEASE_PATH, KEY_REQUEST_TIMEOUT, KEY_STATUS_PATH, MAX_KEY_RESPONSE_SIZE,
};
use crate::crypto::KeyMaterial;
use crate::errors::KeyError;
use crate::models::{Jwk, KeyReleaseRequest, KeyReleaseResponse};
use crate::retry::{BackoffPolicy, retry};
use crate::state::ConsumerState;

/// The key release service.
pub trait KeyService: Send + Sync {
    /// Readiness probe.
    fn status(&self) -> impl Future<Output = Result<(), KeyError>> + Send;

    fn release(
        &self,
        request: &KeyReleaseRequest,
    ) -> impl Future<Output = Result<KeyReleaseResponse, KeyError>> + Send;
}

/// [`KeyService`] over HTTP, normally `http://localhost:8080`.
#[derive(Debug, Clone)]
pub struct HttpKeyService {
    client: Client,
    base_url: String,
    body_limit: usize,
}

impl HttpKeyService {
    pub fn new(base_url: impl Into<String>) -> Result<Self, KeyError> {
        let client = Client::builder().timeout(KEY_REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            body_limit: MAX_KEY_RESPONSE_SIZE,
        })
    }

    /// Caps how many response body bytes are read, [`MAX_KEY_RESPONSE_SIZE`] by default.
    pub fn with_body_limit(mut self, body_limit: usize) -> Self {
        self.body_limit = body_limit;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Reads at most `limit` bytes of the body, whatever the declared length.
async fn read_capped(mut response: reqwest::Response, limit: usize) -> Result<Vec<u8>, KeyError> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let remaining = limit - body.len();
        if chunk.len() >= remaining {
            body.extend_from_slice(&chunk[..remaining]);
            tracing::warn!("[consumer] key service response truncated at {} bytes", limit);
            break;
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

fn is_success(status: u16) -> bool {
    (200..=207).contains(&status)
}

impl KeyService for HttpKeyService {
    #[tracing::instrument(skip(self))]
    async fn status(&self) -> Result<(), KeyError> {
        let response = self.client.get(self.url(KEY_STATUS_PATH)).send().await?;
        let status = response.status().as_u16();
        if !is_success(status) {
            let body = read_capped(response, self.body_limit).await?;
            return Err(KeyError::Status {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, request))]
    async fn release(&self, request: &KeyReleaseRequest) -> Result<KeyReleaseResponse, KeyError> {
        let response = self
            .client
            .post(self.url(KEY_RELEASE_PATH))
            .json(request)
            .send()
            .await?;
        let status = response.status().as_u16();
        let mut body = read_capped(response, self.body_limit).await?;

        if !is_success(status) {
            let message = String::from_utf8_lossy(&body).into_owned();
            body.zeroize();
            return Err(KeyError::Status {
                status,
                body: message,
            });
        }
        if body.is_empty() {
            return Err(KeyError::MissingBody);
        }

        let parsed = serde_json::from_slice::<KeyReleaseResponse>(&body)
            .map_err(|err| KeyError::MalformedResponse(err.to_string()));
        body.zeroize();
        parsed
    }
}

/// Parses the JWK carried in a key release response.
pub fn parse_released_key(response: &KeyReleaseResponse) -> Result<KeyMaterial, KeyError> {
    if response.key.is_empty() {
        return Err(KeyError::MalformedResponse("no key in response".to_string()));
    }
    let jwk: Jwk = serde_json::from_str(&response.key)
        .map_err(|err| KeyError::MalformedResponse(err.to_string()))?;
    KeyMaterial::from_jwk(&jwk)
}

pub struct KeyProvider<K> {
    service: K,
    request: KeyReleaseRequest,
    policy: BackoffPolicy,
    probe_status: bool,
}

impl<K: KeyService> KeyProvider<K> {
    pub fn new(service: K, request: KeyReleaseRequest, policy: BackoffPolicy) -> Self {
        Self {
            service,
            request,
            policy,
            probe_status: false,
        }
    }

    /// Waits for `GET /status` to succeed before asking for the key.
    pub fn with_status_probe(mut self, probe_status: bool) -> Self {
        self.probe_status = probe_status;
        self
    }

    /// Fetches and parses the key, retrying transient failures.
    pub async fn try_acquire(&self) -> Result<KeyMaterial, KeyError> {
        if self.probe_status {
            retry(&self.policy, KeyError::is_retryable, |attempt| {
                tracing::debug!("[consumer] probing key service, attempt {}", attempt);
                self.service.status()
            })
            .await
            .map_err(|err| err.into_last())?;
            tracing::info!("[consumer] key service is ready");
        }

        let response = retry(&self.policy, KeyError::is_retryable, |attempt| {
            tracing::debug!("[consumer] requesting key release, attempt {}", attempt);
            self.service.release(&self.request)
        })
        .await
        .map_err(|err| {
            tracing::error!("[consumer] key release failed: {}", err);
            err.into_last()
        })?;

        parse_released_key(&response)
    }

    /// Acquires the key, recording success in `state`. Any failure is logged and
    /// yields `None`; the caller decides whether that is fatal.
    pub async fn acquire(&self, state: &ConsumerState) -> Option<Arc<KeyMaterial>> {
        match self.try_acquire().await {
            Ok(key) => {
                state.set_key_available();
                tracing::info!("[consumer] released {}-bit RSA key", key.bits());
                Some(Arc::new(key))
            }
            Err(err) => {
                tracing::error!(
                    "[consumer] not able to retrieve key, messages will not be decrypted: {}",
                    err
                );
                None
            }
        }
    }
}
