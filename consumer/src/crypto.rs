// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! RSA key reconstruction and message decryption.
//!
//! Producers encrypt each message with RSA-OAEP (SHA-256 for both the hash and
//! MGF1, empty label) and base64 encode the ciphertext. Without a key the
//! consumer runs in pass-through mode and hands the raw payload on untouched.

use std::fmt;

use base64::{
    Engine as _,
    prelude::{BASE64_STANDARD, BASE64_URL_SAFE_NO_PAD},
};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, Oaep, RsaPrivateKey};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::constants::UNREADABLE_MESSAGE;
use crate::errors::{DecryptError, KeyError};
use crate::models::Jwk;

/// The private key released by the key service. Immutable once built.
pub struct KeyMaterial {
    key: RsaPrivateKey,
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("bits", &self.bits())
            .finish_non_exhaustive()
    }
}

impl KeyMaterial {
    /// Rebuilds the private key from the `n`, `e`, `d`, `p` and `q` JWK components
    /// and checks that they form a consistent key pair.
    pub fn from_jwk(jwk: &Jwk) -> Result<Self, KeyError> {
        if let Some(kty) = jwk.kty.as_deref().filter(|kty| *kty != "RSA") {
            return Err(KeyError::InvalidKey(format!("unsupported key type {kty}")));
        }

        let n = decode_component("n", &jwk.n)?;
        let e = decode_component("e", &jwk.e)?;
        let d = decode_component("d", &jwk.d)?;
        let p = decode_component("p", &jwk.p)?;
        let q = decode_component("q", &jwk.q)?;

        let key = RsaPrivateKey::from_components(n, e, d, vec![p, q])
            .map_err(|err| KeyError::InvalidKey(err.to_string()))?;
        key.validate()
            .map_err(|err| KeyError::InvalidKey(err.to_string()))?;

        Ok(Self { key })
    }

    pub fn from_private_key(key: RsaPrivateKey) -> Self {
        Self { key }
    }

    pub fn bits(&self) -> usize {
        self.key.size() * 8
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, DecryptError> {
        self.key
            .decrypt(Oaep::new::<Sha256>(), ciphertext)
            .map_err(|err| DecryptError::Rsa(err.to_string()))
    }
}

fn decode_component(name: &'static str, value: &str) -> Result<BigUint, KeyError> {
    if value.is_empty() {
        return Err(KeyError::MalformedField(name, "missing".to_string()));
    }
    let mut bytes = BASE64_URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|err| KeyError::MalformedField(name, err.to_string()))?;
    let component = BigUint::from_bytes_be(&bytes);
    bytes.zeroize();
    Ok(component)
}

/// Result of running a payload through [`decrypt`].
#[derive(Debug, Clone, PartialEq)]
pub enum Decrypted {
    /// No key is loaded; the payload is returned unchanged.
    Passthrough(Vec<u8>),
    Plaintext(Vec<u8>),
    /// A key is loaded but the payload could not be decrypted with it.
    Unreadable(DecryptError),
}

impl Decrypted {
    /// Text for display. Unreadable payloads become [`UNREADABLE_MESSAGE`].
    pub fn into_message(self) -> String {
        match self {
            Self::Passthrough(bytes) | Self::Plaintext(bytes) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
            },
            Self::Unreadable(_) => UNREADABLE_MESSAGE.to_string(),
        }
    }
}

/// Turns a raw stream payload into plaintext.
///
/// With a key the payload must be base64 (standard alphabet) RSA-OAEP ciphertext;
/// surrounding whitespace is ignored.
pub fn decrypt(payload: &[u8], key: Option<&KeyMaterial>) -> Decrypted {
    let Some(key) = key else {
        return Decrypted::Passthrough(payload.to_vec());
    };

    let ciphertext = match BASE64_STANDARD.decode(payload.trim_ascii()) {
        Ok(ciphertext) => ciphertext,
        Err(err) => return Decrypted::Unreadable(DecryptError::Base64(err.to_string())),
    };

    match key.decrypt(&ciphertext) {
        Ok(plaintext) => Decrypted::Plaintext(plaintext),
        Err(err) => Decrypted::Unreadable(err),
    }
}
