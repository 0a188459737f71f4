// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Payload encryption. Ciphertext is RSA-OAEP (SHA-256 hash and MGF1, empty
//! label) encoded with the standard base64 alphabet, which is what the consumer
//! expects on the wire.

use std::path::Path;

use base64::prelude::*;
use rsa::pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPublicKey};
use sha2::Sha256;

use crate::errors::ProducerError;

#[derive(Debug, Clone)]
pub struct PublicKey {
    key: RsaPublicKey,
}

impl PublicKey {
    /// Parses a SubjectPublicKeyInfo PEM block (`-----BEGIN PUBLIC KEY-----`).
    pub fn from_pem(pem: &str) -> Result<Self, ProducerError> {
        let key = RsaPublicKey::from_public_key_pem(pem.trim())
            .map_err(|err| ProducerError::PublicKey(err.to_string()))?;
        Ok(Self { key })
    }

    /// Uses the inline PEM when one is given, the file at `path` otherwise.
    pub fn load(inline: Option<&str>, path: &Path) -> Result<Self, ProducerError> {
        if let Some(pem) = inline.filter(|pem| !pem.trim().is_empty()) {
            return Self::from_pem(pem);
        }
        let pem = std::fs::read_to_string(path).map_err(|err| {
            ProducerError::PublicKeyFile(path.display().to_string(), err.to_string())
        })?;
        Self::from_pem(&pem)
    }

    pub fn bits(&self) -> usize {
        self.key.size() * 8
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String, ProducerError> {
        let ciphertext = self
            .key
            .encrypt(&mut rand::thread_rng(), Oaep::new::<Sha256>(), plaintext)
            .map_err(|err| ProducerError::Encrypt(err.to_string()))?;
        Ok(BASE64_STANDARD.encode(ciphertext))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rsa::RsaPrivateKey;
    use rsa::pkcs8::{EncodePublicKey, LineEnding};
    use std::io::Write;

    fn key_pair() -> (RsaPrivateKey, String) {
        let private = RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
        let pem = RsaPublicKey::from(&private)
            .to_public_key_pem(LineEnding::LF)
            .unwrap();
        (private, pem)
    }

    #[test]
    fn test_ciphertext_opens_with_private_key() {
        let (private, pem) = key_pair();
        let key = PublicKey::from_pem(&pem).unwrap();
        assert_eq!(key.bits(), 1024);

        let encoded = key.encrypt(b"Message Id 12345: hello").unwrap();
        let ciphertext = BASE64_STANDARD.decode(encoded).unwrap();
        let plaintext = private.decrypt(Oaep::new::<Sha256>(), &ciphertext).unwrap();
        assert_eq!(plaintext, b"Message Id 12345: hello");
    }

    #[test]
    fn test_encryption_is_randomized() {
        let (_, pem) = key_pair();
        let key = PublicKey::from_pem(&pem).unwrap();
        assert_ne!(key.encrypt(b"same").unwrap(), key.encrypt(b"same").unwrap());
    }

    #[test]
    fn test_oversized_plaintext_is_rejected() {
        let (_, pem) = key_pair();
        let key = PublicKey::from_pem(&pem).unwrap();
        // 1024-bit OAEP-SHA256 fits at most 62 bytes
        assert!(matches!(
            key.encrypt(&[b'x'; 100]),
            Err(ProducerError::Encrypt(_))
        ));
    }

    #[test]
    fn test_inline_pem_wins_over_file() {
        let (_, pem) = key_pair();
        let key = PublicKey::load(Some(&pem), Path::new("/definitely/not/here.pem"));
        assert!(key.is_ok());
    }

    #[test]
    fn test_blank_inline_pem_falls_back_to_file() {
        let (_, pem) = key_pair();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(pem.as_bytes()).unwrap();

        assert!(PublicKey::load(Some("  "), file.path()).is_ok());
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = PublicKey::load(None, Path::new("/definitely/not/here.pem")).unwrap_err();
        assert!(matches!(err, ProducerError::PublicKeyFile(_, _)));
    }

    #[test]
    fn test_garbage_pem_is_rejected() {
        assert!(matches!(
            PublicKey::from_pem("not a key"),
            Err(ProducerError::PublicKey(_))
        ));
    }
}
