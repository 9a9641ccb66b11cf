//! Symmetric codec for the `{"data": ...}` body envelope.

use aes_gcm::Aes256Gcm;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::AppError;

const NONCE_LEN: usize = 12;

/// The only JSON shape ever sent over the wire for request/response bodies.
///
/// `data` holds base64 of `nonce || ciphertext`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope {
    pub data: String,
}

/// Stateless AES-256-GCM codec keyed once at process start.
///
/// The key is the SHA-256 digest of the configured passphrase, so any
/// passphrase length yields a valid 32-byte key. `decrypt(encrypt(x)) == x`
/// for arbitrary bytes, including empty input.
pub struct EnvelopeCodec {
    key: [u8; 32],
}

impl EnvelopeCodec {
    pub fn new(secret: &str) -> Self {
        Self {
            key: Sha256::digest(secret.as_bytes()).into(),
        }
    }

    /// Encrypts plaintext into a base64 `nonce || ciphertext` token.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String, AppError> {
        let cipher = Aes256Gcm::new(GenericArray::from_slice(&self.key));

        let mut nonce = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce);

        let ciphertext = cipher
            .encrypt(GenericArray::from_slice(&nonce), plaintext)
            .map_err(|e| AppError::Internal(format!("envelope encryption failed: {e}")))?;

        let mut sealed = nonce.to_vec();
        sealed.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(sealed))
    }

    /// Decrypts a token produced by [`EnvelopeCodec::encrypt`].
    ///
    /// # Errors
    ///
    /// Returns [`AppError::BadPayload`] on bad base64, truncated data, or an
    /// authentication failure (wrong key or tampered ciphertext).
    pub fn decrypt(&self, token: &str) -> Result<Vec<u8>, AppError> {
        let sealed = BASE64
            .decode(token)
            .map_err(|_| AppError::BadPayload("data is not valid base64".into()))?;

        if sealed.len() < NONCE_LEN {
            return Err(AppError::BadPayload("data is too short".into()));
        }

        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new(GenericArray::from_slice(&self.key));

        cipher
            .decrypt(GenericArray::from_slice(nonce), ciphertext)
            .map_err(|_| AppError::BadPayload("data could not be decrypted".into()))
    }

    /// Encrypts plaintext and serializes the full wire envelope.
    pub fn wrap(&self, plaintext: &[u8]) -> Result<Vec<u8>, AppError> {
        let envelope = Envelope {
            data: self.encrypt(plaintext)?,
        };
        serde_json::to_vec(&envelope)
            .map_err(|e| AppError::Internal(format!("envelope serialization failed: {e}")))
    }

    /// Parses a raw body as an [`Envelope`] and returns the plaintext.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::BadPayload`] if the body is not valid JSON, lacks
    /// the `data` field, or fails to decrypt.
    pub fn unwrap(&self, raw: &[u8]) -> Result<Vec<u8>, AppError> {
        let envelope: Envelope = serde_json::from_slice(raw)
            .map_err(|e| AppError::BadPayload(format!("body is not an envelope: {e}")))?;
        self.decrypt(&envelope.data)
    }
}
