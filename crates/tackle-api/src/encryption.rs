// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! AES-256-GCM encryption for credential fields at rest.
//!
//! Sensitive fields of a credential-bearing record (identity, proxy) are moved
//! into a secret side-structure, serialized to JSON and sealed into the record's
//! single `encrypted` blob. The blob format is
//! `base64(nonce (12 bytes) || ciphertext || tag (16 bytes))`.
//!
//! The AES key is the SHA-256 digest of the passphrase. A wrong passphrase is
//! detected by GCM authentication and reported as [`CodecError::Decrypt`]; it
//! never yields incorrect plaintext.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Size of the AES-256-GCM nonce in bytes.
const NONCE_SIZE: usize = 12;

/// Size of the AES-256-GCM authentication tag in bytes.
const TAG_SIZE: usize = 16;

/// Errors that can occur during credential encryption/decryption.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The blob is not valid base64, is too short, or does not hold the expected fields.
    #[error("Malformed encrypted data: {0}")]
    Malformed(String),

    /// Authentication failed: wrong passphrase or tampered data.
    #[error("Decryption failed: wrong passphrase or corrupted data")]
    Decrypt,

    /// The cipher rejected the input.
    #[error("Encryption failed: {0}")]
    Encrypt(String),

    /// The secret fields could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Secret side-structure of a credential-bearing record.
pub trait SecretFields: Serialize + DeserializeOwned + Default {
    /// True when no field carries a value.
    fn is_empty(&self) -> bool;

    /// Overwrite fields with every non-empty field of `newer`.
    fn merge(&mut self, newer: Self);
}

/// A record whose sensitive fields are persisted only in encrypted form.
pub trait Encryptable {
    /// Side-structure holding the sensitive fields.
    type Secret: SecretFields;

    /// Copy of the plaintext sensitive fields currently on the record.
    fn secret(&self) -> Self::Secret;

    /// Clear every plaintext sensitive field.
    fn clear_secret(&mut self);

    /// Write sensitive fields back onto the record.
    fn restore_secret(&mut self, secret: Self::Secret);

    /// The encrypted blob (empty when none).
    fn encrypted(&self) -> &str;

    /// Replace the encrypted blob.
    fn set_encrypted(&mut self, blob: String);
}

/// Symmetric codec bound to one passphrase.
#[derive(Clone)]
pub struct Codec {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codec").finish_non_exhaustive()
    }
}

impl Codec {
    /// Create a codec for the given passphrase.
    pub fn new(passphrase: &str) -> Self {
        let key = Sha256::digest(passphrase.as_bytes());
        Self {
            cipher: Aes256Gcm::new(&key),
        }
    }

    /// Fold the record's plaintext sensitive fields into its encrypted blob.
    ///
    /// Fields already sealed in an existing blob are preserved unless the record
    /// carries a new value for them. A record without plaintext is left untouched.
    /// On error the record is not modified.
    pub fn encrypt<R: Encryptable>(&self, record: &mut R) -> Result<()> {
        let fresh = record.secret();
        if fresh.is_empty() {
            return Ok(());
        }

        let mut merged = if record.encrypted().is_empty() {
            R::Secret::default()
        } else {
            self.open::<R::Secret>(record.encrypted())?
        };
        merged.merge(fresh);

        let blob = self.seal(&merged)?;
        record.clear_secret();
        record.set_encrypted(blob);
        Ok(())
    }

    /// Restore plaintext sensitive fields from the record's encrypted blob.
    ///
    /// Plaintext already present on the record wins over the sealed value.
    /// The blob is cleared afterwards. On error the record is not modified.
    pub fn decrypt<R: Encryptable>(&self, record: &mut R) -> Result<()> {
        if record.encrypted().is_empty() {
            return Ok(());
        }

        let mut secret = self.open::<R::Secret>(record.encrypted())?;
        secret.merge(record.secret());
        record.restore_secret(secret);
        record.set_encrypted(String::new());
        Ok(())
    }

    /// Serialize and encrypt a value into a blob.
    pub fn seal<T: Serialize>(&self, value: &T) -> Result<String> {
        let plaintext = serde_json::to_vec(value)?;
        self.encrypt_bytes(&plaintext)
    }

    /// Decrypt a blob and deserialize its content.
    pub fn open<T: DeserializeOwned>(&self, blob: &str) -> Result<T> {
        let plaintext = self.decrypt_bytes(blob)?;
        serde_json::from_slice(&plaintext).map_err(|e| CodecError::Malformed(e.to_string()))
    }

    /// Encrypt raw bytes into a base64 blob.
    pub fn encrypt_bytes(&self, plaintext: &[u8]) -> Result<String> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| CodecError::Encrypt(e.to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);

        Ok(STANDARD.encode(sealed))
    }

    /// Decrypt a base64 blob into raw bytes.
    pub fn decrypt_bytes(&self, blob: &str) -> Result<Vec<u8>> {
        let sealed = STANDARD
            .decode(blob.trim())
            .map_err(|e| CodecError::Malformed(e.to_string()))?;

        if sealed.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CodecError::Malformed("too short".to_string()));
        }

        let nonce = Nonce::from_slice(&sealed[..NONCE_SIZE]);
        self.cipher
            .decrypt(nonce, &sealed[NONCE_SIZE..])
            .map_err(|_| CodecError::Decrypt)
    }
}

/// Sensitive fields of an identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct IdentitySecret {
    /// User name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user: String,
    /// Password or token.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    /// Private key (SSH or similar).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key: String,
    /// Tool settings document (e.g. maven settings.xml).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub settings: String,
}

impl SecretFields for IdentitySecret {
    fn is_empty(&self) -> bool {
        self.user.is_empty()
            && self.password.is_empty()
            && self.key.is_empty()
            && self.settings.is_empty()
    }

    fn merge(&mut self, newer: Self) {
        merge_field(&mut self.user, newer.user);
        merge_field(&mut self.password, newer.password);
        merge_field(&mut self.key, newer.key);
        merge_field(&mut self.settings, newer.settings);
    }
}

/// Sensitive fields of a proxy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct ProxySecret {
    /// Proxy user name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user: String,
    /// Proxy password.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
}

impl SecretFields for ProxySecret {
    fn is_empty(&self) -> bool {
        self.user.is_empty() && self.password.is_empty()
    }

    fn merge(&mut self, newer: Self) {
        merge_field(&mut self.user, newer.user);
        merge_field(&mut self.password, newer.password);
    }
}

fn merge_field(current: &mut String, newer: String) {
    if !newer.is_empty() {
        *current = newer;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default)]
    struct Record {
        user: String,
        password: String,
        encrypted: String,
    }

    impl Encryptable for Record {
        type Secret = ProxySecret;

        fn secret(&self) -> ProxySecret {
            ProxySecret {
                user: self.user.clone(),
                password: self.password.clone(),
            }
        }

        fn clear_secret(&mut self) {
            self.user.clear();
            self.password.clear();
        }

        fn restore_secret(&mut self, secret: ProxySecret) {
            self.user = secret.user;
            self.password = secret.password;
        }

        fn encrypted(&self) -> &str {
            &self.encrypted
        }

        fn set_encrypted(&mut self, blob: String) {
            self.encrypted = blob;
        }
    }

    fn record(user: &str, password: &str) -> Record {
        Record {
            user: user.to_string(),
            password: password.to_string(),
            encrypted: String::new(),
        }
    }

    #[test]
    fn test_bytes_roundtrip() {
        let codec = Codec::new("p1");
        let blob = codec.encrypt_bytes(b"hello").unwrap();
        assert_eq!(codec.decrypt_bytes(&blob).unwrap(), b"hello");
    }

    #[test]
    fn test_nonce_is_fresh() {
        let codec = Codec::new("p1");
        let a = codec.encrypt_bytes(b"same").unwrap();
        let b = codec.encrypt_bytes(b"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_encrypt_clears_plaintext() {
        let codec = Codec::new("p1");
        let mut r = record("bob", "s3cr3t");
        codec.encrypt(&mut r).unwrap();
        assert!(r.user.is_empty());
        assert!(r.password.is_empty());
        assert!(!r.encrypted.is_empty());
    }

    #[test]
    fn test_decrypt_restores_plaintext() {
        let codec = Codec::new("p1");
        let mut r = record("bob", "s3cr3t");
        codec.encrypt(&mut r).unwrap();
        codec.decrypt(&mut r).unwrap();
        assert_eq!(r.user, "bob");
        assert_eq!(r.password, "s3cr3t");
        assert!(r.encrypted.is_empty());
    }

    #[test]
    fn test_wrong_passphrase_fails_without_mutation() {
        let mut r = record("bob", "s3cr3t");
        Codec::new("p1").encrypt(&mut r).unwrap();
        let blob = r.encrypted.clone();

        let result = Codec::new("wrong").decrypt(&mut r);
        assert!(matches!(result, Err(CodecError::Decrypt)));
        assert_eq!(r.encrypted, blob);
        assert!(r.user.is_empty());
    }

    #[test]
    fn test_update_keeps_sibling_fields() {
        let codec = Codec::new("p1");
        let mut r = record("bob", "s3cr3t");
        codec.encrypt(&mut r).unwrap();

        r.password = "n3w".to_string();
        codec.encrypt(&mut r).unwrap();
        codec.decrypt(&mut r).unwrap();

        assert_eq!(r.user, "bob");
        assert_eq!(r.password, "n3w");
    }

    #[test]
    fn test_encrypt_without_plaintext_is_noop() {
        let codec = Codec::new("p1");
        let mut r = record("bob", "");
        codec.encrypt(&mut r).unwrap();
        let blob = r.encrypted.clone();

        codec.encrypt(&mut r).unwrap();
        assert_eq!(r.encrypted, blob);
    }

    #[test]
    fn test_malformed_blob() {
        let codec = Codec::new("p1");
        assert!(matches!(
            codec.decrypt_bytes("not base64!"),
            Err(CodecError::Malformed(_))
        ));
        assert!(matches!(
            codec.decrypt_bytes(&STANDARD.encode([0u8; 10])),
            Err(CodecError::Malformed(_))
        ));
    }

    #[test]
    fn test_tampered_blob_fails() {
        let codec = Codec::new("p1");
        let blob = codec.encrypt_bytes(b"payload").unwrap();
        let mut raw = STANDARD.decode(&blob).unwrap();
        raw[NONCE_SIZE + 2] ^= 0xFF;
        let tampered = STANDARD.encode(raw);
        assert!(matches!(
            codec.decrypt_bytes(&tampered),
            Err(CodecError::Decrypt)
        ));
    }

    #[test]
    fn test_secret_json_omits_empty_fields() {
        let secret = IdentitySecret {
            password: "x".to_string(),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_string(&secret).unwrap(),
            r#"{"password":"x"}"#
        );
    }
}
