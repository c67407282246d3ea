//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: chunkvault — zero-trust chunked content sharing.
//

//! Asset metadata: expiry, sender/recipient identity, and the manifest hash
//! that pins the chunk layout. Encrypted the same way a chunk is — a fresh
//! AES-256-CTR key per asset, wrapped under the recipient's RSA-2048-OAEP
//! public key.

use crate::error::{EngineError, Result};
use crate::primitives::{
    aes_ctr_decrypt, aes_ctr_encrypt, random_aes_key, random_iv, rsa_unwrap_key, rsa_wrap_key, AES_KEY_LEN, IV_LEN,
};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current metadata schema version.
pub const METADATA_VERSION: &str = "2.0";

/// Plaintext asset metadata. Never written to disk unencrypted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub version: String,
    /// Unix timestamp (seconds) the asset was created.
    pub created_at: u64,
    /// Unix timestamp (seconds) after which the asset is no longer readable.
    pub expiry_at: u64,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    /// Original filename, if known. Defaults to `"unknown.bin"` when the
    /// sender did not supply one, or when an older asset's metadata block
    /// omits the field entirely — an asset must never fail to load for
    /// lack of a name.
    #[serde(default = "default_filename")]
    pub filename: String,
    /// SHA-256 hex digest of the asset's canonical manifest.
    pub manifest_hash: String,
}

fn default_filename() -> String {
    "unknown.bin".to_string()
}

impl Metadata {
    pub fn new(
        sender_id: Uuid,
        recipient_id: Uuid,
        created_at: u64,
        expiry_at: u64,
        filename: Option<String>,
        manifest_hash: String,
    ) -> Self {
        Self {
            version: METADATA_VERSION.to_string(),
            created_at,
            expiry_at,
            sender_id,
            recipient_id,
            filename: filename.unwrap_or_else(default_filename),
            manifest_hash,
        }
    }

    /// Whether this asset has expired as of `now` (Unix seconds).
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expiry_at
    }
}

/// An encrypted metadata block plus the wrapped key and nonce needed to
/// open it. Mirrors the on-disk `metadata.enc` / `.key` / `.nonce` trio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedMetadata {
    #[serde(with = "crate::hexenc")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "crate::hexenc")]
    pub wrapped_key: Vec<u8>,
    #[serde(with = "crate::hexenc")]
    pub nonce: Vec<u8>,
}

/// Encrypt `metadata` for `recipient_public_key`: serialize to JSON,
/// AES-256-CTR under a fresh key/nonce, then RSA-OAEP-wrap the key.
pub fn encrypt_metadata(metadata: &Metadata, recipient_public_key: &RsaPublicKey) -> Result<EncryptedMetadata> {
    let plaintext = serde_json::to_vec(metadata)?;
    let key = random_aes_key();
    let nonce = random_iv();
    let ciphertext = aes_ctr_encrypt(&key, &nonce, &plaintext);
    let wrapped_key = rsa_wrap_key(recipient_public_key, &key)?;
    Ok(EncryptedMetadata {
        ciphertext,
        wrapped_key,
        nonce: nonce.to_vec(),
    })
}

/// Decrypt an [`EncryptedMetadata`] block under `recipient_private_key`.
/// Any failure — wrong recipient key, tampered ciphertext, malformed JSON —
/// is reported as [`EngineError::AuthFailed`] so a caller cannot
/// distinguish "wrong key" from "corrupted blob".
pub fn decrypt_metadata(encrypted: &EncryptedMetadata, recipient_private_key: &RsaPrivateKey) -> Result<Metadata> {
    let key: [u8; AES_KEY_LEN] = rsa_unwrap_key(recipient_private_key, &encrypted.wrapped_key)?;
    let nonce: [u8; IV_LEN] = encrypted
        .nonce
        .as_slice()
        .try_into()
        .map_err(|_| EngineError::AuthFailed)?;
    let plaintext = aes_ctr_decrypt(&key, &nonce, &encrypted.ciphertext);
    serde_json::from_slice(&plaintext).map_err(|_| EngineError::AuthFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypair() -> (RsaPrivateKey, RsaPublicKey) {
        let private = crate::primitives::generate_rsa_keypair();
        let public = RsaPublicKey::from(&private);
        (private, public)
    }

    fn sample_metadata() -> Metadata {
        Metadata::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            1_000,
            2_000,
            Some("report.pdf".to_string()),
            "f".repeat(64),
        )
    }

    #[test]
    fn defaults_filename_when_absent() {
        let m = Metadata::new(Uuid::new_v4(), Uuid::new_v4(), 0, 1, None, "a".repeat(64));
        assert_eq!(m.filename, "unknown.bin");
    }

    #[test]
    fn deserializes_older_metadata_block_missing_filename_field() {
        // An older asset's encrypted metadata JSON may not carry `filename`
        // at all, not just a null/empty one.
        let json = format!(
            r#"{{"version":"2.0","created_at":0,"expiry_at":1,"sender_id":"{}","recipient_id":"{}","manifest_hash":"{}"}}"#,
            Uuid::new_v4(),
            Uuid::new_v4(),
            "a".repeat(64)
        );
        let m: Metadata = serde_json::from_str(&json).unwrap();
        assert_eq!(m.filename, "unknown.bin");
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let (private, public) = keypair();
        let metadata = sample_metadata();
        let encrypted = encrypt_metadata(&metadata, &public).unwrap();
        let decrypted = decrypt_metadata(&encrypted, &private).unwrap();
        assert_eq!(metadata, decrypted);
    }

    #[test]
    fn decrypt_with_wrong_key_fails() {
        let (_, public) = keypair();
        let (other_private, _) = keypair();
        let metadata = sample_metadata();
        let encrypted = encrypt_metadata(&metadata, &public).unwrap();
        assert!(decrypt_metadata(&encrypted, &other_private).is_err());
    }

    #[test]
    fn is_expired_boundary() {
        let m = sample_metadata();
        assert!(!m.is_expired(1_999));
        assert!(m.is_expired(2_000));
        assert!(m.is_expired(2_001));
    }
}
