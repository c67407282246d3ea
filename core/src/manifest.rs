//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: chunkvault — zero-trust chunked content sharing.
//

//! Asset manifest: the authoritative description of an asset's chunk
//! layout, hashed and pinned inside the encrypted metadata block so any
//! substitution of `manifest.json` is detectable at load time.

use crate::error::{EngineError, Result};
use crate::primitives::sha256_hex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current manifest schema version. Bump on any incompatible layout change.
pub const MANIFEST_VERSION: &str = "2.0";

/// Default plaintext chunk size: 4 MiB, per spec §4.3's
/// `encrypt_bytes_to_asset(.., chunk_size=4MiB)` default.
pub const DEFAULT_CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// One entry in [`Manifest::chunks`], describing a single encrypted chunk
/// on disk and the SHA-256 of its plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkEntry {
    pub index: u32,
    /// SHA-256 hex digest of the chunk's *plaintext*. See design note on
    /// plaintext-vs-ciphertext hashing in the crate's design ledger.
    #[serde(rename = "hash_sha256")]
    pub hash: String,
    /// Plaintext length of this chunk, in bytes. The final chunk is
    /// typically shorter than `Manifest::chunk_size`.
    pub size: usize,
    /// Path to this chunk's wrapped-key file, relative to the asset directory.
    pub encrypted_key_file: String,
    /// Path to this chunk's nonce file, relative to the asset directory.
    pub nonce_file: String,
}

/// Describes how an asset's plaintext was split into encrypted chunks.
///
/// Serialized canonically (recursively sorted object keys, 2-space indent)
/// via [`Manifest::to_canonical_bytes`] before hashing, so the hash is
/// stable regardless of field construction order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    pub asset_id: Uuid,
    pub chunk_size: usize,
    pub total_chunks: u32,
    pub total_size: u64,
    pub chunks: Vec<ChunkEntry>,
    /// Filename of the encrypted metadata block relative to the asset directory.
    pub metadata_block: String,
}

impl Manifest {
    /// Build a manifest for `total_size` bytes of plaintext split into
    /// `chunk_size`-byte chunks, given their plaintext hashes.
    pub fn new(asset_id: Uuid, chunk_size: usize, total_size: u64, chunks: Vec<ChunkEntry>) -> Self {
        Self {
            version: MANIFEST_VERSION.to_string(),
            asset_id,
            chunk_size,
            total_chunks: chunks.len() as u32,
            total_size,
            chunks,
            metadata_block: "metadata.enc".to_string(),
        }
    }

    /// Structural validation: required fields present and internally
    /// consistent. Does not touch the filesystem.
    pub fn validate(&self) -> Result<()> {
        if self.version != MANIFEST_VERSION {
            return Err(EngineError::MalformedAsset(format!(
                "unsupported manifest version: {}",
                self.version
            )));
        }
        if self.chunk_size == 0 {
            return Err(EngineError::MalformedAsset("chunk_size must be nonzero".into()));
        }
        if self.chunks.len() as u32 != self.total_chunks {
            return Err(EngineError::MalformedAsset(
                "total_chunks does not match chunks length".into(),
            ));
        }
        for (i, entry) in self.chunks.iter().enumerate() {
            if entry.index as usize != i {
                return Err(EngineError::MalformedAsset(format!(
                    "chunk entries out of order at position {i}"
                )));
            }
            if entry.hash.len() != 64 {
                return Err(EngineError::MalformedAsset(format!(
                    "chunk {i} hash is not a 32-byte hex digest"
                )));
            }
            if entry.encrypted_key_file.is_empty() || entry.nonce_file.is_empty() {
                return Err(EngineError::MalformedAsset(format!(
                    "chunk {i} is missing a key or nonce file pointer"
                )));
            }
        }
        if self.metadata_block.is_empty() {
            return Err(EngineError::MalformedAsset("metadata_block must not be empty".into()));
        }
        Ok(())
    }

    /// Canonical JSON encoding: every object's keys sorted recursively,
    /// 2-space indentation. `serde_json::Map` here is backed by a
    /// `BTreeMap` (the `preserve_order` feature is not enabled), so keys
    /// sort automatically once round-tripped through `Value`.
    pub fn to_canonical_bytes(&self) -> Result<Vec<u8>> {
        let value = serde_json::to_value(self)?;
        Ok(serde_json::to_vec_pretty(&value)?)
    }

    /// SHA-256 hex digest of this manifest's canonical encoding. Pinned
    /// inside the asset's encrypted metadata block to detect manifest
    /// substitution.
    pub fn hash(&self) -> Result<String> {
        Ok(sha256_hex(&self.to_canonical_bytes()?))
    }

    /// Verify that `expected_hash` matches this manifest's canonical hash.
    pub fn verify_hash(&self, expected_hash: &str) -> Result<()> {
        let actual = self.hash()?;
        if crate::primitives::constant_time_eq(&actual, expected_hash) {
            Ok(())
        } else {
            Err(EngineError::IntegrityFailure("manifest hash mismatch".into()))
        }
    }

    /// Look up a chunk entry by index, translating an out-of-range index
    /// into [`EngineError::OutOfRange`].
    pub fn chunk(&self, index: u32) -> Result<&ChunkEntry> {
        self.chunks.get(index as usize).ok_or(EngineError::OutOfRange {
            index,
            total: self.total_chunks,
        })
    }
}
