//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: chunkvault — zero-trust chunked content sharing.
//

//! On-disk asset layout, creation, loading, and the validation step that
//! turns a [`LoadedAsset`] into a [`ValidatedAsset`].
//!
//! ## Lifecycle
//!
//! `create_asset` writes a `Written` asset. `load_asset` reads the manifest
//! back (`Loaded`, unauthenticated). `ValidatedAsset::open` decrypts the
//! metadata, checks the manifest hash and expiry (`Validated`). Only a
//! `ValidatedAsset` can decrypt chunks (`Reading`). There is no way to
//! construct a `ValidatedAsset` except through `open`, so an unvalidated
//! asset can never be read from — the type system enforces the order.
//!
//! ## Directory layout
//!
//! ```text
//! <asset_dir>/
//!   manifest.json
//!   metadata.enc
//!   metadata.key
//!   metadata.nonce
//!   chunks/
//!     chunk_0.enc
//!     chunk_0.key
//!     chunk_0.nonce
//!     chunk_1.enc
//!     ...
//! ```

use crate::chunking::{decrypt_chunk, encrypt_chunk, hash_chunk};
use crate::error::{EngineError, Result};
use crate::manifest::{ChunkEntry, Manifest, DEFAULT_CHUNK_SIZE};
use crate::metadata::{decrypt_metadata, encrypt_metadata, EncryptedMetadata, Metadata};
use crate::primitives::IV_LEN;
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_secs()
}

/// Path helpers for an asset directory. Does not touch the filesystem by
/// itself; every method is a pure path computation.
#[derive(Debug, Clone)]
pub struct AssetPaths {
    root: PathBuf,
}

impl AssetPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest(&self) -> PathBuf {
        self.root.join("manifest.json")
    }

    pub fn metadata_ciphertext(&self) -> PathBuf {
        self.root.join("metadata.enc")
    }

    pub fn metadata_key(&self) -> PathBuf {
        self.root.join("metadata.key")
    }

    pub fn metadata_nonce(&self) -> PathBuf {
        self.root.join("metadata.nonce")
    }

    pub fn chunks_dir(&self) -> PathBuf {
        self.root.join("chunks")
    }

    pub fn chunk_ciphertext(&self, index: u32) -> PathBuf {
        self.chunks_dir().join(format!("chunk_{index}.enc"))
    }

    pub fn chunk_key(&self, index: u32) -> PathBuf {
        self.chunks_dir().join(format!("chunk_{index}.key"))
    }

    pub fn chunk_nonce(&self, index: u32) -> PathBuf {
        self.chunks_dir().join(format!("chunk_{index}.nonce"))
    }
}

/// An asset that has been written to disk but not yet read back. Returned
/// by [`create_asset`] purely for the caller's convenience (asset id, path).
pub struct WrittenAsset {
    pub asset_id: Uuid,
    pub paths: AssetPaths,
}

/// Encrypt `plaintext` into a brand-new asset directory under `root_dir`,
/// addressed to `recipient_public_key`.
///
/// `ttl_seconds` controls how long the asset remains readable after now.
#[allow(clippy::too_many_arguments)]
pub fn create_asset(
    root_dir: impl AsRef<Path>,
    plaintext: &[u8],
    sender_id: Uuid,
    recipient_id: Uuid,
    recipient_public_key: &RsaPublicKey,
    filename: Option<String>,
    ttl_seconds: u64,
    chunk_size: Option<usize>,
) -> Result<WrittenAsset> {
    let asset_id = Uuid::new_v4();
    let chunk_size = chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE);
    let paths = AssetPaths::new(root_dir.as_ref().join(asset_id.to_string()));

    fs::create_dir_all(paths.chunks_dir())?;

    let plain_chunks: Vec<&[u8]> = if plaintext.is_empty() {
        Vec::new()
    } else {
        plaintext.chunks(chunk_size).collect()
    };

    let mut entries = Vec::with_capacity(plain_chunks.len());
    for (index, chunk) in plain_chunks.iter().enumerate() {
        let index = index as u32;
        let encrypted = encrypt_chunk(chunk, recipient_public_key)?;
        fs::write(paths.chunk_ciphertext(index), &encrypted.ciphertext)?;
        fs::write(paths.chunk_key(index), &encrypted.wrapped_key)?;
        fs::write(paths.chunk_nonce(index), encrypted.nonce)?;
        entries.push(ChunkEntry {
            index,
            hash: hash_chunk(chunk),
            size: chunk.len(),
            encrypted_key_file: format!("chunks/chunk_{index}.key"),
            nonce_file: format!("chunks/chunk_{index}.nonce"),
        });
    }

    let manifest = Manifest::new(asset_id, chunk_size, plaintext.len() as u64, entries);
    let manifest_hash = manifest.hash()?;

    let created_at = now_unix();
    let metadata = Metadata::new(
        sender_id,
        recipient_id,
        created_at,
        created_at + ttl_seconds,
        filename,
        manifest_hash,
    );
    let encrypted_metadata = encrypt_metadata(&metadata, recipient_public_key)?;

    fs::write(paths.metadata_ciphertext(), &encrypted_metadata.ciphertext)?;
    fs::write(paths.metadata_key(), &encrypted_metadata.wrapped_key)?;
    fs::write(paths.metadata_nonce(), &encrypted_metadata.nonce)?;
    fs::write(paths.manifest(), manifest.to_canonical_bytes()?)?;

    Ok(WrittenAsset { asset_id, paths })
}

/// An asset whose manifest has been read and structurally validated, but
/// whose metadata has not yet been decrypted or checked. Corresponds to
/// spec state `Loaded`.
pub struct LoadedAsset {
    pub paths: AssetPaths,
    pub manifest: Manifest,
}

/// Read `manifest.json` back from `asset_dir` and structurally validate it.
/// Does not touch metadata or any chunk file.
pub fn load_asset(asset_dir: impl Into<PathBuf>) -> Result<LoadedAsset> {
    let paths = AssetPaths::new(asset_dir);
    let manifest_path = paths.manifest();
    if !manifest_path.exists() {
        return Err(EngineError::NotFound(format!(
            "no manifest.json at {}",
            paths.root().display()
        )));
    }
    let bytes = fs::read(manifest_path)?;
    let manifest: Manifest = serde_json::from_slice(&bytes)?;
    manifest.validate()?;
    Ok(LoadedAsset { paths, manifest })
}

fn read_encrypted_metadata(paths: &AssetPaths) -> Result<EncryptedMetadata> {
    let ciphertext = fs::read(paths.metadata_ciphertext())
        .map_err(|_| EngineError::MalformedAsset("missing metadata.enc".into()))?;
    let wrapped_key = fs::read(paths.metadata_key())
        .map_err(|_| EngineError::MalformedAsset("missing metadata.key".into()))?;
    let nonce = fs::read(paths.metadata_nonce())
        .map_err(|_| EngineError::MalformedAsset("missing metadata.nonce".into()))?;
    Ok(EncryptedMetadata { ciphertext, wrapped_key, nonce })
}

/// An asset whose metadata has been decrypted, whose manifest hash has been
/// verified against the pinned value in metadata, and whose expiry has been
/// checked against the current time. Corresponds to spec state `Validated`;
/// the only type from which chunks may be decrypted (`Reading`).
pub struct ValidatedAsset {
    paths: AssetPaths,
    manifest: Manifest,
    metadata: Metadata,
}

impl ValidatedAsset {
    /// Validate a [`LoadedAsset`] under `recipient_private_key`, checking
    /// metadata decryption, manifest hash, and expiry in that order. Every
    /// failure mode collapses to the taxonomy in [`crate::error::EngineError`]:
    /// wrong key and tamper both surface as `AuthFailed`/`IntegrityFailure`,
    /// never distinguished further.
    pub fn open(loaded: LoadedAsset, recipient_private_key: &RsaPrivateKey) -> Result<Self> {
        let LoadedAsset { paths, manifest } = loaded;

        let encrypted_metadata = read_encrypted_metadata(&paths)?;
        let metadata = decrypt_metadata(&encrypted_metadata, recipient_private_key)?;

        manifest.verify_hash(&metadata.manifest_hash)?;

        if metadata.is_expired(now_unix()) {
            return Err(EngineError::Expired);
        }

        Ok(Self { paths, manifest, metadata })
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn asset_id(&self) -> Uuid {
        self.manifest.asset_id
    }

    pub fn chunk_count(&self) -> u32 {
        self.manifest.total_chunks
    }

    /// Re-check expiry at the moment of a read. A long-lived `ValidatedAsset`
    /// handle can outlive its own expiry between `open` and a later read.
    pub fn ensure_not_expired(&self) -> Result<()> {
        if self.metadata.is_expired(now_unix()) {
            Err(EngineError::Expired)
        } else {
            Ok(())
        }
    }

    /// Read and decrypt chunk `index` from disk, then verify its plaintext
    /// against the manifest's pinned hash for that chunk.
    pub fn decrypt_chunk(&self, index: u32, recipient_private_key: &RsaPrivateKey) -> Result<Vec<u8>> {
        self.ensure_not_expired()?;
        let entry = self.manifest.chunk(index)?;

        let ciphertext = fs::read(self.paths.chunk_ciphertext(index))
            .map_err(|_| EngineError::MalformedAsset(format!("missing chunk {index} ciphertext")))?;
        let wrapped_key = fs::read(self.paths.root().join(&entry.encrypted_key_file))
            .map_err(|_| EngineError::MalformedAsset(format!("missing chunk {index} key")))?;
        let nonce_bytes = fs::read(self.paths.root().join(&entry.nonce_file))
            .map_err(|_| EngineError::MalformedAsset(format!("missing chunk {index} nonce")))?;
        let nonce: [u8; IV_LEN] = nonce_bytes
            .as_slice()
            .try_into()
            .map_err(|_| EngineError::MalformedAsset(format!("chunk {index} nonce has wrong length")))?;

        let plaintext = decrypt_chunk(&ciphertext, &wrapped_key, &nonce, recipient_private_key)?;

        if !crate::primitives::constant_time_eq(&hash_chunk(&plaintext), &entry.hash) {
            return Err(EngineError::IntegrityFailure(format!("chunk {index} hash mismatch")));
        }

        Ok(plaintext)
    }

    /// Read the raw encrypted chunk bundle from disk without decrypting it.
    /// Used by the encrypted-chunk prefetch cache tier, which stores
    /// ciphertext so a later short-range read only pays the decrypt cost.
    pub fn read_encrypted_chunk(&self, index: u32) -> Result<(Vec<u8>, Vec<u8>, [u8; IV_LEN])> {
        let entry = self.manifest.chunk(index)?;
        let ciphertext = fs::read(self.paths.chunk_ciphertext(index))
            .map_err(|_| EngineError::MalformedAsset(format!("missing chunk {index} ciphertext")))?;
        let wrapped_key = fs::read(self.paths.root().join(&entry.encrypted_key_file))
            .map_err(|_| EngineError::MalformedAsset(format!("missing chunk {index} key")))?;
        let nonce_bytes = fs::read(self.paths.root().join(&entry.nonce_file))
            .map_err(|_| EngineError::MalformedAsset(format!("missing chunk {index} nonce")))?;
        let nonce: [u8; IV_LEN] = nonce_bytes
            .as_slice()
            .try_into()
            .map_err(|_| EngineError::MalformedAsset(format!("chunk {index} nonce has wrong length")))?;
        Ok((ciphertext, wrapped_key, nonce))
    }
}
