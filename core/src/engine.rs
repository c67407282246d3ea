//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: chunkvault — zero-trust chunked content sharing.
//

//! Top-level engine API: the surface most callers need, wiring together
//! asset creation/loading, the two-tier cache, velocity detection, and
//! background prefetch behind a handful of methods.
//!
//! ```no_run
//! use chunkvault_core::engine::Engine;
//! use chunkvault_core::identity::User;
//! use uuid::Uuid;
//!
//! # fn main() -> chunkvault_core::error::Result<()> {
//! let engine = Engine::new("/tmp/chunkvault-assets", 4);
//! let sender = User::create("alice", "1234")?;
//! let recipient = User::create("bob", "5678")?;
//!
//! let asset_id = engine.encrypt_bytes_to_asset(
//!     b"hello bob",
//!     sender.user_id,
//!     recipient.user_id,
//!     &recipient.public_key()?,
//!     None,
//!     3600,
//! )?;
//!
//! let recipient_key = recipient.unseal_private_key("5678")?;
//! let handle = engine.load_asset(asset_id, &recipient_key)?;
//! let chunk0 = engine.decrypt_chunk(&handle, 0, &recipient_key)?;
//! # let _ = chunk0;
//! # Ok(())
//! # }
//! ```

use crate::asset::{create_asset, load_asset, ValidatedAsset};
use crate::cache::{DecryptedChunkCache, EncryptedChunkCache};
use crate::config::Config;
use crate::error::Result;
use crate::prefetch::PrefetchManager;
use crate::velocity::VelocityDetector;
use parking_lot::Mutex;
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// A loaded, validated asset handle plus the per-asset velocity tracker
/// that informs its prefetch behavior.
pub struct AssetHandle {
    asset: Arc<ValidatedAsset>,
    velocity: Mutex<VelocityDetector>,
}

impl AssetHandle {
    pub fn manifest(&self) -> &crate::manifest::Manifest {
        self.asset.manifest()
    }

    pub fn metadata(&self) -> &crate::metadata::Metadata {
        self.asset.metadata()
    }

    pub fn chunk_count(&self) -> u32 {
        self.asset.chunk_count()
    }
}

/// The engine: owns the asset root directory, the two cache tiers, the
/// prefetch worker pool, and a registry of open asset handles.
pub struct Engine {
    root_dir: PathBuf,
    decrypted_cache: DecryptedChunkCache,
    encrypted_cache: EncryptedChunkCache,
    prefetch: PrefetchManager,
    handles: Mutex<HashMap<Uuid, Arc<AssetHandle>>>,
    config: Config,
}

impl Engine {
    /// Construct an engine rooted at `root_dir` with `prefetch_workers`
    /// background workers and every other tunable at its spec default.
    pub fn new(root_dir: impl Into<PathBuf>, prefetch_workers: usize) -> Self {
        let config = Config {
            prefetch: crate::config::PrefetchConfig { worker_threads: prefetch_workers, ..Default::default() },
            ..Default::default()
        };
        Self::with_config(root_dir, config)
    }

    /// Construct an engine with every tunable (chunk size, cache
    /// capacities, prefetch windows, worker count) set explicitly.
    pub fn with_config(root_dir: impl Into<PathBuf>, config: Config) -> Self {
        let decrypted_cache = DecryptedChunkCache::new(config.cache.decrypted_capacity);
        let encrypted_cache = EncryptedChunkCache::new(config.cache.encrypted_capacity);
        let prefetch = PrefetchManager::with_config(config.prefetch, decrypted_cache.clone(), encrypted_cache.clone());
        Self {
            root_dir: root_dir.into(),
            decrypted_cache,
            encrypted_cache,
            prefetch,
            handles: Mutex::new(HashMap::new()),
            config,
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Encrypt `plaintext` into a new asset directory, returning its id.
    /// Uses this engine's configured default chunk size.
    #[allow(clippy::too_many_arguments)]
    pub fn encrypt_bytes_to_asset(
        &self,
        plaintext: &[u8],
        sender_id: Uuid,
        recipient_id: Uuid,
        recipient_public_key: &RsaPublicKey,
        filename: Option<String>,
        ttl_seconds: u64,
    ) -> Result<Uuid> {
        let written = create_asset(
            &self.root_dir,
            plaintext,
            sender_id,
            recipient_id,
            recipient_public_key,
            filename,
            ttl_seconds,
            Some(self.config.chunk_size),
        )?;
        Ok(written.asset_id)
    }

    /// Load and validate an asset by id, caching the resulting handle for
    /// subsequent chunk reads.
    pub fn load_asset(&self, asset_id: Uuid, recipient_private_key: &RsaPrivateKey) -> Result<Arc<AssetHandle>> {
        if let Some(handle) = self.handles.lock().get(&asset_id) {
            return Ok(Arc::clone(handle));
        }

        let loaded = load_asset(self.root_dir.join(asset_id.to_string()))?;
        let validated = ValidatedAsset::open(loaded, recipient_private_key)?;
        let handle = Arc::new(AssetHandle {
            asset: Arc::new(validated),
            velocity: Mutex::new(VelocityDetector::new()),
        });
        self.handles.lock().insert(asset_id, Arc::clone(&handle));
        Ok(handle)
    }

    /// How many whole chunks precede `chunk_index`, in bytes — used to feed
    /// the velocity detector a byte offset from a chunk index.
    fn chunk_byte_offset(handle: &AssetHandle, chunk_index: u32) -> u64 {
        chunk_index as u64 * handle.manifest().chunk_size as u64
    }

    /// Decrypt chunk `index` of an open asset handle. Checks the decrypted
    /// cache tier first, falling back to the encrypted tier (skipping
    /// re-reading ciphertext from disk), falling back to a cold read.
    /// Updates the handle's velocity tracker and schedules best-effort
    /// prefetch for subsequent chunks.
    pub fn decrypt_chunk(&self, handle: &Arc<AssetHandle>, index: u32, recipient_private_key: &RsaPrivateKey) -> Result<Vec<u8>> {
        let asset_id = handle.asset.asset_id();

        if let Some(cached) = self.decrypted_cache.get(asset_id, index) {
            self.record_access_and_prefetch(handle, index, recipient_private_key);
            return Ok(cached);
        }

        match self.decrypt_chunk_uncached(handle, asset_id, index, recipient_private_key) {
            Ok(plaintext) => {
                let ttl = remaining_ttl(handle);
                self.decrypted_cache.put(asset_id, index, plaintext.clone(), ttl);
                self.record_access_and_prefetch(handle, index, recipient_private_key);
                Ok(plaintext)
            }
            Err(e) => {
                // §7: integrity failures and expiry are always fatal to the
                // current read and poison the asset for the prefetcher too.
                if matches!(e, crate::error::EngineError::IntegrityFailure(_) | crate::error::EngineError::Expired) {
                    self.abort_asset(asset_id);
                }
                Err(e)
            }
        }
    }

    fn decrypt_chunk_uncached(
        &self,
        handle: &Arc<AssetHandle>,
        asset_id: Uuid,
        index: u32,
        recipient_private_key: &RsaPrivateKey,
    ) -> Result<Vec<u8>> {
        if let Some(encrypted) = self.encrypted_cache.get(asset_id, index) {
            let plaintext = crate::chunking::decrypt_chunk(
                &encrypted.ciphertext,
                &encrypted.wrapped_key,
                &encrypted.nonce,
                recipient_private_key,
            )?;
            let expected_hash = handle.asset.manifest().chunk(index)?.hash.clone();
            if !crate::primitives::constant_time_eq(&crate::chunking::hash_chunk(&plaintext), &expected_hash) {
                return Err(crate::error::EngineError::IntegrityFailure(format!(
                    "chunk {index} hash mismatch"
                )));
            }
            Ok(plaintext)
        } else {
            handle.asset.decrypt_chunk(index, recipient_private_key)
        }
    }

    fn record_access_and_prefetch(&self, handle: &Arc<AssetHandle>, index: u32, recipient_private_key: &RsaPrivateKey) {
        let offset = Self::chunk_byte_offset(handle, index);
        let pattern = handle.velocity.lock().on_range_request(offset);
        if let Some(pattern) = pattern {
            self.prefetch.on_chunk_access(
                Arc::clone(&handle.asset),
                Arc::new(recipient_private_key.clone()),
                index,
                pattern,
                remaining_ttl(handle),
            );
        }
    }

    /// Drop an asset's handle and invalidate both cache tiers for it.
    pub fn abort_asset(&self, asset_id: Uuid) {
        self.handles.lock().remove(&asset_id);
        self.prefetch.abort_asset(asset_id);
    }
}

fn remaining_ttl(handle: &AssetHandle) -> Duration {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
    let expiry = handle.metadata().expiry_at;
    Duration::from_secs(expiry.saturating_sub(now))
}
