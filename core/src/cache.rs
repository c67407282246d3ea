//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: chunkvault — zero-trust chunked content sharing.
//

//! Two-tier chunk cache: a small decrypted-plaintext tier with per-entry
//! expiry, and a larger encrypted-ciphertext tier with no expiry of its own
//! (an asset's validity is re-checked on every read regardless).
//!
//! Both tiers share the same `Arc<RwLock<LruCache<..>>>` wrapper shape,
//! generalized from a plain key/value LRU into one that also tracks a
//! per-entry deadline for the decrypted tier.

use lru::LruCache;
use parking_lot::RwLock;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Default capacity of the decrypted-plaintext chunk tier.
pub const DECRYPTED_CACHE_CAPACITY: usize = 10;
/// Default capacity of the encrypted-ciphertext chunk tier.
pub const ENCRYPTED_CACHE_CAPACITY: usize = 30;

type ChunkKey = (Uuid, u32);

struct DecryptedEntry {
    data: Vec<u8>,
    expires_at: Instant,
}

/// LRU cache of decrypted chunk plaintext. Each entry expires independently
/// (mirroring an asset's own expiry) and is evicted lazily on the next
/// access past its deadline rather than by a background sweep.
pub struct DecryptedChunkCache {
    inner: Arc<RwLock<LruCache<ChunkKey, DecryptedEntry>>>,
}

impl DecryptedChunkCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(LruCache::new(
                NonZeroUsize::new(capacity).expect("cache capacity must be nonzero"),
            ))),
        }
    }

    /// Fetch a cached chunk. Returns `None` and evicts the entry if its
    /// per-entry deadline has already passed.
    pub fn get(&self, asset_id: Uuid, chunk_index: u32) -> Option<Vec<u8>> {
        let key = (asset_id, chunk_index);
        let mut guard = self.inner.write();
        let expired = matches!(guard.peek(&key), Some(entry) if Instant::now() > entry.expires_at);
        if expired {
            guard.pop(&key);
            return None;
        }
        guard.get(&key).map(|entry| entry.data.clone())
    }

    /// Insert a decrypted chunk with a deadline `ttl` from now (typically
    /// the asset's remaining time-to-expiry).
    pub fn put(&self, asset_id: Uuid, chunk_index: u32, data: Vec<u8>, ttl: Duration) {
        let key = (asset_id, chunk_index);
        let entry = DecryptedEntry {
            data,
            expires_at: Instant::now() + ttl,
        };
        self.inner.write().put(key, entry);
    }

    /// Drop every cached chunk belonging to `asset_id` (e.g. on abort, or
    /// once the asset is known to have expired).
    pub fn invalidate(&self, asset_id: Uuid) {
        let mut guard = self.inner.write();
        let stale: Vec<ChunkKey> = guard
            .iter()
            .filter(|(k, _)| k.0 == asset_id)
            .map(|(k, _)| *k)
            .collect();
        for key in stale {
            guard.pop(&key);
        }
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl Clone for DecryptedChunkCache {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

/// A cached encrypted chunk bundle: ciphertext, wrapped key, nonce.
#[derive(Clone)]
pub struct EncryptedChunkEntry {
    pub ciphertext: Vec<u8>,
    pub wrapped_key: Vec<u8>,
    pub nonce: [u8; crate::primitives::IV_LEN],
}

/// LRU cache of raw encrypted chunk bundles, fed by long-range prefetch.
/// No per-entry expiry: ciphertext alone is not secret-bearing once the
/// asset's own validity has been established for a read, and re-deriving it
/// from disk costs nothing the cache especially protects against.
pub struct EncryptedChunkCache {
    inner: Arc<RwLock<LruCache<ChunkKey, EncryptedChunkEntry>>>,
}

impl EncryptedChunkCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(LruCache::new(
                NonZeroUsize::new(capacity).expect("cache capacity must be nonzero"),
            ))),
        }
    }

    pub fn get(&self, asset_id: Uuid, chunk_index: u32) -> Option<EncryptedChunkEntry> {
        self.inner.write().get(&(asset_id, chunk_index)).cloned()
    }

    pub fn put(&self, asset_id: Uuid, chunk_index: u32, entry: EncryptedChunkEntry) {
        self.inner.write().put((asset_id, chunk_index), entry);
    }

    pub fn invalidate(&self, asset_id: Uuid) {
        let mut guard = self.inner.write();
        let stale: Vec<ChunkKey> = guard
            .iter()
            .filter(|(k, _)| k.0 == asset_id)
            .map(|(k, _)| *k)
            .collect();
        for key in stale {
            guard.pop(&key);
        }
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl Clone for EncryptedChunkCache {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decrypted_cache_put_get_roundtrip() {
        let cache = DecryptedChunkCache::new(4);
        let asset = Uuid::new_v4();
        cache.put(asset, 0, vec![1, 2, 3], Duration::from_secs(60));
        assert_eq!(cache.get(asset, 0), Some(vec![1, 2, 3]));
    }

    #[test]
    fn decrypted_cache_evicts_expired_entry_on_get() {
        let cache = DecryptedChunkCache::new(4);
        let asset = Uuid::new_v4();
        cache.put(asset, 0, vec![9], Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.get(asset, 0), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn decrypted_cache_respects_capacity() {
        let cache = DecryptedChunkCache::new(2);
        let asset = Uuid::new_v4();
        cache.put(asset, 0, vec![0], Duration::from_secs(60));
        cache.put(asset, 1, vec![1], Duration::from_secs(60));
        cache.put(asset, 2, vec![2], Duration::from_secs(60));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(asset, 0), None);
    }

    #[test]
    fn invalidate_removes_only_matching_asset() {
        let cache = DecryptedChunkCache::new(8);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        cache.put(a, 0, vec![1], Duration::from_secs(60));
        cache.put(b, 0, vec![2], Duration::from_secs(60));
        cache.invalidate(a);
        assert_eq!(cache.get(a, 0), None);
        assert_eq!(cache.get(b, 0), Some(vec![2]));
    }

    #[test]
    fn encrypted_cache_put_get_roundtrip() {
        let cache = EncryptedChunkCache::new(4);
        let asset = Uuid::new_v4();
        let entry = EncryptedChunkEntry {
            ciphertext: vec![1, 2],
            wrapped_key: vec![3, 4],
            nonce: [0u8; 16],
        };
        cache.put(asset, 0, entry);
        assert!(cache.get(asset, 0).is_some());
    }

    #[test]
    fn clear_empties_both_tiers() {
        let decrypted = DecryptedChunkCache::new(4);
        let encrypted = EncryptedChunkCache::new(4);
        let asset = Uuid::new_v4();
        decrypted.put(asset, 0, vec![1], Duration::from_secs(60));
        encrypted.put(asset, 0, EncryptedChunkEntry { ciphertext: vec![], wrapped_key: vec![], nonce: [0u8; 16] });
        decrypted.clear();
        encrypted.clear();
        assert!(decrypted.is_empty());
        assert!(encrypted.is_empty());
    }
}
