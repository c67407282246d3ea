//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: chunkvault — zero-trust chunked content sharing.
//

//! Best-effort background prefetching, driven by [`crate::velocity`]'s
//! classification of the caller's recent read pattern.
//!
//! A short-range task decrypts and stores plaintext in the decrypted
//! cache tier, ready for the immediate next read. A long-range task only
//! fetches and stores ciphertext in the encrypted tier, trading a cheap
//! disk read now for a cheap decrypt later instead of a cold disk read.
//!
//! Every job is best-effort: a prefetch failure is logged and dropped,
//! never surfaced to a foreground caller, and every asset's own abort flag
//! makes stale jobs (after an asset is invalidated or closed) cheap no-ops
//! rather than wasted work.

use crate::asset::ValidatedAsset;
use crate::cache::{DecryptedChunkCache, EncryptedChunkCache, EncryptedChunkEntry};
use crate::config::PrefetchConfig;
use crate::velocity::SeekPattern;
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::RwLock;
use rsa::RsaPrivateKey;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Depth of the shared work queue. Prefetching is best-effort; once the
/// queue is full, new jobs are dropped rather than blocking the caller.
const QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PrefetchKind {
    ShortRange,
    LongRange,
}

struct PrefetchJob {
    asset: Arc<ValidatedAsset>,
    private_key: Arc<RsaPrivateKey>,
    chunk_index: u32,
    kind: PrefetchKind,
    abort: Arc<AtomicBool>,
    ttl: Duration,
}

/// Indices to prefetch for a forward pattern: a `short_range`-wide window
/// for the decrypted tier and the pattern-dependent long-range window from
/// spec §4.9 for the encrypted tier.
struct ForwardWindow {
    long_range: std::ops::Range<u32>,
}

/// Long-range windows are fixed by spec §4.9's table; only `Sequential`'s
/// width matches the configurable `long_range_window` default (10).
fn forward_window_for(pattern: SeekPattern, current: u32) -> Option<ForwardWindow> {
    match pattern {
        SeekPattern::Sequential => Some(ForwardWindow {
            long_range: current.saturating_add(5)..current.saturating_add(15),
        }),
        SeekPattern::SlowForward => Some(ForwardWindow {
            long_range: current.saturating_add(10)..current.saturating_add(20),
        }),
        SeekPattern::ForwardScrub => Some(ForwardWindow {
            long_range: current.saturating_add(15)..current.saturating_add(30),
        }),
        // Handled separately: no forward window, decrypted cache invalidated instead.
        SeekPattern::BackwardJump => None,
    }
}

/// Coordinates a bounded worker pool that executes best-effort prefetch
/// jobs against the two cache tiers.
pub struct PrefetchManager {
    sender: Sender<PrefetchJob>,
    abort_flags: Arc<RwLock<HashMap<Uuid, Arc<AtomicBool>>>>,
    decrypted_cache: DecryptedChunkCache,
    encrypted_cache: EncryptedChunkCache,
    config: PrefetchConfig,
}

impl PrefetchManager {
    pub fn new(worker_count: usize, decrypted_cache: DecryptedChunkCache, encrypted_cache: EncryptedChunkCache) -> Self {
        Self::with_config(
            PrefetchConfig { worker_threads: worker_count, ..PrefetchConfig::default() },
            decrypted_cache,
            encrypted_cache,
        )
    }

    pub fn with_config(config: PrefetchConfig, decrypted_cache: DecryptedChunkCache, encrypted_cache: EncryptedChunkCache) -> Self {
        let (sender, receiver) = bounded(QUEUE_CAPACITY);
        for _ in 0..config.worker_threads.max(1) {
            spawn_worker(receiver.clone(), decrypted_cache.clone(), encrypted_cache.clone());
        }
        Self {
            sender,
            abort_flags: Arc::new(RwLock::new(HashMap::new())),
            decrypted_cache,
            encrypted_cache,
            config,
        }
    }

    fn abort_flag_for(&self, asset_id: Uuid) -> Arc<AtomicBool> {
        if let Some(flag) = self.abort_flags.read().get(&asset_id) {
            return Arc::clone(flag);
        }
        Arc::clone(
            self.abort_flags
                .write()
                .entry(asset_id)
                .or_insert_with(|| Arc::new(AtomicBool::new(false))),
        )
    }

    /// Called after a foreground read of `chunk_index` completes. Schedules
    /// short- and long-range prefetch jobs ahead of it, windowed by
    /// `pattern`. [`SeekPattern::BackwardJump`] instead invalidates the
    /// decrypted cache for this asset and schedules a backward-looking
    /// long-range (ciphertext-only) window, per spec §4.9.
    pub fn on_chunk_access(
        &self,
        asset: Arc<ValidatedAsset>,
        private_key: Arc<RsaPrivateKey>,
        chunk_index: u32,
        pattern: SeekPattern,
        remaining_ttl: Duration,
    ) {
        let asset_id = asset.asset_id();
        let total = asset.chunk_count();
        let abort = self.abort_flag_for(asset_id);

        if pattern == SeekPattern::BackwardJump {
            self.decrypted_cache.invalidate(asset_id);
            let start = chunk_index.saturating_sub(15);
            for index in start..chunk_index.min(total) {
                self.submit(PrefetchJob {
                    asset: Arc::clone(&asset),
                    private_key: Arc::clone(&private_key),
                    chunk_index: index,
                    kind: PrefetchKind::LongRange,
                    abort: Arc::clone(&abort),
                    ttl: remaining_ttl,
                });
            }
            return;
        }

        let Some(window) = forward_window_for(pattern, chunk_index) else { return };

        let short_start = chunk_index.saturating_add(2);
        for index in short_start..short_start.saturating_add(self.config.short_range_window).min(total) {
            self.submit(PrefetchJob {
                asset: Arc::clone(&asset),
                private_key: Arc::clone(&private_key),
                chunk_index: index,
                kind: PrefetchKind::ShortRange,
                abort: Arc::clone(&abort),
                ttl: remaining_ttl,
            });
        }

        for index in window.long_range.start..window.long_range.end.min(total) {
            self.submit(PrefetchJob {
                asset: Arc::clone(&asset),
                private_key: Arc::clone(&private_key),
                chunk_index: index,
                kind: PrefetchKind::LongRange,
                abort: Arc::clone(&abort),
                ttl: remaining_ttl,
            });
        }
    }

    fn submit(&self, job: PrefetchJob) {
        // Best-effort: a full queue means we drop the job rather than
        // block the foreground caller that triggered prefetching.
        let _ = self.sender.try_send(job);
    }

    /// Mark `asset_id`'s in-flight and future prefetch jobs as stale.
    /// Workers check this flag before doing any work and before writing a
    /// result into either cache tier.
    pub fn abort_asset(&self, asset_id: Uuid) {
        self.abort_flag_for(asset_id).store(true, Ordering::SeqCst);
        self.decrypted_cache.invalidate(asset_id);
        self.encrypted_cache.invalidate(asset_id);
        self.abort_flags.write().remove(&asset_id);
    }
}

fn spawn_worker(receiver: Receiver<PrefetchJob>, decrypted_cache: DecryptedChunkCache, encrypted_cache: EncryptedChunkCache) {
    std::thread::spawn(move || {
        while let Ok(job) = receiver.recv() {
            if job.abort.load(Ordering::SeqCst) {
                continue;
            }
            run_job(&job, &decrypted_cache, &encrypted_cache);
        }
    });
}

fn run_job(job: &PrefetchJob, decrypted_cache: &DecryptedChunkCache, encrypted_cache: &EncryptedChunkCache) {
    let asset_id = job.asset.asset_id();

    if job.asset.ensure_not_expired().is_err() {
        return;
    }

    match job.kind {
        PrefetchKind::ShortRange => {
            if decrypted_cache.get(asset_id, job.chunk_index).is_some() {
                return;
            }
            match job.asset.decrypt_chunk(job.chunk_index, &job.private_key) {
                Ok(plaintext) => {
                    if !job.abort.load(Ordering::SeqCst) {
                        decrypted_cache.put(asset_id, job.chunk_index, plaintext, job.ttl);
                    }
                }
                Err(e) => {
                    tracing::debug!(asset = %asset_id, chunk = job.chunk_index, error = %e, "short-range prefetch failed");
                }
            }
        }
        PrefetchKind::LongRange => {
            if encrypted_cache.get(asset_id, job.chunk_index).is_some() {
                return;
            }
            match job.asset.read_encrypted_chunk(job.chunk_index) {
                Ok((ciphertext, wrapped_key, nonce)) => {
                    if !job.abort.load(Ordering::SeqCst) {
                        encrypted_cache.put(
                            asset_id,
                            job.chunk_index,
                            EncryptedChunkEntry { ciphertext, wrapped_key, nonce },
                        );
                    }
                }
                Err(e) => {
                    tracing::debug!(asset = %asset_id, chunk = job.chunk_index, error = %e, "long-range prefetch failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{create_asset, load_asset, ValidatedAsset};
    use rsa::RsaPublicKey;
    use std::time::Duration;
    use tempfile::tempdir;

    fn keypair() -> (RsaPrivateKey, RsaPublicKey) {
        let private = crate::primitives::generate_rsa_keypair();
        let public = RsaPublicKey::from(&private);
        (private, public)
    }

    #[test]
    fn sequential_access_populates_decrypted_cache_eventually() {
        let dir = tempdir().unwrap();
        let (private, public) = keypair();
        let data = vec![7u8; 1024 * 10];
        let written = create_asset(dir.path(), &data, Uuid::new_v4(), Uuid::new_v4(), &public, None, 3600, Some(1024)).unwrap();
        let loaded = load_asset(&written.paths.root()).unwrap();
        let validated = Arc::new(ValidatedAsset::open(loaded, &private).unwrap());
        let private = Arc::new(private);

        let decrypted = DecryptedChunkCache::new(10);
        let encrypted = EncryptedChunkCache::new(30);
        let manager = PrefetchManager::new(2, decrypted.clone(), encrypted.clone());

        manager.on_chunk_access(
            Arc::clone(&validated),
            Arc::clone(&private),
            0,
            SeekPattern::Sequential,
            Duration::from_secs(3600),
        );

        // Prefetch is best-effort and async; give workers a moment.
        std::thread::sleep(Duration::from_millis(200));
        assert!(decrypted.len() > 0 || encrypted.len() > 0);
    }

    #[test]
    fn backward_jump_at_the_start_schedules_nothing() {
        let dir = tempdir().unwrap();
        let (private, public) = keypair();
        let written = create_asset(dir.path(), b"abcdefgh", Uuid::new_v4(), Uuid::new_v4(), &public, None, 3600, None).unwrap();
        let loaded = load_asset(&written.paths.root()).unwrap();
        let validated = Arc::new(ValidatedAsset::open(loaded, &private).unwrap());
        let private = Arc::new(private);

        let decrypted = DecryptedChunkCache::new(10);
        let encrypted = EncryptedChunkCache::new(30);
        let manager = PrefetchManager::new(1, decrypted.clone(), encrypted.clone());

        // current == 0: the backward window [max(0-15,0), 0) is empty.
        manager.on_chunk_access(validated, private, 0, SeekPattern::BackwardJump, Duration::from_secs(60));
        std::thread::sleep(Duration::from_millis(50));
        assert!(decrypted.is_empty());
        assert!(encrypted.is_empty());
    }

    #[test]
    fn backward_jump_invalidates_decrypted_cache_and_fetches_ciphertext_behind() {
        let dir = tempdir().unwrap();
        let (private, public) = keypair();
        let data = vec![3u8; 1024 * 20];
        let written = create_asset(dir.path(), &data, Uuid::new_v4(), Uuid::new_v4(), &public, None, 3600, Some(1024)).unwrap();
        let loaded = load_asset(&written.paths.root()).unwrap();
        let validated = Arc::new(ValidatedAsset::open(loaded, &private).unwrap());
        let asset_id = validated.asset_id();
        let private = Arc::new(private);

        let decrypted = DecryptedChunkCache::new(10);
        let encrypted = EncryptedChunkCache::new(30);
        decrypted.put(asset_id, 5, vec![0xAA], Duration::from_secs(60));
        let manager = PrefetchManager::new(2, decrypted.clone(), encrypted.clone());

        // Jump backward from chunk 10: decrypted cache for this asset drops
        // immediately, and chunks [0, 10) are scheduled for ciphertext-only
        // fetch behind the current position.
        manager.on_chunk_access(Arc::clone(&validated), private, 10, SeekPattern::BackwardJump, Duration::from_secs(3600));

        assert!(decrypted.get(asset_id, 5).is_none());

        std::thread::sleep(Duration::from_millis(200));
        assert!(encrypted.get(asset_id, 0).is_some());
        assert!(decrypted.is_empty(), "backward-jump prefetch must not populate the decrypted tier");
    }

    #[test]
    fn abort_asset_clears_both_tiers() {
        let decrypted = DecryptedChunkCache::new(10);
        let encrypted = EncryptedChunkCache::new(30);
        let manager = PrefetchManager::new(1, decrypted.clone(), encrypted.clone());
        let asset_id = Uuid::new_v4();
        decrypted.put(asset_id, 0, vec![1], Duration::from_secs(60));
        manager.abort_asset(asset_id);
        assert!(decrypted.get(asset_id, 0).is_none());
    }
}
