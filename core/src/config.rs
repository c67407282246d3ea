//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: chunkvault — zero-trust chunked content sharing.
//

//! Engine-tunable parameters, grouped into plain structs with `Default`
//! impls carrying the spec's literal defaults, rather than free-floating
//! constants scattered across modules.

use crate::manifest::DEFAULT_CHUNK_SIZE;

/// Capacities for the two cache tiers (§4.7).
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    /// Capacity of the decrypted-plaintext chunk tier.
    pub decrypted_capacity: usize,
    /// Capacity of the encrypted-ciphertext chunk tier.
    pub encrypted_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            decrypted_capacity: crate::cache::DECRYPTED_CACHE_CAPACITY,
            encrypted_capacity: crate::cache::ENCRYPTED_CACHE_CAPACITY,
        }
    }
}

/// Prefetch manager tunables (§4.9): how far ahead to decrypt, how far
/// ahead to merely cache ciphertext, and how many background workers drain
/// the work queue.
#[derive(Debug, Clone, Copy)]
pub struct PrefetchConfig {
    /// Width of the short-range (decrypt-and-cache) window, starting two
    /// chunks ahead of the current read regardless of seek pattern.
    pub short_range_window: u32,
    /// Default width of the long-range (ciphertext-only) window; the
    /// concrete start/end per pattern follow the table in spec §4.9, which
    /// uses this as the `Sequential` case's window width.
    pub long_range_window: u32,
    /// Number of background worker threads draining the prefetch queue.
    pub worker_threads: usize,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            short_range_window: 3,
            long_range_window: 10,
            worker_threads: 2,
        }
    }
}

/// Top-level engine configuration: chunk size for new assets, cache
/// tier sizing, and prefetch behavior. Mirrors the teacher's style of
/// grouping related tunables into a config struct passed at construction
/// time rather than a global/config-file layer.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Plaintext chunk size used by `encrypt_bytes_to_asset` when the
    /// caller doesn't override it.
    pub chunk_size: usize,
    pub cache: CacheConfig,
    pub prefetch: PrefetchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            cache: CacheConfig::default(),
            prefetch: PrefetchConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_literals() {
        let config = Config::default();
        assert_eq!(config.chunk_size, 4 * 1024 * 1024);
        assert_eq!(config.cache.decrypted_capacity, 10);
        assert_eq!(config.cache.encrypted_capacity, 30);
        assert_eq!(config.prefetch.short_range_window, 3);
        assert_eq!(config.prefetch.long_range_window, 10);
        assert_eq!(config.prefetch.worker_threads, 2);
    }
}
