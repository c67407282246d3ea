//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: chunkvault — zero-trust chunked content sharing.
//

//! # chunkvault-core
//!
//! A zero-trust, chunked content-sharing engine: PIN-sealed RSA-2048
//! identities, per-chunk AES-256-CTR encryption with RSA-OAEP key wrapping,
//! SHA-256 integrity hashing, and a velocity-aware two-tier cache and
//! prefetch manager for progressive, seekable reads.
//!
//! ## Architecture
//!
//! ```text
//! primitives   — AES-CTR/CBC, RSA-OAEP, PBKDF2, SHA-256 (no business logic)
//! identity     — PIN-sealed RSA identities
//! chunking     — plaintext chunking, per-chunk encrypt/decrypt/hash
//! manifest     — chunk layout description, canonical hashing
//! metadata     — expiry/sender/recipient, RSA-wrapped like a chunk
//! asset        — on-disk layout, create/load/validate lifecycle
//! cache        — two-tier LRU (decrypted + encrypted), TTL-aware
//! velocity     — sliding-window seek-pattern classification
//! prefetch     — best-effort background fetch driven by velocity
//! engine       — the orchestration surface most callers use
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use chunkvault_core::engine::Engine;
//! use chunkvault_core::identity::User;
//!
//! # fn main() -> chunkvault_core::error::Result<()> {
//! let engine = Engine::new("/tmp/chunkvault-assets", 4);
//! let recipient = User::create("bob", "5678")?;
//!
//! let asset_id = engine.encrypt_bytes_to_asset(
//!     b"hello bob",
//!     uuid::Uuid::new_v4(),
//!     recipient.user_id,
//!     &recipient.public_key()?,
//!     None,
//!     3600,
//! )?;
//!
//! let key = recipient.unseal_private_key("5678")?;
//! let handle = engine.load_asset(asset_id, &key)?;
//! let chunk0 = engine.decrypt_chunk(&handle, 0, &key)?;
//! # let _ = chunk0;
//! # Ok(())
//! # }
//! ```
//!
//! Every fallible call returns [`error::EngineError`]. Authentication
//! failures — wrong PIN, wrong recipient key, tampered blob — are never
//! distinguished from one another in the returned error: see
//! [`error::EngineError::AuthFailed`].

pub mod asset;
pub mod cache;
pub mod chunking;
pub mod config;
pub mod engine;
pub mod error;
mod hexenc;
pub mod identity;
pub mod manifest;
pub mod metadata;
pub mod prefetch;
pub mod primitives;
pub mod secret;
pub mod velocity;

pub use engine::Engine;
pub use error::{EngineError, Result};
pub use identity::User;
