//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: chunkvault — zero-trust chunked content sharing.
//

//! Unified error hierarchy for the chunkvault engine.
//!
//! `EngineError` is the single typed error every public engine call returns.
//! `AuthFailed` deliberately conflates "wrong PIN", "wrong recipient key",
//! and "corrupted blob" — the taxonomy in spec §7 forbids distinguishing
//! these to a caller.

use thiserror::Error;

/// Top-level error type returned by every `chunkvault_core` engine operation.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("authentication failed")]
    AuthFailed,

    #[error("malformed asset: {0}")]
    MalformedAsset(String),

    #[error("integrity check failed: {0}")]
    IntegrityFailure(String),

    #[error("asset expired")]
    Expired,

    #[error("chunk index out of range: {index} (total {total})")]
    OutOfRange { index: u32, total: u32 },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::MalformedAsset(format!("json: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
