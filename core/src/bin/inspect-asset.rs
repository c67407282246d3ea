//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: chunkvault — zero-trust chunked content sharing.
//
//! Simple utility to inspect an asset's manifest without needing a PIN.
//!
//! Only reads `manifest.json`; metadata stays encrypted, so the recipient,
//! expiry, and filename are not shown. Usage: `inspect-asset <asset_dir>`.

use anyhow::{Context, Result};
use chunkvault_core::asset::load_asset;
use std::env;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <asset_dir>", args[0]);
        std::process::exit(1);
    }

    let loaded = load_asset(&args[1]).context("failed to load asset manifest")?;
    let manifest = loaded.manifest;

    println!("Asset: {}", manifest.asset_id);
    println!("  Manifest version: {}", manifest.version);
    println!("  Chunk size:       {} bytes", manifest.chunk_size);
    println!("  Total size:       {} bytes", manifest.total_size);
    println!("  Total chunks:     {}", manifest.total_chunks);
    println!("  Metadata block:   {}", manifest.metadata_block);
    println!("  Manifest hash:    {}", manifest.hash()?);
    for entry in &manifest.chunks {
        println!("    chunk {:>4}: {} bytes, sha256={}", entry.index, entry.size, entry.hash);
    }

    Ok(())
}
