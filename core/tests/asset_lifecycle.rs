//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: chunkvault — zero-trust chunked content sharing.
//

//! End-to-end asset lifecycle scenarios, exercised through the public
//! `Engine` and `asset` APIs the way an external caller would use them.

use chunkvault_core::asset::{create_asset, load_asset, ValidatedAsset};
use chunkvault_core::engine::Engine;
use chunkvault_core::error::EngineError;
use chunkvault_core::identity::User;
use rsa::RsaPublicKey;
use std::fs;
use uuid::Uuid;

fn keypair() -> (rsa::RsaPrivateKey, RsaPublicKey) {
    let private = chunkvault_core::primitives::generate_rsa_keypair();
    let public = RsaPublicKey::from(&private);
    (private, public)
}

#[test]
fn happy_path_small_asset() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::new(dir.path(), 2);
    let recipient = User::create("bob", "2468").unwrap();
    let recipient_key = recipient.unseal_private_key("2468").unwrap();

    let asset_id = engine
        .encrypt_bytes_to_asset(
            b"a small message",
            Uuid::new_v4(),
            recipient.user_id,
            &recipient.public_key().unwrap(),
            Some("note.txt".to_string()),
            3600,
        )
        .unwrap();

    let handle = engine.load_asset(asset_id, &recipient_key).unwrap();
    assert_eq!(handle.chunk_count(), 1);
    assert_eq!(handle.metadata().filename, "note.txt");

    let plaintext = engine.decrypt_chunk(&handle, 0, &recipient_key).unwrap();
    assert_eq!(plaintext, b"a small message");
}

#[test]
fn happy_path_large_multi_chunk_asset() {
    let dir = tempfile::tempdir().unwrap();
    let (private, public) = keypair();

    let data: Vec<u8> = (0..10_000_000u32).map(|i| (i % 251) as u8).collect();
    let written = create_asset(dir.path(), &data, Uuid::new_v4(), Uuid::new_v4(), &public, None, 3600, Some(1024 * 1024)).unwrap();

    let loaded = load_asset(&written.paths.root()).unwrap();
    let validated = ValidatedAsset::open(loaded, &private).unwrap();
    assert_eq!(validated.chunk_count(), 10);

    let mut reassembled = Vec::with_capacity(data.len());
    for i in 0..validated.chunk_count() {
        reassembled.extend(validated.decrypt_chunk(i, &private).unwrap());
    }
    assert_eq!(reassembled, data);
}

#[test]
fn wrong_pin_never_unseals_private_key() {
    let sender = User::create("alice", "9090").unwrap();
    assert!(!sender.verify_pin("0909"));
    let err = sender.unseal_private_key("0909").unwrap_err();
    assert!(matches!(err, EngineError::AuthFailed));
}

#[test]
fn expired_asset_is_rejected_at_validation() {
    let dir = tempfile::tempdir().unwrap();
    let (private, public) = keypair();

    let written = create_asset(dir.path(), b"will expire", Uuid::new_v4(), Uuid::new_v4(), &public, None, 0, None).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(1100));

    let loaded = load_asset(&written.paths.root()).unwrap();
    let err = ValidatedAsset::open(loaded, &private).unwrap_err();
    assert!(matches!(err, EngineError::Expired));
}

#[test]
fn tampered_manifest_is_rejected_before_any_chunk_is_read() {
    let dir = tempfile::tempdir().unwrap();
    let (private, public) = keypair();

    let written = create_asset(dir.path(), b"integrity matters here", Uuid::new_v4(), Uuid::new_v4(), &public, None, 3600, None).unwrap();

    // Swap in an entirely different (but structurally valid) manifest.
    let mut manifest: chunkvault_core::manifest::Manifest =
        serde_json::from_slice(&fs::read(written.paths.manifest()).unwrap()).unwrap();
    manifest.chunks[0].hash = "0".repeat(64);
    fs::write(written.paths.manifest(), manifest.to_canonical_bytes().unwrap()).unwrap();

    let loaded = load_asset(&written.paths.root()).unwrap();
    let err = ValidatedAsset::open(loaded, &private).unwrap_err();
    assert!(matches!(err, EngineError::IntegrityFailure(_)));
}

#[test]
fn tampered_chunk_ciphertext_fails_integrity_check_on_decrypt() {
    let dir = tempfile::tempdir().unwrap();
    let (private, public) = keypair();

    let written = create_asset(dir.path(), b"do not modify this chunk data please", Uuid::new_v4(), Uuid::new_v4(), &public, None, 3600, None).unwrap();

    let mut ciphertext = fs::read(written.paths.chunk_ciphertext(0)).unwrap();
    ciphertext[5] ^= 0x01;
    fs::write(written.paths.chunk_ciphertext(0), ciphertext).unwrap();

    let loaded = load_asset(&written.paths.root()).unwrap();
    let validated = ValidatedAsset::open(loaded, &private).unwrap();
    let err = validated.decrypt_chunk(0, &private).unwrap_err();
    assert!(matches!(err, EngineError::IntegrityFailure(_)));
}

#[test]
fn wrong_recipient_key_fails_at_metadata_decryption() {
    let dir = tempfile::tempdir().unwrap();
    let (_, public) = keypair();
    let (wrong_private, _) = keypair();

    let written = create_asset(dir.path(), b"addressed to someone else", Uuid::new_v4(), Uuid::new_v4(), &public, None, 3600, None).unwrap();

    let loaded = load_asset(&written.paths.root()).unwrap();
    let err = ValidatedAsset::open(loaded, &wrong_private).unwrap_err();
    assert!(matches!(err, EngineError::AuthFailed));
}

#[test]
fn empty_plaintext_produces_zero_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let (private, public) = keypair();
    let written = create_asset(dir.path(), b"", Uuid::new_v4(), Uuid::new_v4(), &public, None, 3600, None).unwrap();
    let loaded = load_asset(&written.paths.root()).unwrap();
    let validated = ValidatedAsset::open(loaded, &private).unwrap();
    assert_eq!(validated.chunk_count(), 0);
}

#[test]
fn missing_filename_defaults_to_unknown_bin() {
    let dir = tempfile::tempdir().unwrap();
    let (private, public) = keypair();
    let written = create_asset(dir.path(), b"nameless", Uuid::new_v4(), Uuid::new_v4(), &public, None, 3600, None).unwrap();
    let loaded = load_asset(&written.paths.root()).unwrap();
    let validated = ValidatedAsset::open(loaded, &private).unwrap();
    assert_eq!(validated.metadata().filename, "unknown.bin");
}
