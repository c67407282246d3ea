//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: chunkvault — zero-trust chunked content sharing.
//

//! # Layer 1: Cryptographic Primitives
//!
//! Pure cryptographic primitives with no business logic, no I/O, no key
//! management. Every other module in this crate is built on top of these
//! functions.
//!
//! **CAN import:** standard library, `aes`, `ctr`, `cbc`, `rsa`, `pbkdf2`,
//! `sha2`, `rand_core`.
//!
//! **NEVER imports:** `identity`, `manifest`, `asset`, `engine`, `cache`,
//! `prefetch` — those are built on this layer, not the other way around.

use crate::error::{EngineError, Result};
use crate::secret::Secret;
use aes::Aes256;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, StreamCipher};
use rand_core::{OsRng, RngCore};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};

/// Length in bytes of an AES-CTR / AES-CBC nonce or IV used throughout this crate.
pub const IV_LEN: usize = 16;
/// Length in bytes of a freshly generated AES-256 key.
pub const AES_KEY_LEN: usize = 32;
/// RSA modulus size used for every identity in this engine; non-negotiable.
pub const RSA_KEY_BITS: usize = 2048;
/// PBKDF2-HMAC-SHA256 iteration count for PIN-based key sealing.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

type Aes256CtrBe = ctr::Ctr128BE<Aes256>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Generate `n` cryptographically random bytes from the OS CSPRNG.
pub fn random_bytes(n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    OsRng.fill_bytes(&mut buf);
    buf
}

/// Generate a fresh random AES-256 key.
pub fn random_aes_key() -> [u8; AES_KEY_LEN] {
    let mut key = [0u8; AES_KEY_LEN];
    OsRng.fill_bytes(&mut key);
    key
}

/// Generate a fresh random 128-bit nonce/IV.
pub fn random_iv() -> [u8; IV_LEN] {
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    iv
}

/// Encrypt `plaintext` in place with AES-256-CTR under `key`/`nonce`.
/// CTR mode: ciphertext length equals plaintext length.
pub fn aes_ctr_encrypt(key: &[u8; AES_KEY_LEN], nonce: &[u8; IV_LEN], plaintext: &[u8]) -> Vec<u8> {
    let mut buf = plaintext.to_vec();
    let mut cipher = Aes256CtrBe::new_from_slices(key, nonce).expect("key/nonce are fixed-size arrays");
    cipher.apply_keystream(&mut buf);
    buf
}

/// Decrypt `ciphertext` with AES-256-CTR under `key`/`nonce`. CTR is its own
/// inverse, so this is identical to [`aes_ctr_encrypt`]; kept as a distinct
/// name for call-site clarity.
pub fn aes_ctr_decrypt(key: &[u8; AES_KEY_LEN], nonce: &[u8; IV_LEN], ciphertext: &[u8]) -> Vec<u8> {
    aes_ctr_encrypt(key, nonce, ciphertext)
}

/// Encrypt `plaintext` with AES-256-CBC + PKCS#7 padding under `key`/`iv`.
pub fn aes_cbc_encrypt(key: &[u8; AES_KEY_LEN], iv: &[u8; IV_LEN], plaintext: &[u8]) -> Vec<u8> {
    let cipher = Aes256CbcEnc::new_from_slices(key, iv).expect("key/iv are fixed-size arrays");
    cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

/// Decrypt `ciphertext` with AES-256-CBC + PKCS#7 padding under `key`/`iv`.
/// Fails with [`EngineError::AuthFailed`] on bad padding (wrong key or
/// tampered/corrupted ciphertext) — callers must not distinguish the cause.
pub fn aes_cbc_decrypt(key: &[u8; AES_KEY_LEN], iv: &[u8; IV_LEN], ciphertext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256CbcDec::new_from_slices(key, iv).expect("key/iv are fixed-size arrays");
    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| EngineError::AuthFailed)
}

/// Derive a 256-bit key from a PIN via PBKDF2-HMAC-SHA256 with 100,000
/// iterations, matching the teacher's `universal_keyring.rs` call shape.
/// Returned wrapped in [`Secret`] so the derived key is zeroized on drop
/// rather than lingering in a plain stack array.
pub fn derive_key_from_pin(pin: &str, salt: &[u8; 16]) -> Secret<[u8; AES_KEY_LEN]> {
    let mut key = [0u8; AES_KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(pin.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key);
    Secret::new(key)
}

/// SHA-256 of `data`, hex-encoded lowercase.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Generate a fresh RSA-2048 key pair.
pub fn generate_rsa_keypair() -> RsaPrivateKey {
    RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS).expect("RSA-2048 keypair generation failed")
}

/// Wrap a 256-bit AES key under an RSA-2048-OAEP-SHA256 public key. These
/// OAEP parameters (MGF1+SHA-256, hash SHA-256, empty label) are
/// non-negotiable and must match on unwrap.
pub fn rsa_wrap_key(public_key: &RsaPublicKey, aes_key: &[u8; AES_KEY_LEN]) -> Result<Vec<u8>> {
    let padding = Oaep::new::<Sha256>();
    public_key
        .encrypt(&mut OsRng, padding, aes_key)
        .map_err(|e| EngineError::InvalidInput(format!("RSA wrap failed: {e}")))
}

/// Unwrap an RSA-2048-OAEP-SHA256-wrapped AES key. Any failure (wrong
/// recipient, tamper, corruption) collapses to [`EngineError::AuthFailed`].
pub fn rsa_unwrap_key(private_key: &RsaPrivateKey, wrapped: &[u8]) -> Result<[u8; AES_KEY_LEN]> {
    let padding = Oaep::new::<Sha256>();
    let bytes = private_key
        .decrypt(padding, wrapped)
        .map_err(|_| EngineError::AuthFailed)?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| EngineError::AuthFailed)
}

/// Constant-time equality for hash/digest comparisons (manifest hash, chunk
/// hash). Ordinary `==` on short hex strings is not guaranteed constant-time.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
