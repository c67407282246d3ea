//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: chunkvault — zero-trust chunked content sharing.
//

//! Splitting plaintext into fixed-size chunks and encrypting/decrypting
//! each one independently under its own AES-256 key.
//!
//! Every chunk gets a fresh key and nonce; the key is wrapped under the
//! recipient's RSA-2048-OAEP-SHA256 public key. This means a chunk can be
//! decrypted the instant it is fetched, without needing any other chunk —
//! the property progressive/seekable reads depend on.

use crate::error::Result;
use crate::primitives::{
    aes_ctr_decrypt, aes_ctr_encrypt, random_aes_key, random_iv, rsa_unwrap_key, rsa_wrap_key, sha256_hex, AES_KEY_LEN,
    IV_LEN,
};
use rsa::{RsaPrivateKey, RsaPublicKey};

/// Split `data` into `chunk_size`-byte slices. The final slice may be
/// shorter. Empty input produces an empty Vec, not a single empty chunk.
pub fn chunk_bytes(data: &[u8], chunk_size: usize) -> Vec<&[u8]> {
    if data.is_empty() {
        return Vec::new();
    }
    data.chunks(chunk_size).collect()
}

/// An encrypted chunk on the wire: ciphertext, its RSA-wrapped AES key, and
/// the nonce used for AES-256-CTR.
pub struct EncryptedChunk {
    pub ciphertext: Vec<u8>,
    pub wrapped_key: Vec<u8>,
    pub nonce: [u8; IV_LEN],
}

/// Encrypt one plaintext chunk for `recipient_public_key`: fresh AES-256 key
/// and nonce, AES-256-CTR over the plaintext, RSA-OAEP wrap of the key.
pub fn encrypt_chunk(plaintext: &[u8], recipient_public_key: &RsaPublicKey) -> Result<EncryptedChunk> {
    let key = random_aes_key();
    let nonce = random_iv();
    let ciphertext = aes_ctr_encrypt(&key, &nonce, plaintext);
    let wrapped_key = rsa_wrap_key(recipient_public_key, &key)?;
    Ok(EncryptedChunk {
        ciphertext,
        wrapped_key,
        nonce,
    })
}

/// Decrypt one chunk under `recipient_private_key`. Wrong recipient key or
/// tampered ciphertext both surface as `EngineError::AuthFailed` from the
/// underlying unwrap; this function adds no further interpretation.
pub fn decrypt_chunk(
    ciphertext: &[u8],
    wrapped_key: &[u8],
    nonce: &[u8; IV_LEN],
    recipient_private_key: &RsaPrivateKey,
) -> Result<Vec<u8>> {
    let key: [u8; AES_KEY_LEN] = rsa_unwrap_key(recipient_private_key, wrapped_key)?;
    Ok(aes_ctr_decrypt(&key, nonce, ciphertext))
}

/// SHA-256 hex digest of a chunk's plaintext, used for manifest integrity
/// entries and post-decrypt verification.
pub fn hash_chunk(plaintext: &[u8]) -> String {
    sha256_hex(plaintext)
}
