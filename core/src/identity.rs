//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: chunkvault — zero-trust chunked content sharing.
//

//! User identities: PIN-sealed RSA-2048 key pairs.
//!
//! A [`User`] never stores its private key in the clear. The private key is
//! PKCS8-PEM encoded, then sealed under a PIN-derived AES-256-CBC key
//! (`salt(16) || iv(16) || ciphertext`). Unsealing requires the PIN; a wrong
//! PIN, like every other auth failure in this crate, surfaces only as
//! [`EngineError::AuthFailed`].

use crate::error::{EngineError, Result};
use crate::primitives::{self, aes_cbc_decrypt, aes_cbc_encrypt, derive_key_from_pin, random_bytes};
use crate::secret::Secret;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const SALT_LEN: usize = 16;
const IV_LEN: usize = primitives::IV_LEN;

/// A registered identity: a public key everyone can wrap chunks against, and
/// a PIN-sealed private key blob only the PIN holder can open.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: Uuid,
    pub username: String,
    /// SPKI PEM-encoded RSA-2048 public key.
    pub public_key_pem: String,
    /// `salt(16) || iv(16) || AES-256-CBC-PKCS7 ciphertext` of the PKCS8 PEM private key.
    #[serde(with = "crate::hexenc")]
    pub sealed_private_key: Vec<u8>,
}

impl User {
    /// Create a new identity: generates a fresh RSA-2048 key pair and seals
    /// the private key under `pin`.
    ///
    /// Rejects an empty or whitespace-only username, and an empty pin —
    /// matching the original registration contract.
    pub fn create(username: &str, pin: &str) -> Result<Self> {
        if username.trim().is_empty() {
            return Err(EngineError::InvalidInput("username must not be empty".into()));
        }
        if pin.is_empty() {
            return Err(EngineError::InvalidInput("pin must not be empty".into()));
        }

        let private_key = primitives::generate_rsa_keypair();
        let public_key = RsaPublicKey::from(&private_key);

        let public_key_pem = public_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| EngineError::InvalidInput(format!("public key encoding: {e}")))?;

        let sealed_private_key = seal_private_key(&private_key, pin)?;

        Ok(Self {
            user_id: Uuid::new_v4(),
            username: username.to_string(),
            public_key_pem,
            sealed_private_key,
        })
    }

    /// Parse this user's public key for use in chunk/metadata key wrapping.
    pub fn public_key(&self) -> Result<RsaPublicKey> {
        RsaPublicKey::from_public_key_pem(&self.public_key_pem)
            .map_err(|e| EngineError::MalformedAsset(format!("public key: {e}")))
    }

    /// Attempt to unseal the private key under `pin`. Returns
    /// [`EngineError::AuthFailed`] on any wrong PIN or corrupted blob,
    /// never distinguishing the two.
    pub fn unseal_private_key(&self, pin: &str) -> Result<RsaPrivateKey> {
        Ok(unseal_private_key(&self.sealed_private_key, pin)?.expose_secret().clone())
    }

    /// Check whether `pin` unseals this user's private key, without
    /// returning the key itself.
    pub fn verify_pin(&self, pin: &str) -> bool {
        self.unseal_private_key(pin).is_ok()
    }
}

fn seal_private_key(private_key: &RsaPrivateKey, pin: &str) -> Result<Vec<u8>> {
    let pem = private_key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| EngineError::InvalidInput(format!("private key encoding: {e}")))?;

    let salt: [u8; SALT_LEN] = random_bytes(SALT_LEN)
        .try_into()
        .expect("random_bytes(SALT_LEN) must return SALT_LEN bytes");
    let iv: [u8; IV_LEN] = random_bytes(IV_LEN)
        .try_into()
        .expect("random_bytes(IV_LEN) must return IV_LEN bytes");
    let key = derive_key_from_pin(pin, &salt);

    let ciphertext = aes_cbc_encrypt(key.expose_secret(), &iv, pem.as_bytes());

    let mut blob = Vec::with_capacity(SALT_LEN + IV_LEN + ciphertext.len());
    blob.extend_from_slice(&salt);
    blob.extend_from_slice(&iv);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Unseal the blob under `pin`, keeping the derived AES key, the decrypted
/// PEM bytes, and the parsed private key itself wrapped in [`Secret`] for as
/// long as each stays in memory here.
fn unseal_private_key(blob: &[u8], pin: &str) -> Result<Secret<RsaPrivateKey>> {
    if blob.len() < SALT_LEN + IV_LEN {
        return Err(EngineError::AuthFailed);
    }
    let salt: [u8; SALT_LEN] = blob[..SALT_LEN].try_into().unwrap();
    let iv: [u8; IV_LEN] = blob[SALT_LEN..SALT_LEN + IV_LEN].try_into().unwrap();
    let ciphertext = &blob[SALT_LEN + IV_LEN..];

    let key = derive_key_from_pin(pin, &salt);
    let pem_bytes = Secret::new(aes_cbc_decrypt(key.expose_secret(), &iv, ciphertext)?);
    let pem = std::str::from_utf8(pem_bytes.expose_secret()).map_err(|_| EngineError::AuthFailed)?;

    let private_key = RsaPrivateKey::from_pkcs8_pem(pem).map_err(|_| EngineError::AuthFailed)?;
    Ok(Secret::new(private_key))
}

/// The directory contract the engine needs to resolve identities: lookup by
/// id, lookup by username, registration, and enumeration. Concrete
/// persistence (file-backed registries, databases) is out of scope for this
/// crate; callers provide an implementation.
///
/// Usernames are unique case-insensitively, matching the original
/// registration contract.
pub trait UserDirectory {
    fn get_user(&self, user_id: &Uuid) -> Result<User>;
    fn get_user_by_username(&self, username: &str) -> Result<User>;
    fn add_user(&self, user: User) -> Result<()>;
    fn list_users(&self) -> Result<Vec<User>>;
}

/// An in-memory [`UserDirectory`], useful for tests and single-process
/// callers that don't need persistence.
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: parking_lot::RwLock<Vec<User>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn get_user(&self, user_id: &Uuid) -> Result<User> {
        self.users
            .read()
            .iter()
            .find(|u| &u.user_id == user_id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("user {user_id}")))
    }

    fn get_user_by_username(&self, username: &str) -> Result<User> {
        self.users
            .read()
            .iter()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("username {username:?}")))
    }

    fn add_user(&self, user: User) -> Result<()> {
        let mut users = self.users.write();
        if users.iter().any(|u| u.username.eq_ignore_ascii_case(&user.username)) {
            return Err(EngineError::InvalidInput(format!(
                "username {:?} already registered",
                user.username
            )));
        }
        users.push(user);
        Ok(())
    }

    fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.users.read().clone())
    }
}
