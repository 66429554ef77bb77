//! Argon2id key derivation for the pool secret.

use crate::config::kdf_params;
use crate::error::{Error, Result};
use argon2::{Algorithm, Argon2, Params, Version};
use sha2::{Digest, Sha256};
use std::fmt;

/// Seed of the key used when no password is given.
const DEFAULT_KEY_SEED: &[u8] = b"stego-vdisk/default-key";

/// Where a pool key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOrigin {
    /// Fixed fallback for an empty password.
    Default,
    /// Derived from a user password.
    Password,
}

/// 256-bit secret shared by every keyed component of a pool.
#[derive(Clone, PartialEq, Eq)]
pub struct PoolKey {
    bytes: [u8; 32],
    origin: KeyOrigin,
}

impl PoolKey {
    /// The fixed key used for an empty password.
    pub fn default_key() -> Self {
        let bytes: [u8; 32] = Sha256::digest(DEFAULT_KEY_SEED).into();
        Self {
            bytes,
            origin: KeyOrigin::Default,
        }
    }

    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self {
            bytes,
            origin: KeyOrigin::Password,
        }
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// How the key was obtained.
    pub fn origin(&self) -> KeyOrigin {
        self.origin
    }

    /// Whether this is the fallback key for an empty password.
    pub fn is_default(&self) -> bool {
        self.origin == KeyOrigin::Default
    }

    /// Derive an independent key for one purpose, e.g. `b"perm/global"`.
    pub fn subkey(&self, label: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.bytes);
        hasher.update((label.len() as u64).to_le_bytes());
        hasher.update(label);
        hasher.finalize().into()
    }

    /// Short non-secret identifier for logs.
    pub fn fingerprint(&self) -> String {
        hex::encode(&self.subkey(b"fingerprint")[..4])
    }
}

impl fmt::Debug for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolKey")
            .field("origin", &self.origin)
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

/// Key derivation using Argon2id with the fixed application salt.
#[derive(Debug, Clone)]
pub struct KeyDerivation {
    salt: [u8; 16],
}

impl KeyDerivation {
    /// Create a KDF with the application salt.
    pub fn new() -> Self {
        Self {
            salt: *kdf_params::SALT,
        }
    }

    #[cfg(test)]
    pub(crate) fn from_salt(salt: [u8; 16]) -> Self {
        Self { salt }
    }

    /// Derive the pool key from a password.
    ///
    /// An empty password yields [`PoolKey::default_key`].
    pub fn derive_key(&self, password: &str) -> Result<PoolKey> {
        if password.is_empty() {
            return Ok(PoolKey::default_key());
        }

        let params = Params::new(
            kdf_params::MEMORY_COST,
            kdf_params::TIME_COST,
            kdf_params::PARALLELISM,
            Some(kdf_params::OUTPUT_LENGTH),
        )
        .map_err(|e| Error::KeyDerivation(e.to_string()))?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut key = [0u8; 32];
        argon2
            .hash_password_into(password.as_bytes(), &self.salt, &mut key)
            .map_err(|e| Error::KeyDerivation(e.to_string()))?;

        Ok(PoolKey::from_bytes(key))
    }
}

impl Default for KeyDerivation {
    fn default() -> Self {
        Self::new()
    }
}
