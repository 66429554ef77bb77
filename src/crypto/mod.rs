//! Key material for the carrier pool.
//!
//! This module provides:
//! - Argon2id password-based derivation of the pool secret
//! - SHA-256 domain separation for per-purpose sub-keys

mod kdf;

pub use kdf::{KeyDerivation, KeyOrigin, PoolKey};
