//! Keyed bijections on `[0, n)`.
//!
//! Encoded bit positions pass through two layers before they hit a carrier:
//! a local permutation inside fixed-size sub-blocks and a global permutation
//! over the whole raw address space. Both are deterministic functions of the
//! pool key and the domain size, so nothing about the layout is stored.

mod affine;
mod blocked;
mod feistel;

pub use affine::AffinePermutation;
pub use blocked::BlockedPermutation;
pub use feistel::{FeistelPermutation, FEISTEL_ROUNDS};

use crate::config::PermutationKind;

/// A keyed permutation of `[0, size)`.
#[derive(Debug, Clone)]
pub enum Permutation {
    /// Leaves every index in place.
    Identity { size: u64 },
    /// `(a * i + b) mod n`.
    Affine(AffinePermutation),
    /// Balanced Feistel network restricted to the domain by cycle walking.
    Feistel(FeistelPermutation),
}

impl Permutation {
    /// Build the permutation of the given kind over `[0, size)`.
    pub fn new(kind: PermutationKind, size: u64, key: &[u8; 32]) -> Self {
        match kind {
            PermutationKind::Identity => Permutation::Identity { size },
            PermutationKind::Affine => Permutation::Affine(AffinePermutation::new(size, key)),
            PermutationKind::Feistel => Permutation::Feistel(FeistelPermutation::new(size, key)),
        }
    }

    /// Which variant this is.
    pub fn kind(&self) -> PermutationKind {
        match self {
            Permutation::Identity { .. } => PermutationKind::Identity,
            Permutation::Affine(_) => PermutationKind::Affine,
            Permutation::Feistel(_) => PermutationKind::Feistel,
        }
    }

    /// Domain size.
    pub fn size(&self) -> u64 {
        match self {
            Permutation::Identity { size } => *size,
            Permutation::Affine(p) => p.size(),
            Permutation::Feistel(p) => p.size(),
        }
    }

    /// Forward map. `index` must be below `size()`.
    pub fn permute(&self, index: u64) -> u64 {
        debug_assert!(index < self.size(), "index {} outside domain", index);
        match self {
            Permutation::Identity { .. } => index,
            Permutation::Affine(p) => p.permute(index),
            Permutation::Feistel(p) => p.permute(index),
        }
    }

    /// Inverse map. `index` must be below `size()`.
    pub fn inverse(&self, index: u64) -> u64 {
        debug_assert!(index < self.size(), "index {} outside domain", index);
        match self {
            Permutation::Identity { .. } => index,
            Permutation::Affine(p) => p.inverse(index),
            Permutation::Feistel(p) => p.inverse(index),
        }
    }
}

/// 64-bit finalizer from SplitMix64.
pub(crate) fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Little-endian `u64` from eight key bytes starting at `at`.
pub(crate) fn key_word(key: &[u8; 32], at: usize) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&key[at..at + 8]);
    u64::from_le_bytes(word)
}
