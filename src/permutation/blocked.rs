//! Permutation applied independently inside fixed-size sub-blocks.

use super::{key_word, mix64, Permutation};
use crate::config::PermutationKind;

/// Local permutation: `[0, size)` is cut into sub-blocks of `block` indices
/// and each sub-block is permuted in place. Every sub-block gets its own
/// key-derived rotation before the shared permutation, so identical offsets
/// in different sub-blocks do not land on identical positions. A trailing
/// partial sub-block uses a permutation of its own size.
#[derive(Debug, Clone)]
pub struct BlockedPermutation {
    size: u64,
    block: u64,
    full: Option<Permutation>,
    tail: Option<Permutation>,
    tweak_seed: u64,
}

impl BlockedPermutation {
    /// Build a local permutation over `[0, size)` with sub-blocks of `block`.
    pub fn new(kind: PermutationKind, size: u64, block: u64, key: &[u8; 32]) -> Self {
        let block = block.max(1);
        let full = (size >= block).then(|| Permutation::new(kind, block, key));
        let tail_len = size % block;
        let tail = (tail_len > 0).then(|| Permutation::new(kind, tail_len, key));
        let tweak_seed = match kind {
            PermutationKind::Identity => 0,
            _ => key_word(key, 16),
        };

        Self {
            size,
            block,
            full,
            tail,
            tweak_seed,
        }
    }

    /// Domain size.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Forward map.
    pub fn permute(&self, index: u64) -> u64 {
        debug_assert!(index < self.size);
        let (base, perm) = self.locate(index);
        let len = perm.size();
        let rotation = self.rotation(index / self.block, len);
        let offset = (index - base + rotation) % len;
        base + perm.permute(offset)
    }

    /// Inverse map.
    pub fn inverse(&self, index: u64) -> u64 {
        debug_assert!(index < self.size);
        let (base, perm) = self.locate(index);
        let len = perm.size();
        let rotation = self.rotation(index / self.block, len);
        let offset = perm.inverse(index - base);
        base + (offset + len - rotation) % len
    }

    fn locate(&self, index: u64) -> (u64, &Permutation) {
        let base = index - index % self.block;
        let perm = if base + self.block <= self.size {
            self.full.as_ref()
        } else {
            self.tail.as_ref()
        };
        // Both options are populated for every index inside the domain.
        match perm {
            Some(perm) => (base, perm),
            None => unreachable!("index {} outside local permutation", index),
        }
    }

    fn rotation(&self, block_index: u64, len: u64) -> u64 {
        if self.tweak_seed == 0 {
            return 0;
        }
        mix64(self.tweak_seed ^ block_index.wrapping_mul(0x9e37_79b9_7f4a_7c15)) % len
    }
}
