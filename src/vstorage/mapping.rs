//! Translation from encoded bit positions to raw carrier bits.

use crate::config::{StegoConfig, LOCAL_BLOCK_BITS};
use crate::crypto::PoolKey;
use crate::permutation::{BlockedPermutation, Permutation};

/// Keyed scatter of the encoded bit space over the raw bit space.
///
/// An encoded position first moves inside its local sub-block, then through
/// the global permutation over all raw bits. Both steps are bijections on
/// `[0, raw_bits)`, so distinct encoded positions never share a raw bit.
#[derive(Debug, Clone)]
pub struct AddressMap {
    local: BlockedPermutation,
    global: Permutation,
}

impl AddressMap {
    /// Build the map for a pool of `raw_bits` bits.
    pub fn new(config: &StegoConfig, key: &PoolKey, raw_bits: u64) -> Self {
        Self::with_block(config, key, raw_bits, LOCAL_BLOCK_BITS)
    }

    /// Build the map with a custom local sub-block size.
    pub fn with_block(config: &StegoConfig, key: &PoolKey, raw_bits: u64, block: u64) -> Self {
        let local =
            BlockedPermutation::new(config.local_perm, raw_bits, block, &key.subkey(b"perm/local"));
        let global = Permutation::new(config.global_perm, raw_bits, &key.subkey(b"perm/global"));
        Self { local, global }
    }

    /// Raw bit holding encoded position `encoded`.
    pub fn raw_index(&self, encoded: u64) -> u64 {
        self.global.permute(self.local.permute(encoded))
    }

    /// Encoded position stored in raw bit `raw`.
    #[cfg(test)]
    pub fn encoded_index(&self, raw: u64) -> u64 {
        self.local.inverse(self.global.inverse(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EncoderKind, PermutationKind};

    fn config(global: PermutationKind, local: PermutationKind) -> StegoConfig {
        StegoConfig::new(EncoderKind::default(), global, local)
    }

    #[test]
    fn test_map_is_bijective() {
        let key = PoolKey::from_bytes([5u8; 32]);
        let cfg = config(PermutationKind::Feistel, PermutationKind::Affine);
        let map = AddressMap::with_block(&cfg, &key, 3000, 256);

        let mut seen = vec![false; 3000];
        for e in 0..3000 {
            let raw = map.raw_index(e);
            assert!(!seen[raw as usize]);
            seen[raw as usize] = true;
            assert_eq!(map.encoded_index(raw), e);
        }
    }

    #[test]
    fn test_identity_map() {
        let key = PoolKey::default_key();
        let cfg = config(PermutationKind::Identity, PermutationKind::Identity);
        let map = AddressMap::new(&cfg, &key, 100);

        assert!((0..100).all(|e| map.raw_index(e) == e));
    }

    #[test]
    fn test_different_keys_scatter_differently() {
        let cfg = StegoConfig::default();
        let a = AddressMap::new(&cfg, &PoolKey::from_bytes([1u8; 32]), 20_000);
        let b = AddressMap::new(&cfg, &PoolKey::from_bytes([2u8; 32]), 20_000);

        let differing = (0..20_000).filter(|&e| a.raw_index(e) != b.raw_index(e)).count();
        assert!(differing > 19_000, "only {} positions differ", differing);
    }
}
