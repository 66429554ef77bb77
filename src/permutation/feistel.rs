//! Balanced Feistel network over an arbitrary domain.
//!
//! The index is split into two halves of `h` bits each, where `2^(2h)` is the
//! smallest even power of two covering the domain. Values that land outside
//! `[0, n)` are fed through the network again (cycle walking) until they come
//! back inside, which keeps the map a bijection on `[0, n)`.

use super::{key_word, mix64};
use sha2::{Digest, Sha256};

/// Number of Feistel rounds.
pub const FEISTEL_ROUNDS: usize = 6;

/// Feistel permutation keyed by per-round subkeys.
#[derive(Debug, Clone)]
pub struct FeistelPermutation {
    n: u64,
    half_bits: u32,
    mask: u64,
    round_keys: [u64; FEISTEL_ROUNDS],
}

impl FeistelPermutation {
    /// Derive the round keys from the key and lay out the halves for `n`.
    pub fn new(n: u64, key: &[u8; 32]) -> Self {
        let bits = if n <= 2 {
            1
        } else {
            64 - (n - 1).leading_zeros()
        };
        let half_bits = bits.div_ceil(2).max(1);
        let mask = if half_bits >= 64 {
            u64::MAX
        } else {
            (1u64 << half_bits) - 1
        };

        let mut round_keys = [0u64; FEISTEL_ROUNDS];
        for (round, slot) in round_keys.iter_mut().enumerate() {
            let mut hasher = Sha256::new();
            hasher.update(key);
            hasher.update(b"feistel");
            hasher.update([round as u8]);
            let digest: [u8; 32] = hasher.finalize().into();
            *slot = key_word(&digest, 0);
        }

        Self {
            n,
            half_bits,
            mask,
            round_keys,
        }
    }

    /// Domain size.
    pub fn size(&self) -> u64 {
        self.n
    }

    #[cfg(test)]
    fn half_bits(&self) -> u32 {
        self.half_bits
    }

    /// Forward map.
    pub fn permute(&self, i: u64) -> u64 {
        let mut x = self.encrypt(i);
        while x >= self.n {
            x = self.encrypt(x);
        }
        x
    }

    /// Inverse map.
    pub fn inverse(&self, j: u64) -> u64 {
        let mut x = self.decrypt(j);
        while x >= self.n {
            x = self.decrypt(x);
        }
        x
    }

    fn round(&self, half: u64, key: u64) -> u64 {
        mix64(half ^ key) & self.mask
    }

    fn encrypt(&self, x: u64) -> u64 {
        let mut left = x >> self.half_bits;
        let mut right = x & self.mask;
        for &key in &self.round_keys {
            (left, right) = (right, left ^ self.round(right, key));
        }
        (left << self.half_bits) | right
    }

    fn decrypt(&self, x: u64) -> u64 {
        let mut left = x >> self.half_bits;
        let mut right = x & self.mask;
        for &key in self.round_keys.iter().rev() {
            (left, right) = (right ^ self.round(left, key), left);
        }
        (left << self.half_bits) | right
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_is_invertible_on_full_width() {
        let perm = FeistelPermutation::new(1 << 16, &[4u8; 32]);
        for x in (0..(1u64 << 16)).step_by(97) {
            assert_eq!(perm.decrypt(perm.encrypt(x)), x);
        }
    }

    #[test]
    fn test_half_bits_cover_domain() {
        for n in [2u64, 3, 5, 100, 1000, 1 << 20, (1 << 20) + 1] {
            let perm = FeistelPermutation::new(n, &[0u8; 32]);
            let span = 1u128 << (2 * perm.half_bits());
            assert!(span >= n as u128);
            // Never more than four times the domain, so walks stay short.
            assert!(span <= 4 * n as u128);
        }
    }

    #[test]
    fn test_non_power_of_two_domain() {
        let n = 1000;
        let perm = FeistelPermutation::new(n, &[8u8; 32]);
        let mut image: Vec<u64> = (0..n).map(|i| perm.permute(i)).collect();
        image.sort_unstable();
        assert_eq!(image, (0..n).collect::<Vec<_>>());
    }

    #[test]
    fn test_not_trivially_identity() {
        let n = 4096;
        let perm = FeistelPermutation::new(n, &[0x11; 32]);
        let fixed = (0..n).filter(|&i| perm.permute(i) == i).count();
        assert!(fixed < 64, "too many fixed points: {}", fixed);
    }

    #[test]
    fn test_large_domain_roundtrip() {
        let n = (1u64 << 40) + 12345;
        let perm = FeistelPermutation::new(n, &[0x77; 32]);
        for i in [0, 1, n / 3, n - 1] {
            let j = perm.permute(i);
            assert!(j < n);
            assert_eq!(perm.inverse(j), i);
        }
    }
}
