//! Affine permutation `j = (a * i + b) mod n`.

use super::{key_word, mix64};

/// Affine map with `a` coprime to `n`.
#[derive(Debug, Clone)]
pub struct AffinePermutation {
    n: u64,
    a: u64,
    b: u64,
    a_inv: u64,
}

impl AffinePermutation {
    /// Derive `a` and `b` from the key.
    ///
    /// `a` starts from a key-derived value and moves up to the nearest value
    /// coprime to `n`, wrapping back to 1.
    pub fn new(n: u64, key: &[u8; 32]) -> Self {
        if n <= 1 {
            return Self {
                n,
                a: 1,
                b: 0,
                a_inv: 1,
            };
        }

        let mut a = mix64(key_word(key, 0)) % n;
        if a == 0 {
            a = 1;
        }
        while gcd(a, n) != 1 {
            a += 1;
            if a >= n {
                a = 1;
            }
        }

        let b = mix64(key_word(key, 8)) % n;
        let a_inv = mod_inverse(a, n);

        Self { n, a, b, a_inv }
    }

    /// Domain size.
    pub fn size(&self) -> u64 {
        self.n
    }

    #[cfg(test)]
    fn multiplier(&self) -> u64 {
        self.a
    }

    #[cfg(test)]
    fn offset(&self) -> u64 {
        self.b
    }

    /// Forward map.
    pub fn permute(&self, i: u64) -> u64 {
        let n = self.n as u128;
        ((self.a as u128 * i as u128 + self.b as u128) % n) as u64
    }

    /// Inverse map: `a^-1 * (j - b) mod n`.
    pub fn inverse(&self, j: u64) -> u64 {
        let n = self.n as u128;
        let shifted = (j as u128 + n - self.b as u128) % n;
        ((self.a_inv as u128 * shifted) % n) as u64
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Inverse of `a` modulo `n`. `a` and `n` must be coprime.
fn mod_inverse(a: u64, n: u64) -> u64 {
    let (mut old_r, mut r) = (a as i128, n as i128);
    let (mut old_s, mut s) = (1i128, 0i128);
    while r != 0 {
        let q = old_r / r;
        (old_r, r) = (r, old_r - q * r);
        (old_s, s) = (s, old_s - q * s);
    }
    old_s.rem_euclid(n as i128) as u64
}
