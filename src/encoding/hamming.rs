//! Hamming block codes.
//!
//! Codeword bit `k` holds Hamming position `k + 1`. Parity bits sit at the
//! power-of-two positions, data bits fill the rest in ascending order. The
//! extended variant appends an overall parity bit as the top bit, turning the
//! single-error-correcting code into SECDED.

use crate::encoding::decoder::{BlockStatus, DecodedBlock};

/// Hamming code with `p` parity bits, optionally extended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HammingCode {
    parity_bits: u32,
    extended: bool,
    data_positions: Vec<u32>,
}

impl HammingCode {
    /// Plain Hamming code: N = 2^p - 1, K = N - p.
    pub fn new(parity_bits: u8) -> Self {
        Self::build(parity_bits, false)
    }

    /// Extended Hamming code: N = 2^p, K = 2^p - p - 1.
    pub fn extended(parity_bits: u8) -> Self {
        Self::build(parity_bits, true)
    }

    fn build(parity_bits: u8, extended: bool) -> Self {
        let parity_bits = parity_bits as u32;
        let inner = (1u32 << parity_bits) - 1;
        let data_positions = (1..=inner).filter(|pos| !pos.is_power_of_two()).collect();
        Self {
            parity_bits,
            extended,
            data_positions,
        }
    }

    /// Number of parity bits, not counting the extension bit.
    pub fn parity_bits(&self) -> u32 {
        self.parity_bits
    }

    /// Whether the overall parity bit is present.
    pub fn is_extended(&self) -> bool {
        self.extended
    }

    /// Data bits per block (K).
    pub fn data_bits(&self) -> u32 {
        self.data_positions.len() as u32
    }

    /// Encoded bits per block (N).
    pub fn codeword_bits(&self) -> u32 {
        self.inner_bits() + self.extended as u32
    }

    fn inner_bits(&self) -> u32 {
        (1u32 << self.parity_bits) - 1
    }

    /// Encode the low K bits of `data`.
    pub fn encode(&self, data: u64) -> u64 {
        let mut word = 0u64;
        for (i, &pos) in self.data_positions.iter().enumerate() {
            if (data >> i) & 1 == 1 {
                word |= 1 << (pos - 1);
            }
        }

        let syndrome = syndrome(word);
        for bit in 0..self.parity_bits {
            if (syndrome >> bit) & 1 == 1 {
                word |= 1 << ((1u32 << bit) - 1);
            }
        }

        if self.extended && word.count_ones() % 2 == 1 {
            word |= 1 << self.inner_bits();
        }
        word
    }

    /// Decode a codeword, correcting at most one flipped bit.
    ///
    /// With two or more errors the plain code silently miscorrects; the
    /// extended code reports double errors as [`BlockStatus::Uncorrectable`]
    /// and returns the data bits as read.
    pub fn decode(&self, word: u64) -> DecodedBlock {
        let inner_mask = (1u64 << self.inner_bits()) - 1;
        let mut inner = word & inner_mask;
        let syndrome = syndrome(inner);

        let status = if self.extended {
            let overall_odd = (word & (inner_mask | 1 << self.inner_bits())).count_ones() % 2 == 1;
            match (syndrome, overall_odd) {
                (0, false) => BlockStatus::Clean,
                // Only the overall parity bit flipped.
                (0, true) => BlockStatus::Corrected,
                (s, true) => {
                    inner ^= 1 << (s - 1);
                    BlockStatus::Corrected
                }
                (_, false) => BlockStatus::Uncorrectable,
            }
        } else if syndrome != 0 {
            inner ^= 1 << (syndrome - 1);
            BlockStatus::Corrected
        } else {
            BlockStatus::Clean
        };

        let mut data = 0u64;
        for (i, &pos) in self.data_positions.iter().enumerate() {
            if (inner >> (pos - 1)) & 1 == 1 {
                data |= 1 << i;
            }
        }

        DecodedBlock { data, status }
    }
}

/// XOR of the Hamming positions of every set bit.
fn syndrome(word: u64) -> u32 {
    let mut s = 0;
    let mut rest = word;
    while rest != 0 {
        s ^= rest.trailing_zeros() + 1;
        rest &= rest - 1;
    }
    s
}
