//! The active block encoder.

use crate::config::EncoderKind;
use crate::encoding::decoder::{BlockStatus, DecodeStats, DecodedBlock};
use crate::encoding::hamming::HammingCode;

/// Block code turning K data bits into N carrier bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Encoder {
    /// Identity code, K = N = 1.
    Lsb,
    /// Plain or extended Hamming code.
    Hamming(HammingCode),
}

impl Encoder {
    /// Build the encoder for a configured kind.
    pub fn new(kind: EncoderKind) -> Self {
        match kind {
            EncoderKind::Lsb => Encoder::Lsb,
            EncoderKind::Hamming { parity_bits } => Encoder::Hamming(HammingCode::new(parity_bits)),
            EncoderKind::ExtendedHamming { parity_bits } => {
                Encoder::Hamming(HammingCode::extended(parity_bits))
            }
        }
    }

    /// The configured kind this encoder was built from.
    pub fn kind(&self) -> EncoderKind {
        match self {
            Encoder::Lsb => EncoderKind::Lsb,
            Encoder::Hamming(code) if code.is_extended() => EncoderKind::ExtendedHamming {
                parity_bits: code.parity_bits() as u8,
            },
            Encoder::Hamming(code) => EncoderKind::Hamming {
                parity_bits: code.parity_bits() as u8,
            },
        }
    }

    /// Code rate as `(K, N)`.
    pub fn rate(&self) -> (u32, u32) {
        (self.data_bits(), self.codeword_bits())
    }

    /// Data bits per block (K).
    pub fn data_bits(&self) -> u32 {
        match self {
            Encoder::Lsb => 1,
            Encoder::Hamming(code) => code.data_bits(),
        }
    }

    /// Encoded bits per block (N).
    pub fn codeword_bits(&self) -> u32 {
        match self {
            Encoder::Lsb => 1,
            Encoder::Hamming(code) => code.codeword_bits(),
        }
    }

    /// Usable data bits for `raw_bits` carrier bits: `floor(raw * K / N)`.
    pub fn usable_capacity(&self, raw_bits: u64) -> u64 {
        let (k, n) = self.rate();
        (raw_bits as u128 * k as u128 / n as u128) as u64
    }

    /// Number of complete codewords that fit in `raw_bits`.
    pub fn whole_blocks(&self, raw_bits: u64) -> u64 {
        raw_bits / self.codeword_bits() as u64
    }

    /// Encode one block of K data bits.
    pub fn encode(&self, data: u64) -> u64 {
        match self {
            Encoder::Lsb => data & 1,
            Encoder::Hamming(code) => code.encode(data),
        }
    }

    /// Decode one codeword of N bits.
    pub fn decode(&self, word: u64) -> DecodedBlock {
        match self {
            Encoder::Lsb => DecodedBlock {
                data: word & 1,
                status: BlockStatus::Clean,
            },
            Encoder::Hamming(code) => code.decode(word),
        }
    }

    /// Encode a bit sequence. The input is padded with zeros to whole blocks.
    pub fn encode_bits(&self, bits: &[bool]) -> Vec<bool> {
        let k = self.data_bits() as usize;
        let n = self.codeword_bits() as usize;
        let mut out = Vec::with_capacity(bits.len().div_ceil(k) * n);
        for chunk in bits.chunks(k) {
            let data = pack_bits(chunk);
            let word = self.encode(data);
            out.extend((0..n).map(|i| (word >> i) & 1 == 1));
        }
        out
    }

    /// Decode a bit sequence of whole codewords; a trailing partial
    /// codeword is ignored.
    pub fn decode_bits(&self, bits: &[bool]) -> (Vec<bool>, DecodeStats) {
        let k = self.data_bits() as usize;
        let n = self.codeword_bits() as usize;
        let mut stats = DecodeStats::default();
        let mut out = Vec::with_capacity(bits.len() / n * k);
        for chunk in bits.chunks_exact(n) {
            let decoded = self.decode(pack_bits(chunk));
            stats.record(decoded.status);
            out.extend((0..k).map(|i| (decoded.data >> i) & 1 == 1));
        }
        (out, stats)
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Encoder::new(EncoderKind::default())
    }
}

fn pack_bits(bits: &[bool]) -> u64 {
    bits.iter()
        .enumerate()
        .fold(0u64, |acc, (i, &bit)| acc | (bit as u64) << i)
}
