//! Error-correcting block codes for data resilience.
//!
//! Each block of K data bits is stored as N carrier bits, so a flipped
//! carrier bit inside a block can be repaired on read.

mod decoder;
mod encoder;
mod hamming;

pub use decoder::{BlockStatus, DecodeStats, DecodedBlock};
pub use encoder::Encoder;
pub use hamming::HammingCode;
