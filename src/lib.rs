//! Steganographic virtual disk
//!
//! Presents a single byte-addressable virtual disk whose bits are hidden in
//! the low-order bits of a directory of ordinary carrier files.
//!
//! # Features
//!
//! - **Carrier pool**: raw files and BMP images, one contiguous raw bit space
//! - **Keyed scatter**: affine or Feistel permutations driven by an Argon2id key
//! - **Error correction**: Hamming and extended Hamming block codes
//! - **Single-file view**: a truncating `virtualdisc.iso` bridge for mount layers
//!
//! # Architecture
//!
//! ```text
//! Data → Encode (Hamming) → Permute (local, global) → Carrier LSBs
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use stego_vdisk::StegoStorage;
//! use std::path::Path;
//!
//! let mut storage = StegoStorage::new();
//! storage.configure_default().unwrap();
//! storage.open(Path::new("./carriers"), "password").unwrap();
//! storage.load().unwrap();
//!
//! storage.write(b"Hidden data", 0).unwrap();
//!
//! let mut buf = [0u8; 11];
//! storage.read(&mut buf, 0).unwrap();
//! assert_eq!(&buf, b"Hidden data");
//!
//! storage.close().unwrap();
//! ```

pub mod bridge;
pub mod carrier;
pub mod config;
pub mod crypto;
pub mod encoding;
pub mod error;
pub mod permutation;
pub mod storage;
pub mod vstorage;

pub use bridge::VirtualDisk;
pub use config::{EncoderKind, PermutationKind, StegoConfig};
pub use error::{Error, Result};
pub use storage::StegoStorage;
