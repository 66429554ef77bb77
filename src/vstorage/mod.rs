//! Virtual storage: linear byte I/O over the carrier pool.
//!
//! Data bits are grouped into encoder blocks, each codeword bit is scattered
//! through the local and global permutations, and the result is a raw bit
//! index in the carrier pool.

mod mapping;
mod storage;

pub use mapping::AddressMap;
pub use storage::{ReadReport, VirtualStorage};
