//! Carrier file pool.
//!
//! This module handles:
//! - Enumerating carrier files and computing their hidden-bit layout
//! - Translating raw bit indices into file positions
//! - Loading carrier contents and writing dirty carriers back

mod file;
mod layout;
mod manager;

pub use file::CarrierFile;
pub use layout::{CarrierFormat, CarrierLayout};
pub use manager::{BitLocation, CarrierFilesManager};
