//! Error types for the steganographic virtual disk.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A carrier file that could not be written back during save.
#[derive(Debug)]
pub struct CarrierIoFailure {
    /// Path of the carrier file.
    pub path: PathBuf,
    /// Underlying I/O error.
    pub source: std::io::Error,
}

impl fmt::Display for CarrierIoFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.source)
    }
}

/// Errors that can occur while driving a storage session.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid configuration, or a conflicting re-initialization.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Operation requires a configuration that was never set.
    #[error("Storage must be configured before loading")]
    NotConfigured,

    /// Operation requires a carrier directory to be opened first.
    #[error("Storage must be opened before loading")]
    NotOpened,

    /// Operation requires a loaded virtual storage.
    #[error("Storage must be loaded before use")]
    NotLoaded,

    /// The session already holds a loaded storage.
    #[error("Storage is already loaded; close it first")]
    AlreadyLoaded,

    /// Byte range outside the usable capacity of the virtual storage.
    #[error("Range out of bounds: offset {offset} + length {length} exceeds capacity {capacity}")]
    OutOfRange {
        offset: u64,
        length: u64,
        capacity: u64,
    },

    /// Path not present in the virtual disk view.
    #[error("No such entry: {0}")]
    EntryNotFound(String),

    /// Raw bit index outside the carrier pool.
    #[error("Raw bit index {index} out of range (capacity {capacity} bits)")]
    IndexOutOfRange { index: u64, capacity: u64 },

    /// No carrier in the directory contributes any capacity.
    #[error("No carrier files found in directory: {0}")]
    NoCarriersFound(PathBuf),

    /// I/O error without a specific carrier attached.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error on a specific carrier file.
    #[error("I/O error on carrier {}: {source}", .path.display())]
    CarrierIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// One or more carrier files failed to save. Files not listed were written.
    #[error("Failed to save {} carrier file(s): {}", .0.len(), join_failures(.0))]
    SaveFailed(Vec<CarrierIoFailure>),

    /// The encoder detected more bit errors than it can correct.
    #[error("Corruption detected in {blocks} encoded block(s)")]
    CorruptionDetected { blocks: u64 },

    /// Key derivation error.
    #[error("Key derivation error: {0}")]
    KeyDerivation(String),
}

fn join_failures(failures: &[CarrierIoFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Configuration(e.to_string())
    }
}
