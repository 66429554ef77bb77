//! Carrier files manager: one contiguous raw bit space over many files.

use crate::carrier::file::CarrierFile;
use crate::config::CarrierOptions;
use crate::crypto::{KeyDerivation, PoolKey};
use crate::encoding::Encoder;
use crate::error::{CarrierIoFailure, Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Physical position of a raw bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitLocation {
    /// Index of the carrier in the pool.
    pub file: usize,
    /// Byte offset inside the carrier file.
    pub byte_offset: u64,
    /// Bit inside that byte, 0 being least significant.
    pub bit: u8,
}

/// Manager for the pool of carrier files.
///
/// Raw bit `i` belongs to the first file whose cumulative capacity exceeds
/// `i`; files keep the order they were enumerated in.
#[derive(Debug)]
pub struct CarrierFilesManager {
    /// Directory the carriers were loaded from.
    root_dir: PathBuf,
    /// Carriers with non-zero capacity, in address order.
    files: Vec<CarrierFile>,
    /// First raw bit of each carrier.
    starts: Vec<u64>,
    /// Sum of carrier capacities.
    total_raw: u64,
    /// Pool secret.
    key: PoolKey,
    /// Layout options for new carriers.
    options: CarrierOptions,
    /// Encoder the capacity is computed for.
    encoder: Option<Encoder>,
}

impl CarrierFilesManager {
    /// Create an empty manager with default carrier options.
    pub fn new() -> Self {
        Self::with_options(CarrierOptions::default())
    }

    /// Create an empty manager.
    pub fn with_options(options: CarrierOptions) -> Self {
        Self {
            root_dir: PathBuf::new(),
            files: Vec::new(),
            starts: Vec::new(),
            total_raw: 0,
            key: PoolKey::default_key(),
            options,
            encoder: None,
        }
    }

    /// Derive the pool secret from a password.
    ///
    /// An empty password selects the fixed default key.
    pub fn set_password(&mut self, password: &str) -> Result<()> {
        self.key = KeyDerivation::new().derive_key(password)?;
        debug!(
            fingerprint = %self.key.fingerprint(),
            default = self.key.is_default(),
            "Pool key derived"
        );
        Ok(())
    }

    /// Pool secret.
    pub fn key(&self) -> &PoolKey {
        &self.key
    }

    /// Enumerate carriers under `root` in lexicographic path order.
    ///
    /// Hidden files are skipped. Files that cannot be inspected or have no
    /// usable bits are left out with a warning.
    pub fn load_directory(&mut self, root: &Path) -> Result<()> {
        self.options.validate()?;

        if !root.is_dir() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Directory not found: {}", root.display()),
            )));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_hidden(e.file_name()))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                if !entry.file_type().is_dir() {
                    debug!(path = %entry.path().display(), "Skipping non-regular entry");
                }
                continue;
            }

            let path = entry.into_path();
            match CarrierFile::new(path.clone(), files.len(), &self.options) {
                Ok(carrier) if carrier.raw_capacity() > 0 => {
                    debug!(
                        path = %path.display(),
                        format = ?carrier.layout().format,
                        bits = carrier.raw_capacity(),
                        "Carrier accepted"
                    );
                    files.push(carrier);
                }
                Ok(_) => {
                    warn!(path = %path.display(), "Carrier too small, excluded");
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Carrier unreadable, excluded");
                }
            }
        }

        if files.is_empty() {
            return Err(Error::NoCarriersFound(root.to_path_buf()));
        }

        self.set_files(root.to_path_buf(), files);
        info!(
            root = %self.root_dir.display(),
            carriers = self.files.len(),
            raw_bits = self.total_raw,
            "Carrier directory loaded"
        );
        Ok(())
    }

    fn set_files(&mut self, root_dir: PathBuf, mut files: Vec<CarrierFile>) {
        let mut starts = Vec::with_capacity(files.len());
        let mut total = 0u64;
        for (index, file) in files.iter_mut().enumerate() {
            file.set_index(index);
            starts.push(total);
            total += file.raw_capacity();
        }

        self.root_dir = root_dir;
        self.files = files;
        self.starts = starts;
        self.total_raw = total;
    }

    /// Directory the carriers came from.
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Carriers in address order.
    pub fn files(&self) -> &[CarrierFile] {
        &self.files
    }

    /// Number of carriers.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Total raw bit capacity of the pool.
    pub fn total_raw_capacity(&self) -> u64 {
        self.total_raw
    }

    /// Set the encoder the usable capacity is computed for.
    ///
    /// Returns the usable capacity in bits.
    pub fn apply_encoder(&mut self, encoder: Encoder) -> u64 {
        let usable = encoder.usable_capacity(self.total_raw);
        if self.encoder.as_ref() != Some(&encoder) {
            debug!(encoder = %encoder.kind(), usable_bits = usable, "Encoder applied");
            self.encoder = Some(encoder);
        }
        usable
    }

    /// Usable bits under the applied encoder; raw bits when none is applied.
    pub fn usable_capacity(&self) -> u64 {
        match &self.encoder {
            Some(encoder) => encoder.usable_capacity(self.total_raw),
            None => self.total_raw,
        }
    }

    /// Usable bits this pool would offer under any encoder.
    pub fn capacity_using(&self, encoder: &Encoder) -> u64 {
        encoder.usable_capacity(self.total_raw)
    }

    /// Read every carrier into memory.
    pub fn load_contents(&mut self) -> Result<()> {
        for file in &mut self.files {
            file.load()?;
        }
        debug!(carriers = self.files.len(), "Carrier contents loaded");
        Ok(())
    }

    /// Whether every carrier's contents are in memory.
    pub fn is_loaded(&self) -> bool {
        !self.files.is_empty() && self.files.iter().all(|f| f.is_loaded())
    }

    /// Whether any carrier has unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.files.iter().any(|f| f.is_dirty())
    }

    /// Translate a raw bit index into its carrier position.
    pub fn locate(&self, index: u64) -> Result<BitLocation> {
        if index >= self.total_raw {
            return Err(Error::IndexOutOfRange {
                index,
                capacity: self.total_raw,
            });
        }
        let file = self.starts.partition_point(|&start| start <= index) - 1;
        let (byte_offset, bit) = self.files[file]
            .layout()
            .position(index - self.starts[file]);
        Ok(BitLocation {
            file,
            byte_offset,
            bit,
        })
    }

    /// Read one raw bit.
    pub fn read_raw_bit(&self, index: u64) -> Result<bool> {
        let loc = self.locate(index)?;
        self.files[loc.file].read_bit(loc.byte_offset, loc.bit)
    }

    /// Write one raw bit.
    pub fn write_raw_bit(&mut self, index: u64, value: bool) -> Result<()> {
        let loc = self.locate(index)?;
        self.files[loc.file].write_bit(loc.byte_offset, loc.bit, value)
    }

    /// Write every dirty carrier back to disk.
    ///
    /// Keeps going after a failure and reports every failed file at the end.
    /// Files written before a failure stay written. Returns the number of
    /// files written.
    pub fn save_all(&mut self) -> Result<usize> {
        let mut written = 0;
        let mut failures = Vec::new();

        for file in &mut self.files {
            match file.save() {
                Ok(true) => {
                    debug!(path = %file.path().display(), "Carrier saved");
                    written += 1;
                }
                Ok(false) => {}
                Err(source) => {
                    warn!(path = %file.path().display(), error = %source, "Carrier save failed");
                    failures.push(CarrierIoFailure {
                        path: file.path().to_path_buf(),
                        source,
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(written)
        } else {
            Err(Error::SaveFailed(failures))
        }
    }
}

impl Default for CarrierFilesManager {
    fn default() -> Self {
        Self::new()
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with('.'))
}
