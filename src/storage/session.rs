//! The storage session: configure, open, load, then read and write.

use crate::carrier::CarrierFilesManager;
use crate::config::{CarrierOptions, ConfigState, StegoConfig};
use crate::encoding::DecodeStats;
use crate::error::{Error, Result};
use crate::vstorage::{ReadReport, VirtualStorage};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Where the session is in its lifecycle.
#[derive(Debug)]
enum Stage {
    /// No carrier directory attached.
    Closed,
    /// Carriers enumerated and keyed, contents not decoded yet.
    Opened(CarrierFilesManager),
    /// Virtual storage ready for I/O.
    Loaded(VirtualStorage),
}

/// Summary of a loaded session.
#[derive(Debug, Clone)]
pub struct StorageInfo {
    pub root_dir: PathBuf,
    pub carrier_count: usize,
    pub raw_bits: u64,
    pub usable_bits: u64,
    pub usable_bytes: u64,
    pub config: StegoConfig,
    pub key_fingerprint: String,
    pub default_key: bool,
}

/// A steganographic storage session over one carrier directory.
///
/// The configuration may be set before or after `open`, but must be in place
/// before `load`. Once set it stays frozen for the lifetime of the session,
/// including across `close` and a later `open`.
#[derive(Debug)]
pub struct StegoStorage {
    config: ConfigState,
    options: CarrierOptions,
    stage: Stage,
}

impl StegoStorage {
    /// Create an unconfigured session with default carrier options.
    pub fn new() -> Self {
        Self::with_options(CarrierOptions::default())
    }

    /// Create an unconfigured session.
    pub fn with_options(options: CarrierOptions) -> Self {
        Self {
            config: ConfigState::new(),
            options,
            stage: Stage::Closed,
        }
    }

    /// Set the encoder and permutations.
    pub fn configure(&mut self, config: StegoConfig) -> Result<()> {
        self.config.init(config)?;
        info!(
            encoder = %config.encoder,
            global = %config.global_perm,
            local = %config.local_perm,
            "Storage configured"
        );
        Ok(())
    }

    /// Configure with the default encoder and permutations.
    pub fn configure_default(&mut self) -> Result<()> {
        self.configure(StegoConfig::default())
    }

    /// Configure from a JSON config file.
    pub fn configure_from_file(&mut self, path: &Path) -> Result<()> {
        let config = StegoConfig::from_json_file(path)?;
        debug!(path = %path.display(), "Config file parsed");
        self.configure(config)
    }

    /// Whether a configuration is in place.
    pub fn is_configured(&self) -> bool {
        self.config.initialized()
    }

    /// The frozen configuration, if any.
    pub fn config(&self) -> Option<&StegoConfig> {
        self.config.get()
    }

    /// Enumerate the carriers under `dir` and derive the pool key.
    ///
    /// Opening again before `load` replaces the previous directory.
    pub fn open(&mut self, dir: &Path, password: &str) -> Result<()> {
        if let Stage::Loaded(_) = self.stage {
            return Err(Error::AlreadyLoaded);
        }

        let mut pool = CarrierFilesManager::with_options(self.options);
        pool.set_password(password)?;
        pool.load_directory(dir)?;

        info!(
            dir = %dir.display(),
            carriers = pool.file_count(),
            raw_bits = pool.total_raw_capacity(),
            "Storage opened"
        );
        self.stage = Stage::Opened(pool);
        Ok(())
    }

    /// Read the carriers and build the virtual storage.
    ///
    /// A session that fails while reading carrier contents is left closed.
    pub fn load(&mut self) -> Result<()> {
        match self.stage {
            Stage::Closed => return Err(Error::NotOpened),
            Stage::Loaded(_) => return Ok(()),
            Stage::Opened(_) if !self.config.initialized() => return Err(Error::NotConfigured),
            Stage::Opened(_) => {}
        }

        if let Stage::Opened(pool) = std::mem::replace(&mut self.stage, Stage::Closed) {
            self.stage = Stage::Loaded(VirtualStorage::load(pool, &self.config)?);
        }
        Ok(())
    }

    /// Whether a carrier directory is attached.
    pub fn is_opened(&self) -> bool {
        !matches!(self.stage, Stage::Closed)
    }

    /// Whether the virtual storage is ready for I/O.
    pub fn is_loaded(&self) -> bool {
        matches!(self.stage, Stage::Loaded(_))
    }

    /// Fill `buf` from `offset`.
    ///
    /// Uncorrectable blocks are reported in the returned [`ReadReport`]
    /// rather than failing the read.
    pub fn read(&self, buf: &mut [u8], offset: u64) -> Result<ReadReport> {
        self.storage()?.read(offset, buf)
    }

    /// Write `buf` at `offset`. Changes stay in memory until `save`.
    pub fn write(&mut self, buf: &[u8], offset: u64) -> Result<()> {
        self.storage_mut()?.write(offset, buf)
    }

    /// Flush dirty carriers to disk. Returns the number of files written.
    pub fn save(&mut self) -> Result<usize> {
        self.storage_mut()?.save()
    }

    /// Usable capacity in bytes, 0 until loaded.
    pub fn size(&self) -> u64 {
        match &self.stage {
            Stage::Loaded(storage) => storage.usable_capacity(),
            _ => 0,
        }
    }

    /// Decode every block and report how many are damaged.
    pub fn scan(&self) -> Result<DecodeStats> {
        self.storage()?.scan()
    }

    /// Summary of the loaded session.
    pub fn info(&self) -> Result<StorageInfo> {
        let storage = self.storage()?;
        let pool = storage.pool();
        Ok(StorageInfo {
            root_dir: pool.root_dir().to_path_buf(),
            carrier_count: pool.file_count(),
            raw_bits: pool.total_raw_capacity(),
            usable_bits: storage.usable_bits(),
            usable_bytes: storage.usable_capacity(),
            config: *storage.config(),
            key_fingerprint: pool.key().fingerprint(),
            default_key: pool.key().is_default(),
        })
    }

    /// Save and detach the carrier directory.
    ///
    /// If the save fails the session stays loaded so it can be retried.
    pub fn close(&mut self) -> Result<()> {
        if let Stage::Loaded(storage) = &mut self.stage {
            storage.save()?;
        }
        if self.is_opened() {
            info!("Storage closed");
        }
        self.stage = Stage::Closed;
        Ok(())
    }

    fn storage(&self) -> Result<&VirtualStorage> {
        match &self.stage {
            Stage::Loaded(storage) => Ok(storage),
            _ => Err(Error::NotLoaded),
        }
    }

    fn storage_mut(&mut self) -> Result<&mut VirtualStorage> {
        match &mut self.stage {
            Stage::Loaded(storage) => Ok(storage),
            _ => Err(Error::NotLoaded),
        }
    }
}

impl Default for StegoStorage {
    fn default() -> Self {
        Self::new()
    }
}
