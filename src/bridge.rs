//! Single-file view of a loaded storage session.
//!
//! The disk exposes a root directory holding exactly one regular file,
//! [`FILE_NAME`], whose size is the usable capacity. Unlike the session
//! underneath, requests that run past the end are truncated instead of
//! rejected. All calls are serialized through one lock.

use crate::error::{Error, Result};
use crate::storage::StegoStorage;
use crate::vstorage::ReadReport;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

/// Name of the one file in the disk.
pub const FILE_NAME: &str = "virtualdisc.iso";

/// Kind of a disk entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
}

/// Attributes of a disk entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskEntry {
    pub name: String,
    pub kind: EntryKind,
    pub size: u64,
    pub mode: u32,
    pub nlink: u32,
}

/// A loaded session behind the single-file contract.
#[derive(Debug)]
pub struct VirtualDisk {
    session: Mutex<StegoStorage>,
}

impl VirtualDisk {
    /// Wrap a loaded session.
    pub fn new(session: StegoStorage) -> Result<Self> {
        if !session.is_loaded() {
            return Err(Error::NotLoaded);
        }
        info!(file = FILE_NAME, size = session.size(), "Virtual disk ready");
        Ok(Self {
            session: Mutex::new(session),
        })
    }

    /// Size of the disk file in bytes.
    pub fn size(&self) -> u64 {
        self.session.lock().size()
    }

    /// Attributes for `/` or `/virtualdisc.iso`.
    pub fn getattr(&self, path: &str) -> Result<DiskEntry> {
        match path.trim_start_matches('/') {
            "" => Ok(DiskEntry {
                name: "/".to_string(),
                kind: EntryKind::Directory,
                size: 0,
                mode: 0o755,
                nlink: 2,
            }),
            FILE_NAME => Ok(self.file_entry()),
            _ => Err(Error::EntryNotFound(path.to_string())),
        }
    }

    /// Entries of the root directory.
    pub fn readdir(&self, path: &str) -> Result<Vec<DiskEntry>> {
        if !path.trim_start_matches('/').is_empty() {
            return Err(Error::EntryNotFound(path.to_string()));
        }
        Ok(vec![self.file_entry()])
    }

    /// Read up to `buf.len()` bytes at `offset`.
    ///
    /// Returns zero bytes at or past the end of the file and a short read
    /// when the request crosses it. Damaged blocks are reported in the
    /// result's stats.
    pub fn read_at(&self, path: &str, offset: u64, buf: &mut [u8]) -> Result<ReadReport> {
        self.check_file(path)?;
        let session = self.session.lock();
        let len = clamp(offset, buf.len(), session.size());
        if len == 0 {
            return Ok(ReadReport::default());
        }

        let report = session.read(&mut buf[..len], offset)?;
        if !report.is_reliable() {
            warn!(
                offset,
                length = len,
                uncorrectable = report.stats.uncorrectable,
                "Unreliable data returned by disk read"
            );
        }
        Ok(report)
    }

    /// Write up to `data.len()` bytes at `offset`. Returns the bytes written.
    pub fn write_at(&self, path: &str, offset: u64, data: &[u8]) -> Result<usize> {
        self.check_file(path)?;
        let mut session = self.session.lock();
        let len = clamp(offset, data.len(), session.size());
        if len == 0 {
            return Ok(0);
        }

        session.write(&data[..len], offset)?;
        Ok(len)
    }

    /// Flush pending writes to the carriers.
    pub fn flush(&self) -> Result<usize> {
        self.session.lock().save()
    }

    /// Save and release the session.
    pub fn unmount(self) -> Result<()> {
        let mut session = self.session.into_inner();
        session.close()?;
        info!("Virtual disk unmounted");
        Ok(())
    }

    fn file_entry(&self) -> DiskEntry {
        DiskEntry {
            name: FILE_NAME.to_string(),
            kind: EntryKind::File,
            size: self.size(),
            mode: 0o644,
            nlink: 1,
        }
    }

    fn check_file(&self, path: &str) -> Result<()> {
        if path.trim_start_matches('/') == FILE_NAME {
            Ok(())
        } else {
            Err(Error::EntryNotFound(path.to_string()))
        }
    }
}

/// Bytes of a `length`-byte request at `offset` that fit in `size`.
fn clamp(offset: u64, length: usize, size: u64) -> usize {
    if offset >= size {
        debug!(offset, length, size, "Request starts past end of disk");
        return 0;
    }
    let room = size - offset;
    if length as u64 > room {
        debug!(offset, length, size, "Request truncated at end of disk");
        room as usize
    } else {
        length
    }
}
