//! A single carrier file and its in-memory contents.

use crate::carrier::layout::CarrierLayout;
use crate::config::CarrierOptions;
use crate::error::{Error, Result};
use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// One member of the carrier pool.
#[derive(Debug, Clone)]
pub struct CarrierFile {
    path: PathBuf,
    index: usize,
    file_len: u64,
    layout: CarrierLayout,
    content: Option<Vec<u8>>,
    dirty: bool,
}

impl CarrierFile {
    /// Inspect a file and compute its layout. Contents are not read yet.
    pub fn new(path: PathBuf, index: usize, options: &CarrierOptions) -> Result<Self> {
        let file_len = std::fs::metadata(&path)
            .map_err(|source| Error::CarrierIo {
                path: path.clone(),
                source,
            })?
            .len();
        let layout = CarrierLayout::detect(&path, file_len, options)?;

        Ok(Self {
            path,
            index,
            file_len,
            layout,
            content: None,
            dirty: false,
        })
    }

    /// Path to the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Position in the pool.
    pub fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    /// Size of the file when it was enumerated.
    pub fn file_len(&self) -> u64 {
        self.file_len
    }

    /// Where hidden bits live in this file.
    pub fn layout(&self) -> &CarrierLayout {
        &self.layout
    }

    /// Raw bit capacity.
    pub fn raw_capacity(&self) -> u64 {
        self.layout.raw_capacity()
    }

    /// Whether the contents are in memory.
    pub fn is_loaded(&self) -> bool {
        self.content.is_some()
    }

    /// Whether there are unsaved bit changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Read the whole file into memory.
    ///
    /// Fails if the file changed size since it was enumerated, because the
    /// pool's address partition would no longer match.
    pub fn load(&mut self) -> Result<()> {
        let content = std::fs::read(&self.path).map_err(|source| Error::CarrierIo {
            path: self.path.clone(),
            source,
        })?;

        if content.len() as u64 != self.file_len {
            return Err(Error::CarrierIo {
                path: self.path.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!(
                        "carrier size changed from {} to {} bytes",
                        self.file_len,
                        content.len()
                    ),
                ),
            });
        }

        self.content = Some(content);
        self.dirty = false;
        Ok(())
    }

    /// Read bit `shift` of the byte at `byte_offset`.
    pub fn read_bit(&self, byte_offset: u64, shift: u8) -> Result<bool> {
        let content = self.content.as_ref().ok_or(Error::NotLoaded)?;
        Ok((content[byte_offset as usize] >> shift) & 1 == 1)
    }

    /// Set bit `shift` of the byte at `byte_offset`. Only marks the file
    /// dirty on change.
    pub fn write_bit(&mut self, byte_offset: u64, shift: u8, value: bool) -> Result<()> {
        let content = self.content.as_mut().ok_or(Error::NotLoaded)?;
        let slot = &mut content[byte_offset as usize];
        let updated = (*slot & !(1 << shift)) | ((value as u8) << shift);
        if updated != *slot {
            *slot = updated;
            self.dirty = true;
        }
        Ok(())
    }

    /// Write the data region back to disk if anything changed.
    ///
    /// Returns whether the file was written.
    pub fn save(&mut self) -> std::io::Result<bool> {
        let content = match (&self.content, self.dirty) {
            (Some(content), true) => content,
            _ => return Ok(false),
        };

        let mut file = OpenOptions::new().write(true).open(&self.path)?;
        let start = self.layout.data_offset;
        file.seek(SeekFrom::Start(start))?;
        file.write_all(&content[start as usize..])?;
        file.sync_all()?;

        self.dirty = false;
        Ok(true)
    }
}
