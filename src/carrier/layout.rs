//! Where hidden bits live inside a carrier file.

use crate::config::CarrierOptions;
use crate::error::Result;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Size of the BMP file header that precedes the DIB header.
const BMP_FILE_HEADER_LEN: u64 = 14;

/// DIB header sizes of the known bitmap header versions.
const BMP_DIB_HEADER_LENS: [u64; 6] = [12, 40, 52, 56, 108, 124];

/// Recognized carrier formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarrierFormat {
    /// Any file; a fixed header is skipped.
    Raw,
    /// Windows bitmap; everything before the pixel array is skipped.
    Bmp,
}

/// Byte range of a carrier that holds hidden bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarrierLayout {
    /// Detected format.
    pub format: CarrierFormat,
    /// First byte that carries data.
    pub data_offset: u64,
    /// Number of bytes that carry data.
    pub units: u64,
    /// Low-order bits used in each of those bytes.
    pub bits_per_unit: u8,
}

impl CarrierLayout {
    /// Compute the layout of a file with `file_len` bytes.
    ///
    /// BMP files start hiding at the declared pixel array; every other file
    /// skips `options.reserved_header` bytes. Files too small to reach the
    /// data region get zero units.
    pub fn detect(path: &Path, file_len: u64, options: &CarrierOptions) -> Result<Self> {
        let (format, data_offset) = match bmp_pixel_offset(path, file_len)? {
            Some(offset) => (CarrierFormat::Bmp, offset),
            None => (CarrierFormat::Raw, options.reserved_header),
        };

        Ok(Self {
            format,
            data_offset,
            units: file_len.saturating_sub(data_offset),
            bits_per_unit: options.bits_per_unit,
        })
    }

    /// Raw bit capacity of the carrier.
    pub fn raw_capacity(&self) -> u64 {
        self.units * self.bits_per_unit as u64
    }

    /// Byte offset and bit index for the `bit`-th hidden bit.
    pub fn position(&self, bit: u64) -> (u64, u8) {
        let per_unit = self.bits_per_unit as u64;
        (self.data_offset + bit / per_unit, (bit % per_unit) as u8)
    }
}

/// Pixel array offset of a well-formed BMP file, `None` for anything else.
///
/// The DIB header size must be a known version and the pixel array must
/// start after both headers, so a stray `BM` prefix never exposes header
/// bytes to hiding.
fn bmp_pixel_offset(path: &Path, file_len: u64) -> Result<Option<u64>> {
    let mut header = [0u8; BMP_FILE_HEADER_LEN as usize + 4];
    if file_len < header.len() as u64 {
        return Ok(None);
    }
    File::open(path)?.read_exact(&mut header)?;

    if &header[0..2] != b"BM" {
        return Ok(None);
    }

    let offset = u32::from_le_bytes([header[10], header[11], header[12], header[13]]) as u64;
    let dib_len = u32::from_le_bytes([header[14], header[15], header[16], header[17]]) as u64;
    if !BMP_DIB_HEADER_LENS.contains(&dib_len)
        || offset < BMP_FILE_HEADER_LEN + dib_len
        || offset > file_len
    {
        return Ok(None);
    }
    Ok(Some(offset))
}
