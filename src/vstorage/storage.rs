//! Byte-addressable store over the encoded, permuted carrier pool.

use crate::carrier::CarrierFilesManager;
use crate::config::{ConfigState, StegoConfig};
use crate::encoding::{BlockStatus, DecodeStats, DecodedBlock, Encoder};
use crate::error::{Error, Result};
use crate::vstorage::mapping::AddressMap;
use tracing::{debug, error, info, warn};

/// Outcome of a successful read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadReport {
    /// Bytes read.
    pub bytes: usize,
    /// Block statistics for the blocks touched.
    pub stats: DecodeStats,
}

impl ReadReport {
    /// Whether every block decoded to trustworthy data.
    pub fn is_reliable(&self) -> bool {
        self.stats.is_reliable()
    }

    /// Turn uncorrectable blocks into [`Error::CorruptionDetected`].
    ///
    /// The buffer passed to the read still holds the best-effort data.
    pub fn into_result(self) -> Result<Self> {
        if self.stats.uncorrectable > 0 {
            return Err(Error::CorruptionDetected {
                blocks: self.stats.uncorrectable,
            });
        }
        Ok(self)
    }
}

/// The loaded virtual storage.
///
/// Owns the carrier pool for the rest of the session. Dropping it saves any
/// dirty carriers on a best-effort basis.
#[derive(Debug)]
pub struct VirtualStorage {
    pool: CarrierFilesManager,
    config: StegoConfig,
    encoder: Encoder,
    map: AddressMap,
    blocks: u64,
}

impl VirtualStorage {
    /// Load the virtual storage on top of an enumerated carrier pool.
    ///
    /// Requires an initialized configuration and at least one carrier.
    /// Carrier contents are read into memory here if not already loaded.
    pub fn load(mut pool: CarrierFilesManager, config: &ConfigState) -> Result<Self> {
        let config = *config.get().ok_or(Error::NotConfigured)?;
        if pool.file_count() == 0 {
            return Err(Error::NoCarriersFound(pool.root_dir().to_path_buf()));
        }

        let encoder = Encoder::new(config.encoder);
        pool.apply_encoder(encoder.clone());
        if !pool.is_loaded() {
            pool.load_contents()?;
        }

        let raw = pool.total_raw_capacity();
        let map = AddressMap::new(&config, pool.key(), raw);
        let blocks = encoder.whole_blocks(raw);

        let storage = Self {
            pool,
            config,
            encoder,
            map,
            blocks,
        };
        info!(
            encoder = %config.encoder,
            global = %config.global_perm,
            local = %config.local_perm,
            raw_bits = raw,
            capacity = storage.usable_capacity(),
            "Virtual storage loaded"
        );
        Ok(storage)
    }

    /// Active configuration.
    pub fn config(&self) -> &StegoConfig {
        &self.config
    }

    /// Active encoder.
    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    /// The carrier pool.
    pub fn pool(&self) -> &CarrierFilesManager {
        &self.pool
    }

    /// Usable data bits in whole codewords.
    ///
    /// This can be well below [`CarrierFilesManager::usable_capacity`], which
    /// scales the raw bits by the code rate and so counts the data share of a
    /// trailing partial codeword. A partial codeword is never written.
    pub fn usable_bits(&self) -> u64 {
        self.blocks * self.encoder.data_bits() as u64
    }

    /// Usable capacity in bytes: [`usable_bits`](Self::usable_bits) over 8,
    /// rounded down.
    pub fn usable_capacity(&self) -> u64 {
        self.usable_bits() / 8
    }

    /// Read `buf.len()` bytes starting at `offset`.
    ///
    /// The whole range must lie inside the usable capacity. Corrected and
    /// uncorrectable blocks are reported, not raised; see
    /// [`ReadReport::into_result`].
    pub fn read(&self, offset: u64, buf: &mut [u8]) -> Result<ReadReport> {
        let (start, end) = self.bit_range(offset, buf.len())?;
        buf.fill(0);

        let mut stats = DecodeStats::default();
        for block in self.blocks_between(start, end) {
            let decoded = self.read_block(block)?;
            stats.record(decoded.status);

            let first = block * self.k();
            for slot in 0..self.k() {
                let bit = first + slot;
                if bit < start || bit >= end {
                    continue;
                }
                if (decoded.data >> slot) & 1 == 1 {
                    let rel = bit - start;
                    buf[(rel / 8) as usize] |= 1 << (rel % 8);
                }
            }
        }

        if stats.corrected > 0 || stats.uncorrectable > 0 {
            warn!(
                offset,
                length = buf.len(),
                corrected = stats.corrected,
                uncorrectable = stats.uncorrectable,
                "Damaged blocks in read"
            );
        }

        Ok(ReadReport {
            bytes: buf.len(),
            stats,
        })
    }

    /// Write `data` starting at `offset`.
    ///
    /// The whole range must lie inside the usable capacity; nothing is
    /// written otherwise. Blocks only partly covered by the range are read,
    /// merged and re-encoded.
    pub fn write(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        let (start, end) = self.bit_range(offset, data.len())?;

        for block in self.blocks_between(start, end) {
            let first = block * self.k();
            let covered = first >= start && first + self.k() <= end;

            let mut word = if covered {
                0
            } else {
                let existing = self.read_block(block)?;
                if existing.status == BlockStatus::Uncorrectable {
                    warn!(block, "Merging into an uncorrectable block");
                }
                existing.data
            };

            for slot in 0..self.k() {
                let bit = first + slot;
                if bit < start || bit >= end {
                    continue;
                }
                let rel = bit - start;
                let value = (data[(rel / 8) as usize] >> (rel % 8)) & 1 == 1;
                word = (word & !(1 << slot)) | ((value as u64) << slot);
            }

            self.write_block(block, word)?;
        }

        debug!(offset, length = data.len(), "Write complete");
        Ok(())
    }

    /// Decode every block and count the damaged ones.
    pub fn scan(&self) -> Result<DecodeStats> {
        let mut stats = DecodeStats::default();
        for block in 0..self.blocks {
            stats.record(self.read_block(block)?.status);
        }
        debug!(
            blocks = stats.blocks,
            corrected = stats.corrected,
            uncorrectable = stats.uncorrectable,
            "Scan complete"
        );
        Ok(stats)
    }

    /// Flush dirty carriers. The storage stays loaded.
    pub fn save(&mut self) -> Result<usize> {
        let written = self.pool.save_all()?;
        info!(carriers = written, "Virtual storage saved");
        Ok(written)
    }

    /// Whether any write has not been saved yet.
    pub fn is_dirty(&self) -> bool {
        self.pool.is_dirty()
    }

    fn k(&self) -> u64 {
        self.encoder.data_bits() as u64
    }

    fn n(&self) -> u64 {
        self.encoder.codeword_bits() as u64
    }

    /// Validate a byte range and convert it to a data bit range.
    fn bit_range(&self, offset: u64, length: usize) -> Result<(u64, u64)> {
        let capacity = self.usable_capacity();
        let length = length as u64;
        match offset.checked_add(length) {
            Some(end) if end <= capacity => Ok((offset * 8, end * 8)),
            _ => Err(Error::OutOfRange {
                offset,
                length,
                capacity,
            }),
        }
    }

    fn blocks_between(&self, start: u64, end: u64) -> std::ops::Range<u64> {
        if start >= end {
            return 0..0;
        }
        start / self.k()..(end - 1) / self.k() + 1
    }

    fn read_block(&self, block: u64) -> Result<DecodedBlock> {
        let base = block * self.n();
        let mut word = 0u64;
        for c in 0..self.n() {
            if self.pool.read_raw_bit(self.map.raw_index(base + c))? {
                word |= 1 << c;
            }
        }
        Ok(self.encoder.decode(word))
    }

    fn write_block(&mut self, block: u64, data: u64) -> Result<()> {
        let base = block * self.n();
        let word = self.encoder.encode(data);
        for c in 0..self.n() {
            let raw = self.map.raw_index(base + c);
            self.pool.write_raw_bit(raw, (word >> c) & 1 == 1)?;
        }
        Ok(())
    }
}

impl Drop for VirtualStorage {
    fn drop(&mut self) {
        if !self.pool.is_dirty() {
            return;
        }
        match self.pool.save_all() {
            Ok(written) => debug!(carriers = written, "Saved on close"),
            Err(e) => error!(error = %e, "Save on close failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EncoderKind, PermutationKind};
    use std::fs;
    use tempfile::TempDir;

    fn pool_with(sizes: &[usize]) -> (TempDir, CarrierFilesManager) {
        let dir = TempDir::new().unwrap();
        for (i, size) in sizes.iter().enumerate() {
            let data: Vec<u8> = (0..*size).map(|x| (x * 31 % 251) as u8).collect();
            fs::write(dir.path().join(format!("carrier_{:02}.dat", i)), data).unwrap();
        }
        let mut pool = CarrierFilesManager::new();
        pool.load_directory(dir.path()).unwrap();
        (dir, pool)
    }

    fn state(config: StegoConfig) -> ConfigState {
        let state = ConfigState::new();
        state.init(config).unwrap();
        state
    }

    #[test]
    fn test_load_requires_configuration() {
        let (_dir, pool) = pool_with(&[1000]);
        let result = VirtualStorage::load(pool, &ConfigState::new());
        assert!(matches!(result, Err(Error::NotConfigured)));
    }

    #[test]
    fn test_load_requires_carriers() {
        let result = VirtualStorage::load(
            CarrierFilesManager::new(),
            &state(StegoConfig::default()),
        );
        assert!(matches!(result, Err(Error::NoCarriersFound(_))));
    }

    #[test]
    fn test_capacity_in_whole_blocks() {
        // 1000 + 500 raw bits.
        let (_dir, pool) = pool_with(&[1064, 564]);
        let storage = VirtualStorage::load(pool, &state(StegoConfig::default())).unwrap();

        assert_eq!(storage.pool().total_raw_capacity(), 1500);
        assert_eq!(storage.pool().usable_capacity(), 857);
        // 214 whole (7,4) blocks = 856 bits = 107 bytes.
        assert_eq!(storage.usable_bits(), 856);
        assert_eq!(storage.usable_capacity(), 107);
    }

    #[test]
    fn test_long_codewords_drop_partial_tail() {
        // 566 raw bits hold 8 whole (63,57) codewords and 62 leftover bits.
        let (_dir, pool) = pool_with(&[630]);
        let config = StegoConfig::new(
            EncoderKind::Hamming { parity_bits: 6 },
            PermutationKind::Identity,
            PermutationKind::Identity,
        );
        let mut storage = VirtualStorage::load(pool, &state(config)).unwrap();

        assert_eq!(storage.pool().usable_capacity(), 512);
        assert_eq!(storage.usable_bits(), 456);
        assert_eq!(storage.usable_capacity(), 57);
        storage.write(0, &[0xA5; 57]).unwrap();
        assert!(matches!(
            storage.write(57, &[0]),
            Err(Error::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_roundtrip_unaligned_ranges() {
        let (_dir, pool) = pool_with(&[3000, 2500]);
        let mut storage = VirtualStorage::load(pool, &state(StegoConfig::default())).unwrap();

        let data: Vec<u8> = (0..100u8).map(|x| x.wrapping_mul(13) ^ 0x5C).collect();
        storage.write(3, &data).unwrap();
        storage.write(200, b"tail").unwrap();

        let mut out = vec![0u8; 100];
        let report = storage.read(3, &mut out).unwrap();
        assert_eq!(out, data);
        assert!(report.is_reliable());
        assert_eq!(report.bytes, 100);

        let mut tail = [0u8; 4];
        storage.read(200, &mut tail).unwrap();
        assert_eq!(&tail, b"tail");
    }

    #[test]
    fn test_partial_block_write_keeps_neighbours() {
        let (_dir, pool) = pool_with(&[2000]);
        let mut storage = VirtualStorage::load(pool, &state(StegoConfig::default())).unwrap();

        storage.write(0, &[0xFF; 16]).unwrap();
        storage.write(5, &[0x00]).unwrap();

        let mut out = [0u8; 16];
        storage.read(0, &mut out).unwrap();
        let mut expected = [0xFF; 16];
        expected[5] = 0;
        assert_eq!(out, expected);
    }

    #[test]
    fn test_boundaries() {
        let (_dir, pool) = pool_with(&[1064, 564]);
        let mut storage = VirtualStorage::load(pool, &state(StegoConfig::default())).unwrap();
        let cap = storage.usable_capacity();

        let mut buf = [0u8; 1];
        assert!(matches!(
            storage.read(cap, &mut buf),
            Err(Error::OutOfRange { .. })
        ));
        assert!(matches!(
            storage.write(cap, &[1]),
            Err(Error::OutOfRange { .. })
        ));
        assert!(matches!(
            storage.read(u64::MAX, &mut buf),
            Err(Error::OutOfRange { .. })
        ));

        storage.write(cap - 1, &[0xA5]).unwrap();
        storage.read(cap - 1, &mut buf).unwrap();
        assert_eq!(buf[0], 0xA5);

        let mut whole = vec![0u8; cap as usize];
        assert!(storage.read(0, &mut whole).is_ok());
        let mut over = vec![0u8; cap as usize + 1];
        assert!(storage.read(0, &mut over).is_err());
    }

    #[test]
    fn test_rejected_write_changes_nothing() {
        let (_dir, pool) = pool_with(&[1064]);
        let mut storage = VirtualStorage::load(pool, &state(StegoConfig::default())).unwrap();
        let cap = storage.usable_capacity();

        assert!(storage.write(cap - 2, &[1, 2, 3]).is_err());
        assert!(!storage.is_dirty());
    }

    #[test]
    fn test_single_bit_damage_is_corrected() {
        let (_dir, pool) = pool_with(&[4000]);
        let config = StegoConfig::new(
            EncoderKind::Hamming { parity_bits: 3 },
            PermutationKind::Identity,
            PermutationKind::Identity,
        );
        let mut storage = VirtualStorage::load(pool, &state(config)).unwrap();
        storage.write(0, b"resilient").unwrap();

        // Identity mapping: block b occupies raw bits 7b..7b+7. Flip one per block.
        for block in 0..18 {
            let raw = block * 7 + block % 7;
            let bit = storage.pool.read_raw_bit(raw).unwrap();
            storage.pool.write_raw_bit(raw, !bit).unwrap();
        }

        let mut out = [0u8; 9];
        let report = storage.read(0, &mut out).unwrap();
        assert_eq!(&out, b"resilient");
        assert_eq!(report.stats.corrected, 18);
        assert!(report.into_result().is_ok());

        let scan = storage.scan().unwrap();
        assert_eq!(scan.blocks, storage.usable_bits() / 4);
        // Unwritten blocks hold carrier noise, which the perfect code "corrects".
        assert!(scan.corrected >= 18);
        assert_eq!(scan.uncorrectable, 0);
    }

    #[test]
    fn test_double_damage_detected_by_extended_code() {
        let (_dir, pool) = pool_with(&[4000]);
        let config = StegoConfig::new(
            EncoderKind::ExtendedHamming { parity_bits: 3 },
            PermutationKind::Identity,
            PermutationKind::Identity,
        );
        let mut storage = VirtualStorage::load(pool, &state(config)).unwrap();
        storage.write(0, &[0x3C; 4]).unwrap();

        // Two flips inside the first 8-bit codeword.
        for raw in [1, 6] {
            let bit = storage.pool.read_raw_bit(raw).unwrap();
            storage.pool.write_raw_bit(raw, !bit).unwrap();
        }

        let mut out = [0u8; 4];
        let report = storage.read(0, &mut out).unwrap();
        assert_eq!(report.stats.uncorrectable, 1);
        assert!(!report.is_reliable());
        assert!(matches!(
            report.into_result(),
            Err(Error::CorruptionDetected { blocks: 1 })
        ));
        // Untouched blocks still decode.
        assert_eq!(&out[1..], &[0x3C; 3]);
    }

    #[test]
    fn test_drop_saves_dirty_carriers() {
        let (dir, pool) = pool_with(&[3000]);
        let config = state(StegoConfig::default());
        let path = dir.path().join("carrier_00.dat");
        let before = fs::read(&path).unwrap();

        {
            let mut storage = VirtualStorage::load(pool, &config).unwrap();
            storage.write(0, b"persist me").unwrap();
        }

        assert_ne!(fs::read(&path).unwrap(), before);

        let mut pool = CarrierFilesManager::new();
        pool.load_directory(dir.path()).unwrap();
        let storage = VirtualStorage::load(pool, &config).unwrap();
        let mut out = [0u8; 10];
        storage.read(0, &mut out).unwrap();
        assert_eq!(&out, b"persist me");
    }
}
