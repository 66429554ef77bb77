//! Decoding results and per-read statistics.

/// Outcome of decoding one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStatus {
    /// No error found.
    Clean,
    /// One bit error found and corrected.
    Corrected,
    /// More errors than the code can correct; data is best effort.
    Uncorrectable,
}

/// Data bits recovered from one codeword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedBlock {
    /// The K data bits, least significant first.
    pub data: u64,
    /// What the decoder had to do to get them.
    pub status: BlockStatus,
}

/// Running tally of block statuses over one or more decodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Blocks decoded.
    pub blocks: u64,
    /// Blocks with a corrected error.
    pub corrected: u64,
    /// Blocks with uncorrectable errors.
    pub uncorrectable: u64,
}

impl DecodeStats {
    /// Count one decoded block.
    pub fn record(&mut self, status: BlockStatus) {
        self.blocks += 1;
        match status {
            BlockStatus::Clean => {}
            BlockStatus::Corrected => self.corrected += 1,
            BlockStatus::Uncorrectable => self.uncorrectable += 1,
        }
    }

    /// Add another tally.
    pub fn merge(&mut self, other: &DecodeStats) {
        self.blocks += other.blocks;
        self.corrected += other.corrected;
        self.uncorrectable += other.uncorrectable;
    }

    /// Whether every block decoded to trustworthy data.
    pub fn is_reliable(&self) -> bool {
        self.uncorrectable == 0
    }

    /// Percentage of blocks that needed a correction or failed.
    pub fn damage_percent(&self) -> f32 {
        if self.blocks == 0 {
            return 0.0;
        }
        (self.corrected + self.uncorrectable) as f32 / self.blocks as f32 * 100.0
    }
}
