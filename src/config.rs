//! Configuration constants and types for the virtual disk.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

/// Default number of Hamming parity bits (rate 4/7).
pub const DEFAULT_PARITY_BITS: u8 = 3;

/// Smallest supported number of Hamming parity bits.
pub const MIN_PARITY_BITS: u8 = 2;

/// Largest supported number of Hamming parity bits (codewords fit in 64 bits).
pub const MAX_PARITY_BITS: u8 = 6;

/// Argon2id parameters for deriving the pool secret.
pub mod kdf_params {
    /// Memory cost in KiB (8 MB).
    pub const MEMORY_COST: u32 = 8192;

    /// Time cost (iterations).
    pub const TIME_COST: u32 = 2;

    /// Parallelism factor.
    pub const PARALLELISM: u32 = 1;

    /// Output length in bytes (256 bits).
    pub const OUTPUT_LENGTH: usize = 32;

    /// Fixed application salt. The pool must be reopened from the password
    /// alone, so nothing random can be stored next to the carriers.
    pub const SALT: &[u8; 16] = b"stego-vdisk/pool";
}

/// Carrier layout parameters.
pub mod carrier_params {
    /// Bytes at the start of a raw carrier that are never touched.
    pub const RESERVED_HEADER_BYTES: u64 = 64;

    /// Default number of low-order bits hidden in each carrier byte.
    pub const DEFAULT_BITS_PER_UNIT: u8 = 1;

    /// Largest accepted number of hidden bits per carrier byte.
    pub const MAX_BITS_PER_UNIT: u8 = 4;
}

/// Size of the sub-blocks the local permutation operates on, in bits.
pub const LOCAL_BLOCK_BITS: u64 = 4096;

/// How data is hidden inside each carrier file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierOptions {
    /// Low-order bits of each carrier byte that hold hidden data.
    pub bits_per_unit: u8,
    /// Leading bytes of a raw carrier that are never modified.
    pub reserved_header: u64,
}

impl Default for CarrierOptions {
    fn default() -> Self {
        Self {
            bits_per_unit: carrier_params::DEFAULT_BITS_PER_UNIT,
            reserved_header: carrier_params::RESERVED_HEADER_BYTES,
        }
    }
}

impl CarrierOptions {
    /// Create carrier options with custom settings.
    pub fn new(bits_per_unit: u8, reserved_header: u64) -> Self {
        Self {
            bits_per_unit,
            reserved_header,
        }
    }

    /// Validate the options.
    pub fn validate(&self) -> Result<()> {
        if self.bits_per_unit == 0 || self.bits_per_unit > carrier_params::MAX_BITS_PER_UNIT {
            return Err(Error::Configuration(format!(
                "Bits per unit must be between 1 and {}",
                carrier_params::MAX_BITS_PER_UNIT
            )));
        }
        Ok(())
    }
}

/// Error-correcting code applied to the hidden data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncoderKind {
    /// No redundancy, one data bit per carrier bit.
    Lsb,
    /// Hamming code, corrects one error per block.
    Hamming { parity_bits: u8 },
    /// Hamming code with an overall parity bit, corrects one error and
    /// detects two.
    ExtendedHamming { parity_bits: u8 },
}

impl EncoderKind {
    /// Canonical name used in config files.
    pub fn name(&self) -> &'static str {
        match self {
            EncoderKind::Lsb => "lsb",
            EncoderKind::Hamming { .. } => "hamming",
            EncoderKind::ExtendedHamming { .. } => "hamming_ext",
        }
    }

    /// Parity bits of the Hamming variants.
    pub fn parity_bits(&self) -> Option<u8> {
        match self {
            EncoderKind::Lsb => None,
            EncoderKind::Hamming { parity_bits } | EncoderKind::ExtendedHamming { parity_bits } => {
                Some(*parity_bits)
            }
        }
    }

    /// Build an encoder kind from a config name and an optional parameter.
    pub fn from_name(name: &str, parity_bits: Option<u8>) -> Result<Self> {
        let parity_bits = parity_bits.unwrap_or(DEFAULT_PARITY_BITS);
        let kind = match name.to_ascii_lowercase().as_str() {
            "lsb" | "identity" => EncoderKind::Lsb,
            "hamming" => EncoderKind::Hamming { parity_bits },
            "hamming_ext" | "secded" => EncoderKind::ExtendedHamming { parity_bits },
            other => {
                return Err(Error::Configuration(format!("Unknown encoder: {}", other)));
            }
        };
        kind.validate()?;
        Ok(kind)
    }

    /// Validate the encoder parameters.
    pub fn validate(&self) -> Result<()> {
        match self.parity_bits() {
            Some(p) if !(MIN_PARITY_BITS..=MAX_PARITY_BITS).contains(&p) => {
                Err(Error::Configuration(format!(
                    "Hamming parity bits must be between {} and {}, got {}",
                    MIN_PARITY_BITS, MAX_PARITY_BITS, p
                )))
            }
            _ => Ok(()),
        }
    }
}

impl Default for EncoderKind {
    fn default() -> Self {
        EncoderKind::Hamming {
            parity_bits: DEFAULT_PARITY_BITS,
        }
    }
}

impl fmt::Display for EncoderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parity_bits() {
            Some(p) => write!(f, "{}({})", self.name(), p),
            None => f.write_str(self.name()),
        }
    }
}

/// Keyed bijection used to scatter encoded bits over the carriers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PermutationKind {
    /// Leaves positions in place.
    Identity,
    /// `(a * i + b) mod n`.
    Affine,
    /// Feistel network with cycle walking.
    #[default]
    Feistel,
}

impl PermutationKind {
    /// Canonical name used in config files.
    pub fn name(&self) -> &'static str {
        match self {
            PermutationKind::Identity => "identity",
            PermutationKind::Affine => "affine",
            PermutationKind::Feistel => "feistel",
        }
    }
}

impl FromStr for PermutationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "identity" => Ok(PermutationKind::Identity),
            "affine" => Ok(PermutationKind::Affine),
            "feistel" | "feistelnum" | "feistel_num" => Ok(PermutationKind::Feistel),
            other => Err(Error::Configuration(format!(
                "Unknown permutation: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for PermutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Active encoder and permutation variants for a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StegoConfig {
    /// Error-correcting code.
    pub encoder: EncoderKind,
    /// Permutation over the whole raw address space.
    pub global_perm: PermutationKind,
    /// Permutation inside each local sub-block.
    pub local_perm: PermutationKind,
}

/// On-disk shape of the config file: names plus optional parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    encoder: String,
    global_perm: String,
    local_perm: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parity_bits: Option<u8>,
}

impl StegoConfig {
    /// Create a configuration from explicit variants.
    pub fn new(
        encoder: EncoderKind,
        global_perm: PermutationKind,
        local_perm: PermutationKind,
    ) -> Self {
        Self {
            encoder,
            global_perm,
            local_perm,
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.encoder.validate()
    }

    /// Parse a config record such as
    /// `{"encoder": "hamming", "global_perm": "feistel", "local_perm": "affine"}`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: ConfigFile = serde_json::from_str(json)?;
        let config = Self {
            encoder: EncoderKind::from_name(&file.encoder, file.parity_bits)?,
            global_perm: file.global_perm.parse()?,
            local_perm: file.local_perm.parse()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load a config file from disk.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!(
                "Failed to open config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&content)
    }

    /// Serialize to the config file format.
    pub fn to_json_string(&self) -> Result<String> {
        let file = ConfigFile {
            encoder: self.encoder.name().to_string(),
            global_perm: self.global_perm.name().to_string(),
            local_perm: self.local_perm.name().to_string(),
            parity_bits: self.encoder.parity_bits(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }
}

/// Write-once holder of the session configuration.
///
/// The first `init` freezes the value. Later calls with the same value are
/// accepted, anything else is rejected.
#[derive(Debug, Default)]
pub struct ConfigState {
    cell: OnceLock<StegoConfig>,
}

impl ConfigState {
    /// Create an uninitialized state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Freeze the configuration.
    pub fn init(&self, config: StegoConfig) -> Result<()> {
        config.validate()?;
        let current = self.cell.get_or_init(|| config);
        if *current != config {
            return Err(Error::Configuration(format!(
                "Already configured with encoder {}, global {}, local {}",
                current.encoder, current.global_perm, current.local_perm
            )));
        }
        Ok(())
    }

    /// Whether `init` has succeeded.
    pub fn initialized(&self) -> bool {
        self.cell.get().is_some()
    }

    /// The frozen configuration, if any.
    pub fn get(&self) -> Option<&StegoConfig> {
        self.cell.get()
    }
}
