//! Resilience tests - damage carrier bits and verify correction or detection.

use rand::{Rng, SeedableRng};
use std::fs;
use std::path::Path;
use stego_vdisk::config::{EncoderKind, PermutationKind, StegoConfig};
use stego_vdisk::{Error, StegoStorage};
use tempfile::TempDir;

/// Helper to create a carrier directory with files of the given sizes.
fn setup_carriers(sizes: &[usize]) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    for (i, size) in sizes.iter().enumerate() {
        let file_path = temp_dir.path().join(format!("carrier_{:02}.dat", i));
        let data: Vec<u8> = (0..*size).map(|x| (x * 13 % 256) as u8).collect();
        fs::write(&file_path, &data).expect("Failed to create carrier file");
    }

    temp_dir
}

fn open_session(dir: &Path, config: StegoConfig) -> StegoStorage {
    let mut storage = StegoStorage::new();
    storage.configure(config).expect("Failed to configure");
    storage.open(dir, "").expect("Failed to open");
    storage.load().expect("Failed to load");
    storage
}

/// Flip the lowest bit of each given byte of a carrier file.
fn flip_low_bits(file_path: &Path, offsets: &[usize]) {
    let mut data = fs::read(file_path).expect("Failed to read carrier");
    for &offset in offsets {
        data[offset] ^= 1;
    }
    fs::write(file_path, data).expect("Failed to write carrier");
}

fn identity(encoder: EncoderKind) -> StegoConfig {
    StegoConfig::new(encoder, PermutationKind::Identity, PermutationKind::Identity)
}

#[test]
fn test_one_flip_per_codeword_is_corrected() {
    let temp_dir = setup_carriers(&[3064]);
    let config = identity(EncoderKind::Hamming { parity_bits: 3 });
    let payload: Vec<u8> = (0..200u8).collect();
    {
        let mut storage = open_session(temp_dir.path(), config);
        storage.write(&payload, 0).unwrap();
        storage.close().unwrap();
    }

    // With identity maps codeword b sits on carrier bytes 64 + 7b .. 64 + 7b + 7.
    let blocks = payload.len() * 2;
    let offsets: Vec<usize> = (0..blocks).map(|b| 64 + 7 * b + b % 7).collect();
    flip_low_bits(&temp_dir.path().join("carrier_00.dat"), &offsets);

    let storage = open_session(temp_dir.path(), config);
    let mut out = vec![0u8; payload.len()];
    let report = storage.read(&mut out, 0).unwrap();

    assert_eq!(out, payload);
    assert_eq!(report.stats.corrected, blocks as u64);
    assert!(report.into_result().is_ok());
}

#[test]
fn test_scattered_damage_is_corrected_with_permutation() {
    let temp_dir = setup_carriers(&[4064, 4064]);
    let config = StegoConfig::default();
    let mut rng = rand::rngs::StdRng::seed_from_u64(42);
    let payload: Vec<u8> = (0..64).map(|_| rng.gen()).collect();
    {
        let mut storage = open_session(temp_dir.path(), config);
        storage.write(&payload, 0).unwrap();
        storage.close().unwrap();
    }

    // A single flipped carrier bit can land in at most one codeword.
    flip_low_bits(&temp_dir.path().join("carrier_01.dat"), &[1000]);

    let storage = open_session(temp_dir.path(), config);
    let mut out = vec![0u8; payload.len()];
    let report = storage.read(&mut out, 0).unwrap();
    assert_eq!(out, payload);
    assert!(report.is_reliable());
}

#[test]
fn test_double_flip_reported_by_extended_code() {
    let temp_dir = setup_carriers(&[1064]);
    let config = identity(EncoderKind::ExtendedHamming { parity_bits: 3 });
    {
        let mut storage = open_session(temp_dir.path(), config);
        storage.write(&[0xAB; 20], 0).unwrap();
        storage.close().unwrap();
    }

    // Two flips in codeword 3 (carrier bytes 64 + 24 .. 64 + 32).
    flip_low_bits(&temp_dir.path().join("carrier_00.dat"), &[64 + 25, 64 + 30]);

    let storage = open_session(temp_dir.path(), config);
    let mut out = [0u8; 20];
    let report = storage.read(&mut out, 0).unwrap();

    assert_eq!(report.stats.uncorrectable, 1);
    assert!(matches!(
        report.into_result(),
        Err(Error::CorruptionDetected { blocks: 1 })
    ));
    // Codeword 3 holds the high nibble of byte 1.
    assert_eq!(out[0], 0xAB);
    assert_eq!(&out[2..], &[0xAB; 18]);

    let scan = storage.scan().unwrap();
    assert!(scan.uncorrectable >= 1);
}

#[test]
fn test_damage_outside_read_range_is_not_reported() {
    let temp_dir = setup_carriers(&[1064]);
    let config = identity(EncoderKind::Hamming { parity_bits: 3 });
    {
        let mut storage = open_session(temp_dir.path(), config);
        storage.write(&[0x11; 40], 0).unwrap();
        storage.close().unwrap();
    }

    // Damage codeword 70, which holds byte 35.
    flip_low_bits(&temp_dir.path().join("carrier_00.dat"), &[64 + 7 * 70]);

    let storage = open_session(temp_dir.path(), config);
    let mut head = [0u8; 10];
    let report = storage.read(&mut head, 0).unwrap();
    assert_eq!(report.stats.corrected, 0);
    assert_eq!(report.stats.blocks, 20);

    let mut tail = [0u8; 1];
    let report = storage.read(&mut tail, 35).unwrap();
    assert_eq!(report.stats.corrected, 1);
    assert_eq!(tail[0], 0x11);
}

#[test]
fn test_plain_lsb_has_no_protection() {
    let temp_dir = setup_carriers(&[1064]);
    let config = identity(EncoderKind::Lsb);
    {
        let mut storage = open_session(temp_dir.path(), config);
        storage.write(&[0u8; 4], 0).unwrap();
        storage.close().unwrap();
    }

    flip_low_bits(&temp_dir.path().join("carrier_00.dat"), &[64 + 9]);

    let storage = open_session(temp_dir.path(), config);
    let mut out = [0u8; 4];
    let report = storage.read(&mut out, 0).unwrap();
    assert_eq!(out, [0, 0b10, 0, 0]);
    assert!(report.is_reliable());
    assert_eq!(report.stats.corrected, 0);
}
