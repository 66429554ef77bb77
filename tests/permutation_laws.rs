//! Property tests for the permutation and encoder layers.

use proptest::prelude::*;
use stego_vdisk::config::{EncoderKind, PermutationKind};
use stego_vdisk::encoding::{BlockStatus, Encoder};
use stego_vdisk::permutation::{BlockedPermutation, Permutation};

fn permutation_kind() -> impl Strategy<Value = PermutationKind> {
    prop_oneof![
        Just(PermutationKind::Identity),
        Just(PermutationKind::Affine),
        Just(PermutationKind::Feistel),
    ]
}

fn hamming_kind() -> impl Strategy<Value = EncoderKind> {
    (2u8..=6, any::<bool>()).prop_map(|(parity_bits, extended)| {
        if extended {
            EncoderKind::ExtendedHamming { parity_bits }
        } else {
            EncoderKind::Hamming { parity_bits }
        }
    })
}

proptest! {
    #[test]
    fn test_inverse_undoes_permute(
        kind in permutation_kind(),
        size in 1u64..1_000_000,
        key in any::<[u8; 32]>(),
        probes in proptest::collection::vec(any::<u64>(), 1..32)
    ) {
        let perm = Permutation::new(kind, size, &key);
        for probe in probes {
            let i = probe % size;
            let j = perm.permute(i);
            prop_assert!(j < size);
            prop_assert_eq!(perm.inverse(j), i);
        }
    }

    #[test]
    fn test_small_domains_are_bijections(
        kind in permutation_kind(),
        size in 1u64..600,
        key in any::<[u8; 32]>()
    ) {
        let perm = Permutation::new(kind, size, &key);
        let mut seen = vec![false; size as usize];
        for i in 0..size {
            let j = perm.permute(i) as usize;
            prop_assert!(!seen[j]);
            seen[j] = true;
        }
    }

    #[test]
    fn test_blocked_inverse_undoes_permute(
        kind in permutation_kind(),
        size in 1u64..50_000,
        block in 1u64..5_000,
        key in any::<[u8; 32]>(),
        probes in proptest::collection::vec(any::<u64>(), 1..32)
    ) {
        let perm = BlockedPermutation::new(kind, size, block, &key);
        for probe in probes {
            let i = probe % size;
            let j = perm.permute(i);
            prop_assert!(j < size);
            // Stays inside its sub-block.
            prop_assert_eq!(j / block, i / block);
            prop_assert_eq!(perm.inverse(j), i);
        }
    }

    #[test]
    fn test_encoder_corrects_any_single_flip(
        kind in hamming_kind(),
        data in any::<u64>(),
        flip in any::<u32>()
    ) {
        let encoder = Encoder::new(kind);
        let k = encoder.data_bits();
        let n = encoder.codeword_bits();
        let data = data & ((1u64 << k) - 1);

        let word = encoder.encode(data);
        prop_assert!(n == 64 || word >> n == 0);

        let clean = encoder.decode(word);
        prop_assert_eq!(clean.data, data);
        prop_assert_eq!(clean.status, BlockStatus::Clean);

        let damaged = encoder.decode(word ^ (1 << (flip % n)));
        prop_assert_eq!(damaged.data, data);
        prop_assert_eq!(damaged.status, BlockStatus::Corrected);
    }

    #[test]
    fn test_capacity_never_exceeds_raw(
        kind in hamming_kind(),
        raw in 0u64..10_000_000
    ) {
        let encoder = Encoder::new(kind);
        let usable = encoder.usable_capacity(raw);
        prop_assert!(usable <= raw);
        prop_assert!(encoder.usable_capacity(raw + 1) >= usable);
        prop_assert!(encoder.whole_blocks(raw) * encoder.data_bits() as u64 <= usable);
    }
}
