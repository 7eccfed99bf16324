//! Property-based tests for the CRN transcoder
//!
//! These tests use randomized inputs to verify that the decoder is total:
//! arbitrary garbage and corrupted files must produce errors, never panics,
//! and the entropy coding layer must round-trip whatever the test-side
//! encoder can express.

mod common;

use std::collections::BTreeSet;

use common::{canonical_codes, lengths_for, write_model, BitWriter, CrnBuilder, HuffEncoder};
use crnd::codec::BitReader;
use crnd::{crc16, validate_file, Format, TranscodeFormat, Unpacker};
use proptest::prelude::*;

proptest! {
    #[test]
    fn test_validation_never_panics(data in prop::collection::vec(any::<u8>(), 0..2048)) {
        // Random bytes are almost never a valid container; either way the
        // decoder must fail gracefully.
        let _ = validate_file(&data);
        let _ = crnd::texture_info(&data);
        let _ = Unpacker::new(&data);
    }
}

proptest! {
    #[test]
    fn test_corrupted_file_never_panics(
        flip_at in 0usize..512,
        flip_bit in 0u8..8,
    ) {
        let mut builder = CrnBuilder::new(8, 8, Format::Dxt1);
        builder.color_endpoints = vec![(0xF800, 0x07E0)];
        builder.color_selectors = vec![[0; 16], [3; 16]];
        let mut file = builder.build();

        let at = flip_at % file.len();
        file[at] ^= 1 << flip_bit;

        // Construction or unpacking may fail; neither may panic.
        if let Ok(mut unpacker) = Unpacker::new(&file) {
            let _ = unpacker.unpack_level_vec(0, TranscodeFormat::Unchanged, 0);
        }
    }
}

proptest! {
    #[test]
    fn test_truncated_file_never_panics(cut in 1usize..64) {
        let mut builder = CrnBuilder::new(16, 16, Format::Dxt5);
        builder.color_endpoints = vec![(0xFFFF, 0x0000)];
        builder.color_selectors = vec![[1; 16]];
        builder.alpha_endpoints = vec![(10, 245)];
        builder.alpha_selectors = vec![[5; 16]];
        let file = builder.build();

        let keep = file.len().saturating_sub(cut);
        prop_assert!(validate_file(&file[..keep]).is_err());
        if let Ok(mut unpacker) = Unpacker::new(&file[..keep]) {
            let _ = unpacker.unpack_level_vec(0, TranscodeFormat::Unchanged, 0);
        }
    }
}

proptest! {
    #[test]
    fn test_model_reception_roundtrip(
        used in prop::collection::btree_set(0u32..300, 1..40),
    ) {
        // One shared code length per used symbol is always a valid code.
        let sizes = lengths_for(&used);

        let mut w = BitWriter::new();
        write_model(&mut w, &sizes);
        let bytes = w.finish();

        let mut reader = BitReader::new(&bytes).unwrap();
        let model = reader.read_huffman_model().unwrap();
        prop_assert_eq!(model.total_syms() as usize, sizes.len());
        for (sym, &len) in sizes.iter().enumerate() {
            prop_assert_eq!(model.code_size(sym as u32), len);
        }
    }
}

proptest! {
    #[test]
    fn test_symbol_roundtrip(
        used in prop::collection::btree_set(0u32..300, 1..40),
        picks in prop::collection::vec(any::<prop::sample::Index>(), 1..200),
    ) {
        let symbols: Vec<u32> = {
            let pool: Vec<u32> = used.iter().copied().collect();
            picks.iter().map(|ix| pool[ix.index(pool.len())]).collect()
        };

        let sizes = lengths_for(&used);
        let enc = HuffEncoder::new(&sizes);

        let mut w = BitWriter::new();
        write_model(&mut w, &sizes);
        for &s in &symbols {
            enc.emit(&mut w, s);
        }
        let bytes = w.finish();

        let mut reader = BitReader::new(&bytes).unwrap();
        let model = reader.read_huffman_model().unwrap();
        for &expected in &symbols {
            prop_assert_eq!(reader.decode(&model).unwrap(), expected);
        }
    }
}

proptest! {
    #[test]
    fn test_canonical_codes_are_prefix_free(
        used in prop::collection::btree_set(0u32..64, 2..30),
    ) {
        let sizes = lengths_for(&used);
        let codes = canonical_codes(&sizes);

        let assigned: Vec<(u32, u8)> = used
            .iter()
            .map(|&s| codes[s as usize])
            .collect();
        for (i, &(code_a, len_a)) in assigned.iter().enumerate() {
            for &(code_b, len_b) in &assigned[i + 1..] {
                // Same-length codes are distinct; within one shared length
                // class that is the whole prefix-free property.
                prop_assert!(len_a == len_b);
                prop_assert_ne!(code_a, code_b);
            }
        }
    }
}

proptest! {
    #[test]
    fn test_crc16_is_pure(data in prop::collection::vec(any::<u8>(), 0..512)) {
        prop_assert_eq!(crc16(&data), crc16(&data));
    }
}

proptest! {
    #[test]
    fn test_crc16_detects_single_bit_flips(
        data in prop::collection::vec(any::<u8>(), 1..256),
        at in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let mut flipped = data.clone();
        let i = at.index(flipped.len());
        flipped[i] ^= 1 << bit;
        prop_assert_ne!(crc16(&data), crc16(&flipped));
    }
}

proptest! {
    #[test]
    fn test_unpack_deterministic_across_instances(seed in 0u16..64) {
        let low = 0x0800 | seed;
        let mut builder = CrnBuilder::new(8, 8, Format::Dxt1);
        builder.color_endpoints = vec![(low, 0xF800)];
        builder.color_selectors = vec![[(seed & 3) as u8; 16]];
        let file = builder.build();

        let mut a = Unpacker::new(&file).unwrap();
        let mut b = Unpacker::new(&file).unwrap();
        prop_assert_eq!(
            a.unpack_level_vec(0, TranscodeFormat::Unchanged, 0).unwrap(),
            b.unpack_level_vec(0, TranscodeFormat::Unchanged, 0).unwrap()
        );
    }
}

#[test]
fn test_lengths_cover_all_used_symbols() {
    let used: BTreeSet<u32> = [0, 3, 17, 200].into_iter().collect();
    let sizes = lengths_for(&used);
    assert_eq!(sizes.len(), 201);
    assert_eq!(sizes.iter().filter(|&&l| l != 0).count(), 4);
}

#[test]
fn test_maximum_length_codes_roundtrip() {
    // A two-symbol alphabet at the longest legal code length must build and
    // decode.
    let sizes = [16u8, 16];
    let enc = HuffEncoder::new(&sizes);
    let symbols = [1u32, 0, 1, 1, 0, 0, 1];

    let mut w = BitWriter::new();
    write_model(&mut w, &sizes);
    for &s in &symbols {
        enc.emit(&mut w, s);
    }
    let bytes = w.finish();

    let mut reader = BitReader::new(&bytes).unwrap();
    let model = reader.read_huffman_model().unwrap();
    assert_eq!(model.code_size(0), 16);
    assert_eq!(model.code_size(1), 16);
    for &expected in &symbols {
        assert_eq!(reader.decode(&model).unwrap(), expected);
    }
}

#[test]
fn test_mixed_length_codes_roundtrip() {
    // Codes both inside the direct lookup table (short lengths) and past it
    // (length 12 exceeds the 11-bit table and takes the tail search).
    let sizes = [1u8, 2, 3, 12, 12];
    let enc = HuffEncoder::new(&sizes);
    let symbols = [0u32, 4, 3, 0, 1, 2, 3, 0, 4];

    let mut w = BitWriter::new();
    write_model(&mut w, &sizes);
    for &s in &symbols {
        enc.emit(&mut w, s);
    }
    let bytes = w.finish();

    let mut reader = BitReader::new(&bytes).unwrap();
    let model = reader.read_huffman_model().unwrap();
    for &expected in &symbols {
        assert_eq!(reader.decode(&model).unwrap(), expected);
    }
}
