//! Prefix-coded entropy decoding
//!
//! CRN palettes and block streams are canonical-Huffman coded. A code-length
//! vector for each alphabet is itself entropy coded with a small run-length
//! meta-code, so decoding a stream means: receive the meta-coded model, build
//! decode tables from it, then pull symbols through the bit reader.

mod model;
mod reader;
mod tables;

pub use model::HuffmanModel;
pub use reader::BitReader;
pub use tables::DecoderTables;

/// Longest code length any model may use
pub const MAX_EXPECTED_CODE_SIZE: usize = 16;

/// Largest alphabet any model may declare
pub const MAX_SUPPORTED_SYMS: u32 = 8192;

/// Upper bound on the direct-lookup table width
pub const MAX_TABLE_BITS: u32 = 11;

/// Number of symbols in the code-length meta-alphabet
pub const MAX_CODELENGTH_CODES: usize = 21;

/// Meta symbol: short run of zero code lengths
pub const SMALL_ZERO_RUN_CODE: u32 = 17;
/// Meta symbol: long run of zero code lengths
pub const LARGE_ZERO_RUN_CODE: u32 = 18;
/// Meta symbol: short repeat of the previous non-zero length
pub const SMALL_REPEAT_CODE: u32 = 19;
/// Meta symbol: long repeat of the previous non-zero length
pub const LARGE_REPEAT_CODE: u32 = 20;

/// Extra bits carried by each run symbol
pub const SMALL_ZERO_RUN_EXTRA_BITS: u32 = 3;
/// Extra bits carried by the long zero-run symbol
pub const LARGE_ZERO_RUN_EXTRA_BITS: u32 = 7;
/// Extra bits carried by the short repeat symbol
pub const SMALL_REPEAT_EXTRA_BITS: u32 = 2;
/// Extra bits carried by the long repeat symbol
pub const LARGE_REPEAT_EXTRA_BITS: u32 = 6;

/// Shortest run the short zero-run symbol can express
pub const MIN_SMALL_ZERO_RUN_SIZE: u32 = 3;
/// Shortest run the long zero-run symbol can express
pub const MIN_LARGE_ZERO_RUN_SIZE: u32 = 11;
/// Shortest run the short repeat symbol can express
pub const MIN_SMALL_REPEAT_SIZE: u32 = 3;
/// Shortest run the long repeat symbol can express
pub const MIN_LARGE_REPEAT_SIZE: u32 = 7;

/// Meta-alphabet transmission order, most probable symbols first
pub const MOST_PROBABLE_CODELENGTH_CODES: [u8; MAX_CODELENGTH_CODES] = [
    SMALL_ZERO_RUN_CODE as u8,
    LARGE_ZERO_RUN_CODE as u8,
    SMALL_REPEAT_CODE as u8,
    LARGE_REPEAT_CODE as u8,
    0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15, 16,
];

/// Number of bits needed to represent `v`
pub(crate) fn total_bits(v: u32) -> u32 {
    32 - v.leading_zeros()
}
