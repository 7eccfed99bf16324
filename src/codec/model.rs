//! Huffman data models and code-length-vector reception
//!
//! A model is a code-length vector plus the decode tables built from it. The
//! code-length vector of each model is itself prefix coded in the bitstream:
//! a 21-symbol meta-alphabet carries literal lengths 0..=16 and four
//! run/repeat symbols, transmitted in a fixed most-probable-first order.

use super::reader::BitReader;
use super::tables::DecoderTables;
use super::{
    total_bits, LARGE_REPEAT_CODE, LARGE_REPEAT_EXTRA_BITS, LARGE_ZERO_RUN_CODE,
    LARGE_ZERO_RUN_EXTRA_BITS, MAX_CODELENGTH_CODES, MAX_SUPPORTED_SYMS,
    MIN_LARGE_REPEAT_SIZE, MIN_LARGE_ZERO_RUN_SIZE, MIN_SMALL_REPEAT_SIZE,
    MIN_SMALL_ZERO_RUN_SIZE, MOST_PROBABLE_CODELENGTH_CODES, SMALL_REPEAT_CODE,
    SMALL_REPEAT_EXTRA_BITS, SMALL_ZERO_RUN_CODE, SMALL_ZERO_RUN_EXTRA_BITS,
};
use crate::common::{CrndError, Result};

/// A static Huffman model: code lengths plus prepared decode tables
///
/// A default-constructed model is empty; decoding against it fails with an
/// entropy error. Models received from a stream with a zero used-symbol
/// count stay empty.
#[derive(Debug, Clone, Default)]
pub struct HuffmanModel {
    code_sizes: Vec<u8>,
    tables: Option<DecoderTables>,
}

impl HuffmanModel {
    /// Build a model from a code-length vector
    pub fn from_code_sizes(code_sizes: Vec<u8>) -> Result<HuffmanModel> {
        if code_sizes.is_empty() || code_sizes.len() as u32 > MAX_SUPPORTED_SYMS {
            return Err(CrndError::EntropyError("alphabet size out of range"));
        }
        let tables = DecoderTables::build(&code_sizes)?;
        Ok(HuffmanModel {
            code_sizes,
            tables: Some(tables),
        })
    }

    /// Alphabet size, zero for an empty model
    pub fn total_syms(&self) -> u32 {
        self.code_sizes.len() as u32
    }

    /// True when no code-length vector has been received
    pub fn is_empty(&self) -> bool {
        self.tables.is_none()
    }

    /// Code length assigned to `sym`
    pub fn code_size(&self, sym: u32) -> u8 {
        self.code_sizes[sym as usize]
    }

    pub(super) fn tables(&self) -> Option<&DecoderTables> {
        self.tables.as_ref()
    }
}

impl BitReader<'_> {
    /// Receive a meta-coded code-length vector and build its model
    pub fn read_huffman_model(&mut self) -> Result<HuffmanModel> {
        let total_used_syms = self.decode_bits(total_bits(MAX_SUPPORTED_SYMS));
        if total_used_syms == 0 {
            return Ok(HuffmanModel::default());
        }
        if total_used_syms > MAX_SUPPORTED_SYMS {
            return Err(CrndError::EntropyError("used symbol count out of range"));
        }

        let num_codelength_codes = self.decode_bits(5) as usize;
        if num_codelength_codes < 1 || num_codelength_codes > MAX_CODELENGTH_CODES {
            return Err(CrndError::EntropyError("bad code-length code count"));
        }

        let mut meta_sizes = vec![0u8; MAX_CODELENGTH_CODES];
        for i in 0..num_codelength_codes {
            meta_sizes[MOST_PROBABLE_CODELENGTH_CODES[i] as usize] = self.decode_bits(3) as u8;
        }
        let meta = HuffmanModel::from_code_sizes(meta_sizes)?;

        let mut code_sizes = vec![0u8; total_used_syms as usize];
        let mut ofs = 0usize;
        while ofs < total_used_syms as usize {
            let num_remaining = total_used_syms as usize - ofs;
            let code = self.decode(&meta)?;

            if code <= 16 {
                code_sizes[ofs] = code as u8;
                ofs += 1;
            } else if code == SMALL_ZERO_RUN_CODE || code == LARGE_ZERO_RUN_CODE {
                let len = if code == SMALL_ZERO_RUN_CODE {
                    self.decode_bits(SMALL_ZERO_RUN_EXTRA_BITS) + MIN_SMALL_ZERO_RUN_SIZE
                } else {
                    self.decode_bits(LARGE_ZERO_RUN_EXTRA_BITS) + MIN_LARGE_ZERO_RUN_SIZE
                };
                let len = len as usize;
                if len > num_remaining {
                    return Err(CrndError::EntropyError("zero run overshoots alphabet"));
                }
                ofs += len;
            } else if code == SMALL_REPEAT_CODE || code == LARGE_REPEAT_CODE {
                let len = if code == SMALL_REPEAT_CODE {
                    self.decode_bits(SMALL_REPEAT_EXTRA_BITS) + MIN_SMALL_REPEAT_SIZE
                } else {
                    self.decode_bits(LARGE_REPEAT_EXTRA_BITS) + MIN_LARGE_REPEAT_SIZE
                };
                let len = len as usize;
                if ofs == 0 || len > num_remaining {
                    return Err(CrndError::EntropyError("repeat run overshoots alphabet"));
                }
                let prev = code_sizes[ofs - 1];
                if prev == 0 {
                    return Err(CrndError::EntropyError("repeat of a zero length"));
                }
                code_sizes[ofs..ofs + len].fill(prev);
                ofs += len;
            } else {
                return Err(CrndError::EntropyError("bad code-length meta symbol"));
            }
        }

        HuffmanModel::from_code_sizes(code_sizes)
    }
}
