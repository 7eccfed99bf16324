//! Canonical-Huffman decode table construction
//!
//! Codes are assigned in increasing code length, then increasing symbol
//! index within each length. Decoding uses a direct lookup table for short
//! codes and a per-length linear search for the tail. The `max_codes`
//! entries are left-justified to 16 bits and biased by one so the hot path
//! needs a single `k <= max_codes[len]` comparison with
//! `k = (top 16 register bits) + 1`.

use super::{MAX_EXPECTED_CODE_SIZE, MAX_TABLE_BITS};
use crate::common::{CrndError, Result};

/// Decode tables for one canonical prefix code
#[derive(Debug, Clone)]
pub struct DecoderTables {
    /// Alphabet size the code sizes were given for
    pub num_syms: u32,
    /// Number of symbols with a non-zero code length
    pub total_used_syms: u32,
    /// Width of the direct lookup table, 0 when disabled
    pub table_bits: u32,
    /// Largest `k` value the lookup table resolves
    pub table_max_code: u32,
    /// Code length the tail search starts from
    pub decode_start_code_size: u32,
    /// Shortest used code length
    pub min_code_size: u8,
    /// Longest used code length
    pub max_code_size: u8,
    /// Per-length left-justified sentinel, plus a terminator entry
    pub max_codes: [u32; MAX_EXPECTED_CODE_SIZE + 1],
    /// Per-length base index into `sorted_symbol_order`, bias-corrected
    pub val_ptrs: [i32; MAX_EXPECTED_CODE_SIZE + 1],
    /// Direct lookup entries: `symbol | (length << 16)`, `u32::MAX` = unused
    pub lookup: Vec<u32>,
    /// Used symbols grouped by length, ascending symbol order inside a group
    pub sorted_symbol_order: Vec<u16>,
}

impl DecoderTables {
    /// Build decode tables from a code-length vector
    pub fn build(code_sizes: &[u8]) -> Result<DecoderTables> {
        let num_syms = code_sizes.len() as u32;
        if num_syms == 0 {
            return Err(CrndError::EntropyError("empty alphabet"));
        }

        let mut num_codes = [0u32; MAX_EXPECTED_CODE_SIZE + 1];
        for &c in code_sizes {
            if c as usize > MAX_EXPECTED_CODE_SIZE {
                return Err(CrndError::EntropyError("code length exceeds 16"));
            }
            if c != 0 {
                num_codes[c as usize] += 1;
            }
        }

        let mut min_codes = [0u32; MAX_EXPECTED_CODE_SIZE];
        let mut sorted_positions = [0u32; MAX_EXPECTED_CODE_SIZE + 1];
        let mut max_codes = [0u32; MAX_EXPECTED_CODE_SIZE + 1];
        let mut val_ptrs = [0i32; MAX_EXPECTED_CODE_SIZE + 1];

        let mut cur_code = 0u32;
        let mut total_used_syms = 0u32;
        let mut min_code_size = u32::MAX;
        let mut max_code_size = 0u32;

        for i in 1..=MAX_EXPECTED_CODE_SIZE {
            let n = num_codes[i];
            if n == 0 {
                max_codes[i - 1] = 0;
            } else {
                min_code_size = min_code_size.min(i as u32);
                max_code_size = max_code_size.max(i as u32);

                min_codes[i - 1] = cur_code;

                let last = cur_code + n - 1;
                max_codes[i - 1] = 1 + ((last << (16 - i)) | ((1 << (16 - i)) - 1));

                val_ptrs[i - 1] = total_used_syms as i32;
                sorted_positions[i] = total_used_syms;

                cur_code += n;
                total_used_syms += n;
            }
            if cur_code > (1u32 << i) {
                return Err(CrndError::EntropyError("oversubscribed code lengths"));
            }
            cur_code <<= 1;
        }

        if total_used_syms == 0 {
            return Err(CrndError::EntropyError("no used symbols"));
        }

        let mut sorted_symbol_order = vec![0u16; total_used_syms as usize];
        for (i, &c) in code_sizes.iter().enumerate() {
            if c != 0 {
                let sorted_pos = sorted_positions[c as usize];
                sorted_positions[c as usize] += 1;
                sorted_symbol_order[sorted_pos as usize] = i as u16;
            }
        }

        // A lookup table only pays off for codes shorter than itself.
        let mut table_bits = max_code_size.min(MAX_TABLE_BITS);
        if table_bits <= min_code_size {
            table_bits = 0;
        }

        let mut lookup = Vec::new();
        if table_bits > 0 {
            lookup = vec![u32::MAX; 1usize << table_bits];

            for codesize in 1..=table_bits as usize {
                if num_codes[codesize] == 0 {
                    continue;
                }

                let fillsize = table_bits as usize - codesize;
                let fillnum = 1usize << fillsize;

                let min_code = min_codes[codesize - 1];
                let max_code = (max_codes[codesize - 1] - 1) >> (16 - codesize);
                let val_ptr = val_ptrs[codesize - 1];

                for code in min_code..=max_code {
                    let sym_index =
                        sorted_symbol_order[(val_ptr + (code - min_code) as i32) as usize] as u32;
                    debug_assert_eq!(code_sizes[sym_index as usize] as usize, codesize);

                    for j in 0..fillnum {
                        let t = j + ((code as usize) << fillsize);
                        debug_assert_eq!(lookup[t], u32::MAX);
                        lookup[t] = sym_index | ((codesize as u32) << 16);
                    }
                }
            }
        }

        for i in 0..MAX_EXPECTED_CODE_SIZE {
            val_ptrs[i] -= min_codes[i] as i32;
        }

        let mut table_max_code = 0;
        let mut decode_start_code_size = min_code_size;

        if table_bits > 0 {
            let mut i = table_bits as usize;
            while i >= 1 {
                if num_codes[i] != 0 {
                    table_max_code = max_codes[i - 1];
                    break;
                }
                i -= 1;
            }
            if i >= 1 {
                decode_start_code_size = table_bits + 1;
                for j in (table_bits + 1) as usize..=max_code_size as usize {
                    if num_codes[j] != 0 {
                        decode_start_code_size = j as u32;
                        break;
                    }
                }
            }
        }

        // Terminator entries so the tail search always stops.
        max_codes[MAX_EXPECTED_CODE_SIZE] = u32::MAX;
        val_ptrs[MAX_EXPECTED_CODE_SIZE] = 0xF_FFFF;

        Ok(DecoderTables {
            num_syms,
            total_used_syms,
            table_bits,
            table_max_code,
            decode_start_code_size,
            min_code_size: min_code_size as u8,
            max_code_size: max_code_size as u8,
            max_codes,
            val_ptrs,
            lookup,
            sorted_symbol_order,
        })
    }

}
