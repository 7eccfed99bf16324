//! Bit-level reader over a borrowed byte range
//!
//! Bits are read most-significant-bit first; within a byte, bit 7 is
//! consumed before bit 0. The reader keeps a 32-bit left-justified shift
//! register and refills it one byte at a time, substituting zero once the
//! buffer is exhausted. A well-formed stream never depends on that padding;
//! the zero-fill only keeps the refill path free of bounds faults.

use super::tables::DecoderTables;
use super::HuffmanModel;
use crate::common::{CrndError, Result};

/// Width of the internal shift register
const BIT_BUF_SIZE: i32 = 32;

/// MSB-first bit extractor and prefix-code decoder
#[derive(Debug)]
pub struct BitReader<'a> {
    buf: &'a [u8],
    next: usize,
    bit_buf: u32,
    bit_count: i32,
}

impl<'a> BitReader<'a> {
    /// Start decoding over `buf`
    pub fn new(buf: &'a [u8]) -> Result<Self> {
        if buf.is_empty() {
            return Err(CrndError::EntropyError("empty bitstream"));
        }
        Ok(BitReader {
            buf,
            next: 0,
            bit_buf: 0,
            bit_count: 0,
        })
    }

    fn refill_byte(&mut self) -> u32 {
        let c = if self.next < self.buf.len() {
            let c = self.buf[self.next];
            self.next += 1;
            c
        } else {
            0
        };
        c as u32
    }

    /// Extract `num_bits` (1..=16) from the register
    fn get_bits(&mut self, num_bits: u32) -> u32 {
        debug_assert!(num_bits >= 1 && num_bits <= 16);

        while self.bit_count < num_bits as i32 {
            let c = self.refill_byte();
            self.bit_count += 8;
            debug_assert!(self.bit_count <= BIT_BUF_SIZE);
            self.bit_buf |= c << (BIT_BUF_SIZE - self.bit_count);
        }

        let result = self.bit_buf >> (BIT_BUF_SIZE as u32 - num_bits);
        self.bit_buf <<= num_bits;
        self.bit_count -= num_bits as i32;
        result
    }

    /// Read `num_bits` (0..=32), MSB first
    ///
    /// Reads wider than 16 bits are split so the register never has to hold
    /// more than 16 pending result bits.
    pub fn decode_bits(&mut self, num_bits: u32) -> u32 {
        if num_bits == 0 {
            return 0;
        }
        if num_bits > 16 {
            let a = self.get_bits(num_bits - 16);
            let b = self.get_bits(16);
            (a << 16) | b
        } else {
            self.get_bits(num_bits)
        }
    }

    /// Decode one symbol against a model's tables
    pub fn decode(&mut self, model: &HuffmanModel) -> Result<u32> {
        let tables = model
            .tables()
            .ok_or(CrndError::EntropyError("decode against empty model"))?;
        self.decode_with_tables(tables)
    }

    /// Decode one symbol against prepared decode tables
    pub fn decode_with_tables(&mut self, tables: &DecoderTables) -> Result<u32> {
        // Keep at least 24 valid bits in the register; the longest code plus
        // the lookahead comparison never needs more.
        if self.bit_count < 24 {
            if self.bit_count < 16 {
                let c0 = self.refill_byte();
                let c1 = self.refill_byte();
                self.bit_count += 16;
                let c = (c0 << 8) | c1;
                self.bit_buf |= c << (BIT_BUF_SIZE - self.bit_count);
            } else {
                let c = self.refill_byte();
                self.bit_count += 8;
                self.bit_buf |= c << (BIT_BUF_SIZE - self.bit_count);
            }
        }

        // The +1 keeps the comparison against the left-justified max_codes
        // sentinels a single less-than-or-equal.
        let k = (self.bit_buf >> 16) + 1;
        let (sym, len);

        if k <= tables.table_max_code {
            let t = tables.lookup[(self.bit_buf >> (32 - tables.table_bits)) as usize];
            if t == u32::MAX {
                return Err(CrndError::EntropyError("invalid prefix code"));
            }
            sym = t & 0xFFFF;
            len = t >> 16;
        } else {
            let mut code_len = tables.decode_start_code_size as usize;
            loop {
                if k <= tables.max_codes[code_len - 1] {
                    break;
                }
                code_len += 1;
            }

            let val_ptr =
                tables.val_ptrs[code_len - 1] + (self.bit_buf >> (32 - code_len)) as i32;
            if val_ptr < 0 || val_ptr as usize >= tables.sorted_symbol_order.len() {
                return Err(CrndError::EntropyError("symbol index out of range"));
            }
            sym = tables.sorted_symbol_order[val_ptr as usize] as u32;
            len = code_len as u32;
        }

        self.bit_buf <<= len;
        self.bit_count -= len as i32;

        Ok(sym)
    }

    /// Number of bytes pulled from the buffer so far
    pub fn stop_decoding(&self) -> usize {
        self.next
    }
}
