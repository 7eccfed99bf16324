//! Test-side CRN file synthesis
//!
//! A minimal encoder producing well-formed CRN files for the end-to-end
//! tests: an MSB-first bit writer, canonical code assignment matching the
//! decoder's convention, the meta-coded model header, the four palette
//! stream encoders and the per-level block walk. Every block uses the
//! "new endpoint" reference code, which keeps the walk trivial while still
//! exercising the full container, entropy and palette layers.

// Each integration test pulls in the subset it needs.
#![allow(dead_code)]

use std::collections::BTreeSet;

use crnd::crc16::crc16;
use crnd::Format;

/// MSB-first bit accumulator mirroring the decoder's read order
pub struct BitWriter {
    bytes: Vec<u8>,
    acc: u64,
    count: u32,
}

impl BitWriter {
    pub fn new() -> Self {
        BitWriter {
            bytes: Vec::new(),
            acc: 0,
            count: 0,
        }
    }

    pub fn put_bits(&mut self, value: u32, num_bits: u32) {
        assert!(num_bits <= 32);
        if num_bits == 0 {
            return;
        }
        assert!(num_bits == 32 || value < (1u32 << num_bits), "value does not fit");
        self.acc = (self.acc << num_bits) | value as u64;
        self.count += num_bits;
        while self.count >= 8 {
            self.count -= 8;
            self.bytes.push((self.acc >> self.count) as u8);
        }
    }

    pub fn finish(mut self) -> Vec<u8> {
        if self.count > 0 {
            let pad = 8 - self.count;
            self.acc <<= pad;
            self.bytes.push(self.acc as u8);
        }
        if self.bytes.is_empty() {
            self.bytes.push(0);
        }
        self.bytes
    }
}

/// Canonical codes for a code-length vector: increasing length, then
/// increasing symbol index within a length
pub fn canonical_codes(sizes: &[u8]) -> Vec<(u32, u8)> {
    let mut codes = vec![(0u32, 0u8); sizes.len()];
    let mut next_code = 0u32;
    for len in 1..=16u8 {
        for (sym, &l) in sizes.iter().enumerate() {
            if l == len {
                codes[sym] = (next_code, len);
                next_code += 1;
            }
        }
        next_code <<= 1;
    }
    codes
}

/// Symbol emitter for one model
pub struct HuffEncoder {
    codes: Vec<(u32, u8)>,
}

impl HuffEncoder {
    pub fn new(sizes: &[u8]) -> Self {
        HuffEncoder {
            codes: canonical_codes(sizes),
        }
    }

    pub fn emit(&self, w: &mut BitWriter, sym: u32) {
        let (code, len) = self.codes[sym as usize];
        assert!(len > 0, "symbol {sym} has no code");
        w.put_bits(code, len as u32);
    }
}

/// Code lengths covering exactly the used symbols
///
/// All used symbols share one length wide enough for the set, and the
/// declared alphabet stops at the largest used symbol.
pub fn lengths_for(used: &BTreeSet<u32>) -> Vec<u8> {
    assert!(!used.is_empty());
    let max_sym = *used.iter().next_back().unwrap();
    let k = used.len() as u32;
    let len = if k <= 1 { 1 } else { 32 - (k - 1).leading_zeros() };
    let len = len as u8;
    let mut sizes = vec![0u8; max_sym as usize + 1];
    for &s in used {
        sizes[s as usize] = len;
    }
    sizes
}

/// Transmission order of the code-length meta-alphabet
const MOST_PROBABLE_CODELENGTH_CODES: [u8; 21] = [
    17, 18, 19, 20, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15, 16,
];

/// Write a model header: alphabet size, meta model, then one literal
/// code-length symbol per alphabet entry
pub fn write_model(w: &mut BitWriter, sizes: &[u8]) {
    w.put_bits(sizes.len() as u32, 14);

    // A fixed meta model: every literal length code present at length 5.
    let mut meta_sizes = [0u8; 21];
    for s in 0..=16 {
        meta_sizes[s] = 5;
    }
    w.put_bits(21, 5);
    for i in 0..21 {
        let sym = MOST_PROBABLE_CODELENGTH_CODES[i] as usize;
        w.put_bits(meta_sizes[sym] as u32, 3);
    }

    let meta = HuffEncoder::new(&meta_sizes);
    for &s in sizes {
        meta.emit(w, s as u32);
    }
}

/// Write a complete single-model palette stream
fn single_model_stream(symbols: &[u32]) -> Vec<u8> {
    let used: BTreeSet<u32> = symbols.iter().copied().collect();
    let sizes = lengths_for(&used);
    let enc = HuffEncoder::new(&sizes);
    let mut w = BitWriter::new();
    write_model(&mut w, &sizes);
    for &s in symbols {
        enc.emit(&mut w, s);
    }
    w.finish()
}

/// Encode the DXT color endpoint palette from (low565, high565) pairs
pub fn encode_dxt_color_endpoints(entries: &[(u16, u16)]) -> Vec<u8> {
    let mut syms5 = Vec::new();
    let mut syms6 = Vec::new();
    let mut order = Vec::new(); // (is_6bit, value) in stream order

    let (mut a, mut b, mut c) = (0u32, 0u32, 0u32);
    let (mut d, mut e, mut f) = (0u32, 0u32, 0u32);
    for &(low, high) in entries {
        let fields = [
            (low >> 11) as u32 & 31,
            (low >> 5) as u32 & 63,
            low as u32 & 31,
            (high >> 11) as u32 & 31,
            (high >> 5) as u32 & 63,
            high as u32 & 31,
        ];
        let deltas = [
            (fields[0].wrapping_sub(a)) & 31,
            (fields[1].wrapping_sub(b)) & 63,
            (fields[2].wrapping_sub(c)) & 31,
            (fields[3].wrapping_sub(d)) & 31,
            (fields[4].wrapping_sub(e)) & 63,
            (fields[5].wrapping_sub(f)) & 31,
        ];
        a = fields[0];
        b = fields[1];
        c = fields[2];
        d = fields[3];
        e = fields[4];
        f = fields[5];

        for (i, &delta) in deltas.iter().enumerate() {
            let is_6bit = i == 1 || i == 4;
            if is_6bit {
                syms6.push(delta);
            } else {
                syms5.push(delta);
            }
            order.push((is_6bit, delta));
        }
    }

    let sizes5 = lengths_for(&syms5.iter().copied().collect());
    let sizes6 = lengths_for(&syms6.iter().copied().collect());
    let enc5 = HuffEncoder::new(&sizes5);
    let enc6 = HuffEncoder::new(&sizes6);

    let mut w = BitWriter::new();
    write_model(&mut w, &sizes5);
    write_model(&mut w, &sizes6);
    for (is_6bit, delta) in order {
        if is_6bit {
            enc6.emit(&mut w, delta);
        } else {
            enc5.emit(&mut w, delta);
        }
    }
    w.finish()
}

/// Encode the ETC color endpoint palette from ([r5, g5, b5], inten) entries
pub fn encode_etc_color_endpoints(entries: &[([u8; 3], u8)]) -> Vec<u8> {
    let mut symbols = Vec::new();
    let mut old = 0u32;
    for &(rgb, inten) in entries {
        let target = rgb[0] as u32 | (rgb[1] as u32) << 8 | (rgb[2] as u32) << 16 | (inten as u32) << 24;
        let diff = target.wrapping_sub(old);
        for byte in 0..4 {
            symbols.push((diff >> (byte * 8)) & 0xFF);
        }
        old = target;
    }
    single_model_stream(&symbols)
}

/// Linear selector word for a 4x4 grid of 2-bit selectors in raster order
fn linear_selector_word2(selectors: &[u8; 16]) -> u32 {
    let mut word = 0u32;
    for (i, &s) in selectors.iter().enumerate() {
        assert!(s < 4);
        word |= (s as u32) << (i * 2);
    }
    word
}

/// Encode the color selector palette from linear 2-bit selector grids
pub fn encode_color_selectors(entries: &[[u8; 16]]) -> Vec<u8> {
    let mut symbols = Vec::new();
    let mut old = 0u32;
    for entry in entries {
        let target = linear_selector_word2(entry);
        let diff = target ^ old;
        for j in (0..32).step_by(4) {
            symbols.push((diff >> j) & 0xF);
        }
        old = target;
    }
    single_model_stream(&symbols)
}

/// Encode the alpha endpoint palette from (low, high) pairs
pub fn encode_alpha_endpoints(entries: &[(u8, u8)]) -> Vec<u8> {
    let mut symbols = Vec::new();
    let (mut a, mut b) = (0u32, 0u32);
    for &(low, high) in entries {
        symbols.push((low as u32).wrapping_sub(a) & 255);
        symbols.push((high as u32).wrapping_sub(b) & 255);
        a = low as u32;
        b = high as u32;
    }
    single_model_stream(&symbols)
}

/// Encode the DXT5 alpha selector palette from linear 3-bit selector grids
pub fn encode_alpha_selectors(entries: &[[u8; 16]]) -> Vec<u8> {
    let mut symbols = Vec::new();
    let (mut old0, mut old1) = (0u32, 0u32);
    for entry in entries {
        let mut s0 = 0u32;
        let mut s1 = 0u32;
        for i in 0..8 {
            assert!(entry[i] < 8 && entry[i + 8] < 8);
            s0 |= (entry[i] as u32) << (i * 3);
            s1 |= (entry[i + 8] as u32) << (i * 3);
        }
        for j in (0..24).step_by(6) {
            symbols.push(((s0 ^ old0) >> j) & 0x3F);
        }
        for j in (0..24).step_by(6) {
            symbols.push(((s1 ^ old1) >> j) & 0x3F);
        }
        old0 = s0;
        old1 = s1;
    }
    single_model_stream(&symbols)
}

/// Encode the ETC2A/ETC2AS alpha selector palette from the 3-bit values the
/// decoder should store per texel (raster order)
pub fn encode_etc_alpha_selectors(entries: &[[u8; 16]]) -> Vec<u8> {
    let mut symbols = Vec::new();
    let mut old = [0u32; 8];
    for entry in entries {
        for pair in 0..8 {
            // Stored values at or below 3 are transmitted inverted.
            let invert = |s: u8| -> u32 { (if s <= 3 { 3 - s } else { s }) as u32 };
            let g0 = invert(entry[pair * 2]);
            let g1 = invert(entry[pair * 2 + 1]);
            let target = g0 | (g1 << 3);
            symbols.push(target ^ old[pair]);
            old[pair] = target;
        }
    }
    single_model_stream(&symbols)
}

/// Constant per-block palette choices used by the synthesized level streams
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockPattern {
    pub color_endpoint: u32,
    pub color_selector: u32,
    pub alpha0_endpoint: u32,
    pub alpha0_selector: u32,
    pub alpha1_endpoint: u32,
    pub alpha1_selector: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Sym {
    Reference,
    Endpoint0,
    Endpoint1,
    Selector0,
    Selector1,
}

/// Builder for complete synthetic CRN files
pub struct CrnBuilder {
    pub width: u16,
    pub height: u16,
    pub levels: u8,
    pub faces: u8,
    pub format: Format,
    pub userdata0: u32,
    pub userdata1: u32,
    pub color_endpoints: Vec<(u16, u16)>,
    pub etc_color_endpoints: Vec<([u8; 3], u8)>,
    pub color_selectors: Vec<[u8; 16]>,
    pub alpha_endpoints: Vec<(u8, u8)>,
    pub alpha_selectors: Vec<[u8; 16]>,
    pub pattern: BlockPattern,
}

impl CrnBuilder {
    pub fn new(width: u16, height: u16, format: Format) -> Self {
        CrnBuilder {
            width,
            height,
            levels: 1,
            faces: 1,
            format,
            userdata0: 0,
            userdata1: 0,
            color_endpoints: Vec::new(),
            etc_color_endpoints: Vec::new(),
            color_selectors: Vec::new(),
            alpha_endpoints: Vec::new(),
            alpha_selectors: Vec::new(),
            pattern: BlockPattern::default(),
        }
    }

    fn uses_color(&self) -> bool {
        !matches!(self.format, Format::Dxt5A | Format::DxnXY | Format::DxnYX)
    }

    fn uses_alpha(&self) -> bool {
        matches!(
            self.format.fundamental(),
            Format::Dxt5 | Format::Dxt5A | Format::DxnXY | Format::DxnYX | Format::Etc2A | Format::Etc2AS
        )
    }

    fn has_subblocks(&self) -> bool {
        self.format.has_subblocks()
    }

    /// The symbol sequence of one level's block stream
    fn level_symbols(&self, level: u32) -> Vec<(Sym, u32)> {
        let width = (self.width as u32 >> level).max(1);
        let height = (self.height as u32 >> level).max(1);
        let padded_x = (((width + 3) >> 2) + 1) & !1;
        let padded_y = (((height + 3) >> 2) + 1) & !1;

        let num_color = if self.format.has_etc_color_blocks() {
            self.etc_color_endpoints.len() as u32
        } else {
            self.color_endpoints.len() as u32
        };
        let num_alpha = self.alpha_endpoints.len() as u32;

        let mut out = Vec::new();
        for _face in 0..self.faces {
            let mut color_index = 0u32;
            let mut alpha0_index = 0u32;
            let mut alpha1_index = 0u32;

            for y in 0..padded_y {
                for x in 0..padded_x {
                    let emits_reference = if self.has_subblocks() {
                        y & 1 == 0
                    } else {
                        y & 1 == 0 && x & 1 == 0
                    };
                    if emits_reference {
                        // Reference code 0 for every block: fresh deltas.
                        out.push((Sym::Reference, 0));
                    }

                    let push_color = |out: &mut Vec<(Sym, u32)>, color_index: &mut u32| {
                        let delta =
                            (self.pattern.color_endpoint + num_color - *color_index) % num_color;
                        out.push((Sym::Endpoint0, delta));
                        *color_index = self.pattern.color_endpoint;
                    };
                    let push_alpha = |out: &mut Vec<(Sym, u32)>, index: &mut u32, target: u32| {
                        let delta = (target + num_alpha - *index) % num_alpha;
                        out.push((Sym::Endpoint1, delta));
                        *index = target;
                    };

                    match self.format.fundamental() {
                        Format::Dxt1 | Format::Etc1S => {
                            push_color(&mut out, &mut color_index);
                            out.push((Sym::Selector0, self.pattern.color_selector));
                        }
                        Format::Dxt5 | Format::Etc2AS => {
                            push_color(&mut out, &mut color_index);
                            push_alpha(&mut out, &mut alpha0_index, self.pattern.alpha0_endpoint);
                            out.push((Sym::Selector0, self.pattern.color_selector));
                            out.push((Sym::Selector1, self.pattern.alpha0_selector));
                        }
                        Format::Dxt5A => {
                            push_alpha(&mut out, &mut alpha0_index, self.pattern.alpha0_endpoint);
                            out.push((Sym::Selector1, self.pattern.alpha0_selector));
                        }
                        Format::DxnXY | Format::DxnYX => {
                            push_alpha(&mut out, &mut alpha0_index, self.pattern.alpha0_endpoint);
                            push_alpha(&mut out, &mut alpha1_index, self.pattern.alpha1_endpoint);
                            out.push((Sym::Selector1, self.pattern.alpha0_selector));
                            out.push((Sym::Selector1, self.pattern.alpha1_selector));
                        }
                        Format::Etc1 | Format::Etc2 => {
                            push_color(&mut out, &mut color_index);
                            out.push((Sym::Selector0, self.pattern.color_selector));
                        }
                        Format::Etc2A => {
                            push_color(&mut out, &mut color_index);
                            push_alpha(&mut out, &mut alpha0_index, self.pattern.alpha0_endpoint);
                            out.push((Sym::Selector0, self.pattern.color_selector));
                            out.push((Sym::Selector1, self.pattern.alpha0_selector));
                        }
                        other => panic!("builder does not support {other:?}"),
                    }
                }
            }
        }
        out
    }

    /// Assemble the complete file
    pub fn build(&self) -> Vec<u8> {
        let levels = self.levels as u32;

        // Block-stream symbols for every level, then the shared models.
        let per_level: Vec<Vec<(Sym, u32)>> =
            (0..levels).map(|l| self.level_symbols(l)).collect();

        let mut used: std::collections::BTreeMap<Sym, BTreeSet<u32>> = Default::default();
        for syms in &per_level {
            for &(kind, value) in syms {
                used.entry(kind).or_default().insert(value);
            }
        }

        let model_sizes: std::collections::BTreeMap<Sym, Vec<u8>> = used
            .iter()
            .map(|(&kind, set)| (kind, lengths_for(set)))
            .collect();

        let mut tables = BitWriter::new();
        write_model(&mut tables, &model_sizes[&Sym::Reference]);
        if self.uses_color() {
            write_model(&mut tables, &model_sizes[&Sym::Endpoint0]);
            write_model(&mut tables, &model_sizes[&Sym::Selector0]);
        }
        if self.uses_alpha() {
            write_model(&mut tables, &model_sizes[&Sym::Endpoint1]);
            write_model(&mut tables, &model_sizes[&Sym::Selector1]);
        }
        let tables_bytes = tables.finish();

        let encoders: std::collections::BTreeMap<Sym, HuffEncoder> = model_sizes
            .iter()
            .map(|(&kind, sizes)| (kind, HuffEncoder::new(sizes)))
            .collect();

        let level_streams: Vec<Vec<u8>> = per_level
            .iter()
            .map(|syms| {
                let mut w = BitWriter::new();
                for &(kind, value) in syms {
                    encoders[&kind].emit(&mut w, value);
                }
                w.finish()
            })
            .collect();

        // Palette streams.
        let mut color_endpoint_bytes = Vec::new();
        let mut color_selector_bytes = Vec::new();
        if self.uses_color() {
            color_endpoint_bytes = if self.format.has_etc_color_blocks() {
                encode_etc_color_endpoints(&self.etc_color_endpoints)
            } else {
                encode_dxt_color_endpoints(&self.color_endpoints)
            };
            color_selector_bytes = encode_color_selectors(&self.color_selectors);
        }

        let mut alpha_endpoint_bytes = Vec::new();
        let mut alpha_selector_bytes = Vec::new();
        if self.uses_alpha() {
            alpha_endpoint_bytes = encode_alpha_endpoints(&self.alpha_endpoints);
            alpha_selector_bytes = match self.format {
                Format::Etc2A | Format::Etc2AS => {
                    encode_etc_alpha_selectors(&self.alpha_selectors)
                }
                _ => encode_alpha_selectors(&self.alpha_selectors),
            };
        }

        // Layout: header | tables | palettes | level streams.
        let header_size = 78 + 4 * levels as usize;
        let mut ofs = header_size;
        let tables_ofs = ofs;
        ofs += tables_bytes.len();
        let ce_ofs = ofs;
        ofs += color_endpoint_bytes.len();
        let cs_ofs = ofs;
        ofs += color_selector_bytes.len();
        let ae_ofs = ofs;
        ofs += alpha_endpoint_bytes.len();
        let as_ofs = ofs;
        ofs += alpha_selector_bytes.len();

        let mut level_ofs = Vec::new();
        for stream in &level_streams {
            level_ofs.push(ofs as u32);
            ofs += stream.len();
        }
        let data_size = ofs as u32;

        let mut file = vec![0u8; header_size];
        file[0..2].copy_from_slice(&0x4352u16.to_be_bytes());
        file[2..4].copy_from_slice(&(header_size as u16).to_be_bytes());
        file[6..10].copy_from_slice(&data_size.to_be_bytes());
        file[12..14].copy_from_slice(&self.width.to_be_bytes());
        file[14..16].copy_from_slice(&self.height.to_be_bytes());
        file[16] = self.levels;
        file[17] = self.faces;
        file[18] = self.format as u8;
        // flags stay zero; the reserved word stays zero.
        file[25..29].copy_from_slice(&self.userdata0.to_be_bytes());
        file[29..33].copy_from_slice(&self.userdata1.to_be_bytes());

        let write_desc = |file: &mut Vec<u8>, at: usize, ofs: usize, size: usize, num: usize| {
            file[at..at + 4].copy_from_slice(&(ofs as u32).to_be_bytes());
            file[at + 4] = (size >> 16) as u8;
            file[at + 5] = (size >> 8) as u8;
            file[at + 6] = size as u8;
            file[at + 7..at + 9].copy_from_slice(&(num as u16).to_be_bytes());
        };

        let num_color = if self.format.has_etc_color_blocks() {
            self.etc_color_endpoints.len()
        } else {
            self.color_endpoints.len()
        };
        if self.uses_color() {
            write_desc(&mut file, 33, ce_ofs, color_endpoint_bytes.len(), num_color);
            write_desc(
                &mut file,
                42,
                cs_ofs,
                color_selector_bytes.len(),
                self.color_selectors.len(),
            );
        }
        if self.uses_alpha() {
            write_desc(
                &mut file,
                51,
                ae_ofs,
                alpha_endpoint_bytes.len(),
                self.alpha_endpoints.len(),
            );
            write_desc(
                &mut file,
                60,
                as_ofs,
                alpha_selector_bytes.len(),
                self.alpha_selectors.len(),
            );
        }
        write_desc(&mut file, 69, tables_ofs, tables_bytes.len(), 0);

        for (i, &lofs) in level_ofs.iter().enumerate() {
            file[78 + 4 * i..82 + 4 * i].copy_from_slice(&lofs.to_be_bytes());
        }

        file.extend_from_slice(&tables_bytes);
        file.extend_from_slice(&color_endpoint_bytes);
        file.extend_from_slice(&color_selector_bytes);
        file.extend_from_slice(&alpha_endpoint_bytes);
        file.extend_from_slice(&alpha_selector_bytes);
        for stream in &level_streams {
            file.extend_from_slice(stream);
        }
        assert_eq!(file.len(), data_size as usize);

        // Checksums last: data region, then the header region covering it.
        let data_crc = crc16(&file[header_size..]);
        file[10..12].copy_from_slice(&data_crc.to_be_bytes());
        let header_crc = crc16(&file[6..header_size]);
        file[4..6].copy_from_slice(&header_crc.to_be_bytes());

        file
    }
}
