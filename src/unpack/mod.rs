//! CRN unpacking: palettes plus the per-level block pipeline
//!
//! An [`Unpacker`] borrows a caller-owned CRN byte range. Construction
//! decodes all four palettes and caches the three block-stream Huffman
//! models; after that, levels can be unpacked in any order, any number of
//! times, without touching the input again. The per-level walk covers the
//! block grid padded to even dimensions: padding blocks are decoded to keep
//! the bitstream position coherent but never written to the caller buffer.

mod dxt;
mod etc;
mod palettes;

use crate::codec::{BitReader, HuffmanModel};
use crate::common::{CrndError, Format, Result, TextureInfo, TranscodeFormat};
use crate::header::{check_level_index, Header};

/// Per-column state carried from the row above
///
/// `endpoint_reference` holds the stashed reference code for the bottom row
/// of the current 2x2 group; the index fields hold what the block directly
/// above used, enabling the "same as above" and ETC diagonal references.
#[derive(Debug, Clone, Copy, Default)]
struct BlockBufferElement {
    endpoint_reference: u16,
    color_endpoint_index: u16,
    alpha0_endpoint_index: u16,
    alpha1_endpoint_index: u16,
}

/// Geometry of one level's decode walk
#[derive(Debug, Clone, Copy)]
struct LevelGeometry {
    /// Visible blocks across
    blocks_x: u32,
    /// Visible blocks down
    blocks_y: u32,
    /// Decoded blocks across, padded to even
    padded_x: u32,
    /// Decoded blocks down, padded to even
    padded_y: u32,
    /// Caller row stride in bytes
    row_pitch: usize,
    /// Output stride per block in bytes
    block_stride: usize,
}

/// Decoder for one CRN file
///
/// Lives no longer than the byte range it was constructed over. Distinct
/// instances are independent; a single instance is single-threaded.
#[derive(Debug)]
pub struct Unpacker<'a> {
    data: &'a [u8],
    header: Header,

    reference_encoding: HuffmanModel,
    endpoint_delta: [HuffmanModel; 2],
    selector_delta: [HuffmanModel; 2],

    color_endpoints: Vec<u32>,
    color_selectors: Vec<u32>,
    alpha_endpoints: Vec<u16>,
    alpha_selectors: Vec<u16>,

    block_buffer: Vec<BlockBufferElement>,
}

fn palette_stream<'d>(data: &'d [u8], desc: &crate::header::PaletteDesc) -> Result<&'d [u8]> {
    let start = desc.ofs as usize;
    let end = start + desc.size as usize;
    if end > data.len() || start >= end {
        return Err(CrndError::MalformedHeader("palette stream out of range"));
    }
    Ok(&data[start..end])
}

impl<'a> Unpacker<'a> {
    /// Parse the header, receive the block-stream models and decode all four
    /// palettes
    pub fn new(data: &'a [u8]) -> Result<Unpacker<'a>> {
        let header = Header::parse(data)?;
        header.check_ranges()?;

        if header.color_endpoints.num == 0 && header.alpha_endpoints.num == 0 {
            return Err(CrndError::MalformedHeader("file defines no palettes"));
        }

        // The tables stream carries the three models the block pipeline uses.
        let mut codec = BitReader::new(palette_stream(data, &header.tables)?)?;
        let reference_encoding = codec.read_huffman_model()?;

        let mut endpoint_delta = [HuffmanModel::default(), HuffmanModel::default()];
        let mut selector_delta = [HuffmanModel::default(), HuffmanModel::default()];
        if header.color_endpoints.num != 0 {
            endpoint_delta[0] = codec.read_huffman_model()?;
            selector_delta[0] = codec.read_huffman_model()?;
        }
        if header.alpha_endpoints.num != 0 {
            endpoint_delta[1] = codec.read_huffman_model()?;
            selector_delta[1] = codec.read_huffman_model()?;
        }

        let format = header.format;
        let has_etc = format.has_etc_color_blocks();
        let has_subblocks = format.has_subblocks();

        let mut color_endpoints = Vec::new();
        let mut color_selectors = Vec::new();
        if header.color_endpoints.num != 0 {
            color_endpoints = palettes::decode_color_endpoints(
                palette_stream(data, &header.color_endpoints)?,
                header.color_endpoints.num,
                has_etc,
                has_subblocks,
            )?;
            color_selectors = palettes::decode_color_selectors(
                palette_stream(data, &header.color_selectors)?,
                header.color_selectors.num,
                has_etc,
                has_subblocks,
            )?;
        }

        let mut alpha_endpoints = Vec::new();
        let mut alpha_selectors = Vec::new();
        if header.alpha_endpoints.num != 0 {
            alpha_endpoints = palettes::decode_alpha_endpoints(
                palette_stream(data, &header.alpha_endpoints)?,
                header.alpha_endpoints.num,
            )?;
            let stream = palette_stream(data, &header.alpha_selectors)?;
            alpha_selectors = match format {
                Format::Etc2AS => {
                    palettes::decode_alpha_selectors_etcs(stream, header.alpha_selectors.num)?
                }
                Format::Etc2A => {
                    palettes::decode_alpha_selectors_etc(stream, header.alpha_selectors.num)?
                }
                _ => palettes::decode_alpha_selectors(stream, header.alpha_selectors.num)?,
            };
        }

        Ok(Unpacker {
            data,
            header,
            reference_encoding,
            endpoint_delta,
            selector_delta,
            color_endpoints,
            color_selectors,
            alpha_endpoints,
            alpha_selectors,
            block_buffer: Vec::new(),
        })
    }

    /// Global texture attributes of the borrowed file
    pub fn texture_info(&self) -> TextureInfo {
        TextureInfo {
            width: self.header.width as u32,
            height: self.header.height as u32,
            levels: self.header.levels as u32,
            faces: self.header.faces as u32,
            format: self.header.format,
            bytes_per_block: self.header.format.bytes_per_block(),
            userdata0: self.header.userdata0,
            userdata1: self.header.userdata1,
        }
    }

    /// Unpack one mip level into per-face output buffers
    ///
    /// `dst` holds one byte slice per face, each at least
    /// `row_pitch * blocks_y` bytes. A zero `row_pitch_in_bytes` means the
    /// dense pitch; otherwise it must be a dword multiple no smaller than
    /// the dense pitch. `block_pitch_in_dwords` is consulted only when
    /// converting ETC1S output and must then be non-zero.
    pub fn unpack_level(
        &mut self,
        dst: &mut [&mut [u8]],
        row_pitch_in_bytes: u32,
        level: u32,
        output_format: TranscodeFormat,
        block_pitch_in_dwords: u32,
    ) -> Result<()> {
        if self.header.is_segmented() {
            return Err(CrndError::ArgumentError(
                "segmented file requires unpack_level_segmented",
            ));
        }
        check_level_index(level)?;
        let (start, end) = self.header.level_range(level)?;
        if end > self.data.len() {
            return Err(CrndError::MalformedHeader("level stream out of range"));
        }
        // The borrow of the input outlives &mut self: copy the reference out.
        let data: &'a [u8] = self.data;
        self.unpack_level_stream(
            &data[start..end],
            dst,
            row_pitch_in_bytes,
            level,
            output_format,
            block_pitch_in_dwords,
        )
    }

    /// As [`Unpacker::unpack_level`], with the level stream supplied
    /// explicitly (for segmented files)
    pub fn unpack_level_segmented(
        &mut self,
        src: &[u8],
        dst: &mut [&mut [u8]],
        row_pitch_in_bytes: u32,
        level: u32,
        output_format: TranscodeFormat,
        block_pitch_in_dwords: u32,
    ) -> Result<()> {
        check_level_index(level)?;
        if level >= self.header.levels as u32 {
            return Err(CrndError::ArgumentError("level index out of range"));
        }
        self.unpack_level_stream(
            src,
            dst,
            row_pitch_in_bytes,
            level,
            output_format,
            block_pitch_in_dwords,
        )
    }

    /// Unpack one level, allocating dense per-face buffers
    pub fn unpack_level_vec(
        &mut self,
        level: u32,
        output_format: TranscodeFormat,
        block_pitch_in_dwords: u32,
    ) -> Result<Vec<Vec<u8>>> {
        check_level_index(level)?;
        if level >= self.header.levels as u32 {
            return Err(CrndError::ArgumentError("level index out of range"));
        }
        let width = (self.header.width as u32 >> level).max(1);
        let height = (self.header.height as u32 >> level).max(1);
        let blocks_x = (width + 3) >> 2;
        let blocks_y = (height + 3) >> 2;
        let block_size = self.output_block_size(output_format, block_pitch_in_dwords)?;
        let face_size = block_size as u64 * blocks_x as u64 * blocks_y as u64;
        if face_size > 1 << 30 {
            return Err(CrndError::ResourceError("output allocation too large"));
        }
        let face_size = face_size as usize;

        let mut faces = vec![vec![0u8; face_size]; self.header.faces as usize];
        {
            let mut slices: Vec<&mut [u8]> = faces.iter_mut().map(|f| f.as_mut_slice()).collect();
            self.unpack_level(&mut slices, 0, level, output_format, block_pitch_in_dwords)?;
        }
        Ok(faces)
    }

    fn output_block_size(
        &self,
        output_format: TranscodeFormat,
        block_pitch_in_dwords: u32,
    ) -> Result<u32> {
        if output_format == TranscodeFormat::Unchanged {
            return Ok(self.header.format.bytes_per_block());
        }
        if self.header.format != Format::Etc1S {
            return Err(CrndError::UnsupportedFormat(self.header.format as u8));
        }
        // The output stride is not implied by the source format, and both
        // conversion targets emit two dwords per block.
        if !(2..=0x4000).contains(&block_pitch_in_dwords) {
            return Err(CrndError::ArgumentError(
                "conversion requires a sane block_pitch_in_dwords",
            ));
        }
        Ok(block_pitch_in_dwords * 4)
    }

    fn unpack_level_stream(
        &mut self,
        src: &[u8],
        dst: &mut [&mut [u8]],
        row_pitch_in_bytes: u32,
        level: u32,
        output_format: TranscodeFormat,
        block_pitch_in_dwords: u32,
    ) -> Result<()> {
        if dst.len() != self.header.faces as usize {
            return Err(CrndError::ArgumentError("one output buffer per face required"));
        }

        let width = (self.header.width as u32 >> level).max(1);
        let height = (self.header.height as u32 >> level).max(1);
        let blocks_x = (width + 3) >> 2;
        let blocks_y = (height + 3) >> 2;

        let block_size = self.output_block_size(output_format, block_pitch_in_dwords)?;

        let minimal_row_pitch = block_size * blocks_x;
        let row_pitch = if row_pitch_in_bytes == 0 {
            minimal_row_pitch
        } else {
            if row_pitch_in_bytes < minimal_row_pitch || row_pitch_in_bytes & 3 != 0 {
                return Err(CrndError::ArgumentError("bad row pitch"));
            }
            row_pitch_in_bytes
        };

        for face in dst.iter() {
            if (face.len() as u64) < row_pitch as u64 * blocks_y as u64 {
                return Err(CrndError::ArgumentError("output buffer too small"));
            }
        }

        let geom = LevelGeometry {
            blocks_x,
            blocks_y,
            padded_x: (blocks_x + 1) & !1,
            padded_y: (blocks_y + 1) & !1,
            row_pitch: row_pitch as usize,
            block_stride: block_size as usize,
        };

        let fundamental = self.header.format.fundamental();
        let needs_color = !matches!(fundamental, Format::Dxt5A | Format::DxnXY | Format::DxnYX);
        let needs_alpha = matches!(
            fundamental,
            Format::Dxt5 | Format::Dxt5A | Format::DxnXY | Format::DxnYX | Format::Etc2A | Format::Etc2AS
        );
        if needs_color && self.color_endpoints.is_empty() {
            return Err(CrndError::MalformedHeader("missing color palettes"));
        }
        if needs_alpha && self.alpha_endpoints.is_empty() {
            return Err(CrndError::MalformedHeader("missing alpha palettes"));
        }

        let mut codec = BitReader::new(src)?;

        match self.header.format {
            Format::Dxt1 | Format::Etc1S => {
                self.unpack_dxt1_or_etc1s(&mut codec, dst, geom, output_format)
            }
            Format::Dxt5
            | Format::Dxt5CcxY
            | Format::Dxt5XGxR
            | Format::Dxt5XGBR
            | Format::Dxt5Agbr
            | Format::Etc2AS => self.unpack_dxt5(&mut codec, dst, geom),
            Format::Dxt5A => self.unpack_dxt5a(&mut codec, dst, geom),
            Format::DxnXY | Format::DxnYX => self.unpack_dxn(&mut codec, dst, geom),
            Format::Etc1 | Format::Etc2 => self.unpack_etc1(&mut codec, dst, geom),
            Format::Etc2A => self.unpack_etc2a(&mut codec, dst, geom),
            Format::Dxt3 => Err(CrndError::UnsupportedFormat(Format::Dxt3 as u8)),
        }
    }

    fn ensure_block_buffer(&mut self, len: usize) {
        if self.block_buffer.len() < len {
            self.block_buffer.resize(len, BlockBufferElement::default());
        }
    }
}

/// Write consecutive little-endian dwords at a byte offset
fn put_words(face: &mut [u8], ofs: usize, words: &[u32]) {
    for (i, &w) in words.iter().enumerate() {
        let at = ofs + i * 4;
        face[at..at + 4].copy_from_slice(&w.to_le_bytes());
    }
}

/// Advance a running palette index by a decoded delta, modulo the palette
///
/// Deltas never exceed the palette size in a well-formed stream, so a
/// single subtraction folds the sum back; anything still out of range is
/// stream corruption.
fn advance_index(idx: &mut u32, delta: u32, num: u32) -> Result<()> {
    *idx += delta;
    if *idx >= num {
        *idx -= num;
    }
    if *idx >= num {
        return Err(CrndError::EntropyError("palette delta out of range"));
    }
    Ok(())
}

/// Bounds-check a decoded absolute selector index
fn check_index(idx: u32, num: usize, what: &'static str) -> Result<usize> {
    if (idx as usize) < num {
        Ok(idx as usize)
    } else {
        Err(CrndError::EntropyError(what))
    }
}
