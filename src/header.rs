//! CRN container header parsing and validation
//!
//! The header is a fixed-layout big-endian record: magic, sizes, two CRC-16s,
//! texture attributes, four palette descriptors, the Huffman-tables
//! descriptor, and the per-level stream offset table. This module also
//! implements segmented-file synthesis, which trims the level streams off a
//! file so they can be supplied separately at decode time.

use crate::common::{
    CrndError, FileInfo, Format, LevelInfo, Result, TextureInfo, HEADER_FIXED_SIZE,
    HEADER_MIN_SIZE, MAX_LEVELS, MAX_LEVEL_RESOLUTION,
};
use crate::crc16::crc16;

/// Header magic, big-endian "CR"
pub const MAGIC: u16 = 0x4352;

/// Header flag marking a file whose level streams have been stripped
pub const FLAG_SEGMENTED: u16 = 1;

/// Location of one palette (or the Huffman tables) inside the file
///
/// On the wire: 32-bit offset, 24-bit byte size, 16-bit entry count. The
/// tables descriptor reuses the layout with a zero entry count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaletteDesc {
    /// File offset of the stream
    pub ofs: u32,
    /// Byte size of the stream
    pub size: u32,
    /// Number of palette entries
    pub num: u32,
}

impl PaletteDesc {
    fn parse(buf: &[u8]) -> PaletteDesc {
        PaletteDesc {
            ofs: be32(buf, 0),
            size: be24(buf, 4),
            num: be16(buf, 7) as u32,
        }
    }
}

/// Parsed CRN file header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Total header size in bytes, including the level offset table
    pub header_size: u16,
    /// CRC-16 over bytes `[6, header_size)`
    pub header_crc16: u16,
    /// Total size of the file payload this header describes
    pub data_size: u32,
    /// CRC-16 over bytes `[header_size, data_size)`
    pub data_crc16: u16,
    /// Top-level width in texels
    pub width: u16,
    /// Top-level height in texels
    pub height: u16,
    /// Mipmap level count
    pub levels: u8,
    /// Face count, 1 or 6
    pub faces: u8,
    /// Texture format
    pub format: Format,
    /// Feature flags; only [`FLAG_SEGMENTED`] is defined
    pub flags: u16,
    /// First user word
    pub userdata0: u32,
    /// Second user word
    pub userdata1: u32,
    /// Color endpoint palette location
    pub color_endpoints: PaletteDesc,
    /// Color selector palette location
    pub color_selectors: PaletteDesc,
    /// Alpha endpoint palette location
    pub alpha_endpoints: PaletteDesc,
    /// Alpha selector palette location
    pub alpha_selectors: PaletteDesc,
    /// Huffman tables stream location
    pub tables: PaletteDesc,
    /// File offset of each level's block stream
    pub level_ofs: Vec<u32>,
}

fn be16(buf: &[u8], ofs: usize) -> u16 {
    u16::from_be_bytes([buf[ofs], buf[ofs + 1]])
}

fn be24(buf: &[u8], ofs: usize) -> u32 {
    (buf[ofs] as u32) << 16 | (buf[ofs + 1] as u32) << 8 | buf[ofs + 2] as u32
}

fn be32(buf: &[u8], ofs: usize) -> u32 {
    u32::from_be_bytes([buf[ofs], buf[ofs + 1], buf[ofs + 2], buf[ofs + 3]])
}

impl Header {
    /// Parse the header record at the start of `data`
    ///
    /// Performs the structural checks (magic, sizes, known format); the CRC
    /// and range checks live in [`validate_file`].
    pub fn parse(data: &[u8]) -> Result<Header> {
        if data.len() < HEADER_MIN_SIZE {
            return Err(CrndError::MalformedHeader("file smaller than minimum header"));
        }
        if be16(data, 0) != MAGIC {
            return Err(CrndError::MalformedHeader("bad magic"));
        }

        let header_size = be16(data, 2);
        let data_size = be32(data, 6);
        let levels = data[16];

        let expected_header_size = HEADER_FIXED_SIZE + 4 * levels as usize;
        if (header_size as usize) < expected_header_size {
            return Err(CrndError::MalformedHeader("header size too small for level table"));
        }
        if (data.len() as u64) < data_size as u64 || (data_size as usize) < header_size as usize {
            return Err(CrndError::MalformedHeader("data size out of range"));
        }
        if data.len() < header_size as usize {
            return Err(CrndError::MalformedHeader("truncated header"));
        }

        let mut level_ofs = Vec::with_capacity(levels as usize);
        for i in 0..levels as usize {
            level_ofs.push(be32(data, HEADER_FIXED_SIZE + 4 * i));
        }

        Ok(Header {
            header_size,
            header_crc16: be16(data, 4),
            data_size,
            data_crc16: be16(data, 10),
            width: be16(data, 12),
            height: be16(data, 14),
            levels,
            faces: data[17],
            format: Format::from_u8(data[18])?,
            flags: be16(data, 19),
            userdata0: be32(data, 25),
            userdata1: be32(data, 29),
            color_endpoints: PaletteDesc::parse(&data[33..42]),
            color_selectors: PaletteDesc::parse(&data[42..51]),
            alpha_endpoints: PaletteDesc::parse(&data[51..60]),
            alpha_selectors: PaletteDesc::parse(&data[60..69]),
            tables: PaletteDesc::parse(&data[69..78]),
            level_ofs,
        })
    }

    /// True if the level streams have been stripped from this file
    pub fn is_segmented(&self) -> bool {
        self.flags & FLAG_SEGMENTED != 0
    }

    /// Byte range `[start, end)` of one level's block stream
    pub fn level_range(&self, level: u32) -> Result<(usize, usize)> {
        if level >= self.levels as u32 {
            return Err(CrndError::ArgumentError("level index out of range"));
        }
        let start = self.level_ofs[level as usize] as usize;
        let end = if (level as usize + 1) < self.levels as usize {
            self.level_ofs[level as usize + 1] as usize
        } else {
            self.data_size as usize
        };
        if start >= end {
            return Err(CrndError::MalformedHeader("empty level stream"));
        }
        Ok((start, end))
    }

    fn check_desc(&self, desc: &PaletteDesc, what: &'static str) -> Result<()> {
        if desc.ofs as u64 + desc.size as u64 > self.data_size as u64 {
            return Err(CrndError::MalformedHeader(what));
        }
        Ok(())
    }

    /// Range-check every field the block pipeline later trusts
    pub fn check_ranges(&self) -> Result<()> {
        if self.faces != 1 && self.faces != 6 {
            return Err(CrndError::MalformedHeader("face count must be 1 or 6"));
        }
        if self.width < 1 || self.width as u32 > MAX_LEVEL_RESOLUTION {
            return Err(CrndError::MalformedHeader("width out of range"));
        }
        if self.height < 1 || self.height as u32 > MAX_LEVEL_RESOLUTION {
            return Err(CrndError::MalformedHeader("height out of range"));
        }
        let max_mips = crate::common::max_mip_count(self.width as u32, self.height as u32);
        if self.levels < 1 || self.levels as u32 > max_mips {
            return Err(CrndError::MalformedHeader("level count out of range"));
        }

        self.check_desc(&self.color_endpoints, "color endpoint palette out of range")?;
        self.check_desc(&self.color_selectors, "color selector palette out of range")?;
        self.check_desc(&self.alpha_endpoints, "alpha endpoint palette out of range")?;
        self.check_desc(&self.alpha_selectors, "alpha selector palette out of range")?;
        self.check_desc(&self.tables, "tables stream out of range")?;

        // Level offsets only bound real streams; a segmented base keeps the
        // original offsets, which point past its own trimmed data_size.
        if !self.is_segmented() {
            let mut prev = self.header_size as u32;
            for &ofs in &self.level_ofs {
                if ofs < prev || ofs >= self.data_size {
                    return Err(CrndError::MalformedHeader("level offsets not monotonic"));
                }
                prev = ofs + 1;
            }
        }
        Ok(())
    }
}

/// Verify the header, both CRCs and every directory bound
///
/// Returns the file's structural summary on success.
pub fn validate_file(data: &[u8]) -> Result<FileInfo> {
    let header = Header::parse(data)?;

    let actual = crc16(&data[6..header.header_size as usize]);
    if actual != header.header_crc16 {
        return Err(CrndError::CorruptChecksum {
            region: "header",
            expected: header.header_crc16,
            actual,
        });
    }

    let actual = crc16(&data[header.header_size as usize..header.data_size as usize]);
    if actual != header.data_crc16 {
        return Err(CrndError::CorruptChecksum {
            region: "data",
            expected: header.data_crc16,
            actual,
        });
    }

    header.check_ranges()?;

    let mut level_compressed_size = Vec::with_capacity(header.levels as usize);
    if !header.is_segmented() {
        for i in 0..header.levels as u32 {
            let (start, end) = header.level_range(i)?;
            level_compressed_size.push((end - start) as u32);
        }
    }

    Ok(FileInfo {
        actual_data_size: header.data_size,
        header_size: header.header_size as u32,
        total_palette_size: header.color_endpoints.size
            + header.color_selectors.size
            + header.alpha_endpoints.size
            + header.alpha_selectors.size,
        tables_size: header.tables.size,
        levels: header.levels as u32,
        level_compressed_size,
        color_endpoint_palette_entries: header.color_endpoints.num,
        color_selector_palette_entries: header.color_selectors.num,
        alpha_endpoint_palette_entries: header.alpha_endpoints.num,
        alpha_selector_palette_entries: header.alpha_selectors.num,
    })
}

/// Read the global texture attributes without touching the palettes
pub fn texture_info(data: &[u8]) -> Result<TextureInfo> {
    let header = Header::parse(data)?;
    Ok(TextureInfo {
        width: header.width as u32,
        height: header.height as u32,
        levels: header.levels as u32,
        faces: header.faces as u32,
        format: header.format,
        bytes_per_block: header.format.bytes_per_block(),
        userdata0: header.userdata0,
        userdata1: header.userdata1,
    })
}

/// Geometry of one mip level
pub fn level_info(data: &[u8], level: u32) -> Result<LevelInfo> {
    let header = Header::parse(data)?;
    if level >= header.levels as u32 {
        return Err(CrndError::ArgumentError("level index out of range"));
    }
    let width = (header.width as u32 >> level).max(1);
    let height = (header.height as u32 >> level).max(1);
    Ok(LevelInfo {
        width,
        height,
        faces: header.faces as u32,
        blocks_x: (width + 3) >> 2,
        blocks_y: (height + 3) >> 2,
        bytes_per_block: header.format.bytes_per_block(),
        format: header.format,
    })
}

/// Borrow one level's compressed block stream
pub fn level_data(data: &[u8], level: u32) -> Result<&[u8]> {
    let header = Header::parse(data)?;
    if header.is_segmented() {
        return Err(CrndError::ArgumentError(
            "level streams are not present in a segmented file",
        ));
    }
    let (start, end) = header.level_range(level)?;
    if end > data.len() {
        return Err(CrndError::MalformedHeader("level stream out of range"));
    }
    Ok(&data[start..end])
}

/// Size of the base file [`create_segmented_file`] would produce
pub fn segmented_file_size(data: &[u8]) -> Result<u32> {
    let header = Header::parse(data)?;
    let mut size = header.header_size as u64;
    for desc in [
        &header.color_endpoints,
        &header.color_selectors,
        &header.alpha_endpoints,
        &header.alpha_selectors,
        &header.tables,
    ] {
        size = size.max(desc.ofs as u64 + desc.size as u64);
    }
    if size > u32::MAX as u64 {
        return Err(CrndError::MalformedHeader("palette directory out of range"));
    }
    Ok(size as u32)
}

/// Synthesize a trimmed base file holding only the header, palettes and
/// Huffman tables
///
/// Level streams must afterwards be supplied explicitly through
/// [`crate::Unpacker::unpack_level_segmented`]; [`level_data`] on the
/// original file locates them.
pub fn create_segmented_file(data: &[u8]) -> Result<Vec<u8>> {
    let header = Header::parse(data)?;
    if header.is_segmented() {
        return Err(CrndError::ArgumentError("file is already segmented"));
    }

    let base_size = segmented_file_size(data)? as usize;
    if base_size > data.len() {
        return Err(CrndError::MalformedHeader("palette directory out of range"));
    }
    let mut base = data[..base_size].to_vec();

    let flags = header.flags | FLAG_SEGMENTED;
    base[19..21].copy_from_slice(&flags.to_be_bytes());
    base[6..10].copy_from_slice(&(base_size as u32).to_be_bytes());

    let data_crc = crc16(&base[header.header_size as usize..]);
    base[10..12].copy_from_slice(&data_crc.to_be_bytes());

    let header_crc = crc16(&base[6..header.header_size as usize]);
    base[4..6].copy_from_slice(&header_crc.to_be_bytes());

    Ok(base)
}

/// Upper bound used by the entry points before parsing the level index
pub fn check_level_index(level: u32) -> Result<()> {
    if level >= MAX_LEVELS {
        return Err(CrndError::ArgumentError("level index out of range"));
    }
    Ok(())
}
