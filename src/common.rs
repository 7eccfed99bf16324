//! Common types and constants for the CRN transcoder
//!
//! This module defines the texture format enumerators, the crate-wide error
//! type, and the info structures returned by the file queries.

use thiserror::Error;

/// Texture format stored in a CRN file
///
/// The `Dxt5CcxY`/`Dxt5XGxR`/`Dxt5XGBR`/`Dxt5Agbr` variants decode exactly
/// like [`Format::Dxt5`]; the enumerator only records the channel swizzle the
/// encoder applied and is preserved in [`TextureInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Format {
    /// DXT1 (BC1): 8-byte color blocks
    Dxt1 = 0,
    /// DXT3 (BC2): recognized but never produced by the encoder
    Dxt3 = 1,
    /// DXT5 (BC3): 16-byte alpha+color blocks
    Dxt5 = 2,
    /// DXT5 with luma/chroma swizzle (decodes as DXT5)
    Dxt5CcxY = 3,
    /// DXT5 with xGxR swizzle (decodes as DXT5)
    Dxt5XGxR = 4,
    /// DXT5 with xGBR swizzle (decodes as DXT5)
    Dxt5XGBR = 5,
    /// DXT5 with AGBR swizzle (decodes as DXT5)
    Dxt5Agbr = 6,
    /// DXN / 3Dc two-channel blocks, X then Y
    DxnXY = 7,
    /// DXN / 3Dc two-channel blocks, Y then X
    DxnYX = 8,
    /// DXT5A (BC4): 8-byte single-channel alpha blocks
    Dxt5A = 9,
    /// ETC1
    Etc1 = 10,
    /// ETC2 (RGB)
    Etc2 = 11,
    /// ETC2 with EAC alpha
    Etc2A = 12,
    /// ETC1S: restricted ETC1 subset, convertible to DXT1/DXT5A
    Etc1S = 13,
    /// ETC2AS: ETC2 EAC alpha over ETC1S color
    Etc2AS = 14,
}

/// Total number of defined format enumerators
pub const FORMAT_COUNT: u8 = 15;

impl Format {
    /// Create a Format from its file enumerator value
    pub fn from_u8(value: u8) -> Result<Self> {
        Ok(match value {
            0 => Format::Dxt1,
            1 => Format::Dxt3,
            2 => Format::Dxt5,
            3 => Format::Dxt5CcxY,
            4 => Format::Dxt5XGxR,
            5 => Format::Dxt5XGBR,
            6 => Format::Dxt5Agbr,
            7 => Format::DxnXY,
            8 => Format::DxnYX,
            9 => Format::Dxt5A,
            10 => Format::Etc1,
            11 => Format::Etc2,
            12 => Format::Etc2A,
            13 => Format::Etc1S,
            14 => Format::Etc2AS,
            _ => return Err(CrndError::UnsupportedFormat(value)),
        })
    }

    /// Bits consumed per texel by this format's output blocks
    pub fn bits_per_texel(self) -> u32 {
        match self {
            Format::Dxt1 | Format::Dxt5A | Format::Etc1 | Format::Etc2 | Format::Etc1S => 4,
            _ => 8,
        }
    }

    /// Bytes per emitted 4x4 block (8 or 16)
    pub fn bytes_per_block(self) -> u32 {
        (self.bits_per_texel() << 4) >> 3
    }

    /// The format whose wire layout this format decodes as
    ///
    /// Collapses the DXT5 swizzle hints onto plain DXT5.
    pub fn fundamental(self) -> Format {
        match self {
            Format::Dxt5CcxY | Format::Dxt5XGxR | Format::Dxt5XGBR | Format::Dxt5Agbr => {
                Format::Dxt5
            }
            f => f,
        }
    }

    /// True for the ETC-family formats whose color palettes use the 5:5:5
    /// per-byte base-color packing
    pub fn has_etc_color_blocks(self) -> bool {
        matches!(
            self,
            Format::Etc1 | Format::Etc2 | Format::Etc2A | Format::Etc1S | Format::Etc2AS
        )
    }

    /// True for ETC formats with two independently-addressed subblocks
    pub fn has_subblocks(self) -> bool {
        matches!(self, Format::Etc1 | Format::Etc2 | Format::Etc2A)
    }
}

/// Output layout requested from [`crate::Unpacker::unpack_level`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranscodeFormat {
    /// Emit blocks in the file's own format
    #[default]
    Unchanged,
    /// Convert ETC1S blocks to DXT1
    Dxt1,
    /// Convert ETC1S blocks to DXT5A
    Dxt5A,
}

/// Error type for CRN transcoding operations
#[derive(Debug, Error)]
pub enum CrndError {
    /// Header magic, size or field out of range
    #[error("Malformed header: {0}")]
    MalformedHeader(&'static str),

    /// A CRC-16 over the header or data region did not verify
    #[error("Checksum mismatch in {region}: expected {expected:04X}, got {actual:04X}")]
    CorruptChecksum {
        /// Which region failed ("header" or "data")
        region: &'static str,
        /// CRC stored in the file
        expected: u16,
        /// CRC computed over the bytes
        actual: u16,
    },

    /// Unknown format enumerator, or a conversion this format does not support
    #[error("Unsupported format enumerator: {0}")]
    UnsupportedFormat(u8),

    /// Prefix-code table construction or symbol decoding failed
    #[error("Entropy decoding error: {0}")]
    EntropyError(&'static str),

    /// Caller-supplied argument out of range (pitch, level index, buffer size)
    #[error("Invalid argument: {0}")]
    ArgumentError(&'static str),

    /// An internal allocation could not be sized
    #[error("Resource limit exceeded: {0}")]
    ResourceError(&'static str),
}

/// Result type alias for CRN transcoding operations
pub type Result<T> = std::result::Result<T, CrndError>;

// File limits

/// Largest width or height a CRN file may declare
pub const MAX_LEVEL_RESOLUTION: u32 = 4096;

/// Largest mipmap chain length any entry point accepts
pub const MAX_LEVELS: u32 = 16;

/// Size of the fixed header prefix, before the level offset table
pub const HEADER_FIXED_SIZE: usize = 78;

/// Smallest possible valid file header (one mip level)
pub const HEADER_MIN_SIZE: usize = HEADER_FIXED_SIZE + 4;

/// Number of mipmap levels of a full chain down to 1x1
pub fn max_mip_count(width: u32, height: u32) -> u32 {
    if (width | height) == 0 {
        return 0;
    }
    let (mut w, mut h) = (width, height);
    let mut levels = 1;
    while w > 1 || h > 1 {
        w >>= 1;
        h >>= 1;
        levels += 1;
    }
    levels
}

/// Global texture attributes of a CRN file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureInfo {
    /// Width of the top mip level in texels
    pub width: u32,
    /// Height of the top mip level in texels
    pub height: u32,
    /// Number of mipmap levels
    pub levels: u32,
    /// Number of faces (1, or 6 for cube maps)
    pub faces: u32,
    /// Stored texture format
    pub format: Format,
    /// Bytes per 4x4 block in the native output layout
    pub bytes_per_block: u32,
    /// First user word from the header
    pub userdata0: u32,
    /// Second user word from the header
    pub userdata1: u32,
}

/// Geometry of one mipmap level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelInfo {
    /// Level width in texels
    pub width: u32,
    /// Level height in texels
    pub height: u32,
    /// Number of faces
    pub faces: u32,
    /// Blocks across
    pub blocks_x: u32,
    /// Blocks down
    pub blocks_y: u32,
    /// Bytes per 4x4 block in the native output layout
    pub bytes_per_block: u32,
    /// Stored texture format
    pub format: Format,
}

/// Structural summary produced by [`crate::validate_file`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileInfo {
    /// Declared data size in bytes
    pub actual_data_size: u32,
    /// Header size in bytes, including the level offset table
    pub header_size: u32,
    /// Combined byte size of the four palette streams
    pub total_palette_size: u32,
    /// Byte size of the Huffman tables stream
    pub tables_size: u32,
    /// Number of mipmap levels
    pub levels: u32,
    /// Compressed byte size of each level stream
    pub level_compressed_size: Vec<u32>,
    /// Color endpoint palette entry count
    pub color_endpoint_palette_entries: u32,
    /// Color selector palette entry count
    pub color_selector_palette_entries: u32,
    /// Alpha endpoint palette entry count
    pub alpha_endpoint_palette_entries: u32,
    /// Alpha selector palette entry count
    pub alpha_selector_palette_entries: u32,
}
