//! crnd - Rust transcoder for CRN (Crunch) compressed textures
//!
//! This crate provides a pure Rust transcoder for the CRN format produced by
//! the crunch texture compression library. A CRN file factors a texture into
//! small shared palettes and a compact per-block description; the transcoder
//! rehydrates that description into fully-formed GPU block-compressed data
//! (DXT1/3/5/5A, DXN/3Dc, ETC1, ETC2, ETC2A, ETC1S, ETC2AS) ready for
//! upload. It does not decode blocks to pixels and performs no I/O: all
//! input is a caller-owned byte range.
//!
//! # Example - Inspect and unpack
//!
//! ```no_run
//! use crnd::{texture_info, Unpacker, TranscodeFormat};
//!
//! let data = std::fs::read("texture.crn")?;
//! let info = texture_info(&data)?;
//! println!("{}x{} {:?}, {} levels", info.width, info.height, info.format, info.levels);
//!
//! let mut unpacker = Unpacker::new(&data)?;
//! for level in 0..info.levels {
//!     let faces = unpacker.unpack_level_vec(level, TranscodeFormat::Unchanged, 0)?;
//!     // faces[f] now holds the level's block-compressed bytes for face f.
//!     let _ = faces;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Example - Segmented files
//!
//! ```no_run
//! use crnd::{create_segmented_file, level_data, Unpacker, TranscodeFormat};
//!
//! let data = std::fs::read("texture.crn")?;
//! // A base file holds only the header, palettes and Huffman tables.
//! let base = create_segmented_file(&data)?;
//!
//! let mut unpacker = Unpacker::new(&base)?;
//! let mut face = vec![0u8; 1 << 20];
//! let stream = level_data(&data, 0)?;
//! unpacker.unpack_level_segmented(
//!     stream,
//!     &mut [&mut face],
//!     0,
//!     0,
//!     TranscodeFormat::Unchanged,
//!     0,
//! )?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

// Public modules
pub mod codec;
pub mod common;
pub mod crc16;
pub mod dxt;
pub mod error;
pub mod etc;
pub mod header;
pub mod transcode;
pub mod unpack;

// Re-export commonly used types
pub use common::{
    CrndError, FileInfo, Format, LevelInfo, Result, TextureInfo, TranscodeFormat, FORMAT_COUNT,
    MAX_LEVELS, MAX_LEVEL_RESOLUTION,
};
pub use crc16::crc16;
pub use header::{
    create_segmented_file, level_data, level_info, segmented_file_size, texture_info,
    validate_file,
};
pub use unpack::Unpacker;
