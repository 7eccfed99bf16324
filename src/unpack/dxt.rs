//! Per-level block walks for the DXT-family formats
//!
//! All four walks share the same skeleton: blocks are visited in raster
//! order over the even-padded grid, one reference-group byte is pulled per
//! 2x2 super-block, and the 2-bit endpoint reference decides whether a
//! block decodes a fresh endpoint delta, repeats the running index, or
//! copies from the row above. Only the emitted words differ per format.

use super::{advance_index, check_index, put_words, LevelGeometry, Unpacker};
use crate::codec::BitReader;
use crate::common::{Result, TranscodeFormat};
use crate::etc::EtcBlock;
use crate::transcode::{convert_etc1s_to_dxt1, convert_etc1s_to_dxt5a};

impl Unpacker<'_> {
    /// DXT1 and ETC1S blocks: two dwords, or an ETC1S conversion
    pub(super) fn unpack_dxt1_or_etc1s(
        &mut self,
        codec: &mut BitReader<'_>,
        dst: &mut [&mut [u8]],
        geom: LevelGeometry,
        output_format: TranscodeFormat,
    ) -> Result<()> {
        let num_color_endpoints = self.color_endpoints.len() as u32;
        self.ensure_block_buffer(geom.padded_x as usize);

        for face in dst.iter_mut() {
            let mut color_endpoint_index = 0u32;
            let mut reference_group = 0u32;

            for y in 0..geom.padded_y {
                let row_visible = y < geom.blocks_y;
                for x in 0..geom.padded_x {
                    let visible = row_visible && x < geom.blocks_x;

                    if y & 1 == 0 && x & 1 == 0 {
                        reference_group = codec.decode(&self.reference_encoding)?;
                    }
                    let endpoint_reference = if y & 1 != 0 {
                        self.block_buffer[x as usize].endpoint_reference as u32
                    } else {
                        let reference = reference_group & 3;
                        reference_group >>= 2;
                        self.block_buffer[x as usize].endpoint_reference =
                            (reference_group & 3) as u16;
                        reference_group >>= 2;
                        reference
                    };

                    if endpoint_reference == 0 {
                        let delta = codec.decode(&self.endpoint_delta[0])?;
                        advance_index(&mut color_endpoint_index, delta, num_color_endpoints)?;
                        self.block_buffer[x as usize].color_endpoint_index =
                            color_endpoint_index as u16;
                    } else if endpoint_reference == 1 {
                        self.block_buffer[x as usize].color_endpoint_index =
                            color_endpoint_index as u16;
                    } else {
                        color_endpoint_index =
                            self.block_buffer[x as usize].color_endpoint_index as u32;
                    }

                    let color_selector_index = codec.decode(&self.selector_delta[0])?;

                    if visible {
                        let cs = check_index(
                            color_selector_index,
                            self.color_selectors.len(),
                            "color selector index out of range",
                        )?;
                        let endpoint_word = self.color_endpoints[color_endpoint_index as usize];
                        let selector_word = self.color_selectors[cs];

                        let words = match output_format {
                            TranscodeFormat::Unchanged => [endpoint_word, selector_word],
                            TranscodeFormat::Dxt1 => convert_etc1s_to_dxt1(
                                &EtcBlock::from_words(endpoint_word, selector_word),
                            ),
                            TranscodeFormat::Dxt5A => convert_etc1s_to_dxt5a(
                                &EtcBlock::from_words(endpoint_word, selector_word),
                            ),
                        };

                        let ofs = y as usize * geom.row_pitch + x as usize * geom.block_stride;
                        put_words(face, ofs, &words);
                    }
                }
            }
        }
        Ok(())
    }

    /// DXT5 family and ETC2AS blocks: alpha block then color block
    pub(super) fn unpack_dxt5(
        &mut self,
        codec: &mut BitReader<'_>,
        dst: &mut [&mut [u8]],
        geom: LevelGeometry,
    ) -> Result<()> {
        let num_color_endpoints = self.color_endpoints.len() as u32;
        let num_alpha_endpoints = self.alpha_endpoints.len() as u32;
        self.ensure_block_buffer(geom.padded_x as usize);

        for face in dst.iter_mut() {
            let mut color_endpoint_index = 0u32;
            let mut alpha0_endpoint_index = 0u32;
            let mut reference_group = 0u32;

            for y in 0..geom.padded_y {
                let row_visible = y < geom.blocks_y;
                for x in 0..geom.padded_x {
                    let visible = row_visible && x < geom.blocks_x;

                    if y & 1 == 0 && x & 1 == 0 {
                        reference_group = codec.decode(&self.reference_encoding)?;
                    }
                    let endpoint_reference = if y & 1 != 0 {
                        self.block_buffer[x as usize].endpoint_reference as u32
                    } else {
                        let reference = reference_group & 3;
                        reference_group >>= 2;
                        self.block_buffer[x as usize].endpoint_reference =
                            (reference_group & 3) as u16;
                        reference_group >>= 2;
                        reference
                    };

                    if endpoint_reference == 0 {
                        let delta = codec.decode(&self.endpoint_delta[0])?;
                        advance_index(&mut color_endpoint_index, delta, num_color_endpoints)?;
                        self.block_buffer[x as usize].color_endpoint_index =
                            color_endpoint_index as u16;

                        let delta = codec.decode(&self.endpoint_delta[1])?;
                        advance_index(&mut alpha0_endpoint_index, delta, num_alpha_endpoints)?;
                        self.block_buffer[x as usize].alpha0_endpoint_index =
                            alpha0_endpoint_index as u16;
                    } else if endpoint_reference == 1 {
                        self.block_buffer[x as usize].color_endpoint_index =
                            color_endpoint_index as u16;
                        self.block_buffer[x as usize].alpha0_endpoint_index =
                            alpha0_endpoint_index as u16;
                    } else {
                        color_endpoint_index =
                            self.block_buffer[x as usize].color_endpoint_index as u32;
                        alpha0_endpoint_index =
                            self.block_buffer[x as usize].alpha0_endpoint_index as u32;
                    }

                    let color_selector_index = codec.decode(&self.selector_delta[0])?;
                    let alpha0_selector_index = codec.decode(&self.selector_delta[1])?;

                    if visible {
                        let cs = check_index(
                            color_selector_index,
                            self.color_selectors.len(),
                            "color selector index out of range",
                        )?;
                        let asel = check_index(
                            alpha0_selector_index,
                            self.alpha_selectors.len() / 3,
                            "alpha selector index out of range",
                        )? * 3;

                        let a = &self.alpha_selectors[asel..asel + 3];
                        let words = [
                            self.alpha_endpoints[alpha0_endpoint_index as usize] as u32
                                | (a[0] as u32) << 16,
                            a[1] as u32 | (a[2] as u32) << 16,
                            self.color_endpoints[color_endpoint_index as usize],
                            self.color_selectors[cs],
                        ];

                        let ofs = y as usize * geom.row_pitch + x as usize * geom.block_stride;
                        put_words(face, ofs, &words);
                    }
                }
            }
        }
        Ok(())
    }

    /// DXT5A blocks: one alpha block per block
    pub(super) fn unpack_dxt5a(
        &mut self,
        codec: &mut BitReader<'_>,
        dst: &mut [&mut [u8]],
        geom: LevelGeometry,
    ) -> Result<()> {
        let num_alpha_endpoints = self.alpha_endpoints.len() as u32;
        self.ensure_block_buffer(geom.padded_x as usize);

        for face in dst.iter_mut() {
            let mut alpha0_endpoint_index = 0u32;
            let mut reference_group = 0u32;

            for y in 0..geom.padded_y {
                let row_visible = y < geom.blocks_y;
                for x in 0..geom.padded_x {
                    let visible = row_visible && x < geom.blocks_x;

                    if y & 1 == 0 && x & 1 == 0 {
                        reference_group = codec.decode(&self.reference_encoding)?;
                    }
                    let endpoint_reference = if y & 1 != 0 {
                        self.block_buffer[x as usize].endpoint_reference as u32
                    } else {
                        let reference = reference_group & 3;
                        reference_group >>= 2;
                        self.block_buffer[x as usize].endpoint_reference =
                            (reference_group & 3) as u16;
                        reference_group >>= 2;
                        reference
                    };

                    if endpoint_reference == 0 {
                        let delta = codec.decode(&self.endpoint_delta[1])?;
                        advance_index(&mut alpha0_endpoint_index, delta, num_alpha_endpoints)?;
                        self.block_buffer[x as usize].alpha0_endpoint_index =
                            alpha0_endpoint_index as u16;
                    } else if endpoint_reference == 1 {
                        self.block_buffer[x as usize].alpha0_endpoint_index =
                            alpha0_endpoint_index as u16;
                    } else {
                        alpha0_endpoint_index =
                            self.block_buffer[x as usize].alpha0_endpoint_index as u32;
                    }

                    let alpha0_selector_index = codec.decode(&self.selector_delta[1])?;

                    if visible {
                        let asel = check_index(
                            alpha0_selector_index,
                            self.alpha_selectors.len() / 3,
                            "alpha selector index out of range",
                        )? * 3;

                        let a = &self.alpha_selectors[asel..asel + 3];
                        let words = [
                            self.alpha_endpoints[alpha0_endpoint_index as usize] as u32
                                | (a[0] as u32) << 16,
                            a[1] as u32 | (a[2] as u32) << 16,
                        ];

                        let ofs = y as usize * geom.row_pitch + x as usize * geom.block_stride;
                        put_words(face, ofs, &words);
                    }
                }
            }
        }
        Ok(())
    }

    /// DXN blocks: two independent DXT5A channels per block
    pub(super) fn unpack_dxn(
        &mut self,
        codec: &mut BitReader<'_>,
        dst: &mut [&mut [u8]],
        geom: LevelGeometry,
    ) -> Result<()> {
        let num_alpha_endpoints = self.alpha_endpoints.len() as u32;
        self.ensure_block_buffer(geom.padded_x as usize);

        for face in dst.iter_mut() {
            let mut alpha0_endpoint_index = 0u32;
            let mut alpha1_endpoint_index = 0u32;
            let mut reference_group = 0u32;

            for y in 0..geom.padded_y {
                let row_visible = y < geom.blocks_y;
                for x in 0..geom.padded_x {
                    let visible = row_visible && x < geom.blocks_x;

                    if y & 1 == 0 && x & 1 == 0 {
                        reference_group = codec.decode(&self.reference_encoding)?;
                    }
                    let endpoint_reference = if y & 1 != 0 {
                        self.block_buffer[x as usize].endpoint_reference as u32
                    } else {
                        let reference = reference_group & 3;
                        reference_group >>= 2;
                        self.block_buffer[x as usize].endpoint_reference =
                            (reference_group & 3) as u16;
                        reference_group >>= 2;
                        reference
                    };

                    if endpoint_reference == 0 {
                        let delta = codec.decode(&self.endpoint_delta[1])?;
                        advance_index(&mut alpha0_endpoint_index, delta, num_alpha_endpoints)?;
                        self.block_buffer[x as usize].alpha0_endpoint_index =
                            alpha0_endpoint_index as u16;

                        let delta = codec.decode(&self.endpoint_delta[1])?;
                        advance_index(&mut alpha1_endpoint_index, delta, num_alpha_endpoints)?;
                        self.block_buffer[x as usize].alpha1_endpoint_index =
                            alpha1_endpoint_index as u16;
                    } else if endpoint_reference == 1 {
                        self.block_buffer[x as usize].alpha0_endpoint_index =
                            alpha0_endpoint_index as u16;
                        self.block_buffer[x as usize].alpha1_endpoint_index =
                            alpha1_endpoint_index as u16;
                    } else {
                        alpha0_endpoint_index =
                            self.block_buffer[x as usize].alpha0_endpoint_index as u32;
                        alpha1_endpoint_index =
                            self.block_buffer[x as usize].alpha1_endpoint_index as u32;
                    }

                    let alpha0_selector_index = codec.decode(&self.selector_delta[1])?;
                    let alpha1_selector_index = codec.decode(&self.selector_delta[1])?;

                    if visible {
                        let num_entries = self.alpha_selectors.len() / 3;
                        let asel0 = check_index(
                            alpha0_selector_index,
                            num_entries,
                            "alpha selector index out of range",
                        )? * 3;
                        let asel1 = check_index(
                            alpha1_selector_index,
                            num_entries,
                            "alpha selector index out of range",
                        )? * 3;

                        let a0 = &self.alpha_selectors[asel0..asel0 + 3];
                        let a1 = &self.alpha_selectors[asel1..asel1 + 3];
                        let words = [
                            self.alpha_endpoints[alpha0_endpoint_index as usize] as u32
                                | (a0[0] as u32) << 16,
                            a0[1] as u32 | (a0[2] as u32) << 16,
                            self.alpha_endpoints[alpha1_endpoint_index as usize] as u32
                                | (a1[0] as u32) << 16,
                            a1[1] as u32 | (a1[2] as u32) << 16,
                        ];

                        let ofs = y as usize * geom.row_pitch + x as usize * geom.block_stride;
                        put_words(face, ofs, &words);
                    }
                }
            }
        }
        Ok(())
    }
}
