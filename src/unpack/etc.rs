//! Per-level block walks for the ETC formats with subblocks
//!
//! ETC blocks address two endpoints, so the reference-group byte carries
//! two 2-bit fields per block, split with the exact shift pattern
//! `(group & 3) | ((group >> 2) & 12)` for the top row and
//! `((group >> 2) & 3) | ((group >> 4) & 12)` for the stashed bottom row.
//! The secondary field also encodes the flip bit, and code 3 references the
//! block decoded at the top-right diagonal. The block header is assembled
//! here: differential mode when every component delta fits `[-4, 3]`,
//! individual 4-bit mode otherwise.

use super::{advance_index, check_index, put_words, LevelGeometry, Unpacker};
use crate::codec::BitReader;
use crate::common::Result;

/// Pack two 5-bit endpoint byte sets into the four ETC header bytes
fn pack_etc_header(e0: [u8; 4], e1: [u8; 4], flip: u32) -> u32 {
    let mut diff = true;
    for c in 0..3 {
        if !(e0[c] + 3 >= e1[c] && e1[c] + 4 >= e0[c]) {
            diff = false;
        }
    }

    let mut bytes = [0u8; 4];
    for c in 0..3 {
        bytes[c] = if diff {
            (e0[c] << 3) | ((e1[c] as i32 - e0[c] as i32) & 7) as u8
        } else {
            ((e0[c] << 3) & 0xF0) | (e1[c] >> 1)
        };
    }
    bytes[3] = ((e0[3] as u32) << 5 | (e1[3] as u32) << 2 | (diff as u32) << 1 | flip) as u8;
    u32::from_le_bytes(bytes)
}

impl Unpacker<'_> {
    /// ETC1 and ETC2 blocks: header word plus one selector word
    pub(super) fn unpack_etc1(
        &mut self,
        codec: &mut BitReader<'_>,
        dst: &mut [&mut [u8]],
        geom: LevelGeometry,
    ) -> Result<()> {
        let num_color_endpoints = self.color_endpoints.len() as u32;
        self.ensure_block_buffer((geom.padded_x as usize) << 1);

        for face in dst.iter_mut() {
            let mut color_endpoint_index = 0u32;
            let mut diagonal_color_endpoint_index = 0u32;

            for y in 0..geom.padded_y {
                let row_visible = y < geom.blocks_y;
                for x in 0..geom.padded_x {
                    let visible = row_visible && x < geom.blocks_x;
                    let buf = (x as usize) << 1;

                    let mut endpoint_reference = if y & 1 != 0 {
                        self.block_buffer[buf].endpoint_reference as u32
                    } else {
                        let reference_group = codec.decode(&self.reference_encoding)?;
                        self.block_buffer[buf].endpoint_reference =
                            (((reference_group >> 2) & 3) | ((reference_group >> 4) & 12)) as u16;
                        (reference_group & 3) | ((reference_group >> 2) & 12)
                    };

                    match endpoint_reference & 3 {
                        0 => {
                            let delta = codec.decode(&self.endpoint_delta[0])?;
                            advance_index(&mut color_endpoint_index, delta, num_color_endpoints)?;
                            self.block_buffer[buf].color_endpoint_index =
                                color_endpoint_index as u16;
                        }
                        1 => {
                            self.block_buffer[buf].color_endpoint_index =
                                color_endpoint_index as u16;
                        }
                        3 => {
                            color_endpoint_index = diagonal_color_endpoint_index;
                            self.block_buffer[buf].color_endpoint_index =
                                color_endpoint_index as u16;
                        }
                        _ => {
                            color_endpoint_index =
                                self.block_buffer[buf].color_endpoint_index as u32;
                        }
                    }
                    endpoint_reference >>= 2;

                    let e0 = self.color_endpoints[color_endpoint_index as usize].to_le_bytes();
                    let selector_index = codec.decode(&self.selector_delta[0])?;

                    if endpoint_reference != 0 {
                        let delta = codec.decode(&self.endpoint_delta[0])?;
                        advance_index(&mut color_endpoint_index, delta, num_color_endpoints)?;
                    }
                    diagonal_color_endpoint_index =
                        self.block_buffer[buf | 1].color_endpoint_index as u32;
                    self.block_buffer[buf | 1].color_endpoint_index = color_endpoint_index as u16;
                    let e1 = self.color_endpoints[color_endpoint_index as usize].to_le_bytes();

                    if visible {
                        let flip = (endpoint_reference >> 1) ^ 1;
                        let cs = check_index(
                            (selector_index << 1) | flip,
                            self.color_selectors.len(),
                            "color selector index out of range",
                        )?;
                        let words = [pack_etc_header(e0, e1, flip), self.color_selectors[cs]];
                        let ofs = y as usize * geom.row_pitch + x as usize * geom.block_stride;
                        put_words(face, ofs, &words);
                    }
                }
            }
        }
        Ok(())
    }

    /// ETC2A blocks: EAC alpha block then the ETC2 color block
    pub(super) fn unpack_etc2a(
        &mut self,
        codec: &mut BitReader<'_>,
        dst: &mut [&mut [u8]],
        geom: LevelGeometry,
    ) -> Result<()> {
        let num_color_endpoints = self.color_endpoints.len() as u32;
        let num_alpha_endpoints = self.alpha_endpoints.len() as u32;
        self.ensure_block_buffer((geom.padded_x as usize) << 1);

        for face in dst.iter_mut() {
            let mut color_endpoint_index = 0u32;
            let mut diagonal_color_endpoint_index = 0u32;
            let mut alpha0_endpoint_index = 0u32;
            let mut diagonal_alpha0_endpoint_index = 0u32;

            for y in 0..geom.padded_y {
                let row_visible = y < geom.blocks_y;
                for x in 0..geom.padded_x {
                    let visible = row_visible && x < geom.blocks_x;
                    let buf = (x as usize) << 1;

                    let mut endpoint_reference = if y & 1 != 0 {
                        self.block_buffer[buf].endpoint_reference as u32
                    } else {
                        let reference_group = codec.decode(&self.reference_encoding)?;
                        self.block_buffer[buf].endpoint_reference =
                            (((reference_group >> 2) & 3) | ((reference_group >> 4) & 12)) as u16;
                        (reference_group & 3) | ((reference_group >> 2) & 12)
                    };

                    match endpoint_reference & 3 {
                        0 => {
                            let delta = codec.decode(&self.endpoint_delta[0])?;
                            advance_index(&mut color_endpoint_index, delta, num_color_endpoints)?;
                            let delta = codec.decode(&self.endpoint_delta[1])?;
                            advance_index(&mut alpha0_endpoint_index, delta, num_alpha_endpoints)?;
                            self.block_buffer[buf].color_endpoint_index =
                                color_endpoint_index as u16;
                            self.block_buffer[buf].alpha0_endpoint_index =
                                alpha0_endpoint_index as u16;
                        }
                        1 => {
                            self.block_buffer[buf].color_endpoint_index =
                                color_endpoint_index as u16;
                            self.block_buffer[buf].alpha0_endpoint_index =
                                alpha0_endpoint_index as u16;
                        }
                        3 => {
                            color_endpoint_index = diagonal_color_endpoint_index;
                            alpha0_endpoint_index = diagonal_alpha0_endpoint_index;
                            self.block_buffer[buf].color_endpoint_index =
                                color_endpoint_index as u16;
                            self.block_buffer[buf].alpha0_endpoint_index =
                                alpha0_endpoint_index as u16;
                        }
                        _ => {
                            color_endpoint_index =
                                self.block_buffer[buf].color_endpoint_index as u32;
                            alpha0_endpoint_index =
                                self.block_buffer[buf].alpha0_endpoint_index as u32;
                        }
                    }
                    endpoint_reference >>= 2;

                    let e0 = self.color_endpoints[color_endpoint_index as usize].to_le_bytes();
                    let color_selector_index = codec.decode(&self.selector_delta[0])?;
                    let alpha0_selector_index = codec.decode(&self.selector_delta[1])?;

                    if endpoint_reference != 0 {
                        let delta = codec.decode(&self.endpoint_delta[0])?;
                        advance_index(&mut color_endpoint_index, delta, num_color_endpoints)?;
                    }
                    let e1 = self.color_endpoints[color_endpoint_index as usize].to_le_bytes();
                    diagonal_color_endpoint_index =
                        self.block_buffer[buf | 1].color_endpoint_index as u32;
                    diagonal_alpha0_endpoint_index =
                        self.block_buffer[buf | 1].alpha0_endpoint_index as u32;
                    self.block_buffer[buf | 1].color_endpoint_index = color_endpoint_index as u16;
                    self.block_buffer[buf | 1].alpha0_endpoint_index =
                        alpha0_endpoint_index as u16;

                    if visible {
                        let flip = (endpoint_reference >> 1) ^ 1;
                        let cs = check_index(
                            (color_selector_index << 1) | flip,
                            self.color_selectors.len(),
                            "color selector index out of range",
                        )?;
                        let asel = check_index(
                            alpha0_selector_index,
                            self.alpha_selectors.len() / 6,
                            "alpha selector index out of range",
                        )? * 6
                            + if flip != 0 { 3 } else { 0 };

                        let a = &self.alpha_selectors[asel..asel + 3];
                        let words = [
                            self.alpha_endpoints[alpha0_endpoint_index as usize] as u32
                                | (a[0] as u32) << 16,
                            a[1] as u32 | (a[2] as u32) << 16,
                            pack_etc_header(e0, e1, flip),
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
}
