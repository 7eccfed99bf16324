//! Palette stream decoders
//!
//! Each palette is an independent bitstream: one or two embedded Huffman
//! models followed by delta-coded symbols. Color endpoints accumulate
//! per-component deltas, selectors XOR-accumulate packed groups, and every
//! selector is re-permuted from the linear order the streams use into the
//! native DXT or ETC encoding while the palette is materialized.

use crate::codec::BitReader;
use crate::common::Result;
use crate::dxt::{dxt1_selectors_from_linear, DXT5_FROM_LINEAR};

/// Decode the color endpoint palette
///
/// DXT entries pack two RGB565 endpoints per 32-bit word. ETC entries hold
/// four 5-bit fields per byte; formats without subblocks additionally
/// expand the intensity field and set the differential bit so the word is a
/// ready-made ETC1S block header.
pub fn decode_color_endpoints(
    stream: &[u8],
    num: u32,
    has_etc: bool,
    has_subblocks: bool,
) -> Result<Vec<u32>> {
    let mut codec = BitReader::new(stream)?;
    let dm0 = codec.read_huffman_model()?;

    let mut out = Vec::with_capacity(num as usize);

    if has_etc {
        let mut acc = 0u32;
        for _ in 0..num {
            for b in (0..32).step_by(8) {
                acc = acc.wrapping_add(codec.decode(&dm0)? << b);
            }
            acc &= 0x1F1F_1F1F;
            out.push(if has_subblocks {
                acc
            } else {
                (acc & 0x0700_0000) << 5
                    | (acc & 0x0700_0000) << 2
                    | 0x0200_0000
                    | (acc & 0x001F_1F1F) << 3
            });
        }
    } else {
        let dm1 = codec.read_huffman_model()?;
        let (mut a, mut b, mut c) = (0u32, 0u32, 0u32);
        let (mut d, mut e, mut f) = (0u32, 0u32, 0u32);
        for _ in 0..num {
            a = (a + codec.decode(&dm0)?) & 31;
            b = (b + codec.decode(&dm1)?) & 63;
            c = (c + codec.decode(&dm0)?) & 31;
            d = (d + codec.decode(&dm0)?) & 31;
            e = (e + codec.decode(&dm1)?) & 63;
            f = (f + codec.decode(&dm0)?) & 31;
            out.push(c | (b << 5) | (a << 11) | (f << 16) | (e << 21) | (d << 27));
        }
    }

    Ok(out)
}

/// Decode the color selector palette
///
/// Each entry XOR-accumulates eight 4-bit groups into sixteen linear 2-bit
/// selectors. DXT output converts them to the native DXT1 encoding in one
/// word; ETC output scatters them into the block's MSB/LSB selector planes,
/// with subblock formats producing a flipped and an unflipped word.
pub fn decode_color_selectors(
    stream: &[u8],
    num: u32,
    has_etc: bool,
    has_subblocks: bool,
) -> Result<Vec<u32>> {
    let mut codec = BitReader::new(stream)?;
    let dm = codec.read_huffman_model()?;

    let mut out = vec![0u32; (num as usize) << (has_subblocks as usize)];

    let mut s = 0u32;
    for i in 0..num as usize {
        for j in (0..32).step_by(4) {
            s ^= codec.decode(&dm)? << j;
        }

        if has_etc {
            // Raw ETC selector values, still in linear pixel order.
            let selector = (!s & 0xAAAA_AAAA) | (!(s ^ (s >> 1)) & 0x5555_5555);
            let mut t = 8i32;
            for h in 0..4u32 {
                for w in 0..4u32 {
                    let shift = (t & 15) as u32;
                    if has_subblocks {
                        let s0 = selector >> ((w << 3) | (h << 1));
                        out[i << 1] |= (((s0 >> 1) & 1) | ((s0 & 1) << 16)) << shift;
                    }
                    let s1 = selector >> ((h << 3) | (w << 1));
                    let idx = if has_subblocks { (i << 1) | 1 } else { i };
                    out[idx] |= (((s1 >> 1) & 1) | ((s1 & 1) << 16)) << shift;
                    t += 4;
                }
                t -= 15;
            }
        } else {
            out[i] = dxt1_selectors_from_linear(s);
        }
    }

    Ok(out)
}

/// Decode the alpha endpoint palette: `low | (high << 8)` per entry
pub fn decode_alpha_endpoints(stream: &[u8], num: u32) -> Result<Vec<u16>> {
    let mut codec = BitReader::new(stream)?;
    let dm = codec.read_huffman_model()?;

    let mut out = Vec::with_capacity(num as usize);
    let (mut a, mut b) = (0u32, 0u32);
    for _ in 0..num {
        a = (a + codec.decode(&dm)?) & 255;
        b = (b + codec.decode(&dm)?) & 255;
        out.push((a | (b << 8)) as u16);
    }
    Ok(out)
}

/// Decode the DXT5-style alpha selector palette: three 16-bit words per
/// entry holding sixteen 3-bit selectors
pub fn decode_alpha_selectors(stream: &[u8], num: u32) -> Result<Vec<u16>> {
    let mut codec = BitReader::new(stream)?;
    let dm = codec.read_huffman_model()?;

    // Remap a 6-bit pair of linear selectors in one step.
    let mut dxt5_from_linear = [0u8; 64];
    for (i, v) in dxt5_from_linear.iter_mut().enumerate() {
        *v = DXT5_FROM_LINEAR[i & 7] | (DXT5_FROM_LINEAR[i >> 3] << 3);
    }

    let mut out = Vec::with_capacity(num as usize * 3);
    let (mut s0_linear, mut s1_linear) = (0u32, 0u32);
    for _ in 0..num {
        let (mut s0, mut s1) = (0u32, 0u32);
        for j in (0..24).step_by(6) {
            s0_linear ^= codec.decode(&dm)? << j;
            s0 |= (dxt5_from_linear[((s0_linear >> j) & 0x3F) as usize] as u32) << j;
        }
        for j in (0..24).step_by(6) {
            s1_linear ^= codec.decode(&dm)? << j;
            s1 |= (dxt5_from_linear[((s1_linear >> j) & 0x3F) as usize] as u32) << j;
        }
        out.push(s0 as u16);
        out.push(((s0 >> 16) | (s1 << 8)) as u16);
        out.push((s1 >> 8) as u16);
    }
    Ok(out)
}

/// Shared ETC alpha scatter: decode one pixel's 3-bit group value
///
/// Two pixels share each XOR-accumulated group byte; odd pixels reuse the
/// previous group shifted down.
struct EtcAlphaGroups {
    s_linear: [u8; 8],
    s_group: u32,
}

impl EtcAlphaGroups {
    fn new() -> Self {
        EtcAlphaGroups {
            s_linear: [0; 8],
            s_group: 0,
        }
    }

    fn next(&mut self, codec: &mut BitReader<'_>, dm: &crate::codec::HuffmanModel, p: u32) -> Result<u8> {
        self.s_group = if p & 1 != 0 {
            self.s_group >> 3
        } else {
            let idx = (p >> 1) as usize;
            self.s_linear[idx] ^= codec.decode(dm)? as u8;
            self.s_linear[idx] as u32
        };
        let s = (self.s_group & 7) as u8;
        // Low group values are stored inverted.
        Ok(if s <= 3 { 3 - s } else { s })
    }
}

fn scatter3(bytes: &mut [u8], d: u32, s: u8) {
    let byte_offset = (d >> 3) as usize;
    let bit_offset = d & 7;
    bytes[byte_offset] |= (((s as u32) << (8 - bit_offset)) & 0xFF) as u8;
    if bit_offset < 3 {
        bytes[byte_offset - 1] |= s >> bit_offset;
    }
}

/// Decode the ETC2A alpha selector palette: six 16-bit words per entry, the
/// non-flipped block followed by the flipped block
pub fn decode_alpha_selectors_etc(stream: &[u8], num: u32) -> Result<Vec<u16>> {
    let mut codec = BitReader::new(stream)?;
    let dm = codec.read_huffman_model()?;

    // One spare byte absorbs the final pixel's empty carry write.
    let mut bytes = vec![0u8; num as usize * 12 + 1];
    let mut groups = EtcAlphaGroups::new();

    for entry in 0..num as usize {
        let base = entry * 12;
        for p in 0..16u32 {
            let s = groups.next(&mut codec, &dm, p)?;

            // Non-flipped orientation.
            let mut d = 3 * (p + 1);
            scatter3(&mut bytes[base..], d, s);

            // Flipped orientation, transposed pixel order.
            d = (d as i32 + 9 * ((p & 3) as i32 - (p >> 2) as i32)) as u32;
            scatter3(&mut bytes[base + 6..], d, s);
        }
    }

    bytes.truncate(num as usize * 12);
    Ok(bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect())
}

/// Decode the ETC2AS alpha selector palette: three 16-bit words per entry
/// (single orientation)
pub fn decode_alpha_selectors_etcs(stream: &[u8], num: u32) -> Result<Vec<u16>> {
    let mut codec = BitReader::new(stream)?;
    let dm = codec.read_huffman_model()?;

    let mut bytes = vec![0u8; num as usize * 6 + 1];
    let mut groups = EtcAlphaGroups::new();

    for entry in 0..num as usize {
        let base = entry * 6;
        for p in 0..16u32 {
            let s = groups.next(&mut codec, &dm, p)?;
            let d = (3 * (p + 1) as i32 + 9 * ((p & 3) as i32 - (p >> 2) as i32)) as u32;
            scatter3(&mut bytes[base..], d, s);
        }
    }

    bytes.truncate(num as usize * 6);
    Ok(bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect())
}
