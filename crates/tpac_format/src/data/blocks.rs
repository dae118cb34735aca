//! 4x4-pixel block decoding for the DXT/BC family of texture formats.
//!
//! The palette-derivation branches keyed on which base color or alpha
//! endpoint compares numerically larger are part of the format: they select
//! "4-color opaque" vs "3-color + transparent" mode (color blocks) and the
//! 7-step vs 5-step gradient (alpha blocks). Reproducing them exactly is
//! required or decoded images show banding and color shifts.

/// One decoded pixel, RGBA byte order.
pub type Rgba = [u8; 4];

/// Expand a 5-6-5 packed color to 8-bit channels by bit replication.
fn expand_565(c: u16) -> [u8; 3] {
    let r = ((c >> 11) & 0x1F) as u8;
    let g = ((c >> 5) & 0x3F) as u8;
    let b = (c & 0x1F) as u8;
    [(r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2)]
}

/// Decode the 8-byte color half of a BC1/BC2/BC3 block into 16 pixels.
///
/// `opaque_only` forces 4-color mode regardless of endpoint order; BC2 and
/// BC3 blocks carry their alpha separately and never use punch-through
/// transparency.
fn decode_color_block(block: &[u8], opaque_only: bool) -> [Rgba; 16] {
    let c0 = u16::from_le_bytes([block[0], block[1]]);
    let c1 = u16::from_le_bytes([block[2], block[3]]);
    let p0 = expand_565(c0);
    let p1 = expand_565(c1);

    let mut palette = [[0u8; 4]; 4];
    palette[0] = [p0[0], p0[1], p0[2], 255];
    palette[1] = [p1[0], p1[1], p1[2], 255];

    if c0 > c1 || opaque_only {
        // 4-color mode: two weighted 2:1 blends.
        for ch in 0..3 {
            palette[2][ch] = ((2 * p0[ch] as u16 + p1[ch] as u16) / 3) as u8;
            palette[3][ch] = ((p0[ch] as u16 + 2 * p1[ch] as u16) / 3) as u8;
        }
        palette[2][3] = 255;
        palette[3][3] = 255;
    } else {
        // 3-color mode: straight average plus transparent black.
        for ch in 0..3 {
            palette[2][ch] = ((p0[ch] as u16 + p1[ch] as u16) / 2) as u8;
        }
        palette[2][3] = 255;
        palette[3] = [0, 0, 0, 0];
    }

    let indices = u32::from_le_bytes([block[4], block[5], block[6], block[7]]);
    let mut out = [[0u8; 4]; 16];
    for (i, px) in out.iter_mut().enumerate() {
        *px = palette[((indices >> (2 * i)) & 0x3) as usize];
    }
    out
}

/// Decode the 8-byte interpolated alpha half of a BC3/BC4/BC5 block into 16
/// channel values.
fn decode_alpha_block(block: &[u8]) -> [u8; 16] {
    let a0 = block[0];
    let a1 = block[1];

    let mut gradient = [0u8; 8];
    gradient[0] = a0;
    gradient[1] = a1;
    if a0 > a1 {
        // 7-step linear blend between the endpoints.
        for i in 2..8u16 {
            gradient[i as usize] =
                (((8 - i) * a0 as u16 + (i - 1) * a1 as u16) / 7) as u8;
        }
    } else {
        // 5-step blend; the last two entries are hard-coded.
        for i in 2..6u16 {
            gradient[i as usize] =
                (((6 - i) * a0 as u16 + (i - 1) * a1 as u16) / 5) as u8;
        }
        gradient[6] = 0;
        gradient[7] = 255;
    }

    let mut bits = 0u64;
    for (i, b) in block[2..8].iter().enumerate() {
        bits |= (*b as u64) << (8 * i);
    }

    let mut out = [0u8; 16];
    for (i, v) in out.iter_mut().enumerate() {
        *v = gradient[((bits >> (3 * i)) & 0x7) as usize];
    }
    out
}

/// Decode one 8-byte BC1 (DXT1) block.
pub fn decode_bc1(block: &[u8; 8]) -> [Rgba; 16] {
    decode_color_block(block, false)
}

/// Decode one 16-byte BC2 (DXT3) block: explicit 4-bit alpha + color block.
pub fn decode_bc2(block: &[u8; 16]) -> [Rgba; 16] {
    let mut out = decode_color_block(&block[8..16], true);
    for (i, px) in out.iter_mut().enumerate() {
        let byte = block[i / 2];
        let nibble = if i % 2 == 0 { byte & 0x0F } else { byte >> 4 };
        px[3] = (nibble << 4) | nibble;
    }
    out
}

/// Decode one 16-byte BC3 (DXT5) block: interpolated alpha + color block.
pub fn decode_bc3(block: &[u8; 16]) -> [Rgba; 16] {
    let alpha = decode_alpha_block(&block[0..8]);
    let mut out = decode_color_block(&block[8..16], true);
    for (i, px) in out.iter_mut().enumerate() {
        px[3] = alpha[i];
    }
    out
}

/// Decode one 8-byte BC4 block: a single interpolated channel into red.
pub fn decode_bc4(block: &[u8; 8]) -> [Rgba; 16] {
    let r = decode_alpha_block(block);
    let mut out = [[0u8; 4]; 16];
    for (i, px) in out.iter_mut().enumerate() {
        *px = [r[i], 0, 0, 255];
    }
    out
}

/// Decode one 16-byte BC5 block: two interpolated channels into red/green.
pub fn decode_bc5(block: &[u8; 16]) -> [Rgba; 16] {
    let r = decode_alpha_block(&block[0..8]);
    let g = decode_alpha_block(&block[8..16]);
    let mut out = [[0u8; 4]; 16];
    for (i, px) in out.iter_mut().enumerate() {
        *px = [r[i], g[i], 0, 255];
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn color_mode_tie_break_selects_different_palettes() {
        // c0 > c1: 4-color weighted mode.
        let four_color: [u8; 8] = [0xFF, 0xFF, 0x00, 0x00, 0b1110_0100, 0, 0, 0];
        // c0 < c1: 3-color + transparent mode, same indices.
        let three_color: [u8; 8] = [0x00, 0x00, 0xFF, 0xFF, 0b1110_0100, 0, 0, 0];

        let a = decode_bc1(&four_color);
        let b = decode_bc1(&three_color);

        // Pixel 2 uses palette entry 2: 2:1 blend vs straight average.
        assert_eq!(a[2], [170, 170, 170, 255]);
        assert_eq!(b[2], [127, 127, 127, 255]);

        // Pixel 3 uses palette entry 3: 1:2 blend vs transparent black.
        assert_eq!(a[3], [85, 85, 85, 255]);
        assert_eq!(b[3], [0, 0, 0, 0]);
    }

    #[test]
    fn alpha_mode_tie_break_changes_gradient_tail() {
        // a0 > a1: 7-step blend, no pinned entries.
        let seven: [u8; 8] = [255, 0, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
        // a0 < a1: 5-step blend with entries 6 and 7 pinned.
        let five: [u8; 8] = [0, 255, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];

        // All index bits set: every pixel selects gradient entry 7.
        let a = decode_bc4(&seven);
        let b = decode_bc4(&five);
        assert_eq!(a[0][0], ((1 * 255u16 + 6 * 0) / 7) as u8);
        assert_eq!(b[0][0], 255); // pinned maximum

        // Entry 6 via index 0b110 in the low slot.
        let mut six_seven = seven;
        six_seven[2] = 0b110;
        let mut six_five = five;
        six_five[2] = 0b110;
        assert_eq!(decode_bc4(&six_seven)[0][0], ((2 * 255u16 + 5 * 0) / 7) as u8);
        assert_eq!(decode_bc4(&six_five)[0][0], 0); // pinned zero
    }

    #[test]
    fn bc2_alpha_is_explicit_nibbles() {
        let mut block = [0u8; 16];
        block[0] = 0xF0; // pixel 0 alpha nibble 0x0, pixel 1 alpha nibble 0xF
        block[8] = 0xFF;
        block[9] = 0xFF; // c0 = white
        let out = decode_bc2(&block);
        assert_eq!(out[0][3], 0x00);
        assert_eq!(out[1][3], 0xFF);
    }

    #[test]
    fn bc5_routes_channels_to_red_and_green() {
        let mut block = [0u8; 16];
        block[0] = 200; // red endpoints
        block[1] = 100;
        block[8] = 40; // green endpoints
        block[9] = 30;
        let out = decode_bc5(&block);
        // Index bits are zero: every pixel selects endpoint 0.
        assert_eq!(out[0], [200, 40, 0, 255]);
    }

    #[test]
    fn index_bits_are_two_per_pixel_row_major() {
        // Opaque 4-color block with distinct palette entries.
        let block: [u8; 8] = [0xFF, 0xFF, 0x00, 0x00, 0b1110_0100, 0, 0, 0];
        let out = decode_bc1(&block);
        assert_eq!(out[0], [255, 255, 255, 255]);
        assert_eq!(out[1], [0, 0, 0, 255]);
        assert_eq!(out[4], [255, 255, 255, 255]);
    }
}
