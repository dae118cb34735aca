//! Texture asset metadata and the pixel payload decoder.

use half::f16;

use crate::context::{DecodeContext, TextureLayout};
use crate::cursor::{Reader, Writer};
use crate::data::blocks;
use crate::error::{Error, Result};
use crate::guid::Guid;

/// Segment type GUID of a texture pixel payload.
pub const PIXEL_SEGMENT: Guid = Guid::from_u128(0x7c3b_1de0_54a1_4f62_9b0e_02a7_66d1_c844);

/// Pixel storage formats a texture asset can declare.
///
/// Unrecognized codes are preserved so packages carrying formats this tool
/// does not know still round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    /// 8-bit single channel (grayscale / alpha)
    L8,
    Rgb8,
    Bgr8,
    Rgba8,
    Bgra8,
    /// 16-bit single channel, unsigned normalized
    R16,
    /// 16-bit single channel float
    R16F,
    /// 32-bit single channel float
    R32F,
    Rgba16F,
    Rgba32F,
    /// DXT1: 4x4 color blocks, 4 bits per pixel
    Bc1,
    /// DXT3: explicit alpha + color blocks
    Bc2,
    /// DXT5: interpolated alpha + color blocks
    Bc3,
    /// Single interpolated channel
    Bc4,
    /// Dual interpolated channels
    Bc5,
    Unknown(u32),
}

impl TextureFormat {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => TextureFormat::L8,
            2 => TextureFormat::Rgb8,
            3 => TextureFormat::Bgr8,
            4 => TextureFormat::Rgba8,
            5 => TextureFormat::Bgra8,
            6 => TextureFormat::R16,
            7 => TextureFormat::R16F,
            8 => TextureFormat::R32F,
            9 => TextureFormat::Rgba16F,
            10 => TextureFormat::Rgba32F,
            11 => TextureFormat::Bc1,
            12 => TextureFormat::Bc2,
            13 => TextureFormat::Bc3,
            14 => TextureFormat::Bc4,
            15 => TextureFormat::Bc5,
            other => TextureFormat::Unknown(other),
        }
    }

    pub fn to_raw(self) -> u32 {
        match self {
            TextureFormat::L8 => 1,
            TextureFormat::Rgb8 => 2,
            TextureFormat::Bgr8 => 3,
            TextureFormat::Rgba8 => 4,
            TextureFormat::Bgra8 => 5,
            TextureFormat::R16 => 6,
            TextureFormat::R16F => 7,
            TextureFormat::R32F => 8,
            TextureFormat::Rgba16F => 9,
            TextureFormat::Rgba32F => 10,
            TextureFormat::Bc1 => 11,
            TextureFormat::Bc2 => 12,
            TextureFormat::Bc3 => 13,
            TextureFormat::Bc4 => 14,
            TextureFormat::Bc5 => 15,
            TextureFormat::Unknown(raw) => raw,
        }
    }

    /// Storage density. `None` for formats this tool cannot size.
    pub fn bits_per_pixel(self) -> Option<u64> {
        Some(match self {
            TextureFormat::L8 => 8,
            TextureFormat::Rgb8 | TextureFormat::Bgr8 => 24,
            TextureFormat::Rgba8 | TextureFormat::Bgra8 => 32,
            TextureFormat::R16 | TextureFormat::R16F => 16,
            TextureFormat::R32F => 32,
            TextureFormat::Rgba16F => 64,
            TextureFormat::Rgba32F => 128,
            TextureFormat::Bc1 | TextureFormat::Bc4 => 4,
            TextureFormat::Bc2 | TextureFormat::Bc3 | TextureFormat::Bc5 => 8,
            TextureFormat::Unknown(_) => return None,
        })
    }

    /// Dimension granularity: block-compressed formats pad to 4x4 blocks.
    pub fn block_dimension(self) -> u32 {
        match self {
            TextureFormat::Bc1
            | TextureFormat::Bc2
            | TextureFormat::Bc3
            | TextureFormat::Bc4
            | TextureFormat::Bc5 => 4,
            _ => 1,
        }
    }

    pub fn is_block_compressed(self) -> bool {
        self.block_dimension() != 1
    }
}

/// Width/height of one mip level: floor-halved per level, clamped to 1.
pub fn mip_dimensions(width: u32, height: u32, level: u32) -> (u32, u32) {
    ((width >> level).max(1), (height >> level).max(1))
}

fn align_up(v: u32, alignment: u32) -> u32 {
    v.div_ceil(alignment) * alignment
}

/// Byte size of one mip level of one array slice.
///
/// Pixel counts are multiplied together before the bit-to-byte division so
/// tiny block-compressed mips don't truncate; when the pixel count is not
/// divisible by 8 the division order switches to a rounded-up bit total.
pub fn mip_byte_size(layout: &TextureLayout, level: u32) -> Result<u64> {
    let bpp = layout
        .format
        .bits_per_pixel()
        .ok_or_else(|| Error::Unsupported(format!("texture format {:?}", layout.format)))?;
    let block = layout.format.block_dimension();
    let (w, h) = mip_dimensions(layout.width, layout.height, level);
    let aligned_w = align_up(w, block) as u64;
    let aligned_h = align_up(h, block) as u64;

    let pixels = aligned_w * aligned_h;
    Ok(if pixels % 8 == 0 {
        pixels / 8 * bpp
    } else {
        (pixels * bpp).div_ceil(8)
    })
}

/// Metadata of a texture asset. The pixel bytes live in a separate segment
/// whose layout is entirely described here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureMeta {
    pub width: u32,
    pub height: u32,
    pub array_count: u32,
    pub mip_count: u32,
    pub format: TextureFormat,
    pub flags: u32,
    /// Index of the pixel segment within the owning asset's segment list.
    pub pixel_segment: Option<usize>,
}

impl Default for TextureMeta {
    fn default() -> Self {
        TextureMeta {
            width: 0,
            height: 0,
            array_count: 1,
            mip_count: 1,
            format: TextureFormat::Rgba8,
            flags: 0,
            pixel_segment: None,
        }
    }
}

impl TextureMeta {
    pub fn read(&mut self, r: &mut Reader<'_>) -> Result<()> {
        self.width = r.u32()?;
        self.height = r.u32()?;
        self.array_count = r.u32()?;
        self.mip_count = r.u32()?;
        self.format = TextureFormat::from_raw(r.u32()?);
        self.flags = r.u32()?;
        Ok(())
    }

    pub fn write(&self, w: &mut Writer) {
        w.u32(self.width);
        w.u32(self.height);
        w.u32(self.array_count);
        w.u32(self.mip_count);
        w.u32(self.format.to_raw());
        w.u32(self.flags);
    }

    pub fn layout(&self) -> TextureLayout {
        TextureLayout {
            width: self.width,
            height: self.height,
            format: self.format,
            mip_count: self.mip_count,
            array_count: self.array_count,
        }
    }
}

/// One decoded mip level: dimensions plus its raw pixel bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MipLevel {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// The pixel payload of a texture: array slices outer, mip levels inner.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TexturePixelData {
    pub slices: Vec<Vec<MipLevel>>,
}

impl TexturePixelData {
    pub fn decode(r: &mut Reader<'_>, ctx: &DecodeContext) -> Result<Self> {
        let layout = ctx
            .texture
            .ok_or_else(|| Error::Corrupt("pixel segment without texture metadata".into()))?;

        let mut slices = Vec::with_capacity(layout.array_count as usize);
        for _ in 0..layout.array_count {
            let mut mips = Vec::with_capacity(layout.mip_count as usize);
            for level in 0..layout.mip_count {
                let size = mip_byte_size(&layout, level)? as usize;
                let (w, h) = mip_dimensions(layout.width, layout.height, level);
                mips.push(MipLevel {
                    width: w,
                    height: h,
                    data: r.bytes(size)?.to_vec(),
                });
            }
            slices.push(mips);
        }
        Ok(TexturePixelData { slices })
    }

    pub fn encode(&self, w: &mut Writer) {
        for mips in &self.slices {
            for level in mips {
                w.bytes(&level.data);
            }
        }
    }

    /// Decode one mip level of one slice to a tightly packed RGBA8 raster
    /// for preview and export.
    ///
    /// Formats outside the decodable set report [`Error::Unsupported`];
    /// the package and its other assets remain usable.
    pub fn to_rgba8(&self, format: TextureFormat, slice: usize, level: usize) -> Result<Rgba8Image> {
        let mip = self
            .slices
            .get(slice)
            .and_then(|mips| mips.get(level))
            .ok_or_else(|| Error::Corrupt(format!("no mip {level} in slice {slice}")))?;

        if format.is_block_compressed() {
            return decode_blocks(format, mip);
        }
        decode_plain(format, mip)
    }
}

/// A tightly packed RGBA8 raster produced for preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rgba8Image {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

fn decode_plain(format: TextureFormat, mip: &MipLevel) -> Result<Rgba8Image> {
    let count = mip.width as usize * mip.height as usize;
    let bpp = format
        .bits_per_pixel()
        .ok_or_else(|| Error::Unsupported(format!("preview of {format:?}")))?
        as usize;
    let needed = count * bpp / 8;
    if mip.data.len() < needed {
        return Err(Error::Corrupt(format!(
            "mip holds {} bytes, {format:?} at {}x{} needs {needed}",
            mip.data.len(),
            mip.width,
            mip.height
        )));
    }

    let mut pixels = Vec::with_capacity(count * 4);
    let data = &mip.data;

    let f32_to_u8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;

    match format {
        TextureFormat::L8 => {
            for &v in data.iter().take(count) {
                pixels.extend_from_slice(&[v, v, v, 255]);
            }
        }
        TextureFormat::Rgb8 => {
            for px in data.chunks_exact(3).take(count) {
                pixels.extend_from_slice(&[px[0], px[1], px[2], 255]);
            }
        }
        TextureFormat::Bgr8 => {
            for px in data.chunks_exact(3).take(count) {
                pixels.extend_from_slice(&[px[2], px[1], px[0], 255]);
            }
        }
        TextureFormat::Rgba8 => {
            pixels.extend_from_slice(&data[..count * 4]);
        }
        TextureFormat::Bgra8 => {
            for px in data.chunks_exact(4).take(count) {
                pixels.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
            }
        }
        TextureFormat::R16 => {
            for px in data.chunks_exact(2).take(count) {
                let v = (u16::from_le_bytes([px[0], px[1]]) >> 8) as u8;
                pixels.extend_from_slice(&[v, 0, 0, 255]);
            }
        }
        TextureFormat::R16F => {
            for px in data.chunks_exact(2).take(count) {
                let v = f32_to_u8(f16::from_le_bytes([px[0], px[1]]).to_f32());
                pixels.extend_from_slice(&[v, 0, 0, 255]);
            }
        }
        TextureFormat::R32F => {
            for px in data.chunks_exact(4).take(count) {
                let v = f32_to_u8(f32::from_le_bytes([px[0], px[1], px[2], px[3]]));
                pixels.extend_from_slice(&[v, 0, 0, 255]);
            }
        }
        TextureFormat::Rgba16F => {
            for px in data.chunks_exact(8).take(count) {
                for ch in 0..4 {
                    pixels.push(f32_to_u8(
                        f16::from_le_bytes([px[ch * 2], px[ch * 2 + 1]]).to_f32(),
                    ));
                }
            }
        }
        TextureFormat::Rgba32F => {
            for px in data.chunks_exact(16).take(count) {
                for ch in 0..4 {
                    pixels.push(f32_to_u8(f32::from_le_bytes(
                        px[ch * 4..ch * 4 + 4].try_into().unwrap(),
                    )));
                }
            }
        }
        other => return Err(Error::Unsupported(format!("preview of {other:?}"))),
    }

    Ok(Rgba8Image {
        width: mip.width,
        height: mip.height,
        pixels,
    })
}

fn decode_blocks(format: TextureFormat, mip: &MipLevel) -> Result<Rgba8Image> {
    let block_bytes = match format {
        TextureFormat::Bc1 | TextureFormat::Bc4 => 8,
        TextureFormat::Bc2 | TextureFormat::Bc3 | TextureFormat::Bc5 => 16,
        other => return Err(Error::Unsupported(format!("preview of {other:?}"))),
    };

    let blocks_x = mip.width.div_ceil(4) as usize;
    let blocks_y = mip.height.div_ceil(4) as usize;
    let needed = blocks_x * blocks_y * block_bytes;
    if mip.data.len() < needed {
        return Err(Error::Corrupt(format!(
            "mip holds {} bytes, {format:?} at {}x{} needs {needed}",
            mip.data.len(),
            mip.width,
            mip.height
        )));
    }
    let mut pixels = vec![0u8; mip.width as usize * mip.height as usize * 4];

    for by in 0..blocks_y {
        for bx in 0..blocks_x {
            let offset = (by * blocks_x + bx) * block_bytes;
            let block = &mip.data[offset..offset + block_bytes];
            let decoded = match format {
                TextureFormat::Bc1 => blocks::decode_bc1(block.try_into().unwrap()),
                TextureFormat::Bc2 => blocks::decode_bc2(block.try_into().unwrap()),
                TextureFormat::Bc3 => blocks::decode_bc3(block.try_into().unwrap()),
                TextureFormat::Bc4 => blocks::decode_bc4(block.try_into().unwrap()),
                TextureFormat::Bc5 => blocks::decode_bc5(block.try_into().unwrap()),
                _ => unreachable!(),
            };

            for py in 0..4usize {
                for px in 0..4usize {
                    let x = bx * 4 + px;
                    let y = by * 4 + py;
                    if x >= mip.width as usize || y >= mip.height as usize {
                        continue;
                    }
                    let dst = (y * mip.width as usize + x) * 4;
                    pixels[dst..dst + 4].copy_from_slice(&decoded[py * 4 + px]);
                }
            }
        }
    }

    Ok(Rgba8Image {
        width: mip.width,
        height: mip.height,
        pixels,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::context::TextureLayout;
    use pretty_assertions::assert_eq;

    fn layout(width: u32, height: u32, format: TextureFormat, mips: u32) -> TextureLayout {
        TextureLayout {
            width,
            height,
            format,
            mip_count: mips,
            array_count: 1,
        }
    }

    #[test]
    fn mip_sizes_never_increase_and_sum_to_payload() {
        let l = layout(64, 32, TextureFormat::Bc1, 7);
        let sizes: Vec<u64> = (0..l.mip_count)
            .map(|level| mip_byte_size(&l, level).unwrap())
            .collect();

        for pair in sizes.windows(2) {
            assert!(pair[1] <= pair[0], "sizes must not increase: {sizes:?}");
        }

        // 64x32 BC1: 1024, 256, 64, 16, 8 (4x4 min block), 8, 8
        assert_eq!(sizes, vec![1024, 256, 64, 16, 8, 8, 8]);

        let total: u64 = sizes.iter().sum();
        let bytes = vec![0u8; total as usize];
        let mut r = Reader::new(&bytes);
        let ctx = DecodeContext {
            texture: Some(l),
            ..Default::default()
        };
        let pixels = TexturePixelData::decode(&mut r, &ctx).unwrap();
        r.expect_empty().unwrap();
        assert_eq!(pixels.slices[0].len(), 7);
    }

    #[test]
    fn tiny_mips_clamp_to_one_and_align_to_blocks() {
        let l = layout(1, 1, TextureFormat::Bc1, 1);
        // 1x1 aligns up to a 4x4 block: 16 pixels at 4bpp = 8 bytes.
        assert_eq!(mip_byte_size(&l, 0).unwrap(), 8);

        let plain = layout(3, 3, TextureFormat::Rgb8, 1);
        // 9 pixels at 24bpp, not divisible by 8: rounded-up bit total.
        assert_eq!(mip_byte_size(&plain, 0).unwrap(), 27);
    }

    #[test]
    fn unknown_format_cannot_be_sized() {
        let l = layout(4, 4, TextureFormat::Unknown(99), 1);
        assert!(matches!(
            mip_byte_size(&l, 0),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn grayscale_preview_maps_to_rgba() {
        let mip = MipLevel {
            width: 2,
            height: 1,
            data: vec![0x00, 0x80],
        };
        let pixels = TexturePixelData { slices: vec![vec![mip]] };
        let image = pixels.to_rgba8(TextureFormat::L8, 0, 0).unwrap();
        assert_eq!(image.pixels, vec![0, 0, 0, 255, 0x80, 0x80, 0x80, 255]);
    }

    #[test]
    fn bgra_preview_swizzles() {
        let mip = MipLevel {
            width: 1,
            height: 1,
            data: vec![1, 2, 3, 4],
        };
        let pixels = TexturePixelData { slices: vec![vec![mip]] };
        let image = pixels.to_rgba8(TextureFormat::Bgra8, 0, 0).unwrap();
        assert_eq!(image.pixels, vec![3, 2, 1, 4]);
    }

    #[test]
    fn format_codes_round_trip() {
        for raw in 1..=15u32 {
            assert_eq!(TextureFormat::from_raw(raw).to_raw(), raw);
        }
        assert_eq!(TextureFormat::from_raw(123), TextureFormat::Unknown(123));
        assert_eq!(TextureFormat::Unknown(123).to_raw(), 123);
    }

    #[test]
    fn short_plain_mip_is_corrupt_not_a_panic() {
        let mip = MipLevel {
            width: 4,
            height: 4,
            data: vec![0u8; 8], // RGBA8 needs 64
        };
        let pixels = TexturePixelData { slices: vec![vec![mip]] };
        assert!(matches!(
            pixels.to_rgba8(TextureFormat::Rgba8, 0, 0),
            Err(Error::Corrupt(_))
        ));
    }

    #[test]
    fn short_block_mip_is_corrupt_not_a_panic() {
        let mip = MipLevel {
            width: 8,
            height: 8,
            data: vec![0u8; 8], // BC1 needs 4 blocks of 8 bytes
        };
        let pixels = TexturePixelData { slices: vec![vec![mip]] };
        assert!(matches!(
            pixels.to_rgba8(TextureFormat::Bc1, 0, 0),
            Err(Error::Corrupt(_))
        ));
    }

    #[test]
    fn truncated_pixel_payload_fails_decode() {
        let l = layout(4, 4, TextureFormat::L8, 1);
        let bytes = vec![0u8; 15]; // one byte short
        let mut r = Reader::new(&bytes);
        let ctx = DecodeContext {
            texture: Some(l),
            ..Default::default()
        };
        assert!(TexturePixelData::decode(&mut r, &ctx).is_err());
    }
}
