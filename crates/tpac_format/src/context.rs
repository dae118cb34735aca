//! Cross-cutting decode flags threaded from an asset to its segment decoders.

use crate::data::texture::TextureFormat;

/// Dimensions and format of a texture, needed to decode its pixel segment.
///
/// The pixel segment is pure pixel bytes; everything about its layout lives
/// in the owning texture asset's metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureLayout {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub mip_count: u32,
    pub array_count: u32,
}

/// Flags an asset's metadata establishes before its segments decode.
///
/// Certain segment fields cannot be decoded without knowing decisions made
/// at the owning-asset level: the index element width, whether the vertex
/// stream carries the extended tangent-transform sub-array, and the pixel
/// layout of a texture. Decoders receive this struct by reference instead
/// of an untyped side-channel map.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeContext {
    /// Index buffers use 32-bit elements instead of 16-bit.
    pub wide_indices: bool,

    /// Vertex streams carry the trailing Q-tangent sub-array, making the
    /// sub-header 14 entries instead of 13.
    pub extended_tangents: bool,

    /// Pixel layout for texture pixel segments.
    pub texture: Option<TextureLayout>,
}
