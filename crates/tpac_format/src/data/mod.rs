//! Typed segment payloads and their binary decoders.

pub mod animation;
pub mod blocks;
pub mod material;
pub mod mesh;
pub mod misc;
pub mod packed;
pub mod skeleton;
pub mod texture;

use crate::context::DecodeContext;
use crate::cursor::Writer;
use crate::error::Result;

use animation::{AnimationClipData, BakedAnimationData};
use mesh::{MeshEditData, VertexStreamData};
use skeleton::{SkeletonData, SkeletonUserData};
use texture::TexturePixelData;

/// The materialized decoded structure of one segment.
///
/// Segments whose type GUID the registry does not know decode to
/// [`Payload::Opaque`] and write back byte-exact.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    VertexStream(VertexStreamData),
    MeshEdit(MeshEditData),
    TexturePixels(TexturePixelData),
    Skeleton(SkeletonData),
    SkeletonUser(SkeletonUserData),
    AnimationClip(AnimationClipData),
    BakedAnimation(BakedAnimationData),
    Opaque(Vec<u8>),
}

impl Payload {
    /// Serialize back to the uncompressed segment byte form.
    pub fn encode(&self, ctx: &DecodeContext) -> Result<Vec<u8>> {
        let mut w = Writer::new();
        match self {
            Payload::VertexStream(data) => data.encode(&mut w, ctx)?,
            Payload::MeshEdit(data) => data.encode(&mut w),
            Payload::TexturePixels(data) => data.encode(&mut w),
            Payload::Skeleton(data) => data.encode(&mut w),
            Payload::SkeletonUser(data) => data.encode(&mut w),
            Payload::AnimationClip(data) => data.encode(&mut w),
            Payload::BakedAnimation(data) => data.encode(&mut w),
            Payload::Opaque(bytes) => w.bytes(bytes),
        }
        Ok(w.into_bytes())
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Payload::VertexStream(_) => "vertex stream",
            Payload::MeshEdit(_) => "mesh edit data",
            Payload::TexturePixels(_) => "texture pixels",
            Payload::Skeleton(_) => "skeleton",
            Payload::SkeletonUser(_) => "skeleton extras",
            Payload::AnimationClip(_) => "animation clip",
            Payload::BakedAnimation(_) => "baked animation",
            Payload::Opaque(_) => "opaque",
        }
    }
}
