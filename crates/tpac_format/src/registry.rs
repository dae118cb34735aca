//! Init-time table mapping type GUIDs to asset and segment constructors.

use indexmap::IndexMap;

use crate::asset::{kind, AnimationMeta, AssetMeta, SkeletonMeta};
use crate::context::DecodeContext;
use crate::cursor::Reader;
use crate::data::animation::{
    AnimationClipData, BakedAnimationData, ANIMATION_CLIP_SEGMENT, BAKED_ANIMATION_SEGMENT,
};
use crate::data::material::MaterialMeta;
use crate::data::mesh::{
    MeshCollectionMeta, MeshEditData, VertexStreamData, MESH_EDIT_SEGMENT, VERTEX_STREAM_SEGMENT,
};
use crate::data::misc::OpaqueMeta;
use crate::data::skeleton::{
    SkeletonData, SkeletonUserData, SKELETON_SEGMENT, SKELETON_USER_SEGMENT,
};
use crate::data::texture::{TextureMeta, TexturePixelData, PIXEL_SEGMENT};
use crate::data::Payload;
use crate::error::Result;
use crate::guid::Guid;

type AssetCtor = fn() -> AssetMeta;
type SegmentDecoder = fn(&mut Reader<'_>, &DecodeContext) -> Result<Payload>;

/// Maps type GUIDs to typed constructors.
///
/// Unknown GUIDs are never a hard failure: assets fall back to an opaque
/// holder and segments to a byte pass-through, so packages written by newer
/// tools round trip without loss.
pub struct CodecRegistry {
    assets: IndexMap<Guid, AssetCtor>,
    segments: IndexMap<Guid, SegmentDecoder>,
}

impl CodecRegistry {
    pub fn empty() -> Self {
        CodecRegistry {
            assets: IndexMap::new(),
            segments: IndexMap::new(),
        }
    }

    /// The registry with every kind this crate understands.
    pub fn standard() -> Self {
        let mut registry = CodecRegistry::empty();

        registry.register_asset(kind::MESH_COLLECTION, || {
            AssetMeta::MeshCollection(MeshCollectionMeta::default())
        });
        registry.register_asset(kind::MATERIAL, || {
            AssetMeta::Material(MaterialMeta::default())
        });
        registry.register_asset(kind::TEXTURE, || AssetMeta::Texture(TextureMeta::default()));
        registry.register_asset(kind::SKELETON, || {
            AssetMeta::Skeleton(SkeletonMeta::default())
        });
        registry.register_asset(kind::SKELETAL_ANIMATION, || {
            AssetMeta::SkeletalAnimation(AnimationMeta::default())
        });
        registry.register_asset(kind::MORPH_ANIMATION, || {
            AssetMeta::MorphAnimation(AnimationMeta::default())
        });
        registry.register_asset(kind::PARTICLE_EFFECT, || {
            AssetMeta::ParticleEffect(OpaqueMeta::default())
        });
        registry.register_asset(kind::PHYSICS_SHAPE, || {
            AssetMeta::PhysicsShape(OpaqueMeta::default())
        });
        registry.register_asset(kind::SHADER, || AssetMeta::Shader(OpaqueMeta::default()));
        registry.register_asset(kind::VECTOR_FIELD, || {
            AssetMeta::VectorField(OpaqueMeta::default())
        });

        registry.register_segment(VERTEX_STREAM_SEGMENT, |r, ctx| {
            Ok(Payload::VertexStream(VertexStreamData::decode(r, ctx)?))
        });
        registry.register_segment(MESH_EDIT_SEGMENT, |r, _| {
            Ok(Payload::MeshEdit(MeshEditData::decode(r)?))
        });
        registry.register_segment(PIXEL_SEGMENT, |r, ctx| {
            Ok(Payload::TexturePixels(TexturePixelData::decode(r, ctx)?))
        });
        registry.register_segment(SKELETON_SEGMENT, |r, _| {
            Ok(Payload::Skeleton(SkeletonData::decode(r)?))
        });
        registry.register_segment(SKELETON_USER_SEGMENT, |r, _| {
            Ok(Payload::SkeletonUser(SkeletonUserData::decode(r)?))
        });
        registry.register_segment(ANIMATION_CLIP_SEGMENT, |r, _| {
            Ok(Payload::AnimationClip(AnimationClipData::decode(r)?))
        });
        registry.register_segment(BAKED_ANIMATION_SEGMENT, |r, _| {
            Ok(Payload::BakedAnimation(BakedAnimationData::decode(r)?))
        });

        registry
    }

    pub fn register_asset(&mut self, type_guid: Guid, ctor: AssetCtor) {
        self.assets.insert(type_guid, ctor);
    }

    pub fn register_segment(&mut self, type_guid: Guid, decoder: SegmentDecoder) {
        self.segments.insert(type_guid, decoder);
    }

    /// Construct the metadata holder for an asset type. The `bool` reports
    /// whether the type was recognized.
    pub fn create_asset(&self, type_guid: Guid) -> (AssetMeta, bool) {
        match self.assets.get(&type_guid) {
            Some(ctor) => (ctor(), true),
            None => (AssetMeta::Unknown(OpaqueMeta::default()), false),
        }
    }

    /// Decode one segment payload, falling back to a byte pass-through for
    /// unrecognized types.
    pub fn decode_segment(
        &self,
        type_guid: Guid,
        r: &mut Reader<'_>,
        ctx: &DecodeContext,
    ) -> Result<Payload> {
        match self.segments.get(&type_guid) {
            Some(decoder) => decoder(r, ctx),
            None => Ok(Payload::Opaque(r.rest().to_vec())),
        }
    }

    /// The asset type GUIDs this registry understands, in registration
    /// order, with their display names.
    pub fn known_asset_types(&self) -> impl Iterator<Item = (Guid, &'static str)> + '_ {
        self.assets
            .iter()
            .map(|(guid, ctor)| (*guid, ctor().kind_name()))
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        CodecRegistry::standard()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn unknown_asset_type_falls_back_to_opaque() {
        let registry = CodecRegistry::standard();
        let (meta, found) = registry.create_asset(Guid::from_u128(0xDEAD));
        assert!(!found);
        assert!(matches!(meta, AssetMeta::Unknown(_)));

        let (meta, found) = registry.create_asset(kind::TEXTURE);
        assert!(found);
        assert!(matches!(meta, AssetMeta::Texture(_)));
    }

    #[test]
    fn unknown_segment_type_passes_bytes_through() {
        let registry = CodecRegistry::standard();
        let bytes = [1u8, 2, 3, 4];
        let mut r = Reader::new(&bytes);
        let payload = registry
            .decode_segment(Guid::from_u128(0xBEEF), &mut r, &DecodeContext::default())
            .unwrap();
        assert_eq!(payload, Payload::Opaque(vec![1, 2, 3, 4]));
        assert!(r.is_empty());
    }

    #[test]
    fn standard_registry_knows_all_asset_kinds() {
        let registry = CodecRegistry::standard();
        let names: Vec<_> = registry.known_asset_types().map(|(_, n)| n).collect();
        assert_eq!(names.len(), 10);
        assert!(names.contains(&"mesh collection"));
        assert!(names.contains(&"vector field"));
    }
}
