//! Asset records: typed metadata plus owned segment handles.

use crate::context::DecodeContext;
use crate::cursor::{Reader, Writer};
use crate::data::material::MaterialMeta;
use crate::data::mesh::{self, MeshCollectionMeta};
use crate::data::misc::OpaqueMeta;
use crate::data::skeleton;
use crate::data::texture::{self, TextureMeta};
use crate::data::animation;
use crate::error::Result;
use crate::guid::Guid;
use crate::segment::Segment;
use crate::types::SegmentRecord;

/// Type GUIDs of the known asset kinds.
pub mod kind {
    use crate::guid::Guid;

    pub const MESH_COLLECTION: Guid = Guid::from_u128(0x3a1f_08c5_92b4_4d6e_a0c7_551e_8f2d_9b13);
    pub const MATERIAL: Guid = Guid::from_u128(0x8c40_27aa_f1e3_4b82_95d0_3c6b_e9a4_1f57);
    pub const TEXTURE: Guid = Guid::from_u128(0xb6e1_53d9_0a78_4f3c_8821_d4f2_07c9_6ae5);
    pub const SKELETON: Guid = Guid::from_u128(0x1d92_c4b0_6e37_45af_b3c8_20e9_5a71_d8f4);
    pub const SKELETAL_ANIMATION: Guid = Guid::from_u128(0xe753_9a18_42cd_4e06_9f5b_7180_c36a_24b9);
    pub const MORPH_ANIMATION: Guid = Guid::from_u128(0x40ac_75e2_d80b_49d3_a6f1_934c_e27d_508a);
    pub const PARTICLE_EFFECT: Guid = Guid::from_u128(0x97b8_10f4_35a6_4c71_bd20_68ce_f4a1_3e92);
    pub const PHYSICS_SHAPE: Guid = Guid::from_u128(0x52d6_e98b_1c40_4a85_90e3_ab57_216f_c0d8);
    pub const SHADER: Guid = Guid::from_u128(0xcf24_b061_87d5_4398_a51c_e0f6_394b_d27e);
    pub const VECTOR_FIELD: Guid = Guid::from_u128(0x6ba9_3f57_e2c8_4d10_8764_15d0_9ca3_f8b1);
}

/// Intended target of a skeleton, selecting retargeting behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SkeletonUsage {
    #[default]
    Generic,
    Human,
    Horse,
    Other(u32),
}

impl SkeletonUsage {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => SkeletonUsage::Generic,
            1 => SkeletonUsage::Human,
            2 => SkeletonUsage::Horse,
            other => SkeletonUsage::Other(other),
        }
    }

    pub fn to_raw(self) -> u32 {
        match self {
            SkeletonUsage::Generic => 0,
            SkeletonUsage::Human => 1,
            SkeletonUsage::Horse => 2,
            SkeletonUsage::Other(raw) => raw,
        }
    }

    /// Human and horse skeletons carry a baked scale in the homogeneous
    /// component that must be suppressed during retargeting.
    pub fn ignore_scale(self) -> bool {
        matches!(self, SkeletonUsage::Human | SkeletonUsage::Horse)
    }
}

/// Metadata of a skeleton asset. The bone tree itself lives in a segment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SkeletonMeta {
    pub usage: SkeletonUsage,
    pub definition_segment: Option<usize>,
    pub user_segment: Option<usize>,
}

impl SkeletonMeta {
    fn read(&mut self, r: &mut Reader<'_>) -> Result<()> {
        self.usage = SkeletonUsage::from_raw(r.u32()?);
        Ok(())
    }

    fn write(&self, w: &mut Writer) {
        w.u32(self.usage.to_raw());
    }
}

/// Metadata of a skeletal or morph animation asset: the GUID of the
/// skeleton it targets. The keyframe data lives in a segment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnimationMeta {
    pub skeleton: Guid,
    pub data_segment: Option<usize>,
}

impl AnimationMeta {
    fn read(&mut self, r: &mut Reader<'_>) -> Result<()> {
        self.skeleton = r.guid()?;
        Ok(())
    }

    fn write(&self, w: &mut Writer) {
        w.guid(&self.skeleton);
    }
}

/// The typed metadata of one asset, selected by its type GUID.
///
/// Kinds whose inner layout is out of scope carry their bytes verbatim;
/// entirely unknown type GUIDs land in [`AssetMeta::Unknown`] so future
/// format revisions round trip without loss.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetMeta {
    MeshCollection(MeshCollectionMeta),
    Material(MaterialMeta),
    Texture(TextureMeta),
    Skeleton(SkeletonMeta),
    SkeletalAnimation(AnimationMeta),
    MorphAnimation(AnimationMeta),
    ParticleEffect(OpaqueMeta),
    PhysicsShape(OpaqueMeta),
    Shader(OpaqueMeta),
    VectorField(OpaqueMeta),
    Unknown(OpaqueMeta),
}

impl AssetMeta {
    pub fn read(&mut self, r: &mut Reader<'_>) -> Result<()> {
        match self {
            AssetMeta::MeshCollection(meta) => meta.read(r),
            AssetMeta::Material(meta) => meta.read(r),
            AssetMeta::Texture(meta) => meta.read(r),
            AssetMeta::Skeleton(meta) => meta.read(r),
            AssetMeta::SkeletalAnimation(meta) | AssetMeta::MorphAnimation(meta) => meta.read(r),
            AssetMeta::ParticleEffect(meta)
            | AssetMeta::PhysicsShape(meta)
            | AssetMeta::Shader(meta)
            | AssetMeta::VectorField(meta)
            | AssetMeta::Unknown(meta) => meta.read(r),
        }
    }

    pub fn write(&self, w: &mut Writer) {
        match self {
            AssetMeta::MeshCollection(meta) => meta.write(w),
            AssetMeta::Material(meta) => meta.write(w),
            AssetMeta::Texture(meta) => meta.write(w),
            AssetMeta::Skeleton(meta) => meta.write(w),
            AssetMeta::SkeletalAnimation(meta) | AssetMeta::MorphAnimation(meta) => meta.write(w),
            AssetMeta::ParticleEffect(meta)
            | AssetMeta::PhysicsShape(meta)
            | AssetMeta::Shader(meta)
            | AssetMeta::VectorField(meta)
            | AssetMeta::Unknown(meta) => meta.write(w),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            AssetMeta::MeshCollection(_) => "mesh collection",
            AssetMeta::Material(_) => "material",
            AssetMeta::Texture(_) => "texture",
            AssetMeta::Skeleton(_) => "skeleton",
            AssetMeta::SkeletalAnimation(_) => "skeletal animation",
            AssetMeta::MorphAnimation(_) => "morph animation",
            AssetMeta::ParticleEffect(_) => "particle effect",
            AssetMeta::PhysicsShape(_) => "physics shape",
            AssetMeta::Shader(_) => "shader",
            AssetMeta::VectorField(_) => "vector field",
            AssetMeta::Unknown(_) => "unknown",
        }
    }

    /// Flags this asset's segment decoders need before they run.
    pub fn decode_context(&self) -> DecodeContext {
        match self {
            AssetMeta::MeshCollection(meta) => DecodeContext {
                wide_indices: meta.wide_indices,
                extended_tangents: meta.extended_tangents,
                texture: None,
            },
            AssetMeta::Texture(meta) => DecodeContext {
                texture: Some(meta.layout()),
                ..Default::default()
            },
            _ => DecodeContext::default(),
        }
    }

    /// Route incoming segments to this asset's slots by owner and type
    /// GUID. Must run only after metadata decode, because routing depends
    /// on metadata-derived sub-object GUIDs.
    pub fn consume_segments(&mut self, asset_guid: Guid, records: &[SegmentRecord]) {
        let find = |owner: Guid, type_guid: Guid| {
            records
                .iter()
                .position(|rec| rec.owner == owner && rec.type_guid == type_guid)
        };
        match self {
            AssetMeta::MeshCollection(meta) => {
                for sub in &mut meta.submeshes {
                    sub.vertex_stream = find(sub.guid, mesh::VERTEX_STREAM_SEGMENT);
                    sub.edit_data = find(sub.guid, mesh::MESH_EDIT_SEGMENT);
                }
            }
            AssetMeta::Texture(meta) => {
                meta.pixel_segment = find(asset_guid, texture::PIXEL_SEGMENT);
            }
            AssetMeta::Skeleton(meta) => {
                meta.definition_segment = find(asset_guid, skeleton::SKELETON_SEGMENT);
                meta.user_segment = find(asset_guid, skeleton::SKELETON_USER_SEGMENT);
            }
            AssetMeta::SkeletalAnimation(meta) | AssetMeta::MorphAnimation(meta) => {
                meta.data_segment = find(asset_guid, animation::ANIMATION_CLIP_SEGMENT)
                    .or_else(|| find(asset_guid, animation::BAKED_ANIMATION_SEGMENT));
            }
            _ => {}
        }
    }
}

/// A 3-GUID cross-reference record, preserved but not interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DependencyRef {
    pub guids: [Guid; 3],
}

/// One named, GUID-identified record of a package.
#[derive(Debug, Clone)]
pub struct Asset {
    pub type_guid: Guid,
    pub guid: Guid,
    pub name: String,
    /// Per-asset format version; absent from version-1 packages.
    pub version: u32,
    /// Unverified; preserved byte-for-byte on round trip.
    pub checksum: u64,
    pub meta: AssetMeta,
    pub segments: Vec<Segment>,
    pub dependencies: Vec<DependencyRef>,
}

impl Asset {
    pub fn new(type_guid: Guid, guid: Guid, name: impl Into<String>, meta: AssetMeta) -> Self {
        Asset {
            type_guid,
            guid,
            name: name.into(),
            version: 0,
            checksum: 0,
            meta,
            segments: Vec::new(),
            dependencies: Vec::new(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::compression::CompressionKind;
    use crate::data::mesh::SubMesh;
    use pretty_assertions::assert_eq;

    fn record(owner: Guid, type_guid: Guid) -> SegmentRecord {
        SegmentRecord {
            offset: 0,
            actual_size: 0,
            storage_size: 0,
            owner,
            type_guid,
            unknown_a: 0,
            unknown_b: 0,
            compression: CompressionKind::None,
        }
    }

    #[test]
    fn mesh_collection_routes_segments_per_submesh() {
        let a = Guid::from_u128(0xA);
        let b = Guid::from_u128(0xB);
        let mut meta = AssetMeta::MeshCollection(MeshCollectionMeta {
            wide_indices: false,
            extended_tangents: false,
            submeshes: vec![
                SubMesh {
                    guid: a,
                    ..Default::default()
                },
                SubMesh {
                    guid: b,
                    ..Default::default()
                },
            ],
        });

        let records = vec![
            record(b, mesh::VERTEX_STREAM_SEGMENT),
            record(a, mesh::VERTEX_STREAM_SEGMENT),
            record(a, mesh::MESH_EDIT_SEGMENT),
        ];
        meta.consume_segments(Guid::from_u128(0xFF), &records);

        let AssetMeta::MeshCollection(meta) = meta else {
            unreachable!()
        };
        assert_eq!(meta.submeshes[0].vertex_stream, Some(1));
        assert_eq!(meta.submeshes[0].edit_data, Some(2));
        assert_eq!(meta.submeshes[1].vertex_stream, Some(0));
        assert_eq!(meta.submeshes[1].edit_data, None);
    }

    #[test]
    fn texture_routes_pixel_segment_by_owner() {
        let guid = Guid::from_u128(0xC0FFEE);
        let mut meta = AssetMeta::Texture(TextureMeta::default());
        let records = vec![
            record(Guid::from_u128(0x1), texture::PIXEL_SEGMENT),
            record(guid, texture::PIXEL_SEGMENT),
        ];
        meta.consume_segments(guid, &records);

        let AssetMeta::Texture(meta) = meta else {
            unreachable!()
        };
        assert_eq!(meta.pixel_segment, Some(1));
    }

    #[test]
    fn skeleton_usage_selects_scale_suppression() {
        assert!(SkeletonUsage::Human.ignore_scale());
        assert!(SkeletonUsage::Horse.ignore_scale());
        assert!(!SkeletonUsage::Generic.ignore_scale());
        assert!(!SkeletonUsage::Other(9).ignore_scale());
        assert_eq!(SkeletonUsage::from_raw(9).to_raw(), 9);
    }
}
