//! Mesh collection metadata and the vertex stream / edit data payloads.

use glam::{Vec2, Vec3, Vec4};
use half::f16;

use crate::context::DecodeContext;
use crate::cursor::{Reader, Writer};
use crate::error::{Error, Result};
use crate::guid::Guid;

/// Segment type GUID of a GPU-ready vertex stream payload.
pub const VERTEX_STREAM_SEGMENT: Guid = Guid::from_u128(0x48c1_c2a3_7f05_4e19_8d2b_11fa_30b9_52e7);

/// Segment type GUID of an editable mesh payload.
pub const MESH_EDIT_SEGMENT: Guid = Guid::from_u128(0x65da_9e01_2cb8_4b77_a4c3_5410_88fe_63b1);

/// Index counts at or above this force 32-bit index storage on write.
pub const WIDE_INDEX_THRESHOLD: usize = 65_535;

/// Flag bits of a mesh collection's metadata.
mod flags {
    pub const WIDE_INDICES: u32 = 1 << 0;
    pub const EXTENDED_TANGENTS: u32 = 1 << 1;
}

/// One sub-mesh inside a mesh collection.
///
/// Segments are owned by the collection asset; each sub-mesh routes to its
/// own payloads by GUID during segment distribution.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubMesh {
    pub guid: Guid,
    pub name: String,
    pub material: Guid,
    pub vertex_count: u32,
    pub index_count: u32,
    pub lod: u32,
    /// Index of this sub-mesh's vertex stream segment in the owning
    /// asset's segment list.
    pub vertex_stream: Option<usize>,
    /// Index of this sub-mesh's edit data segment, if present.
    pub edit_data: Option<usize>,
}

/// Metadata of a mesh-collection asset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshCollectionMeta {
    pub wide_indices: bool,
    pub extended_tangents: bool,
    pub submeshes: Vec<SubMesh>,
}

impl MeshCollectionMeta {
    pub fn read(&mut self, r: &mut Reader<'_>) -> Result<()> {
        let raw_flags = r.u32()?;
        self.wide_indices = raw_flags & flags::WIDE_INDICES != 0;
        self.extended_tangents = raw_flags & flags::EXTENDED_TANGENTS != 0;

        let count = r.u32()? as usize;
        self.submeshes = (0..count)
            .map(|_| {
                Ok(SubMesh {
                    guid: r.guid()?,
                    name: r.string()?,
                    material: r.guid()?,
                    vertex_count: r.u32()?,
                    index_count: r.u32()?,
                    lod: r.u32()?,
                    vertex_stream: None,
                    edit_data: None,
                })
            })
            .collect::<Result<_>>()?;
        Ok(())
    }

    pub fn write(&self, w: &mut Writer) {
        let mut raw_flags = 0;
        if self.wide_indices {
            raw_flags |= flags::WIDE_INDICES;
        }
        if self.extended_tangents {
            raw_flags |= flags::EXTENDED_TANGENTS;
        }
        w.u32(raw_flags);

        w.u32(self.submeshes.len() as u32);
        for sub in &self.submeshes {
            w.guid(&sub.guid);
            w.string(&sub.name);
            w.guid(&sub.material);
            w.u32(sub.vertex_count);
            w.u32(sub.index_count);
            w.u32(sub.lod);
        }
    }
}

/// Strides of the vertex stream sub-arrays, in sub-header order.
const SUB_ARRAY_STRIDES: [u64; 14] = [
    4,  // color set 0
    4,  // color set 1
    8,  // uv set 0
    8,  // uv set 1
    12, // position set 0
    12, // position set 1
    12, // normals
    16, // tangents
    16, // bone weights
    4,  // bone indices
    4,  // packed normals
    8,  // packed positions
    4,  // packed tangents
    8,  // q-tangents (extended revision only)
];

/// A decoded GPU-ready vertex buffer.
///
/// The sub-arrays whose presence varies per mesh are independent vectors;
/// absent arrays are empty. Packed fields keep their raw codes so re-encoding
/// is bit-exact; use [`crate::data::packed`] to expand them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VertexStreamData {
    pub indices: Vec<u32>,
    pub colors: [Vec<u32>; 2],
    pub uvs: [Vec<Vec2>; 2],
    pub positions: [Vec<Vec3>; 2],
    pub normals: Vec<Vec3>,
    pub tangents: Vec<Vec4>,
    pub bone_weights: Vec<Vec4>,
    pub bone_indices: Vec<[u8; 4]>,
    pub packed_normals: Vec<u32>,
    pub packed_positions: Vec<[f16; 4]>,
    pub packed_tangents: Vec<u32>,
    pub qtangents: Vec<[i16; 4]>,
}

impl VertexStreamData {
    fn sub_array_count(ctx: &DecodeContext) -> usize {
        if ctx.extended_tangents {
            14
        } else {
            13
        }
    }

    pub fn decode(r: &mut Reader<'_>, ctx: &DecodeContext) -> Result<Self> {
        let mut data = VertexStreamData::default();

        let index_count = r.u32()? as usize;
        data.indices = Vec::with_capacity(index_count);
        for _ in 0..index_count {
            data.indices.push(if ctx.wide_indices {
                r.u32()?
            } else {
                r.u16()? as u32
            });
        }

        // The sub-header carries (offset, size) per sub-array. The count
        // depends on the extended-tangent revision; misjudging it would
        // misalign everything after the table.
        let count = Self::sub_array_count(ctx);
        let mut table = Vec::with_capacity(count);
        for _ in 0..count {
            table.push((r.u64()?, r.u64()?));
        }

        let blob_start = r.position();
        for (slot, &(offset, size)) in table.iter().enumerate() {
            let stride = SUB_ARRAY_STRIDES[slot];
            if size % stride != 0 {
                return Err(Error::Corrupt(format!(
                    "sub-array {slot} size {size} is not a multiple of stride {stride}"
                )));
            }
            r.seek(blob_start + offset as usize)?;
            let mark = r.mark();
            let elements = (size / stride) as usize;
            match slot {
                0 | 1 => {
                    let set = &mut data.colors[slot];
                    set.reserve(elements);
                    for _ in 0..elements {
                        set.push(r.u32()?);
                    }
                }
                2 | 3 => {
                    let set = &mut data.uvs[slot - 2];
                    set.reserve(elements);
                    for _ in 0..elements {
                        set.push(r.vec2()?);
                    }
                }
                4 | 5 => {
                    let set = &mut data.positions[slot - 4];
                    set.reserve(elements);
                    for _ in 0..elements {
                        set.push(r.vec3()?);
                    }
                }
                6 => {
                    for _ in 0..elements {
                        data.normals.push(r.vec3()?);
                    }
                }
                7 => {
                    for _ in 0..elements {
                        data.tangents.push(r.vec4()?);
                    }
                }
                8 => {
                    for _ in 0..elements {
                        data.bone_weights.push(r.vec4()?);
                    }
                }
                9 => {
                    for _ in 0..elements {
                        let raw = r.bytes(4)?;
                        data.bone_indices.push([raw[0], raw[1], raw[2], raw[3]]);
                    }
                }
                10 => {
                    for _ in 0..elements {
                        data.packed_normals.push(r.u32()?);
                    }
                }
                11 => {
                    for _ in 0..elements {
                        let mut v = [f16::ZERO; 4];
                        for h in v.iter_mut() {
                            *h = f16::from_bits(r.u16()?);
                        }
                        data.packed_positions.push(v);
                    }
                }
                12 => {
                    for _ in 0..elements {
                        data.packed_tangents.push(r.u32()?);
                    }
                }
                13 => {
                    for _ in 0..elements {
                        let mut v = [0i16; 4];
                        for c in v.iter_mut() {
                            *c = r.i16()?;
                        }
                        data.qtangents.push(v);
                    }
                }
                _ => unreachable!(),
            }
            r.assert_consumed(mark, size)?;
        }

        Ok(data)
    }

    pub fn encode(&self, w: &mut Writer, ctx: &DecodeContext) -> Result<()> {
        if !ctx.wide_indices {
            if self.needs_wide_indices() {
                return Err(Error::Corrupt(format!(
                    "{} indices require the wide-index flag on the owning collection",
                    self.indices.len()
                )));
            }
            if let Some(&index) = self.indices.iter().find(|&&i| i > u16::MAX as u32) {
                return Err(Error::Corrupt(format!(
                    "index {index} does not fit 16 bits without the wide-index flag"
                )));
            }
        }

        w.u32(self.indices.len() as u32);
        for &index in &self.indices {
            if ctx.wide_indices {
                w.u32(index);
            } else {
                w.u16(index as u16);
            }
        }

        let lengths: Vec<u64> = [
            self.colors[0].len() as u64 * SUB_ARRAY_STRIDES[0],
            self.colors[1].len() as u64 * SUB_ARRAY_STRIDES[1],
            self.uvs[0].len() as u64 * SUB_ARRAY_STRIDES[2],
            self.uvs[1].len() as u64 * SUB_ARRAY_STRIDES[3],
            self.positions[0].len() as u64 * SUB_ARRAY_STRIDES[4],
            self.positions[1].len() as u64 * SUB_ARRAY_STRIDES[5],
            self.normals.len() as u64 * SUB_ARRAY_STRIDES[6],
            self.tangents.len() as u64 * SUB_ARRAY_STRIDES[7],
            self.bone_weights.len() as u64 * SUB_ARRAY_STRIDES[8],
            self.bone_indices.len() as u64 * SUB_ARRAY_STRIDES[9],
            self.packed_normals.len() as u64 * SUB_ARRAY_STRIDES[10],
            self.packed_positions.len() as u64 * SUB_ARRAY_STRIDES[11],
            self.packed_tangents.len() as u64 * SUB_ARRAY_STRIDES[12],
            self.qtangents.len() as u64 * SUB_ARRAY_STRIDES[13],
        ]
        .into_iter()
        .take(Self::sub_array_count(ctx))
        .collect();

        let mut offset = 0u64;
        for &len in &lengths {
            w.u64(offset);
            w.u64(len);
            offset += len;
        }

        for &c in &self.colors[0] {
            w.u32(c);
        }
        for &c in &self.colors[1] {
            w.u32(c);
        }
        for &v in &self.uvs[0] {
            w.vec2(v);
        }
        for &v in &self.uvs[1] {
            w.vec2(v);
        }
        for &v in &self.positions[0] {
            w.vec3(v);
        }
        for &v in &self.positions[1] {
            w.vec3(v);
        }
        for &v in &self.normals {
            w.vec3(v);
        }
        for &v in &self.tangents {
            w.vec4(v);
        }
        for &v in &self.bone_weights {
            w.vec4(v);
        }
        for v in &self.bone_indices {
            w.bytes(v);
        }
        for &v in &self.packed_normals {
            w.u32(v);
        }
        for v in &self.packed_positions {
            for h in v {
                w.u16(h.to_bits());
            }
        }
        for &v in &self.packed_tangents {
            w.u32(v);
        }
        if ctx.extended_tangents {
            for v in &self.qtangents {
                for &c in v {
                    w.i16(c);
                }
            }
        }
        Ok(())
    }

    /// Whether the index array requires 32-bit storage.
    pub fn needs_wide_indices(&self) -> bool {
        self.indices.len() >= WIDE_INDEX_THRESHOLD
    }
}

/// One morph target frame: per-vertex position and normal deltas.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MorphFrame {
    pub position_deltas: Vec<Vec3>,
    pub normal_deltas: Vec<Vec3>,
}

/// The editable (pre-GPU) representation of a mesh.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshEditData {
    pub positions: Vec<Vec3>,
    pub faces: Vec<[u32; 3]>,
    pub morph_frames: Vec<MorphFrame>,
}

impl MeshEditData {
    pub fn decode(r: &mut Reader<'_>) -> Result<Self> {
        let vertex_count = r.u32()? as usize;
        let positions = (0..vertex_count)
            .map(|_| r.vec3())
            .collect::<Result<Vec<_>>>()?;

        let face_count = r.u32()? as usize;
        let faces = (0..face_count)
            .map(|_| Ok([r.u32()?, r.u32()?, r.u32()?]))
            .collect::<Result<Vec<_>>>()?;

        let frame_count = r.u32()? as usize;
        let morph_frames = (0..frame_count)
            .map(|_| {
                let position_deltas = (0..vertex_count)
                    .map(|_| r.vec3())
                    .collect::<Result<Vec<_>>>()?;
                let normal_deltas = (0..vertex_count)
                    .map(|_| r.vec3())
                    .collect::<Result<Vec<_>>>()?;
                Ok(MorphFrame {
                    position_deltas,
                    normal_deltas,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(MeshEditData {
            positions,
            faces,
            morph_frames,
        })
    }

    pub fn encode(&self, w: &mut Writer) {
        w.u32(self.positions.len() as u32);
        for &p in &self.positions {
            w.vec3(p);
        }
        w.u32(self.faces.len() as u32);
        for face in &self.faces {
            for &i in face {
                w.u32(i);
            }
        }
        w.u32(self.morph_frames.len() as u32);
        for frame in &self.morph_frames {
            for &d in &frame.position_deltas {
                w.vec3(d);
            }
            for &d in &frame.normal_deltas {
                w.vec3(d);
            }
        }
    }
}
