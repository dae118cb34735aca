//! Animation payloads: sparse keyframe curves and the baked per-frame form.

use glam::{Quat, Vec3};

use crate::cursor::{Reader, Writer};
use crate::error::{Error, Result};
use crate::guid::Guid;

/// Segment type GUID of a keyframe-curve animation payload.
pub const ANIMATION_CLIP_SEGMENT: Guid =
    Guid::from_u128(0xd410_6c2b_35e9_4f8a_b27f_8830_416a_9dc5);

/// Segment type GUID of a baked animation payload.
pub const BAKED_ANIMATION_SEGMENT: Guid =
    Guid::from_u128(0x5b78_e3f4_0a26_4d95_9ce1_6742_f018_ab3a);

/// A sparse time-sorted keyframe channel. Values between keys are
/// interpolated by the consumer, never pre-sampled here.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Curve<T> {
    pub keys: Vec<(f32, T)>,
}

impl<T> Curve<T> {
    fn decode(r: &mut Reader<'_>, mut value: impl FnMut(&mut Reader<'_>) -> Result<T>) -> Result<Self> {
        let count = r.u32()? as usize;
        let keys = (0..count)
            .map(|_| Ok((r.f32()?, value(r)?)))
            .collect::<Result<Vec<_>>>()?;
        for pair in keys.windows(2) {
            if pair[1].0 <= pair[0].0 {
                return Err(Error::Corrupt(format!(
                    "curve keys out of order: {} after {}",
                    pair[1].0, pair[0].0
                )));
            }
        }
        Ok(Curve { keys })
    }

    fn encode(&self, w: &mut Writer, mut value: impl FnMut(&mut Writer, &T)) {
        w.u32(self.keys.len() as u32);
        for (time, v) in &self.keys {
            w.f32(*time);
            value(w, v);
        }
    }
}

/// Per-bone keyframe channels of a curve animation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoneCurves {
    pub position: Curve<Vec3>,
    pub rotation: Curve<Quat>,
}

/// A keyframe-curve animation: sparse channels for the root transform and
/// each bone, indexed parallel to the target skeleton's bone list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnimationClipData {
    pub name: String,
    pub duration: f32,
    pub root_position: Curve<Vec3>,
    pub root_scale: Curve<f32>,
    pub bones: Vec<BoneCurves>,
}

impl AnimationClipData {
    pub fn decode(r: &mut Reader<'_>) -> Result<Self> {
        let name = r.string()?;
        let duration = r.f32()?;
        let root_position = Curve::decode(r, |r| r.vec3())?;
        let root_scale = Curve::decode(r, |r| r.f32())?;
        let bone_count = r.u32()? as usize;
        let bones = (0..bone_count)
            .map(|_| {
                Ok(BoneCurves {
                    position: Curve::decode(r, |r| r.vec3())?,
                    rotation: Curve::decode(r, |r| r.quat())?,
                })
            })
            .collect::<Result<_>>()?;
        Ok(AnimationClipData {
            name,
            duration,
            root_position,
            root_scale,
            bones,
        })
    }

    pub fn encode(&self, w: &mut Writer) {
        w.string(&self.name);
        w.f32(self.duration);
        self.root_position.encode(w, |w, v| w.vec3(*v));
        self.root_scale.encode(w, |w, v| w.f32(*v));
        w.u32(self.bones.len() as u32);
        for bone in &self.bones {
            bone.position.encode(w, |w, v| w.vec3(*v));
            bone.rotation.encode(w, |w, v| w.quat(*v));
        }
    }
}

/// One rotation key of a baked animation: a frame index and the rotation
/// the bone holds from that frame on.
#[derive(Debug, Clone, PartialEq)]
pub struct RotationKey {
    pub frame: u32,
    pub rotation: Quat,
}

/// A baked animation: fixed frame count, per-bone rotation keys, a dense
/// root-position track, and a per-frame bone activity map.
///
/// The activity map is stored delta-encoded as raw byte rows of
/// `bone_count` bytes per frame; a byte increasing relative to the previous
/// frame's byte at the same bone index marks that bone newly active on that
/// frame. Raw rows are kept so writing back is bit-exact.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BakedAnimationData {
    pub name: String,
    pub frame_count: u32,
    pub root_positions: Vec<Vec3>,
    pub bones: Vec<Vec<RotationKey>>,
    pub activity_rows: Vec<u8>,
    /// Not yet understood; preserved verbatim on round-trip. Only newly
    /// built payloads derive it, see [`BakedAnimationData::refresh_unknown_offset`].
    pub unknown_offset: u64,
}

impl BakedAnimationData {
    pub fn decode(r: &mut Reader<'_>) -> Result<Self> {
        let name = r.string()?;
        let frame_count = r.u32()?;
        let bone_count = r.u32()? as usize;

        let root_positions = (0..frame_count)
            .map(|_| r.vec3())
            .collect::<Result<Vec<_>>>()?;

        let bones = (0..bone_count)
            .map(|_| {
                let key_count = r.u32()? as usize;
                (0..key_count)
                    .map(|_| {
                        let key = RotationKey {
                            frame: r.u32()?,
                            rotation: r.quat()?,
                        };
                        if key.frame >= frame_count {
                            return Err(Error::Corrupt(format!(
                                "rotation key frame {} outside 0..{frame_count}",
                                key.frame
                            )));
                        }
                        Ok(key)
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        let activity_rows = r.bytes(frame_count as usize * bone_count)?.to_vec();
        let unknown_offset = r.u64()?;

        Ok(BakedAnimationData {
            name,
            frame_count,
            root_positions,
            bones,
            activity_rows,
            unknown_offset,
        })
    }

    pub fn encode(&self, w: &mut Writer) {
        w.string(&self.name);
        w.u32(self.frame_count);
        w.u32(self.bones.len() as u32);
        for &p in &self.root_positions {
            w.vec3(p);
        }
        for keys in &self.bones {
            w.u32(keys.len() as u32);
            for key in keys {
                w.u32(key.frame);
                w.quat(key.rotation);
            }
        }
        w.bytes(&self.activity_rows);
        w.u64(self.unknown_offset);
    }

    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    /// Raw activity byte row of one frame.
    fn row(&self, frame: usize) -> &[u8] {
        let width = self.bone_count();
        &self.activity_rows[frame * width..(frame + 1) * width]
    }

    /// Which bones become newly active on `frame`.
    ///
    /// On frame 0 every nonzero byte counts as active; afterwards a bone is
    /// newly active exactly when its byte increased relative to the
    /// previous frame's row.
    pub fn newly_active(&self, frame: usize) -> Vec<bool> {
        let row = self.row(frame);
        if frame == 0 {
            return row.iter().map(|&b| b != 0).collect();
        }
        let prev = self.row(frame - 1);
        row.iter().zip(prev).map(|(&b, &p)| b > p).collect()
    }

    /// Derive `unknown_offset` for a newly built payload.
    ///
    /// The derivation mirrors what the original tool writes; it is not
    /// validated, so payloads read from a file keep their stored value
    /// untouched instead of being recomputed.
    pub fn refresh_unknown_offset(&mut self) {
        let mut w = Writer::new();
        self.encode(&mut w);
        let length = w.position() as u64;
        self.unknown_offset = length - self.bone_count() as u64 * 17 + 4;
    }
}
