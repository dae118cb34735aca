//! Skeleton definition and attachment payloads.

use glam::Mat4;

use crate::cursor::{Reader, Writer};
use crate::error::{Error, Result};
use crate::guid::Guid;

/// Segment type GUID of a skeleton definition payload.
pub const SKELETON_SEGMENT: Guid = Guid::from_u128(0x2e95_f608_81d0_4c11_b854_9a2c_7d33_0e41);

/// Segment type GUID of the skeleton attachment extras payload.
pub const SKELETON_USER_SEGMENT: Guid = Guid::from_u128(0x9fb0_3d12_66e4_4a0d_87a9_c055_2bd1_7f88);

/// Sentinel parent index of a root bone.
pub const NO_PARENT: i32 = -1;

/// One bone of a skeleton. Parents are stored as indices into the owning
/// bone list, never as references.
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    /// Index of the parent bone, or [`NO_PARENT`] for a root.
    pub parent: i32,
    pub rest: Mat4,
}

/// A skeleton definition: a bone tree with rest-pose transforms.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SkeletonData {
    pub name: String,
    pub bones: Vec<Bone>,
}

impl SkeletonData {
    pub fn decode(r: &mut Reader<'_>) -> Result<Self> {
        let name = r.string()?;
        let count = r.u32()? as usize;
        let bones = (0..count)
            .map(|_| {
                Ok(Bone {
                    name: r.string()?,
                    parent: r.i32()?,
                    rest: r.mat4()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let data = SkeletonData { name, bones };
        // The source format does not sort bones topologically, so parent
        // validity can only be checked once the full array is read.
        data.validate_tree()?;
        Ok(data)
    }

    pub fn encode(&self, w: &mut Writer) {
        w.string(&self.name);
        w.u32(self.bones.len() as u32);
        for bone in &self.bones {
            w.string(&bone.name);
            w.i32(bone.parent);
            w.mat4(&bone.rest);
        }
    }

    /// Reject out-of-range parent indices and parent cycles.
    ///
    /// Walking `parent` from any bone must reach a root within at most
    /// `bones.len()` steps.
    fn validate_tree(&self) -> Result<()> {
        let count = self.bones.len();
        for (index, bone) in self.bones.iter().enumerate() {
            if bone.parent != NO_PARENT
                && (bone.parent < 0 || bone.parent as usize >= count)
            {
                return Err(Error::Corrupt(format!(
                    "bone {index} ({}) has parent index {} outside 0..{count}",
                    bone.name, bone.parent
                )));
            }
        }
        for index in 0..count {
            let mut current = index;
            let mut steps = 0;
            while self.bones[current].parent != NO_PARENT {
                current = self.bones[current].parent as usize;
                steps += 1;
                if steps > count {
                    return Err(Error::Corrupt(format!(
                        "bone {index} ({}) is part of a parent cycle",
                        self.bones[index].name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Rest-pose transform of one bone, optionally with the baked uniform
    /// scale in the homogeneous component removed.
    ///
    /// Certain skeleton usages carry a scale factor in the bottom-right
    /// matrix component that would double-apply during animation
    /// retargeting; `ignore_scale` resets that component.
    fn local_rest(&self, index: usize, ignore_scale: bool) -> Mat4 {
        let mut local = self.bones[index].rest;
        if ignore_scale {
            local.w_axis.w = 1.0;
        }
        local
    }

    /// Accumulated rest-pose world transforms, one per bone.
    pub fn world_matrices(&self, ignore_scale: bool) -> Vec<Mat4> {
        let mut world: Vec<Option<Mat4>> = vec![None; self.bones.len()];
        for index in 0..self.bones.len() {
            self.world_matrix_memo(index, ignore_scale, &mut world);
        }
        world.into_iter().map(|m| m.unwrap_or(Mat4::IDENTITY)).collect()
    }

    fn world_matrix_memo(
        &self,
        index: usize,
        ignore_scale: bool,
        memo: &mut Vec<Option<Mat4>>,
    ) -> Mat4 {
        if let Some(m) = memo[index] {
            return m;
        }
        let local = self.local_rest(index, ignore_scale);
        let world = match self.bones[index].parent {
            NO_PARENT => local,
            parent => self.world_matrix_memo(parent as usize, ignore_scale, memo) * local,
        };
        memo[index] = Some(world);
        world
    }

    /// Index of the bone with the given name, if present.
    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }
}

/// One attachment point: a named transform hung off a bone.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub name: String,
    pub bone: i32,
    pub transform: Mat4,
}

/// Attachment extras carried alongside a skeleton definition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SkeletonUserData {
    pub attachments: Vec<Attachment>,
}

impl SkeletonUserData {
    pub fn decode(r: &mut Reader<'_>) -> Result<Self> {
        let count = r.u32()? as usize;
        let attachments = (0..count)
            .map(|_| {
                Ok(Attachment {
                    name: r.string()?,
                    bone: r.i32()?,
                    transform: r.mat4()?,
                })
            })
            .collect::<Result<_>>()?;
        Ok(SkeletonUserData { attachments })
    }

    pub fn encode(&self, w: &mut Writer) {
        w.u32(self.attachments.len() as u32);
        for attachment in &self.attachments {
            w.string(&attachment.name);
            w.i32(attachment.bone);
            w.mat4(&attachment.transform);
        }
    }
}
