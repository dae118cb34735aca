//! Material asset metadata.

use crate::cursor::{Reader, Writer};
use crate::error::Result;
use crate::guid::Guid;

/// One texture slot of a material: a slot name and the GUID of the texture
/// asset it references, resolved cross-package through the asset manager.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextureSlot {
    pub name: String,
    pub texture: Guid,
}

/// Metadata of a material asset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MaterialMeta {
    /// Name of the shading setup this material selects.
    pub shading: String,
    pub textures: Vec<TextureSlot>,
}

impl MaterialMeta {
    pub fn read(&mut self, r: &mut Reader<'_>) -> Result<()> {
        self.shading = r.string()?;
        let count = r.u32()? as usize;
        self.textures = (0..count)
            .map(|_| {
                Ok(TextureSlot {
                    name: r.string()?,
                    texture: r.guid()?,
                })
            })
            .collect::<Result<_>>()?;
        Ok(())
    }

    pub fn write(&self, w: &mut Writer) {
        w.string(&self.shading);
        w.u32(self.textures.len() as u32);
        for slot in &self.textures {
            w.string(&slot.name);
            w.guid(&slot.texture);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn round_trips() {
        let meta = MaterialMeta {
            shading: "pbr_skin".into(),
            textures: vec![
                TextureSlot {
                    name: "diffuse".into(),
                    texture: Guid::from_u128(0x10),
                },
                TextureSlot {
                    name: "normal".into(),
                    texture: Guid::from_u128(0x20),
                },
            ],
        };

        let mut w = Writer::new();
        meta.write(&mut w);
        let bytes = w.into_bytes();

        let mut back = MaterialMeta::default();
        let mut r = Reader::new(&bytes);
        back.read(&mut r).unwrap();
        r.expect_empty().unwrap();
        assert_eq!(back, meta);
    }
}
