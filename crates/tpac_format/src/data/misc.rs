//! Asset kinds whose inner layout is out of scope.
//!
//! Particle effects, physics shapes, shaders and procedural vector fields
//! are recognized by their type GUIDs but their metadata is carried
//! byte-exact, so packages containing them round trip without loss.

use crate::cursor::{Reader, Writer};
use crate::error::Result;

/// Verbatim-preserved metadata of a recognized-but-unparsed asset kind.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OpaqueMeta {
    pub bytes: Vec<u8>,
}

impl OpaqueMeta {
    pub fn read(&mut self, r: &mut Reader<'_>) -> Result<()> {
        self.bytes = r.rest().to_vec();
        Ok(())
    }

    pub fn write(&self, w: &mut Writer) {
        w.bytes(&self.bytes);
    }
}
