//! 16-byte identifiers used for packages, assets and segment types.

use binrw::{BinRead, BinWrite};
use std::fmt;

/// A raw 16-byte identifier.
///
/// GUIDs are stored on disk as 16 raw bytes with no endianness conversion.
/// They identify packages, assets, segment owners and segment types, and are
/// the resolution key for cross-package references.
#[derive(BinRead, BinWrite, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Guid(pub [u8; 16]);

impl Guid {
    /// The all-zero GUID, used as an "absent" marker in reference slots.
    pub const NIL: Guid = Guid([0; 16]);

    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Guid(bytes)
    }

    /// Build a GUID from a 128-bit literal, stored little-endian.
    pub const fn from_u128(value: u128) -> Self {
        Guid(value.to_le_bytes())
    }

    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn is_nil(&self) -> bool {
        self.0 == [0; 16]
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
            b[8], b[9], b[10], b[11], b[12], b[13], b[14], b[15]
        )
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({self})")
    }
}

#[cfg(test)]
mod test {
    use super::Guid;

    #[test]
    fn display_formats_as_hyphenated_hex() {
        let guid = Guid::from_bytes([
            0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef, 0x01, 0x23, 0x45, 0x67, 0x89, 0xab,
            0xcd, 0xef,
        ]);
        assert_eq!(guid.to_string(), "01234567-89ab-cdef-0123-456789abcdef");
    }

    #[test]
    fn nil_is_nil() {
        assert!(Guid::NIL.is_nil());
        assert!(!Guid::from_u128(1).is_nil());
    }
}
