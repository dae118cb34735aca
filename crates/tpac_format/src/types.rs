//! Base types for the fixed-layout parts of a TPAC package file.

use binrw::{BinRead, BinWrite};

use crate::compression::CompressionKind;
use crate::guid::Guid;

/// Package versions this library accepts.
pub const SUPPORTED_VERSIONS: [u32; 2] = [1, 2];

/// Byte length of one serialized [`SegmentRecord`].
pub const SEGMENT_RECORD_LEN: u64 = 69;

/// Byte length of the serialized [`PackageHeader`], including the magic.
pub const HEADER_LEN: u32 = 36;

/// TPAC package header
///
/// Always starts with the magic `"TPAC"`, followed by the format version.
/// All data is stored in little endian format. Version 1 packages omit the
/// per-asset format version field that version 2 includes.
#[derive(BinRead, BinWrite, Debug, Copy, Clone, PartialEq)]
#[brw(magic = b"TPAC", little)]
pub struct PackageHeader {
    /// Format version; only 1 and 2 are recognized
    pub version: u32,

    /// The identity of this package
    pub guid: Guid,

    /// The number of asset records that follow the header
    pub asset_count: u32,

    /// Offset from the start of the file to the data segment region
    /// (informational; segment records carry their own absolute offsets)
    pub data_start: u32,

    /// Reserved, always zero
    pub reserved: u32,
}

impl Default for PackageHeader {
    fn default() -> Self {
        Self {
            version: 2,
            guid: Guid::NIL,
            asset_count: 0,
            data_start: 36,
            reserved: 0,
        }
    }
}

/// Descriptor of one external data segment inside an asset record.
///
/// The two unknown fields have not been reverse-engineered; they are
/// preserved verbatim on round trips.
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[brw(little)]
pub struct SegmentRecord {
    /// Offset of the stored bytes from the start of the file
    pub offset: u64,

    /// Size of the payload once decompressed
    pub actual_size: u64,

    /// Size of the payload as stored (compressed or raw)
    pub storage_size: u64,

    /// GUID of the sub-object this segment belongs to
    pub owner: Guid,

    /// GUID selecting the payload decoder
    pub type_guid: Guid,

    /// Unknown, preserved
    pub unknown_a: u64,

    /// Unknown, preserved
    pub unknown_b: u32,

    /// How the payload is stored
    pub compression: CompressionKind,
}
