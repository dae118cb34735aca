//! This library handles reading from and creating **TPAC** game-asset packages.
//!
//! # TPAC Package Format Documentation
//!
//! A TPAC package is a self-describing container for game assets: meshes,
//! textures, materials, skeletons and animations. One package is one file,
//! typically with the `.tpac` extension. The file splits into a header, a
//! metadata region describing every asset, and a data region holding the
//! (possibly compressed) payload segments.
//!
//! ## Header
//!
//! | Offset (bytes) | Field          | Description                                       |
//! |----------------|----------------|---------------------------------------------------|
//! | 0x0000         | Magic number   | 4 bytes: `"TPAC"`                                 |
//! | 0x0004         | Version        | 4 bytes: format version, 1 or 2                   |
//! | 0x0008         | Package GUID   | 16 bytes: identity of this package                |
//! | 0x0018         | Asset Count    | 4 bytes: number of asset records that follow      |
//! | 0x001C         | Data Start     | 4 bytes: offset of the data segment region        |
//! | 0x0020         | Reserved       | 4 bytes: always zero                              |
//!
//! ## Asset Records
//!
//! Immediately after the header come *Asset Count* records, back to back:
//!
//! - **Type GUID** (16 bytes): selects the asset kind (mesh collection,
//!   material, texture, skeleton, animation, ...). Unrecognized kinds are
//!   carried opaquely and survive a round trip untouched.
//! - **Asset GUID** (16 bytes): the asset's identity, unique across all
//!   loaded packages and used for cross-package references.
//! - **Asset Version** (4 bytes): per-asset format version. *Version 2
//!   packages only* — version 1 omits this field.
//! - **Name**: 4-byte byte count followed by that many UTF-8 bytes.
//! - **Metadata**: 8-byte byte count followed by that many bytes, decoded
//!   by the asset kind's own metadata layout. A decoder must consume the
//!   declared length exactly.
//! - **Checksum** (8 bytes): not verified; preserved byte-for-byte.
//! - **Segment Count** (4 bytes) followed by that many segment records,
//!   see below.
//! - **Dependency Count** (4 bytes) followed by that many 48-byte records
//!   of three GUIDs each, preserved but not interpreted.
//!
//! ## Segment Records
//!
//! Each asset owns zero or more external data segments. A segment record
//! is 69 bytes:
//!
//! | Offset (bytes) | Field          | Description                                       |
//! |----------------|----------------|---------------------------------------------------|
//! | 0x0000         | Offset         | 8 bytes: absolute offset of the stored bytes      |
//! | 0x0008         | Actual Size    | 8 bytes: size once decompressed                   |
//! | 0x0010         | Storage Size   | 8 bytes: size as stored in the file               |
//! | 0x0018         | Owner GUID     | 16 bytes: sub-object the payload belongs to       |
//! | 0x0028         | Type GUID      | 16 bytes: selects the payload decoder             |
//! | 0x0038         | Unknown        | 8 bytes: preserved                                |
//! | 0x0040         | Unknown        | 4 bytes: preserved                                |
//! | 0x0044         | Compression    | 1 byte: 0 = none, 1 = LZ4 block                   |
//!
//! Segment payloads are decoded lazily on first access and cached with a
//! size-bounded LRU per package. LZ4 payloads do not self-delimit, so the
//! declared actual size drives decompression; a length mismatch is fatal
//! for that segment. Payloads under 16 bytes are always stored raw because
//! compressing them can expand them.
//!
//! ## Additional Information
//!
//! - **File Extension**: `.tpac`
//! - **Endianness**: little-endian for all multi-byte integers
//! - **Matrices**: 4x4 float32, stored row-major
//! - **Strings**: UTF-8 with a 4-byte byte-count prefix, no terminator

pub mod asset;
pub mod compression;
pub mod context;
pub mod cursor;
pub mod data;
pub mod error;
pub mod guid;
pub mod manager;
pub mod read;
pub mod registry;
pub mod segment;
pub mod types;
pub mod write;

pub use asset::{Asset, AssetMeta};
pub use compression::CompressionKind;
pub use context::DecodeContext;
pub use guid::Guid;
pub use manager::{AssetManager, AssetRef, Resolution};
pub use read::Package;
pub use registry::CodecRegistry;
pub use segment::Segment;
pub use write::{PackageWriter, PackageWriterOptions};
