//! Package writing: recompute every size and offset, save atomically.

use std::io::Write as _;
use std::path::Path;

use binrw::BinWrite;
use bon::Builder;
use tracing::{info, instrument};

use crate::cursor::Writer;
use crate::error::{Error, Result};
use crate::read::Package;
use crate::segment::EncodedSegment;
use crate::types::{PackageHeader, SegmentRecord, HEADER_LEN, SEGMENT_RECORD_LEN};

/// Options for writing a package.
///
/// `data_alignment` pads each segment's stored bytes so its file offset is
/// a multiple of the given value. The original tool writes segments
/// back-to-back, so alignment stays off unless a caller asks for it.
#[derive(Debug, Clone, Copy, Default, Builder)]
pub struct PackageWriterOptions {
    /// Pad stored segments so their file offsets land on this boundary.
    pub data_alignment: Option<u32>,
}

/// Serializes a [`Package`] back to the container byte format.
///
/// All sizes and offsets come from the actual serialized lengths of this
/// pass; nothing is reused from a previous read.
#[derive(Default)]
pub struct PackageWriter {
    options: PackageWriterOptions,
}

struct PendingAsset {
    meta_bytes: Vec<u8>,
    segments: Vec<EncodedSegment>,
}

impl PackageWriter {
    pub fn new() -> Self {
        PackageWriter::default()
    }

    pub fn with_options(options: PackageWriterOptions) -> Self {
        PackageWriter { options }
    }

    fn align(&self, offset: u64) -> u64 {
        match self.options.data_alignment {
            Some(alignment) if alignment > 1 => {
                offset.div_ceil(alignment as u64) * alignment as u64
            }
            _ => offset,
        }
    }

    /// Serialize the whole package to bytes.
    pub fn to_bytes(&self, package: &Package) -> Result<Vec<u8>> {
        let source = package.source();

        let mut pending = Vec::with_capacity(package.assets.len());
        for asset in &package.assets {
            let mut meta_writer = Writer::new();
            asset.meta.write(&mut meta_writer);

            let ctx = asset.meta.decode_context();
            let segments = asset
                .segments
                .iter()
                .map(|segment| segment.save_to(source, &ctx))
                .collect::<Result<Vec<_>>>()
                .map_err(|e| e.for_asset(asset.guid, &asset.name))?;

            pending.push(PendingAsset {
                meta_bytes: meta_writer.into_bytes(),
                segments,
            });
        }

        let mut data_start = HEADER_LEN as u64;
        for (asset, p) in package.assets.iter().zip(&pending) {
            data_start += 32; // type GUID + asset GUID
            if package.version >= 2 {
                data_start += 4;
            }
            data_start += 4 + asset.name.len() as u64;
            data_start += 8 + p.meta_bytes.len() as u64;
            data_start += 8 + 4; // checksum + segment count
            data_start += SEGMENT_RECORD_LEN * p.segments.len() as u64;
            data_start += 4 + 48 * asset.dependencies.len() as u64;
        }

        let mut offsets = Vec::with_capacity(pending.len());
        let mut cursor = data_start;
        for p in &pending {
            let mut asset_offsets = Vec::with_capacity(p.segments.len());
            for encoded in &p.segments {
                cursor = self.align(cursor);
                asset_offsets.push(cursor);
                cursor += encoded.storage_size();
            }
            offsets.push(asset_offsets);
        }

        let header = PackageHeader {
            version: package.version,
            guid: package.guid,
            asset_count: package.assets.len() as u32,
            data_start: data_start as u32,
            reserved: 0,
        };
        let mut header_bytes = binrw::io::Cursor::new(Vec::new());
        header.write(&mut header_bytes)?;

        let mut w = Writer::new();
        w.bytes(header_bytes.get_ref());

        for ((asset, p), asset_offsets) in package.assets.iter().zip(&pending).zip(&offsets) {
            w.guid(&asset.type_guid);
            w.guid(&asset.guid);
            if package.version >= 2 {
                w.u32(asset.version);
            }
            w.string(&asset.name);
            w.u64(p.meta_bytes.len() as u64);
            w.bytes(&p.meta_bytes);
            w.u64(asset.checksum);

            w.u32(p.segments.len() as u32);
            for (segment, (encoded, &offset)) in asset
                .segments
                .iter()
                .zip(p.segments.iter().zip(asset_offsets))
            {
                let record = SegmentRecord {
                    offset,
                    actual_size: encoded.actual_size,
                    storage_size: encoded.storage_size(),
                    owner: segment.record.owner,
                    type_guid: segment.record.type_guid,
                    unknown_a: segment.record.unknown_a,
                    unknown_b: segment.record.unknown_b,
                    compression: encoded.compression,
                };
                let mut record_bytes = binrw::io::Cursor::new(Vec::new());
                record.write(&mut record_bytes)?;
                w.bytes(record_bytes.get_ref());
            }

            w.u32(asset.dependencies.len() as u32);
            for dep in &asset.dependencies {
                for guid in &dep.guids {
                    w.guid(guid);
                }
            }
        }

        for (p, asset_offsets) in pending.iter().zip(&offsets) {
            for (encoded, &offset) in p.segments.iter().zip(asset_offsets) {
                while (w.position() as u64) < offset {
                    w.u8(0);
                }
                w.bytes(&encoded.bytes);
            }
        }

        Ok(w.into_bytes())
    }

    /// Write the package to `path` atomically: the bytes land in a
    /// temporary sibling file that replaces the destination only once the
    /// write has fully succeeded.
    #[instrument(skip(self, package), fields(path = %path.as_ref().display()))]
    pub fn save(&self, package: &Package, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes(package)?;

        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = tempfile::NamedTempFile::new_in(parent)?;
        temp.write_all(&bytes)?;
        temp.flush()?;
        temp.persist(path).map_err(|e| Error::IOError(e.error))?;

        info!(bytes = bytes.len(), "saved package");
        Ok(())
    }
}

impl Package {
    /// Save with default writer options.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        PackageWriter::new().save(self, path)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::asset::{Asset, AssetMeta};
    use crate::data::misc::OpaqueMeta;
    use crate::data::Payload;
    use crate::guid::Guid;
    use crate::registry::CodecRegistry;
    use crate::segment::Segment;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn empty_package_is_a_bare_header() {
        let package = Package::new(Guid::from_u128(0x99));
        let bytes = PackageWriter::new().to_bytes(&package).unwrap();

        assert_eq!(bytes.len(), 36);
        assert_eq!(&bytes[0..4], b"TPAC");
        assert_eq!(u32::from_le_bytes(bytes[28..32].try_into().unwrap()), 36);
    }

    #[test]
    fn written_package_parses_back() {
        let mut package = Package::new(Guid::from_u128(0x1));
        let asset_guid = Guid::from_u128(0x2);
        let type_guid = Guid::from_u128(0xFEED); // unknown kind
        let mut asset = Asset::new(
            type_guid,
            asset_guid,
            "blob",
            AssetMeta::Unknown(OpaqueMeta {
                bytes: vec![9, 9, 9],
            }),
        );
        asset.checksum = 0xC0FFEE;
        asset.segments.push(Segment::new_inline(
            asset_guid,
            Guid::from_u128(0xF00D),
            Payload::Opaque((0u8..64).collect()),
        ));
        package.assets.push(asset);

        let bytes = PackageWriter::new().to_bytes(&package).unwrap();
        let back = Package::from_bytes(bytes, Arc::new(CodecRegistry::standard())).unwrap();

        assert_eq!(back.guid, package.guid);
        assert_eq!(back.assets.len(), 1);
        let asset = &back.assets[0];
        assert_eq!(asset.name, "blob");
        assert_eq!(asset.checksum, 0xC0FFEE);
        assert!(matches!(
            &asset.meta,
            AssetMeta::Unknown(OpaqueMeta { bytes }) if bytes == &vec![9, 9, 9]
        ));

        let ctx = asset.meta.decode_context();
        let payload = asset.segments[0].data(back.source(), &ctx).unwrap();
        assert_eq!(*payload, Payload::Opaque((0u8..64).collect()));
    }

    #[test]
    fn alignment_pads_segment_offsets() {
        let mut package = Package::new(Guid::from_u128(0x1));
        let asset_guid = Guid::from_u128(0x2);
        let mut asset = Asset::new(
            Guid::from_u128(0xFEED),
            asset_guid,
            "a",
            AssetMeta::Unknown(OpaqueMeta::default()),
        );
        asset.segments.push(Segment::new_inline(
            asset_guid,
            Guid::from_u128(0xF00D),
            Payload::Opaque(vec![1; 20]),
        ));
        asset.segments.push(Segment::new_inline(
            asset_guid,
            Guid::from_u128(0xF00D),
            Payload::Opaque(vec![2; 20]),
        ));
        package.assets.push(asset);

        let options = PackageWriterOptions::builder().data_alignment(64).build();
        let bytes = PackageWriter::with_options(options).to_bytes(&package).unwrap();
        let back = Package::from_bytes(bytes, Arc::new(CodecRegistry::standard())).unwrap();

        for segment in &back.assets[0].segments {
            assert_eq!(segment.record.offset % 64, 0);
        }
    }

    #[test]
    fn save_replaces_destination_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tpac");
        std::fs::write(&path, b"old contents").unwrap();

        let package = Package::new(Guid::from_u128(0x7));
        package.save(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[0..4], b"TPAC");
        assert_eq!(bytes.len(), 36);
    }
}
