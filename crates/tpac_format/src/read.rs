//! Package reading: eager header/metadata parse, lazy segment data.

use std::path::Path;
use std::sync::Arc;

use binrw::BinRead;
use tracing::{info, instrument};

use crate::asset::{Asset, DependencyRef};
use crate::cursor::Reader;
use crate::error::{Error, Result};
use crate::guid::Guid;
use crate::registry::CodecRegistry;
use crate::segment::{PackageSource, Segment};
use crate::types::{PackageHeader, SegmentRecord, HEADER_LEN, SEGMENT_RECORD_LEN, SUPPORTED_VERSIONS};

/// One parsed package file.
///
/// The header and every asset's metadata are decoded eagerly; segment
/// payloads stay on disk until first access.
pub struct Package {
    pub guid: Guid,
    pub version: u32,
    pub assets: Vec<Asset>,
    source: Arc<PackageSource>,
}

impl Package {
    /// Open a package file with the standard codec registry.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Package::open_with(path, Arc::new(CodecRegistry::standard()))
    }

    #[instrument(skip(registry), fields(path = %path.as_ref().display()))]
    pub fn open_with(path: impl AsRef<Path>, registry: Arc<CodecRegistry>) -> Result<Self> {
        let source = Arc::new(PackageSource::open(path, registry)?);
        Package::parse(source)
    }

    /// Parse a package held entirely in memory.
    pub fn from_bytes(bytes: Vec<u8>, registry: Arc<CodecRegistry>) -> Result<Self> {
        let source = Arc::new(PackageSource::from_bytes(bytes, registry));
        Package::parse(source)
    }

    /// An empty in-memory package, for building new files.
    pub fn new(guid: Guid) -> Self {
        Package {
            guid,
            version: PackageHeader::default().version,
            assets: Vec::new(),
            source: Arc::new(PackageSource::empty(Arc::new(CodecRegistry::standard()))),
        }
    }

    fn parse(source: Arc<PackageSource>) -> Result<Self> {
        let header_bytes = source.read_at(0, HEADER_LEN as usize).map_err(|e| match e {
            Error::IOError(_) => Error::NotAPackage,
            other => other,
        })?;
        let header = PackageHeader::read(&mut binrw::io::Cursor::new(&header_bytes))
            .map_err(|e| match e {
                binrw::Error::BadMagic { .. } => Error::NotAPackage,
                other => Error::BinRWError(other),
            })?;

        if !SUPPORTED_VERSIONS.contains(&header.version) {
            return Err(Error::UnsupportedVersion(header.version));
        }
        if header.data_start < HEADER_LEN {
            return Err(Error::Corrupt(format!(
                "data start {} overlaps the header",
                header.data_start
            )));
        }

        let meta_region = source.read_at(HEADER_LEN as u64, (header.data_start - HEADER_LEN) as usize)?;
        let mut r = Reader::new(&meta_region);

        let mut assets = Vec::with_capacity(header.asset_count as usize);
        for _ in 0..header.asset_count {
            let asset = Package::parse_asset(&source, &mut r, header.version)?;
            assets.push(asset);
        }
        r.expect_empty()?;

        info!(
            guid = %header.guid,
            version = header.version,
            assets = assets.len(),
            "parsed package"
        );

        Ok(Package {
            guid: header.guid,
            version: header.version,
            assets,
            source,
        })
    }

    fn parse_asset(source: &PackageSource, r: &mut Reader<'_>, pkg_version: u32) -> Result<Asset> {
        let type_guid = r.guid()?;
        let guid = r.guid()?;
        let (mut meta, _known) = source.registry().create_asset(type_guid);

        let version = if pkg_version >= 2 { r.u32()? } else { 0 };
        let name = r.string()?;

        let wrap = |e: Error| e.for_asset(guid, &name);

        let meta_len = r.u64().map_err(wrap)?;
        let mut meta_reader = r.take(meta_len as usize).map_err(wrap)?;
        meta.read(&mut meta_reader)
            .and_then(|()| meta_reader.expect_empty())
            .map_err(wrap)?;

        let checksum = r.u64().map_err(wrap)?;

        let segment_count = r.u32().map_err(wrap)? as usize;
        let mut records = Vec::with_capacity(segment_count);
        for _ in 0..segment_count {
            let raw = r.bytes(SEGMENT_RECORD_LEN as usize).map_err(wrap)?;
            let record = SegmentRecord::read(&mut binrw::io::Cursor::new(raw)).map_err(|e| wrap(e.into()))?;
            records.push(record);
        }

        let dependency_count = r.u32().map_err(wrap)? as usize;
        let dependencies = (0..dependency_count)
            .map(|_| {
                Ok(DependencyRef {
                    guids: [r.guid()?, r.guid()?, r.guid()?],
                })
            })
            .collect::<Result<Vec<_>>>()
            .map_err(wrap)?;

        // Segment routing needs the fully decoded metadata: sub-object
        // GUIDs (per-submesh GUIDs and the like) come out of it.
        meta.consume_segments(guid, &records);

        let segments = records
            .into_iter()
            .map(|record| Segment::from_record(record, source.next_key()))
            .collect();

        Ok(Asset {
            type_guid,
            guid,
            name,
            version,
            checksum,
            meta,
            segments,
            dependencies,
        })
    }

    pub fn source(&self) -> &Arc<PackageSource> {
        &self.source
    }

    pub fn path(&self) -> Option<&Path> {
        self.source.path()
    }

    pub fn asset(&self, guid: Guid) -> Option<&Asset> {
        self.assets.iter().find(|a| a.guid == guid)
    }

    /// Materialize every segment payload of every asset.
    pub fn force_load(&self) -> Result<()> {
        for asset in &self.assets {
            let ctx = asset.meta.decode_context();
            for segment in &asset.segments {
                segment
                    .force_load(&self.source, &ctx)
                    .map_err(|e| e.for_asset(asset.guid, &asset.name))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn garbage_magic_is_not_a_package() {
        let bytes = b"NOPE\x02\x00\x00\x00".to_vec();
        let registry = Arc::new(CodecRegistry::standard());
        assert!(matches!(
            Package::from_bytes(bytes, registry),
            Err(Error::NotAPackage)
        ));
    }

    #[test]
    fn truncated_header_is_not_a_package() {
        let registry = Arc::new(CodecRegistry::standard());
        assert!(matches!(
            Package::from_bytes(b"TP".to_vec(), registry),
            Err(Error::NotAPackage)
        ));
    }

    #[test]
    fn unsupported_version_is_fatal() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"TPAC");
        bytes.extend_from_slice(&7u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 16]);
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&36u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());

        let registry = Arc::new(CodecRegistry::standard());
        assert!(matches!(
            Package::from_bytes(bytes, registry),
            Err(Error::UnsupportedVersion(7))
        ));
    }

    #[test]
    fn empty_package_parses() {
        let guid = Guid::from_u128(0x42);
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"TPAC");
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&guid.0);
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&36u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());

        let registry = Arc::new(CodecRegistry::standard());
        let package = Package::from_bytes(bytes, registry).unwrap();
        assert_eq!(package.guid, guid);
        assert_eq!(package.version, 2);
        assert!(package.assets.is_empty());
    }
}
