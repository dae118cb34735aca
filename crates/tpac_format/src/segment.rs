//! Lazy segment materialization and the package payload cache.
//!
//! A segment starts out as a record pointing into the package file. The
//! decoded payload materializes on first access, lands in a size-bounded
//! LRU owned by the package, and may be evicted and transparently
//! re-decoded at any time unless pinned.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::compression::{self, CompressionKind};
use crate::context::DecodeContext;
use crate::cursor::Reader;
use crate::data::Payload;
use crate::error::{Error, Result};
use crate::guid::Guid;
use crate::registry::CodecRegistry;
use crate::types::SegmentRecord;

/// Default payload cache budget per package.
pub const DEFAULT_CACHE_BUDGET: u64 = 256 * 1024 * 1024;

enum Source {
    File(File),
    Memory(Cursor<Vec<u8>>),
}

impl Source {
    fn read_at(&mut self, offset: u64, len: usize) -> std::io::Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        match self {
            Source::File(file) => {
                file.seek(SeekFrom::Start(offset))?;
                file.read_exact(&mut buf)?;
            }
            Source::Memory(cursor) => {
                cursor.seek(SeekFrom::Start(offset))?;
                cursor.read_exact(&mut buf)?;
            }
        }
        Ok(buf)
    }
}

/// Byte-budgeted LRU of decoded payloads plus a pin map that never evicts.
struct PayloadCache {
    lru: lru::LruCache<u64, (Arc<Payload>, u64)>,
    pinned: HashMap<u64, Arc<Payload>>,
    budget: u64,
    used: u64,
}

impl PayloadCache {
    fn new(budget: u64) -> Self {
        PayloadCache {
            lru: lru::LruCache::unbounded(),
            pinned: HashMap::new(),
            budget,
            used: 0,
        }
    }

    fn get(&mut self, key: u64) -> Option<Arc<Payload>> {
        if let Some(payload) = self.pinned.get(&key) {
            return Some(Arc::clone(payload));
        }
        self.lru.get(&key).map(|(payload, _)| Arc::clone(payload))
    }

    fn insert(&mut self, key: u64, payload: Arc<Payload>, cost: u64) {
        if let Some((_, old_cost)) = self.lru.put(key, (payload, cost)) {
            self.used -= old_cost;
        }
        self.used += cost;
        while self.used > self.budget && self.lru.len() > 1 {
            if let Some((evicted, (_, evicted_cost))) = self.lru.pop_lru() {
                debug!(key = evicted, bytes = evicted_cost, "evicting cached payload");
                self.used -= evicted_cost;
            }
        }
    }

    fn pin(&mut self, key: u64, payload: Arc<Payload>) {
        if let Some((_, cost)) = self.lru.pop(&key) {
            self.used -= cost;
        }
        self.pinned.insert(key, payload);
    }
}

/// Shared read side of one package: the underlying byte source, the codec
/// registry, and the payload cache.
///
/// The source lock is held only for seek + read + decompress, never for
/// structural decode, so CPU-bound decodes of different segments from the
/// same package run in parallel.
pub struct PackageSource {
    source: Mutex<Source>,
    cache: Mutex<PayloadCache>,
    /// One guard per segment key, held while that segment decodes so a
    /// cache miss is materialized by exactly one thread. Bounded by the
    /// package's record count.
    in_flight: Mutex<HashMap<u64, Arc<Mutex<()>>>>,
    registry: Arc<CodecRegistry>,
    path: Option<PathBuf>,
    next_key: AtomicU64,
}

impl PackageSource {
    pub fn open(path: impl AsRef<Path>, registry: Arc<CodecRegistry>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Ok(PackageSource {
            source: Mutex::new(Source::File(file)),
            cache: Mutex::new(PayloadCache::new(DEFAULT_CACHE_BUDGET)),
            in_flight: Mutex::new(HashMap::new()),
            registry,
            path: Some(path.to_path_buf()),
            next_key: AtomicU64::new(0),
        })
    }

    pub fn from_bytes(bytes: Vec<u8>, registry: Arc<CodecRegistry>) -> Self {
        PackageSource {
            source: Mutex::new(Source::Memory(Cursor::new(bytes))),
            cache: Mutex::new(PayloadCache::new(DEFAULT_CACHE_BUDGET)),
            in_flight: Mutex::new(HashMap::new()),
            registry,
            path: None,
            next_key: AtomicU64::new(0),
        }
    }

    pub fn empty(registry: Arc<CodecRegistry>) -> Self {
        PackageSource::from_bytes(Vec::new(), registry)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn registry(&self) -> &CodecRegistry {
        &self.registry
    }

    pub(crate) fn next_key(&self) -> u64 {
        self.next_key.fetch_add(1, Ordering::Relaxed)
    }

    fn decode_guard(&self, key: u64) -> Arc<Mutex<()>> {
        let mut guards = self.in_flight.lock();
        Arc::clone(guards.entry(key).or_default())
    }

    /// Read one raw region of the underlying source.
    pub(crate) fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut source = self.source.lock();
        Ok(source.read_at(offset, len)?)
    }

    /// Read and decompress one segment's stored bytes.
    ///
    /// The compressed read buffer is dropped with the source lock, before
    /// any structural decode, so large payloads don't hold double memory
    /// longer than the I/O itself.
    fn read_payload_bytes(&self, record: &SegmentRecord) -> Result<Vec<u8>> {
        let mut source = self.source.lock();
        let stored = source.read_at(record.offset, record.storage_size as usize)?;
        compression::decompress(&stored, record.compression, record.actual_size as usize)
    }

    /// Read one segment's stored bytes without decompressing.
    fn read_stored_bytes(&self, record: &SegmentRecord) -> Result<Vec<u8>> {
        let mut source = self.source.lock();
        Ok(source.read_at(record.offset, record.storage_size as usize)?)
    }
}

/// The re-encoded form of one segment, ready for the package writer.
pub struct EncodedSegment {
    pub bytes: Vec<u8>,
    pub actual_size: u64,
    pub compression: CompressionKind,
}

impl EncodedSegment {
    pub fn storage_size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Handle to one external data segment of an asset.
#[derive(Debug, Clone)]
pub struct Segment {
    pub record: SegmentRecord,
    key: u64,
    /// Payload of a segment built in memory rather than parsed from a
    /// file; never evicted.
    inline: Option<Arc<Payload>>,
}

impl Segment {
    pub(crate) fn from_record(record: SegmentRecord, key: u64) -> Self {
        Segment {
            record,
            key,
            inline: None,
        }
    }

    /// A segment newly built in memory, not backed by any file region.
    pub fn new_inline(owner: Guid, type_guid: Guid, payload: Payload) -> Self {
        Segment {
            record: SegmentRecord {
                owner,
                type_guid,
                ..SegmentRecord::default()
            },
            key: u64::MAX,
            inline: Some(Arc::new(payload)),
        }
    }

    pub fn type_guid(&self) -> Guid {
        self.record.type_guid
    }

    pub fn owner(&self) -> Guid {
        self.record.owner
    }

    /// The decoded payload, materializing it on first access.
    ///
    /// Concurrent first accesses to the same segment serialize on a
    /// per-segment guard; exactly one thread decodes, the rest pick the
    /// result up from the cache.
    pub fn data(&self, source: &PackageSource, ctx: &DecodeContext) -> Result<Arc<Payload>> {
        if let Some(payload) = &self.inline {
            return Ok(Arc::clone(payload));
        }
        if let Some(payload) = source.cache.lock().get(self.key) {
            return Ok(Arc::clone(&payload));
        }

        let guard = source.decode_guard(self.key);
        let _decoding = guard.lock();
        if let Some(payload) = source.cache.lock().get(self.key) {
            return Ok(Arc::clone(&payload));
        }

        let payload = self.decode(source, ctx)?;
        source
            .cache
            .lock()
            .insert(self.key, Arc::clone(&payload), self.record.actual_size);
        Ok(payload)
    }

    fn decode(&self, source: &PackageSource, ctx: &DecodeContext) -> Result<Arc<Payload>> {
        let bytes = self
            .read_decompressed(source)
            .map_err(|e| self.wrap(e))?;

        let mut r = Reader::new(&bytes);
        let payload = source
            .registry
            .decode_segment(self.record.type_guid, &mut r, ctx)
            .and_then(|payload| {
                // Exact consumption of the declared uncompressed length.
                r.expect_empty()?;
                Ok(payload)
            })
            .map_err(|e| self.wrap(e))?;

        debug!(
            owner = %self.record.owner,
            kind = payload.kind_name(),
            bytes = bytes.len(),
            "materialized segment payload"
        );
        Ok(Arc::new(payload))
    }

    fn read_decompressed(&self, source: &PackageSource) -> Result<Vec<u8>> {
        source.read_payload_bytes(&self.record)
    }

    fn wrap(&self, e: Error) -> Error {
        e.for_segment(
            self.record.type_guid,
            self.record.owner,
            self.record.offset,
        )
    }

    /// Eagerly materialize, for callers pre-loading a whole package.
    pub fn force_load(&self, source: &PackageSource, ctx: &DecodeContext) -> Result<()> {
        self.data(source, ctx).map(|_| ())
    }

    /// Materialize and keep the payload alive until the package is dropped,
    /// exempt from cache eviction.
    pub fn pin(&self, source: &PackageSource, ctx: &DecodeContext) -> Result<Arc<Payload>> {
        let payload = self.data(source, ctx)?;
        if self.inline.is_none() {
            source.cache.lock().pin(self.key, Arc::clone(&payload));
        }
        Ok(payload)
    }

    /// The uncompressed payload bytes without structural decode. Segments
    /// built in memory have no stored form and are encoded on the fly.
    pub fn raw_data(&self, source: &PackageSource, ctx: &DecodeContext) -> Result<Vec<u8>> {
        if let Some(payload) = &self.inline {
            return payload.encode(ctx).map_err(|e| self.wrap(e));
        }
        self.read_decompressed(source).map_err(|e| self.wrap(e))
    }

    /// Serialize this segment for writing.
    ///
    /// A materialized payload is re-encoded and re-compressed; a segment
    /// that was never loaded passes its stored bytes through untouched so
    /// untouched assets don't pay a decode/recode round trip.
    pub fn save_to(&self, source: &PackageSource, ctx: &DecodeContext) -> Result<EncodedSegment> {
        let materialized = self
            .inline
            .clone()
            .or_else(|| source.cache.lock().get(self.key));

        match materialized {
            Some(payload) => {
                let encoded = payload.encode(ctx).map_err(|e| self.wrap(e))?;
                let actual_size = encoded.len() as u64;
                let (bytes, compression) = compression::compress(&encoded);
                Ok(EncodedSegment {
                    bytes,
                    actual_size,
                    compression,
                })
            }
            None => {
                let bytes = self
                    .read_stored_bytes(source)
                    .map_err(|e| self.wrap(e))?;
                Ok(EncodedSegment {
                    bytes,
                    actual_size: self.record.actual_size,
                    compression: self.record.compression,
                })
            }
        }
    }

    fn read_stored_bytes(&self, source: &PackageSource) -> Result<Vec<u8>> {
        source.read_stored_bytes(&self.record)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cursor::Writer;
    use crate::data::skeleton::SkeletonData;
    use crate::data::skeleton::SKELETON_SEGMENT;
    use pretty_assertions::assert_eq;

    fn memory_source_with(payload_bytes: &[u8], compressed: bool) -> (PackageSource, SegmentRecord) {
        let registry = Arc::new(CodecRegistry::standard());
        let (stored, kind) = if compressed {
            compression::compress(payload_bytes)
        } else {
            (payload_bytes.to_vec(), CompressionKind::None)
        };
        let record = SegmentRecord {
            offset: 0,
            actual_size: payload_bytes.len() as u64,
            storage_size: stored.len() as u64,
            owner: Guid::from_u128(0x1),
            type_guid: SKELETON_SEGMENT,
            unknown_a: 0,
            unknown_b: 0,
            compression: kind,
        };
        (PackageSource::from_bytes(stored, registry), record)
    }

    fn skeleton_bytes() -> Vec<u8> {
        let mut w = Writer::new();
        SkeletonData {
            name: "test".into(),
            bones: Vec::new(),
        }
        .encode(&mut w);
        w.into_bytes()
    }

    #[test]
    fn data_materializes_and_caches() {
        let bytes = skeleton_bytes();
        let (source, record) = memory_source_with(&bytes, true);
        let segment = Segment::from_record(record, source.next_key());

        let ctx = DecodeContext::default();
        let first = segment.data(&source, &ctx).unwrap();
        let second = segment.data(&source, &ctx).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(matches!(*first, Payload::Skeleton(_)));
    }

    #[test]
    fn concurrent_first_access_decodes_once() {
        let bytes = skeleton_bytes();
        let (source, record) = memory_source_with(&bytes, true);
        let segment = Segment::from_record(record, source.next_key());
        let ctx = DecodeContext::default();

        let payloads: Vec<Arc<Payload>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| segment.data(&source, &ctx).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for payload in &payloads[1..] {
            assert!(Arc::ptr_eq(&payloads[0], payload));
        }
    }

    #[test]
    fn trailing_byte_is_a_segment_error() {
        let mut bytes = skeleton_bytes();
        bytes.push(0);
        let (source, record) = memory_source_with(&bytes, false);
        let segment = Segment::from_record(record, source.next_key());

        let err = segment.data(&source, &DecodeContext::default()).unwrap_err();
        assert!(matches!(err, Error::Segment { .. }));
    }

    #[test]
    fn unloaded_segment_saves_stored_bytes_verbatim() {
        let bytes = skeleton_bytes();
        let (source, record) = memory_source_with(&bytes, true);
        let stored_size = record.storage_size;
        let kind = record.compression;
        let segment = Segment::from_record(record, source.next_key());

        let encoded = segment.save_to(&source, &DecodeContext::default()).unwrap();
        assert_eq!(encoded.storage_size(), stored_size);
        assert_eq!(encoded.compression, kind);
        assert_eq!(encoded.actual_size, bytes.len() as u64);
    }

    #[test]
    fn loaded_segment_saves_reencoded_payload() {
        let bytes = skeleton_bytes();
        let (source, record) = memory_source_with(&bytes, true);
        let segment = Segment::from_record(record, source.next_key());

        let ctx = DecodeContext::default();
        segment.force_load(&source, &ctx).unwrap();
        let encoded = segment.save_to(&source, &ctx).unwrap();
        assert_eq!(encoded.actual_size, bytes.len() as u64);
        let back =
            compression::decompress(&encoded.bytes, encoded.compression, bytes.len()).unwrap();
        assert_eq!(back, bytes);
    }

    #[test]
    fn eviction_spares_pinned_payloads() {
        let bytes = skeleton_bytes();
        let mut cache = PayloadCache::new(8);
        let payload = Arc::new(Payload::Opaque(bytes));

        cache.pin(0, Arc::clone(&payload));
        cache.insert(1, Arc::clone(&payload), 6);
        cache.insert(2, Arc::clone(&payload), 6); // over budget, evicts 1

        assert!(cache.get(0).is_some());
        assert!(cache.get(1).is_none());
        assert!(cache.get(2).is_some());
    }

    #[test]
    fn inline_segment_never_touches_the_source() {
        let registry = Arc::new(CodecRegistry::standard());
        let source = PackageSource::empty(registry);
        let segment = Segment::new_inline(
            Guid::from_u128(0x1),
            SKELETON_SEGMENT,
            Payload::Skeleton(SkeletonData {
                name: "built".into(),
                bones: Vec::new(),
            }),
        );

        let payload = segment.data(&source, &DecodeContext::default()).unwrap();
        assert!(matches!(*payload, Payload::Skeleton(_)));
    }
}
