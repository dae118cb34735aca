//! Segment compression and decompression handling.

use binrw::{BinRead, BinWrite};
use tracing::instrument;

use crate::error::{Error, Result};

/// Payloads shorter than this are always stored raw. LZ4 framing can expand
/// tiny payloads past their own length.
pub const COMPRESSION_THRESHOLD: usize = 16;

/// Identifies the storage format used to compress one data segment.
///
/// Segments written through [`crate::write::PackageWriter`] pick their
/// method automatically: [`CompressionKind::Lz4`] when it round-trips and
/// the payload is at least [`COMPRESSION_THRESHOLD`] bytes, raw otherwise.
#[derive(BinRead, BinWrite, Debug, Copy, Clone, Default, PartialEq, Eq)]
#[brw(repr = u8)]
pub enum CompressionKind {
    /// Stores the data as it is
    None = 0,

    /// Compress the data using LZ4 (written with the high-compression
    /// encoder by the original tool; the block stream is plain LZ4)
    #[default]
    Lz4 = 1,
}

/// Decompress one segment's stored bytes to exactly `actual_size` bytes.
///
/// The LZ4 block stream does not self-delimit, so the declared uncompressed
/// size is mandatory. Producing any other length is fatal for the segment.
#[instrument(skip(data), err)]
pub fn decompress(data: &[u8], kind: CompressionKind, actual_size: usize) -> Result<Vec<u8>> {
    match kind {
        CompressionKind::None => {
            if data.len() != actual_size {
                return Err(Error::Decompression {
                    expected: actual_size,
                    actual: data.len(),
                });
            }
            Ok(data.to_vec())
        }
        CompressionKind::Lz4 => {
            let out = lz4_flex::block::decompress(data, actual_size).map_err(|_| {
                Error::Decompression {
                    expected: actual_size,
                    actual: 0,
                }
            })?;
            if out.len() != actual_size {
                return Err(Error::Decompression {
                    expected: actual_size,
                    actual: out.len(),
                });
            }
            Ok(out)
        }
    }
}

/// Compress one segment payload, returning the stored bytes and the method.
///
/// Payloads under [`COMPRESSION_THRESHOLD`] bytes are never compressed.
/// Larger payloads are compressed and verified by decompressing back;
/// anything that fails to round-trip byte-for-byte is stored raw.
pub fn compress(data: &[u8]) -> (Vec<u8>, CompressionKind) {
    if data.len() < COMPRESSION_THRESHOLD {
        return (data.to_vec(), CompressionKind::None);
    }

    let packed = lz4_flex::block::compress(data);
    match lz4_flex::block::decompress(&packed, data.len()) {
        Ok(back) if back == data => (packed, CompressionKind::Lz4),
        _ => (data.to_vec(), CompressionKind::None),
    }
}
