//! Error types that can be emitted from this library

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

use crate::guid::Guid;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent wrapper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent wrapper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// Transparent wrapper for [`std::string::FromUtf8Error`]
    #[error(transparent)]
    UTF8Error(#[from] std::string::FromUtf8Error),

    /// file is not a TPAC package
    #[error("file is not a TPAC package")]
    NotAPackage,

    /// unsupported package version
    #[error("unsupported package version {0}")]
    UnsupportedVersion(u32),

    /// a decoder consumed a different number of bytes than the format declared
    #[error("decoder consumed {actual} bytes at offset {offset}, expected {expected}")]
    SizeMismatch {
        expected: u64,
        actual: u64,
        offset: u64,
    },

    /// decompressed data did not match the declared uncompressed size
    #[error("decompressed to {actual} bytes, declared size is {expected}")]
    Decompression { expected: usize, actual: usize },

    /// structurally invalid data
    #[error("corrupt data: {0}")]
    Corrupt(String),

    /// recognized but not supported for decoding
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// failure while decoding one asset, with identifying context
    #[error("asset {guid} ({name}) failed to decode")]
    Asset {
        guid: Guid,
        name: String,
        #[source]
        source: Box<Error>,
    },

    /// failure while decoding one data segment, with identifying context
    #[error("segment of type {type_guid} owned by {owner} at offset {offset} failed to decode")]
    Segment {
        type_guid: Guid,
        owner: Guid,
        offset: u64,
        #[source]
        source: Box<Error>,
    },

    /// the directory given to the asset manager does not exist
    #[error("directory not found: {0}")]
    DirectoryNotFound(PathBuf),
}

impl Error {
    /// Wrap a lower-level error with the owning asset's identity.
    pub fn for_asset(self, guid: Guid, name: &str) -> Error {
        Error::Asset {
            guid,
            name: name.to_owned(),
            source: Box::new(self),
        }
    }

    /// Wrap a lower-level error with the owning segment's identity.
    pub fn for_segment(self, type_guid: Guid, owner: Guid, offset: u64) -> Error {
        Error::Segment {
            type_guid,
            owner,
            offset,
            source: Box::new(self),
        }
    }
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
