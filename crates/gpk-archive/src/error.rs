//! Error types for the GPK archive crate.
//!
//! Archive-level failures ([`FormatError`], [`DecodeError`]) make an archive
//! unusable. Entry-level failures ([`EntryError`]) only affect the entry being
//! read or extracted.

use std::path::PathBuf;

use thiserror::Error;

/// Errors in the archive trailer.
#[derive(Debug, Error)]
pub enum FormatError {
    /// A trailer signature did not match.
    #[error("broken {field} signature in archive trailer")]
    BadSignature { field: &'static str },

    /// The trailer or the index range does not fit in the file.
    #[error("archive truncated: {detail}")]
    Truncated { detail: String },
}

/// Errors while recovering the index table.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The envelope declares an uncompressed size of zero.
    #[error("invalid uncompressed size 0 in compressed data")]
    EmptySize,

    /// The blob is too short to hold the 4-byte size prefix.
    #[error("compressed data too short: need at least 4 bytes, have {len}")]
    Truncated { len: usize },

    /// The inflate stream is corrupt, incomplete or the wrong size.
    #[error("decompression failed: {detail}")]
    Codec { detail: String },
}

/// Errors affecting a single entry.
#[derive(Debug, Error)]
pub enum EntryError {
    /// The archive ended before the declared payload did.
    #[error("payload truncated: expected {expected} bytes, read {actual}")]
    Truncated { expected: u64, actual: u64 },

    /// Seeking or reading the payload failed.
    #[error("failed to read payload: {0}")]
    Read(#[source] std::io::Error),

    /// The stored payload could not be inflated.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// An output directory could not be created.
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The output file could not be created or written.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur when working with GPK archives.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Common library error.
    #[error("{0}")]
    Common(#[from] gpk_common::Error),

    /// Bad trailer.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Undecodable index.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Entry-level failure.
    #[error(transparent)]
    Entry(#[from] EntryError),
}

/// Result type for GPK operations.
pub type Result<T> = std::result::Result<T, Error>;
