//! Error types for the GPK facade.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from archive discovery and lookup.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Archive error.
    #[error("{0}")]
    Archive(#[from] gpk_archive::Error),

    /// Directory walk failed.
    #[error("failed to scan {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// The game root does not exist or is not a directory.
    #[error("game directory not found: {}", .0.display())]
    RootNotFound(PathBuf),

    /// The game root has no `packs` directory.
    #[error("packs directory not found under {}", .0.display())]
    PacksNotFound(PathBuf),

    /// No archive or entry matches the requested name.
    #[error("file not found: {0}")]
    NotFound(String),

    /// Another mounted archive already uses this display name.
    #[error("archive name {name} already mounted from {}", first.display())]
    DuplicateName { name: String, first: PathBuf },

    /// A listing mask is not of the form `<pack>/<pattern>`.
    #[error("invalid mask format: {0}")]
    InvalidMask(String),

    /// A glob pattern failed to compile.
    #[error("invalid pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

/// Result type for facade operations.
pub type Result<T> = std::result::Result<T, Error>;
