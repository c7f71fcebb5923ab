//! GPK - game archive unpacking library.
//!
//! This crate provides a unified interface to the GPK crates:
//!
//! - [`gpk_common`] - Common utilities (binary reading, UTF-16 text)
//! - [`gpk_archive`] - Single archive reading and extraction
//! - [`mount`] - Discovery and unpacking of every archive under a game root
//!
//! # Example
//!
//! ```no_run
//! use gpk::prelude::*;
//!
//! // Mount every archive under `<root>/packs`
//! let mut packs = PackSet::mount("Game")?;
//!
//! // Unpack them next to the game
//! for summary in packs.unpack_all("Game", ExtractOptions::default()) {
//!     println!("{}: {} files", summary.name, summary.report.extracted);
//! }
//! # Ok::<(), gpk::Error>(())
//! ```

// Re-export all sub-crates
pub use gpk_archive as archive;
pub use gpk_common as common;

mod error;
pub mod mount;

pub use error::{Error, Result};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use gpk_archive::{
        ArchiveIndex, Entry, EntryHeader, ExtractOptions, ExtractReport, Extractor, GpkArchive,
    };
    pub use gpk_common::BinaryReader;

    pub use crate::mount::{discover, glob_matches, normalize_name, PackSet, UnpackSummary};
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
