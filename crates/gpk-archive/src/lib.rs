//! GPK archive reader.
//!
//! A GPK file is a flat container of game assets followed by an obfuscated
//! index and a fixed trailer:
//!
//! - a 32-byte trailer at the end of the file carrying two signatures and the
//!   length of the index blob
//! - the index blob, XORed with a repeating 16-byte key and wrapped in a
//!   size-prefixed zlib envelope
//! - an entry table of UTF-16LE names, each followed by a 23-byte header
//!   pointing at the stored payload
//!
//! # Example
//!
//! ```no_run
//! use gpk_archive::{Extractor, GpkArchive};
//!
//! let mut archive = GpkArchive::open("packs/BGM.GPK")?;
//!
//! for entry in archive.iter() {
//!     println!("{}: {} bytes", entry.name, entry.header.comprlen);
//! }
//!
//! let report = Extractor::new("out/BGM").run(&mut archive);
//! println!("{} extracted, {} failed", report.extracted, report.failures.len());
//! # Ok::<(), gpk_archive::Error>(())
//! ```

mod archive;
mod entry;
mod error;
mod extract;
mod index;

pub mod crypto;
pub mod decompress;
pub mod trailer;

pub use archive::GpkArchive;
pub use entry::{sanitize_name, Entry, EntryHeader};
pub use error::{DecodeError, EntryError, Error, FormatError, Result};
pub use extract::{ExtractOptions, ExtractReport, Extractor};
pub use index::{parse_entries, ArchiveIndex};
pub use trailer::Trailer;
