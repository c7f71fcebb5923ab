//! Common utilities for the GPK crates.
//!
//! This crate provides the foundational pieces shared by the archive reader:
//!
//! - [`BinaryReader`] - Bounds-checked cursor over byte slices
//! - [`text`] - UTF-16LE decoding with surrogate-pair handling

mod error;
mod reader;

pub mod text;

pub use error::{Error, Result};
pub use reader::BinaryReader;
