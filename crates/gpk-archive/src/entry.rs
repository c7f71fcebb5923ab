//! GPK index entries.

use std::ops::Range;
use std::path::{Component, Path, PathBuf};

use gpk_common::BinaryReader;

/// Per-entry record following each name in the index table.
///
/// A packed 23-byte structure, little-endian, read field by field in file
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EntryHeader {
    /// Asset sub-version (matches the `script.gpk.*` suffix)
    pub sub_version: u16,
    /// Major version, always 1
    pub version: u16,
    /// Reserved, always 0
    pub zero: u16,
    /// Offset of the payload within the archive file
    pub offset: u32,
    /// Stored payload length
    pub comprlen: u32,
    /// `"DFLT"` when the payload is deflated, blank otherwise
    pub dflt: [u8; 4],
    /// Inflated length when `dflt` is set, else 0
    pub uncomprlen: u32,
    /// Length of the extra per-entry compression header
    pub comprheadlen: u8,
}

impl EntryHeader {
    /// Size of the packed record in bytes.
    pub const SIZE: usize = 23;

    /// Tag marking a deflated payload.
    pub const DEFLATE_TAG: [u8; 4] = *b"DFLT";

    /// Read a header from the cursor.
    pub fn parse(reader: &mut BinaryReader<'_>) -> gpk_common::Result<Self> {
        Ok(Self {
            sub_version: reader.read_u16()?,
            version: reader.read_u16()?,
            zero: reader.read_u16()?,
            offset: reader.read_u32()?,
            comprlen: reader.read_u32()?,
            dflt: reader.read_array()?,
            uncomprlen: reader.read_u32()?,
            comprheadlen: reader.read_u8()?,
        })
    }

    /// Whether the stored payload is itself a compressed envelope.
    #[inline]
    pub fn is_deflated(&self) -> bool {
        self.dflt == Self::DEFLATE_TAG
    }

    /// Absolute byte range of the stored payload.
    #[inline]
    pub fn payload_range(&self) -> Range<u64> {
        let start = self.offset as u64;
        start..start + self.comprlen as u64
    }
}

/// A named entry in the archive index.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Entry {
    /// Sanitized relative path, `/`-separated
    pub name: String,
    /// Binary header
    pub header: EntryHeader,
}

impl Entry {
    /// Get the relative output path for extraction.
    ///
    /// Empty, `.` and `..` components are dropped so the path always stays
    /// below the directory it is joined onto.
    pub fn output_path(&self) -> PathBuf {
        Path::new(&self.name)
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part),
                _ => None,
            })
            .collect()
    }

    /// Get the file extension, if any.
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
    }

    /// Whether the entry is an Ogg stream, judged by its extension.
    pub fn is_ogg(&self) -> bool {
        self.extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("ogg"))
    }

    /// Whether [`Entry::strip_compr_header`] can change this entry's payload.
    pub fn has_compr_header(&self) -> bool {
        self.is_ogg() && self.header.comprheadlen > 0
    }

    /// Drop the per-entry compression header from an Ogg payload.
    ///
    /// Skips `comprheadlen` bytes, then moves to the first `OggS` capture
    /// pattern if one follows. Non-Ogg entries, entries without a header and
    /// payloads no longer than the header are returned unchanged.
    pub fn strip_compr_header<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        let skip = self.header.comprheadlen as usize;
        if !self.has_compr_header() || skip >= data.len() {
            return data;
        }

        let body = &data[skip..];
        match body.windows(OGG_MAGIC.len()).position(|w| w == OGG_MAGIC) {
            Some(start) => &body[start..],
            None => body,
        }
    }
}

/// Capture pattern opening every Ogg page.
const OGG_MAGIC: &[u8; 4] = b"OggS";

/// Clean a decoded entry name for use as a relative path.
///
/// The name is cut at its first NUL, both `\` and `/` become `/`, and control
/// characters plus `< > : " | ? *` are removed. The result may be empty.
pub fn sanitize_name(raw: &str) -> String {
    let raw = raw.split('\0').next().unwrap_or_default();

    raw.chars()
        .filter_map(|c| match c {
            '\\' | '/' => Some('/'),
            '<' | '>' | ':' | '"' | '|' | '?' | '*' => None,
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect()
}
