//! Index table parsing and the in-memory archive index.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use gpk_common::text::decode_utf16le;
use gpk_common::BinaryReader;

use crate::entry::{sanitize_name, Entry, EntryHeader};

/// Parse a decompressed index table into entries.
///
/// Each record is a `u16` character count, that many UTF-16LE code units, and
/// an [`EntryHeader`]. Parsing stops quietly at a zero count or at a record
/// that does not fit in the remaining bytes; what was read up to that point
/// is returned. Records whose name sanitizes to nothing are skipped, but
/// their header bytes are still consumed.
pub fn parse_entries(table: &[u8]) -> Vec<Entry> {
    let mut reader = BinaryReader::new(table);
    let mut entries = Vec::new();

    loop {
        let Ok(count) = reader.read_u16() else {
            break;
        };
        if count == 0 {
            break;
        }

        let Ok(name_bytes) = reader.read_bytes(count as usize * 2) else {
            break;
        };
        let name = sanitize_name(&decode_utf16le(name_bytes));

        if name.is_empty() {
            reader.advance(EntryHeader::SIZE);
            continue;
        }

        let Ok(header) = EntryHeader::parse(&mut reader) else {
            break;
        };
        entries.push(Entry { name, header });
    }

    entries
}

/// Parsed table of entries for one archive.
///
/// Entries keep their on-disk order; duplicate names are all retained.
/// Lookups by name are case-insensitive and resolve to the first match.
#[derive(Debug, Clone)]
pub struct ArchiveIndex {
    path: PathBuf,
    name: String,
    entries: Vec<Entry>,
    lookup: HashMap<String, usize>,
}

impl ArchiveIndex {
    /// Build an index over `entries` for the archive at `path`.
    pub fn new(path: impl Into<PathBuf>, entries: Vec<Entry>) -> Self {
        let path = path.into();
        let name = display_name(&path);

        let mut lookup = HashMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            lookup.entry(lookup_key(&entry.name)).or_insert(i);
        }

        Self {
            path,
            name,
            entries,
            lookup,
        }
    }

    /// Parse a decompressed index table.
    pub fn parse(path: impl Into<PathBuf>, table: &[u8]) -> Self {
        Self::new(path, parse_entries(table))
    }

    /// Path of the archive this index was read from.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Archive file name without directory or extension.
    #[inline]
    pub fn display_name(&self) -> &str {
        &self.name
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in index order.
    #[inline]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Iterate over entries in index order.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    /// Get entry by index.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    /// Find an entry by name (case-insensitive, `\` treated as `/`).
    pub fn find(&self, name: &str) -> Option<&Entry> {
        self.lookup
            .get(&lookup_key(name))
            .map(|&i| &self.entries[i])
    }

    /// Whether an entry with this name exists.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.lookup.contains_key(&lookup_key(name))
    }
}

impl<'a> IntoIterator for &'a ArchiveIndex {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

fn lookup_key(name: &str) -> String {
    name.replace('\\', "/").to_ascii_lowercase()
}

/// Strip the directory prefix and the extension from an archive path.
///
/// Both `/` and `\` count as directory separators regardless of platform.
fn display_name(path: &Path) -> String {
    let full = path.to_string_lossy();
    let file_name = full.rsplit(['/', '\\']).next().unwrap_or_default();

    match file_name.rfind('.') {
        Some(dot) => file_name[..dot].to_string(),
        None => file_name.to_string(),
    }
}
