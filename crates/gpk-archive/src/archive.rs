//! GPK archive handle.
//!
//! Opening an archive reads the trailer, recovers the index table and keeps
//! the source open. Payloads are read lazily with one seek per entry.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};

use log::debug;

use crate::crypto;
use crate::decompress::decompress_envelope;
use crate::entry::{Entry, EntryHeader};
use crate::error::{EntryError, FormatError};
use crate::extract::ExtractOptions;
use crate::index::ArchiveIndex;
use crate::trailer::{read_trailer, Trailer};
use crate::Result;

/// Upper bound on the buffer reserved up front for one payload.
const PREALLOC_LIMIT: u64 = 16 << 20;

/// Chunk size used when streaming a payload to a writer.
const COPY_CHUNK: usize = 64 << 10;

/// An open GPK archive.
///
/// Generic over the byte source so archives can be read from memory as well
/// as from disk; [`GpkArchive::open`] uses a [`File`].
pub struct GpkArchive<R = File> {
    /// Underlying byte source
    source: R,
    /// Total source length in bytes
    len: u64,
    /// Trailer as read from the file
    trailer: Trailer,
    /// Location of the encrypted index blob
    index_range: Range<u64>,
    /// Parsed entry table
    index: ArchiveIndex,
}

impl GpkArchive<File> {
    /// Open a GPK archive from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Self::from_reader(file, path)
    }
}

impl<R: Read + Seek> GpkArchive<R> {
    /// Load an archive from any seekable source.
    ///
    /// `path` names the archive; it is only used for [`GpkArchive::name`]
    /// and diagnostics.
    pub fn from_reader(mut source: R, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let len = source.seek(SeekFrom::End(0))?;

        let (trailer, index_range) = read_trailer(&mut source, len)?;
        let table = read_index_table(&mut source, &index_range)?;
        let index = ArchiveIndex::parse(path, &table);

        debug!(
            "Decompressed {} index bytes to {}, {} entries in {}",
            trailer.pidx_length,
            table.len(),
            index.len(),
            index.display_name()
        );

        Ok(Self {
            source,
            len,
            trailer,
            index_range,
            index,
        })
    }

    /// Get the archive name (file name without extension).
    #[inline]
    pub fn name(&self) -> &str {
        self.index.display_name()
    }

    /// Get the path the archive was opened from.
    #[inline]
    pub fn path(&self) -> &Path {
        self.index.path()
    }

    /// Get the source length in bytes.
    #[inline]
    pub fn file_len(&self) -> u64 {
        self.len
    }

    /// Get the trailer.
    #[inline]
    pub fn trailer(&self) -> &Trailer {
        &self.trailer
    }

    /// Get the parsed index.
    #[inline]
    pub fn index(&self) -> &ArchiveIndex {
        &self.index
    }

    /// Get the number of entries.
    #[inline]
    pub fn entry_count(&self) -> usize {
        self.index.len()
    }

    /// Iterate over entries in index order.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.index.iter()
    }

    /// Find an entry by name (case-insensitive).
    #[inline]
    pub fn find(&self, name: &str) -> Option<&Entry> {
        self.index.find(name)
    }

    /// Read the stored bytes of an entry, exactly as found in the archive.
    pub fn read_raw(&mut self, entry: &Entry) -> std::result::Result<Vec<u8>, EntryError> {
        read_payload(&mut self.source, &entry.header)
    }

    /// Read an entry as a usable asset.
    ///
    /// `DFLT` payloads are inflated and Ogg compression headers stripped.
    pub fn read(&mut self, entry: &Entry) -> std::result::Result<Vec<u8>, EntryError> {
        self.read_with(entry, ExtractOptions::decoded())
    }

    /// Read an entry, post-processing it as `options` asks.
    pub fn read_with(
        &mut self,
        entry: &Entry,
        options: ExtractOptions,
    ) -> std::result::Result<Vec<u8>, EntryError> {
        read_entry(&mut self.source, entry, options)
    }

    /// Read entry by index, inflating `DFLT` payloads.
    pub fn read_index(&mut self, index: usize) -> Result<Vec<u8>> {
        let entry = self
            .index
            .get(index)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "entry index out of bounds"))?;

        Ok(self.read(&entry)?)
    }

    /// Re-read and decode the index blob, returning the raw entry table.
    pub fn index_bytes(&mut self) -> Result<Vec<u8>> {
        let range = self.index_range.clone();
        read_index_table(&mut self.source, &range)
    }

    /// Borrow the index and the source at the same time.
    pub(crate) fn split_mut(&mut self) -> (&ArchiveIndex, &mut R) {
        (&self.index, &mut self.source)
    }

    /// Consume the archive, returning the source.
    pub fn into_inner(self) -> R {
        self.source
    }
}

impl<R> std::fmt::Debug for GpkArchive<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpkArchive")
            .field("path", &self.index.path())
            .field("len", &self.len)
            .field("entries", &self.index.len())
            .finish()
    }
}

/// Read the index blob, strip the keystream and decompress it.
fn read_index_table<R: Read + Seek>(source: &mut R, range: &Range<u64>) -> Result<Vec<u8>> {
    source.seek(SeekFrom::Start(range.start))?;

    let mut blob = vec![0u8; (range.end - range.start) as usize];
    source.read_exact(&mut blob).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => FormatError::Truncated {
            detail: "short read of index blob".to_string(),
        }
        .into(),
        _ => crate::Error::Io(e),
    })?;

    crypto::apply_keystream(&mut blob);
    Ok(decompress_envelope(&blob)?)
}

/// Read `header.comprlen` bytes at `header.offset`.
pub(crate) fn read_payload<R: Read + Seek>(
    source: &mut R,
    header: &EntryHeader,
) -> std::result::Result<Vec<u8>, EntryError> {
    let expected = header.comprlen as u64;

    source
        .seek(SeekFrom::Start(header.offset as u64))
        .map_err(EntryError::Read)?;

    let mut buffer = Vec::with_capacity(expected.min(PREALLOC_LIMIT) as usize);
    source
        .by_ref()
        .take(expected)
        .read_to_end(&mut buffer)
        .map_err(EntryError::Read)?;

    if (buffer.len() as u64) < expected {
        return Err(EntryError::Truncated {
            expected,
            actual: buffer.len() as u64,
        });
    }

    Ok(buffer)
}

/// Stream `header.comprlen` bytes at `header.offset` into `writer`.
///
/// `path` names the destination for write errors. Returns the number of
/// bytes copied.
pub(crate) fn copy_payload<R: Read + Seek, W: Write>(
    source: &mut R,
    header: &EntryHeader,
    writer: &mut W,
    path: &Path,
) -> std::result::Result<u64, EntryError> {
    let expected = header.comprlen as u64;

    source
        .seek(SeekFrom::Start(header.offset as u64))
        .map_err(EntryError::Read)?;

    let mut chunk = vec![0u8; (expected as usize).min(COPY_CHUNK)];
    let mut copied = 0u64;

    while copied < expected {
        let want = (expected - copied).min(chunk.len() as u64) as usize;
        let read = match source.read(&mut chunk[..want]) {
            Ok(0) => {
                return Err(EntryError::Truncated {
                    expected,
                    actual: copied,
                })
            }
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(EntryError::Read(e)),
        };

        writer
            .write_all(&chunk[..read])
            .map_err(|source| EntryError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        copied += read as u64;
    }

    Ok(copied)
}

/// Whether `options` make the written bytes differ from the stored ones.
pub(crate) fn transforms(entry: &Entry, options: ExtractOptions) -> bool {
    (options.decode_payloads && entry.header.is_deflated())
        || (options.strip_compr_header && entry.has_compr_header())
}

/// Read a payload and apply the post-processing `options` ask for.
///
/// `DFLT` payloads are inflated when `decode_payloads` is set. The Ogg
/// compression header is stripped when `strip_compr_header` is set, unless
/// the bytes are still a deflate envelope.
pub(crate) fn read_entry<R: Read + Seek>(
    source: &mut R,
    entry: &Entry,
    options: ExtractOptions,
) -> std::result::Result<Vec<u8>, EntryError> {
    let header = &entry.header;
    let mut data = read_payload(source, header)?;

    if header.is_deflated() {
        if !options.decode_payloads {
            return Ok(data);
        }

        data = decompress_envelope(&data)?;
        if data.len() != header.uncomprlen as usize {
            debug!(
                "inflated {} bytes, header declares {}",
                data.len(),
                header.uncomprlen
            );
        }
    }

    if options.strip_compr_header {
        let start = data.len() - entry.strip_compr_header(&data).len();
        data.drain(..start);
    }

    Ok(data)
}
