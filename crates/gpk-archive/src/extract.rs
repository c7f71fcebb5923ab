//! Extraction of archive entries to a directory tree.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Seek, Write};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::archive::{copy_payload, read_entry, transforms, GpkArchive};
use crate::entry::Entry;
use crate::error::EntryError;

/// Extraction settings.
///
/// The default writes every payload exactly as stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Inflate `DFLT` payloads instead of writing the stored bytes.
    pub decode_payloads: bool,
    /// Drop the per-entry compression header in front of Ogg streams.
    pub strip_compr_header: bool,
}

impl ExtractOptions {
    /// Settings that turn every payload into a usable asset.
    pub const fn decoded() -> Self {
        Self {
            decode_payloads: true,
            strip_compr_header: true,
        }
    }
}

/// Outcome of extracting one archive.
#[derive(Debug, Default)]
pub struct ExtractReport {
    /// Entries written successfully
    pub extracted: usize,
    /// Total bytes written
    pub bytes_written: u64,
    /// Entries that failed, with the cause
    pub failures: Vec<(String, EntryError)>,
    /// Whether the caller stopped extraction early
    pub cancelled: bool,
}

impl ExtractReport {
    /// True when every visited entry was written.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Writes every entry of an archive below an output root.
///
/// Each entry lands at `output_root/<entry name>`, overwriting any existing
/// file. A failure on one entry is recorded and extraction moves on.
#[derive(Debug, Clone)]
pub struct Extractor {
    output_root: PathBuf,
    options: ExtractOptions,
}

impl Extractor {
    /// Create an extractor writing raw stored bytes below `output_root`.
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            options: ExtractOptions::default(),
        }
    }

    /// Replace the extraction settings.
    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    /// Get the output root.
    #[inline]
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Extract every entry in index order.
    pub fn run<R: Read + Seek>(&self, archive: &mut GpkArchive<R>) -> ExtractReport {
        self.run_with(archive, |_, _| ControlFlow::Continue(()))
    }

    /// Extract every entry, reporting each outcome to `on_entry`.
    ///
    /// Returning [`ControlFlow::Break`] from the callback stops before the
    /// next entry.
    pub fn run_with<R, F>(&self, archive: &mut GpkArchive<R>, on_entry: F) -> ExtractReport
    where
        R: Read + Seek,
        F: FnMut(&Entry, &Result<u64, EntryError>) -> ControlFlow<()>,
    {
        self.run_matching(archive, |_| true, on_entry)
    }

    /// Extract only the entries accepted by `select`.
    ///
    /// Skipped entries are neither reported to `on_entry` nor counted.
    pub fn run_matching<R, P, F>(
        &self,
        archive: &mut GpkArchive<R>,
        mut select: P,
        mut on_entry: F,
    ) -> ExtractReport
    where
        R: Read + Seek,
        P: FnMut(&Entry) -> bool,
        F: FnMut(&Entry, &Result<u64, EntryError>) -> ControlFlow<()>,
    {
        let (index, source) = archive.split_mut();
        let mut report = ExtractReport::default();

        for entry in index.iter().filter(|e| select(*e)) {
            let outcome = self.extract_entry(source, entry);
            let flow = on_entry(entry, &outcome);

            match outcome {
                Ok(written) => {
                    debug!("Extracted: {}", entry.name);
                    report.extracted += 1;
                    report.bytes_written += written;
                }
                Err(err) => {
                    warn!("{}: {}: {}", index.display_name(), entry.name, err);
                    report.failures.push((entry.name.clone(), err));
                }
            }

            if flow.is_break() {
                report.cancelled = true;
                break;
            }
        }

        report
    }

    /// Extract a single entry read from `source`.
    ///
    /// Payloads written verbatim are streamed to disk; the rest are read
    /// whole and post-processed first. Returns the number of bytes written.
    pub fn extract_entry<R: Read + Seek>(
        &self,
        source: &mut R,
        entry: &Entry,
    ) -> Result<u64, EntryError> {
        let output_path = self.output_root.join(entry.output_path());

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent).map_err(|source| EntryError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        if !transforms(entry, self.options) {
            return stream_entry(source, entry, &output_path);
        }

        let data = read_entry(source, entry, self.options)?;

        fs::write(&output_path, &data).map_err(|source| EntryError::Write {
            path: output_path.clone(),
            source,
        })?;

        Ok(data.len() as u64)
    }
}

fn stream_entry<R: Read + Seek>(
    source: &mut R,
    entry: &Entry,
    output_path: &Path,
) -> Result<u64, EntryError> {
    let write_error = |source| EntryError::Write {
        path: output_path.to_path_buf(),
        source,
    };

    let file = File::create(output_path).map_err(write_error)?;
    let mut writer = BufWriter::new(file);

    match copy_payload(source, &entry.header, &mut writer, output_path) {
        Ok(written) => {
            writer.flush().map_err(write_error)?;
            Ok(written)
        }
        Err(err) => {
            drop(writer);
            // Leave no partial file behind.
            let _ = fs::remove_file(output_path);
            Err(err)
        }
    }
}
