//! Archive discovery and the mounted pack set.
//!
//! A game installation keeps its archives in a `packs` directory below the
//! game root. [`PackSet`] mounts every archive found there, unpacks them and
//! resolves `"<pack>/<file>"` asset names across them.

use std::collections::HashMap;
use std::fs;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use gpk_archive::{Entry, EntryError, ExtractOptions, ExtractReport, Extractor, GpkArchive};
use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::{Error, Result};

/// Name of the archive directory below the game root.
pub const PACKS_DIR: &str = "packs";

/// Archive file extension, compared case-insensitively.
pub const ARCHIVE_EXTENSION: &str = "gpk";

/// Suffix rules applied to asset names by pack prefix, first match wins.
const NAME_POLICY: &[(&str, &str)] = &[
    ("SysSe", ".ogg"),
    ("Se", ".ogg"),
    ("Voice", ".ogg"),
    ("BGM", "_loop.ogg"),
    ("Event", ".PNG"),
];

/// Find every archive below `<game_root>/packs`.
///
/// The `packs` directory name is matched case-insensitively. Archives are
/// returned in walk order, sorted by file name at each level.
pub fn discover(game_root: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let root = game_root.as_ref();
    if !root.is_dir() {
        return Err(Error::RootNotFound(root.to_path_buf()));
    }

    let packs = find_packs_dir(root)?.ok_or_else(|| Error::PacksNotFound(root.to_path_buf()))?;

    let mut archives = Vec::new();
    for entry in WalkDir::new(&packs).sort_by_file_name() {
        let entry = entry.map_err(|source| Error::Walk {
            path: packs.clone(),
            source,
        })?;

        if entry.file_type().is_file() && is_archive(entry.path()) {
            archives.push(entry.into_path());
        }
    }

    Ok(archives)
}

fn find_packs_dir(root: &Path) -> Result<Option<PathBuf>> {
    let exact = root.join(PACKS_DIR);
    if exact.is_dir() {
        return Ok(Some(exact));
    }

    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let matches = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.eq_ignore_ascii_case(PACKS_DIR));
        if matches && entry.file_type()?.is_dir() {
            return Ok(Some(entry.path()));
        }
    }

    Ok(None)
}

fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(ARCHIVE_EXTENSION))
}

/// Suffix appended to asset names in packs starting with `pkg`.
pub fn extension_policy(pkg: &str) -> Option<&'static str> {
    NAME_POLICY
        .iter()
        .find(|(prefix, _)| pkg.starts_with(prefix))
        .map(|&(_, suffix)| suffix)
}

/// Apply the pack naming policy to an asset's base name.
///
/// # Example
///
/// ```
/// use gpk::mount::normalize_name;
///
/// assert_eq!(normalize_name("BGM", "op"), "op_loop.ogg");
/// assert_eq!(normalize_name("Script", "s01"), "s01");
/// ```
pub fn normalize_name(pkg: &str, name: &str) -> String {
    match extension_policy(pkg) {
        Some(suffix) => format!("{name}{suffix}"),
        None => name.to_string(),
    }
}

/// Case-insensitive glob match against an entry name.
///
/// `*` also crosses `/`, so `Voice/*` matches every entry below `Voice`.
pub fn glob_matches(pattern: &Pattern, name: &str) -> bool {
    const OPTIONS: MatchOptions = MatchOptions {
        case_sensitive: false,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };

    pattern.matches_with(name, OPTIONS)
}

/// Result of unpacking one archive.
#[derive(Debug)]
pub struct UnpackSummary {
    /// Archive display name
    pub name: String,
    /// Directory the archive was unpacked into
    pub output_dir: PathBuf,
    /// Per-entry outcome
    pub report: ExtractReport,
}

/// All archives mounted from one game root.
#[derive(Debug)]
pub struct PackSet {
    root: PathBuf,
    archives: Vec<GpkArchive>,
    failed: Vec<(PathBuf, Error)>,
}

impl PackSet {
    /// Discover and open every archive under `<game_root>/packs`.
    ///
    /// Archives that fail to load are logged, recorded in
    /// [`PackSet::failed`] and skipped. An archive whose display name matches
    /// an earlier one (case-insensitive) is skipped the same way with
    /// [`Error::DuplicateName`].
    pub fn mount(game_root: impl AsRef<Path>) -> Result<Self> {
        let root = game_root.as_ref();
        let paths = discover(root)?;
        Ok(Self::from_paths(root, paths))
    }

    /// Open the given archive paths under `game_root`.
    pub fn from_paths(
        game_root: impl Into<PathBuf>,
        paths: impl IntoIterator<Item = PathBuf>,
    ) -> Self {
        let mut archives: Vec<GpkArchive> = Vec::new();
        let mut failed = Vec::new();
        let mut names: HashMap<String, usize> = HashMap::new();

        for path in paths {
            let archive = match GpkArchive::open(&path) {
                Ok(archive) => archive,
                Err(err) => {
                    warn!("Failed to mount {}: {}", path.display(), err);
                    failed.push((path, Error::Archive(err)));
                    continue;
                }
            };

            let key = archive.name().to_ascii_lowercase();
            if let Some(&first) = names.get(&key) {
                let err = Error::DuplicateName {
                    name: archive.name().to_string(),
                    first: archives[first].path().to_path_buf(),
                };
                warn!("Skipping {}: {}", path.display(), err);
                failed.push((path, err));
                continue;
            }

            info!(
                "Mounted package: {} ({} entries)",
                archive.name(),
                archive.entry_count()
            );
            names.insert(key, archives.len());
            archives.push(archive);
        }

        Self {
            root: game_root.into(),
            archives,
            failed,
        }
    }

    /// Game root the set was mounted from.
    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Successfully mounted archives, in discovery order.
    #[inline]
    pub fn archives(&self) -> &[GpkArchive] {
        &self.archives
    }

    /// Mutable access to the mounted archives.
    #[inline]
    pub fn archives_mut(&mut self) -> &mut [GpkArchive] {
        &mut self.archives
    }

    /// Archives that were not mounted, with the cause.
    #[inline]
    pub fn failed(&self) -> &[(PathBuf, Error)] {
        &self.failed
    }

    /// Number of mounted archives.
    #[inline]
    pub fn len(&self) -> usize {
        self.archives.len()
    }

    /// Whether no archive was mounted.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.archives.is_empty()
    }

    /// Find a mounted archive by display name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&GpkArchive> {
        self.archives
            .iter()
            .find(|a| a.name().eq_ignore_ascii_case(name))
    }

    /// List entry names matching `"<pack>/<pattern>"`.
    ///
    /// The pack is matched by display name and the pattern is a
    /// case-insensitive glob over entry names. An unknown pack lists
    /// nothing.
    pub fn list(&self, mask: &str) -> Result<Vec<String>> {
        let (pkg, pattern) = mask
            .split_once(['/', '\\'])
            .ok_or_else(|| Error::InvalidMask(mask.to_string()))?;
        let pattern = Pattern::new(pattern)?;

        let Some(archive) = self.get(pkg) else {
            return Ok(Vec::new());
        };

        Ok(archive
            .iter()
            .filter(|entry| glob_matches(&pattern, &entry.name))
            .map(|entry| entry.name.clone())
            .collect())
    }

    /// Unpack every archive into `output_root/<archive name>/`.
    pub fn unpack_all(
        &mut self,
        output_root: impl AsRef<Path>,
        options: ExtractOptions,
    ) -> Vec<UnpackSummary> {
        self.unpack_all_with(output_root, options, |_, _, _| ControlFlow::Continue(()))
    }

    /// Unpack every archive, reporting each entry to `on_entry`.
    ///
    /// Returning [`ControlFlow::Break`] stops the current archive and skips
    /// the remaining ones.
    pub fn unpack_all_with<F>(
        &mut self,
        output_root: impl AsRef<Path>,
        options: ExtractOptions,
        mut on_entry: F,
    ) -> Vec<UnpackSummary>
    where
        F: FnMut(&str, &Entry, &std::result::Result<u64, EntryError>) -> ControlFlow<()>,
    {
        let output_root = output_root.as_ref();
        let mut summaries = Vec::with_capacity(self.archives.len());

        for archive in &mut self.archives {
            let name = archive.name().to_string();
            let summary = unpack_one(archive, output_root, options, |entry, outcome| {
                on_entry(&name, entry, outcome)
            });
            let cancelled = summary.report.cancelled;
            summaries.push(summary);

            if cancelled {
                break;
            }
        }

        summaries
    }

    /// Unpack archives concurrently, one task per archive.
    ///
    /// Summaries are returned in mount order.
    #[cfg(feature = "parallel")]
    pub fn unpack_all_parallel<F>(
        &mut self,
        output_root: impl AsRef<Path>,
        options: ExtractOptions,
        on_entry: F,
    ) -> Vec<UnpackSummary>
    where
        F: Fn(&str, &Entry, &std::result::Result<u64, EntryError>) + Sync,
    {
        use rayon::prelude::*;

        let output_root = output_root.as_ref();

        self.archives
            .par_iter_mut()
            .map(|archive| {
                let name = archive.name().to_string();
                unpack_one(archive, output_root, options, |entry, outcome| {
                    on_entry(&name, entry, outcome);
                    ControlFlow::Continue(())
                })
            })
            .collect()
    }

    /// Read an asset by `"<pack>/<file>"` name.
    ///
    /// A loose file at `<game_root>/<path>` takes precedence over archives.
    /// Otherwise the pack's naming policy is applied to `<file>` and the
    /// entry is looked up in the archive named `<pack>`; if the policy name is
    /// absent the bare name is tried. `DFLT` payloads are inflated.
    pub fn open(&mut self, path: &str) -> Result<Vec<u8>> {
        let loose = self.root.join(path);
        if loose.is_file() {
            return Ok(fs::read(loose)?);
        }

        let (pkg, file) = path
            .split_once(['/', '\\'])
            .ok_or_else(|| Error::NotFound(path.to_string()))?;

        let archive = self
            .archives
            .iter_mut()
            .find(|a| a.name().eq_ignore_ascii_case(pkg))
            .ok_or_else(|| Error::NotFound(path.to_string()))?;

        let normalized = normalize_name(pkg, file);
        let entry = archive
            .find(&normalized)
            .or_else(|| archive.find(file))
            .cloned()
            .ok_or_else(|| Error::NotFound(path.to_string()))?;

        debug!("Resolved {} to {}:{}", path, archive.name(), entry.name);
        archive
            .read(&entry)
            .map_err(|e| Error::Archive(e.into()))
    }
}

fn unpack_one<F>(
    archive: &mut GpkArchive,
    output_root: &Path,
    options: ExtractOptions,
    on_entry: F,
) -> UnpackSummary
where
    F: FnMut(&Entry, &std::result::Result<u64, EntryError>) -> ControlFlow<()>,
{
    let name = archive.name().to_string();
    let output_dir = output_root.join(&name);

    info!("Unpacking: {}", name);
    let report = Extractor::new(&output_dir)
        .with_options(options)
        .run_with(archive, on_entry);

    if !report.is_success() {
        warn!(
            "{}: {} extracted, {} failed",
            name,
            report.extracted,
            report.failures.len()
        );
    }

    UnpackSummary {
        name,
        output_dir,
        report,
    }
}
