//! Zip archive asset.
//!
//! Walks each source path and streams every file it finds into a single zip
//! container. Entry names keep the source's own name as the root, so archiving
//! `/home/me/a` containing `x.txt` and `b/y.txt` yields `a/x.txt` and
//! `a/b/y.txt`.
//!
//! Missing sources are skipped without complaint. A file or directory that
//! cannot be read is logged and left out; the rest of the archive is still
//! written. Only failures writing the container itself abort the artifact.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{Asset, AssetError, ensure_parent};

/// Canonical extension of the container format.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Size of the chunks streamed from each source file into the container.
const BUFFER_SIZE: usize = 1024;

/// Entries at or above this size need zip64 headers.
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

type Container = ZipWriter<BufWriter<File>>;

/// Append `.zip` to `destination` unless it already ends with it.
pub fn with_archive_extension(destination: &Path) -> PathBuf {
    let suffix = format!(".{ARCHIVE_EXTENSION}");
    if destination.to_string_lossy().ends_with(&suffix) {
        return destination.to_path_buf();
    }
    let mut raw: OsString = destination.as_os_str().to_os_string();
    raw.push(&suffix);
    PathBuf::from(raw)
}

/// A source path left out of an archive, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    /// The path that could not be archived.
    pub path: PathBuf,
    /// Human-readable reason.
    pub reason: String,
}

/// Outcome of archiving a set of sources.
#[derive(Debug, Clone, Default)]
pub struct ArchiveSummary {
    /// Path of the written container.
    pub path: PathBuf,
    /// Entry names written, in order.
    pub entries: Vec<String>,
    /// Paths that were found but could not be archived.
    pub skipped: Vec<SkippedEntry>,
}

impl ArchiveSummary {
    fn skip(&mut self, path: &Path, reason: impl ToString) {
        let reason = reason.to_string();
        warn!(path = %path.display(), %reason, "Leaving entry out of archive");
        self.skipped.push(SkippedEntry {
            path: path.to_path_buf(),
            reason,
        });
    }
}

/// Why streaming a single entry stopped early.
enum EntryError {
    /// Reading the source failed; the container is still usable.
    Read(std::io::Error),
    /// Writing the container failed; the artifact is lost.
    Write(std::io::Error),
}

/// Archives an ordered list of files and directories into one zip file.
#[derive(Debug, Clone)]
pub struct ArchiveAsset {
    sources: Vec<PathBuf>,
}

impl ArchiveAsset {
    /// Create an archive asset for the given sources.
    pub fn new<I, P>(sources: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
        }
    }

    /// Create an archive asset for a single source.
    pub fn single(source: impl Into<PathBuf>) -> Self {
        Self {
            sources: vec![source.into()],
        }
    }

    /// Get the source paths.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// Write the archive and report what went in.
    ///
    /// `.zip` is appended to `destination` when missing. The destination must
    /// not exist yet. On a container write failure the partial file is removed.
    pub fn archive(&self, destination: &Path) -> Result<ArchiveSummary, AssetError> {
        let path = with_archive_extension(destination);
        ensure_parent(&path)?;

        let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(AssetError::DestinationExists(path));
            }
            Err(e) => return Err(AssetError::io(&path)(e)),
        };

        let mut writer = ZipWriter::new(BufWriter::new(file));
        let mut summary = ArchiveSummary {
            path: path.clone(),
            ..Default::default()
        };

        match self.write_sources(&mut writer, &mut summary) {
            Ok(()) => {}
            Err(e) => {
                drop(writer);
                discard_partial(&path);
                return Err(e);
            }
        }

        let finished = writer
            .finish()
            .map_err(|source| AssetError::Archive {
                path: path.clone(),
                source,
            })
            .and_then(|mut inner| inner.flush().map_err(AssetError::io(&path)));
        if let Err(e) = finished {
            discard_partial(&path);
            return Err(e);
        }

        Ok(summary)
    }

    fn write_sources(
        &self,
        writer: &mut Container,
        summary: &mut ArchiveSummary,
    ) -> Result<(), AssetError> {
        let mut buffer = [0u8; BUFFER_SIZE];
        for source in &self.sources {
            if fs::symlink_metadata(source).is_err() {
                debug!(path = %source.display(), "Archive source does not exist, skipping");
                continue;
            }
            let name = root_entry_name(source);
            add_path(writer, source, &name, &mut buffer, summary)?;
        }
        Ok(())
    }
}

impl Asset for ArchiveAsset {
    fn copy(&self, destination: &Path) -> Result<PathBuf, AssetError> {
        self.archive(destination).map(|summary| summary.path)
    }
}

/// Name used for a top-level source: its final component.
fn root_entry_name(source: &Path) -> String {
    if let Some(name) = source.file_name() {
        return name.to_string_lossy().into_owned();
    }
    // `.`, `..` or `/` have no final component; name them after what they
    // resolve to.
    source
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "root".to_string())
}

/// Recursively add `path` to the container under `entry`.
fn add_path(
    writer: &mut Container,
    path: &Path,
    entry: &str,
    buffer: &mut [u8],
    summary: &mut ArchiveSummary,
) -> Result<(), AssetError> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) => {
            summary.skip(path, e);
            return Ok(());
        }
    };

    if metadata.is_dir() {
        if fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink()) {
            summary.skip(path, "symlinked directory not followed");
            return Ok(());
        }
        let children = match read_children(path) {
            Ok(children) => children,
            Err(e) => {
                summary.skip(path, e);
                return Ok(());
            }
        };
        for child in children {
            let child_name = match child.file_name() {
                Some(name) => format!("{entry}/{}", name.to_string_lossy()),
                None => continue,
            };
            add_path(writer, &child, &child_name, buffer, summary)?;
        }
        return Ok(());
    }

    let mut input = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            summary.skip(path, e);
            return Ok(());
        }
    };

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(metadata.len() >= ZIP64_THRESHOLD);
    writer
        .start_file(entry, options)
        .map_err(|source| AssetError::Archive {
            path: summary.path.clone(),
            source,
        })?;

    match stream_entry(&mut input, writer, buffer) {
        Ok(()) => {
            summary.entries.push(entry.to_string());
            Ok(())
        }
        Err(EntryError::Read(e)) => {
            // Drop the truncated entry so the container matches the summary.
            writer.abort_file().map_err(|source| AssetError::Archive {
                path: summary.path.clone(),
                source,
            })?;
            summary.skip(path, e);
            Ok(())
        }
        Err(EntryError::Write(e)) => Err(AssetError::io(&summary.path)(e)),
    }
}

/// Directory children sorted by name, for reproducible archives.
fn read_children(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut children = Vec::new();
    for entry in fs::read_dir(dir)? {
        children.push(entry?.path());
    }
    children.sort();
    Ok(children)
}

fn stream_entry(
    input: &mut File,
    writer: &mut Container,
    buffer: &mut [u8],
) -> Result<(), EntryError> {
    loop {
        let n = input.read(buffer).map_err(EntryError::Read)?;
        if n == 0 {
            return Ok(());
        }
        writer.write_all(&buffer[..n]).map_err(EntryError::Write)?;
    }
}

fn discard_partial(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "Failed to remove partial archive");
    }
}
