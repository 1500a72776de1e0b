//! Backup assets.
//!
//! An asset describes what to back up and knows how to materialize it at a
//! destination path:
//!
//! - [`FileAsset`] copies one file verbatim
//! - [`ArchiveAsset`] streams any number of files and directories into a zip

mod archive;
mod file;

pub use archive::{ARCHIVE_EXTENSION, ArchiveAsset, ArchiveSummary, SkippedEntry, with_archive_extension};
pub use file::FileAsset;

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while producing an artifact.
#[derive(Debug, Error)]
pub enum AssetError {
    /// The source path does not exist.
    #[error("source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// The source exists but is not a regular file.
    #[error("not a regular file: {}", .0.display())]
    NotAFile(PathBuf),

    /// The destination path is already taken.
    #[error("destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    /// Filesystem error on a specific path.
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Zip container error on a specific artifact.
    #[error("archive error on '{}': {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

impl AssetError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| AssetError::Io { path, source }
    }
}

/// Something that can be copied to a destination, producing one artifact.
pub trait Asset: Send + Sync {
    /// Materialize the asset at `destination` and return the artifact path.
    ///
    /// The returned path may differ from `destination` (archives append their
    /// extension).
    fn copy(&self, destination: &Path) -> Result<PathBuf, AssetError>;
}

/// Create the parent directory of `path` if it is missing.
pub(crate) fn ensure_parent(path: &Path) -> Result<(), AssetError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(AssetError::io(parent))
        }
        _ => Ok(()),
    }
}
