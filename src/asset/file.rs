//! Single-file copy asset.

use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use tracing::warn;

use super::{Asset, AssetError, ensure_parent};

/// Copies one source file to the destination, byte for byte.
#[derive(Debug, Clone)]
pub struct FileAsset {
    source: PathBuf,
}

impl FileAsset {
    /// Create an asset for the given source file.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Get the source path.
    pub fn source(&self) -> &Path {
        &self.source
    }
}

impl Asset for FileAsset {
    fn copy(&self, destination: &Path) -> Result<PathBuf, AssetError> {
        let metadata = match fs::metadata(&self.source) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(AssetError::SourceNotFound(self.source.clone()));
            }
            Err(e) => return Err(AssetError::io(&self.source)(e)),
        };
        if !metadata.is_file() {
            return Err(AssetError::NotAFile(self.source.clone()));
        }

        ensure_parent(destination)?;

        let mut input = File::open(&self.source).map_err(AssetError::io(&self.source))?;
        let mut output = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(destination)
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(AssetError::DestinationExists(destination.to_path_buf()));
            }
            Err(e) => return Err(AssetError::io(destination)(e)),
        };

        if let Err(e) = io::copy(&mut input, &mut output) {
            drop(output);
            if let Err(cleanup) = fs::remove_file(destination) {
                warn!(
                    path = %destination.display(),
                    error = %cleanup,
                    "Failed to remove partial copy"
                );
            }
            return Err(AssetError::io(destination)(e));
        }
        output.sync_all().map_err(AssetError::io(destination))?;

        Ok(destination.to_path_buf())
    }
}
