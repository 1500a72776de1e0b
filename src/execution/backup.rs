//! Backup strategies.
//!
//! Each strategy knows where its artifacts go and how to produce one at a
//! given target path:
//!
//! - [`CopyBackup`] copies a single file
//! - [`ArchiveBackup`] zips one or more paths
//! - [`RemoteBackup`] zips, uploads the zip, and optionally drops the local copy

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::asset::{Asset, ArchiveAsset, AssetError, FileAsset};
use crate::core::job::JobType;
use crate::core::types::JobId;
use crate::transfer::{Credentials, Shipper, TransferError};

/// Errors that can occur while performing a backup.
#[derive(Debug, Error)]
pub enum BackupError {
    /// Producing the local artifact failed.
    #[error(transparent)]
    Asset(#[from] AssetError),

    /// Shipping the artifact failed.
    #[error(transparent)]
    Transfer(#[from] TransferError),
}

/// A way of producing one backup artifact.
pub trait Backup: Send + Sync {
    /// The configuration tag this strategy corresponds to.
    fn kind(&self) -> JobType;

    /// Local directory artifacts are written under.
    fn destination(&self) -> &Path;

    /// Produce an artifact at `target` and return its final path.
    fn perform(&self, job: &JobId, target: &Path) -> Result<PathBuf, BackupError>;
}

/// Copies one file verbatim.
#[derive(Debug, Clone)]
pub struct CopyBackup {
    asset: FileAsset,
    destination: PathBuf,
}

impl CopyBackup {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            asset: FileAsset::new(source),
            destination: destination.into(),
        }
    }
}

impl Backup for CopyBackup {
    fn kind(&self) -> JobType {
        JobType::File
    }

    fn destination(&self) -> &Path {
        &self.destination
    }

    fn perform(&self, _job: &JobId, target: &Path) -> Result<PathBuf, BackupError> {
        Ok(self.asset.copy(target)?)
    }
}

/// Archives an ordered set of paths into a zip.
#[derive(Debug, Clone)]
pub struct ArchiveBackup {
    asset: ArchiveAsset,
    destination: PathBuf,
}

impl ArchiveBackup {
    pub fn new<I, P>(sources: I, destination: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            asset: ArchiveAsset::new(sources),
            destination: destination.into(),
        }
    }

    /// Get the archived sources.
    pub fn sources(&self) -> &[PathBuf] {
        self.asset.sources()
    }
}

impl Backup for ArchiveBackup {
    fn kind(&self) -> JobType {
        JobType::Files
    }

    fn destination(&self) -> &Path {
        &self.destination
    }

    fn perform(&self, job: &JobId, target: &Path) -> Result<PathBuf, BackupError> {
        archive(&self.asset, job, target)
    }
}

fn archive(asset: &ArchiveAsset, job: &JobId, target: &Path) -> Result<PathBuf, BackupError> {
    let summary = asset.archive(target)?;
    debug!(
        job = %job,
        path = %summary.path.display(),
        entries = summary.entries.len(),
        skipped = summary.skipped.len(),
        "Archive written"
    );
    Ok(summary.path)
}

/// Archives locally, then ships the archive to a remote directory.
///
/// Upload failures are logged and the local artifact path is still returned.
/// When `keep_local` is false the local archive is removed after the upload
/// attempt, whatever its outcome.
pub struct RemoteBackup {
    asset: ArchiveAsset,
    local_destination: PathBuf,
    credentials: Credentials,
    remote_dir: String,
    keep_local: bool,
    shipper: Arc<dyn Shipper>,
}

impl RemoteBackup {
    pub fn new<I, P>(
        sources: I,
        local_destination: impl Into<PathBuf>,
        credentials: Credentials,
        remote_dir: impl Into<String>,
        shipper: Arc<dyn Shipper>,
    ) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            asset: ArchiveAsset::new(sources),
            local_destination: local_destination.into(),
            credentials,
            remote_dir: remote_dir.into(),
            keep_local: true,
            shipper,
        }
    }

    /// Set whether the local archive survives the upload.
    pub fn with_keep_local(mut self, keep_local: bool) -> Self {
        self.keep_local = keep_local;
        self
    }

    /// Upload a finished local archive, then drop it unless kept.
    fn ship(&self, job: &JobId, artifact: PathBuf) -> Result<PathBuf, BackupError> {
        if !artifact.exists() {
            warn!(job = %job, path = %artifact.display(), "Local archive vanished before upload");
            return Err(AssetError::SourceNotFound(artifact).into());
        }

        let host = self.credentials.host();
        match self
            .shipper
            .upload(&artifact, &self.credentials, &self.remote_dir)
        {
            Ok(()) => info!(
                job = %job,
                host = %host,
                remote_dir = %self.remote_dir,
                "Artifact uploaded"
            ),
            Err(e) => error!(
                job = %job,
                host = %host,
                error = %e,
                "Upload failed"
            ),
        }

        if !self.keep_local
            && let Err(e) = fs::remove_file(&artifact)
        {
            warn!(
                job = %job,
                path = %artifact.display(),
                error = %e,
                "Failed to remove local archive"
            );
        }

        Ok(artifact)
    }
}

impl Backup for RemoteBackup {
    fn kind(&self) -> JobType {
        JobType::Sftp
    }

    fn destination(&self) -> &Path {
        &self.local_destination
    }

    fn perform(&self, job: &JobId, target: &Path) -> Result<PathBuf, BackupError> {
        let artifact = archive(&self.asset, job, target)?;
        self.ship(job, artifact)
    }
}
