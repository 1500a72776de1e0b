//! Remote artifact transfer.
//!
//! A [`Shipper`] uploads a local artifact into a directory on a remote host.
//! [`SftpShipper`] is the production implementation; tests inject their own.

mod sftp;

pub use sftp::{DEFAULT_CONNECT_TIMEOUT, SftpShipper};

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default SSH port.
pub const DEFAULT_PORT: u16 = 22;

/// Errors that can occur while shipping an artifact.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The host could not be resolved or reached.
    #[error("failed to connect to {host}: {source}")]
    Connect {
        host: String,
        #[source]
        source: std::io::Error,
    },

    /// The SSH session could not be established.
    #[error("SSH handshake with {host} failed: {source}")]
    Handshake {
        host: String,
        #[source]
        source: ssh2::Error,
    },

    /// The server rejected the credentials.
    #[error("authentication as '{user}' on {host} failed")]
    Auth {
        host: String,
        user: String,
        #[source]
        source: Option<ssh2::Error>,
    },

    /// The remote directory is missing or unusable.
    #[error("remote directory '{dir}' unavailable: {reason}")]
    Directory { dir: String, reason: String },

    /// The local artifact could not be read.
    #[error("failed to read local artifact '{}': {source}", path.display())]
    LocalRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing the remote file failed.
    #[error("upload to '{remote}' failed: {source}")]
    Upload {
        remote: String,
        #[source]
        source: std::io::Error,
    },
}

/// Password credentials for a remote host.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    address: String,
    port: u16,
    username: String,
    password: String,
}

impl Credentials {
    /// Create credentials for `address` on the default port.
    pub fn new(
        address: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            port: DEFAULT_PORT,
            username: username.into(),
            password: password.into(),
        }
    }

    /// Use a non-default port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// `address:port`, for logs and error messages.
    pub fn host(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("address", &self.address)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Uploads a local artifact to a remote directory.
pub trait Shipper: Send + Sync {
    /// Upload `artifact` into `remote_dir`, keeping its base file name.
    fn upload(
        &self,
        artifact: &Path,
        credentials: &Credentials,
        remote_dir: &str,
    ) -> Result<(), TransferError>;
}

/// Remote path of `artifact` once uploaded into `remote_dir`.
pub fn remote_path(remote_dir: &str, artifact: &Path) -> String {
    let name = artifact
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dir = remote_dir.trim_end_matches('/');
    if dir.is_empty() && remote_dir.starts_with('/') {
        format!("/{name}")
    } else if dir.is_empty() {
        name
    } else {
        format!("{dir}/{name}")
    }
}
