//! SFTP shipper backed by libssh2.

use std::fs::File;
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use ssh2::{Session, Sftp};
use tracing::debug;

use super::{Credentials, Shipper, TransferError, remote_path};

/// How long to wait for the TCP connection and for each SSH operation.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Uploads artifacts over SFTP with password authentication.
///
/// Host keys are not verified.
#[derive(Debug, Clone)]
pub struct SftpShipper {
    timeout: Duration,
}

impl SftpShipper {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Set the connect and operation timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn connect(&self, credentials: &Credentials) -> Result<TcpStream, TransferError> {
        let host = credentials.host();
        let connect_err = |source| TransferError::Connect {
            host: host.clone(),
            source,
        };

        let addrs: Vec<SocketAddr> = (credentials.address(), credentials.port())
            .to_socket_addrs()
            .map_err(connect_err)?
            .collect();

        let mut last_error = io::Error::new(io::ErrorKind::NotFound, "no addresses resolved");
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    debug!(%addr, error = %e, "Connection attempt failed");
                    last_error = e;
                }
            }
        }
        Err(connect_err(last_error))
    }

    /// Connect and authenticate. The returned connection, and any connection
    /// abandoned on the way, is disconnected when dropped.
    fn open_session(&self, credentials: &Credentials) -> Result<Connection, TransferError> {
        let host = credentials.host();
        let stream = self.connect(credentials)?;

        let session = Session::new().map_err(|source| TransferError::Handshake {
            host: host.clone(),
            source,
        })?;
        session.set_timeout(u32::try_from(self.timeout.as_millis()).unwrap_or(u32::MAX));
        let mut connection = Connection {
            session,
            host: host.clone(),
        };
        connection.session.set_tcp_stream(stream);
        let session = &mut connection.session;
        session
            .handshake()
            .map_err(|source| TransferError::Handshake {
                host: host.clone(),
                source,
            })?;

        session
            .userauth_password(credentials.username(), credentials.password())
            .map_err(|source| TransferError::Auth {
                host: host.clone(),
                user: credentials.username().to_string(),
                source: Some(source),
            })?;
        if !session.authenticated() {
            return Err(TransferError::Auth {
                host,
                user: credentials.username().to_string(),
                source: None,
            });
        }

        Ok(connection)
    }

    fn send(sftp: &Sftp, artifact: &Path, remote_dir: &str) -> Result<(), TransferError> {
        let stat = sftp
            .stat(Path::new(remote_dir))
            .map_err(|e| TransferError::Directory {
                dir: remote_dir.to_string(),
                reason: e.to_string(),
            })?;
        if !stat.is_dir() {
            return Err(TransferError::Directory {
                dir: remote_dir.to_string(),
                reason: "not a directory".to_string(),
            });
        }

        let mut local = File::open(artifact).map_err(|source| TransferError::LocalRead {
            path: artifact.to_path_buf(),
            source,
        })?;

        let remote = remote_path(remote_dir, artifact);
        let upload_err = |source: io::Error| TransferError::Upload {
            remote: remote.clone(),
            source,
        };
        let mut file = sftp
            .create(Path::new(&remote))
            .map_err(|e| upload_err(e.into()))?;
        io::copy(&mut local, &mut file).map_err(upload_err)?;
        file.close().map_err(|e| upload_err(e.into()))?;

        Ok(())
    }
}

impl Default for SftpShipper {
    fn default() -> Self {
        Self::new()
    }
}

impl Shipper for SftpShipper {
    fn upload(
        &self,
        artifact: &Path,
        credentials: &Credentials,
        remote_dir: &str,
    ) -> Result<(), TransferError> {
        let connection = self.open_session(credentials)?;

        connection
            .session
            .sftp()
            .map_err(|source| TransferError::Handshake {
                host: credentials.host(),
                source,
            })
            .and_then(|sftp| Self::send(&sftp, artifact, remote_dir))
    }
}

/// An SSH session that is disconnected on drop, whatever the outcome.
struct Connection {
    session: Session,
    host: String,
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Err(e) = self.session.disconnect(None, "upload finished", None) {
            debug!(host = %self.host, error = %e, "Failed to close SSH session");
        }
    }
}
