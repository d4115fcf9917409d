//! Unix socket listener published through a symlink.
//!
//! # Responsibilities
//! - Parse the `unix:<path>` listener address
//! - Bind a phony socket next to the target path, then make it
//!   world-writable
//! - Publish it by symlinking the target path to it, so the platform only
//!   sees the socket once it accepts connections
//! - Unlink both the symlink and the phony socket on drop

use std::fs;
use std::io;
use std::os::unix::fs::{symlink, PermissionsExt};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::net::{UnixListener, UnixStream};

use crate::net::connection::ConnectionId;

const UNIX_SCHEME: &str = "unix:";
const SOCKET_MODE: u32 = 0o666;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The address is not `unix:<path>`.
    #[error("listener address must be unix:<path>, got {0:?}")]
    Address(String),

    /// Failed to bind the phony socket.
    #[error("failed to bind {}: {source}", path.display())]
    Bind {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to chmod or symlink the socket into place.
    #[error("failed to publish {}: {source}", path.display())]
    Publish {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to accept a connection.
    #[error("failed to accept: {0}")]
    Accept(#[source] io::Error),
}

/// Extract the socket path from a `unix:<path>` address.
pub fn parse_address(address: &str) -> Result<PathBuf, ListenerError> {
    match address.strip_prefix(UNIX_SCHEME) {
        Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => Err(ListenerError::Address(address.to_string())),
    }
}

/// The function's listening socket.
#[derive(Debug)]
pub struct FnListener {
    inner: UnixListener,
    socket_path: PathBuf,
    phony_path: PathBuf,
}

impl FnListener {
    /// Bind and publish the socket named by a `unix:<path>` address.
    ///
    /// Must be called from within a tokio runtime.
    pub fn bind(address: &str) -> Result<Self, ListenerError> {
        let socket_path = parse_address(address)?;
        let file_name = socket_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| ListenerError::Address(address.to_string()))?;
        let phony_name = format!("phony{file_name}");
        let phony_path = socket_path.with_file_name(&phony_name);

        remove_if_present(&phony_path).map_err(|source| ListenerError::Bind {
            path: phony_path.clone(),
            source,
        })?;
        let inner = UnixListener::bind(&phony_path).map_err(|source| ListenerError::Bind {
            path: phony_path.clone(),
            source,
        })?;

        // From here on, drop cleans up whatever was created.
        let listener = Self {
            inner,
            socket_path,
            phony_path,
        };
        listener.publish(&phony_name)?;

        tracing::info!(
            socket = %listener.socket_path.display(),
            phony = %listener.phony_path.display(),
            "Listener bound"
        );
        Ok(listener)
    }

    fn publish(&self, phony_name: &str) -> Result<(), ListenerError> {
        let publish_err = |source| ListenerError::Publish {
            path: self.socket_path.clone(),
            source,
        };
        fs::set_permissions(&self.phony_path, fs::Permissions::from_mode(SOCKET_MODE))
            .map_err(publish_err)?;
        remove_if_present(&self.socket_path).map_err(publish_err)?;
        // Relative target, so the link stays valid inside a mounted directory.
        symlink(phony_name, &self.socket_path).map_err(publish_err)
    }

    /// Accept the next connection.
    pub async fn accept(&self) -> Result<(UnixStream, ConnectionId), ListenerError> {
        let (stream, _addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;
        let id = ConnectionId::new();
        tracing::debug!(connection_id = %id, "Connection accepted");
        Ok((stream, id))
    }

    /// The published path the platform connects to.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn phony_path(&self) -> &Path {
        &self.phony_path
    }
}

impl Drop for FnListener {
    fn drop(&mut self) {
        for path in [&self.socket_path, &self.phony_path] {
            if let Err(err) = remove_if_present(path) {
                tracing::warn!(path = %path.display(), error = %err, "Failed to unlink socket");
            }
        }
        tracing::debug!(socket = %self.socket_path.display(), "Listener closed");
    }
}

/// Remove a file or symlink, treating "not found" as success.
fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_socket() -> PathBuf {
        std::env::temp_dir().join(format!("fdk-{}.sock", uuid::Uuid::new_v4().simple()))
    }

    #[test]
    fn address_must_be_unix() {
        assert_eq!(
            parse_address("unix:/tmp/iofs/lsnr.sock").unwrap(),
            PathBuf::from("/tmp/iofs/lsnr.sock")
        );
        assert!(matches!(parse_address("unix:"), Err(ListenerError::Address(_))));
        assert!(matches!(
            parse_address("tcp://0.0.0.0:8080"),
            Err(ListenerError::Address(_))
        ));
    }

    #[tokio::test]
    async fn publishes_relative_symlink_and_cleans_up() {
        let path = temp_socket();
        let listener = FnListener::bind(&format!("unix:{}", path.display())).unwrap();

        let target = fs::read_link(&path).unwrap();
        let file_name = path.file_name().unwrap().to_str().unwrap();
        assert_eq!(target, PathBuf::from(format!("phony{file_name}")));

        let mode = fs::metadata(listener.phony_path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, SOCKET_MODE);

        let phony = listener.phony_path().to_path_buf();
        drop(listener);
        assert!(fs::symlink_metadata(&path).is_err());
        assert!(fs::symlink_metadata(&phony).is_err());
    }

    #[tokio::test]
    async fn stale_files_are_replaced() {
        let path = temp_socket();
        fs::write(&path, b"stale").unwrap();

        let listener = FnListener::bind(&format!("unix:{}", path.display())).unwrap();
        assert!(fs::symlink_metadata(&path).unwrap().file_type().is_symlink());
        drop(listener);
    }

    #[tokio::test]
    async fn accepts_through_the_symlink() {
        let path = temp_socket();
        let listener = FnListener::bind(&format!("unix:{}", path.display())).unwrap();

        let client = tokio::spawn({
            let path = path.clone();
            async move { UnixStream::connect(path).await }
        });
        let (_stream, id) = listener.accept().await.unwrap();
        assert!(client.await.unwrap().is_ok());
        assert!(id.as_u64() > 0);
    }
}
