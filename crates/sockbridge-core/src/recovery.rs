//! Stale Unix socket recovery.
//!
//! A socket file left behind by a dead process makes `bind` fail with
//! `EADDRINUSE` even though nothing listens on it. [`recover`] probes the
//! path with a single `connect`:
//!
//! - `ECONNREFUSED`: the file is stale. Remove it and bind once more.
//! - connect succeeds: a live process owns the path. Give up.
//! - any other error: give up and report it.
//!
//! There is no retry loop and no backoff. A failure of the second bind is
//! fatal.

use crate::error::{BridgeError, BridgeResult};
use std::io;
use std::os::unix::fs::FileTypeExt;
use std::path::Path;
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, info, warn};

/// Outcome of probing an in-use Unix socket path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Something accepted the connection.
    Live,
    /// Connection refused: nobody is listening.
    Stale,
}

/// Probe `path` with a connect attempt.
pub async fn probe(path: &Path) -> BridgeResult<ProbeOutcome> {
    match UnixStream::connect(path).await {
        Ok(_stream) => Ok(ProbeOutcome::Live),
        Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => Ok(ProbeOutcome::Stale),
        Err(source) => Err(BridgeError::Probe {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Run the recovery protocol for a Unix bind that failed with `AddrInUse`.
pub async fn recover(path: &Path) -> BridgeResult<UnixListener> {
    debug!(path = %path.display(), "unix socket in use, probing");

    match probe(path).await? {
        ProbeOutcome::Live => {
            warn!(path = %path.display(), "unix socket owned by a live process");
            Err(BridgeError::SocketInUse {
                path: path.to_path_buf(),
            })
        }
        ProbeOutcome::Stale => {
            remove_stale(path)?;
            let listener = UnixListener::bind(path).map_err(|source| BridgeError::Rebind {
                path: path.to_path_buf(),
                source,
            })?;
            info!(path = %path.display(), "reclaimed stale unix socket");
            Ok(listener)
        }
    }
}

fn remove_stale(path: &Path) -> BridgeResult<()> {
    let removal_error = |source| BridgeError::StaleSocketRemoval {
        path: path.to_path_buf(),
        source,
    };

    // Only socket files are ever removed.
    let meta = std::fs::symlink_metadata(path).map_err(removal_error)?;
    if !meta.file_type().is_socket() {
        return Err(removal_error(io::Error::new(
            io::ErrorKind::InvalidInput,
            "path exists but is not a socket",
        )));
    }

    std::fs::remove_file(path).map_err(removal_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Leave a socket file on disk with nothing listening behind it.
    fn stale_socket(path: &Path) {
        let listener = std::os::unix::net::UnixListener::bind(path).unwrap();
        drop(listener);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn probe_reports_stale_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stale.sock");
        stale_socket(&path);
        assert_eq!(probe(&path).await.unwrap(), ProbeOutcome::Stale);
    }

    #[tokio::test]
    async fn probe_reports_live_listener() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live.sock");
        let _listener = UnixListener::bind(&path).unwrap();
        assert_eq!(probe(&path).await.unwrap(), ProbeOutcome::Live);
    }

    #[tokio::test]
    async fn probe_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.sock");
        assert!(matches!(
            probe(&path).await,
            Err(BridgeError::Probe { .. })
        ));
    }

    #[tokio::test]
    async fn recover_rebinds_stale_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.sock");
        stale_socket(&path);

        let listener = recover(&path).await.unwrap();
        assert!(path.exists());

        let client = UnixStream::connect(&path).await;
        assert!(client.is_ok());
        drop(listener);
    }

    #[tokio::test]
    async fn recover_leaves_live_socket_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.sock");
        let live = UnixListener::bind(&path).unwrap();

        let err = recover(&path).await.unwrap_err();
        assert!(matches!(err, BridgeError::SocketInUse { .. }));
        assert!(path.exists());

        // The original owner still accepts connections.
        let _client = UnixStream::connect(&path).await.unwrap();
        assert!(live.accept().await.is_ok());
    }

    #[tokio::test]
    async fn regular_file_is_not_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.sock");
        std::fs::write(&path, b"not a socket").unwrap();

        assert!(recover(&path).await.is_err());
        assert_eq!(std::fs::read(&path).unwrap(), b"not a socket");
    }
}
