//! Registry of bound listeners.
//!
//! Append-only during normal operation. The shutdown sweep is the only
//! operation that removes entries; it drains the registry and unlinks the
//! socket file of every Unix-domain listener, in registration order.

use crate::address::{Address, TransportKind};
use std::io;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// A listener that bound successfully.
#[derive(Debug, Clone)]
pub struct ListenerRecord {
    /// Address the listener is bound to.
    pub source: Address,
    /// Where its connections are forwarded.
    pub destination: Address,
}

impl ListenerRecord {
    /// Transport of the bound source.
    pub fn kind(&self) -> TransportKind {
        self.source.kind()
    }
}

/// Result of a shutdown sweep.
#[derive(Debug, Default)]
pub struct CleanupReport {
    /// Socket files that were unlinked.
    pub removed: Vec<PathBuf>,
    /// Socket files that could not be unlinked.
    pub failed: Vec<(PathBuf, io::Error)>,
}

impl CleanupReport {
    /// True when every socket file was removed.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Ordered collection of every listener bound by this process.
pub struct ListenerRegistry {
    entries: Mutex<Vec<ListenerRecord>>,
}

impl ListenerRegistry {
    /// Create an empty registry. One is shared per process.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Record a freshly bound listener.
    pub async fn register(&self, record: ListenerRecord) {
        debug!(source = %record.source, "listener registered");
        self.entries.lock().await.push(record);
    }

    /// Snapshot of the registered listeners, in registration order.
    pub async fn list(&self) -> Vec<ListenerRecord> {
        self.entries.lock().await.clone()
    }

    /// Number of listeners registered and not yet swept.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// See [`len`](Self::len).
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Unlink every Unix-domain socket path and empty the registry.
    ///
    /// Best effort: failures are reported, not retried. A missing file
    /// counts as removed. A second sweep finds nothing to do.
    pub async fn sweep(&self) -> CleanupReport {
        let drained: Vec<ListenerRecord> = self.entries.lock().await.drain(..).collect();
        let mut report = CleanupReport::default();

        for record in drained {
            let Some(path) = record.source.unix_path() else {
                continue;
            };
            match std::fs::remove_file(path) {
                Ok(()) => {
                    debug!(path = %path.display(), "removed unix socket");
                    report.removed.push(path.to_path_buf());
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    report.removed.push(path.to_path_buf());
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to remove unix socket");
                    report.failed.push((path.to_path_buf(), e));
                }
            }
        }

        report
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
