//! Signal-driven cleanup of on-disk socket files.
//!
//! One handler per process, created by the coordinator before any listener
//! is bound. [`ShutdownHandler::install`] registers SIGINT and SIGTERM right
//! away, so a signal that arrives while rules are still binding is queued
//! instead of killing the process with its files on disk. After a signal the
//! coordinator calls [`ShutdownHandler::cleanup`], which sweeps the
//! [`ListenerRegistry`] and unlinks every Unix-domain socket path in
//! registration order. TCP listeners need no cleanup. The sweep runs at most
//! once.

use crate::console::Console;
use crate::registry::{CleanupReport, ListenerRegistry};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::{debug, info, warn};

/// Registered signal streams. Holding them keeps the default
/// (terminate-the-process) action disabled.
struct Signals {
    interrupt: Signal,
    terminate: Signal,
}

/// Owns the socket cleanup for the process and, once installed, the
/// SIGINT/SIGTERM registrations that trigger it.
pub struct ShutdownHandler {
    /// Registry shared with the [`Bridge`](crate::bridge::Bridge).
    registry: Arc<ListenerRegistry>,
    /// Where `disconnected...` is printed.
    console: Console,
    /// `None` when no signal handler was requested.
    signals: Option<Signals>,
    /// Set by the first sweep.
    swept: AtomicBool,
}

impl ShutdownHandler {
    /// Create a handler that can clean up but does not listen for signals.
    ///
    /// [`wait_for_signal`](Self::wait_for_signal) never resolves on such a
    /// handler; SIGINT keeps its default action.
    ///
    /// # Arguments
    ///
    /// * `registry` - The registry whose Unix socket paths are removed.
    /// * `console` - Console used for the shutdown notice.
    pub fn new(registry: Arc<ListenerRegistry>, console: Console) -> Self {
        Self {
            registry,
            console,
            signals: None,
            swept: AtomicBool::new(false),
        }
    }

    /// Create a handler and register SIGINT and SIGTERM immediately.
    ///
    /// Call this before binding any listener. Signals delivered from now on
    /// are held until [`wait_for_signal`](Self::wait_for_signal) is polled.
    ///
    /// # Errors
    ///
    /// Fails if the signal driver cannot register either signal.
    pub fn install(registry: Arc<ListenerRegistry>, console: Console) -> io::Result<Self> {
        let signals = Signals {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        };
        debug!("shutdown signal handler installed");
        Ok(Self {
            signals: Some(signals),
            ..Self::new(registry, console)
        })
    }

    /// Whether SIGINT/SIGTERM are registered.
    pub fn is_installed(&self) -> bool {
        self.signals.is_some()
    }

    /// Wait for SIGINT or SIGTERM, including one that arrived before this
    /// call. Never resolves if the handler was not installed.
    pub async fn wait_for_signal(&mut self) {
        let Some(signals) = self.signals.as_mut() else {
            return std::future::pending().await;
        };
        tokio::select! {
            _ = signals.interrupt.recv() => info!("received SIGINT"),
            _ = signals.terminate.recv() => info!("received SIGTERM"),
        }
        self.console.disconnected();
    }

    /// Unlink every registered Unix socket path. Later calls do nothing.
    pub async fn cleanup(&self) -> CleanupReport {
        if self.swept.swap(true, Ordering::SeqCst) {
            return CleanupReport::default();
        }

        let report = self.registry.sweep().await;
        for (path, e) in &report.failed {
            warn!(path = %path.display(), error = %e, "socket file left on disk");
        }
        info!(removed = report.removed.len(), "socket cleanup finished");
        report
    }
}
