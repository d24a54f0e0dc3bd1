use std::path::PathBuf;
use thiserror::Error;

/// Process exit code for a clean, signal-initiated shutdown.
pub const EXIT_OK: i32 = 0;
/// Unexpected runtime or I/O failure.
pub const EXIT_RUNTIME: i32 = 1;
/// Bad configuration: unreadable rules, bad addresses, unpaired entries.
pub const EXIT_CONFIG: i32 = 2;
/// A TCP port or Unix socket path is held by a live process.
pub const EXIT_BIND_CONFLICT: i32 = 3;
/// The stale socket file could not be probed, removed, or rebound.
pub const EXIT_RECOVERY_FAILED: i32 = 4;
/// Any other listener bind failure.
pub const EXIT_BIND_FAILED: i32 = 5;

/// Errors produced by the forwarding engine.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("tcp address {address} already in use")]
    TcpAddressInUse { address: String },

    #[error("unix socket {} already in use", path.display())]
    SocketInUse { path: PathBuf },

    #[error("failed to probe unix socket {}: {source}", path.display())]
    Probe {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove stale unix socket {}: {source}", path.display())]
    StaleSocketRemoval {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to rebind unix socket {}: {source}", path.display())]
    Rebind {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Exit code the process should terminate with for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            BridgeError::InvalidAddress { .. } | BridgeError::Config(_) => EXIT_CONFIG,
            BridgeError::TcpAddressInUse { .. } | BridgeError::SocketInUse { .. } => {
                EXIT_BIND_CONFLICT
            }
            BridgeError::Probe { .. }
            | BridgeError::StaleSocketRemoval { .. }
            | BridgeError::Rebind { .. } => EXIT_RECOVERY_FAILED,
            BridgeError::Bind { .. } => EXIT_BIND_FAILED,
            BridgeError::Io(_) => EXIT_RUNTIME,
        }
    }
}

pub type BridgeResult<T> = Result<T, BridgeError>;
