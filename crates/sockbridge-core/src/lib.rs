//! sockbridge-core: forwarding engine for sockbridge.
//!
//! Binds a listener per (source, destination) rule — TCP `host:port` or a
//! Unix socket path — and relays every accepted connection to its
//! destination byte for byte. Stale Unix socket files left by a crashed
//! process are detected and reclaimed at bind time, and socket files are
//! removed again on SIGINT/SIGTERM.

#[cfg(not(unix))]
compile_error!("sockbridge requires a Unix platform");

pub mod address;
pub mod bridge;
pub mod config;
pub mod console;
pub mod error;
pub mod forwarder;
pub mod listener;
pub mod mirror;
pub mod recovery;
pub mod registry;
pub mod rule;
pub mod shutdown;
pub mod stream;

// Re-export commonly used items at crate root.
pub use address::{Address, TransportKind};
pub use bridge::Bridge;
pub use config::BridgeConfig;
pub use console::Console;
pub use error::{BridgeError, BridgeResult};
pub use forwarder::{relay, ConnectionForwarder, RelayOutcome};
pub use listener::Listener;
pub use mirror::TrafficMirror;
pub use registry::{CleanupReport, ListenerRecord, ListenerRegistry};
pub use rule::{ForwardingRule, MirrorOptions};
pub use shutdown::ShutdownHandler;
pub use stream::Connection;
