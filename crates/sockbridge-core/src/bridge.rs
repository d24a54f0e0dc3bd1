//! Startup coordinator.
//!
//! Owns the [`ListenerRegistry`], binds every rule in order, and spawns one
//! accept loop per listener. Each accepted connection gets its own relay
//! task. Bind failures are returned to the caller, which decides the exit
//! code and runs the socket cleanup; nothing in here exits the process.

use crate::address::Address;
use crate::console::Console;
use crate::error::BridgeResult;
use crate::forwarder::ConnectionForwarder;
use crate::listener::Listener;
use crate::registry::{ListenerRecord, ListenerRegistry};
use crate::rule::ForwardingRule;
use crate::stream::Connection;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Pause after a failed accept. Errors such as EMFILE persist until some
/// connection closes, so retrying at once would spin.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Binds forwarding rules and serves them until shutdown.
///
/// A `Bridge` is built once per process. Every successful [`bind`](Self::bind)
/// records the listener in the shared [`ListenerRegistry`] before any
/// connection is accepted, so the shutdown handler always sees it.
pub struct Bridge {
    registry: Arc<ListenerRegistry>,
    console: Console,
    accept_loops: JoinSet<()>,
}

impl Bridge {
    /// Create a coordinator with an empty registry.
    ///
    /// # Arguments
    ///
    /// * `console` - Where `CONNECTED:` lines are printed for each bound rule.
    pub fn new(console: Console) -> Self {
        Self {
            registry: Arc::new(ListenerRegistry::new()),
            console,
            accept_loops: JoinSet::new(),
        }
    }

    /// Shared handle to the registry, for the shutdown handler.
    pub fn registry(&self) -> Arc<ListenerRegistry> {
        self.registry.clone()
    }

    /// Bind one rule and start accepting on it.
    ///
    /// Returns the address actually bound (the real port when binding port 0).
    ///
    /// # Errors
    ///
    /// Any [`Listener::bind`] failure, including a failed stale-socket
    /// recovery. Nothing is registered in that case.
    pub async fn bind(&mut self, rule: ForwardingRule) -> BridgeResult<Address> {
        let listener = Listener::bind(&rule.source).await?;
        let local = listener.local_address().unwrap_or_else(|_| rule.source.clone());

        self.registry
            .register(ListenerRecord {
                source: local.clone(),
                destination: rule.destination.clone(),
            })
            .await;

        info!(source = %rule.source, destination = %rule.destination, "listening");
        self.console.connected(&rule.source, &rule.destination);

        let forwarder = ConnectionForwarder::new(rule.destination, rule.mirror);
        self.accept_loops.spawn(accept_loop(listener, forwarder));
        Ok(local)
    }

    /// Bind every rule in order, stopping at the first failure.
    ///
    /// Rules bound before the failure keep running and stay registered, so
    /// the caller's cleanup still removes their socket files.
    pub async fn bind_all(&mut self, rules: Vec<ForwardingRule>) -> BridgeResult<Vec<Address>> {
        let mut bound = Vec::with_capacity(rules.len());
        for rule in rules {
            bound.push(self.bind(rule).await?);
        }
        Ok(bound)
    }

    /// Serve until `shutdown` resolves, then stop accepting.
    ///
    /// Socket files are left in place; removing them is the shutdown
    /// handler's job.
    pub async fn run_until<F: Future>(mut self, shutdown: F) -> F::Output {
        let output = shutdown.await;
        self.accept_loops.shutdown().await;
        debug!("accept loops stopped");
        output
    }
}

/// Source of inbound connections for an accept loop.
trait Acceptor {
    fn accept(&self) -> impl Future<Output = io::Result<Connection>> + Send;
}

impl Acceptor for Listener {
    fn accept(&self) -> impl Future<Output = io::Result<Connection>> + Send {
        Listener::accept(self)
    }
}

async fn accept_loop<A: Acceptor>(listener: A, forwarder: ConnectionForwarder) {
    loop {
        match listener.accept().await {
            Ok(inbound) => {
                let forwarder = forwarder.clone();
                tokio::spawn(async move {
                    forwarder.forward(inbound).await;
                });
            }
            Err(e) => {
                warn!(destination = %forwarder.destination(), error = %e, "accept failed");
                tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
            }
        }
    }
}
