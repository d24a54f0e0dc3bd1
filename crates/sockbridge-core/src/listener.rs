//! Listener binding.
//!
//! Binds the source address of a rule. An `AddrInUse` failure on a Unix
//! path hands off to [`recovery::recover`]; the same failure on a TCP port
//! is fatal, since a port held by another process cannot be reclaimed.

use crate::address::Address;
use crate::error::{BridgeError, BridgeResult};
use crate::recovery;
use crate::stream::Connection;
use std::io;
use tokio::net::{TcpListener, UnixListener};
use tracing::debug;

/// A bound, listening endpoint.
///
/// Unix listeners leave their socket file on disk when dropped; removing
/// it is the registry sweep's job.
#[derive(Debug)]
pub enum Listener {
    Tcp(TcpListener),
    Unix(UnixListener),
}

impl Listener {
    /// Bind and listen on `address`.
    pub async fn bind(address: &Address) -> BridgeResult<Self> {
        match address {
            Address::Unix(path) => match UnixListener::bind(path) {
                Ok(listener) => Ok(Listener::Unix(listener)),
                Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                    Ok(Listener::Unix(recovery::recover(path).await?))
                }
                Err(source) => Err(BridgeError::Bind {
                    address: address.to_string(),
                    source,
                }),
            },
            Address::Tcp { .. } => {
                let target = address.bind_target().ok_or_else(|| BridgeError::InvalidAddress {
                    address: address.to_string(),
                    reason: "not a tcp address".into(),
                })?;
                match TcpListener::bind(&target).await {
                    Ok(listener) => Ok(Listener::Tcp(listener)),
                    Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                        Err(BridgeError::TcpAddressInUse {
                            address: address.to_string(),
                        })
                    }
                    Err(source) => Err(BridgeError::Bind {
                        address: address.to_string(),
                        source,
                    }),
                }
            }
        }
    }

    /// Accept the next inbound connection.
    pub async fn accept(&self) -> io::Result<Connection> {
        match self {
            Listener::Tcp(l) => {
                let (stream, peer) = l.accept().await?;
                debug!(peer = %peer, "accepted tcp connection");
                Ok(Connection::Tcp(stream))
            }
            Listener::Unix(l) => {
                let (stream, _) = l.accept().await?;
                debug!("accepted unix connection");
                Ok(Connection::Unix(stream))
            }
        }
    }

    /// The locally bound address, e.g. the real port after binding port 0.
    pub fn local_address(&self) -> io::Result<Address> {
        match self {
            Listener::Tcp(l) => {
                let addr = l.local_addr()?;
                Ok(Address::Tcp {
                    host: addr.ip().to_string(),
                    port: addr.port(),
                })
            }
            Listener::Unix(l) => {
                let addr = l.local_addr()?;
                let path = addr.as_pathname().ok_or_else(|| {
                    io::Error::new(io::ErrorKind::Other, "unnamed unix socket")
                })?;
                Ok(Address::Unix(path.to_path_buf()))
            }
        }
    }
}
