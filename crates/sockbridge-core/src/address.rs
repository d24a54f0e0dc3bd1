//! Address classification — turns a source/destination string into a TCP
//! `host:port` or a Unix-domain socket path.
//!
//! Grammar:
//!
//! - no colon anywhere: a filesystem path to a Unix-domain socket;
//! - otherwise `host:port`, where the port is the text after the *last*
//!   colon and any `scheme://` prefix on the host is stripped.

use crate::error::{BridgeError, BridgeResult};
use std::fmt;
use std::path::{Path, PathBuf};

/// Host used for listening when the address leaves the host empty (`:8080`).
const WILDCARD_BIND_HOST: &str = "0.0.0.0";
/// Host dialled when the address leaves the host empty.
const LOOPBACK_DIAL_HOST: &str = "127.0.0.1";

/// Transport kind of an [`Address`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// `host:port`, bound and dialled over TCP.
    Tcp,
    /// A filesystem path to a Unix-domain socket.
    Unix,
}

/// A classified endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    /// TCP endpoint. `host` is empty when the input was `:port`.
    Tcp { host: String, port: u16 },
    /// Unix-domain socket path.
    Unix(PathBuf),
}

impl Address {
    /// Parse an address string.
    pub fn parse(input: &str) -> BridgeResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(invalid(input, "empty address"));
        }

        let Some(idx) = trimmed.rfind(':') else {
            return Ok(Address::Unix(PathBuf::from(trimmed)));
        };

        let port_str = &trimmed[idx + 1..];
        let port = port_str
            .parse::<u16>()
            .map_err(|_| invalid(input, &format!("invalid port '{port_str}'")))?;

        let host = strip_scheme(&trimmed[..idx]);
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);

        Ok(Address::Tcp {
            host: host.to_string(),
            port,
        })
    }

    /// Transport used to bind or dial this address.
    ///
    /// Decided purely by [`Address::parse`]'s colon rule; nothing is looked
    /// up on disk or resolved over DNS.
    pub fn kind(&self) -> TransportKind {
        match self {
            Address::Tcp { .. } => TransportKind::Tcp,
            Address::Unix(_) => TransportKind::Unix,
        }
    }

    /// Socket path, if this is a Unix-domain address.
    pub fn unix_path(&self) -> Option<&Path> {
        match self {
            Address::Unix(path) => Some(path),
            Address::Tcp { .. } => None,
        }
    }

    /// `host:port` string suitable for `TcpListener::bind`.
    pub(crate) fn bind_target(&self) -> Option<String> {
        match self {
            Address::Tcp { host, port } => Some(join_host_port(
                if host.is_empty() { WILDCARD_BIND_HOST } else { host },
                *port,
            )),
            Address::Unix(_) => None,
        }
    }

    /// `host:port` string suitable for `TcpStream::connect`.
    pub(crate) fn dial_target(&self) -> Option<String> {
        match self {
            Address::Tcp { host, port } => Some(join_host_port(
                if host.is_empty() { LOOPBACK_DIAL_HOST } else { host },
                *port,
            )),
            Address::Unix(_) => None,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Tcp { host, port } => f.write_str(&join_host_port(host, *port)),
            Address::Unix(path) => write!(f, "{}", path.display()),
        }
    }
}

impl std::str::FromStr for Address {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

fn strip_scheme(host: &str) -> &str {
    match host.find("://") {
        Some(idx) if idx > 0 => &host[idx + 3..],
        _ => host,
    }
}

fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

fn invalid(address: &str, reason: &str) -> BridgeError {
    BridgeError::InvalidAddress {
        address: address.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_without_colon_is_unix() {
        let addr = Address::parse("/tmp/app.sock").unwrap();
        assert_eq!(addr, Address::Unix(PathBuf::from("/tmp/app.sock")));
        assert_eq!(addr.kind(), TransportKind::Unix);
        assert_eq!(addr.unix_path(), Some(Path::new("/tmp/app.sock")));
    }

    #[test]
    fn relative_path_is_unix() {
        let addr = Address::parse("  docker.sock \n").unwrap();
        assert_eq!(addr, Address::Unix(PathBuf::from("docker.sock")));
    }

    #[test]
    fn host_and_port() {
        let addr = Address::parse("127.0.0.1:9000").unwrap();
        assert_eq!(
            addr,
            Address::Tcp {
                host: "127.0.0.1".into(),
                port: 9000
            }
        );
        assert_eq!(addr.kind(), TransportKind::Tcp);
        assert!(addr.unix_path().is_none());
    }

    #[test]
    fn scheme_is_stripped() {
        let addr = Address::parse("http://localhost:8080").unwrap();
        assert_eq!(
            addr,
            Address::Tcp {
                host: "localhost".into(),
                port: 8080
            }
        );
    }

    #[test]
    fn port_comes_after_last_colon() {
        let addr = Address::parse("[::1]:2375").unwrap();
        assert_eq!(
            addr,
            Address::Tcp {
                host: "::1".into(),
                port: 2375
            }
        );
        assert_eq!(addr.to_string(), "[::1]:2375");
        assert_eq!(addr.dial_target().unwrap(), "[::1]:2375");
    }

    #[test]
    fn empty_host_binds_wildcard_and_dials_loopback() {
        let addr = Address::parse(":7000").unwrap();
        assert_eq!(addr.bind_target().unwrap(), "0.0.0.0:7000");
        assert_eq!(addr.dial_target().unwrap(), "127.0.0.1:7000");
        assert_eq!(addr.to_string(), ":7000");
    }

    #[test]
    fn bad_port_is_rejected() {
        assert!(matches!(
            Address::parse("localhost:http"),
            Err(BridgeError::InvalidAddress { .. })
        ));
        assert!(Address::parse("localhost:70000").is_err());
        assert!(Address::parse("localhost:").is_err());
    }

    #[test]
    fn empty_is_rejected() {
        assert!(Address::parse("   ").is_err());
    }

    #[test]
    fn unix_has_no_tcp_targets() {
        let addr = Address::parse("/tmp/a.sock").unwrap();
        assert!(addr.bind_target().is_none());
        assert!(addr.dial_target().is_none());
    }
}
