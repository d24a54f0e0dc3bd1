//! A connected byte stream over either transport.

use crate::address::Address;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpStream, UnixStream};

/// One end of a forwarded connection.
#[derive(Debug)]
pub enum Connection {
    /// Accepted from, or dialled to, a `host:port` address.
    Tcp(TcpStream),
    /// Accepted from, or dialled to, a socket path.
    Unix(UnixStream),
}

impl Connection {
    /// Dial `address`, choosing TCP or Unix-domain by its classification.
    pub async fn connect(address: &Address) -> io::Result<Self> {
        if let Some(path) = address.unix_path() {
            return Ok(Connection::Unix(UnixStream::connect(path).await?));
        }
        let target = address
            .dial_target()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "not a tcp address"))?;
        Ok(Connection::Tcp(TcpStream::connect(target).await?))
    }

    /// Human-readable peer description for logs.
    pub fn peer(&self) -> String {
        match self {
            Connection::Tcp(s) => s
                .peer_addr()
                .map(|a| a.to_string())
                .unwrap_or_else(|_| "tcp peer".to_string()),
            Connection::Unix(_) => "unix peer".to_string(),
        }
    }
}

impl From<TcpStream> for Connection {
    fn from(s: TcpStream) -> Self {
        Connection::Tcp(s)
    }
}

impl From<UnixStream> for Connection {
    fn from(s: UnixStream) -> Self {
        Connection::Unix(s)
    }
}

impl AsyncRead for Connection {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Connection::Tcp(s) => Pin::new(s).poll_read(cx, buf),
            Connection::Unix(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Connection {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Connection::Tcp(s) => Pin::new(s).poll_write(cx, buf),
            Connection::Unix(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Connection::Tcp(s) => Pin::new(s).poll_flush(cx),
            Connection::Unix(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Connection::Tcp(s) => Pin::new(s).poll_shutdown(cx),
            Connection::Unix(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}
