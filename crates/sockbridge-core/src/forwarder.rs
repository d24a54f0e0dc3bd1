//! Connection forwarding — dials the destination for each accepted
//! connection and relays bytes in both directions.
//!
//! The two directions run concurrently inside one task. Whichever finishes
//! first (EOF or error) ends the relay: both write halves are shut down and
//! both streams dropped, so no half-open relay outlives its peer.

use crate::address::Address;
use crate::mirror::TrafficMirror;
use crate::rule::MirrorOptions;
use crate::stream::Connection;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

const RELAY_BUFFER_SIZE: usize = 8192;

/// Which leg of a forwarded connection ended the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    /// The accepted client connection.
    Inbound,
    /// The connection dialled to the destination.
    Outbound,
}

/// Summary of one finished relay.
#[derive(Debug)]
pub struct RelayOutcome {
    /// Bytes copied inbound → outbound.
    pub bytes_in: u64,
    /// Bytes copied outbound → inbound.
    pub bytes_out: u64,
    /// The leg whose read side finished (or whose write failed) first.
    pub ended_by: Leg,
    /// The error that ended the relay, if it did not end on EOF.
    pub error: Option<io::Error>,
}

/// Forwards accepted connections of one rule to its destination.
///
/// Cheap to clone; every accept loop hands one clone to each spawned relay.
#[derive(Debug, Clone)]
pub struct ConnectionForwarder {
    destination: Address,
    mirror: MirrorOptions,
}

impl ConnectionForwarder {
    /// Create a forwarder for one rule.
    ///
    /// # Arguments
    ///
    /// * `destination` - Address dialled once per accepted connection.
    /// * `mirror` - Whether (and at what width) inbound traffic is echoed.
    pub fn new(destination: Address, mirror: MirrorOptions) -> Self {
        Self {
            destination,
            mirror,
        }
    }

    /// The address this forwarder dials.
    pub fn destination(&self) -> &Address {
        &self.destination
    }

    /// Dial the destination and relay until either side closes.
    ///
    /// Returns `None` if the destination could not be reached; the inbound
    /// connection is closed in that case.
    pub async fn forward(&self, mut inbound: Connection) -> Option<RelayOutcome> {
        let outbound = match Connection::connect(&self.destination).await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(destination = %self.destination, error = %e, "destination connect failed");
                let _ = inbound.shutdown().await;
                return None;
            }
        };

        let peer = inbound.peer();
        debug!(peer = %peer, destination = %self.destination, "relay started");

        let mirror = self
            .mirror
            .verbose
            .then(|| TrafficMirror::attach(self.mirror.width));
        let outcome = relay(inbound, outbound, mirror).await;

        match &outcome.error {
            Some(e) => warn!(
                peer = %peer,
                destination = %self.destination,
                leg = ?outcome.ended_by,
                error = %e,
                "connection error"
            ),
            None => debug!(
                peer = %peer,
                destination = %self.destination,
                bytes_in = outcome.bytes_in,
                bytes_out = outcome.bytes_out,
                leg = ?outcome.ended_by,
                "relay finished"
            ),
        }
        Some(outcome)
    }
}

/// Relay bytes between two open streams until either direction ends.
///
/// `mirror`, when present, observes every inbound chunk before it is
/// written to the outbound side.
pub async fn relay<A, B>(inbound: A, outbound: B, mut mirror: Option<TrafficMirror>) -> RelayOutcome
where
    A: AsyncRead + AsyncWrite + Unpin,
    B: AsyncRead + AsyncWrite + Unpin,
{
    let (mut in_read, mut in_write) = tokio::io::split(inbound);
    let (mut out_read, mut out_write) = tokio::io::split(outbound);
    let mut bytes_in = 0u64;
    let mut bytes_out = 0u64;

    let (ended_by, result) = tokio::select! {
        r = pump(&mut in_read, &mut out_write, &mut bytes_in, mirror.as_mut()) => (Leg::Inbound, r),
        r = pump(&mut out_read, &mut in_write, &mut bytes_out, None) => (Leg::Outbound, r),
    };

    let _ = out_write.shutdown().await;
    let _ = in_write.shutdown().await;

    RelayOutcome {
        bytes_in,
        bytes_out,
        ended_by,
        error: result.err(),
    }
}

/// Copy `reader` into `writer` until EOF.
async fn pump<R, W>(
    reader: &mut R,
    writer: &mut W,
    copied: &mut u64,
    mut mirror: Option<&mut TrafficMirror>,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; RELAY_BUFFER_SIZE];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        if let Some(m) = mirror.as_deref_mut() {
            m.observe(&buf[..n]);
        }
        writer.write_all(&buf[..n]).await?;
        *copied += n as u64;
    }
}
