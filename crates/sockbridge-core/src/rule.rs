//! Forwarding rules: one listener per (source, destination) pair.

use crate::address::Address;
use crate::error::BridgeResult;

/// Traffic mirroring settings for a rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MirrorOptions {
    /// Echo inbound bytes to the console.
    pub verbose: bool,
    /// Fixed reflow width. `None` samples the terminal width.
    pub width: Option<u16>,
}

/// An immutable (source, destination) pair supplied at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardingRule {
    /// Where the listener is bound.
    pub source: Address,
    /// Dialled once per accepted connection.
    pub destination: Address,
    /// Traffic echo settings shared by every connection of this rule.
    pub mirror: MirrorOptions,
}

impl ForwardingRule {
    /// Pair two classified addresses, with mirroring off.
    ///
    /// # Arguments
    ///
    /// * `source` - Address to listen on.
    /// * `destination` - Address to forward accepted connections to.
    pub fn new(source: Address, destination: Address) -> Self {
        Self {
            source,
            destination,
            mirror: MirrorOptions::default(),
        }
    }

    /// Build a rule from raw address strings.
    pub fn parse(source: &str, destination: &str) -> BridgeResult<Self> {
        Ok(Self::new(Address::parse(source)?, Address::parse(destination)?))
    }

    /// Replace the mirror settings.
    pub fn with_mirror(mut self, mirror: MirrorOptions) -> Self {
        self.mirror = mirror;
        self
    }
}
