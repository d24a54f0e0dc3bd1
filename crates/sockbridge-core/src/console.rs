//! Operator-facing console lines.
//!
//! These go to stdout and are not machine readable. Diagnostics go through
//! `tracing` instead.
//!
//! Lines are written synchronously. Only the coordinator prints them, once
//! per rule at startup and once at shutdown, and `disconnected...` must
//! reach stdout before the process exits. Per-connection output goes
//! through [`crate::mirror::QueuedSink`] instead.

use crate::address::Address;
use crossterm::style::Stylize;
use std::io::{IsTerminal, Write};

/// Writes status lines to stdout, styled when stdout is a terminal.
#[derive(Debug, Clone, Copy)]
pub struct Console {
    styled: bool,
}

impl Console {
    /// A console on stdout, styled when stdout is a terminal.
    pub fn stdout() -> Self {
        Self {
            styled: std::io::stdout().is_terminal(),
        }
    }

    /// A console that never emits escape codes.
    pub fn plain() -> Self {
        Self { styled: false }
    }

    /// `CONNECTED: <source> --> <destination>`
    pub fn connected_line(&self, source: &Address, destination: &Address) -> String {
        let (src, dst) = (source.to_string(), destination.to_string());
        if self.styled {
            format!(
                "{} {} {} {}",
                "CONNECTED:".green(),
                src.magenta(),
                "-->".dim(),
                dst.blue()
            )
        } else {
            format!("CONNECTED: {src} --> {dst}")
        }
    }

    /// `disconnected...`
    pub fn disconnected_line(&self) -> String {
        if self.styled {
            "disconnected...".dim().to_string()
        } else {
            "disconnected...".to_string()
        }
    }

    /// Print the `CONNECTED:` line for a freshly bound rule.
    ///
    /// # Arguments
    ///
    /// * `source` - The address as configured, not the resolved port.
    /// * `destination` - Where the rule forwards to.
    pub fn connected(&self, source: &Address, destination: &Address) {
        self.write_line(&self.connected_line(source, destination));
    }

    /// Printed once when a shutdown signal is handled.
    pub fn disconnected(&self) {
        self.write_line("");
        self.write_line(&self.disconnected_line());
    }

    fn write_line(&self, line: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{line}");
        let _ = out.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_connected_line() {
        let console = Console::plain();
        let src = Address::parse("/tmp/a.sock").unwrap();
        let dst = Address::parse("127.0.0.1:9000").unwrap();
        assert_eq!(
            console.connected_line(&src, &dst),
            "CONNECTED: /tmp/a.sock --> 127.0.0.1:9000"
        );
    }

    #[test]
    fn styled_line_keeps_addresses() {
        let console = Console { styled: true };
        let src = Address::parse("localhost:80").unwrap();
        let dst = Address::parse("/run/app.sock").unwrap();
        let line = console.connected_line(&src, &dst);
        assert!(line.contains("localhost:80"));
        assert!(line.contains("/run/app.sock"));
        assert!(line.contains('\u{1b}'));
    }
}
