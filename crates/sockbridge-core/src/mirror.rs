//! Verbose traffic mirroring.
//!
//! Echoes inbound chunks of a forwarded connection to the console. With a
//! fixed width every line is hard-cut at that width; the separator printed
//! between successive chunks of one connection spans the display width.
//! Mirroring never interrupts the relay: sink errors are dropped.
//!
//! Relay tasks never write to stdout themselves. [`TrafficMirror::attach`]
//! hands rendered chunks to a bounded queue drained by a writer task on
//! `tokio::io::stdout()`. When the console falls behind, chunks are dropped
//! instead of stalling the reactor.

use crossterm::style::Stylize;
use crossterm::terminal;
use std::io::{self, IsTerminal, Write};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::trace;

/// Fallback column count when the terminal size is unavailable.
const FALLBACK_COLUMNS: u16 = 80;
/// Rendered chunks buffered per connection before echoes are dropped.
const ECHO_QUEUE_DEPTH: usize = 256;

/// A `Write` sink that queues each write for an async writer task.
///
/// Never blocks. A full queue or a finished writer is reported as an error,
/// which the mirror swallows.
pub struct QueuedSink {
    tx: mpsc::Sender<Vec<u8>>,
}

impl QueuedSink {
    /// Wrap the sending half of an echo queue.
    pub fn new(tx: mpsc::Sender<Vec<u8>>) -> Self {
        Self { tx }
    }

    /// Spawn a task that drains a fresh queue into stdout.
    ///
    /// Must be called from within a tokio runtime. The task ends once the
    /// returned sink is dropped.
    pub fn stdout() -> Self {
        let (tx, mut rx) = mpsc::channel::<Vec<u8>>(ECHO_QUEUE_DEPTH);
        tokio::spawn(async move {
            let mut out = tokio::io::stdout();
            while let Some(bytes) = rx.recv().await {
                if out.write_all(&bytes).await.is_err() || out.flush().await.is_err() {
                    break;
                }
            }
        });
        Self::new(tx)
    }
}

impl Write for QueuedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.tx.try_send(buf.to_vec()) {
            Ok(()) => Ok(buf.len()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                Err(io::Error::new(io::ErrorKind::WouldBlock, "echo queue full"))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "echo writer gone"))
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Per-connection traffic echo.
pub struct TrafficMirror {
    /// Display width used for the separator (and reflow, when fixed).
    width: usize,
    /// Whether chunks are reflowed to `width`.
    reflow: bool,
    /// Dim-style the separator.
    styled: bool,
    has_output: bool,
    sink: Box<dyn Write + Send>,
}

impl TrafficMirror {
    /// Attach a mirror echoing to stdout through a [`QueuedSink`].
    ///
    /// Without a fixed width the terminal width is sampled once, here.
    /// Must be called from within a tokio runtime.
    pub fn attach(width: Option<u16>) -> Self {
        let styled = std::io::stdout().is_terminal();
        Self::with_sink(width, Box::new(QueuedSink::stdout()), styled)
    }

    /// Attach a mirror writing to an arbitrary sink.
    ///
    /// # Arguments
    ///
    /// * `width` - Fixed reflow width; `None` or `Some(0)` samples the
    ///   terminal width and disables reflow.
    /// * `sink` - Receives one write per rendered chunk. It must not block.
    /// * `styled` - Dim-style the separator with ANSI escapes.
    pub fn with_sink(width: Option<u16>, sink: Box<dyn Write + Send>, styled: bool) -> Self {
        let (width, reflow) = match width {
            Some(w) if w > 0 => (w as usize, true),
            _ => (terminal_columns() as usize, false),
        };
        Self {
            width,
            reflow,
            styled,
            has_output: false,
            sink,
        }
    }

    /// Display width used for separators and reflow.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Render the console text for one chunk and advance the separator state.
    pub fn render(&mut self, chunk: &[u8]) -> String {
        let text = String::from_utf8_lossy(chunk);
        let body = if self.reflow {
            hard_wrap(&text, self.width)
        } else {
            text.into_owned()
        };

        let mut out = String::new();
        if self.has_output {
            let rule = "-".repeat(self.width);
            if self.styled {
                out.push_str(&rule.dim().to_string());
            } else {
                out.push_str(&rule);
            }
            out.push('\n');
        }
        out.push_str(&body);
        out.push('\n');

        self.has_output = true;
        out
    }

    /// Echo one chunk to the sink.
    pub fn observe(&mut self, chunk: &[u8]) {
        let rendered = self.render(chunk);
        if let Err(e) = self
            .sink
            .write_all(rendered.as_bytes())
            .and_then(|_| self.sink.flush())
        {
            trace!(error = %e, "traffic mirror write failed");
        }
    }
}

/// Terminal width minus one column, so a full-width line never wraps.
fn terminal_columns() -> u16 {
    let (cols, _rows) = terminal::size().unwrap_or((FALLBACK_COLUMNS + 1, 24));
    cols.saturating_sub(1).max(1)
}

/// Cut every line of `text` into segments of at most `width` characters.
pub fn hard_wrap(text: &str, width: usize) -> String {
    if width == 0 {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len() + text.len() / width + 1);
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let mut count = 0;
        for ch in line.chars() {
            if count == width {
                out.push('\n');
                count = 0;
            }
            out.push(ch);
            count += 1;
        }
    }
    out
}
