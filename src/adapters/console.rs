//! Console line channel.
//!
//! A reader thread blocks on the console UART (stdin under ESP-IDF's VFS)
//! and hands complete lines to the dispatch loop through a bounded
//! `embassy-sync` channel.  The loop drains it with [`try_next_line`]
//! and never blocks.
//!
//! ```text
//! ┌──────────────┐  ConsoleLine  ┌──────────────┐
//! │  console-rx  │──────────────▶│ Dispatch loop│
//! │  (thread)    │   depth 8     │  (main task) │
//! └──────────────┘               └──────────────┘
//! ```

use core::fmt;
use std::io::BufRead;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

/// Longest accepted line in bytes.  A full batch of eight commands fits.
pub const LINE_CAPACITY: usize = 1024;

/// Lines buffered between reader and dispatch loop.
const LINE_DEPTH: usize = 8;

pub type ConsoleLine = heapless::String<LINE_CAPACITY>;

/// Reader thread → dispatch loop.
pub static LINE_CHANNEL: Channel<CriticalSectionRawMutex, ConsoleLine, LINE_DEPTH> = Channel::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleError {
    /// Line longer than [`LINE_CAPACITY`].
    TooLong(usize),
    /// The dispatch loop has not drained earlier lines.
    Full,
}

impl fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLong(len) => write!(f, "line of {} bytes exceeds {}", len, LINE_CAPACITY),
            Self::Full => write!(f, "line queue full"),
        }
    }
}

impl std::error::Error for ConsoleError {}

/// Queue one line for the dispatch loop.  Blank lines are skipped.
pub fn push_line(line: &str) -> Result<(), ConsoleError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(());
    }
    let mut owned = ConsoleLine::new();
    owned
        .push_str(line)
        .map_err(|_| ConsoleError::TooLong(line.len()))?;
    LINE_CHANNEL.try_send(owned).map_err(|_| ConsoleError::Full)
}

/// Next queued line, if any.
pub fn try_next_line() -> Option<ConsoleLine> {
    LINE_CHANNEL.try_receive().ok()
}

/// Spawn the blocking stdin reader.
pub fn spawn_reader() -> std::io::Result<std::thread::JoinHandle<()>> {
    std::thread::Builder::new()
        .name("console-rx".into())
        .stack_size(8 * 1024)
        .spawn(|| {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if let Err(e) = push_line(&line) {
                            warn!("Console line dropped: {}", e);
                        }
                    }
                    Err(e) => warn!("Console read failed: {}", e),
                }
            }
        })
}
