//! Host link: buffers return messages and frames them for the wire.
//!
//! Extensions report through [`ReturnChannel`] while a batch runs; the
//! main loop then calls [`HostLink::flush`] once and writes the single
//! outbound frame to the console UART.

use log::warn;

use crate::app::ports::ReturnChannel;
use crate::protocol::Param;
use crate::protocol::frame::{self, FrameError, ReturnMessage};

/// Messages held between flushes.
pub const HOST_LINK_CAPACITY: usize = 32;

#[derive(Debug, Default)]
pub struct HostLink {
    pending: heapless::Vec<ReturnMessage, HOST_LINK_CAPACITY>,
    dropped: u32,
}

impl HostLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> &[ReturnMessage] {
        &self.pending
    }

    /// Messages discarded because the buffer was full.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Encode everything pending as one outbound frame and clear the
    /// buffer.  `Ok(None)` when there is nothing to send.
    pub fn flush(&mut self) -> Result<Option<String>, FrameError> {
        if self.pending.is_empty() {
            return Ok(None);
        }
        let encoded = frame::encode_outbound(&self.pending);
        self.pending.clear();
        encoded.map(Some)
    }
}

impl ReturnChannel for HostLink {
    fn report_value(&mut self, report_id: i32, action: Param, value: f32) {
        let msg = ReturnMessage {
            id: report_id,
            action,
            value,
        };
        if self.pending.push(msg).is_err() {
            self.dropped = self.dropped.saturating_add(1);
            warn!("Host link full, report {} dropped", report_id);
        }
    }
}
