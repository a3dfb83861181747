//! Log-based return channels.
//!
//! [`LogReportSink`] writes every reported value to the ESP-IDF logger
//! (UART / USB-CDC in production).  [`LogTap`] does the same in front of
//! another channel, so reports reach the host link and the serial log.

use log::info;

use crate::app::ports::ReturnChannel;
use crate::protocol::Param;

/// Adapter that logs every return message to the serial console.
#[derive(Debug, Default)]
pub struct LogReportSink;

impl LogReportSink {
    pub fn new() -> Self {
        Self
    }
}

impl ReturnChannel for LogReportSink {
    fn report_value(&mut self, report_id: i32, action: Param, value: f32) {
        info!("REPORT | id={} action={} value={:.2}", report_id, action, value);
    }
}

/// Logs each report, then forwards it unchanged.
pub struct LogTap<'a, R: ReturnChannel> {
    log: LogReportSink,
    inner: &'a mut R,
}

impl<'a, R: ReturnChannel> LogTap<'a, R> {
    pub fn new(inner: &'a mut R) -> Self {
        Self {
            log: LogReportSink::new(),
            inner,
        }
    }
}

impl<R: ReturnChannel> ReturnChannel for LogTap<'_, R> {
    fn report_value(&mut self, report_id: i32, action: Param, value: f32) {
        self.log.report_value(report_id, action, value);
        self.inner.report_value(report_id, action, value);
    }
}
