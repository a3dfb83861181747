//! Periodic read scheduler.
//!
//! Extensions register recurring reads through [`SchedulerPort`], keyed by
//! report id.  The main loop calls [`PeriodicScheduler::tick`] with the
//! time elapsed since the previous call; every registration whose
//! interval has elapsed is handed to a [`PeriodicDelegate`].
//!
//! ```text
//!  ULTRASONIC_READ(interval>0) ──▶ register_periodic(2000+id)
//!                                        │
//!                                        ▼
//!                        ┌──────────────────────────────┐
//!  main loop ──tick(ms)─▶│      PeriodicScheduler       │
//!                        └──────────────┬───────────────┘
//!                                       ▼
//!                     PeriodicDelegate::on_periodic_fired
//!                     (Dispatcher → perform_periodic_read)
//! ```

use log::{debug, info, warn};

use crate::app::ports::{PeriodicDelegate, SchedulerPort, Unit};
use crate::protocol::Param;

/// Maximum number of concurrent registrations (stack-allocated).
pub const MAX_REGISTRATIONS: usize = 16;

/// One live registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    pub report_id: i32,
    pub action: Param,
    pub interval_ms: u32,
    pub unit: Unit,
    /// Milliseconds accumulated since the last fire.
    elapsed_ms: u32,
}

/// Fixed-capacity registration table.
///
/// Decoupled from the extensions: when a registration comes due it only
/// reports the id back through the delegate, so the scheduler is
/// testable on its own.
#[derive(Debug, Default)]
pub struct PeriodicScheduler {
    entries: heapless::Vec<Registration, MAX_REGISTRATIONS>,
}

impl PeriodicScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance every registration by `elapsed_ms` and fire those whose
    /// interval has elapsed.  A registration fires at most once per tick.
    pub fn tick(&mut self, elapsed_ms: u32, delegate: &mut dyn PeriodicDelegate) {
        for entry in self.entries.iter_mut() {
            entry.elapsed_ms = entry.elapsed_ms.saturating_add(elapsed_ms);
            if entry.elapsed_ms >= entry.interval_ms {
                entry.elapsed_ms = 0;
                debug!(
                    "Scheduler: report {} fired (every {} ms)",
                    entry.report_id, entry.interval_ms
                );
                delegate.on_periodic_fired(entry.report_id, entry.action, entry.unit);
            }
        }
    }

    pub fn get(&self, report_id: i32) -> Option<&Registration> {
        self.entries.iter().find(|e| e.report_id == report_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SchedulerPort for PeriodicScheduler {
    fn register_periodic(&mut self, report_id: i32, action: Param, interval_ms: u32, unit: Unit) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.report_id == report_id) {
            entry.action = action;
            entry.interval_ms = interval_ms;
            entry.unit = unit;
            entry.elapsed_ms = 0;
            info!("Scheduler: report {} re-registered every {} ms", report_id, interval_ms);
            return;
        }
        let entry = Registration {
            report_id,
            action,
            interval_ms,
            unit,
            elapsed_ms: 0,
        };
        if self.entries.push(entry).is_err() {
            warn!(
                "Scheduler: table full ({} entries), report {} not registered",
                MAX_REGISTRATIONS, report_id
            );
            return;
        }
        info!("Scheduler: report {} registered every {} ms", report_id, interval_ms);
    }

    fn unregister_periodic(&mut self, report_id: i32) {
        if let Some(pos) = self.entries.iter().position(|e| e.report_id == report_id) {
            self.entries.remove(pos);
            info!("Scheduler: report {} unregistered", report_id);
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
