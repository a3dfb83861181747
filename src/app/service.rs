//! Dispatcher: the hexagonal core.
//!
//! [`Dispatcher`] owns the three extension tables and routes incoming
//! `(device, action, params)` commands to them.  All I/O flows through
//! port traits injected at call sites, so the whole router is testable
//! with mock adapters.
//!
//! ```text
//!   WireCommand ──▶ ┌──────────────────────────┐ ──▶ ReturnChannel
//!                   │        Dispatcher        │
//!    PinPort ◀──────│ NeoPixel · Servo · Sonar │──▶ SchedulerPort
//!                   └──────────────────────────┘
//! ```

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::config::ExtensionConfig;
use crate::error::{DispatchError, Result};
use crate::extensions::{NeoPixelExtension, ServoExtension, UltrasonicExtension};
use crate::protocol::frame::{self, FrameError, WireCommand};
use crate::protocol::{
    ExtensionKind, MAX_ULTRASONIC, Param, ULTRASONIC_READ, ULTRASONIC_REPORT_OFFSET,
};

use super::ports::{
    PeriodicDelegate, PinPort, ReturnChannel, SchedulerPort, ServoDriver, StripFactory, Unit,
};

// ───────────────────────────────────────────────────────────────
// Dispatcher
// ───────────────────────────────────────────────────────────────

pub struct Dispatcher<F: StripFactory, D: ServoDriver> {
    neopixel: NeoPixelExtension<F>,
    servo: ServoExtension<D>,
    ultrasonic: UltrasonicExtension,
}

impl<F: StripFactory, D: ServoDriver> Dispatcher<F, D> {
    /// Build all three tables.  `make_servo` is called once per servo slot.
    pub fn new(config: &ExtensionConfig, factory: F, make_servo: impl FnMut(usize) -> D) -> Self {
        Self {
            neopixel: NeoPixelExtension::new(factory),
            servo: ServoExtension::new(config, make_servo),
            ultrasonic: UltrasonicExtension::new(config),
        }
    }

    // ── Command routing ───────────────────────────────────────

    /// Route one command to its extension.
    ///
    /// The `hw` parameter satisfies **both** [`PinPort`] and [`DelayNs`],
    /// mirroring how ultrasonic measurements need raw pins and busy-waits
    /// from the same peripheral owner.
    pub fn dispatch<H, R, S>(
        &mut self,
        device_id: Param,
        action: Param,
        params: &[Param],
        hw: &mut H,
        reports: &mut R,
        periodic: &mut S,
    ) -> Result<()>
    where
        H: PinPort + DelayNs,
        R: ReturnChannel,
        S: SchedulerPort,
    {
        match ExtensionKind::route(device_id, action) {
            Some(ExtensionKind::NeoPixel) => self.neopixel.handle_action(action, params),
            Some(ExtensionKind::Servo) => self.servo.handle_action(action, params, reports),
            Some(ExtensionKind::Ultrasonic) => {
                self.ultrasonic
                    .handle_action(action, params, hw, reports, periodic)
            }
            None => Err(DispatchError::UnsupportedDevice {
                device: device_id,
                action,
            }),
        }
    }

    pub fn handle_command<H, R, S>(
        &mut self,
        cmd: &WireCommand,
        hw: &mut H,
        reports: &mut R,
        periodic: &mut S,
    ) -> Result<()>
    where
        H: PinPort + DelayNs,
        R: ReturnChannel,
        S: SchedulerPort,
    {
        self.dispatch(cmd.id, cmd.action, &cmd.params, hw, reports, periodic)
    }

    /// Execute a batch in order.  A rejected command is logged and skipped;
    /// the rest of the batch still runs.  Returns the number rejected.
    pub fn process_batch<H, R, S>(
        &mut self,
        cmds: &[WireCommand],
        hw: &mut H,
        reports: &mut R,
        periodic: &mut S,
    ) -> usize
    where
        H: PinPort + DelayNs,
        R: ReturnChannel,
        S: SchedulerPort,
    {
        let mut rejected = 0;
        for cmd in cmds {
            if let Err(e) = self.handle_command(cmd, hw, reports, periodic) {
                warn!(
                    "Command dropped (device={}, action={}): {}",
                    cmd.id, cmd.action, e
                );
                rejected += 1;
            }
        }
        rejected
    }

    /// Decode a raw inbound frame and run it as a batch.
    pub fn handle_frame<H, R, S>(
        &mut self,
        bytes: &[u8],
        hw: &mut H,
        reports: &mut R,
        periodic: &mut S,
    ) -> core::result::Result<usize, FrameError>
    where
        H: PinPort + DelayNs,
        R: ReturnChannel,
        S: SchedulerPort,
    {
        let cmds = frame::decode_inbound(bytes)?;
        Ok(self.process_batch(&cmds, hw, reports, periodic))
    }

    /// Scheduler callback: map an ultrasonic report id back to its sensor.
    /// Report ids outside the ultrasonic range are ignored.
    pub fn on_periodic<H, R>(&self, report_id: i32, hw: &mut H, reports: &mut R)
    where
        H: PinPort + DelayNs,
        R: ReturnChannel,
    {
        let Some(sensor) = report_id
            .checked_sub(ULTRASONIC_REPORT_OFFSET)
            .and_then(|id| usize::try_from(id).ok())
            .filter(|&id| id < MAX_ULTRASONIC)
        else {
            warn!("Periodic fire for unknown report id {}", report_id);
            return;
        };
        self.ultrasonic.perform_periodic_read(sensor, hw, reports);
    }

    // ── Maintenance ───────────────────────────────────────────

    /// Tear down every slot in every table, releasing driver handles.
    pub fn reset_all(&mut self) {
        self.neopixel.reset_all();
        self.servo.reset_all();
        self.ultrasonic.reset_all();
        info!("All extensions reset");
    }

    pub fn log_status(&self) {
        self.neopixel.log_status();
        self.servo.log_status();
        self.ultrasonic.log_status();
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn neopixel(&self) -> &NeoPixelExtension<F> {
        &self.neopixel
    }

    pub fn servo(&self) -> &ServoExtension<D> {
        &self.servo
    }

    pub fn servo_mut(&mut self) -> &mut ServoExtension<D> {
        &mut self.servo
    }

    pub fn ultrasonic(&self) -> &UltrasonicExtension {
        &self.ultrasonic
    }
}

// ───────────────────────────────────────────────────────────────
// PeriodicRunner
// ───────────────────────────────────────────────────────────────

/// Bridges [`PeriodicScheduler`](crate::scheduler::PeriodicScheduler)
/// fires into the dispatcher for one tick.
pub struct PeriodicRunner<'a, F: StripFactory, D: ServoDriver, H, R> {
    pub dispatcher: &'a Dispatcher<F, D>,
    pub hw: &'a mut H,
    pub reports: &'a mut R,
}

impl<F, D, H, R> PeriodicDelegate for PeriodicRunner<'_, F, D, H, R>
where
    F: StripFactory,
    D: ServoDriver,
    H: PinPort + DelayNs,
    R: ReturnChannel,
{
    fn on_periodic_fired(&mut self, report_id: i32, action: Param, _unit: Unit) {
        // Periodic reads always report centimetres.
        if action == ULTRASONIC_READ {
            self.dispatcher.on_periodic(report_id, self.hw, self.reports);
        }
    }
}
