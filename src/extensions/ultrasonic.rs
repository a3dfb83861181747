//! Ultrasonic extension: HC-SR04 style range sensors.
//!
//! A measurement is a bit-banged 10 µs trigger pulse followed by a
//! blocking echo-pulse measurement.  The echo wait is bounded by the
//! sensor's configured timeout (≤ 1000 ms), which is the only place the
//! dispatch loop ever blocks.
//!
//! ## Wiring modes
//!
//! - **4-wire**: separate trigger and echo pins.
//! - **3-wire**: one pin, switched to input right after the trigger
//!   pulse.  The table stores no echo pin for these sensors (reported as
//!   `-1`), rather than a copy of the trigger pin.
//!
//! Re-attaching a live sensor in the other wiring mode is allowed: the
//! new attach simply replaces the pin configuration and timeout.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::PinState;
use log::{debug, info};

use crate::app::commands::{UltrasonicCommand, UltrasonicOp};
use crate::app::ports::{PinMode, PinPort, ReturnChannel, SchedulerPort, Unit};
use crate::config::ExtensionConfig;
use crate::error::{ExtensionError, Result};
use crate::protocol::{
    self, ExtensionKind, MAX_ULTRASONIC, NO_READING, Param, Pin, ultrasonic_report_id,
};

/// Trigger pulse shape (µs): settle low, then hold high.
const TRIGGER_SETTLE_US: u32 = 2;
const TRIGGER_PULSE_US: u32 = 10;

#[derive(Debug, Clone, Copy)]
struct SensorSlot {
    trig_pin: Pin,
    /// `None` in 3-wire mode.
    echo_pin: Option<Pin>,
    timeout_ms: u32,
    attached: bool,
}

impl SensorSlot {
    const fn detached(timeout_ms: u32) -> Self {
        Self {
            trig_pin: -1,
            echo_pin: None,
            timeout_ms,
            attached: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorStatus {
    pub id: usize,
    pub trig_pin: Pin,
    /// `-1` in 3-wire mode.
    pub echo_pin: Pin,
    pub timeout_ms: u32,
}

/// Sound-speed factors used to turn an echo duration into a distance.
#[derive(Debug, Clone, Copy)]
pub struct SoundSpeed {
    pub cm_per_us: f32,
    pub in_per_us: f32,
}

impl SoundSpeed {
    /// One-way distance for a round-trip echo of `duration_us`.
    pub fn distance(&self, duration_us: u32, unit: Unit) -> f32 {
        let factor = match unit {
            Unit::Centimeters => self.cm_per_us,
            Unit::Inches => self.in_per_us,
        };
        duration_us as f32 * factor / 2.0
    }
}

pub struct UltrasonicExtension {
    slots: [SensorSlot; MAX_ULTRASONIC],
    config: ExtensionConfig,
    sound: SoundSpeed,
}

impl UltrasonicExtension {
    pub fn new(config: &ExtensionConfig) -> Self {
        Self {
            slots: [SensorSlot::detached(config.ultrasonic_detach_timeout_ms); MAX_ULTRASONIC],
            config: config.clone(),
            sound: SoundSpeed {
                cm_per_us: config.sound_cm_per_us,
                in_per_us: config.sound_in_per_us,
            },
        }
    }

    pub fn handle_action<H, R, S>(
        &mut self,
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
        let cmd = UltrasonicCommand::parse(action, params)?;
        self.handle(cmd, hw, reports, periodic)
    }

    pub fn handle<H, R, S>(
        &mut self,
        cmd: UltrasonicCommand,
        hw: &mut H,
        reports: &mut R,
        periodic: &mut S,
    ) -> Result<()>
    where
        H: PinPort + DelayNs,
        R: ReturnChannel,
        S: SchedulerPort,
    {
        let id = cmd.id;
        match cmd.op {
            UltrasonicOp::Attach { trig, echo } => {
                info!(
                    "ULTRASONIC_ATTACH received: sensorId={}, trigPin={}, echoPin={:?}",
                    id, trig, echo
                );
                self.slots[id] = SensorSlot {
                    trig_pin: trig,
                    echo_pin: echo,
                    timeout_ms: self.config.ultrasonic_attach_timeout_ms,
                    attached: true,
                };
                match echo {
                    Some(echo) => info!(
                        "Ultrasonic sensor {} attached to trig pin {} and echo pin {}",
                        id, trig, echo
                    ),
                    None => info!(
                        "Ultrasonic sensor {} attached to trig pin {} (3-wire mode)",
                        id, trig
                    ),
                }
                Ok(())
            }
            UltrasonicOp::Detach => {
                if self.slots[id].attached {
                    self.slots[id] = SensorSlot::detached(self.config.ultrasonic_detach_timeout_ms);
                    info!("Ultrasonic sensor {} detached", id);
                }
                Ok(())
            }
            UltrasonicOp::SetTimeout(requested) => {
                let timeout = self.config.clamp_timeout_ms(requested);
                let slot = &mut self.slots[id];
                if !slot.attached {
                    return Err(not_active(id));
                }
                slot.timeout_ms = timeout;
                info!("Ultrasonic sensor {} timeout set to {} ms", id, timeout);
                Ok(())
            }
            UltrasonicOp::Read { unit, interval_ms } => {
                let report_id = ultrasonic_report_id(id);
                if !self.slots[id].attached {
                    reports.report_value(report_id, protocol::ULTRASONIC_READ, NO_READING);
                    return Ok(());
                }
                if interval_ms > 0 {
                    let interval = u32::try_from(interval_ms).unwrap_or(u32::MAX);
                    periodic.register_periodic(report_id, protocol::ULTRASONIC_READ, interval, unit);
                    info!(
                        "Ultrasonic sensor {} registered for periodic reads every {}ms (unit={:?})",
                        id, interval, unit
                    );
                    return Ok(());
                }
                let distance = self.measure_distance(id, unit, hw);
                reports.report_value(report_id, protocol::ULTRASONIC_READ, distance);
                if distance >= 0.0 {
                    debug!("Ultrasonic one-shot read (sensor {}): {:.2} {:?}", id, distance, unit);
                } else {
                    debug!("Ultrasonic one-shot read (sensor {}): TIMEOUT/ERROR", id);
                }
                Ok(())
            }
            UltrasonicOp::End => {
                periodic.unregister_periodic(ultrasonic_report_id(id));
                info!("Ultrasonic sensor {} stopped periodic reads", id);
                Ok(())
            }
        }
    }

    /// Scheduler callback: measure in centimetres and report.
    ///
    /// Tolerates ids that are out of range or have been detached since
    /// registration; both are silent no-ops.
    pub fn perform_periodic_read<H, R>(&self, id: usize, hw: &mut H, reports: &mut R)
    where
        H: PinPort + DelayNs,
        R: ReturnChannel,
    {
        if !self.is_attached(id) {
            return;
        }
        let distance = self.measure_distance(id, Unit::Centimeters, hw);
        reports.report_value(ultrasonic_report_id(id), protocol::ULTRASONIC_READ, distance);
    }

    /// Fire one trigger pulse and time the echo.  `-1` when the sensor is
    /// not attached or no echo arrived within the timeout.
    pub fn measure_distance<H>(&self, id: usize, unit: Unit, hw: &mut H) -> f32
    where
        H: PinPort + DelayNs,
    {
        self.measure(id, unit, hw).unwrap_or(NO_READING)
    }

    fn measure<H>(&self, id: usize, unit: Unit, hw: &mut H) -> Option<f32>
    where
        H: PinPort + DelayNs,
    {
        let slot = self.slots.get(id).filter(|s| s.attached)?;
        let trig = slot.trig_pin;

        hw.set_mode(trig, PinMode::Output);
        hw.write(trig, PinState::Low);
        hw.delay_us(TRIGGER_SETTLE_US);
        hw.write(trig, PinState::High);
        hw.delay_us(TRIGGER_PULSE_US);
        hw.write(trig, PinState::Low);

        // 3-wire sensors answer on the trigger pin itself.
        let echo = slot.echo_pin.unwrap_or(trig);
        hw.set_mode(echo, PinMode::Input);

        let timeout_us = slot.timeout_ms.saturating_mul(1000);
        // A zero-length pulse is a failed read, not a zero distance.
        let duration = hw
            .pulse_in(echo, PinState::High, timeout_us)
            .filter(|&us| us > 0)?;
        Some(self.sound.distance(duration, unit))
    }

    // ── Queries / maintenance ─────────────────────────────────

    pub fn is_attached(&self, id: usize) -> bool {
        self.slots.get(id).is_some_and(|s| s.attached)
    }

    pub fn timeout_ms(&self, id: usize) -> Option<u32> {
        self.slots.get(id).map(|s| s.timeout_ms)
    }

    pub fn status(&self) -> heapless::Vec<SensorStatus, MAX_ULTRASONIC> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.attached)
            .map(|(id, s)| SensorStatus {
                id,
                trig_pin: s.trig_pin,
                echo_pin: s.echo_pin.unwrap_or(-1),
                timeout_ms: s.timeout_ms,
            })
            .collect()
    }

    pub fn log_status(&self) {
        info!("=== Ultrasonic Sensor Status ===");
        for s in self.status() {
            if s.echo_pin >= 0 {
                info!(
                    "Sensor {}: Trig pin {}, Echo pin {}, Timeout {} ms",
                    s.id, s.trig_pin, s.echo_pin, s.timeout_ms
                );
            } else {
                info!(
                    "Sensor {}: Trig pin {} (3-wire mode), Timeout {} ms",
                    s.id, s.trig_pin, s.timeout_ms
                );
            }
        }
    }

    pub fn reset_all(&mut self) {
        self.slots = [SensorSlot::detached(self.config.ultrasonic_detach_timeout_ms); MAX_ULTRASONIC];
    }
}

fn not_active(id: usize) -> crate::error::DispatchError {
    ExtensionError::NotActive {
        kind: ExtensionKind::Ultrasonic,
        id,
    }
    .into()
}
