//! Servo extension: a fixed table of PWM servos.
//!
//! Every slot owns its [`ServoDriver`] for the life of the extension;
//! attach/detach only toggle the driver's output.  Results go back to the
//! host tagged `servoId + 1000`.

use log::{debug, info};

use crate::app::commands::{ServoCommand, ServoOp};
use crate::app::ports::{PulseRange, ReturnChannel, ServoDriver};
use crate::config::ExtensionConfig;
use crate::error::{ExtensionError, Result};
use crate::protocol::{
    self, ExtensionKind, MAX_SERVOS, NO_READING, Param, Pin, servo_report_id,
};

struct ServoSlot<D> {
    driver: D,
    pin: Pin,
    last_angle: i32,
    attached: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoStatus {
    pub id: usize,
    pub pin: Pin,
    pub last_angle: i32,
}

pub struct ServoExtension<D: ServoDriver> {
    slots: [ServoSlot<D>; MAX_SERVOS],
    home_angle: i32,
    max_angle: i32,
    min_pulse_us: i32,
    max_pulse_us: i32,
}

impl<D: ServoDriver> ServoExtension<D> {
    /// Build the table, asking `make_driver` for one driver per slot.
    pub fn new(config: &ExtensionConfig, mut make_driver: impl FnMut(usize) -> D) -> Self {
        Self {
            slots: core::array::from_fn(|id| ServoSlot {
                driver: make_driver(id),
                pin: -1,
                last_angle: config.servo_home_angle,
                attached: false,
            }),
            home_angle: config.servo_home_angle,
            max_angle: config.servo_max_angle,
            min_pulse_us: i32::from(config.servo_min_pulse_us),
            max_pulse_us: i32::from(config.servo_max_pulse_us),
        }
    }

    pub fn handle_action(
        &mut self,
        action: Param,
        params: &[Param],
        reports: &mut impl ReturnChannel,
    ) -> Result<()> {
        let cmd = ServoCommand::parse(action, params)?;
        self.handle(cmd, reports)
    }

    pub fn handle(&mut self, cmd: ServoCommand, reports: &mut impl ReturnChannel) -> Result<()> {
        let id = cmd.id;
        match cmd.op {
            ServoOp::Attach { pin, range } => self.attach(id, pin, range),
            ServoOp::Detach => {
                self.detach(id);
                Ok(())
            }
            ServoOp::Write(angle) => {
                let max = Param::from(self.max_angle);
                let slot = self.attached_slot(id)?;
                let angle = angle.clamp(0, max) as i32;
                slot.driver.write(angle);
                slot.last_angle = angle;
                debug!("Servo {} angle set to {}", id, angle);
                Ok(())
            }
            ServoOp::WriteMicroseconds(us) => {
                let (lo, hi) = (Param::from(self.min_pulse_us), Param::from(self.max_pulse_us));
                let slot = self.attached_slot(id)?;
                let us = us.clamp(lo, hi) as i32;
                slot.driver.write_microseconds(us);
                debug!("Servo {} microseconds set to {}", id, us);
                Ok(())
            }
            ServoOp::Read => {
                let slot = &mut self.slots[id];
                if !slot.attached {
                    // Reads always answer; -1 means "not attached".
                    reports.report_value(servo_report_id(id), protocol::SERVO_READ, NO_READING);
                    return Ok(());
                }
                let angle = slot.driver.read();
                slot.last_angle = angle;
                reports.report_value(servo_report_id(id), protocol::SERVO_READ, angle as f32);
                debug!("Servo {} current angle: {}", id, angle);
                Ok(())
            }
            ServoOp::Attached => {
                let slot = &self.slots[id];
                // Short-circuit: a locally detached slot never touches the driver.
                let attached = slot.attached && slot.driver.attached();
                reports.report_value(
                    servo_report_id(id),
                    protocol::SERVO_ATTACHED,
                    if attached { 1.0 } else { 0.0 },
                );
                debug!("Servo {} attached status: {}", id, attached);
                Ok(())
            }
        }
    }

    fn attach(&mut self, id: usize, pin: Pin, range: Option<PulseRange>) -> Result<()> {
        info!(
            "SERVO_ATTACH received: servoId={}, pin={}, range={:?}",
            id, pin, range
        );
        let home = self.home_angle;
        let slot = &mut self.slots[id];
        if slot.attached {
            slot.driver.detach();
            slot.attached = false;
        }
        if !slot.driver.attach(pin, range) {
            slot.pin = -1;
            return Err(ExtensionError::HardwareUnavailable {
                kind: ExtensionKind::Servo,
                id,
            }
            .into());
        }
        slot.pin = pin;
        slot.attached = true;
        slot.last_angle = home;
        info!("Servo {} attached to pin {}", id, pin);
        Ok(())
    }

    fn detach(&mut self, id: usize) {
        let slot = &mut self.slots[id];
        if slot.attached {
            slot.driver.detach();
            slot.attached = false;
            slot.pin = -1;
            info!("Servo {} detached", id);
        }
    }

    fn attached_slot(&mut self, id: usize) -> Result<&mut ServoSlot<D>> {
        let slot = &mut self.slots[id];
        if !slot.attached {
            return Err(ExtensionError::NotActive {
                kind: ExtensionKind::Servo,
                id,
            }
            .into());
        }
        Ok(slot)
    }

    // ── Queries / maintenance ─────────────────────────────────

    pub fn is_attached(&self, id: usize) -> bool {
        self.slots.get(id).is_some_and(|s| s.attached)
    }

    pub fn last_angle(&self, id: usize) -> Option<i32> {
        self.slots.get(id).map(|s| s.last_angle)
    }

    pub fn pin(&self, id: usize) -> Option<Pin> {
        self.slots.get(id).map(|s| s.pin).filter(|&p| p >= 0)
    }

    pub fn driver(&self, id: usize) -> Option<&D> {
        self.slots.get(id).map(|s| &s.driver)
    }

    /// Mutable driver access, bypassing the slot's attached flag.
    pub fn driver_mut(&mut self, id: usize) -> Option<&mut D> {
        self.slots.get_mut(id).map(|s| &mut s.driver)
    }

    pub fn status(&self) -> heapless::Vec<ServoStatus, MAX_SERVOS> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.attached)
            .map(|(id, s)| ServoStatus {
                id,
                pin: s.pin,
                last_angle: s.last_angle,
            })
            .collect()
    }

    pub fn log_status(&self) {
        info!("=== Servo Status ===");
        for s in self.status() {
            info!("Servo {}: Pin {}, Last angle {}", s.id, s.pin, s.last_angle);
        }
    }

    /// Detach every servo and restore the default angle.
    pub fn reset_all(&mut self) {
        for slot in &mut self.slots {
            if slot.attached {
                slot.driver.detach();
                slot.attached = false;
                slot.pin = -1;
                slot.last_angle = self.home_angle;
            }
        }
    }
}
