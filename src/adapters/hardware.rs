//! Hardware adapter: bridges raw GPIO to the pin-timing port.
//!
//! Exposes [`drivers::gpio`](crate::drivers::gpio) through [`PinPort`]
//! and [`DelayNs`].  On non-espidf targets the underlying driver uses
//! cfg-gated simulation stubs.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::PinState;
use log::warn;

use crate::app::ports::{PinMode, PinPort};
use crate::drivers::gpio;
use crate::protocol::Pin;

/// Concrete adapter for the ultrasonic trigger/echo path.
#[derive(Debug, Default)]
pub struct HardwareAdapter;

impl HardwareAdapter {
    pub fn new() -> Self {
        Self
    }
}

// ── PinPort implementation ────────────────────────────────────

impl PinPort for HardwareAdapter {
    fn set_mode(&mut self, pin: Pin, mode: PinMode) {
        let result = match mode {
            PinMode::Input => gpio::set_input(pin),
            PinMode::Output => gpio::set_output(pin),
        };
        if let Err(e) = result {
            warn!("GPIO {} mode {:?}: {}", pin, mode, e);
        }
    }

    fn write(&mut self, pin: Pin, level: PinState) {
        gpio::write(pin, level == PinState::High);
    }

    fn pulse_in(&mut self, pin: Pin, level: PinState, timeout_us: u32) -> Option<u32> {
        gpio::pulse_in(pin, level == PinState::High, timeout_us)
    }
}

// ── DelayNs implementation ────────────────────────────────────

impl DelayNs for HardwareAdapter {
    fn delay_ns(&mut self, ns: u32) {
        gpio::delay_us(ns.div_ceil(1000));
    }

    fn delay_us(&mut self, us: u32) {
        gpio::delay_us(us);
    }
}
