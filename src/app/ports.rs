//! Port traits: the boundary between extension logic and the outside world.
//!
//! ```text
//!   Driver / adapter ──▶ Port trait ──▶ Extension (domain)
//! ```
//!
//! Hardware drivers (pixel strips, servos, raw pins) and host-side
//! collaborators (return channel, periodic scheduler) implement these
//! traits.  The extensions consume them via generics, so the command
//! logic never touches a peripheral directly and every clamp, default
//! and timing rule is testable with recording fakes.

use embedded_hal::digital::PinState;

use crate::protocol::{Param, Pin};

// ───────────────────────────────────────────────────────────────
// Pixel strip driver (owned handle, one per initialised strip)
// ───────────────────────────────────────────────────────────────

/// Buffered addressable-LED strip.
///
/// Every mutation only touches the pixel buffer; [`show`](Self::show)
/// is the single call that pushes the buffer out to the LEDs.
pub trait PixelStrip {
    /// Prepare the output pin / peripheral.
    fn begin(&mut self);

    /// Set every buffered pixel to off.
    fn clear(&mut self);

    /// Push the buffer to the physical strip.
    fn show(&mut self);

    /// Store a packed `0xWWRRGGBB` colour at `index`.
    fn set_pixel_color(&mut self, index: u16, color: u32);

    /// Store `color` into `count` pixels starting at `first`.
    fn fill(&mut self, color: u32, first: u16, count: u16);

    /// Global brightness applied when the buffer is shown.
    fn set_brightness(&mut self, value: u8);
}

/// Allocates strip handles.  Dropping a handle releases its hardware.
pub trait StripFactory {
    type Strip: PixelStrip;

    /// Create a handle for slot `strip_id`, or `None` when no output
    /// channel is available for it.
    fn create(&mut self, strip_id: usize, pin: Pin, pixel_count: u16, kind: u16)
    -> Option<Self::Strip>;
}

// ───────────────────────────────────────────────────────────────
// Servo driver (one per table slot)
// ───────────────────────────────────────────────────────────────

/// Explicit pulse-width range for a servo attachment (µs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseRange {
    pub min_us: i32,
    pub max_us: i32,
}

/// PWM servo output.
pub trait ServoDriver {
    /// Start driving `pin`.  `None` selects the driver's default pulse
    /// range.  Returns `false` when the hardware refused the attachment.
    fn attach(&mut self, pin: Pin, range: Option<PulseRange>) -> bool;

    /// Stop driving the pin.
    fn detach(&mut self);

    /// Command an angle in degrees (already clamped by the caller).
    fn write(&mut self, angle: i32);

    /// Command a raw pulse width in microseconds (already clamped).
    fn write_microseconds(&mut self, us: i32);

    /// Angle the driver is currently producing.
    fn read(&self) -> i32;

    /// Driver-side attachment predicate.
    fn attached(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Raw pin access (trigger / echo timing)
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Input,
    Output,
}

/// Digital pin primitives used by the ultrasonic extension.
///
/// Microsecond delays come from [`embedded_hal::delay::DelayNs`], which
/// callers require alongside this trait.
pub trait PinPort {
    fn set_mode(&mut self, pin: Pin, mode: PinMode);

    fn write(&mut self, pin: Pin, level: PinState);

    /// Measure how long `pin` stays at `level`, waiting at most
    /// `timeout_us` in total.  `None` means the pulse never arrived or
    /// never ended within the timeout.  Implementations MUST return
    /// once `timeout_us` has elapsed.
    fn pulse_in(&mut self, pin: Pin, level: PinState, timeout_us: u32) -> Option<u32>;
}

// ───────────────────────────────────────────────────────────────
// Host return channel
// ───────────────────────────────────────────────────────────────

/// Sink for asynchronous results headed back to the host.
pub trait ReturnChannel {
    /// * `report_id`: pin number or namespaced instance id.
    /// * `action`: action code that produced the value.
    fn report_value(&mut self, report_id: i32, action: Param, value: f32);
}

// ───────────────────────────────────────────────────────────────
// Periodic scheduler registration
// ───────────────────────────────────────────────────────────────

/// Measurement unit carried with ultrasonic reads and registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Centimeters,
    Inches,
}

impl Unit {
    /// `1` selects inches; every other code reads as centimetres.
    pub fn from_code(code: Param) -> Self {
        if code == 1 { Self::Inches } else { Self::Centimeters }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Centimeters => 0,
            Self::Inches => 1,
        }
    }
}

/// Registration side of the periodic scheduler, keyed by report id.
pub trait SchedulerPort {
    /// Register (or re-register) `report_id` to recur every `interval_ms`.
    fn register_periodic(&mut self, report_id: i32, action: Param, interval_ms: u32, unit: Unit);

    /// Drop any registration for `report_id`.  Unknown ids are ignored.
    fn unregister_periodic(&mut self, report_id: i32);
}

/// Callback the scheduler invokes when a registration comes due.
///
/// Decouples the [`PeriodicScheduler`](crate::scheduler::PeriodicScheduler)
/// from the extensions: the scheduler only knows report ids.
pub trait PeriodicDelegate {
    fn on_periodic_fired(&mut self, report_id: i32, action: Param, unit: Unit);
}
