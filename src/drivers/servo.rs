//! Hobby-servo driver on LEDC PWM.
//!
//! One LEDC low-speed channel per servo slot, all sharing a 50 Hz timer
//! with 14-bit duty resolution (≈1.2 µs per step).  Angles map linearly
//! onto the attached pulse range.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives real LEDC channels.
//! On host/test: tracks state in-memory only.

use log::{debug, info, warn};

use crate::app::ports::{PulseRange, ServoDriver};
use crate::protocol::Pin;

/// LEDC low-speed channels available for servos.
pub const LEDC_SERVO_CHANNELS: usize = 8;
const SERVO_FREQ_HZ: u32 = 50;
const PERIOD_US: u32 = 1_000_000 / SERVO_FREQ_HZ;
const DUTY_BITS: u32 = 14;
const DUTY_MAX: u32 = (1 << DUTY_BITS) - 1;
const FULL_SCALE_DEG: i32 = 180;
/// Widest pulse range the output stage accepts for an explicit attach.
pub const PULSE_FLOOR_US: i32 = 500;
pub const PULSE_CEIL_US: i32 = 2500;

/// Duty register value for a pulse of `us` microseconds.
pub const fn duty_for_pulse(us: u32) -> u32 {
    let us = if us > PERIOD_US { PERIOD_US } else { us };
    us * DUTY_MAX / PERIOD_US
}

pub struct LedcServo {
    channel: usize,
    default_range: PulseRange,
    range: PulseRange,
    pin: Pin,
    pulse_us: i32,
    attached: bool,
}

impl LedcServo {
    pub fn new(channel: usize, default_range: PulseRange) -> Self {
        Self {
            channel,
            default_range,
            range: default_range,
            pin: -1,
            pulse_us: 0,
            attached: false,
        }
    }

    /// Pull a host-supplied range inside the hardware pulse limits.  An
    /// empty or inverted range falls back to the default.
    fn bounded_range(&self, range: PulseRange) -> PulseRange {
        let min_us = range.min_us.clamp(PULSE_FLOOR_US, PULSE_CEIL_US);
        let max_us = range.max_us.clamp(PULSE_FLOOR_US, PULSE_CEIL_US);
        if min_us >= max_us {
            warn!(
                "LEDC servo ch{}: pulse range {}..{} µs unusable, using default",
                self.channel, range.min_us, range.max_us
            );
            return self.default_range;
        }
        PulseRange { min_us, max_us }
    }

    fn angle_to_us(&self, angle: i32) -> i32 {
        let min = i64::from(self.range.min_us);
        let span = i64::from(self.range.max_us) - min;
        let angle = i64::from(angle.clamp(0, FULL_SCALE_DEG));
        (min + span * angle / i64::from(FULL_SCALE_DEG)) as i32
    }

    fn us_to_angle(&self, us: i32) -> i32 {
        let span = i64::from(self.range.max_us) - i64::from(self.range.min_us);
        if span <= 0 {
            return 0;
        }
        // Round to nearest so write(a) → read() gives back `a`.
        let scaled = (i64::from(us) - i64::from(self.range.min_us)) * i64::from(FULL_SCALE_DEG);
        ((scaled + span / 2) / span).clamp(0, i64::from(FULL_SCALE_DEG)) as i32
    }

    fn apply_pulse(&mut self, us: i32) {
        self.pulse_us = us;
        ledc::set_pulse(self.channel, us.max(0) as u32);
    }

    pub fn pin(&self) -> Pin {
        self.pin
    }

    pub fn pulse_us(&self) -> i32 {
        self.pulse_us
    }
}

impl ServoDriver for LedcServo {
    fn attach(&mut self, pin: Pin, range: Option<PulseRange>) -> bool {
        if self.channel >= LEDC_SERVO_CHANNELS || pin < 0 {
            return false;
        }
        if !ledc::configure(self.channel, pin) {
            return false;
        }
        self.range = range.map_or(self.default_range, |r| self.bounded_range(r));
        self.pin = pin;
        self.attached = true;
        // Park at mid-travel until the host writes an angle.
        let centre = self.angle_to_us(FULL_SCALE_DEG / 2);
        self.apply_pulse(centre);
        info!(
            "LEDC servo ch{} on GPIO {} ({}..{} µs)",
            self.channel, pin, self.range.min_us, self.range.max_us
        );
        true
    }

    fn detach(&mut self) {
        if self.attached {
            ledc::stop(self.channel);
            self.attached = false;
            self.pin = -1;
        }
    }

    fn write(&mut self, angle: i32) {
        if self.attached {
            let us = self.angle_to_us(angle);
            self.apply_pulse(us);
        }
    }

    fn write_microseconds(&mut self, us: i32) {
        if self.attached {
            self.apply_pulse(us);
            debug!("LEDC servo ch{} pulse {} µs", self.channel, us);
        }
    }

    fn read(&self) -> i32 {
        self.us_to_angle(self.pulse_us)
    }

    fn attached(&self) -> bool {
        self.attached
    }
}

// ── LEDC access ───────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod ledc {
    use esp_idf_svc::sys::*;
    use log::warn;

    use super::{DUTY_BITS, SERVO_FREQ_HZ, duty_for_pulse};

    static mut TIMER_READY: bool = false;

    /// SAFETY: caller must be the single main task.
    unsafe fn ensure_timer() -> bool {
        // SAFETY: TIMER_READY is only touched from the main task.
        if unsafe { TIMER_READY } {
            return true;
        }
        let timer = ledc_timer_config_t {
            speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
            timer_num: ledc_timer_t_LEDC_TIMER_2,
            duty_resolution: DUTY_BITS,
            freq_hz: SERVO_FREQ_HZ,
            clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
            ..Default::default()
        };
        let ret = unsafe { ledc_timer_config(&timer) };
        if ret != ESP_OK as i32 {
            warn!("LEDC servo timer config failed (rc={})", ret);
            return false;
        }
        unsafe { TIMER_READY = true };
        true
    }

    pub fn configure(channel: usize, pin: i32) -> bool {
        // SAFETY: servo channels are only configured from the main task.
        unsafe {
            if !ensure_timer() {
                return false;
            }
            let ret = ledc_channel_config(&ledc_channel_config_t {
                speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
                channel: channel as ledc_channel_t,
                timer_sel: ledc_timer_t_LEDC_TIMER_2,
                gpio_num: pin,
                duty: 0,
                hpoint: 0,
                ..Default::default()
            });
            if ret != ESP_OK as i32 {
                warn!("LEDC servo channel {} config failed (rc={})", channel, ret);
                return false;
            }
        }
        true
    }

    pub fn set_pulse(channel: usize, us: u32) {
        // SAFETY: channel was configured in `configure`; main task only.
        unsafe {
            ledc_set_duty(
                ledc_mode_t_LEDC_LOW_SPEED_MODE,
                channel as ledc_channel_t,
                duty_for_pulse(us),
            );
            ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel as ledc_channel_t);
        }
    }

    pub fn stop(channel: usize) {
        // SAFETY: see set_pulse.
        unsafe {
            ledc_stop(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel as ledc_channel_t, 0);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
mod ledc {
    pub fn configure(_channel: usize, _pin: i32) -> bool {
        true
    }

    pub fn set_pulse(_channel: usize, _us: u32) {}

    pub fn stop(_channel: usize) {}
}
