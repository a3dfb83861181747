//! Extension configuration parameters
//!
//! Tunables for the three extensions: servo pulse ranges, ultrasonic
//! timeouts and sound-speed factors, and the periodic scheduler tick.
//! Table capacities are protocol constants and live in [`crate::protocol`].

use core::fmt;

use serde::{Deserialize, Serialize};

/// Core extension configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionConfig {
    // --- Servo ---
    /// Shortest pulse accepted by `WRITE_MICROSECONDS`, and the default
    /// lower bound when attaching without an explicit range (µs)
    pub servo_min_pulse_us: u16,
    /// Longest pulse accepted by `WRITE_MICROSECONDS` (µs)
    pub servo_max_pulse_us: u16,
    /// Angle a freshly attached servo is assumed to sit at (degrees)
    pub servo_home_angle: i32,
    /// Upper angle clamp (degrees; the lower clamp is 0)
    pub servo_max_angle: i32,

    // --- Ultrasonic ---
    /// Echo timeout applied on attach (ms)
    pub ultrasonic_attach_timeout_ms: u32,
    /// Echo timeout a detached slot is reset to (ms)
    pub ultrasonic_detach_timeout_ms: u32,
    /// Lower clamp for `SET_TIMEOUT` (ms)
    pub ultrasonic_min_timeout_ms: u32,
    /// Upper clamp for `SET_TIMEOUT`; also the longest a single read may block (ms)
    pub ultrasonic_max_timeout_ms: u32,
    /// Round-trip conversion factor, centimetres per microsecond of echo
    pub sound_cm_per_us: f32,
    /// Round-trip conversion factor, inches per microsecond of echo
    pub sound_in_per_us: f32,

    // --- Timing ---
    /// Main loop / periodic scheduler tick (ms)
    pub scheduler_tick_ms: u32,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            // Servo (standard hobby-servo range)
            servo_min_pulse_us: 544,
            servo_max_pulse_us: 2400,
            servo_home_angle: 90,
            servo_max_angle: 180,

            // Ultrasonic
            ultrasonic_attach_timeout_ms: 30,
            ultrasonic_detach_timeout_ms: 20,
            ultrasonic_min_timeout_ms: 1,
            ultrasonic_max_timeout_ms: 1000,
            sound_cm_per_us: 0.0343,
            sound_in_per_us: 0.0135,

            // Timing
            scheduler_tick_ms: 10,
        }
    }
}

impl ExtensionConfig {
    /// Reject values that would break a clamp or stall the dispatch loop.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.servo_min_pulse_us >= self.servo_max_pulse_us {
            return Err(ConfigError::ValidationFailed("servo pulse range is empty"));
        }
        if !(0..=self.servo_max_angle).contains(&self.servo_home_angle) {
            return Err(ConfigError::ValidationFailed("servo home angle outside angle range"));
        }
        if self.ultrasonic_min_timeout_ms == 0
            || self.ultrasonic_min_timeout_ms > self.ultrasonic_max_timeout_ms
        {
            return Err(ConfigError::ValidationFailed("ultrasonic timeout bounds"));
        }
        if !(self.ultrasonic_min_timeout_ms..=self.ultrasonic_max_timeout_ms)
            .contains(&self.ultrasonic_attach_timeout_ms)
        {
            return Err(ConfigError::ValidationFailed("ultrasonic attach timeout out of bounds"));
        }
        if self.sound_cm_per_us <= 0.0 || self.sound_in_per_us <= 0.0 {
            return Err(ConfigError::ValidationFailed("sound-speed factors must be positive"));
        }
        if self.scheduler_tick_ms == 0 {
            return Err(ConfigError::ValidationFailed("scheduler tick must be non-zero"));
        }
        Ok(())
    }

    /// Clamp a requested echo timeout into the configured bounds.
    pub fn clamp_timeout_ms(&self, requested: i64) -> u32 {
        requested.clamp(
            i64::from(self.ultrasonic_min_timeout_ms),
            i64::from(self.ultrasonic_max_timeout_ms),
        ) as u32
    }
}

/// Errors from configuration validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A field failed range validation; the message names which.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
