//! Host protocol identifiers.
//!
//! Device ids, action codes, table capacities and report-id namespaces
//! shared by the host library and the firmware.  Everything the host can
//! put on the wire is named here; the extensions never hard-code a number.
//!
//! | Range     | Owner                                  |
//! |-----------|----------------------------------------|
//! | 1–6       | Core pin actions (external command loop) |
//! | 10–19     | NeoPixel extension                     |
//! | 20–29     | Servo extension                        |
//! | 30–39     | Ultrasonic extension                   |
//! | 200+      | Extension device ids                   |

pub mod frame;

use core::fmt;

/// Parameters arrive as JSON integers; `i64` holds a packed `0xWWRRGGBB`
/// colour as well as negative sentinels.
pub type Param = i64;

/// GPIO number as the host addresses it.
pub type Pin = i32;

// ---------------------------------------------------------------------------
// Core actions
// ---------------------------------------------------------------------------

/// Stop a registered (periodic) action.
pub const END: Param = 6;

// ---------------------------------------------------------------------------
// Extension device ids
// ---------------------------------------------------------------------------

pub const NEO_PIXEL_DEVICE: Param = 200;
pub const SERVO_DEVICE: Param = 201;
pub const ULTRASONIC_DEVICE: Param = 202;

// ---------------------------------------------------------------------------
// NeoPixel actions (10-19)
// ---------------------------------------------------------------------------

/// `[stripId, pin, numPixels, type]`
pub const NEO_INIT: Param = 10;
/// `[stripId, index, r, g, b (, w)]`
pub const NEO_SET_PIXEL: Param = 11;
/// `[stripId, color (, first, count)]`
pub const NEO_FILL: Param = 12;
/// `[stripId]`
pub const NEO_CLEAR: Param = 13;
/// `[stripId, value]`
pub const NEO_BRIGHTNESS: Param = 14;
/// `[stripId]`
pub const NEO_SHOW: Param = 15;

// ---------------------------------------------------------------------------
// Servo actions (20-29)
// ---------------------------------------------------------------------------

/// `[servoId, pin (, minPulseUs, maxPulseUs)]`
pub const SERVO_ATTACH: Param = 20;
/// `[servoId]`
pub const SERVO_DETACH: Param = 21;
/// `[servoId, angle]`
pub const SERVO_WRITE: Param = 22;
/// `[servoId, microseconds]`
pub const SERVO_WRITE_MICROSECONDS: Param = 23;
/// `[servoId]`
pub const SERVO_READ: Param = 24;
/// `[servoId]`
pub const SERVO_ATTACHED: Param = 25;

// ---------------------------------------------------------------------------
// Ultrasonic actions (30-39)
// ---------------------------------------------------------------------------

/// `[sensorId, trigPin (, echoPin)]`
pub const ULTRASONIC_ATTACH: Param = 30;
/// `[sensorId]`
pub const ULTRASONIC_DETACH: Param = 31;
/// `[sensorId (, unit (, intervalMs))]`
pub const ULTRASONIC_READ: Param = 32;
/// `[sensorId, timeoutMs]`
pub const ULTRASONIC_SET_TIMEOUT: Param = 33;

// ---------------------------------------------------------------------------
// Table capacities and report namespaces
// ---------------------------------------------------------------------------

pub const MAX_STRIPS: usize = 8;
pub const MAX_SERVOS: usize = 12;
pub const MAX_ULTRASONIC: usize = 8;

/// Servo reports are tagged `servoId + 1000` so they never collide with
/// pin-numbered core reports.
pub const SERVO_REPORT_OFFSET: i32 = 1000;
/// Ultrasonic reports (and periodic registrations) use `sensorId + 2000`.
pub const ULTRASONIC_REPORT_OFFSET: i32 = 2000;

/// Value reported when a read cannot be satisfied.
pub const NO_READING: f32 = -1.0;

/// The three extension families this firmware hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionKind {
    NeoPixel,
    Servo,
    Ultrasonic,
}

impl ExtensionKind {
    /// Number of instance slots in the extension's table.
    pub const fn capacity(self) -> usize {
        match self {
            Self::NeoPixel => MAX_STRIPS,
            Self::Servo => MAX_SERVOS,
            Self::Ultrasonic => MAX_ULTRASONIC,
        }
    }

    /// Classify an action code by its numeric range.
    ///
    /// `END` is shared with the core pin actions, so it only resolves to
    /// the ultrasonic extension when the frame is addressed to device 202.
    pub fn route(device_id: Param, action: Param) -> Option<Self> {
        match action {
            10..=19 => Some(Self::NeoPixel),
            20..=29 => Some(Self::Servo),
            30..=39 => Some(Self::Ultrasonic),
            END if device_id == ULTRASONIC_DEVICE => Some(Self::Ultrasonic),
            _ => None,
        }
    }
}

impl fmt::Display for ExtensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NeoPixel => write!(f, "NeoPixel strip"),
            Self::Servo => write!(f, "servo"),
            Self::Ultrasonic => write!(f, "ultrasonic sensor"),
        }
    }
}

/// Report identifier for a servo instance.
pub const fn servo_report_id(servo_id: usize) -> i32 {
    servo_id as i32 + SERVO_REPORT_OFFSET
}

/// Report identifier for an ultrasonic instance.
pub const fn ultrasonic_report_id(sensor_id: usize) -> i32 {
    sensor_id as i32 + ULTRASONIC_REPORT_OFFSET
}
