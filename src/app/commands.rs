//! Inbound commands to the extensions.
//!
//! The wire carries `(action, [params...])`.  Each extension gets a closed
//! command type whose variants hold typed, already-defaulted parameters,
//! so handlers never index into a raw list.  Parsing checks, in order:
//! instance id present, id inside the table, action known, enough params.

use crate::error::CommandError;
use crate::protocol::{self, ExtensionKind, Param, Pin};

use super::ports::{PulseRange, Unit};

/// A parsed command addressed to one instance slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command<Op> {
    /// Slot index, guaranteed `< capacity` of the owning table.
    pub id: usize,
    pub op: Op,
}

// ───────────────────────────────────────────────────────────────
// NeoPixel
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripInit {
    pub pin: Pin,
    pub pixel_count: u16,
    /// Driver colour-order / timing flags (NEO_GRB + NEO_KHZ800 = 0x52).
    pub kind: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetPixel {
    /// Unchecked; the handler drops the write when outside the strip.
    pub index: Param,
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// White channel; `0` selects a plain RGB colour.
    pub w: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fill {
    pub color: u32,
    /// Defaults to 0; negative clamps to 0 in the handler.
    pub first: Param,
    /// Defaults to 0; any count ≤ 0 means "to the end of the strip".
    pub count: Param,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeoPixelOp {
    Init(StripInit),
    SetPixel(SetPixel),
    Fill(Fill),
    Clear,
    Brightness(u8),
    Show,
}

pub type NeoPixelCommand = Command<NeoPixelOp>;

impl Command<NeoPixelOp> {
    pub fn parse(action: Param, params: &[Param]) -> Result<Self, CommandError> {
        let id = instance_id(ExtensionKind::NeoPixel, params)?;
        let op = match action {
            protocol::NEO_INIT => {
                require(action, params, 4)?;
                NeoPixelOp::Init(StripInit {
                    pin: to_pin(action, params[1])?,
                    pixel_count: to_u16(action, params[2].max(0))?,
                    kind: to_u16(action, params[3])?,
                })
            }
            protocol::NEO_SET_PIXEL => {
                require(action, params, 5)?;
                NeoPixelOp::SetPixel(SetPixel {
                    index: params[1],
                    r: channel(params[2]),
                    g: channel(params[3]),
                    b: channel(params[4]),
                    w: optional(params, 5).map_or(0, channel),
                })
            }
            protocol::NEO_FILL => {
                require(action, params, 2)?;
                NeoPixelOp::Fill(Fill {
                    // Packed colours arrive unsigned on the wire; keep the low 32 bits.
                    color: params[1] as u32,
                    first: optional(params, 2).unwrap_or(0),
                    count: optional(params, 3).unwrap_or(0),
                })
            }
            protocol::NEO_CLEAR => NeoPixelOp::Clear,
            protocol::NEO_BRIGHTNESS => {
                require(action, params, 2)?;
                NeoPixelOp::Brightness(channel(params[1]))
            }
            protocol::NEO_SHOW => NeoPixelOp::Show,
            _ => return Err(unknown(ExtensionKind::NeoPixel, action)),
        };
        Ok(Self { id, op })
    }
}

// ───────────────────────────────────────────────────────────────
// Servo
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServoOp {
    /// `range` is only present when both bounds were supplied.
    Attach { pin: Pin, range: Option<PulseRange> },
    Detach,
    /// Raw angle; clamped to `[0, 180]` by the handler.
    Write(Param),
    /// Raw pulse width; clamped to `[544, 2400]` by the handler.
    WriteMicroseconds(Param),
    Read,
    Attached,
}

pub type ServoCommand = Command<ServoOp>;

impl Command<ServoOp> {
    pub fn parse(action: Param, params: &[Param]) -> Result<Self, CommandError> {
        let id = instance_id(ExtensionKind::Servo, params)?;
        let op = match action {
            protocol::SERVO_ATTACH => {
                require(action, params, 2)?;
                let range = match (optional(params, 2), optional(params, 3)) {
                    (Some(min), Some(max)) => Some(PulseRange {
                        min_us: to_pin(action, min)?,
                        max_us: to_pin(action, max)?,
                    }),
                    _ => None,
                };
                ServoOp::Attach {
                    pin: to_pin(action, params[1])?,
                    range,
                }
            }
            protocol::SERVO_DETACH => ServoOp::Detach,
            protocol::SERVO_WRITE => {
                require(action, params, 2)?;
                ServoOp::Write(params[1])
            }
            protocol::SERVO_WRITE_MICROSECONDS => {
                require(action, params, 2)?;
                ServoOp::WriteMicroseconds(params[1])
            }
            protocol::SERVO_READ => ServoOp::Read,
            protocol::SERVO_ATTACHED => ServoOp::Attached,
            _ => return Err(unknown(ExtensionKind::Servo, action)),
        };
        Ok(Self { id, op })
    }
}

// ───────────────────────────────────────────────────────────────
// Ultrasonic
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UltrasonicOp {
    /// `echo == None` selects 3-wire mode (trigger and echo share a pin).
    Attach { trig: Pin, echo: Option<Pin> },
    Detach,
    /// `interval_ms > 0` registers a periodic read instead of measuring.
    Read { unit: Unit, interval_ms: Param },
    SetTimeout(Param),
    /// Stop periodic reads.
    End,
}

pub type UltrasonicCommand = Command<UltrasonicOp>;

impl Command<UltrasonicOp> {
    pub fn parse(action: Param, params: &[Param]) -> Result<Self, CommandError> {
        let id = instance_id(ExtensionKind::Ultrasonic, params)?;
        let op = match action {
            protocol::ULTRASONIC_ATTACH => {
                require(action, params, 2)?;
                let echo = match optional(params, 2) {
                    Some(pin) if pin >= 0 => Some(to_pin(action, pin)?),
                    _ => None,
                };
                UltrasonicOp::Attach {
                    trig: to_pin(action, params[1])?,
                    echo,
                }
            }
            protocol::ULTRASONIC_DETACH => UltrasonicOp::Detach,
            protocol::ULTRASONIC_READ => UltrasonicOp::Read {
                unit: optional(params, 1).map_or(Unit::Centimeters, Unit::from_code),
                interval_ms: optional(params, 2).unwrap_or(0),
            },
            protocol::ULTRASONIC_SET_TIMEOUT => {
                require(action, params, 2)?;
                UltrasonicOp::SetTimeout(params[1])
            }
            protocol::END => UltrasonicOp::End,
            _ => return Err(unknown(ExtensionKind::Ultrasonic, action)),
        };
        Ok(Self { id, op })
    }
}

// ───────────────────────────────────────────────────────────────
// Parameter helpers
// ───────────────────────────────────────────────────────────────

fn instance_id(kind: ExtensionKind, params: &[Param]) -> Result<usize, CommandError> {
    let raw = *params.first().ok_or(CommandError::EmptyParams)?;
    usize::try_from(raw)
        .ok()
        .filter(|&id| id < kind.capacity())
        .ok_or(CommandError::InvalidId { kind, id: raw })
}

fn require(action: Param, params: &[Param], needed: usize) -> Result<(), CommandError> {
    if params.len() < needed {
        return Err(CommandError::InsufficientParams {
            action,
            needed,
            got: params.len(),
        });
    }
    Ok(())
}

fn optional(params: &[Param], index: usize) -> Option<Param> {
    params.get(index).copied()
}

fn unknown(kind: ExtensionKind, action: Param) -> CommandError {
    CommandError::UnknownAction { kind, action }
}

fn to_pin(action: Param, value: Param) -> Result<Pin, CommandError> {
    Pin::try_from(value).map_err(|_| CommandError::ParamOutOfRange { action, value })
}

fn to_u16(action: Param, value: Param) -> Result<u16, CommandError> {
    u16::try_from(value).map_err(|_| CommandError::ParamOutOfRange { action, value })
}

/// Colour / brightness channel, saturated into `0..=255`.
///
/// Unlike Adafruit_NeoPixel's `uint8_t` arguments, where 300 wraps to 44,
/// out-of-range values saturate: 300 becomes 255 and negatives become 0.
fn channel(value: Param) -> u8 {
    value.clamp(0, 255) as u8
}
