//! JSON frame codec for the host link.
//!
//! Inbound frames are batches of commands:
//!
//! ```text
//! {"header":{"version":1},"data":[{"id":200,"action":10,"params":[0,6,16,82]}, ...]}
//! ```
//!
//! A bare command object (`{"id":..,"action":..,"params":[..]}`) is also
//! accepted.  Parameters may be JSON floats; they are truncated toward
//! zero, as a C `(int)` cast would.  Outbound frames carry return
//! messages:
//!
//! ```text
//! {"header":{"version":1},"data":[{"id":1002,"type":24,"value":90.0}]}
//! ```

use core::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

use super::Param;

/// Protocol version written into outbound headers.
pub const PROTOCOL_VERSION: u32 = 1;

/// One decoded host command: device (or pin) id, action code, parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireCommand {
    pub id: Param,
    pub action: Param,
    #[serde(default, deserialize_with = "truncating_params")]
    pub params: Vec<Param>,
}

/// One numeric parameter, integer or float.
struct WireParam(Param);

impl<'de> Deserialize<'de> for WireParam {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ParamVisitor;

        impl Visitor<'_> for ParamVisitor {
            type Value = WireParam;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a number")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<WireParam, E> {
                Ok(WireParam(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<WireParam, E> {
                Ok(WireParam(Param::try_from(v).unwrap_or(Param::MAX)))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<WireParam, E> {
                if !v.is_finite() {
                    return Err(E::custom("non-finite parameter"));
                }
                // `as` saturates out-of-range floats.
                Ok(WireParam(v.trunc() as Param))
            }
        }

        deserializer.deserialize_any(ParamVisitor)
    }
}

fn truncating_params<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Param>, D::Error> {
    let raw = Vec::<WireParam>::deserialize(deserializer)?;
    Ok(raw.into_iter().map(|p| p.0).collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub version: u32,
}

/// A batch of commands as sent by the host library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundBatch {
    #[serde(default)]
    pub header: Option<Header>,
    pub data: Vec<WireCommand>,
}

/// A single asynchronous result for the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnMessage {
    /// Report identifier (pin number, `servoId + 1000`, `sensorId + 2000`).
    pub id: i32,
    /// Action code that produced the value.
    #[serde(rename = "type")]
    pub action: Param,
    pub value: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundBatch {
    pub header: Header,
    pub data: Vec<ReturnMessage>,
}

/// Errors from frame decoding / encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Input was not valid JSON or did not match either frame shape.
    Malformed,
    /// Header announced a protocol version this firmware does not speak.
    UnsupportedVersion(u32),
    /// Serialising an outbound frame failed.
    Encode,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed frame"),
            Self::UnsupportedVersion(v) => write!(f, "unsupported protocol version {}", v),
            Self::Encode => write!(f, "frame encode failed"),
        }
    }
}

impl std::error::Error for FrameError {}

#[derive(Deserialize)]
#[serde(untagged)]
enum AnyInbound {
    Batch(InboundBatch),
    Single(WireCommand),
}

/// Decode one inbound frame into its commands, preserving order.
pub fn decode_inbound(bytes: &[u8]) -> Result<Vec<WireCommand>, FrameError> {
    let frame: AnyInbound = serde_json::from_slice(bytes).map_err(|_| FrameError::Malformed)?;
    match frame {
        AnyInbound::Batch(batch) => {
            if let Some(header) = batch.header {
                if header.version != PROTOCOL_VERSION {
                    return Err(FrameError::UnsupportedVersion(header.version));
                }
            }
            Ok(batch.data)
        }
        AnyInbound::Single(cmd) => Ok(vec![cmd]),
    }
}

/// Serialise pending return messages as one outbound frame.
pub fn encode_outbound(messages: &[ReturnMessage]) -> Result<String, FrameError> {
    let batch = OutboundBatch {
        header: Header {
            version: PROTOCOL_VERSION,
        },
        data: messages.to_vec(),
    };
    serde_json::to_string(&batch).map_err(|_| FrameError::Encode)
}
