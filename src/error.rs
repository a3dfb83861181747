//! Unified error types for the extension layer.
//!
//! Nothing here is fatal.  Every variant describes one dropped command;
//! the dispatcher turns it into a diagnostic and moves on to the next.
//! All variants are `Copy` so they can be logged and compared in tests
//! without allocation.

use core::fmt;

use crate::protocol::{ExtensionKind, Param};

// ---------------------------------------------------------------------------
// Top-level dispatch error
// ---------------------------------------------------------------------------

/// Every rejected command funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// The parameter list could not be turned into a command.
    Command(CommandError),
    /// The command was well-formed but the target instance refused it.
    Extension(ExtensionError),
    /// Neither the device id nor the action code names an extension.
    UnsupportedDevice { device: Param, action: Param },
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command(e) => write!(f, "command: {e}"),
            Self::Extension(e) => write!(f, "extension: {e}"),
            Self::UnsupportedDevice { device, action } => {
                write!(f, "no extension for device {device} action {action}")
            }
        }
    }
}

impl std::error::Error for DispatchError {}

// ---------------------------------------------------------------------------
// Command (parse) errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// No instance id at all.
    EmptyParams,
    /// Instance id outside the extension's table.
    InvalidId { kind: ExtensionKind, id: Param },
    /// Fewer positional parameters than the action requires.
    InsufficientParams {
        action: Param,
        needed: usize,
        got: usize,
    },
    /// Action code inside a recognised device range that nothing handles.
    UnknownAction { kind: ExtensionKind, action: Param },
    /// A parameter does not fit the field it feeds (pin, pixel count, ...).
    ParamOutOfRange { action: Param, value: Param },
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyParams => write!(f, "missing instance id"),
            Self::InvalidId { kind, id } => write!(f, "invalid {kind} id {id}"),
            Self::InsufficientParams { action, needed, got } => {
                write!(f, "action {action} needs {needed} params, got {got}")
            }
            Self::UnknownAction { kind, action } => write!(f, "unknown {kind} action {action}"),
            Self::ParamOutOfRange { action, value } => {
                write!(f, "action {action}: parameter {value} out of range")
            }
        }
    }
}

impl From<CommandError> for DispatchError {
    fn from(e: CommandError) -> Self {
        Self::Command(e)
    }
}

// ---------------------------------------------------------------------------
// Extension (execution) errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionError {
    /// Target slot is not initialised / attached.
    NotActive { kind: ExtensionKind, id: usize },
    /// Pixel index outside `[0, pixelCount)`; the whole write is dropped.
    IndexOutOfRange { index: Param, len: u16 },
    /// The driver could not provide a handle (no free channel, bad pin).
    HardwareUnavailable { kind: ExtensionKind, id: usize },
}

impl fmt::Display for ExtensionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotActive { kind, id } => write!(f, "{kind} {id} not active"),
            Self::IndexOutOfRange { index, len } => {
                write!(f, "pixel index {index} outside strip of {len}")
            }
            Self::HardwareUnavailable { kind, id } => {
                write!(f, "no hardware available for {kind} {id}")
            }
        }
    }
}

impl From<ExtensionError> for DispatchError {
    fn from(e: ExtensionError) -> Self {
        Self::Extension(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Extension-wide `Result` alias.
pub type Result<T> = core::result::Result<T, DispatchError>;
