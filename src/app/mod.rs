//! Application core: pure command logic, zero I/O.
//!
//! Typed commands, the port traits every driver implements, and the
//! [`service::Dispatcher`] that routes host commands to the extensions.
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod ports;
pub mod service;
