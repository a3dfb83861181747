//! Peripheral drivers behind the extension ports.

pub mod gpio;
pub mod neopixel;
pub mod servo;
