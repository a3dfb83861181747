//! The three device extensions.
//!
//! Each extension owns a fixed-capacity table indexed by instance id and
//! is driven exclusively through its `handle_action` entry point (plus
//! the scheduler callback for ultrasonic sensors).

pub mod neopixel;
pub mod servo;
pub mod ultrasonic;

pub use neopixel::NeoPixelExtension;
pub use servo::ServoExtension;
pub use ultrasonic::UltrasonicExtension;
