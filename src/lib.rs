//! Pardalote extension firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod extensions;
pub mod protocol;
pub mod scheduler;

// Driver and adapter modules carry host simulations, so they build on
// every target.
pub mod adapters;
pub mod drivers;
