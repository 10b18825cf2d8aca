//! Solenoid bank controller firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod can;
pub mod channels;
pub mod config;
pub mod modes;
pub mod monitor;

mod error;
pub mod pins;

pub use error::{Error, Fault, Result};

// Dual-target modules: real peripherals on ESP-IDF, simulation backends
// on the host.
pub mod adapters;
pub mod drivers;
