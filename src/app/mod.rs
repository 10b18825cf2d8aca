//! Application core: domain events, port traits, and the control service.
//!
//! Nothing in this module touches hardware.  Adapters plug into the port
//! traits; the [`service::AppService`] orchestrates the capture → decode →
//! actuate pipeline through them.

pub mod events;
pub mod ports;
pub mod service;
