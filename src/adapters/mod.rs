//! Driven adapters: concrete implementations of the port traits in
//! [`crate::app::ports`].  Each adapter is dual-target — real peripherals
//! on ESP-IDF, injectable simulation backends on the host.

pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod time;
