//! Unified error and fault types for the solenoid bank firmware.
//!
//! A single [`Fault`] enum covers every runtime condition the control loop
//! handles locally; none of them terminate the loop.  All variants are
//! `Copy` so they can be passed through the service and event sink without
//! allocation.  Fallible init paths use [`Error`] with `?` propagation up
//! to `main()`.

use core::fmt;

use crate::app::ports::StorageError;
use crate::can::decode::FunctionId;

// ---------------------------------------------------------------------------
// Runtime faults (handled locally, never fatal)
// ---------------------------------------------------------------------------

/// Every abnormal condition the control loop can encounter at runtime.
///
/// `OverCurrent` is the only variant that triggers a cross-component state
/// change (forcing the channel bank off); the rest are counted or logged
/// and otherwise ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The capture queue was full; the newest frame was discarded.
    FrameDropped,
    /// A signal-bearing data byte carried set bits no lookup entry covers.
    DecodeMiss { byte_index: u8, stray: u8 },
    /// Activating the function would exceed the concurrency cap.
    ChannelConflict { function: FunctionId },
    /// A persisted byte was out of range and has been self-healed.
    ConfigInvalid { key: u8, raw: u8 },
    /// Filtered load current exceeded the configured budget.
    OverCurrent { milliamps: i32 },
    /// The bus controller looks stuck; a re-initialisation was requested.
    CommFailure,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FrameDropped => write!(f, "frame dropped (queue full)"),
            Self::DecodeMiss { byte_index, stray } => {
                write!(f, "decode miss: byte {byte_index} stray bits {stray:#04x}")
            }
            Self::ChannelConflict { function } => {
                write!(f, "channel conflict on {function}")
            }
            Self::ConfigInvalid { key, raw } => {
                write!(f, "invalid persisted byte {raw:#04x} at key {key:#04x}")
            }
            Self::OverCurrent { milliamps } => write!(f, "overcurrent: {milliamps} mA"),
            Self::CommFailure => write!(f, "bus controller stuck"),
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level firmware error (init / persistence paths)
// ---------------------------------------------------------------------------

/// Fallible non-loop operations (boot, persistence) funnel into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
    /// The persistent store rejected a read or write.
    Storage(StorageError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
