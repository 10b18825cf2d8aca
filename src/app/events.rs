//! Structured domain events emitted through the [`EventSink`] port.
//!
//! [`EventSink`]: super::ports::EventSink

use crate::can::decode::{FunctionId, Pair};
use crate::modes::ChannelMode;

/// Everything noteworthy the domain does, as data.  Adapters decide how
/// to render or forward it.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Service came up and is filtering on `bus_id`.
    Started { bus_id: u32 },
    /// A matching frame was discarded because the queue was full.
    /// `total` is the running drop count.
    FrameDropped { total: u32 },
    /// A signal-bearing byte carried bits no lookup entry covers.
    DecodeMiss { byte_index: u8, stray: u8 },
    /// An activation was refused by the concurrency cap.
    ChannelConflict { function: FunctionId },
    /// A pair's persisted mode changed.
    ModeChanged { pair: Pair, mode: ChannelMode },
    /// Bank current exceeded the budget; all outputs were forced off.
    OverCurrent { milliamps: i32 },
    /// Current fell back under budget and the interlock released.
    InterlockCleared,
    /// The bus controller was found unhealthy and reinitialised.
    BusReinit,
    /// Periodic state snapshot.
    Telemetry(TelemetryData),
}

/// Snapshot payload for [`AppEvent::Telemetry`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryData {
    /// Current 12-bit output bitmap.
    pub bitmap: u16,
    /// Last filtered bank current reading.
    pub milliamps: i32,
    pub frames_seen: u32,
    pub frames_dropped: u32,
    pub decode_misses: u32,
    pub conflicts: u32,
    /// Per-pair modes, indexed by [`Pair`] discriminant.
    pub modes: [ChannelMode; Pair::COUNT],
    pub interlock_tripped: bool,
}
