//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! A diagnostic bus back-channel would implement the same trait.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::modes::ChannelMode;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { bus_id } => {
                info!("START | bus_id=0x{:08X}", bus_id);
            }
            AppEvent::FrameDropped { total } => {
                warn!("QUEUE | frame dropped, total={}", total);
            }
            AppEvent::DecodeMiss { byte_index, stray } => {
                warn!("DECODE | stray bits byte[{}]=0b{:08b}", byte_index, stray);
            }
            AppEvent::ChannelConflict { function } => {
                warn!("CAP | {} refused, concurrency limit reached", function);
            }
            AppEvent::ModeChanged { pair, mode } => {
                info!("MODE | {} -> {:?}", pair, mode);
            }
            AppEvent::OverCurrent { milliamps } => {
                warn!("INTERLOCK | overcurrent {} mA, all outputs off", milliamps);
            }
            AppEvent::InterlockCleared => {
                info!("INTERLOCK | cleared");
            }
            AppEvent::BusReinit => {
                warn!("BUS | controller reinitialised");
            }
            AppEvent::Telemetry(t) => {
                info!(
                    "TELEM | bitmap=0b{:012b} | I={}mA | seen={} dropped={} | \
                     misses={} conflicts={} | modes={} | tripped={}",
                    t.bitmap,
                    t.milliamps,
                    t.frames_seen,
                    t.frames_dropped,
                    t.decode_misses,
                    t.conflicts,
                    ModeSummary(&t.modes),
                    t.interlock_tripped,
                );
            }
        }
    }
}

/// Compact per-pair mode rendering, e.g. `MMLMMM`.
struct ModeSummary<'a>(&'a [ChannelMode]);

impl core::fmt::Display for ModeSummary<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for mode in self.0 {
            let c = match mode {
                ChannelMode::Momentary => 'M',
                ChannelMode::Latch => 'L',
            };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}
