//! Application service — the hexagonal core.
//!
//! [`AppService`] owns the channel bank, mode store, and current monitor.
//! It exposes a clean, hardware-agnostic API.  All I/O flows through
//! port traits injected at call sites, making the entire service
//! testable with mock adapters.
//!
//! ```text
//!  FrameReceiver ──▶ ┌────────────────────────┐ ──▶ EventSink
//!                    │       AppService        │
//! CurrentSensePort ─▶│ Channels · Modes ·      │──▶ OutputPort
//!     StoragePort ◀─▶│ Current interlock       │
//!                    └────────────────────────┘
//! ```

use log::{info, warn};

use crate::can::decode;
use crate::can::receiver::FrameReceiver;
use crate::channels::ChannelBank;
use crate::config::SystemConfig;
use crate::error::Fault;
use crate::modes::ModeStore;
use crate::monitor::{CurrentMonitor, InterlockEvent};

use super::events::{AppEvent, TelemetryData};
use super::ports::{BusHealthPort, CurrentSensePort, EventSink, OutputPort, StoragePort};

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService {
    bank: ChannelBank,
    modes: ModeStore,
    monitor: CurrentMonitor,
    config: SystemConfig,
    bus_id: u32,

    // Cadence timestamps (milliseconds, monotonic).
    last_current_check_ms: u64,
    last_mode_flush_ms: u64,
    last_telemetry_ms: u64,

    // Running counters for telemetry.
    decode_misses: u32,
    conflicts: u32,
    reported_drops: u32,
    last_milliamps: i32,
}

impl AppService {
    /// Construct the service from configuration.
    ///
    /// Does **not** load the mode store — call [`start`](Self::start)
    /// with the storage port next.
    pub fn new(config: SystemConfig, bus_id: u32) -> Self {
        let bank = ChannelBank::new(config.max_concurrent);
        let monitor = CurrentMonitor::new(config.current_budget_ma, config.overcurrent_latching);
        Self {
            bank,
            modes: ModeStore::new(),
            monitor,
            config,
            bus_id,
            last_current_check_ms: 0,
            last_mode_flush_ms: 0,
            last_telemetry_ms: 0,
            decode_misses: 0,
            conflicts: 0,
            reported_drops: 0,
            last_milliamps: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Load persisted modes and announce startup.
    pub fn start(&mut self, store: &mut dyn StoragePort, sink: &mut impl EventSink) {
        self.modes.load(store);
        sink.emit(&AppEvent::Started { bus_id: self.bus_id });
        info!("service started, filtering id 0x{:08X}", self.bus_id);
    }

    /// Startup override window: if a frame is already waiting, its
    /// override keys may force pair modes before the first control tick.
    ///
    /// The frame is consumed for mode selection only — its signal levels
    /// do not drive outputs, so an override key held at power-up cannot
    /// also fire its channel.
    pub fn run_startup_override<const CAP: usize>(
        &mut self,
        rx: &FrameReceiver<CAP>,
        store: &mut dyn StoragePort,
        sink: &mut impl EventSink,
    ) {
        let Some(frame) = rx.extract() else {
            return;
        };
        let decoded = decode::decode(&frame);
        for (pair, mode) in self.modes.check_startup_override(&decoded, store) {
            info!("startup override: {pair} forced to {mode:?}");
            sink.emit(&AppEvent::ModeChanged { pair, mode });
        }
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control cycle: drain frames → decode → channel transitions
    /// → outputs, plus the slower current / flush / telemetry cadences.
    ///
    /// The `hw` parameter satisfies the output, current-sense, and bus
    /// health ports at once — this avoids a double mutable borrow while
    /// keeping the port boundary explicit.
    pub fn tick<const CAP: usize>(
        &mut self,
        now_ms: u64,
        rx: &FrameReceiver<CAP>,
        hw: &mut (impl OutputPort + CurrentSensePort + BusHealthPort),
        store: &mut dyn StoragePort,
        sink: &mut impl EventSink,
    ) {
        // 1. Drain every queued frame through decode → channel bank.
        while let Some(frame) = rx.extract() {
            for (byte_index, stray) in decode::stray_bits(&frame) {
                self.decode_misses += 1;
                warn!("{}", Fault::DecodeMiss { byte_index, stray });
                sink.emit(&AppEvent::DecodeMiss { byte_index, stray });
            }

            // The bank folds the frame in even while tripped so edge
            // history stays accurate; outputs remain forced off below.
            let decoded = decode::decode(&frame);
            let rejected = self.bank.apply_decoded(&decoded, &self.modes);
            for function in rejected {
                self.conflicts += 1;
                warn!("{}", Fault::ChannelConflict { function });
                sink.emit(&AppEvent::ChannelConflict { function });
            }
        }

        // 2. Report any new queue drops since last tick.
        let drops = rx.frames_dropped();
        if drops != self.reported_drops {
            self.reported_drops = drops;
            warn!("{}, total {drops}", Fault::FrameDropped);
            sink.emit(&AppEvent::FrameDropped { total: drops });
        }

        // 3. Drive the outputs (held at zero while tripped).
        if self.monitor.is_tripped() {
            hw.all_off();
        } else {
            hw.apply(self.bank.output_bitmap());
        }

        // 4. Current interlock cadence.
        if now_ms.saturating_sub(self.last_current_check_ms) >= self.config.current_check_interval_ms as u64 {
            self.last_current_check_ms = now_ms;
            self.check_current(hw, sink);
        }

        // 5. Retry deferred mode writes.
        if now_ms.saturating_sub(self.last_mode_flush_ms) >= self.config.mode_flush_interval_ms as u64 {
            self.last_mode_flush_ms = now_ms;
            self.modes.flush_if_dirty(store);
        }

        // 6. Bus health.
        if !hw.healthy() {
            warn!("{}, reinitialising", Fault::CommFailure);
            match hw.reinit() {
                Ok(()) => sink.emit(&AppEvent::BusReinit),
                Err(e) => warn!("bus reinit failed: {e}"),
            }
        }

        // 7. Telemetry cadence.
        if now_ms.saturating_sub(self.last_telemetry_ms) >= self.config.telemetry_interval_ms as u64 {
            self.last_telemetry_ms = now_ms;
            sink.emit(&AppEvent::Telemetry(self.build_telemetry(rx)));
        }
    }

    fn check_current(
        &mut self,
        hw: &mut (impl OutputPort + CurrentSensePort),
        sink: &mut impl EventSink,
    ) {
        let reading = self.monitor.sample_filtered(hw, self.config.current_samples);
        self.last_milliamps = reading.milliamps;

        match self.monitor.check_interlock(self.bank.any_active(), reading) {
            Some(InterlockEvent::OverCurrent { milliamps }) => {
                warn!(
                    "{} (budget {} mA)",
                    Fault::OverCurrent { milliamps },
                    self.config.current_budget_ma
                );
                self.bank.force_all_off();
                hw.all_off();
                sink.emit(&AppEvent::OverCurrent { milliamps });
            }
            Some(InterlockEvent::Cleared) => {
                info!("interlock cleared, {} mA", reading.milliamps);
                sink.emit(&AppEvent::InterlockCleared);
            }
            None => {}
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Build a telemetry snapshot from the current state.
    pub fn build_telemetry<const CAP: usize>(&self, rx: &FrameReceiver<CAP>) -> TelemetryData {
        TelemetryData {
            bitmap: self.bank.last_bitmap(),
            milliamps: self.last_milliamps,
            frames_seen: rx.frames_seen(),
            frames_dropped: rx.frames_dropped(),
            decode_misses: self.decode_misses,
            conflicts: self.conflicts,
            modes: self.modes.all(),
            interlock_tripped: self.monitor.is_tripped(),
        }
    }

    pub fn interlock_tripped(&self) -> bool {
        self.monitor.is_tripped()
    }

    /// Manual interlock release for the latching configuration.
    pub fn clear_interlock(&mut self) {
        self.monitor.clear_interlock();
    }

    pub fn modes(&self) -> &ModeStore {
        &self.modes
    }

    /// Clone of the live configuration.
    pub fn current_config(&self) -> SystemConfig {
        self.config.clone()
    }
}
