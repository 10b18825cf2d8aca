//! Persisted per-pair channel modes.
//!
//! Each of the six pairs runs either momentary (output follows the bus
//! bit) or latch (rising edge toggles on, partner edge releases).  The
//! choice survives power cycles in the byte store and self-heals: an
//! unreadable or out-of-range byte falls back to momentary and is written
//! back once, so a corrupt store converges instead of warning forever.

use log::{info, warn};

use crate::app::ports::{StoragePort, StoreKey};
use crate::can::decode::{DecodedSignals, FunctionId, Pair};
use crate::error::Fault;

/// Operating mode of one channel pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ChannelMode {
    /// Output level follows the decoded signal level.
    #[default]
    Momentary = 0,
    /// Rising edge latches on; the partner's rising edge releases.
    Latch = 1,
}

impl ChannelMode {
    /// `None` for any byte that is not a valid stored mode.
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Momentary),
            1 => Some(Self::Latch),
            _ => None,
        }
    }
}

/// In-RAM mirror of the persisted pair modes, write-through on change.
pub struct ModeStore {
    modes: [ChannelMode; Pair::COUNT],
    dirty: bool,
}

impl ModeStore {
    pub const fn new() -> Self {
        Self {
            modes: [ChannelMode::Momentary; Pair::COUNT],
            dirty: false,
        }
    }

    /// Populate from the byte store, formatting it on first boot and
    /// healing any invalid entries in place.
    pub fn load(&mut self, store: &mut dyn StoragePort) {
        if !store.is_initialized() {
            info!("mode store unformatted, writing defaults");
            for pair in Pair::ALL {
                self.modes[pair.index()] = ChannelMode::Momentary;
                if let Err(e) = store.write_byte(StoreKey::PairMode(pair), ChannelMode::Momentary as u8) {
                    warn!("mode write for {pair} failed: {e}");
                }
            }
            if let Err(e) = store.write_byte(StoreKey::InitMarker, StoreKey::INIT_MARKER) {
                warn!("init marker write failed: {e}");
            }
            return;
        }

        for pair in Pair::ALL {
            let key = StoreKey::PairMode(pair);
            let raw = store.read_byte(key);
            let mode = match raw.ok().and_then(ChannelMode::from_raw) {
                Some(mode) => mode,
                None => {
                    warn!(
                        "{}, healing to momentary",
                        Fault::ConfigInvalid {
                            key: key.address(),
                            raw: raw.unwrap_or(0xFF),
                        }
                    );
                    if let Err(e) = store.write_byte(key, ChannelMode::Momentary as u8) {
                        warn!("mode heal for {pair} failed: {e}");
                    }
                    ChannelMode::Momentary
                }
            };
            self.modes[pair.index()] = mode;
        }
    }

    pub fn get(&self, pair: Pair) -> ChannelMode {
        self.modes[pair.index()]
    }

    pub fn all(&self) -> [ChannelMode; Pair::COUNT] {
        self.modes
    }

    /// Change a pair's mode, writing through to the store immediately.
    /// A write failure leaves the RAM copy updated and the store dirty;
    /// [`flush_if_dirty`](Self::flush_if_dirty) retries later.
    pub fn set(&mut self, pair: Pair, mode: ChannelMode, store: &mut dyn StoragePort) {
        if self.modes[pair.index()] == mode {
            return;
        }
        self.modes[pair.index()] = mode;
        match store.write_byte(StoreKey::PairMode(pair), mode as u8) {
            Ok(()) => {}
            Err(e) => {
                warn!("mode write for {pair} failed: {e}, will retry");
                self.dirty = true;
            }
        }
    }

    /// Retry any writes that failed in [`set`](Self::set).
    pub fn flush_if_dirty(&mut self, store: &mut dyn StoragePort) {
        if !self.dirty {
            return;
        }
        let mut all_ok = true;
        for pair in Pair::ALL {
            if store
                .write_byte(StoreKey::PairMode(pair), self.modes[pair.index()] as u8)
                .is_err()
            {
                all_ok = false;
            }
        }
        self.dirty = !all_ok;
    }

    /// Startup override: specific functions asserted in the first frame
    /// after boot force their pair's mode.
    ///
    /// Pair 1: `C` forces momentary, else `D` forces latch.
    /// Pair 6: `L` forces momentary, else `J` forces latch.
    ///
    /// Returns the pairs actually changed, already persisted.
    pub fn check_startup_override(
        &mut self,
        decoded: &DecodedSignals,
        store: &mut dyn StoragePort,
    ) -> heapless::Vec<(Pair, ChannelMode), 2> {
        let on = |f: FunctionId| decoded.iter().any(|&(df, level)| df == f && level);

        let mut changed = heapless::Vec::new();
        let overrides = [
            (Pair::Pair1, FunctionId::C, FunctionId::D),
            (Pair::Pair6, FunctionId::L, FunctionId::J),
        ];
        for (pair, momentary_key, latch_key) in overrides {
            let forced = if on(momentary_key) {
                Some(ChannelMode::Momentary)
            } else if on(latch_key) {
                Some(ChannelMode::Latch)
            } else {
                None
            };
            if let Some(mode) = forced {
                if self.get(pair) != mode {
                    self.set(pair, mode, store);
                    let _ = changed.push((pair, mode));
                }
            }
        }
        changed
    }
}

impl Default for ModeStore {
    fn default() -> Self {
        Self::new()
    }
}
