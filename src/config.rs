//! System configuration parameters.
//!
//! All tunable parameters for the solenoid bank controller.  The
//! [`SystemConfig`] blob is persisted through the NVS adapter; the bus
//! settings (baud selector + identifier) live in the byte-keyed store so
//! a field tool can patch them without reflashing.

use serde::{Deserialize, Serialize};

use crate::app::ports::{StoragePort, StoreKey};

/// Default 29-bit extended identifier the receiver filters on.
pub const DEFAULT_BUS_ID: u32 = 0x14FF_FFB0;

// ---------------------------------------------------------------------------
// Current sensor constants (ACS712-30A on a 10-bit, 5 V ADC front end)
// ---------------------------------------------------------------------------

/// ADC reference voltage (volts).
pub const ADC_REF_VOLTAGE: f32 = 5.0;
/// ADC full-scale count (10-bit).
pub const ADC_RESOLUTION: u16 = 1024;
/// Sensor output at zero current: 2.5 V midpoint = 512 counts.
pub const CURRENT_SENSOR_ZERO_POINT: u16 = 512;
/// Sensor sensitivity: 66 mV per amp.
pub const CURRENT_SENSOR_SENSITIVITY_V_PER_A: f32 = 0.066;

/// Core system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Channels ---
    /// Maximum simultaneously active momentary-mode functions.
    pub max_concurrent: u8,

    // --- Safety ---
    /// Total-current budget in milliamps; exceeding it trips the interlock.
    pub current_budget_ma: i32,
    /// When true the overcurrent interlock stays tripped until explicitly
    /// cleared; when false it auto-clears once current drops back under
    /// budget.
    pub overcurrent_latching: bool,
    /// Number of consecutive ADC samples averaged per current reading.
    pub current_samples: u8,

    // --- Timing ---
    /// Frame-extraction poll interval (milliseconds).
    pub frame_poll_interval_ms: u32,
    /// Current interlock check interval (milliseconds).
    pub current_check_interval_ms: u32,
    /// Mode-store batch flush interval (milliseconds).
    pub mode_flush_interval_ms: u32,
    /// Telemetry report interval (milliseconds).
    pub telemetry_interval_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 2,

            current_budget_ma: 14_500, // 14.5 A
            overcurrent_latching: false,
            current_samples: 16,

            frame_poll_interval_ms: 10,
            current_check_interval_ms: 100,
            mode_flush_interval_ms: 1000,
            telemetry_interval_ms: 5000,
        }
    }
}

// ---------------------------------------------------------------------------
// Bus configuration (byte-keyed store, self-healing)
// ---------------------------------------------------------------------------

/// CAN bit rate, persisted as a one-byte selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BaudRate {
    Baud125k = 0,
    Baud250k = 1,
    Baud500k = 2,
    Baud1M = 3,
}

impl BaudRate {
    /// Decode the persisted selector byte; anything out of range falls back
    /// to the 250 kbit/s default.
    pub fn from_selector(raw: u8) -> Self {
        match raw {
            0 => Self::Baud125k,
            1 => Self::Baud250k,
            2 => Self::Baud500k,
            3 => Self::Baud1M,
            _ => Self::Baud250k,
        }
    }

    pub fn bits_per_sec(self) -> u32 {
        match self {
            Self::Baud125k => 125_000,
            Self::Baud250k => 250_000,
            Self::Baud500k => 500_000,
            Self::Baud1M => 1_000_000,
        }
    }
}

impl core::fmt::Display for BaudRate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} kbit/s", self.bits_per_sec() / 1000)
    }
}

/// Bus settings loaded from the byte-keyed store at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
    /// 29-bit extended identifier the receiver accepts.
    pub id: u32,
    pub baud: BaudRate,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            id: DEFAULT_BUS_ID,
            baud: BaudRate::Baud250k,
        }
    }
}

impl BusConfig {
    /// Load bus settings, substituting defaults for missing or invalid
    /// values.  An all-zeros or all-ones identifier means the store was
    /// never programmed (or erased) — both fall back to [`DEFAULT_BUS_ID`].
    pub fn load(store: &dyn StoragePort) -> Self {
        let baud = match store.read_byte(StoreKey::BaudSelector) {
            Ok(raw) => BaudRate::from_selector(raw),
            Err(_) => BaudRate::Baud250k,
        };

        let mut id_bytes = [0u8; 4];
        let mut id_ok = true;
        for (i, b) in id_bytes.iter_mut().enumerate() {
            match store.read_byte(StoreKey::BusId(i as u8)) {
                Ok(v) => *b = v,
                Err(_) => {
                    id_ok = false;
                    break;
                }
            }
        }

        let id = if id_ok {
            let raw = u32::from_be_bytes(id_bytes);
            if raw == 0 || raw == 0xFFFF_FFFF {
                DEFAULT_BUS_ID
            } else {
                raw & 0x1FFF_FFFF
            }
        } else {
            DEFAULT_BUS_ID
        };

        Self { id, baud }
    }

    /// Persist bus settings (big-endian identifier).
    pub fn save(&self, store: &mut dyn StoragePort) -> Result<(), crate::app::ports::StorageError> {
        store.write_byte(StoreKey::BaudSelector, self.baud as u8)?;
        for (i, b) in self.id.to_be_bytes().iter().enumerate() {
            store.write_byte(StoreKey::BusId(i as u8), *b)?;
        }
        Ok(())
    }
}
