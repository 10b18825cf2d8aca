//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (the output driver, the current-sense ADC, the storage
//! backend, event sinks) implement these traits.  The
//! [`AppService`](super::service::AppService) consumes them via trait
//! objects and generics, so the domain core never touches hardware
//! directly and every domain test runs on the host.

use core::fmt;

use crate::can::decode::Pair;
use crate::config::SystemConfig;

// ───────────────────────────────────────────────────────────────
// Output port (driven adapter: domain → solenoid drivers)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the domain commands the physical outputs through this.
pub trait OutputPort {
    /// Drive the twelve outputs to match `bitmap` (bit n = function n on).
    ///
    /// Implementations apply the change in two phases — clear first, then
    /// set — so both members of a pair are never energised at once, even
    /// transiently across the update.
    fn apply(&mut self, bitmap: u16);

    /// De-energise every output immediately.
    fn all_off(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Current-sense port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port for the bank current sensor.
pub trait CurrentSensePort {
    /// One raw ADC conversion, 0–1023.  Filtering is the caller's job.
    fn read_raw(&mut self) -> u16;
}

// ───────────────────────────────────────────────────────────────
// Bus health port (driven adapter: domain ↔ bus controller)
// ───────────────────────────────────────────────────────────────

/// Lets the domain detect and recover from a wedged bus controller.
pub trait BusHealthPort {
    /// `false` when the controller has gone bus-off or stopped receiving.
    fn healthy(&mut self) -> bool;

    /// Tear the controller down and bring it back up with the same
    /// configuration.  Queued frames are lost.
    fn reinit(&mut self) -> Result<(), crate::Error>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log, a test
/// recorder, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Addresses in the persistent byte store.
///
/// The layout is fixed so a store written by one firmware revision reads
/// back under the next:
///
/// | address     | contents                         |
/// |-------------|----------------------------------|
/// | `0x00`      | baud selector (0–3)              |
/// | `0x01–0x04` | bus identifier, big-endian       |
/// | `0x09–0x0E` | per-pair channel modes           |
/// | `0x0F`      | init marker (`0xA5` when formatted) |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKey {
    BaudSelector,
    /// One byte of the 32-bit bus identifier, big-endian, `0..=3`.
    BusId(u8),
    PairMode(Pair),
    InitMarker,
}

impl StoreKey {
    /// Value at [`StoreKey::InitMarker`] once the store has been formatted.
    pub const INIT_MARKER: u8 = 0xA5;

    pub const fn address(self) -> u8 {
        match self {
            Self::BaudSelector => 0x00,
            Self::BusId(i) => 0x01 + i,
            Self::PairMode(pair) => 0x09 + pair as u8,
            Self::InitMarker => 0x0F,
        }
    }
}

/// Persistent single-byte key-value storage.
///
/// Writes are atomic — a torn write on power loss must never leave a key
/// half-updated.  The ESP-IDF NVS backend guarantees this natively; the
/// in-memory simulation achieves it trivially.
pub trait StoragePort {
    fn read_byte(&self, key: StoreKey) -> Result<u8, StorageError>;

    fn write_byte(&mut self, key: StoreKey, value: u8) -> Result<(), StorageError>;

    /// Whether the store has ever been formatted by this firmware.
    fn is_initialized(&self) -> bool {
        matches!(self.read_byte(StoreKey::InitMarker), Ok(StoreKey::INIT_MARKER))
    }
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists tuning configuration.
///
/// Implementations MUST validate values before persisting.  Invalid ranges
/// are rejected with [`ConfigError::ValidationFailed`], not silently
/// clamped — a bad `current_budget_ma` must never disable the interlock.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
