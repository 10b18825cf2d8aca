//! Solenoid bank controller — main entry point.
//!
//! Hexagonal architecture with a polled control loop.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   Adapters (outer ring)                  │
//! │                                                          │
//! │  HardwareAdapter      LogEventSink      NvsStore         │
//! │  (Output+Sense+Bus)   (EventSink)       (Config+Store)   │
//! │                                                          │
//! │  ─────────────── Port Trait Boundary ───────────────     │
//! │                                                          │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │            AppService (pure logic)                 │  │
//! │  │  Channels · Modes · Current interlock              │  │
//! │  └────────────────────────────────────────────────────┘  │
//! │                                                          │
//! │  can_bus (TWAI + RX pump) · hw_init (ADC/GPIO)           │
//! └──────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{info, warn};

use solbank::adapters::hardware::HardwareAdapter;
use solbank::adapters::log_sink::LogEventSink;
use solbank::adapters::nvs::NvsStore;
use solbank::adapters::time::MonotonicClock;
use solbank::app::ports::ConfigPort;
use solbank::app::service::AppService;
use solbank::config::{BusConfig, SystemConfig};
use solbank::drivers;

/// How long after boot a waiting frame may still force pair modes.
const STARTUP_OVERRIDE_WINDOW_MS: u64 = 250;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("solbank v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Hardware peripherals ───────────────────────────────
    if let Err(e) = drivers::hw_init::init_peripherals() {
        // Peripheral init failure is critical — log and halt.
        log::error!("HAL init failed: {} — halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }

    // ── 3. Persistent storage + configuration ─────────────────
    let mut store = match NvsStore::new() {
        Ok(s) => s,
        Err(e) => {
            warn!("NVS init failed ({}), running without persistence", e);
            NvsStore::new_in_memory()
        }
    };
    let config = match store.load() {
        Ok(cfg) => {
            info!("config loaded from NVS");
            cfg
        }
        Err(e) => {
            warn!("config load failed ({}), using defaults", e);
            SystemConfig::default()
        }
    };
    let bus_config = BusConfig::load(&store);

    // ── 4. Bus controller + receive pump ──────────────────────
    drivers::can_bus::init(&bus_config).map_err(|e| anyhow::anyhow!("can init: {e}"))?;
    let rx = drivers::can_bus::receiver();

    // ── 5. Adapters + app service ─────────────────────────────
    let mut hw = HardwareAdapter::new();
    let mut sink = LogEventSink::new();
    let clock = MonotonicClock::new();

    let mut app = AppService::new(config.clone(), bus_config.id);
    app.start(&mut store, &mut sink);

    // ── 6. Startup override window ────────────────────────────
    // A frame already on the bus at power-up may force pair modes.  It is
    // consumed for mode selection only and never drives outputs.
    let deadline = clock.now_ms() + STARTUP_OVERRIDE_WINDOW_MS;
    while clock.now_ms() < deadline && rx.pending() == 0 {
        std::thread::sleep(std::time::Duration::from_millis(
            config.frame_poll_interval_ms as u64,
        ));
    }
    app.run_startup_override(rx, &mut store, &mut sink);

    info!("system ready, entering control loop");

    // ── 7. Control loop ───────────────────────────────────────
    loop {
        std::thread::sleep(std::time::Duration::from_millis(
            config.frame_poll_interval_ms as u64,
        ));
        app.tick(clock.now_ms(), rx, &mut hw, &mut store, &mut sink);
    }
}
