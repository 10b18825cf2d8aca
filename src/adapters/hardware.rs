//! Hardware adapter — bridges real peripherals to domain port traits.
//!
//! Owns the solenoid bank driver and the current-sense ADC path, and
//! fronts the TWAI controller's health interface.  This is the only
//! module besides the drivers that touches actual hardware.  On
//! non-espidf targets the underlying drivers use cfg-gated simulation
//! stubs, and the raw ADC value is injectable for tests.

use crate::app::ports::{BusHealthPort, CurrentSensePort, OutputPort};
use crate::drivers::{can_bus, solenoid::SolenoidBank};

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;
#[cfg(target_os = "espidf")]
use crate::pins;

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicU16, Ordering};

#[cfg(not(target_os = "espidf"))]
static SIM_CURRENT_ADC: AtomicU16 = AtomicU16::new(512);

/// Inject a raw current-sense reading (host/test only).
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_current_adc(raw: u16) {
    SIM_CURRENT_ADC.store(raw, Ordering::Relaxed);
}

/// Concrete adapter combining all hardware behind port traits.
pub struct HardwareAdapter {
    solenoids: SolenoidBank,
}

impl HardwareAdapter {
    pub fn new() -> Self {
        Self {
            solenoids: SolenoidBank::new(),
        }
    }

    /// Bitmap the outputs are actually driving (host-side test hook).
    #[cfg(not(target_os = "espidf"))]
    pub fn applied_bitmap(&self) -> u16 {
        self.solenoids.applied()
    }
}

impl Default for HardwareAdapter {
    fn default() -> Self {
        Self::new()
    }
}

// ── OutputPort implementation ─────────────────────────────────

impl OutputPort for HardwareAdapter {
    fn apply(&mut self, bitmap: u16) {
        self.solenoids.apply(bitmap);
    }

    fn all_off(&mut self) {
        self.solenoids.all_off();
    }
}

// ── CurrentSensePort implementation ───────────────────────────

impl CurrentSensePort for HardwareAdapter {
    #[cfg(target_os = "espidf")]
    fn read_raw(&mut self) -> u16 {
        hw_init::adc1_read(pins::CURRENT_SENSE_ADC_CHANNEL)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_raw(&mut self) -> u16 {
        SIM_CURRENT_ADC.load(Ordering::Relaxed)
    }
}

// ── BusHealthPort implementation ──────────────────────────────

impl BusHealthPort for HardwareAdapter {
    fn healthy(&mut self) -> bool {
        can_bus::bus_healthy()
    }

    fn reinit(&mut self) -> Result<(), crate::Error> {
        can_bus::reinit()
    }
}
