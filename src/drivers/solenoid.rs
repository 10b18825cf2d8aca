//! Twelve-channel solenoid output driver.
//!
//! Translates the 12-bit output bitmap into GPIO levels.  Updates run in
//! two phases (clears before sets) so a pair handover never energises
//! both members at once, even for the microseconds between register
//! writes.
//!
//! On non-espidf targets the last applied bitmap is readable for tests.

use log::debug;

use crate::can::decode::FunctionId;
use crate::drivers::hw_init;
use crate::pins;

pub struct SolenoidBank {
    applied: u16,
}

impl SolenoidBank {
    pub fn new() -> Self {
        // hw_init leaves every pin low, so the mirror starts at zero.
        Self { applied: 0 }
    }

    /// Drive the outputs to `bitmap`, clears first.
    pub fn apply(&mut self, bitmap: u16) {
        let bitmap = bitmap & 0x0FFF;
        if bitmap == self.applied {
            return;
        }

        let turning_off = self.applied & !bitmap;
        let turning_on = bitmap & !self.applied;

        for function in FunctionId::ALL {
            if turning_off & function.bit() != 0 {
                hw_init::gpio_write(pins::SOLENOID_GPIOS[function.index()], false);
            }
        }
        for function in FunctionId::ALL {
            if turning_on & function.bit() != 0 {
                hw_init::gpio_write(pins::SOLENOID_GPIOS[function.index()], true);
            }
        }

        debug!("solenoid: 0b{:012b} -> 0b{:012b}", self.applied, bitmap);
        self.applied = bitmap;
    }

    /// Drop every output, unconditionally re-writing each pin low.
    pub fn all_off(&mut self) {
        for function in FunctionId::ALL {
            hw_init::gpio_write(pins::SOLENOID_GPIOS[function.index()], false);
        }
        self.applied = 0;
    }

    /// Last applied bitmap (host-side test hook, mirrors hardware state).
    #[cfg(not(target_os = "espidf"))]
    pub fn applied(&self) -> u16 {
        self.applied
    }
}

impl Default for SolenoidBank {
    fn default() -> Self {
        Self::new()
    }
}
