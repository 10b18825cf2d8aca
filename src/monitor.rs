//! Bank current monitoring and the overcurrent interlock.
//!
//! The sensor is a hall-effect type centred at half the ADC range: 512
//! counts is zero current, 0.066 V per ampere either side.  Readings are
//! boxcar-averaged over a configurable sample count before conversion so
//! solenoid inrush spikes do not nuisance-trip the interlock.

use crate::app::ports::CurrentSensePort;
use crate::config::{
    ADC_REF_VOLTAGE, ADC_RESOLUTION, CURRENT_SENSOR_SENSITIVITY_V_PER_A, CURRENT_SENSOR_ZERO_POINT,
};

/// One filtered current measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentReading {
    /// Boxcar-averaged raw ADC counts.
    pub raw_avg: u16,
    /// Signed bank current.  Negative values mean the sensor reads below
    /// its zero point (miswired or idle offset drift).
    pub milliamps: i32,
}

/// Interlock transitions reported by [`CurrentMonitor::check_interlock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterlockEvent {
    /// Budget exceeded; the caller must force every output off.
    OverCurrent { milliamps: i32 },
    /// Current fell back under budget and the interlock released.
    Cleared,
}

/// Tracks bank current against the budget and holds the trip state.
pub struct CurrentMonitor {
    budget_ma: i32,
    /// When set, a trip holds until power cycle instead of auto-clearing.
    latching: bool,
    tripped: bool,
}

impl CurrentMonitor {
    pub const fn new(budget_ma: i32, latching: bool) -> Self {
        Self {
            budget_ma,
            latching,
            tripped: false,
        }
    }

    /// Average `samples` raw conversions and convert to milliamps.
    pub fn sample_filtered(
        &self,
        sense: &mut dyn CurrentSensePort,
        samples: u8,
    ) -> CurrentReading {
        let samples = samples.max(1);
        let mut sum: u32 = 0;
        for _ in 0..samples {
            sum += u32::from(sense.read_raw().min(ADC_RESOLUTION - 1));
        }
        let raw_avg = (sum / u32::from(samples)) as u16;
        CurrentReading {
            raw_avg,
            milliamps: Self::raw_to_milliamps(raw_avg),
        }
    }

    /// Sensor transfer function: counts → volts → amps → milliamps.
    pub fn raw_to_milliamps(raw: u16) -> i32 {
        let volts = f32::from(raw) * ADC_REF_VOLTAGE / ADC_RESOLUTION as f32;
        let zero_volts = CURRENT_SENSOR_ZERO_POINT as f32 * ADC_REF_VOLTAGE / ADC_RESOLUTION as f32;
        let amps = (volts - zero_volts) / CURRENT_SENSOR_SENSITIVITY_V_PER_A;
        (amps * 1000.0) as i32
    }

    /// Evaluate one reading against the budget.
    ///
    /// Trip checks only run while outputs are energised — an idle bank
    /// reading high is a sensor fault, not an overload, and must not
    /// wedge the interlock.  At most one [`InterlockEvent::OverCurrent`]
    /// is reported per breach; in the non-latching configuration the trip
    /// releases with [`InterlockEvent::Cleared`] once the current is back
    /// under budget.
    pub fn check_interlock(
        &mut self,
        any_active: bool,
        reading: CurrentReading,
    ) -> Option<InterlockEvent> {
        if self.tripped {
            if !self.latching && reading.milliamps <= self.budget_ma {
                self.tripped = false;
                return Some(InterlockEvent::Cleared);
            }
            return None;
        }

        if any_active && reading.milliamps > self.budget_ma {
            self.tripped = true;
            return Some(InterlockEvent::OverCurrent {
                milliamps: reading.milliamps,
            });
        }

        None
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped
    }

    /// Manual release, for the latching configuration.
    pub fn clear_interlock(&mut self) {
        self.tripped = false;
    }
}
