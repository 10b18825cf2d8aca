//! Mock hardware adapter for integration tests.
//!
//! Records every output-port call so tests can assert on the full
//! command history without touching real GPIO/ADC registers.

use solbank::app::events::AppEvent;
use solbank::app::ports::{BusHealthPort, CurrentSensePort, EventSink, OutputPort};

// ── Output call record ────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputCall {
    Apply(u16),
    AllOff,
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub calls: Vec<OutputCall>,
    /// Raw value every ADC conversion returns.
    pub adc_raw: u16,
    /// Reported bus controller health.
    pub bus_ok: bool,
    pub reinit_count: u32,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            adc_raw: 512,
            bus_ok: true,
            reinit_count: 0,
        }
    }

    /// Bitmap the outputs would be driving after the recorded history.
    pub fn driven_bitmap(&self) -> u16 {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match c {
                OutputCall::Apply(bitmap) => Some(*bitmap),
                OutputCall::AllOff => Some(0),
            })
            .unwrap_or(0)
    }

    pub fn last_call(&self) -> Option<OutputCall> {
        self.calls.last().copied()
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputPort for MockHardware {
    fn apply(&mut self, bitmap: u16) {
        self.calls.push(OutputCall::Apply(bitmap));
    }

    fn all_off(&mut self) {
        self.calls.push(OutputCall::AllOff);
    }
}

impl CurrentSensePort for MockHardware {
    fn read_raw(&mut self) -> u16 {
        self.adc_raw
    }
}

impl BusHealthPort for MockHardware {
    fn healthy(&mut self) -> bool {
        self.bus_ok
    }

    fn reinit(&mut self) -> Result<(), solbank::Error> {
        self.reinit_count += 1;
        self.bus_ok = true;
        Ok(())
    }
}

// ── Recording event sink ──────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count<F: Fn(&AppEvent) -> bool>(&self, pred: F) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
