//! Per-channel state machine: momentary follow, latch toggling, pair
//! mutual exclusion, and the momentary concurrency cap.
//!
//! The bank is pure state — it never touches hardware.  Each decoded
//! frame is folded in with [`ChannelBank::apply_decoded`] and the result
//! read out as a 12-bit bitmap for the output port.

use crate::can::decode::{DecodedSignals, FunctionId, Pair};
use crate::modes::{ChannelMode, ModeStore};

/// Live state of one channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelState {
    /// Output is currently energised.
    pub active: bool,
    /// Active because a latch captured a rising edge (only meaningful in
    /// latch mode).
    pub latched: bool,
}

/// All twelve channels plus the edge-detection history.
pub struct ChannelBank {
    states: [ChannelState; FunctionId::COUNT],
    /// Signal level seen in the previous frame, for edge detection.
    prev_bits: [bool; FunctionId::COUNT],
    last_bitmap: u16,
    max_concurrent: u8,
}

impl ChannelBank {
    pub const fn new(max_concurrent: u8) -> Self {
        Self {
            states: [ChannelState { active: false, latched: false }; FunctionId::COUNT],
            prev_bits: [false; FunctionId::COUNT],
            last_bitmap: 0,
            max_concurrent,
        }
    }

    /// Fold one decoded frame into the bank.
    ///
    /// Returns the functions whose activation was refused by the
    /// concurrency cap.  The cap counts momentary-mode channels only:
    /// latched channels hold no sustained inrush, so they neither consume
    /// a slot nor get refused.
    pub fn apply_decoded(
        &mut self,
        decoded: &DecodedSignals,
        modes: &ModeStore,
    ) -> heapless::Vec<FunctionId, { FunctionId::COUNT }> {
        let mut rejected = heapless::Vec::new();

        for &(function, level) in decoded.iter() {
            let idx = function.index();
            let rising = level && !self.prev_bits[idx];

            match modes.get(function.pair()) {
                ChannelMode::Momentary => {
                    // Level-based: the state mirrors the decoded bit, and
                    // both members of a momentary pair may run at once.
                    // Exclusion is a latch-mode rule only.
                    if level && !self.states[idx].active {
                        if self.momentary_active_count() >= self.max_concurrent as usize {
                            let _ = rejected.push(function);
                        } else {
                            self.states[idx].active = true;
                        }
                    } else if !level {
                        self.states[idx] = ChannelState::default();
                    }
                }
                ChannelMode::Latch => {
                    if rising {
                        self.release(function.partner());
                        self.states[idx].active = true;
                        self.states[idx].latched = true;
                    }
                    // Falling edges and steady levels change nothing; the
                    // latch holds until the partner's rising edge.
                }
            }

            self.prev_bits[idx] = level;
        }

        rejected
    }

    fn release(&mut self, function: FunctionId) {
        self.states[function.index()] = ChannelState::default();
    }

    fn momentary_active_count(&self) -> usize {
        self.states
            .iter()
            .filter(|s| s.active && !s.latched)
            .count()
    }

    /// The 12-bit output bitmap for the current state.  A latch-mode pair
    /// never has both members set; the output port applies clears before
    /// sets so that holds transiently too.  Momentary members follow
    /// their own bits and may run together.
    pub fn output_bitmap(&mut self) -> u16 {
        let mut target = 0u16;
        for function in FunctionId::ALL {
            if self.states[function.index()].active {
                target |= function.bit();
            }
        }
        for pair in Pair::ALL {
            let (a, b) = pair.members();
            debug_assert!(
                !(self.states[a.index()].latched && self.states[b.index()].latched),
                "pair {pair} has both members latched"
            );
        }
        self.last_bitmap = target;
        target
    }

    /// Interlock path: drop every channel immediately.  Edge history is
    /// kept, so a level held through the interlock cannot re-latch on
    /// resume without a fresh rising edge.
    pub fn force_all_off(&mut self) {
        self.states = Default::default();
        self.last_bitmap = 0;
    }

    /// Bitmap as of the last [`output_bitmap`](Self::output_bitmap) call.
    pub fn last_bitmap(&self) -> u16 {
        self.last_bitmap
    }

    pub fn any_active(&self) -> bool {
        self.states.iter().any(|s| s.active)
    }

    pub fn state(&self, function: FunctionId) -> ChannelState {
        self.states[function.index()]
    }
}
