//! Property tests for the channel state machine invariants.
//!
//! Runs on host (x86_64) only — proptest is not available for ESP32
//! targets.  On ESP32, these tests are compiled out.

#![cfg(not(target_os = "espidf"))]

use proptest::prelude::*;

use solbank::adapters::nvs::NvsStore;
use solbank::can::decode::{decode, FunctionId, Pair};
use solbank::can::frame::Frame;
use solbank::channels::ChannelBank;
use solbank::config::DEFAULT_BUS_ID;
use solbank::modes::{ChannelMode, ModeStore};

fn frame_from_signal_bytes(byte2: u8, byte3: u8, byte6: u8) -> Frame {
    let mut data = [0u8; 8];
    data[2] = byte2;
    data[3] = byte3;
    data[6] = byte6;
    Frame::new(DEFAULT_BUS_ID, 8, data)
}

fn arb_mode() -> impl Strategy<Value = ChannelMode> {
    prop_oneof![Just(ChannelMode::Momentary), Just(ChannelMode::Latch)]
}

fn mode_store(per_pair: [ChannelMode; Pair::COUNT]) -> ModeStore {
    let mut nvs = NvsStore::new_in_memory();
    let mut modes = ModeStore::new();
    modes.load(&mut nvs);
    for pair in Pair::ALL {
        modes.set(pair, per_pair[pair.index()], &mut nvs);
    }
    modes
}

proptest! {
    /// For any frame sequence and any per-pair mode assignment, the two
    /// members of a latch-configured pair are never energised at once.
    /// Momentary pairs follow their bits independently and are exempt.
    #[test]
    fn latch_pair_members_never_both_on(
        frames in proptest::collection::vec((any::<u8>(), any::<u8>(), any::<u8>()), 1..50),
        per_pair in [arb_mode(), arb_mode(), arb_mode(), arb_mode(), arb_mode(), arb_mode()],
    ) {
        let modes = mode_store(per_pair);
        let mut bank = ChannelBank::new(2);

        for (b2, b3, b6) in frames {
            let decoded = decode(&frame_from_signal_bytes(b2, b3, b6));
            bank.apply_decoded(&decoded, &modes);
            let bitmap = bank.output_bitmap();

            for pair in Pair::ALL {
                if per_pair[pair.index()] != ChannelMode::Latch {
                    continue;
                }
                let (a, b) = pair.members();
                prop_assert!(
                    bitmap & a.bit() == 0 || bitmap & b.bit() == 0,
                    "latch pair {pair} energised both members (bitmap {bitmap:012b})"
                );
            }
        }
    }

    /// With every pair momentary, the number of active channels never
    /// exceeds the concurrency cap, for any frame sequence and any cap.
    #[test]
    fn momentary_active_count_never_exceeds_cap(
        frames in proptest::collection::vec((any::<u8>(), any::<u8>(), any::<u8>()), 1..50),
        cap in 1u8..=6,
    ) {
        let modes = mode_store([ChannelMode::Momentary; Pair::COUNT]);
        let mut bank = ChannelBank::new(cap);

        for (b2, b3, b6) in frames {
            let decoded = decode(&frame_from_signal_bytes(b2, b3, b6));
            bank.apply_decoded(&decoded, &modes);
            let bitmap = bank.output_bitmap();
            prop_assert!(
                u32::from(bitmap.count_ones()) <= u32::from(cap),
                "cap {cap} exceeded (bitmap {bitmap:012b})"
            );
        }
    }

    /// Latched channels do not count against the cap, but the cap still
    /// bounds the momentary channels on top of them.
    #[test]
    fn cap_counts_momentary_channels_only(
        frames in proptest::collection::vec((any::<u8>(), any::<u8>(), any::<u8>()), 1..50),
    ) {
        // Pairs 1–3 latch, pairs 4–6 momentary, cap 2.
        let modes = mode_store([
            ChannelMode::Latch,
            ChannelMode::Latch,
            ChannelMode::Latch,
            ChannelMode::Momentary,
            ChannelMode::Momentary,
            ChannelMode::Momentary,
        ]);
        let mut bank = ChannelBank::new(2);

        for (b2, b3, b6) in frames {
            let decoded = decode(&frame_from_signal_bytes(b2, b3, b6));
            bank.apply_decoded(&decoded, &modes);

            let momentary_on = FunctionId::ALL
                .iter()
                .filter(|f| {
                    let s = bank.state(**f);
                    s.active && !s.latched
                })
                .count();
            prop_assert!(momentary_on <= 2, "{momentary_on} momentary channels on");
        }
    }

    /// force_all_off always yields a zero bitmap, whatever came before.
    #[test]
    fn force_all_off_is_total(
        frames in proptest::collection::vec((any::<u8>(), any::<u8>(), any::<u8>()), 1..20),
        per_pair in [arb_mode(), arb_mode(), arb_mode(), arb_mode(), arb_mode(), arb_mode()],
    ) {
        let modes = mode_store(per_pair);
        let mut bank = ChannelBank::new(2);
        for (b2, b3, b6) in frames {
            let decoded = decode(&frame_from_signal_bytes(b2, b3, b6));
            bank.apply_decoded(&decoded, &modes);
        }

        bank.force_all_off();
        prop_assert_eq!(bank.output_bitmap(), 0);
        prop_assert!(!bank.any_active());
    }
}
