//! Fuzz target: `FrameReceiver::capture`.
//!
//! Drives arbitrary identifier / dlc / payload triples into the capture
//! path and asserts that it never panics, that extracted frames always
//! carry the filter identifier, and that payload bytes past the DLC are
//! zero.
//!
//! cargo fuzz run fuzz_capture

#![no_main]

use libfuzzer_sys::fuzz_target;

use solbank::can::receiver::FrameReceiver;

const TARGET_ID: u32 = 0x14FF_FFB0;

fuzz_target!(|data: &[u8]| {
    let rx: FrameReceiver<4> = FrameReceiver::new(TARGET_ID);

    // Each record: 4 id bytes, 1 dlc byte, up to 8 payload bytes.
    for chunk in data.chunks(13) {
        if chunk.len() < 5 {
            break;
        }
        let id = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        let dlc = chunk[4];
        rx.capture(id, dlc, &chunk[5..]);

        if let Some(frame) = rx.extract() {
            assert_eq!(frame.id, TARGET_ID);
            assert!(frame.dlc <= 8);
            for &byte in &frame.data[frame.dlc as usize..] {
                assert_eq!(byte, 0, "payload past dlc must be zeroed");
            }
        }
    }
});
