//! Interrupt-side frame capture with identifier filtering.
//!
//! The receiver sits between the bus driver's RX callback and the polling
//! loop.  The callback hands every received frame to [`FrameReceiver::capture`],
//! which keeps only frames matching the configured 29-bit identifier and
//! stores them in the bounded queue; the polling loop drains them with
//! [`FrameReceiver::extract`].

use core::sync::atomic::{AtomicU32, Ordering};

use crate::can::frame::{Frame, FrameQueue};

/// Outcome of a single [`FrameReceiver::capture`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureResult {
    /// Frame matched the filter and was queued.
    Stored,
    /// Frame carried a different identifier and was ignored.
    Mismatch,
    /// Frame matched but the queue was full; the new frame was dropped.
    QueueFull,
}

/// Filtered frame capture shared between the RX interrupt and the loop.
///
/// All state is atomic or SPSC, so a `static` instance is safe to touch
/// from both contexts without locking.
pub struct FrameReceiver<const CAP: usize = 4> {
    queue: FrameQueue<CAP>,
    target_id: AtomicU32,
    dropped: AtomicU32,
    mismatched: AtomicU32,
    seen: AtomicU32,
}

impl<const CAP: usize> FrameReceiver<CAP> {
    pub const fn new(target_id: u32) -> Self {
        Self {
            queue: FrameQueue::new(),
            target_id: AtomicU32::new(target_id),
            dropped: AtomicU32::new(0),
            mismatched: AtomicU32::new(0),
            seen: AtomicU32::new(0),
        }
    }

    /// Retarget the filter, e.g. after a persisted identifier is loaded.
    pub fn set_target_id(&self, id: u32) {
        self.target_id.store(id, Ordering::Relaxed);
    }

    pub fn target_id(&self) -> u32 {
        self.target_id.load(Ordering::Relaxed)
    }

    /// Interrupt-side entry point.  Payload bytes past `dlc` are zeroed so
    /// short frames decode all-off rather than replaying stale buffer data.
    pub fn capture(&self, id: u32, dlc: u8, data: &[u8]) -> CaptureResult {
        if id != self.target_id.load(Ordering::Relaxed) {
            self.mismatched.fetch_add(1, Ordering::Relaxed);
            return CaptureResult::Mismatch;
        }
        self.seen.fetch_add(1, Ordering::Relaxed);

        let dlc = dlc.min(8);
        let mut payload = [0u8; 8];
        let n = (dlc as usize).min(data.len());
        payload[..n].copy_from_slice(&data[..n]);

        if self.queue.push(Frame::new(id, dlc, payload)) {
            CaptureResult::Stored
        } else {
            // Drop-newest: the queued frames stay, this one is counted away.
            self.dropped.fetch_add(1, Ordering::Relaxed);
            CaptureResult::QueueFull
        }
    }

    /// Loop-side entry point: oldest queued frame, if any.
    pub fn extract(&self) -> Option<Frame> {
        self.queue.pop()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Frames accepted by the filter since boot.
    pub fn frames_seen(&self) -> u32 {
        self.seen.load(Ordering::Relaxed)
    }

    /// Matching frames discarded because the queue was full.
    pub fn frames_dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Frames ignored because their identifier did not match.
    pub fn frames_mismatched(&self) -> u32 {
        self.mismatched.load(Ordering::Relaxed)
    }
}
