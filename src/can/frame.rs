//! Captured bus frames and the bounded SPSC frame queue.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ RX interrupt │────▶│  FrameQueue  │────▶│ Polling loop │
//! │ (producer)   │     │ (atomic ring)│     │ (consumer)   │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! The queue indices use acquire/release atomics instead of an IRQ-masked
//! window: on a single core this gives the same guarantee (indices are
//! never observed mid-update) with the shortest possible critical section.
//! Frame payload copies happen strictly outside the index handshake.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering};

/// One captured bus message: 29-bit identifier plus up to 8 data bytes.
/// Immutable once captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Extended (29-bit) identifier.
    pub id: u32,
    /// Data length code, 0–8.
    pub dlc: u8,
    pub data: [u8; 8],
}

impl Frame {
    pub const EMPTY: Frame = Frame {
        id: 0,
        dlc: 0,
        data: [0; 8],
    };

    pub fn new(id: u32, dlc: u8, data: [u8; 8]) -> Self {
        Self {
            id,
            dlc: dlc.min(8),
            data,
        }
    }
}

/// Bounded single-producer/single-consumer frame ring.
///
/// `push` may only be called from one producer context (the RX interrupt),
/// `pop` only from one consumer (the polling loop).  Unlike the classic
/// one-empty-slot ring this carries an explicit `len` counter, so the full
/// capacity `CAP` is usable and the full/empty tests are exact.
pub struct FrameQueue<const CAP: usize> {
    slots: [UnsafeCell<Frame>; CAP],
    /// Next slot the producer writes.  Producer-only.
    head: AtomicUsize,
    /// Next slot the consumer reads.  Consumer-only.
    tail: AtomicUsize,
    /// Occupied slot count.  Incremented by producer, decremented by consumer.
    len: AtomicUsize,
}

// SAFETY: SPSC discipline — `slots[head]` is written only by the single
// producer while `len < CAP` guarantees the consumer is not reading it;
// `slots[tail]` is read only by the single consumer while `len > 0`
// guarantees the producer is not writing it.  The release increment of
// `len` publishes the slot write to the consumer's acquire load.
unsafe impl<const CAP: usize> Sync for FrameQueue<CAP> {}

impl<const CAP: usize> FrameQueue<CAP> {
    pub const fn new() -> Self {
        Self {
            slots: [const { UnsafeCell::new(Frame::EMPTY) }; CAP],
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            len: AtomicUsize::new(0),
        }
    }

    /// Producer side.  Returns `false` (frame dropped) when the ring is
    /// full — buffered frames are never overwritten, preserving
    /// oldest-first delivery.
    pub fn push(&self, frame: Frame) -> bool {
        if self.len.load(Ordering::Acquire) == CAP {
            return false;
        }
        let head = self.head.load(Ordering::Relaxed);
        // SAFETY: single producer; len < CAP means this slot is free.
        unsafe {
            *self.slots[head].get() = frame;
        }
        self.head.store((head + 1) % CAP, Ordering::Relaxed);
        self.len.fetch_add(1, Ordering::Release);
        true
    }

    /// Consumer side.  Pops the oldest buffered frame.
    pub fn pop(&self) -> Option<Frame> {
        if self.len.load(Ordering::Acquire) == 0 {
            return None;
        }
        let tail = self.tail.load(Ordering::Relaxed);
        // SAFETY: single consumer; len > 0 means this slot holds a
        // published frame.
        let frame = unsafe { *self.slots[tail].get() };
        self.tail.store((tail + 1) % CAP, Ordering::Relaxed);
        self.len.fetch_sub(1, Ordering::Release);
        Some(frame)
    }

    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn capacity(&self) -> usize {
        CAP
    }
}

impl<const CAP: usize> Default for FrameQueue<CAP> {
    fn default() -> Self {
        Self::new()
    }
}
