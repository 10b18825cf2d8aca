//! CAN frame capture and signal decode.
//!
//! The receive path is a single-producer/single-consumer split: the
//! producer half ([`receiver::FrameReceiver::capture`]) runs in interrupt
//! context and only copies mailbox fields into a bounded queue; everything
//! with business meaning (decode, channel transitions, persistence) stays
//! in the polling loop.

pub mod decode;
pub mod frame;
pub mod receiver;
