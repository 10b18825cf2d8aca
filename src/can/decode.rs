//! Signal decode table.
//!
//! Twelve logical functions are packed into three data bytes of the single
//! accepted frame.  Each function is one bit; several functions share a
//! byte and are distinguished by their masks, so decoding is an AND test
//! against a one-bit mask — never a full-byte comparison.

use core::fmt;

use crate::can::frame::Frame;

/// One of the twelve logical control signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FunctionId {
    C = 0,
    D,
    E,
    F,
    G,
    H,
    M,
    N,
    A,
    P,
    J,
    L,
}

impl FunctionId {
    pub const COUNT: usize = 12;

    pub const ALL: [FunctionId; Self::COUNT] = [
        Self::C,
        Self::D,
        Self::E,
        Self::F,
        Self::G,
        Self::H,
        Self::M,
        Self::N,
        Self::A,
        Self::P,
        Self::J,
        Self::L,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Bit position in the 12-bit output bitmap.
    pub const fn bit(self) -> u16 {
        1 << (self as u16)
    }

    /// The pair this function belongs to.
    pub fn pair(self) -> Pair {
        // LOOKUP is ordered by FunctionId discriminant.
        LOOKUP[self.index()].pair
    }

    /// The other member of this function's pair.
    pub fn partner(self) -> FunctionId {
        let (a, b) = self.pair().members();
        if a == self { b } else { a }
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// One of the six function pairs; members exclude each other in latch
/// mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Pair {
    Pair1 = 0,
    Pair2,
    Pair3,
    Pair4,
    Pair5,
    Pair6,
}

impl Pair {
    pub const COUNT: usize = 6;

    pub const ALL: [Pair; Self::COUNT] = [
        Self::Pair1,
        Self::Pair2,
        Self::Pair3,
        Self::Pair4,
        Self::Pair5,
        Self::Pair6,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Both member functions of this pair.
    pub const fn members(self) -> (FunctionId, FunctionId) {
        match self {
            Self::Pair1 => (FunctionId::C, FunctionId::D),
            Self::Pair2 => (FunctionId::E, FunctionId::F),
            Self::Pair3 => (FunctionId::G, FunctionId::H),
            Self::Pair4 => (FunctionId::M, FunctionId::N),
            Self::Pair5 => (FunctionId::A, FunctionId::P),
            Self::Pair6 => (FunctionId::J, FunctionId::L),
        }
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// One row of the decode table: which bit of which data byte carries a
/// function's level.
#[derive(Debug, Clone, Copy)]
pub struct LookupEntry {
    pub byte_index: u8,
    /// Exactly one bit set.
    pub mask: u8,
    pub function: FunctionId,
    pub pair: Pair,
}

/// The fixed decode table, ordered by [`FunctionId`] discriminant.
pub const LOOKUP: [LookupEntry; FunctionId::COUNT] = [
    LookupEntry { byte_index: 2, mask: 0x04, function: FunctionId::C, pair: Pair::Pair1 },
    LookupEntry { byte_index: 2, mask: 0x01, function: FunctionId::D, pair: Pair::Pair1 },
    LookupEntry { byte_index: 3, mask: 0x01, function: FunctionId::E, pair: Pair::Pair2 },
    LookupEntry { byte_index: 3, mask: 0x02, function: FunctionId::F, pair: Pair::Pair2 },
    LookupEntry { byte_index: 3, mask: 0x04, function: FunctionId::G, pair: Pair::Pair3 },
    LookupEntry { byte_index: 3, mask: 0x08, function: FunctionId::H, pair: Pair::Pair3 },
    LookupEntry { byte_index: 6, mask: 0x40, function: FunctionId::M, pair: Pair::Pair4 },
    LookupEntry { byte_index: 6, mask: 0x10, function: FunctionId::N, pair: Pair::Pair4 },
    LookupEntry { byte_index: 6, mask: 0x04, function: FunctionId::A, pair: Pair::Pair5 },
    LookupEntry { byte_index: 6, mask: 0x01, function: FunctionId::P, pair: Pair::Pair5 },
    LookupEntry { byte_index: 2, mask: 0x40, function: FunctionId::J, pair: Pair::Pair6 },
    LookupEntry { byte_index: 2, mask: 0x10, function: FunctionId::L, pair: Pair::Pair6 },
];

/// Decoded signal levels for one frame, one entry per function.
pub type DecodedSignals = heapless::Vec<(FunctionId, bool), { FunctionId::COUNT }>;

/// Stateless decode: test every lookup row against the frame payload.
///
/// Bytes shorter frames do not carry read as zero (the capture path zeroes
/// unused payload bytes), so a short frame simply decodes all-off for the
/// missing bytes.
pub fn decode(frame: &Frame) -> DecodedSignals {
    let mut out = DecodedSignals::new();
    for entry in &LOOKUP {
        let level = frame.data[entry.byte_index as usize] & entry.mask != 0;
        // Infallible: the Vec capacity equals the table length.
        let _ = out.push((entry.function, level));
    }
    out
}

/// Set bits in the signal-bearing bytes that no lookup entry covers.
///
/// Returns `(byte_index, stray_mask)` per affected byte.  Bytes that carry
/// no functions at all are ignored entirely.
pub fn stray_bits(frame: &Frame) -> heapless::Vec<(u8, u8), 3> {
    let mut out = heapless::Vec::new();
    for byte_index in signal_bytes() {
        let covered: u8 = LOOKUP
            .iter()
            .filter(|e| e.byte_index == byte_index)
            .fold(0, |acc, e| acc | e.mask);
        let stray = frame.data[byte_index as usize] & !covered;
        if stray != 0 {
            let _ = out.push((byte_index, stray));
        }
    }
    out
}

/// The distinct data bytes the lookup table maps functions onto.
fn signal_bytes() -> [u8; 3] {
    [2, 3, 6]
}
