//! GPIO / peripheral pin assignments for the solenoid bank main board.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

use crate::can::decode::FunctionId;

// ---------------------------------------------------------------------------
// Solenoid outputs
// ---------------------------------------------------------------------------

/// One GPIO per logical function, indexed by [`FunctionId`] discriminant.
/// Functions C–N sit on the first driver bank, A–L on the second.
pub const SOLENOID_GPIOS: [i32; FunctionId::COUNT] = [
    4,  // C
    5,  // D
    6,  // E
    7,  // F
    15, // G
    16, // H
    17, // M
    18, // N
    8,  // A
    9,  // P
    10, // J
    11, // L
];

// ---------------------------------------------------------------------------
// Current sense — ACS712-30A hall sensor, analog output
// ---------------------------------------------------------------------------

/// ADC1 channel carrying the summed load-current sense voltage.
pub const CURRENT_SENSE_ADC_CHANNEL: u32 = 1;
/// GPIO routed to the current sense ADC channel (ESP32-S3 ADC1_CH1).
pub const CURRENT_SENSE_GPIO: i32 = 2;

// ---------------------------------------------------------------------------
// CAN transceiver (TWAI controller)
// ---------------------------------------------------------------------------

pub const CAN_TX_GPIO: i32 = 21;
pub const CAN_RX_GPIO: i32 = 47;

// ---------------------------------------------------------------------------
// UART debug
// ---------------------------------------------------------------------------

pub const UART_TX_GPIO: i32 = 43;
pub const UART_RX_GPIO: i32 = 44;
