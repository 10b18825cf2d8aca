//! Hardware drivers: peripheral init, the TWAI controller, and the
//! solenoid output bank.  Everything here is cfg-gated so the same API
//! compiles on the host with simulation backends.

pub mod can_bus;
pub mod hw_init;
pub mod solenoid;
