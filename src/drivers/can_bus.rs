//! TWAI (CAN) controller driver.
//!
//! Owns the singleton [`FrameReceiver`] and the receive pump.  The pump
//! is an `esp_timer` periodic callback that drains the controller's RX
//! mailboxes into the receiver's lock-free queue with a zero timeout, so
//! the main loop never blocks on the bus.  Callbacks run in the ESP
//! timer task context (not ISR), which is safe for the atomic queue.
//!
//! The hardware acceptance filter is programmed for the single extended
//! identifier as well; [`FrameReceiver::capture`] re-checks it so the
//! behaviour is identical on targets where the filter is a no-op.

use crate::can::receiver::FrameReceiver;
use crate::config::{BusConfig, DEFAULT_BUS_ID};
#[cfg(target_os = "espidf")]
use crate::error::Error;
use crate::error::Result;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::{info, warn};

#[cfg(target_os = "espidf")]
use crate::config::BaudRate;
#[cfg(target_os = "espidf")]
use crate::pins;

/// RX queue depth between the pump and the polling loop.
pub const RX_QUEUE_DEPTH: usize = 4;

static RECEIVER: FrameReceiver<RX_QUEUE_DEPTH> = FrameReceiver::new(DEFAULT_BUS_ID);

/// The process-wide frame receiver.
pub fn receiver() -> &'static FrameReceiver<RX_QUEUE_DEPTH> {
    &RECEIVER
}

#[cfg(target_os = "espidf")]
static mut RX_PUMP_TIMER: esp_timer_handle_t = core::ptr::null_mut();

#[cfg(target_os = "espidf")]
static mut ACTIVE_CONFIG: BusConfig = BusConfig {
    id: DEFAULT_BUS_ID,
    baud: BaudRate::Baud250k,
};

/// Poll period of the receive pump (microseconds).  2 ms comfortably
/// outruns a saturated 250 kbit/s bus against the 4-deep queue.
#[cfg(target_os = "espidf")]
const RX_PUMP_PERIOD_US: u64 = 2_000;

#[cfg(target_os = "espidf")]
unsafe extern "C" fn rx_pump_cb(_arg: *mut core::ffi::c_void) {
    // Drain everything waiting; zero timeout so the timer task never blocks.
    loop {
        let mut msg: twai_message_t = unsafe { core::mem::zeroed() };
        let ret = unsafe { twai_receive(&mut msg, 0) };
        if ret != ESP_OK {
            break;
        }
        // Standard-format frames can never match the 29-bit filter.
        if unsafe { msg.__bindgen_anon_1.__bindgen_anon_1 }.extd() == 0 {
            continue;
        }
        let dlc = msg.data_length_code.min(8);
        RECEIVER.capture(msg.identifier, dlc, &msg.data[..dlc as usize]);
    }
}

/// Bit timing for an 80 MHz TWAI source clock.
#[cfg(target_os = "espidf")]
fn timing_for(baud: BaudRate) -> twai_timing_config_t {
    let brp = match baud {
        BaudRate::Baud125k => 32,
        BaudRate::Baud250k => 16,
        BaudRate::Baud500k => 8,
        BaudRate::Baud1M => 4,
    };
    twai_timing_config_t {
        brp,
        tseg_1: 15,
        tseg_2: 4,
        sjw: 3,
        triple_sampling: false,
        ..Default::default()
    }
}

/// Install and start the controller, program the acceptance filter, and
/// start the receive pump.  Called once from `main()`.
#[cfg(target_os = "espidf")]
pub fn init(config: &BusConfig) -> Result<()> {
    RECEIVER.set_target_id(config.id);
    // SAFETY: written once at boot from the main task, before the pump
    // timer exists; reinit() stops the pump before rewriting.
    unsafe {
        ACTIVE_CONFIG = *config;
    }

    install_and_start(config)?;

    // SAFETY: RX_PUMP_TIMER is written here once at boot from the single
    // main-task context before the callback can fire.
    unsafe {
        let args = esp_timer_create_args_t {
            callback: Some(rx_pump_cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: b"can_rx\0".as_ptr() as *const _,
            skip_unhandled_events: true,
        };
        let ret = esp_timer_create(&args, &raw mut RX_PUMP_TIMER);
        if ret != ESP_OK {
            return Err(Error::Init("rx pump timer create failed"));
        }
        let ret = esp_timer_start_periodic(RX_PUMP_TIMER, RX_PUMP_PERIOD_US);
        if ret != ESP_OK {
            return Err(Error::Init("rx pump timer start failed"));
        }
    }

    info!(
        "can_bus: started at {} on id 0x{:08X}",
        config.baud, config.id
    );
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init(config: &BusConfig) -> Result<()> {
    RECEIVER.set_target_id(config.id);
    log::info!("can_bus(sim): frames injected via receiver().capture()");
    Ok(())
}

#[cfg(target_os = "espidf")]
fn install_and_start(config: &BusConfig) -> Result<()> {
    let general = twai_general_config_t {
        mode: twai_mode_t_TWAI_MODE_NORMAL,
        tx_io: pins::CAN_TX_GPIO,
        rx_io: pins::CAN_RX_GPIO,
        clkout_io: -1,
        bus_off_io: -1,
        tx_queue_len: 1,
        rx_queue_len: 8,
        alerts_enabled: TWAI_ALERT_NONE,
        clkout_divider: 0,
        intr_flags: 0,
        ..Default::default()
    };
    let timing = timing_for(config.baud);
    // Single extended-frame filter: the 29-bit identifier sits in the top
    // bits of the acceptance code; the low 3 bits (RTR + reserved) are
    // don't-care.
    let filter = twai_filter_config_t {
        acceptance_code: config.id << 3,
        acceptance_mask: 0x0000_0007,
        single_filter: true,
    };

    // SAFETY: driver install/start from the main task, before (or with
    // the pump stopped during reinit) any concurrent TWAI access.
    unsafe {
        let ret = twai_driver_install(&general, &timing, &filter);
        if ret != ESP_OK {
            warn!("can_bus: driver install failed (rc={})", ret);
            return Err(Error::Init("twai driver install failed"));
        }
        let ret = twai_start();
        if ret != ESP_OK {
            twai_driver_uninstall();
            return Err(Error::Init("twai start failed"));
        }
    }
    Ok(())
}

/// Whether the controller is still able to receive.
#[cfg(target_os = "espidf")]
pub fn bus_healthy() -> bool {
    let mut status: twai_status_info_t = unsafe { core::mem::zeroed() };
    // SAFETY: status query on an installed driver; read-only.
    let ret = unsafe { twai_get_status_info(&mut status) };
    if ret != ESP_OK {
        return false;
    }
    status.state == twai_state_t_TWAI_STATE_RUNNING
}

#[cfg(not(target_os = "espidf"))]
pub fn bus_healthy() -> bool {
    true
}

/// Tear the controller down and bring it back up with the active
/// configuration.  Frames queued in the controller are lost; the
/// receiver's queue and counters survive.
#[cfg(target_os = "espidf")]
pub fn reinit() -> Result<()> {
    // SAFETY: main-task only.  The pump timer is stopped for the window
    // where the driver is uninstalled, so the callback cannot touch it.
    unsafe {
        if !RX_PUMP_TIMER.is_null() {
            esp_timer_stop(RX_PUMP_TIMER);
        }
        twai_stop();
        twai_driver_uninstall();
    }

    let config = unsafe { ACTIVE_CONFIG };
    install_and_start(&config)?;

    unsafe {
        if !RX_PUMP_TIMER.is_null() {
            let ret = esp_timer_start_periodic(RX_PUMP_TIMER, RX_PUMP_PERIOD_US);
            if ret != ESP_OK {
                return Err(Error::Init("rx pump timer restart failed"));
            }
        }
    }
    warn!("can_bus: controller reinitialised");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn reinit() -> Result<()> {
    Ok(())
}
