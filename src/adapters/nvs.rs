//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements both [`ConfigPort`] and [`StoragePort`].
//!
//! - The tuning configuration is one postcard blob under the `solbank`
//!   namespace, range-validated before every persist.
//! - The byte-keyed store ([`StoragePort`]) maps each [`StoreKey`]
//!   address to its own `u8` entry, so the on-flash layout matches the
//!   documented store map byte for byte.
//! - Writes are atomic: ESP-IDF NVS commits are atomic per `nvs_commit()`;
//!   the simulation backend is a plain in-memory map.

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort, StorageError, StoragePort, StoreKey};
use crate::config::SystemConfig;

#[cfg(not(target_os = "espidf"))]
use std::cell::RefCell;
#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const CONFIG_NAMESPACE: &str = "solbank";
#[cfg(target_os = "espidf")]
const STORE_NAMESPACE: &str = "solbank_kv";
#[allow(dead_code)]
const MAX_BLOB_SIZE: usize = 512;

pub struct NvsStore {
    #[cfg(not(target_os = "espidf"))]
    bytes: RefCell<HashMap<u8, u8>>,
    #[cfg(not(target_os = "espidf"))]
    config_blob: RefCell<Option<Vec<u8>>>,
}

impl NvsStore {
    /// Create the adapter and initialise NVS flash.
    ///
    /// On first boot or after an IDF version bump the partition is
    /// erased and re-initialised automatically.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase run from the single
            // main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
                if unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("NvsStore: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsStore: simulation backend");

        Ok(Self::new_in_memory())
    }

    /// Empty in-memory store, as after a full flash erase.  This is also
    /// the simulation backend behind [`new`](Self::new) on the host.
    pub fn new_in_memory() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            bytes: RefCell::new(HashMap::new()),
            #[cfg(not(target_os = "espidf"))]
            config_blob: RefCell::new(None),
        }
    }

    /// Open an NVS namespace, run a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut ns_buf = [0u8; 16];
        let ns_bytes = namespace.as_bytes();
        let len = ns_bytes.len().min(15);
        ns_buf[..len].copy_from_slice(&ns_bytes[..len]);

        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(ns_buf.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }

    /// NUL-terminated key name for one store address, e.g. `b0E`.
    #[cfg(target_os = "espidf")]
    fn byte_key_name(address: u8) -> [u8; 4] {
        const HEX: &[u8; 16] = b"0123456789ABCDEF";
        [
            b'b',
            HEX[(address >> 4) as usize],
            HEX[(address & 0x0F) as usize],
            0,
        ]
    }
}

fn validate_config(cfg: &SystemConfig) -> Result<(), ConfigError> {
    if !(1..=6).contains(&cfg.max_concurrent) {
        return Err(ConfigError::ValidationFailed("max_concurrent must be 1–6"));
    }
    if !(1_000..=30_000).contains(&cfg.current_budget_ma) {
        return Err(ConfigError::ValidationFailed(
            "current_budget_ma must be 1000–30000",
        ));
    }
    if !(1..=64).contains(&cfg.current_samples) {
        return Err(ConfigError::ValidationFailed("current_samples must be 1–64"));
    }
    if !(1..=100).contains(&cfg.frame_poll_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "frame_poll_interval_ms must be 1–100",
        ));
    }
    if !(10..=10_000).contains(&cfg.current_check_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "current_check_interval_ms must be 10–10000",
        ));
    }
    if !(100..=60_000).contains(&cfg.mode_flush_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "mode_flush_interval_ms must be 100–60000",
        ));
    }
    if !(500..=600_000).contains(&cfg.telemetry_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "telemetry_interval_ms must be 500–600000",
        ));
    }
    Ok(())
}

impl ConfigPort for NvsStore {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        #[cfg(not(target_os = "espidf"))]
        {
            if let Some(bytes) = self.config_blob.borrow().as_deref() {
                let cfg: SystemConfig =
                    postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
                info!("NvsStore: loaded config from store");
                Ok(cfg)
            } else {
                info!("NvsStore: no stored config, using defaults");
                Ok(SystemConfig::default())
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(CONFIG_NAMESPACE, false, |handle| {
                let key_cstr = b"syscfg\0";
                let mut size: usize = 0;

                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        key_cstr.as_ptr() as *const _,
                        core::ptr::null_mut(),
                        &mut size,
                    )
                };
                if ret == ESP_ERR_NVS_NOT_FOUND {
                    return Err(ESP_ERR_NVS_NOT_FOUND);
                }
                if ret != ESP_OK || size == 0 || size > MAX_BLOB_SIZE {
                    return Err(ret);
                }

                let mut buf = vec![0u8; size];
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        key_cstr.as_ptr() as *const _,
                        buf.as_mut_ptr() as *mut _,
                        &mut size,
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(buf)
            });

            match result {
                Ok(bytes) => {
                    let cfg: SystemConfig =
                        postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
                    info!("NvsStore: loaded config from NVS ({} bytes)", bytes.len());
                    Ok(cfg)
                }
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => {
                    info!("NvsStore: no stored config, using defaults");
                    Ok(SystemConfig::default())
                }
                Err(e) => {
                    warn!("NvsStore: NVS read error {}, using defaults", e);
                    Ok(SystemConfig::default())
                }
            }
        }
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        validate_config(config)?;

        #[cfg(not(target_os = "espidf"))]
        {
            let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
            *self.config_blob.borrow_mut() = Some(bytes);
            info!("NvsStore: config saved (simulation)");
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
            let result = Self::with_nvs_handle(CONFIG_NAMESPACE, true, |handle| {
                let key_cstr = b"syscfg\0";
                let ret = unsafe {
                    nvs_set_blob(
                        handle,
                        key_cstr.as_ptr() as *const _,
                        bytes.as_ptr() as *const _,
                        bytes.len(),
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            match result {
                Ok(()) => {
                    info!("NvsStore: config saved to NVS ({} bytes)", bytes.len());
                    Ok(())
                }
                Err(e) => {
                    warn!("NvsStore: NVS write error {}", e);
                    Err(ConfigError::IoError)
                }
            }
        }
    }
}

impl StoragePort for NvsStore {
    fn read_byte(&self, key: StoreKey) -> Result<u8, StorageError> {
        let address = key.address();

        #[cfg(not(target_os = "espidf"))]
        {
            self.bytes
                .borrow()
                .get(&address)
                .copied()
                .ok_or(StorageError::NotFound)
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(STORE_NAMESPACE, false, |handle| {
                let name = Self::byte_key_name(address);
                let mut value: u8 = 0;
                let ret = unsafe { nvs_get_u8(handle, name.as_ptr() as *const _, &mut value) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(value)
            });
            match result {
                Ok(value) => Ok(value),
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Err(StorageError::NotFound),
                Err(_) => Err(StorageError::IoError),
            }
        }
    }

    fn write_byte(&mut self, key: StoreKey, value: u8) -> Result<(), StorageError> {
        let address = key.address();

        #[cfg(not(target_os = "espidf"))]
        {
            self.bytes.borrow_mut().insert(address, value);
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(STORE_NAMESPACE, true, |handle| {
                let name = Self::byte_key_name(address);
                let ret = unsafe { nvs_set_u8(handle, name.as_ptr() as *const _, value) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            match result {
                Ok(()) => Ok(()),
                Err(e) if e == ESP_ERR_NVS_FULL => Err(StorageError::Full),
                Err(e) => {
                    warn!("NvsStore: byte write 0x{:02X} failed: {}", address, e);
                    Err(StorageError::IoError)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_round_trip() {
        let mut store = NvsStore::new_in_memory();
        assert_eq!(
            store.read_byte(StoreKey::BaudSelector),
            Err(StorageError::NotFound)
        );
        store.write_byte(StoreKey::BaudSelector, 2).unwrap();
        assert_eq!(store.read_byte(StoreKey::BaudSelector), Ok(2));
    }

    #[test]
    fn config_round_trips_through_postcard() {
        let store = NvsStore::new_in_memory();
        let mut cfg = SystemConfig::default();
        cfg.max_concurrent = 3;
        cfg.current_budget_ma = 10_000;
        store.save(&cfg).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.max_concurrent, 3);
        assert_eq!(loaded.current_budget_ma, 10_000);
    }

    #[test]
    fn missing_config_yields_defaults() {
        let store = NvsStore::new_in_memory();
        let cfg = store.load().unwrap();
        assert_eq!(cfg.max_concurrent, SystemConfig::default().max_concurrent);
    }

    #[test]
    fn out_of_range_config_is_rejected() {
        let store = NvsStore::new_in_memory();
        let mut cfg = SystemConfig::default();
        cfg.current_budget_ma = 0;
        assert!(matches!(
            store.save(&cfg),
            Err(ConfigError::ValidationFailed(_))
        ));
        // The rejected config must not replace the stored one.
        assert_eq!(
            store.load().unwrap().current_budget_ma,
            SystemConfig::default().current_budget_ma
        );
    }

    #[test]
    fn zero_concurrency_cap_is_rejected() {
        let store = NvsStore::new_in_memory();
        let mut cfg = SystemConfig::default();
        cfg.max_concurrent = 0;
        assert!(store.save(&cfg).is_err());
    }
}
