//! Persistence tests: bus settings, pair modes, and self-healing of the
//! byte-keyed store across simulated reboots.

use solbank::adapters::nvs::NvsStore;
use solbank::app::ports::{ConfigPort, StoragePort, StoreKey};
use solbank::can::decode::Pair;
use solbank::config::{BaudRate, BusConfig, DEFAULT_BUS_ID, SystemConfig};
use solbank::modes::{ChannelMode, ModeStore};

#[test]
fn bus_config_round_trips() {
    let mut store = NvsStore::new_in_memory();
    let cfg = BusConfig {
        id: 0x18DA_F110,
        baud: BaudRate::Baud500k,
    };
    cfg.save(&mut store).unwrap();

    let loaded = BusConfig::load(&store);
    assert_eq!(loaded, cfg);
    // Big-endian byte layout, verifiable with a field tool.
    assert_eq!(store.read_byte(StoreKey::BusId(0)), Ok(0x18));
    assert_eq!(store.read_byte(StoreKey::BusId(3)), Ok(0x10));
}

#[test]
fn erased_identifier_falls_back_to_default() {
    let mut store = NvsStore::new_in_memory();
    store.write_byte(StoreKey::BaudSelector, 3).unwrap();
    for i in 0..4 {
        store.write_byte(StoreKey::BusId(i), 0xFF).unwrap();
    }

    let loaded = BusConfig::load(&store);
    assert_eq!(loaded.id, DEFAULT_BUS_ID);
    assert_eq!(loaded.baud, BaudRate::Baud1M);
}

#[test]
fn stored_identifier_is_masked_to_29_bits() {
    let mut store = NvsStore::new_in_memory();
    BusConfig {
        id: DEFAULT_BUS_ID,
        baud: BaudRate::Baud250k,
    }
    .save(&mut store)
    .unwrap();
    // Corrupt the top byte so bits beyond the extended-id range are set.
    store.write_byte(StoreKey::BusId(0), 0xF4).unwrap();

    let loaded = BusConfig::load(&store);
    assert_eq!(loaded.id & !0x1FFF_FFFF, 0);
}

#[test]
fn modes_and_bus_settings_coexist_in_one_store() {
    let mut store = NvsStore::new_in_memory();

    let mut modes = ModeStore::new();
    modes.load(&mut store);
    modes.set(Pair::Pair4, ChannelMode::Latch, &mut store);

    BusConfig {
        id: 0x14FF_FFB1,
        baud: BaudRate::Baud125k,
    }
    .save(&mut store)
    .unwrap();

    // Reboot: both survive, neither clobbered the other.
    let mut modes2 = ModeStore::new();
    modes2.load(&mut store);
    assert_eq!(modes2.get(Pair::Pair4), ChannelMode::Latch);

    let bus = BusConfig::load(&store);
    assert_eq!(bus.id, 0x14FF_FFB1);
    assert_eq!(bus.baud, BaudRate::Baud125k);
}

#[test]
fn unformatted_marker_triggers_a_full_format_exactly_once() {
    let mut store = NvsStore::new_in_memory();
    assert!(!store.is_initialized());

    let mut modes = ModeStore::new();
    modes.load(&mut store);
    assert!(store.is_initialized());

    // A later load with a valid marker must not rewrite custom modes.
    modes.set(Pair::Pair2, ChannelMode::Latch, &mut store);
    let mut modes2 = ModeStore::new();
    modes2.load(&mut store);
    assert_eq!(modes2.get(Pair::Pair2), ChannelMode::Latch);
}

#[test]
fn system_config_survives_a_reboot() {
    let store = NvsStore::new_in_memory();
    let mut cfg = SystemConfig::default();
    cfg.overcurrent_latching = true;
    cfg.current_budget_ma = 12_000;
    store.save(&cfg).unwrap();

    let loaded = store.load().unwrap();
    assert!(loaded.overcurrent_latching);
    assert_eq!(loaded.current_budget_ma, 12_000);
}
