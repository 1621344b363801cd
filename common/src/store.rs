use std::collections::BTreeMap;

use crate::{
    error::StoreError,
    topics::{STORE_KEY_AQ_ECO2, STORE_KEY_AQ_TVOC},
    types::AirQualityBaseline,
};

pub const STORE_CAPACITY: usize = 508;

pub type Entries = BTreeMap<String, i64>;

/// Non-volatile key/value storage. `set` only stages, `save` persists.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Option<i64>;
    fn set(&mut self, key: &str, value: i64);
    fn save(&mut self) -> Result<(), StoreError>;
}

pub fn encode_entries(entries: &Entries) -> Result<Vec<u8>, StoreError> {
    let bytes = serde_json::to_vec(entries)?;
    if bytes.len() > STORE_CAPACITY {
        return Err(StoreError::CapacityExceeded {
            size: bytes.len(),
            capacity: STORE_CAPACITY,
        });
    }
    Ok(bytes)
}

pub fn decode_entries(bytes: &[u8]) -> Result<Entries, StoreError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Entries::new());
    }
    Ok(serde_json::from_slice(bytes)?)
}

/// Stored baseline, if both values are present and non-zero.
pub fn load_baseline(store: &dyn KeyValueStore) -> Option<AirQualityBaseline> {
    let eco2 = u16::try_from(store.get(STORE_KEY_AQ_ECO2)?).ok()?;
    let tvoc = u16::try_from(store.get(STORE_KEY_AQ_TVOC)?).ok()?;
    let baseline = AirQualityBaseline { eco2, tvoc };
    baseline.is_valid().then_some(baseline)
}

pub fn save_baseline(
    store: &mut dyn KeyValueStore,
    baseline: AirQualityBaseline,
) -> Result<(), StoreError> {
    store.set(STORE_KEY_AQ_ECO2, i64::from(baseline.eco2));
    store.set(STORE_KEY_AQ_TVOC, i64::from(baseline.tvoc));
    store.save()
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Entries,
    saved: Entries,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Entries) -> Self {
        Self {
            saved: entries.clone(),
            entries,
            saves: 0,
        }
    }

    pub fn saved(&self) -> &Entries {
        &self.saved
    }

    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<i64> {
        self.entries.get(key).copied()
    }

    fn set(&mut self, key: &str, value: i64) {
        self.entries.insert(key.to_string(), value);
    }

    fn save(&mut self) -> Result<(), StoreError> {
        encode_entries(&self.entries)?;
        self.saved = self.entries.clone();
        self.saves += 1;
        Ok(())
    }
}
