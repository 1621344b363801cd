use std::{io::ErrorKind, path::PathBuf};

use station_common::{
    store::{decode_entries, encode_entries, Entries},
    KeyValueStore, StoreError,
};

/// JSON file standing in for the flash key/value partition.
pub struct FileStore {
    path: PathBuf,
    entries: Entries,
}

impl FileStore {
    pub fn open(path: PathBuf) -> Result<Self, StoreError> {
        let entries = match std::fs::read(&path) {
            Ok(raw) => decode_entries(&raw)?,
            Err(err) if err.kind() == ErrorKind::NotFound => Entries::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self { path, entries })
    }

    pub fn empty(path: PathBuf) -> Self {
        Self {
            path,
            entries: Entries::new(),
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<i64> {
        self.entries.get(key).copied()
    }

    fn set(&mut self, key: &str, value: i64) {
        self.entries.insert(key.to_string(), value);
    }

    fn save(&mut self) -> Result<(), StoreError> {
        let payload = encode_entries(&self.entries)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, payload)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use station_common::{
        store::{load_baseline, save_baseline},
        AirQualityBaseline,
    };

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("weather-station-{}-{name}", std::process::id()))
            .join("store.json")
    }

    #[test]
    fn missing_file_opens_empty() {
        let store = FileStore::open(scratch_path("missing")).unwrap();

        assert_eq!(store.get("ws.aq.eco2"), None);
    }

    #[test]
    fn baseline_survives_reopen() {
        let path = scratch_path("reopen");
        let baseline = AirQualityBaseline {
            eco2: 35_000,
            tvoc: 36_000,
        };

        let mut store = FileStore::open(path.clone()).unwrap();
        save_baseline(&mut store, baseline).unwrap();

        let reopened = FileStore::open(path.clone()).unwrap();
        assert_eq!(load_baseline(&reopened), Some(baseline));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let path = scratch_path("corrupt");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"{not json").unwrap();

        assert!(matches!(FileStore::open(path.clone()), Err(StoreError::Corrupt(_))));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
