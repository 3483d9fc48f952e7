//! JSON file record store

use super::{insert_into, replace_in, RecordStore, StoreError};
use crate::core::record::Record;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Records persisted as a JSON array in one file.
///
/// The file is re-read on every call and rewritten on every mutation, so
/// several short-lived processes can share it one after another.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store backed by `path`. The file is created on first write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all records
    pub fn load(&self) -> Result<Vec<Record>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, records: &[Record]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                info!(path = %parent.display(), "No store found, creating");
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(records)?;
        fs::write(&self.path, content)?;
        debug!(path = %self.path.display(), records = records.len(), "Store saved");
        Ok(())
    }
}

impl RecordStore for JsonFileStore {
    fn create(&mut self, record: &Record) -> Result<(), StoreError> {
        let mut records = self.load()?;
        insert_into(&mut records, record)?;
        info!(uuid = %record.uuid, name = %record.name, "Writing record");
        self.save(&records)
    }

    fn update(&mut self, record: &Record) -> Result<(), StoreError> {
        let mut records = self.load()?;
        replace_in(&mut records, record)?;
        info!(uuid = %record.uuid, "Updating record");
        self.save(&records)
    }

    fn get_by_uuid(&self, uuid: &str) -> Result<Option<Record>, StoreError> {
        Ok(self.load()?.into_iter().find(|r| r.uuid == uuid))
    }

    fn get_by_name(&self, name: &str) -> Result<Option<Record>, StoreError> {
        Ok(self.load()?.into_iter().find(|r| r.name == name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::RecordDefaults;

    fn record(uuid: &str, name: &str) -> Record {
        let mut record = Record::new(&RecordDefaults::default());
        record.uuid = uuid.to_string();
        record.name = name.to_string();
        record
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("callsheet.json"));
        assert!(store.load().unwrap().is_empty());
        assert!(store.get_by_uuid("a1b2c").unwrap().is_none());
    }

    #[test]
    fn test_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("callsheet.json");

        let mut store = JsonFileStore::open(&path);
        store.create(&record("a1b2c", "sword")).unwrap();

        let mut reopened = JsonFileStore::open(&path);
        let mut found = reopened.get_by_name("sword").unwrap().unwrap();
        assert_eq!(found.uuid, "a1b2c");

        found.nfc_tag_id = "0x04 0xBC".to_string();
        reopened.update(&found).unwrap();
        assert_eq!(
            store.get_by_uuid("a1b2c").unwrap().unwrap().nfc_tag_id,
            "0x04 0xBC"
        );
    }

    #[test]
    fn test_rejects_duplicates_and_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("callsheet.json");
        let mut store = JsonFileStore::open(&path);
        store.create(&record("a1b2c", "sword")).unwrap();
        assert!(matches!(
            store.create(&record("a1b2c", "sword")),
            Err(StoreError::Duplicate(_))
        ));

        fs::write(&path, "not json").unwrap();
        assert!(matches!(store.load(), Err(StoreError::Format(_))));
    }
}
