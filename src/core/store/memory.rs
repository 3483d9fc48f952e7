//! In-memory record store

use super::{insert_into, replace_in, RecordStore, StoreError};
use crate::core::record::Record;

/// Records kept in insertion order; name lookups return the oldest match
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Vec<Record>,
}

impl MemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-loaded with `records`
    pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
        Self {
            records: records.into_iter().collect(),
        }
    }

    /// All records, oldest first
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordStore for MemoryStore {
    fn create(&mut self, record: &Record) -> Result<(), StoreError> {
        insert_into(&mut self.records, record)
    }

    fn update(&mut self, record: &Record) -> Result<(), StoreError> {
        replace_in(&mut self.records, record)
    }

    fn get_by_uuid(&self, uuid: &str) -> Result<Option<Record>, StoreError> {
        Ok(self.records.iter().find(|r| r.uuid == uuid).cloned())
    }

    fn get_by_name(&self, name: &str) -> Result<Option<Record>, StoreError> {
        Ok(self.records.iter().find(|r| r.name == name).cloned())
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
    fn test_create_and_lookup() {
        let mut store = MemoryStore::new();
        store.create(&record("a1b2c", "sword")).unwrap();

        assert_eq!(store.get_by_uuid("a1b2c").unwrap().unwrap().name, "sword");
        assert!(store.get_by_uuid("zzzzz").unwrap().is_none());
        assert!(store.get_by_name("shield").unwrap().is_none());
    }

    #[test]
    fn test_create_rejects_missing_and_duplicate_ids() {
        let mut store = MemoryStore::new();
        assert!(matches!(
            store.create(&record("", "sword")),
            Err(StoreError::MissingIdentifier)
        ));
        store.create(&record("a1b2c", "sword")).unwrap();
        assert!(matches!(
            store.create(&record("a1b2c", "shield")),
            Err(StoreError::Duplicate(_))
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_name_lookup_returns_oldest_match() {
        let store = MemoryStore::with_records([record("aaaaa", "prop7"), record("bbbbb", "prop7")]);
        assert_eq!(store.get_by_name("prop7").unwrap().unwrap().uuid, "aaaaa");
    }

    #[test]
    fn test_update() {
        let mut store = MemoryStore::with_records([record("a1b2c", "sword")]);
        let mut changed = record("a1b2c", "broadsword");
        changed.set("color", "red");
        store.update(&changed).unwrap();
        assert_eq!(store.get_by_uuid("a1b2c").unwrap().unwrap(), changed);

        assert!(matches!(
            store.update(&record("zzzzz", "ghost")),
            Err(StoreError::UnknownRecord(_))
        ));
    }
}
