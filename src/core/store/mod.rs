//! Record store boundary
//!
//! The tag engine never persists anything itself. It talks to a
//! [`RecordStore`], which owns the records and how they are kept.
//! Two stores ship with the crate:
//! - [`MemoryStore`] for tests and dry runs
//! - [`JsonFileStore`], a single JSON file on disk

mod json;
mod memory;

pub use json::JsonFileStore;
pub use memory::MemoryStore;

use crate::core::record::Record;
use thiserror::Error;

/// Record store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// `create` called on a record without an identifier
    #[error("record for creation must contain a uuid")]
    MissingIdentifier,

    /// `create` called with an identifier already in use
    #[error("a record with uuid {0:?} already exists")]
    Duplicate(String),

    /// `update` called for an identifier the store does not know
    #[error("no record with uuid {0:?} to update")]
    UnknownRecord(String),

    /// Backing file could not be read or written
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backing file is not valid
    #[error("store format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// Persistence collaborator for [`Record`]s.
///
/// "Not found" is `Ok(None)`, not an error.
#[cfg_attr(test, mockall::automock)]
pub trait RecordStore {
    /// Insert a new record
    fn create(&mut self, record: &Record) -> Result<(), StoreError>;

    /// Replace the record with the same `uuid`
    fn update(&mut self, record: &Record) -> Result<(), StoreError>;

    /// Look up by identifier
    fn get_by_uuid(&self, uuid: &str) -> Result<Option<Record>, StoreError>;

    /// Look up by name. Names are not unique; which match comes back when
    /// several exist is up to the store.
    fn get_by_name(&self, name: &str) -> Result<Option<Record>, StoreError>;
}

/// Shared `create`/`update` rules for stores backed by a list
fn insert_into(records: &mut Vec<Record>, record: &Record) -> Result<(), StoreError> {
    if record.uuid.is_empty() {
        return Err(StoreError::MissingIdentifier);
    }
    if records.iter().any(|r| r.uuid == record.uuid) {
        return Err(StoreError::Duplicate(record.uuid.clone()));
    }
    records.push(record.clone());
    Ok(())
}

fn replace_in(records: &mut [Record], record: &Record) -> Result<(), StoreError> {
    let slot = records
        .iter_mut()
        .find(|r| r.uuid == record.uuid)
        .ok_or_else(|| StoreError::UnknownRecord(record.uuid.clone()))?;
    *slot = record.clone();
    Ok(())
}
