//! Tag operations
//!
//! [`TagOperations`] is the only entry point callers need: it sends the
//! trigger command, runs the matching session over the transport, and maps
//! payloads to and from records in the store.
//!
//! Every method takes `&mut self`, so two sessions can never be in flight
//! against the same transport.

use crate::core::error::{Lookup, TagError};
use crate::core::protocol::wire::{IDENTIFIER_KEY, TAG_ID_KEY};
use crate::core::protocol::Command;
use crate::core::record::{Identifier, NdefPayload, Record, RecordDefaults, RecordFields};
use crate::core::session::{ReadOutcome, ReadSession, SessionSettings, WriteOutcome, WriteSession};
use crate::core::store::{RecordStore, StoreError};
use crate::core::transport::LineTransport;
use tracing::{info, warn};

/// Attempts at drawing an identifier that is not already taken
const MAX_IDENTIFIER_DRAWS: usize = 8;

/// Reader + store facade
pub struct TagOperations<T, S> {
    transport: T,
    store: S,
    settings: SessionSettings,
    defaults: RecordDefaults,
}

impl<T: LineTransport, S: RecordStore> TagOperations<T, S> {
    /// Facade over `transport` and `store` with default settings
    pub fn new(transport: T, store: S) -> Self {
        Self {
            transport,
            store,
            settings: SessionSettings::default(),
            defaults: RecordDefaults::default(),
        }
    }

    /// Override session timing
    #[must_use]
    pub fn with_settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Override defaults for new records
    #[must_use]
    pub fn with_defaults(mut self, defaults: RecordDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// The record store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Take the facade apart
    pub fn into_parts(self) -> (T, S) {
        (self.transport, self.store)
    }

    /// Run a full read session, keeping session diagnostics
    pub fn read_session(&mut self) -> Result<ReadOutcome, TagError> {
        self.transport.send(Command::Read.bytes())?;
        let outcome = ReadSession::new().run(&mut self.transport)?;
        info!(
            tag = outcome.payload.tag_id().unwrap_or("?"),
            keys = ?outcome.payload.keys().collect::<Vec<_>>(),
            "NDEF data retrieved"
        );
        Ok(outcome)
    }

    /// Read whatever the next presented tag carries.
    ///
    /// Missing keys are not an error here; see [`Self::get_id_from_tag`] and
    /// [`Self::get_record_from_tag`].
    pub fn read_tag(&mut self) -> Result<NdefPayload, TagError> {
        Ok(self.read_session()?.payload)
    }

    /// Hardware id of the next presented tag
    pub fn get_id_from_tag(&mut self) -> Result<String, TagError> {
        let payload = self.read_tag()?;
        payload
            .tag_id()
            .map(str::to_string)
            .ok_or_else(|| TagError::MissingField(TAG_ID_KEY.to_string()))
    }

    /// Read a tag and return both its payload and its record
    pub fn read_record_from_tag(&mut self) -> Result<(NdefPayload, Record), TagError> {
        let payload = self.read_tag()?;
        let uuid = payload
            .identifier()
            .ok_or_else(|| TagError::MissingField(IDENTIFIER_KEY.to_string()))?;
        let record = self
            .store
            .get_by_uuid(uuid)?
            .ok_or_else(|| TagError::RecordNotFound(Lookup::Uuid(uuid.to_string())))?;
        Ok((payload, record))
    }

    /// Record for the next presented tag
    pub fn get_record_from_tag(&mut self) -> Result<Record, TagError> {
        Ok(self.read_record_from_tag()?.1)
    }

    /// Record by display name. Does not touch the reader.
    ///
    /// Names are not unique. When several records share `name`, the store
    /// decides which one is returned; callers should confirm the match.
    pub fn get_record_by_name(&self, name: &str) -> Result<Record, TagError> {
        self.store
            .get_by_name(name)?
            .ok_or_else(|| TagError::RecordNotFound(Lookup::Name(name.to_string())))
    }

    /// Write `identifier` to the next presented tag
    pub fn write_tag(&mut self, identifier: &Identifier) -> Result<WriteOutcome, TagError> {
        self.transport.send(Command::Write.bytes())?;
        let outcome = WriteSession::new(identifier.clone(), self.settings).run(&mut self.transport)?;
        Ok(outcome)
    }

    /// Register a fresh tag: read its hardware id, store a new record built
    /// from `fields`, then write the record's identifier back to the tag.
    pub fn create_record(&mut self, fields: &RecordFields) -> Result<Record, TagError> {
        let tag_id = self.get_id_from_tag()?;

        let mut record = Record::new(&self.defaults);
        record.nfc_tag_id = tag_id;
        record.apply(fields);
        if fields.get(IDENTIFIER_KEY).is_none() {
            self.draw_free_identifier(&mut record)?;
        }
        let identifier = record.identifier()?;

        self.store.create(&record)?;
        info!(uuid = %record.uuid, name = %record.name, "Record created");

        self.write_tag(&identifier)?;
        Ok(record)
    }

    /// Merge `fields` into the stored record named by their `uuid`
    pub fn update_record(&mut self, fields: &RecordFields) -> Result<Record, TagError> {
        let uuid = fields
            .get(IDENTIFIER_KEY)
            .ok_or_else(|| TagError::MissingField(IDENTIFIER_KEY.to_string()))?;
        let mut record = self
            .store
            .get_by_uuid(uuid)?
            .ok_or_else(|| TagError::RecordNotFound(Lookup::Uuid(uuid.to_string())))?;
        record.apply(fields);
        self.store_update(&record)?;
        Ok(record)
    }

    /// Move an existing record onto a new physical tag: read the new tag's
    /// hardware id, store it on the record, then write the identifier.
    pub fn assign_tag(&mut self, mut record: Record) -> Result<Record, TagError> {
        let identifier = record.identifier()?;
        info!(name = %record.name, "Swipe new tag to associate with this record");
        record.nfc_tag_id = self.get_id_from_tag()?;
        self.store_update(&record)?;
        self.write_tag(&identifier)?;
        Ok(record)
    }

    fn store_update(&mut self, record: &Record) -> Result<(), TagError> {
        match self.store.update(record) {
            Ok(()) => Ok(()),
            Err(StoreError::UnknownRecord(uuid)) => Err(TagError::RecordNotFound(Lookup::Uuid(uuid))),
            Err(e) => Err(e.into()),
        }
    }

    fn draw_free_identifier(&self, record: &mut Record) -> Result<(), TagError> {
        for _ in 0..MAX_IDENTIFIER_DRAWS {
            if self.store.get_by_uuid(&record.uuid)?.is_none() {
                return Ok(());
            }
            warn!(uuid = %record.uuid, "Generated identifier already in use, drawing again");
            record.uuid = Identifier::generate().to_string();
        }
        Err(StoreError::Duplicate(record.uuid.clone()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::simulator::ScriptedDevice;
    use crate::core::store::{MemoryStore, MockRecordStore};
    use std::time::Duration;

    const TAG_READ: [&str; 4] = [
        "nfc2py:1001:01",
        "uid:0x04 0xBC",
        "num_ndef_records:0",
        "nfc2py:1001:02",
    ];

    fn fast() -> SessionSettings {
        SessionSettings {
            write_settle: Duration::ZERO,
        }
    }

    fn stored(uuid: &str, name: &str) -> Record {
        let mut record = Record::new(&RecordDefaults::default());
        record.uuid = uuid.to_string();
        record.name = name.to_string();
        record
    }

    #[test]
    fn test_read_tag_sends_read_command() {
        let device = ScriptedDevice::new(TAG_READ);
        let mut ops = TagOperations::new(device, MemoryStore::new());
        let payload = ops.read_tag().unwrap();
        assert_eq!(payload.tag_id(), Some("0x04 0xBC"));
        assert_eq!(ops.transport().sent(), [b":read:".to_vec()]);
    }

    #[test]
    fn test_get_id_without_uid_is_missing_field() {
        let device = ScriptedDevice::new(["nfc2py:1001:01", "payload:#name:Allen:", "nfc2py:1001:02"]);
        let mut ops = TagOperations::new(device, MemoryStore::new());
        match ops.get_id_from_tag() {
            Err(TagError::MissingField(field)) => assert_eq!(field, "uid"),
            other => panic!("expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn test_record_from_tag_without_uuid_skips_store() {
        let mut store = MockRecordStore::new();
        store.expect_get_by_uuid().never();
        let mut ops = TagOperations::new(ScriptedDevice::new(TAG_READ), store);
        assert!(matches!(
            ops.get_record_from_tag(),
            Err(TagError::MissingField(field)) if field == "uuid"
        ));
    }

    #[test]
    fn test_record_from_tag_not_in_store() {
        let device = ScriptedDevice::new(["nfc2py:1001:01", "payload:uuid:zzzzz", "nfc2py:1001:02"]);
        let mut ops = TagOperations::new(device, MemoryStore::new());
        match ops.get_record_from_tag() {
            Err(TagError::RecordNotFound(Lookup::Uuid(uuid))) => assert_eq!(uuid, "zzzzz"),
            other => panic!("expected RecordNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_record_by_name_never_touches_reader() {
        let mut store = MockRecordStore::new();
        store
            .expect_get_by_name()
            .withf(|name| name == "prop7")
            .times(1)
            .returning(|_| Ok(None));
        let ops = TagOperations::new(ScriptedDevice::default(), store);

        assert!(ops.get_record_by_name("prop7").unwrap_err().is_not_found());
        assert!(ops.transport().sent().is_empty());
        assert_eq!(ops.transport().lines_read(), 0);
    }

    #[test]
    fn test_create_record_reads_stores_then_writes() {
        let mut device = ScriptedDevice::new(TAG_READ);
        device.push_lines(["nfc2py:1001:03", "nfc2py:1001:02"]);

        let mut store = MockRecordStore::new();
        store.expect_get_by_uuid().times(1).returning(|_| Ok(None));
        store
            .expect_create()
            .withf(|record| record.name == "sword" && record.nfc_tag_id == "0x04 0xBC")
            .times(1)
            .returning(|_| Ok(()));

        let mut ops = TagOperations::new(device, store).with_settings(fast());
        let fields = RecordFields::parse("name:sword, recordType:weapon").unwrap();
        let record = ops.create_record(&fields).unwrap();

        let expected = format!("uuid:{}$", record.uuid);
        let sent = ops.transport().sent();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0], b":read:");
        assert_eq!(sent[1], b":new:");
        assert_eq!(sent[2], expected.as_bytes());
        assert_eq!(record.record_type, "weapon");
    }

    #[test]
    fn test_create_record_rejects_unwritable_uuid_before_storing() {
        let mut store = MockRecordStore::new();
        store.expect_create().never();
        let mut ops = TagOperations::new(ScriptedDevice::new(TAG_READ), store);
        let fields = RecordFields::parse("uuid:much-too-long").unwrap();
        assert!(matches!(
            ops.create_record(&fields),
            Err(TagError::InvalidIdentifier(_))
        ));
        assert_eq!(ops.transport().sent().len(), 1);
    }

    #[test]
    fn test_update_record() {
        let store = MemoryStore::with_records([stored("a1b2c", "sword")]);
        let mut ops = TagOperations::new(ScriptedDevice::default(), store);

        let fields = RecordFields::parse("uuid:a1b2c, scale:2").unwrap();
        assert_eq!(ops.update_record(&fields).unwrap().scale, "2");
        assert_eq!(ops.store().records()[0].scale, "2");

        let fields = RecordFields::parse("name:nothing").unwrap();
        assert!(matches!(ops.update_record(&fields), Err(TagError::MissingField(_))));

        let fields = RecordFields::parse("uuid:zzzzz").unwrap();
        assert!(ops.update_record(&fields).unwrap_err().is_not_found());
    }

    #[test]
    fn test_assign_tag_updates_tag_id_and_rewrites() {
        let mut device = ScriptedDevice::new([
            "nfc2py:1001:01",
            "uid:0x99",
            "nfc2py:1001:02",
        ]);
        device.push_lines(["nfc2py:1001:03", "nfc2py:1001:02"]);
        let store = MemoryStore::with_records([stored("a1b2c", "sword")]);
        let mut ops = TagOperations::new(device, store).with_settings(fast());

        let record = ops.get_record_by_name("sword").unwrap();
        let record = ops.assign_tag(record).unwrap();

        assert_eq!(record.nfc_tag_id, "0x99");
        assert_eq!(ops.store().records()[0].nfc_tag_id, "0x99");
        assert_eq!(ops.transport().count_sent(b"uuid:a1b2c$"), 1);
    }

    #[test]
    fn test_transport_failure_is_unavailable() {
        let mut ops = TagOperations::new(ScriptedDevice::default(), MemoryStore::new());
        assert!(matches!(ops.read_tag(), Err(TagError::TransportUnavailable(_))));
    }
}
