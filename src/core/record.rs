//! Records, tag identifiers and NDEF payloads
//!
//! A [`Record`] describes one physical prop. The short [`Identifier`] is what
//! actually lives on the tag and joins the tag to its record.

use crate::core::protocol::wire::{DELIMITER, END_OF_MESSAGE, IDENTIFIER_KEY, TAG_ID_KEY};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Tag memory budget for the identifier, in bytes
pub const MAX_IDENTIFIER_LEN: usize = 5;

/// Timestamp format for [`Record::created`]
pub const CREATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Identifier validation failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    /// Empty identifier
    #[error("identifier is empty")]
    Empty,

    /// Longer than the tag can hold
    #[error("identifier {value:?} is {len} bytes; tags hold at most {MAX_IDENTIFIER_LEN}")]
    TooLong {
        /// Rejected value
        value: String,
        /// Its length in bytes
        len: usize,
    },

    /// Contains a byte that would break the wire framing
    #[error("identifier {value:?} contains invalid character {ch:?}")]
    InvalidChar {
        /// Rejected value
        value: String,
        /// Offending character
        ch: char,
    },
}

/// The short join key stored on a tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(String);

impl Identifier {
    /// Validate an identifier
    pub fn new(value: impl Into<String>) -> Result<Self, IdentifierError> {
        let value = value.into();
        if value.is_empty() {
            return Err(IdentifierError::Empty);
        }
        let invalid = value
            .chars()
            .find(|&c| !c.is_ascii_graphic() || c == DELIMITER || c == END_OF_MESSAGE);
        if let Some(ch) = invalid {
            return Err(IdentifierError::InvalidChar { value, ch });
        }
        if value.len() > MAX_IDENTIFIER_LEN {
            let len = value.len();
            return Err(IdentifierError::TooLong { value, len });
        }
        Ok(Self(value))
    }

    /// Fresh identifier: the head of a random v4 UUID
    pub fn generate() -> Self {
        let full = uuid::Uuid::new_v4().simple().to_string();
        Self(full[..MAX_IDENTIFIER_LEN].to_string())
    }

    /// Identifier text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Key/value data read off one tag.
///
/// Later duplicates of a key overwrite earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NdefPayload(BTreeMap<String, String>);

impl NdefPayload {
    /// Empty payload
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a value, returning the previous one
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Look up a value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Hardware id the reader reported for the tag
    pub fn tag_id(&self) -> Option<&str> {
        self.get(TAG_ID_KEY)
    }

    /// Record identifier stored on the tag
    pub fn identifier(&self) -> Option<&str> {
        self.get(IDENTIFIER_KEY)
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no keys were received
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Keys in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for NdefPayload {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Errors parsing caller-supplied `key:value` pairs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldsError {
    /// A pair without a colon
    #[error("expected a colon-separated key and value (such as family:canine), got {0:?}")]
    MissingDelimiter(String),

    /// A pair with nothing before the colon
    #[error("empty key in {0:?}")]
    EmptyKey(String),
}

/// Ordered key/value pairs supplied by the operator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFields(Vec<(String, String)>);

impl RecordFields {
    /// No fields
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `name:Xample, recordType:example`.
    ///
    /// Pairs are comma separated; the key ends at the first colon and the
    /// remainder is the value. Surrounding whitespace is trimmed.
    pub fn parse(input: &str) -> Result<Self, FieldsError> {
        let mut fields = Self::new();
        for pair in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once(DELIMITER)
                .ok_or_else(|| FieldsError::MissingDelimiter(pair.to_string()))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(FieldsError::EmptyKey(pair.to_string()));
            }
            fields.insert(key, value.trim());
        }
        Ok(fields)
    }

    /// Add a field; a repeated key replaces the earlier value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Look up a field
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Whether no fields were supplied
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RecordFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Self::new();
        for (k, v) in iter {
            fields.insert(k, v);
        }
        fields
    }
}

/// Values new records start with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordDefaults {
    /// Stage the prop lives on
    pub location: String,
    /// Default scale
    pub scale: String,
}

impl Default for RecordDefaults {
    fn default() -> Self {
        Self {
            location: "mbsStage26".to_string(),
            scale: "1".to_string(),
        }
    }
}

/// One prop on the callsheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Identifier written to the prop's tag
    pub uuid: String,
    /// Display name; not guaranteed unique
    #[serde(default)]
    pub name: String,
    /// Hardware id of the tag currently attached
    #[serde(default)]
    pub nfc_tag_id: String,
    /// Free-form category
    #[serde(default)]
    pub record_type: String,
    /// Scale
    #[serde(default)]
    pub scale: String,
    /// Location
    #[serde(default)]
    pub location: String,
    /// Creation time, local
    #[serde(default)]
    pub created: String,
    /// Any other caller-supplied fields
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl Record {
    /// A new record with a freshly generated identifier
    pub fn new(defaults: &RecordDefaults) -> Self {
        Self {
            uuid: Identifier::generate().to_string(),
            name: String::new(),
            nfc_tag_id: String::new(),
            record_type: String::new(),
            scale: defaults.scale.clone(),
            location: defaults.location.clone(),
            created: Local::now().format(CREATED_FORMAT).to_string(),
            extra: BTreeMap::new(),
        }
    }

    /// The record's identifier, validated for writing to a tag
    pub fn identifier(&self) -> Result<Identifier, IdentifierError> {
        Identifier::new(self.uuid.as_str())
    }

    /// Set one field by its wire/store name
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match key {
            "uuid" => self.uuid = value,
            "name" => self.name = value,
            "nfcTagId" => self.nfc_tag_id = value,
            "recordType" => self.record_type = value,
            "scale" => self.scale = value,
            "location" => self.location = value,
            "created" => self.created = value,
            other => {
                self.extra.insert(other.to_string(), value);
            }
        }
    }

    /// Get one field by its wire/store name
    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            "uuid" => Some(&self.uuid),
            "name" => Some(&self.name),
            "nfcTagId" => Some(&self.nfc_tag_id),
            "recordType" => Some(&self.record_type),
            "scale" => Some(&self.scale),
            "location" => Some(&self.location),
            "created" => Some(&self.created),
            other => self.extra.get(other).map(String::as_str),
        }
    }

    /// Merge caller-supplied fields over this record
    pub fn apply(&mut self, fields: &RecordFields) {
        for (key, value) in fields.iter() {
            self.set(key, value);
        }
    }

    /// All fields, fixed ones first
    pub fn fields(&self) -> Vec<(&str, &str)> {
        let mut fields = vec![
            ("uuid", self.uuid.as_str()),
            ("name", self.name.as_str()),
            ("nfcTagId", self.nfc_tag_id.as_str()),
            ("recordType", self.record_type.as_str()),
            ("scale", self.scale.as_str()),
            ("location", self.location.as_str()),
            ("created", self.created.as_str()),
        ];
        fields.extend(self.extra.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_validation() {
        assert_eq!(Identifier::new("a1b2c").unwrap().as_str(), "a1b2c");
        assert_eq!(Identifier::new(""), Err(IdentifierError::Empty));
        assert!(matches!(
            Identifier::new("abcdef"),
            Err(IdentifierError::TooLong { len: 6, .. })
        ));
        assert!(matches!(
            Identifier::new("a:b"),
            Err(IdentifierError::InvalidChar { ch: ':', .. })
        ));
        assert!(matches!(
            Identifier::new("ab$"),
            Err(IdentifierError::InvalidChar { ch: '$', .. })
        ));
        assert!(Identifier::new("a b").is_err());
    }

    #[test]
    fn test_generated_identifiers_fit_on_tag() {
        for _ in 0..32 {
            let id = Identifier::generate();
            assert_eq!(id.as_str().len(), MAX_IDENTIFIER_LEN);
            assert!(Identifier::new(id.as_str()).is_ok());
        }
    }

    #[test]
    fn test_payload_last_write_wins() {
        let mut payload = NdefPayload::new();
        assert_eq!(payload.insert("name", "Allen"), None);
        assert_eq!(payload.insert("name", "Stetson"), Some("Allen".to_string()));
        assert_eq!(payload.get("name"), Some("Stetson"));
        assert_eq!(payload.len(), 1);
    }

    #[test]
    fn test_fields_parse() {
        let fields = RecordFields::parse("name:Xample, recordType:example").unwrap();
        assert_eq!(fields.get("name"), Some("Xample"));
        assert_eq!(fields.get("recordType"), Some("example"));

        let fields = RecordFields::parse("note: a:b ").unwrap();
        assert_eq!(fields.get("note"), Some("a:b"));

        assert!(matches!(
            RecordFields::parse("family canine"),
            Err(FieldsError::MissingDelimiter(_))
        ));
        assert!(matches!(RecordFields::parse(":x"), Err(FieldsError::EmptyKey(_))));
        assert!(RecordFields::parse("").unwrap().is_empty());
    }

    #[test]
    fn test_record_apply() {
        let mut record = Record::new(&RecordDefaults::default());
        assert_eq!(record.location, "mbsStage26");
        assert_eq!(record.scale, "1");
        assert!(record.identifier().is_ok());

        let fields = RecordFields::parse("name:prop7, recordType:sword, color:red").unwrap();
        record.apply(&fields);
        assert_eq!(record.name, "prop7");
        assert_eq!(record.record_type, "sword");
        assert_eq!(record.get("color"), Some("red"));
        assert_eq!(record.fields().len(), 8);
    }

    #[test]
    fn test_record_serializes_with_store_names() {
        let mut record = Record::new(&RecordDefaults::default());
        record.nfc_tag_id = "0x04 0xBC".to_string();
        record.set("color", "red");

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["nfcTagId"], "0x04 0xBC");
        assert_eq!(json["color"], "red");

        let back: Record = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
