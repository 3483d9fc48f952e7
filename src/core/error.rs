//! Errors surfaced by tag operations
//!
//! Protocol noise (malformed lines, out-of-sequence signals) never shows up
//! here; sessions absorb it. What remains is what a caller has to act on.

use crate::core::record::IdentifierError;
use crate::core::store::StoreError;
use crate::core::transport::TransportError;
use thiserror::Error;

/// How a record was looked up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// By identifier
    Uuid(String),
    /// By display name
    Name(String),
}

impl std::fmt::Display for Lookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uuid(uuid) => write!(f, "uuid {uuid:?}"),
            Self::Name(name) => write!(f, "name {name:?}"),
        }
    }
}

/// Tag operation errors
#[derive(Error, Debug)]
pub enum TagError {
    /// The reader could not be opened, or failed mid-session
    #[error("NFC reader unavailable: {0}")]
    TransportUnavailable(#[source] TransportError),

    /// The operator aborted a blocked read
    #[error("operation interrupted")]
    Interrupted,

    /// The tag payload lacks a required key
    #[error("no {0:?} field was found on this tag")]
    MissingField(String),

    /// The store has no matching record
    #[error("no record with {0} found")]
    RecordNotFound(Lookup),

    /// The identifier cannot be written to a tag
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(#[from] IdentifierError),

    /// The record store failed
    #[error("record store error: {0}")]
    Store(#[from] StoreError),
}

impl From<TransportError> for TagError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Interrupted => Self::Interrupted,
            other => Self::TransportUnavailable(other),
        }
    }
}

impl TagError {
    /// Whether this is the ordinary "no such record" outcome
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RecordNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_errors_map_to_unavailable() {
        let err = TagError::from(TransportError::Disconnected);
        assert!(matches!(err, TagError::TransportUnavailable(_)));

        let err = TagError::from(TransportError::PortNotFound("COM3".to_string()));
        assert!(err.to_string().contains("COM3"));

        assert!(matches!(
            TagError::from(TransportError::Interrupted),
            TagError::Interrupted
        ));
    }

    #[test]
    fn test_not_found_message() {
        let err = TagError::RecordNotFound(Lookup::Name("prop7".to_string()));
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "no record with name \"prop7\" found");
    }
}
