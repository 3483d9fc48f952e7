//! CLI Exit Codes
//!
//! Standard exit codes for CLI operations and automation.

use crate::core::error::TagError;
use crate::core::store::StoreError;
use crate::core::transport::TransportError;
use std::process::ExitCode;

/// Exit code constants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCodes;

impl ExitCodes {
    /// Success
    pub const SUCCESS: u8 = 0;

    /// General error
    pub const ERROR: u8 = 1;

    /// Invalid arguments
    pub const INVALID_ARGS: u8 = 2;

    /// Reader failed mid-session
    pub const CONNECTION_FAILED: u8 = 3;

    /// Configuration error
    pub const CONFIG_ERROR: u8 = 8;

    /// Required field missing from a tag
    pub const MISSING_FIELD: u8 = 9;

    /// User cancelled
    pub const CANCELLED: u8 = 11;

    /// Port busy
    pub const DEVICE_BUSY: u8 = 13;

    /// Port not found
    pub const PORT_NOT_FOUND: u8 = 14;

    /// No matching record
    pub const RECORD_NOT_FOUND: u8 = 16;

    /// Data validation failed
    pub const VALIDATION_FAILED: u8 = 17;

    /// Record store failed
    pub const STORE_ERROR: u8 = 18;

    /// Internal error
    pub const INTERNAL_ERROR: u8 = 127;
}

/// CLI operation result
#[derive(Debug)]
pub enum CliResult {
    /// Success with optional message
    Success(Option<String>),

    /// Error with code and message
    Error(u8, String),
}

impl CliResult {
    /// Plain success
    pub fn success() -> Self {
        Self::Success(None)
    }

    /// Success with a message for the operator
    pub fn success_with_message(msg: impl Into<String>) -> Self {
        Self::Success(Some(msg.into()))
    }

    /// Error with an explicit code
    pub fn error(code: u8, msg: impl Into<String>) -> Self {
        Self::Error(code, msg.into())
    }

    /// Get exit code
    pub fn code(&self) -> u8 {
        match self {
            Self::Success(_) => ExitCodes::SUCCESS,
            Self::Error(code, _) => *code,
        }
    }

    /// Get message
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success(Some(msg)) | Self::Error(_, msg) => Some(msg),
            Self::Success(None) => None,
        }
    }

    /// Convert to ExitCode
    pub fn to_exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }

    /// Is success?
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl From<&TagError> for CliResult {
    fn from(err: &TagError) -> Self {
        let code = match err {
            TagError::TransportUnavailable(TransportError::PortNotFound(_)) => ExitCodes::PORT_NOT_FOUND,
            TagError::TransportUnavailable(TransportError::PortBusy(_)) => ExitCodes::DEVICE_BUSY,
            TagError::TransportUnavailable(_) => ExitCodes::CONNECTION_FAILED,
            TagError::Interrupted => ExitCodes::CANCELLED,
            TagError::MissingField(_) => ExitCodes::MISSING_FIELD,
            TagError::RecordNotFound(_) => ExitCodes::RECORD_NOT_FOUND,
            TagError::InvalidIdentifier(_) => ExitCodes::VALIDATION_FAILED,
            TagError::Store(StoreError::MissingIdentifier | StoreError::Duplicate(_)) => {
                ExitCodes::VALIDATION_FAILED
            }
            TagError::Store(_) => ExitCodes::STORE_ERROR,
        };
        Self::Error(code, err.to_string())
    }
}

impl From<TagError> for CliResult {
    fn from(err: TagError) -> Self {
        Self::from(&err)
    }
}

/// Exit code description
pub fn exit_code_description(code: u8) -> &'static str {
    match code {
        0 => "Success",
        1 => "General error",
        2 => "Invalid arguments",
        3 => "Reader connection failed",
        8 => "Configuration error",
        9 => "Required field missing from tag",
        11 => "Operation cancelled",
        13 => "Reader port busy",
        14 => "Reader port not found",
        16 => "Record not found",
        17 => "Validation failed",
        18 => "Record store error",
        127 => "Internal error",
        _ => "Unknown error",
    }
}

/// Print exit code table
pub fn print_exit_codes() {
    println!("Exit Codes:");
    for code in [0, 1, 2, 3, 8, 9, 11, 13, 14, 16, 17, 18, 127] {
        println!("  {:>3}  {}", code, exit_code_description(code));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::Lookup;

    #[test]
    fn test_cli_result() {
        let success = CliResult::success();
        assert!(success.is_success());
        assert_eq!(success.code(), 0);

        let error = CliResult::error(3, "Connection failed");
        assert!(!error.is_success());
        assert_eq!(error.code(), 3);
        assert_eq!(error.message(), Some("Connection failed"));
    }

    #[test]
    fn test_from_tag_error() {
        let err = TagError::TransportUnavailable(TransportError::PortBusy("COM3".to_string()));
        assert_eq!(CliResult::from(err).code(), ExitCodes::DEVICE_BUSY);

        let err = TagError::RecordNotFound(Lookup::Name("prop7".to_string()));
        let result = CliResult::from(&err);
        assert_eq!(result.code(), ExitCodes::RECORD_NOT_FOUND);
        assert!(result.message().unwrap().contains("prop7"));

        assert_eq!(CliResult::from(TagError::Interrupted).code(), ExitCodes::CANCELLED);
        assert_eq!(exit_code_description(ExitCodes::MISSING_FIELD), "Required field missing from tag");
    }
}
