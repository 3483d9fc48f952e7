//! Wire constants shared with the reader firmware

use crate::core::record::Identifier;

/// Token that opens every device-to-host control line
pub const CONTROL_PREFIX: &str = "nfc2py";

/// Field delimiter for control and data lines
pub const DELIMITER: char = ':';

/// Terminates a host-to-device payload
pub const END_OF_MESSAGE: char = '$';

/// Marker some NDEF text records carry in front of their key
pub const KEY_MARKER: char = '#';

/// Key of the advisory record-count metadata line
pub const RECORD_COUNT_KEY: &str = "num_ndef_records";

/// Key that introduces an NDEF payload line
pub const PAYLOAD_KEY: &str = "payload";

/// Key the reader uses for the tag's hardware id
pub const TAG_ID_KEY: &str = "uid";

/// Key carrying the record identifier written to a tag
pub const IDENTIFIER_KEY: &str = "uuid";

/// Mode requests understood by the reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Report the next tag presented
    Read,
    /// Write a payload to the next tag presented
    Write,
}

impl Command {
    /// Bytes sent to the reader. No terminator: the firmware scans for these
    /// tokens inside its own receive buffer.
    pub fn bytes(self) -> &'static [u8] {
        match self {
            Self::Read => b":read:",
            Self::Write => b":new:",
        }
    }
}

/// Encode the single line that burns `id` onto a tag: `uuid:<id>$`
pub fn encode_write_payload(id: &Identifier) -> Vec<u8> {
    format!("{IDENTIFIER_KEY}{DELIMITER}{}{END_OF_MESSAGE}", id.as_str()).into_bytes()
}
