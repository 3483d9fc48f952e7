//! Line classifier
//!
//! Every line the reader emits is one of:
//! - a control frame, `nfc2py:<deviceId>:<code>`
//! - a data line, `num_ndef_records:<n>`, `payload:<key>:<value>` or `<key>:<value>`
//! - noise: blank lines, debug chatter, or data that lost a segment
//!
//! Classification is pure. Deciding what to log is left to the session.

use super::wire::{CONTROL_PREFIX, DELIMITER, KEY_MARKER, PAYLOAD_KEY, RECORD_COUNT_KEY};
use std::fmt;
use thiserror::Error;

/// Control codes carried in the third field of a control frame
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ControlCode {
    /// `01`: tag detected, NDEF data follows
    StartRead,
    /// `02`: transmission (read or write) finished
    End,
    /// `03`: reader is waiting for the payload to write
    ReadyWrite,
    /// Anything else, kept verbatim
    Unknown(String),
}

impl ControlCode {
    /// Parse the wire representation
    pub fn parse(code: &str) -> Self {
        match code {
            "01" => Self::StartRead,
            "02" => Self::End,
            "03" => Self::ReadyWrite,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Wire representation
    pub fn as_str(&self) -> &str {
        match self {
            Self::StartRead => "01",
            Self::End => "02",
            Self::ReadyWrite => "03",
            Self::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for ControlCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A device-to-host protocol signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlFrame {
    /// Reader id reported in the second field
    pub device_id: String,
    /// Signal code
    pub code: ControlCode,
}

/// A payload fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataLine {
    /// `num_ndef_records:<n>`; advisory only
    RecordCount(u32),
    /// `payload:<key>:<value>`, key marker already stripped
    Payload {
        /// Record key
        key: String,
        /// Record value
        value: String,
    },
    /// Any other `<key>:<value>` line, e.g. `uid:0x04 0xBC`
    Field {
        /// Field key
        key: String,
        /// Field value
        value: String,
    },
}

impl DataLine {
    /// Key/value pair this line contributes to the payload, if any
    pub fn entry(&self) -> Option<(&str, &str)> {
        match self {
            Self::RecordCount(_) => None,
            Self::Payload { key, value } | Self::Field { key, value } => Some((key, value)),
        }
    }
}

/// A line that carries nothing for the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Noise {
    /// The trimmed line
    pub line: String,
    /// Set when the line looked like protocol data but could not be parsed
    pub malformed: Option<&'static str>,
}

impl Noise {
    /// Whether this line is blank
    pub fn is_blank(&self) -> bool {
        self.line.is_empty()
    }

    /// The anomaly to report for a malformed line
    pub fn anomaly(&self) -> Option<ProtocolAnomaly> {
        self.malformed.map(|reason| ProtocolAnomaly::MalformedFrame {
            line: self.line.clone(),
            reason,
        })
    }
}

/// Classification result for one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Protocol signal
    Control(ControlFrame),
    /// Payload fragment
    Data(DataLine),
    /// Pass-through
    Noise(Noise),
}

/// Protocol irregularities that a session absorbs instead of failing on
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolAnomaly {
    /// A line that resembled protocol data but could not be parsed
    #[error("malformed frame ({reason}): {line:?}")]
    MalformedFrame {
        /// Offending line
        line: String,
        /// What was wrong with it
        reason: &'static str,
    },

    /// A recognized control code that does not fit the current state
    #[error("unexpected signal {code} from device {device_id}")]
    UnexpectedSignal {
        /// Reader id
        device_id: String,
        /// Code received
        code: ControlCode,
    },
}

fn noise(line: &str) -> Frame {
    Frame::Noise(Noise {
        line: line.to_string(),
        malformed: None,
    })
}

fn malformed(line: &str, reason: &'static str) -> Frame {
    Frame::Noise(Noise {
        line: line.to_string(),
        malformed: Some(reason),
    })
}

/// Classify one decoded line
pub fn classify(line: &str) -> Frame {
    let line = line.trim();
    if line.is_empty() || !line.contains(DELIMITER) {
        return noise(line);
    }

    let fields: Vec<&str> = line.split(DELIMITER).collect();

    if fields[0] == CONTROL_PREFIX {
        if fields.len() != 3 {
            return malformed(line, "control line needs exactly three fields");
        }
        return Frame::Control(ControlFrame {
            device_id: fields[1].to_string(),
            code: ControlCode::parse(fields[2].trim()),
        });
    }

    match fields[0] {
        "" => malformed(line, "empty key"),
        RECORD_COUNT_KEY => match fields[1].trim().parse::<u32>() {
            Ok(count) => Frame::Data(DataLine::RecordCount(count)),
            Err(_) => malformed(line, "record count is not a number"),
        },
        PAYLOAD_KEY => {
            if fields.len() < 3 {
                return malformed(line, "payload line is missing its value");
            }
            let key = fields[1].strip_prefix(KEY_MARKER).unwrap_or(fields[1]);
            if key.is_empty() {
                return malformed(line, "payload key is empty");
            }
            Frame::Data(DataLine::Payload {
                key: key.to_string(),
                value: fields[2].to_string(),
            })
        }
        key => Frame::Data(DataLine::Field {
            key: key.to_string(),
            value: fields[1].to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn control(device_id: &str, code: ControlCode) -> Frame {
        Frame::Control(ControlFrame {
            device_id: device_id.to_string(),
            code,
        })
    }

    #[test]
    fn test_control_frames() {
        assert_eq!(classify("nfc2py:1001:01"), control("1001", ControlCode::StartRead));
        assert_eq!(classify("nfc2py:1001:02"), control("1001", ControlCode::End));
        assert_eq!(classify("  nfc2py:1001:03\r"), control("1001", ControlCode::ReadyWrite));
        assert_eq!(
            classify("nfc2py:1001:07"),
            control("1001", ControlCode::Unknown("07".to_string()))
        );
    }

    #[test]
    fn test_control_prefix_with_wrong_field_count_is_malformed() {
        let Frame::Noise(noise) = classify("nfc2py:1001") else {
            panic!("expected noise");
        };
        assert!(noise.malformed.is_some());

        let Frame::Noise(noise) = classify("nfc2py:1001:01:extra") else {
            panic!("expected noise");
        };
        assert!(matches!(noise.anomaly(), Some(ProtocolAnomaly::MalformedFrame { .. })));
    }

    #[test]
    fn test_payload_line_strips_marker() {
        assert_eq!(
            classify("payload:#name:Allen:"),
            Frame::Data(DataLine::Payload {
                key: "name".to_string(),
                value: "Allen".to_string(),
            })
        );
        assert_eq!(
            classify("payload:uuid:a1b2c"),
            Frame::Data(DataLine::Payload {
                key: "uuid".to_string(),
                value: "a1b2c".to_string(),
            })
        );
    }

    #[test]
    fn test_payload_missing_value_is_malformed() {
        let Frame::Noise(noise) = classify("payload:bad") else {
            panic!("expected noise");
        };
        assert_eq!(noise.line, "payload:bad");
        assert_eq!(noise.malformed, Some("payload line is missing its value"));

        let Frame::Noise(noise) = classify("payload:#:value") else {
            panic!("expected noise");
        };
        assert!(noise.malformed.is_some());
    }

    #[test]
    fn test_record_count() {
        assert_eq!(classify("num_ndef_records:1"), Frame::Data(DataLine::RecordCount(1)));

        let Frame::Noise(noise) = classify("num_ndef_records:lots") else {
            panic!("expected noise");
        };
        assert!(noise.malformed.is_some());
    }

    #[test]
    fn test_generic_field_takes_second_segment() {
        let frame = classify("uid:0x04 0xBC 0xF9");
        let Frame::Data(line) = frame else {
            panic!("expected data");
        };
        assert_eq!(line.entry(), Some(("uid", "0x04 0xBC 0xF9")));
    }

    #[test]
    fn test_noise() {
        for line in ["", "   ", "garbage", "Found an ISO14443A card"] {
            let Frame::Noise(noise) = classify(line) else {
                panic!("expected noise for {line:?}");
            };
            assert!(noise.malformed.is_none());
        }
        let Frame::Noise(noise) = classify(":orphan") else {
            panic!("expected noise");
        };
        assert!(noise.malformed.is_some());
    }

    #[test]
    fn test_unexpected_signal_display() {
        let anomaly = ProtocolAnomaly::UnexpectedSignal {
            device_id: "1001".to_string(),
            code: ControlCode::Unknown("09".to_string()),
        };
        assert_eq!(anomaly.to_string(), "unexpected signal 09 from device 1001");
    }
}
