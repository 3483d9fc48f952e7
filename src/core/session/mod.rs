//! Read and write sessions
//!
//! A session is one bounded interaction with the reader, from the trigger
//! command to the terminal `02` signal. Each is an explicit state machine:
//! `feed` advances it by one line without any I/O, and `run` pulls lines
//! from a [`LineTransport`](crate::core::transport::LineTransport) until the
//! machine reaches `Done`.
//!
//! Noise, malformed lines and out-of-sequence signals are logged and kept
//! in the outcome's `anomalies`; they never end a session. Only a transport
//! failure does.

mod read;
mod write;

pub use read::{ReadOutcome, ReadSession, ReadState};
pub use write::{WriteOutcome, WriteSession, WriteState, WriteStep};

use crate::core::protocol::{ControlFrame, Noise, ProtocolAnomaly};
use std::time::Duration;
use tracing::{info, warn};

/// Timing knobs for sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Pause between a ready signal and the payload write, so the reader's
    /// receive buffer is not overrun
    pub write_settle: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            write_settle: Duration::from_millis(100),
        }
    }
}

fn absorb_noise(noise: &Noise, anomalies: &mut Vec<ProtocolAnomaly>) {
    if let Some(anomaly) = noise.anomaly() {
        warn!("{anomaly}; skipping");
        anomalies.push(anomaly);
    } else if !noise.is_blank() {
        // Chatter not meant for us is still worth seeing.
        info!(target: "callsheet::device", "{}", noise.line);
    }
}

fn absorb_unexpected(frame: ControlFrame, anomalies: &mut Vec<ProtocolAnomaly>) {
    let anomaly = ProtocolAnomaly::UnexpectedSignal {
        device_id: frame.device_id,
        code: frame.code,
    };
    warn!("{anomaly}");
    anomalies.push(anomaly);
}

fn pass_through(line: &str) {
    info!(target: "callsheet::device", "{}", line.trim());
}
