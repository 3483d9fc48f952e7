//! Read session: `AwaitingStart -> Collecting -> Done`

use super::{absorb_noise, absorb_unexpected, pass_through};
use crate::core::protocol::{classify, ControlCode, DataLine, Frame, ProtocolAnomaly};
use crate::core::record::NdefPayload;
use crate::core::transport::{LineTransport, TransportError};
use tracing::{debug, info};

/// Read session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    /// Waiting for `01`
    AwaitingStart,
    /// Accumulating payload lines until `02`
    Collecting,
    /// Terminal
    Done,
}

/// Result of a completed read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOutcome {
    /// Everything the tag carried
    pub payload: NdefPayload,
    /// Reader that reported the tag
    pub device_id: Option<String>,
    /// `num_ndef_records` as announced by the reader. Advisory; never
    /// checked against the payload.
    pub advertised_records: Option<u32>,
    /// Irregularities absorbed along the way
    pub anomalies: Vec<ProtocolAnomaly>,
}

/// Collects one tag's payload
#[derive(Debug)]
pub struct ReadSession {
    state: ReadState,
    outcome: ReadOutcome,
}

impl Default for ReadSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadSession {
    /// Fresh session, waiting for the start signal
    pub fn new() -> Self {
        Self {
            state: ReadState::AwaitingStart,
            outcome: ReadOutcome::default(),
        }
    }

    /// Current state
    pub fn state(&self) -> ReadState {
        self.state
    }

    /// Payload accumulated so far
    pub fn payload(&self) -> &NdefPayload {
        &self.outcome.payload
    }

    /// Advance by one line. Lines after `Done` are ignored.
    pub fn feed(&mut self, line: &str) -> ReadState {
        match (self.state, classify(line)) {
            (ReadState::Done, _) => {}

            (ReadState::AwaitingStart, Frame::Control(frame)) => {
                if frame.code == ControlCode::StartRead {
                    info!(device = %frame.device_id, "Receiving NDEF data");
                    self.outcome.device_id = Some(frame.device_id);
                    self.state = ReadState::Collecting;
                } else {
                    absorb_unexpected(frame, &mut self.outcome.anomalies);
                }
            }
            (ReadState::AwaitingStart, Frame::Data(_)) => pass_through(line),

            (ReadState::Collecting, Frame::Control(frame)) => {
                if frame.code == ControlCode::End {
                    info!(
                        keys = self.outcome.payload.len(),
                        "Done receiving NDEF data"
                    );
                    if let Some(advertised) = self.outcome.advertised_records {
                        debug!(advertised, received = self.outcome.payload.len(), "Record count");
                    }
                    self.state = ReadState::Done;
                } else {
                    absorb_unexpected(frame, &mut self.outcome.anomalies);
                }
            }
            (ReadState::Collecting, Frame::Data(DataLine::RecordCount(count))) => {
                self.outcome.advertised_records = Some(count);
            }
            (ReadState::Collecting, Frame::Data(data)) => {
                if let Some((key, value)) = data.entry() {
                    if let Some(previous) = self.outcome.payload.insert(key, value) {
                        debug!(key, previous = %previous, "Overwriting repeated key");
                    }
                }
            }

            (_, Frame::Noise(noise)) => absorb_noise(&noise, &mut self.outcome.anomalies),
        }
        self.state
    }

    /// Pull lines from `transport` until the end signal.
    ///
    /// Blocks for as long as the reader stays silent. The read command must
    /// already have been sent.
    pub fn run<T: LineTransport + ?Sized>(
        mut self,
        transport: &mut T,
    ) -> Result<ReadOutcome, TransportError> {
        info!("Listening for NDEF data");
        while self.state != ReadState::Done {
            let line = transport.read_line()?;
            self.feed(&line);
        }
        Ok(self.outcome)
    }
}
