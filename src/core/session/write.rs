//! Write session: `AwaitingReady -> Done`
//!
//! The reader may announce `03` several times while it retries a write
//! internally. Every announcement gets the same payload again.

use super::{absorb_noise, absorb_unexpected, pass_through, SessionSettings};
use crate::core::protocol::{classify, encode_write_payload, ControlCode, Frame, ProtocolAnomaly};
use crate::core::record::Identifier;
use crate::core::transport::{LineTransport, TransportError};
use tracing::info;

/// Write session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteState {
    /// Waiting for `03` (transmit) or `02` (finished)
    AwaitingReady,
    /// Terminal
    Done,
}

/// What the caller must do after feeding a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStep {
    /// Keep reading
    Continue,
    /// Settle, then send the payload
    Transmit,
    /// The write is confirmed
    Done,
}

/// Result of a completed write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    /// What was written
    pub identifier: Identifier,
    /// How many times the payload went out
    pub transmissions: usize,
    /// Reader that confirmed the write
    pub device_id: Option<String>,
    /// Irregularities absorbed along the way
    pub anomalies: Vec<ProtocolAnomaly>,
}

/// Burns one identifier onto a tag
#[derive(Debug)]
pub struct WriteSession {
    state: WriteState,
    payload: Vec<u8>,
    settings: SessionSettings,
    outcome: WriteOutcome,
}

impl WriteSession {
    /// Session that will write `identifier`
    pub fn new(identifier: Identifier, settings: SessionSettings) -> Self {
        Self {
            state: WriteState::AwaitingReady,
            payload: encode_write_payload(&identifier),
            settings,
            outcome: WriteOutcome {
                identifier,
                transmissions: 0,
                device_id: None,
                anomalies: Vec::new(),
            },
        }
    }

    /// Current state
    pub fn state(&self) -> WriteState {
        self.state
    }

    /// Bytes sent on every ready signal
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Advance by one line. Lines after `Done` are ignored.
    pub fn feed(&mut self, line: &str) -> WriteStep {
        if self.state == WriteState::Done {
            return WriteStep::Done;
        }

        match classify(line) {
            Frame::Control(frame) => match frame.code {
                ControlCode::ReadyWrite => {
                    self.outcome.device_id = Some(frame.device_id);
                    return WriteStep::Transmit;
                }
                ControlCode::End => {
                    info!("DONE: You may remove the tag from the reader");
                    self.outcome.device_id = Some(frame.device_id);
                    self.state = WriteState::Done;
                    return WriteStep::Done;
                }
                _ => absorb_unexpected(frame, &mut self.outcome.anomalies),
            },
            Frame::Data(_) => pass_through(line),
            Frame::Noise(noise) => absorb_noise(&noise, &mut self.outcome.anomalies),
        }
        WriteStep::Continue
    }

    /// Drive the handshake over `transport` until the reader confirms.
    ///
    /// The write command must already have been sent.
    pub fn run<T: LineTransport + ?Sized>(
        mut self,
        transport: &mut T,
    ) -> Result<WriteOutcome, TransportError> {
        info!(identifier = %self.outcome.identifier, "Waiting for reader to accept a write");
        loop {
            let line = transport.read_line()?;
            match self.feed(&line) {
                WriteStep::Continue => {}
                WriteStep::Transmit => {
                    std::thread::sleep(self.settings.write_settle);
                    info!(identifier = %self.outcome.identifier, "Writing NDEF data");
                    transport.send(&self.payload)?;
                    self.outcome.transmissions += 1;
                }
                WriteStep::Done => return Ok(self.outcome),
            }
        }
    }
}
