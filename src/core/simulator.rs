//! Scripted reader simulator
//!
//! A [`LineTransport`] that plays back a fixed list of device lines and
//! records everything the host writes. Lets the protocol engine run end to
//! end without hardware.

use crate::core::transport::{LineTransport, TransportError};
use std::collections::VecDeque;

/// What the simulated device does when its script runs out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScriptEnd {
    /// Report the port as disconnected
    #[default]
    Disconnect,
    /// Report an operator interrupt
    Interrupt,
}

/// In-memory reader that replays scripted lines
#[derive(Debug, Clone, Default)]
pub struct ScriptedDevice {
    lines: VecDeque<String>,
    sent: Vec<Vec<u8>>,
    lines_read: usize,
    on_end: ScriptEnd,
}

impl ScriptedDevice {
    /// Device that will emit `lines` in order
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Choose the failure reported once the script is exhausted
    #[must_use]
    pub fn on_end(mut self, on_end: ScriptEnd) -> Self {
        self.on_end = on_end;
        self
    }

    /// Append more lines, e.g. the response to a second operation
    pub fn push_lines<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lines.extend(lines.into_iter().map(Into::into));
    }

    /// Every write the host made, in order
    pub fn sent(&self) -> &[Vec<u8>] {
        &self.sent
    }

    /// Writes that exactly match `data`
    pub fn count_sent(&self, data: &[u8]) -> usize {
        self.sent.iter().filter(|s| s.as_slice() == data).count()
    }

    /// Lines the host has consumed
    pub fn lines_read(&self) -> usize {
        self.lines_read
    }

    /// Lines not yet consumed
    pub fn remaining(&self) -> usize {
        self.lines.len()
    }
}

impl LineTransport for ScriptedDevice {
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.sent.push(data.to_vec());
        Ok(())
    }

    fn read_line(&mut self) -> Result<String, TransportError> {
        match self.lines.pop_front() {
            Some(line) => {
                self.lines_read += 1;
                Ok(line)
            }
            None => match self.on_end {
                ScriptEnd::Disconnect => Err(TransportError::Disconnected),
                ScriptEnd::Interrupt => Err(TransportError::Interrupted),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replays_then_disconnects() {
        let mut device = ScriptedDevice::new(["a", "b"]);
        assert_eq!(device.read_line().unwrap(), "a");
        assert_eq!(device.read_line().unwrap(), "b");
        assert!(matches!(device.read_line(), Err(TransportError::Disconnected)));
        assert_eq!(device.lines_read(), 2);
    }

    #[test]
    fn test_records_writes() {
        let mut device = ScriptedDevice::new(Vec::<String>::new()).on_end(ScriptEnd::Interrupt);
        device.send(b":read:").unwrap();
        device.send(b":read:").unwrap();
        assert_eq!(device.count_sent(b":read:"), 2);
        assert!(matches!(device.read_line(), Err(TransportError::Interrupted)));
    }
}
