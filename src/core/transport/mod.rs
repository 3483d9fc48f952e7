//! Transport layer between the host and the NFC reader/writer
//!
//! The reader speaks a line-oriented text protocol over a serial port.
//! Sessions only ever see the [`LineTransport`] trait, so the same protocol
//! logic runs against real hardware ([`SerialChannel`]) or a scripted
//! in-memory device in tests.

mod serial;

pub use serial::{
    acquire, list_ports, shutdown, ChannelHandle, LazyChannel, SerialChannel, SerialConfig,
};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Transport error types
#[derive(Error, Debug)]
pub enum TransportError {
    /// Port not found
    #[error("Port not found: {0}. Is the NFC reader plugged in?")]
    PortNotFound(String),

    /// Port held by another process or not accessible
    #[error("Port busy or permission denied: {0}. Is it being used by another program?")]
    PortBusy(String),

    /// Opening the port failed for another reason
    #[error("Failed to open {port}: {source}")]
    OpenFailed {
        /// Port name
        port: String,
        /// Underlying serial error
        #[source]
        source: serialport::Error,
    },

    /// I/O error on an open port
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The device closed the stream
    #[error("Disconnected")]
    Disconnected,

    /// The channel was already closed
    #[error("Channel closed")]
    Closed,

    /// A blocked read was interrupted by the operator
    #[error("Interrupted")]
    Interrupted,
}

/// Transport statistics
#[derive(Debug, Clone, Default)]
pub struct TransportStats {
    /// Bytes sent
    pub bytes_sent: u64,
    /// Bytes received
    pub bytes_received: u64,
    /// Writes issued
    pub writes: u64,
    /// Complete lines received
    pub lines_received: u64,
}

/// A byte-stream peer that can be read one text line at a time.
///
/// `read_line` blocks until a full line is available; it applies no timeout
/// of its own. The returned line has its terminator removed.
pub trait LineTransport {
    /// Write raw bytes to the device, as-is (no terminator is appended)
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Block until the next complete line arrives
    fn read_line(&mut self) -> Result<String, TransportError>;
}

impl<T: LineTransport + ?Sized> LineTransport for &mut T {
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        (**self).send(data)
    }

    fn read_line(&mut self) -> Result<String, TransportError> {
        (**self).read_line()
    }
}

/// Coarse, process-wide cancellation for blocking reads.
///
/// Cloning shares the flag. A signal handler calls [`Interrupt::trigger`];
/// any blocked [`SerialChannel::read_line`] observes it within one poll
/// interval and returns [`TransportError::Interrupted`].
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    /// Create an untriggered handle
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that blocked reads give up
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether an interrupt has been requested
    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
