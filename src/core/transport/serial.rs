//! Serial port transport implementation

use super::{Interrupt, LineTransport, TransportError, TransportStats};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Serial port configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Port name (e.g., COM3, /dev/ttyACM0)
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Delay after opening before the reader answers reliably (ms)
    pub warmup_ms: u64,
    /// Read timeout used to poll for interrupts (ms)
    pub poll_interval_ms: u64,
}

impl SerialConfig {
    /// Create a new serial configuration with default timings
    pub fn new(port: &str, baud_rate: u32) -> Self {
        Self {
            port: port.to_string(),
            baud_rate,
            ..Self::default()
        }
    }

    /// Set the warm-up delay
    #[must_use]
    pub fn warmup(mut self, delay: Duration) -> Self {
        self.warmup_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the interrupt poll interval
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_port().to_string(),
            baud_rate: 9600,
            warmup_ms: 2000,
            poll_interval_ms: 100,
        }
    }
}

#[cfg(windows)]
fn default_port() -> &'static str {
    "COM3"
}

#[cfg(not(windows))]
fn default_port() -> &'static str {
    "/dev/ttyACM0"
}

struct ChannelInner {
    port: Option<Box<dyn SerialPort>>,
    pending: Vec<u8>,
    stats: TransportStats,
}

/// One open connection to the reader.
///
/// Reads and writes go through an internal lock, so a channel can be shared
/// behind an [`Arc`]; callers are still expected to run one session at a
/// time.
pub struct SerialChannel {
    config: SerialConfig,
    inner: Mutex<ChannelInner>,
    interrupt: Interrupt,
    closed: AtomicBool,
}

impl SerialChannel {
    /// Open the port and wait out the reader's warm-up delay
    pub fn open(config: SerialConfig, interrupt: Interrupt) -> Result<Self, TransportError> {
        info!(port = %config.port, baud = config.baud_rate, "Starting serial connection");

        let port = serialport::new(&config.port, config.baud_rate)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(config.poll_interval_ms.max(1)))
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => TransportError::PortNotFound(config.port.clone()),
                serialport::ErrorKind::Io(
                    std::io::ErrorKind::PermissionDenied
                    | std::io::ErrorKind::AddrInUse
                    | std::io::ErrorKind::WouldBlock,
                ) => TransportError::PortBusy(config.port.clone()),
                serialport::ErrorKind::Io(std::io::ErrorKind::NotFound) => {
                    TransportError::PortNotFound(config.port.clone())
                }
                _ => TransportError::OpenFailed {
                    port: config.port.clone(),
                    source: e,
                },
            })?;

        // The reader resets on open and ignores input until it has booted.
        std::thread::sleep(Duration::from_millis(config.warmup_ms));

        Ok(Self {
            config,
            inner: Mutex::new(ChannelInner {
                port: Some(port),
                pending: Vec::with_capacity(256),
                stats: TransportStats::default(),
            }),
            interrupt,
            closed: AtomicBool::new(false),
        })
    }

    /// Port configuration this channel was opened with
    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    /// Get statistics
    pub fn stats(&self) -> TransportStats {
        self.inner.lock().stats.clone()
    }

    /// Whether the channel has been closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Write raw bytes and flush
    pub fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();
        let port = inner.port.as_mut().ok_or(TransportError::Closed)?;

        port.write_all(data)?;
        port.flush()?;
        debug!(data = %String::from_utf8_lossy(data), "TX");

        inner.stats.bytes_sent += data.len() as u64;
        inner.stats.writes += 1;
        Ok(())
    }

    /// Block until a full `\n`-terminated line is available
    pub fn read_line(&self) -> Result<String, TransportError> {
        let mut inner = self.inner.lock();
        let mut buf = [0u8; 256];

        loop {
            if let Some(line) = take_line(&mut inner.pending) {
                inner.stats.lines_received += 1;
                debug!(line = %line, "RX");
                return Ok(line);
            }

            if self.interrupt.is_triggered() {
                return Err(TransportError::Interrupted);
            }

            let port = inner.port.as_mut().ok_or(TransportError::Closed)?;
            match port.read(&mut buf) {
                Ok(0) => return Err(TransportError::Disconnected),
                Ok(n) => {
                    inner.pending.extend_from_slice(&buf[..n]);
                    inner.stats.bytes_received += n as u64;
                }
                // Poll tick: no data yet, keep waiting.
                Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => {}
                Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => return Err(TransportError::Io(e)),
            }
        }
    }

    /// Close the port. Only the first call has any effect.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(port = %self.config.port, "Closing serial connection");
        let mut inner = self.inner.lock();
        inner.port = None;
        inner.pending.clear();
    }
}

impl Drop for SerialChannel {
    fn drop(&mut self) {
        self.close();
    }
}

/// Split the first complete line off `pending`, dropping its terminator.
fn take_line(pending: &mut Vec<u8>) -> Option<String> {
    let end = pending.iter().position(|&b| b == b'\n')?;
    let mut raw: Vec<u8> = pending.drain(..=end).collect();
    raw.pop();
    if raw.last() == Some(&b'\r') {
        raw.pop();
    }
    Some(String::from_utf8_lossy(&raw).into_owned())
}

/// Cheap, cloneable handle to the process-wide channel
#[derive(Clone)]
pub struct ChannelHandle(Arc<SerialChannel>);

impl ChannelHandle {
    /// Access the underlying channel
    pub fn channel(&self) -> &SerialChannel {
        &self.0
    }
}

impl LineTransport for ChannelHandle {
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.0.send(data)
    }

    fn read_line(&mut self) -> Result<String, TransportError> {
        self.0.read_line()
    }
}

/// Transport that acquires the process-wide channel on first use.
///
/// Operations that never talk to the reader never open the port.
pub struct LazyChannel {
    config: SerialConfig,
    interrupt: Interrupt,
    handle: Option<ChannelHandle>,
}

impl LazyChannel {
    /// Defer opening `config.port` until the first read or write
    pub fn new(config: SerialConfig, interrupt: Interrupt) -> Self {
        Self {
            config,
            interrupt,
            handle: None,
        }
    }

    /// Whether the port has been opened through this transport
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    fn handle(&mut self) -> Result<&mut ChannelHandle, TransportError> {
        if self.handle.is_none() {
            self.handle = Some(acquire(&self.config, &self.interrupt)?);
        }
        self.handle.as_mut().ok_or(TransportError::Closed)
    }
}

impl LineTransport for LazyChannel {
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.handle()?.send(data)
    }

    fn read_line(&mut self) -> Result<String, TransportError> {
        self.handle()?.read_line()
    }
}

static SHARED_CHANNEL: Mutex<Option<ChannelHandle>> = parking_lot::const_mutex(None);

/// Get the process-wide channel, opening it on first use.
///
/// Later calls return the same connection regardless of their arguments.
/// A failed open leaves the slot empty, so the operator can reconnect the
/// reader and call again.
pub fn acquire(config: &SerialConfig, interrupt: &Interrupt) -> Result<ChannelHandle, TransportError> {
    let mut slot = SHARED_CHANNEL.lock();
    if let Some(handle) = slot.as_ref() {
        if !handle.0.is_closed() {
            return Ok(handle.clone());
        }
    }

    let channel = SerialChannel::open(config.clone(), interrupt.clone())?;
    let handle = ChannelHandle(Arc::new(channel));
    *slot = Some(handle.clone());
    Ok(handle)
}

/// Close and forget the process-wide channel, if one was opened
pub fn shutdown() {
    if let Some(handle) = SHARED_CHANNEL.lock().take() {
        handle.0.close();
    }
}

/// List available serial ports
pub fn list_ports() -> Result<Vec<serialport::SerialPortInfo>, TransportError> {
    serialport::available_ports().map_err(|e| TransportError::Io(e.into()))
}
