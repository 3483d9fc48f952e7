//! Reader wire protocol
//!
//! The reader multiplexes control signalling and NDEF payload data over one
//! text stream:
//! - Wire constants and the host-to-device encoders
//! - Line classification into control frames, data lines and noise

pub mod frame;
pub mod wire;

pub use frame::{classify, ControlCode, ControlFrame, DataLine, Frame, Noise, ProtocolAnomaly};
pub use wire::{encode_write_payload, Command};
