//! Core module containing the tag engine
//!
//! This module provides:
//! - Transport layer to the serial NFC reader
//! - Wire protocol classification
//! - Read and write session state machines
//! - Records, identifiers and record stores
//! - The [`TagOperations`] facade tying them together
//! - A scripted device for exercising sessions without hardware

pub mod error;
pub mod operations;
pub mod protocol;
pub mod record;
pub mod session;
pub mod simulator;
pub mod store;
pub mod transport;

pub use operations::TagOperations;
