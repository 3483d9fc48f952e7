//! # Callsheet Core Library
//!
//! Host side of an NFC reader/writer attached over a serial port, used to
//! tag physical props for a motion capture callsheet:
//! - Line-oriented reader protocol (`nfc2py:<device>:<code>` signals)
//! - Read and write sessions as explicit state machines
//! - Short tag identifiers joined to records in a pluggable store
//! - CLI exit codes for scripting
//!
//! ## Example
//!
//! ```rust,no_run
//! use callsheet_core::core::store::JsonFileStore;
//! use callsheet_core::core::transport::{Interrupt, LazyChannel, SerialConfig};
//! use callsheet_core::core::TagOperations;
//!
//! fn main() -> anyhow::Result<()> {
//!     let channel = LazyChannel::new(SerialConfig::new("/dev/ttyACM0", 9600), Interrupt::new());
//!     let mut ops = TagOperations::new(channel, JsonFileStore::open("callsheet.json"));
//!
//!     let record = ops.get_record_from_tag()?;
//!     println!("{} is on tag {}", record.name, record.nfc_tag_id);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod core;

// Re-exports for convenience
pub use crate::cli::{CliResult, ExitCodes};
pub use crate::config::AppConfig;
pub use crate::core::error::TagError;
pub use crate::core::record::{Identifier, NdefPayload, Record, RecordFields};
pub use crate::core::store::{JsonFileStore, MemoryStore, RecordStore};
pub use crate::core::transport::{Interrupt, LazyChannel, LineTransport, SerialConfig};
pub use crate::core::TagOperations;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
