//! Serial module - load-cell device I/O
//!
//! This module provides:
//! - Wire protocol constants and reading-line parser
//! - Connection setup and port management
//! - Background reader thread feeding the transfer queue

mod connection;
mod protocol;
mod reader;

// Re-export public types
pub use connection::{ConnectionError, PortEntry, SerialController, BAUD_RATES, DEFAULT_BAUD};
pub use protocol::{parse_reading, ParseError, SCALE_DIVISOR};
pub use reader::ReaderHandle;
