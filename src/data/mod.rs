//! Data module - readings, queueing and recording
//!
//! This module provides:
//! - The transfer queue between reader thread and UI thread
//! - The UI-owned reading history used for plotting and export
//! - Session log files written as readings arrive

mod history;
mod queue;
mod session;

// Re-export public types
pub use history::History;
pub use queue::{Reading, ReadingQueue};
pub use session::SessionLog;
