//! Render module - UI components for visualization
//!
//! This module provides:
//! - Time-series chart widget for the reading history

mod chart;

pub use chart::{ChartSettings, LoadChart};
