//! Reading history owned by the UI thread
//!
//! The history is append-only: readings accumulate as the queue is
//! drained, and the only other mutation is an explicit clear. The chart
//! and CSV export both render from the full history.

use chrono::{Local, TimeZone};

use super::queue::{Reading, ReadingQueue};

/// Cumulative, ordered sequence of readings.
pub struct History {
    readings: Vec<Reading>,
}

impl History {
    pub fn new() -> Self {
        Self {
            readings: Vec::new(),
        }
    }

    /// Drain everything currently queued into the history.
    ///
    /// Returns the number of readings that arrived. Order is preserved:
    /// after N pushes and one drain the history has grown by exactly N,
    /// oldest first.
    pub fn drain_from(&mut self, queue: &ReadingQueue) -> usize {
        let drained = queue.drain();
        let count = drained.len();
        self.readings.extend(drained);
        count
    }

    pub fn push(&mut self, reading: Reading) {
        self.readings.push(reading);
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// The most recent reading, for the live value readout.
    pub fn latest(&self) -> Option<Reading> {
        self.readings.last().copied()
    }

    /// Discard all readings. The only non-append mutation.
    pub fn clear(&mut self) {
        self.readings.clear();
        log::debug!("Cleared reading history");
    }

    /// Render the full history as CSV with a `Time,<label>` header.
    pub fn to_csv(&self, label: &str) -> String {
        let mut out = String::with_capacity(32 + self.readings.len() * 32);
        out.push_str(&format!("Time,{}\n", label));
        for reading in &self.readings {
            out.push_str(&format!(
                "{},{}\n",
                format_timestamp(reading.timestamp),
                reading.value
            ));
        }
        out
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

/// Format an epoch timestamp as local wall-clock time with milliseconds.
pub fn format_timestamp(epoch_secs: f64) -> String {
    let millis = (epoch_secs * 1000.0).round() as i64;
    match Local.timestamp_millis_opt(millis).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
        None => format!("{:.3}", epoch_secs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_from_grows_by_exactly_n_in_order() {
        let queue = ReadingQueue::new();
        let mut history = History::new();

        for i in 0..5 {
            queue.push(Reading::new(i as f64, i as f64 * 10.0));
        }

        let count = history.drain_from(&queue);
        assert_eq!(count, 5);
        assert_eq!(history.len(), 5);
        let values: Vec<f64> = history.readings().iter().map(|r| r.value).collect();
        assert_eq!(values, vec![0.0, 10.0, 20.0, 30.0, 40.0]);
    }

    #[test]
    fn test_drain_from_empty_queue_leaves_history_unchanged() {
        let queue = ReadingQueue::new();
        let mut history = History::new();
        history.push(Reading::new(1.0, 1.0));

        assert_eq!(history.drain_from(&queue), 0);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_clear_then_empty_drain_yields_empty_history() {
        let queue = ReadingQueue::new();
        let mut history = History::new();
        queue.push(Reading::new(1.0, 1.0));
        history.drain_from(&queue);

        history.clear();
        history.drain_from(&queue);
        assert!(history.is_empty());
        assert_eq!(history.latest(), None);
    }

    #[test]
    fn test_to_csv_has_header_and_one_row_per_reading() {
        let mut history = History::new();
        history.push(Reading::new(0.0, 12.0));
        history.push(Reading::new(1.0, 12.05));

        let csv = history.to_csv("Load");
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Time,Load");
        assert!(lines[1].ends_with(",12"));
        assert!(lines[2].ends_with(",12.05"));
    }
}
