//! Transfer queue for sharing readings between threads
//!
//! This module provides a thread-safe FIFO queue for passing readings
//! from the serial reader thread to the UI thread. One producer, one
//! consumer, no capacity limit: load cells report at a few dozen hertz
//! at most, so the consumer always keeps up.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

/// A single timestamped sensor value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reading {
    /// Seconds since the Unix epoch, taken when the line was parsed.
    pub timestamp: f64,
    /// Load value in display units (device reports milli-units).
    pub value: f64,
}

impl Reading {
    pub fn new(timestamp: f64, value: f64) -> Self {
        Self { timestamp, value }
    }

    /// A reading stamped with the current wall-clock time.
    pub fn now(value: f64) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        Self { timestamp, value }
    }
}

/// Thread-safe FIFO queue of readings
///
/// Designed for the producer-consumer pattern:
/// - Producer (reader thread): calls `push()` as lines are parsed
/// - Consumer (UI thread): calls `drain()` on each poll tick
///
/// ## Example
///
/// ```
/// let queue = ReadingQueue::new();
///
/// // In reader thread:
/// queue.push(Reading::now(12.0));
///
/// // In UI thread:
/// let readings = queue.drain();
/// ```
pub struct ReadingQueue {
    /// Arc = shared ownership across threads
    /// Mutex = exclusive access (held only long enough to push or swap out)
    inner: Arc<Mutex<VecDeque<Reading>>>,
}

impl ReadingQueue {
    /// Create a new, empty queue.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Push a single reading onto the back of the queue.
    ///
    /// Called from the reader thread. The lock is only ever held for a
    /// push or a drain, so this never blocks for long and never drops data.
    pub fn push(&self, reading: Reading) {
        if let Ok(mut queue) = self.inner.lock() {
            queue.push_back(reading);
        }
    }

    /// Remove and return everything currently queued, oldest first.
    ///
    /// Called from the UI thread on each poll tick. Non-blocking in the
    /// sense of the polling loop: it never waits for new readings, it only
    /// takes what is already there. Returns an empty vector if the queue
    /// is empty.
    pub fn drain(&self) -> Vec<Reading> {
        match self.inner.lock() {
            Ok(mut queue) => queue.drain(..).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Number of readings currently waiting.
    pub fn len(&self) -> usize {
        self.inner.lock().map(|q| q.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clone the Arc to share with the reader thread.
    pub fn clone_ref(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for ReadingQueue {
    fn default() -> Self {
        Self::new()
    }
}

// Implement Clone manually to use Arc::clone
impl Clone for ReadingQueue {
    fn clone(&self) -> Self {
        self.clone_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_drain_preserves_order() {
        let queue = ReadingQueue::new();

        queue.push(Reading::new(1.0, 10.0));
        queue.push(Reading::new(2.0, 20.0));
        queue.push(Reading::new(3.0, 30.0));

        let readings = queue.drain();
        assert_eq!(readings.len(), 3);
        assert_eq!(readings[0].value, 10.0);
        assert_eq!(readings[1].value, 20.0);
        assert_eq!(readings[2].value, 30.0);
    }

    #[test]
    fn test_drain_empties_the_queue() {
        let queue = ReadingQueue::new();
        queue.push(Reading::new(1.0, 1.0));

        assert_eq!(queue.drain().len(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_drain_on_empty_is_a_noop() {
        let queue = ReadingQueue::new();
        assert!(queue.drain().is_empty());
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_clone_ref_shares_storage() {
        let queue = ReadingQueue::new();
        let producer = queue.clone_ref();

        producer.push(Reading::new(1.0, 5.0));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.drain()[0].value, 5.0);
    }
}
