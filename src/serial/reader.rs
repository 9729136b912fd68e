//! Background reader thread
//!
//! Continuously reads lines from the open serial connection, parses each
//! into a reading, and pushes it onto the transfer queue. The connection
//! handle is moved into the thread when it starts; nothing else touches
//! the port until the thread is stopped and joined.

use std::io::{BufRead, BufReader, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serialport::SerialPort;

use crate::data::{Reading, ReadingQueue};

use super::protocol::parse_reading;

/// Idle delay between read attempts, to avoid busy-spinning when the
/// device is quiet.
const IDLE_DELAY: Duration = Duration::from_millis(1);

/// Handle to a running reader thread.
///
/// Stopping is cooperative: `stop()` clears the run flag and joins the
/// thread, so by the time it returns the serial port has been dropped
/// and is free to reopen. Dropping the handle does the same.
pub struct ReaderHandle {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ReaderHandle {
    /// Move an open port into a new reader thread feeding `queue`.
    pub fn spawn(port: Box<dyn SerialPort>, queue: ReadingQueue) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let thread = thread::Builder::new()
            .name("loadcell-reader".to_string())
            .spawn(move || {
                read_loop(port, &queue, &flag);
                log::debug!("Reader thread finished");
            })
            .expect("failed to spawn reader thread");

        Self {
            running,
            thread: Some(thread),
        }
    }

    /// Whether the reader thread is still alive. The thread exits on its
    /// own if the serial stream hits a fatal I/O error.
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }

    /// Signal the loop to stop and wait for the thread to exit.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::warn!("Reader thread panicked");
            }
        }
    }
}

impl Drop for ReaderHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The reader loop body, generic over the byte source so it can be
/// exercised with in-memory data.
///
/// Error policy, matching the device's behavior in practice:
/// - Unparseable line: dropped, loop continues
/// - Read timeout / interrupt: treated as a quiet period, loop continues
/// - EOF or any other I/O error: loop terminates, no reconnect
fn read_loop<R: Read>(port: R, queue: &ReadingQueue, running: &AtomicBool) {
    let mut reader = BufReader::new(port);
    let mut buf = Vec::with_capacity(64);

    while running.load(Ordering::Relaxed) {
        thread::sleep(IDLE_DELAY);

        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => {
                log::debug!("Serial stream ended");
                break;
            }
            Ok(_) => match parse_reading(&buf) {
                Ok(value) => queue.push(Reading::now(value)),
                Err(_) => {
                    // Malformed or partial line: silently discarded.
                }
            },
            Err(e)
                if e.kind() == std::io::ErrorKind::TimedOut
                    || e.kind() == std::io::ErrorKind::Interrupted =>
            {
                continue;
            }
            Err(e) => {
                log::debug!("Error within reader thread: {}", e);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_end_to_end_parses_good_lines_and_drops_garbage() {
        let queue = ReadingQueue::new();
        let running = AtomicBool::new(true);
        let input = Cursor::new(b"A12000\r\nA12050\r\nXgarbage\r\n".to_vec());

        read_loop(input, &queue, &running);

        let readings = queue.drain();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].value, 12.0);
        assert_eq!(readings[1].value, 12.05);
    }

    #[test]
    fn test_malformed_lines_leave_queue_unchanged() {
        let queue = ReadingQueue::new();
        let running = AtomicBool::new(true);
        let input = Cursor::new(b"Xgarbage\r\n\r\n".to_vec());

        read_loop(input, &queue, &running);

        assert!(queue.is_empty());
    }

    #[test]
    fn test_cleared_flag_stops_before_reading() {
        let queue = ReadingQueue::new();
        let running = AtomicBool::new(false);
        let input = Cursor::new(b"A12000\r\n".to_vec());

        read_loop(input, &queue, &running);

        assert!(queue.is_empty());
    }

    #[test]
    fn test_timestamps_are_monotonic_non_decreasing() {
        let queue = ReadingQueue::new();
        let running = AtomicBool::new(true);
        let input = Cursor::new(b"A100\r\nA200\r\nA300\r\n".to_vec());

        read_loop(input, &queue, &running);

        let readings = queue.drain();
        assert_eq!(readings.len(), 3);
        for pair in readings.windows(2) {
            assert!(pair[1].timestamp >= pair[0].timestamp);
        }
    }
}
