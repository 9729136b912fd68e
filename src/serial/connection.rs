//! Connection setup and port management
//!
//! Discovers serial ports, runs the device configuration handshake, and
//! owns the reader thread for the active connection. The UI talks to the
//! [`SerialController`]; the port handle itself is moved into the reader
//! thread the moment the connection is declared good.

use std::io::{Read, Write};
use std::thread;
use std::time::Duration;

use serialport::SerialPortType;
use thiserror::Error;

use crate::data::ReadingQueue;
use crate::settings::PortMemory;

use super::protocol::{CMD_HALT_OUTPUT, CMD_SINGLE_SAMPLE, CMD_TERMINATOR, SETUP_SEQUENCE};
use super::reader::ReaderHandle;

/// Baud rates offered in the UI.
pub const BAUD_RATES: &[u32] = &[
    1200, 2400, 4800, 9600, 19200, 38400, 57600, 115200, 230400,
];

/// Loadstar sensors ship configured for 4800 baud.
pub const DEFAULT_BAUD: u32 = 4800;

/// Read timeout for the handshake and the reader thread. Long enough for
/// the slowest streaming rate, short enough that disconnect joins quickly.
const PORT_TIMEOUT: Duration = Duration::from_secs(2);

/// Pause between halting output and probing, to let the device settle.
const SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Why a connection attempt failed.
///
/// All of these are recoverable in the sense that the user can pick
/// another port and try again; none of them trigger an automatic retry.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("failed to open port: {0}")]
    Open(#[from] serialport::Error),

    #[error("no response from device")]
    NoResponse,

    #[error("I/O error during device setup: {0}")]
    Io(#[from] std::io::Error),
}

/// A discovered serial port.
#[derive(Clone, Debug)]
pub struct PortEntry {
    /// OS device name, e.g. `/dev/ttyUSB0` or `COM3`.
    pub name: String,
    /// Display label: name plus USB product string when available.
    pub label: String,
}

/// Serial connection controller
pub struct SerialController {
    /// Available ports (refreshed on scan)
    pub ports: Vec<PortEntry>,

    /// Currently selected port index (for UI combo box)
    pub selected_port: usize,

    /// Currently selected baud rate
    pub baud: u32,

    /// Status message
    pub status: String,

    /// Whether currently connected
    pub is_connected: bool,

    /// Active reader thread (None if disconnected)
    reader: Option<ReaderHandle>,
}

impl SerialController {
    pub fn new() -> Self {
        let mut controller = Self {
            ports: Vec::new(),
            selected_port: 0,
            baud: DEFAULT_BAUD,
            status: "Disconnected".to_string(),
            is_connected: false,
            reader: None,
        };
        controller.scan_ports();
        controller
    }

    /// Scan for available serial ports.
    pub fn scan_ports(&mut self) {
        self.ports.clear();
        match serialport::available_ports() {
            Ok(ports) => {
                for info in ports {
                    let label = match &info.port_type {
                        SerialPortType::UsbPort(usb) => match &usb.product {
                            Some(product) => format!("{} - {}", info.port_name, product),
                            None => info.port_name.clone(),
                        },
                        _ => info.port_name.clone(),
                    };
                    self.ports.push(PortEntry {
                        name: info.port_name,
                        label,
                    });
                }
                if self.ports.is_empty() {
                    self.status = "No serial ports found".to_string();
                }
            }
            Err(e) => {
                self.status = format!("Port scan error: {}", e);
            }
        }
        self.selected_port = self.selected_port.min(self.ports.len().saturating_sub(1));
    }

    /// Name of the currently selected port, if any.
    pub fn selected_port_name(&self) -> Option<&str> {
        self.ports.get(self.selected_port).map(|p| p.name.as_str())
    }

    /// Connect to the currently selected port.
    pub fn connect(&mut self, queue: ReadingQueue) {
        if self.is_connected {
            return;
        }
        let Some(name) = self.selected_port_name().map(String::from) else {
            self.status = "No port selected".to_string();
            return;
        };
        self.connect_to(&name, self.baud, queue);
    }

    /// Attempt the (port, baud) pair remembered from the last successful
    /// connection. Returns false if nothing is remembered or the device
    /// does not answer; the caller falls back to manual selection.
    pub fn try_remembered(&mut self, queue: ReadingQueue) -> bool {
        let Some(memory) = PortMemory::load() else {
            log::debug!("No remembered port settings");
            return false;
        };
        log::info!("Trying remembered device {} @ {}", memory.port, memory.baud);

        self.connect_to(&memory.port, memory.baud, queue);
        if self.is_connected {
            // Point the UI selection at the remembered port if we can see it.
            if let Some(idx) = self.ports.iter().position(|p| p.name == memory.port) {
                self.selected_port = idx;
            }
            self.baud = memory.baud;
        }
        self.is_connected
    }

    fn connect_to(&mut self, name: &str, baud: u32, queue: ReadingQueue) {
        log::debug!("Trying to connect to {} @ {}", name, baud);

        let result = serialport::new(name, baud)
            .timeout(PORT_TIMEOUT)
            .open()
            .map_err(ConnectionError::from)
            .and_then(|mut port| handshake(&mut port).map(|probe| (port, probe)));

        match result {
            Ok((port, probe)) => {
                log::info!("Connected to {} on {} @ {}", probe, name, baud);
                PortMemory {
                    port: name.to_string(),
                    baud,
                }
                .save();

                self.reader = Some(ReaderHandle::spawn(port, queue));
                self.is_connected = true;
                self.status = format!("Connected on {}", name);
            }
            Err(e) => {
                log::warn!("Connection to {} failed: {}", name, e);
                self.status = match &e {
                    ConnectionError::Open(err)
                        if matches!(err.kind, serialport::ErrorKind::NoDevice) =>
                    {
                        format!("{} is busy or unplugged", name)
                    }
                    ConnectionError::Open(err) => format!("Could not open {}: {}", name, err),
                    ConnectionError::NoResponse => format!("No load cell found on {}", name),
                    other => format!("Setup failed on {}: {}", name, other),
                };
                self.is_connected = false;
            }
        }
    }

    /// Whether the reader thread is still alive. False after a fatal
    /// stream error, even while `is_connected` still says connected.
    pub fn reader_alive(&self) -> bool {
        self.reader.as_ref().map(|r| r.is_running()).unwrap_or(false)
    }

    /// Stop the reader thread and release the port.
    pub fn disconnect(&mut self) {
        if let Some(mut reader) = self.reader.take() {
            reader.stop();
        }
        self.is_connected = false;
        self.status = "Disconnected".to_string();
        log::info!("Serial disconnected");
    }

    /// Toggle connection state.
    pub fn toggle(&mut self, queue: ReadingQueue) {
        if self.is_connected {
            self.disconnect();
        } else {
            self.connect(queue);
        }
    }
}

impl Default for SerialController {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the device configuration handshake on an open port.
///
/// Halts any running output, probes with a single-sample request, and on
/// a non-empty answer configures continuous streaming. Returns the probe
/// response (the device's sign-on sentence). Generic over the transport
/// so it can be tested against a scripted in-memory port.
pub fn handshake<P: Read + Write>(port: &mut P) -> Result<String, ConnectionError> {
    send_command(port, CMD_HALT_OUTPUT)?;
    let _ = read_response(port)?;
    thread::sleep(SETTLE_DELAY);

    send_command(port, CMD_SINGLE_SAMPLE)?;
    let probe = read_response(port)?;
    if probe.trim().is_empty() {
        return Err(ConnectionError::NoResponse);
    }

    for (i, cmd) in SETUP_SEQUENCE.iter().enumerate() {
        send_command(port, cmd)?;
        // The final command starts continuous output; everything the
        // device sends from here on belongs to the reader thread.
        if i + 1 < SETUP_SEQUENCE.len() {
            let _ = read_response(port)?;
        }
    }

    Ok(probe)
}

fn send_command<W: Write>(port: &mut W, cmd: &str) -> std::io::Result<()> {
    port.write_all(cmd.as_bytes())?;
    port.write_all(CMD_TERMINATOR.as_bytes())?;
    port.flush()
}

/// Read one response line, byte by byte, until LF, EOF or timeout.
/// A timeout mid-line returns whatever arrived so far; the caller decides
/// whether an empty answer is fatal.
fn read_response<R: Read>(port: &mut R) -> std::io::Result<String> {
    let mut line = Vec::with_capacity(64);
    let mut byte = [0u8; 1];
    loop {
        match port.read(&mut byte) {
            Ok(0) => break,
            Ok(_) => {
                if byte[0] == b'\n' {
                    break;
                }
                line.push(byte[0]);
                if line.len() > 256 {
                    break;
                }
            }
            Err(e)
                if e.kind() == std::io::ErrorKind::TimedOut
                    || e.kind() == std::io::ErrorKind::Interrupted =>
            {
                break;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(String::from_utf8_lossy(&line).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;

    /// Scripted port: every command written pops the next canned response.
    struct ScriptedPort {
        written: Vec<u8>,
        responses: VecDeque<&'static [u8]>,
        pending: Vec<u8>,
    }

    impl ScriptedPort {
        fn new(responses: &[&'static [u8]]) -> Self {
            Self {
                written: Vec::new(),
                responses: responses.iter().copied().collect(),
                pending: Vec::new(),
            }
        }

        fn commands(&self) -> Vec<String> {
            String::from_utf8_lossy(&self.written)
                .split('\r')
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        }
    }

    impl Read for ScriptedPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.pending.is_empty() {
                match self.responses.pop_front() {
                    Some(r) => self.pending = r.to_vec(),
                    None => {
                        return Err(io::Error::new(io::ErrorKind::TimedOut, "no more data"))
                    }
                }
            }
            let n = buf.len().min(self.pending.len());
            buf[..n].copy_from_slice(&self.pending[..n]);
            self.pending.drain(..n);
            Ok(n)
        }
    }

    impl Write for ScriptedPort {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_handshake_sends_full_setup_sequence() {
        let mut port = ScriptedPort::new(&[
            b"A0\r\n",             // CT0 ack
            b"iLoad Pro 500\r\n",  // SS1 probe answer
            b"A0\r\n",             // CSS 5 ack
            b"A0\r\n",             // CLA 1 ack
        ]);

        let probe = handshake(&mut port).unwrap();
        assert_eq!(probe, "iLoad Pro 500");
        assert_eq!(
            port.commands(),
            vec!["CT0", "SS1", "CSS 5", "CLA 1", "O0W0"]
        );
    }

    #[test]
    fn test_handshake_fails_on_silent_device() {
        // Device acks the halt but never answers the probe.
        let mut port = ScriptedPort::new(&[b"A0\r\n"]);

        match handshake(&mut port) {
            Err(ConnectionError::NoResponse) => {}
            other => panic!("expected NoResponse, got {:?}", other),
        }
    }

    #[test]
    fn test_read_response_strips_cr_lf() {
        let mut port = ScriptedPort::new(&[b"A12000\r\n"]);
        // Consume nothing first: read directly.
        let line = read_response(&mut port).unwrap();
        assert_eq!(line, "A12000");
    }

    #[test]
    fn test_read_response_timeout_yields_empty() {
        let mut port = ScriptedPort::new(&[]);
        let line = read_response(&mut port).unwrap();
        assert!(line.is_empty());
    }
}
