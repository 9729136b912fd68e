//! Load-cell wire protocol
//!
//! Loadstar-style sensors speak a plain ASCII protocol: commands are short
//! strings terminated by a carriage return, and each response line carries a
//! one-byte status prefix followed by a decimal reading in milli-units.
//! See the iLoad command set documentation for the full command list.

use thiserror::Error;

/// Command terminator - the device expects a bare carriage return.
pub const CMD_TERMINATOR: &str = "\r";

/// Stop any continuous output currently running.
pub const CMD_HALT_OUTPUT: &str = "CT0";

/// Request a single sample. Used as the connection probe: a non-empty
/// response means a live device is on the other end.
pub const CMD_SINGLE_SAMPLE: &str = "SS1";

/// Set the continuous streaming rate.
pub const CMD_STREAM_RATE: &str = "CSS 5";

/// Enable on-device averaging.
pub const CMD_AVERAGING: &str = "CLA 1";

/// Start continuous weight output.
pub const CMD_STREAM_START: &str = "O0W0";

/// Commands sent (in order) after the probe succeeds, to configure
/// continuous output.
pub const SETUP_SEQUENCE: &[&str] = &[CMD_STREAM_RATE, CMD_AVERAGING, CMD_STREAM_START];

/// Device readings are reported in milli-units; divide by this to get
/// the display unit.
pub const SCALE_DIVISOR: f64 = 1000.0;

/// A reading line that could not be parsed.
///
/// These are recoverable: the reader loop drops the line and keeps going.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty reading line")]
    Empty,

    #[error("malformed reading line: {0:?}")]
    Malformed(String),
}

/// Parse one raw device line into a scaled reading.
///
/// The line is expected to look like `<status_byte><digits>\r\n`. Trailing
/// CR/LF and surrounding whitespace are stripped, the status byte is
/// discarded, and the remainder is parsed as a decimal number and divided
/// by [`SCALE_DIVISOR`].
pub fn parse_reading(line: &[u8]) -> Result<f64, ParseError> {
    // The device is ASCII-only; replace any line noise rather than failing
    // on invalid UTF-8.
    let text = String::from_utf8_lossy(line);
    let trimmed = text.trim();

    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    // Strip the one-byte status prefix. char_indices handles the (unlikely)
    // case where lossy decoding put a multi-byte replacement char first.
    let mut chars = trimmed.char_indices();
    chars.next();
    let rest = match chars.next() {
        Some((idx, _)) => &trimmed[idx..],
        None => return Err(ParseError::Empty),
    };

    let rest = rest.trim();
    if rest.is_empty() {
        return Err(ParseError::Empty);
    }

    rest.parse::<f64>()
        .map(|raw| raw / SCALE_DIVISOR)
        .map_err(|_| ParseError::Malformed(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_line_scales_by_1000() {
        assert_eq!(parse_reading(b"A12000\r\n"), Ok(12.0));
        assert_eq!(parse_reading(b"A12050\r"), Ok(12.05));
    }

    #[test]
    fn test_negative_and_fractional_values() {
        assert_eq!(parse_reading(b"A-500\r\n"), Ok(-0.5));
        assert_eq!(parse_reading(b"+1500.5\r\n"), Ok(1.5005));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert_eq!(
            parse_reading(b"Xgarbage\r"),
            Err(ParseError::Malformed("Xgarbage".to_string()))
        );
    }

    #[test]
    fn test_empty_lines() {
        assert_eq!(parse_reading(b""), Err(ParseError::Empty));
        assert_eq!(parse_reading(b"\r\n"), Err(ParseError::Empty));
        // A status byte with nothing after it carries no reading.
        assert_eq!(parse_reading(b"A\r\n"), Err(ParseError::Empty));
    }

    #[test]
    fn test_non_utf8_noise_is_dropped_not_panicked() {
        assert!(parse_reading(b"\xff\xfe12000\r\n").is_err());
        assert!(parse_reading(b"\xff\xfe\xfd\r\n").is_err());
    }
}
