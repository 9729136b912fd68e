//! Session log files
//!
//! Every connection gets its own timestamped CSV file under the user's
//! documents directory, appended as readings are drained. This is the
//! durable record of a measurement session; the in-memory history and
//! the export dialog work independently of it.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;

use super::history::format_timestamp;
use super::queue::Reading;

/// An open session log file.
pub struct SessionLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl SessionLog {
    /// Create a new session log named after the app and the current time,
    /// e.g. `~/Documents/loadcell-rs/loadcell-rs 2026-08-31 142305.csv`.
    ///
    /// Falls back to the home directory, then the current directory, if
    /// no documents directory exists.
    pub fn create(app_name: &str) -> std::io::Result<Self> {
        let mut dir = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        dir.push(app_name);
        fs::create_dir_all(&dir)?;

        let stamp = Local::now().format("%Y-%m-%d %H%M%S");
        let path = dir.join(format!("{} {}.csv", app_name, stamp));

        let mut writer = BufWriter::new(File::create(&path)?);
        writeln!(writer, "Time,Load")?;

        log::info!("Session log file is {}", path.display());
        Ok(Self { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a batch of drained readings and flush so the file is
    /// current even if the process dies mid-session.
    pub fn append(&mut self, readings: &[Reading]) -> std::io::Result<()> {
        for reading in readings {
            writeln!(
                self.writer,
                "{},{}",
                format_timestamp(reading.timestamp),
                reading.value
            )?;
        }
        self.writer.flush()
    }
}
