use std::path::PathBuf;

use eframe::egui;
use serde::{Deserialize, Serialize};

use crate::LoadCellApp;

/// Directory under the platform config dir holding both settings files.
fn config_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("loadcell-rs");
    path
}

/// Returns the path to the settings file: `~/.config/loadcell-rs/settings.json`
fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

/// Returns the path to the remembered-device file:
/// `~/.config/loadcell-rs/last_device.txt`
fn memory_path() -> PathBuf {
    config_dir().join("last_device.txt")
}

/// The last (port, baud) pair that produced a working connection.
///
/// Stored as a single plaintext line `"{port},{baud}\n"`, overwritten on
/// each successful connection and tried first on the next launch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortMemory {
    pub port: String,
    pub baud: u32,
}

impl PortMemory {
    /// Parse the single-line file format. Returns None for anything that
    /// does not look like `port,baud`.
    pub fn parse(contents: &str) -> Option<Self> {
        let line = contents.lines().next()?;
        let (port, baud) = line.split_once(',')?;
        let port = port.trim();
        if port.is_empty() {
            return None;
        }
        Some(Self {
            port: port.to_string(),
            baud: baud.trim().parse().ok()?,
        })
    }

    /// The on-disk representation.
    pub fn format(&self) -> String {
        format!("{},{}\n", self.port, self.baud)
    }

    /// Load the remembered device, if any.
    pub fn load() -> Option<Self> {
        let contents = std::fs::read_to_string(memory_path()).ok()?;
        Self::parse(&contents)
    }

    /// Overwrite the remembered device.
    pub fn save(&self) {
        let path = memory_path();
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::warn!("Failed to create config directory: {}", e);
                return;
            }
        }
        if let Err(e) = std::fs::write(&path, self.format()) {
            log::warn!("Failed to write remembered device: {}", e);
        }
    }
}

/// Persisted application settings.
///
/// Serialized as JSON to the platform config directory.
/// Fields use `#[serde(default)]` so that adding new settings
/// won't break existing config files.
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    // UI
    pub show_settings: bool,

    // Polling
    pub poll_interval_ms: u64,

    // Display
    pub line_width: f32,
    pub show_grid: bool,
    pub show_legend: bool,
    pub y_min: f64,
    pub y_max: f64,
    pub use_y_range: bool,

    // Color (stored as u8 triples since Color32 isn't serde-friendly)
    pub color_r: u8,
    pub color_g: u8,
    pub color_b: u8,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            show_settings: true,

            poll_interval_ms: 250,

            line_width: 1.5,
            show_grid: true,
            show_legend: true,
            y_min: 0.0,
            y_max: 100.0,
            use_y_range: false,

            color_r: 100,
            color_g: 255,
            color_b: 100,
        }
    }
}

impl AppSettings {
    /// Load settings from disk, falling back to defaults on any error.
    pub fn load() -> Self {
        let path = settings_path();
        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    settings
                }
                Err(e) => {
                    log::warn!("Failed to parse settings ({}), using defaults", e);
                    Self::default()
                }
            },
            Err(e) => {
                log::info!("No settings file found ({}), using defaults", e);
                Self::default()
            }
        }
    }

    /// Save settings to disk as pretty JSON.
    pub fn save(&self) {
        let path = settings_path();
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::warn!("Failed to create config directory: {}", e);
                return;
            }
        }
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    log::warn!("Failed to write settings: {}", e);
                }
            }
            Err(e) => {
                log::warn!("Failed to serialize settings: {}", e);
            }
        }
    }

    /// Extract current settings from the running application.
    pub fn from_app(app: &LoadCellApp) -> Self {
        Self {
            show_settings: app.show_settings,

            poll_interval_ms: app.poll_interval_ms,

            line_width: app.chart.settings.line_width,
            show_grid: app.chart.settings.show_grid,
            show_legend: app.chart.settings.show_legend,
            y_min: app.y_min,
            y_max: app.y_max,
            use_y_range: app.use_y_range,

            color_r: app.chart.settings.color.r(),
            color_g: app.chart.settings.color.g(),
            color_b: app.chart.settings.color.b(),
        }
    }

    /// Apply loaded settings to the running application.
    pub fn apply(&self, app: &mut LoadCellApp) {
        app.show_settings = self.show_settings;

        app.poll_interval_ms = self.poll_interval_ms.clamp(50, 5000);

        app.chart.settings.line_width = self.line_width;
        app.chart.settings.show_grid = self.show_grid;
        app.chart.settings.show_legend = self.show_legend;
        app.y_min = self.y_min;
        app.y_max = self.y_max;
        app.use_y_range = self.use_y_range;
        app.sync_y_range();

        app.chart.settings.color =
            egui::Color32::from_rgb(self.color_r, self.color_g, self.color_b);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_round_trip() {
        let memory = PortMemory {
            port: "/dev/ttyUSB0".to_string(),
            baud: 4800,
        };
        assert_eq!(memory.format(), "/dev/ttyUSB0,4800\n");
        assert_eq!(PortMemory::parse(&memory.format()), Some(memory));
    }

    #[test]
    fn test_memory_parse_windows_style() {
        assert_eq!(
            PortMemory::parse("COM3,115200\n"),
            Some(PortMemory {
                port: "COM3".to_string(),
                baud: 115200,
            })
        );
    }

    #[test]
    fn test_memory_parse_rejects_junk() {
        assert_eq!(PortMemory::parse(""), None);
        assert_eq!(PortMemory::parse("no-comma-here\n"), None);
        assert_eq!(PortMemory::parse("COM3,not-a-number\n"), None);
        assert_eq!(PortMemory::parse(",4800\n"), None);
    }
}
