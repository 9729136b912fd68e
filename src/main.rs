//! loadcell-rs - Live serial load-cell logger
//!
//! Reads analog load-cell readings from a Loadstar-style sensor over a
//! serial connection and displays them on a live time-series plot.
//!
//! Two loops do the work:
//! - A background reader thread polls the serial device and pushes parsed
//!   readings onto a transfer queue
//! - The UI drains the queue on a fixed interval, appends to the history
//!   and the session log, and redraws the chart

use std::time::{Duration, Instant};

use eframe::egui;

mod data;
mod render;
mod serial;
mod settings;

use data::{History, ReadingQueue, SessionLog};
use render::LoadChart;
use serial::{SerialController, BAUD_RATES};
use settings::AppSettings;

/// App name, used for window title, config dir and session file names.
const APP_NAME: &str = "loadcell-rs";

fn main() -> eframe::Result<()> {
    env_logger::init();
    log::info!("Starting loadcell-rs");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([960.0, 640.0])
            .with_title("Load Cell Logger"),
        ..Default::default()
    };

    eframe::run_native(
        APP_NAME,
        options,
        Box::new(|cc| Ok(Box::new(LoadCellApp::new(cc)))),
    )
}

/// Main application state
pub struct LoadCellApp {
    /// Transfer queue shared with the reader thread
    pub queue: ReadingQueue,

    /// Cumulative readings, owned by the UI thread
    pub history: History,

    /// Chart widget rendering the history
    pub chart: LoadChart,

    /// Port discovery, handshake and reader thread lifecycle
    pub serial: SerialController,

    /// Per-connection session log file (None while disconnected or after
    /// a write error)
    pub session: Option<SessionLog>,

    pub show_settings: bool,

    /// Queue drain interval in milliseconds
    pub poll_interval_ms: u64,

    // Fixed y-range controls (applied to the chart when enabled)
    pub y_min: f64,
    pub y_max: f64,
    pub use_y_range: bool,

    last_poll: Instant,
    export_status: String,
}

impl LoadCellApp {
    fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let queue = ReadingQueue::new();

        let mut app = Self {
            queue,
            history: History::new(),
            chart: LoadChart::new(),
            serial: SerialController::new(),
            session: None,
            show_settings: true,
            poll_interval_ms: 250,
            y_min: 0.0,
            y_max: 100.0,
            use_y_range: false,
            last_poll: Instant::now(),
            export_status: String::new(),
        };

        AppSettings::load().apply(&mut app);

        // Try the device remembered from the last session before asking
        // the user for anything.
        if app.serial.try_remembered(app.queue.clone_ref()) {
            app.start_session();
        }

        app
    }

    /// Push the y-range controls into the chart settings.
    pub fn sync_y_range(&mut self) {
        self.chart.settings.y_range = if self.use_y_range {
            Some((self.y_min, self.y_max))
        } else {
            None
        };
    }

    /// Open a fresh session log for a new connection.
    fn start_session(&mut self) {
        match SessionLog::create(APP_NAME) {
            Ok(session) => self.session = Some(session),
            Err(e) => {
                log::warn!("Could not create session log: {}", e);
                self.session = None;
            }
        }
    }

    /// Drain the transfer queue into the history and the session log.
    fn poll_readings(&mut self) {
        let arrived = self.history.drain_from(&self.queue);
        if arrived == 0 {
            return;
        }

        let mut log_failed = false;
        if let Some(session) = &mut self.session {
            let readings = self.history.readings();
            let new = &readings[readings.len() - arrived..];
            if let Err(e) = session.append(new) {
                log::warn!("Session log write failed, disabling: {}", e);
                log_failed = true;
            }
        }
        if log_failed {
            self.session = None;
        }
    }

    /// Clear the history and the chart's cached series.
    fn clear_data(&mut self) {
        self.history.clear();
        self.chart.clear();
        self.export_status.clear();
        log::debug!("Cleared chart data");
    }

    /// Ask for a destination and write the full history as CSV.
    fn export_csv(&mut self) {
        let default_name = format!(
            "{} {}.csv",
            APP_NAME,
            chrono::Local::now().format("%Y-%m-%d %H%M%S")
        );
        let Some(mut path) = rfd::FileDialog::new()
            .add_filter("CSV files", &["csv"])
            .set_file_name(default_name)
            .save_file()
        else {
            return; // user cancelled
        };

        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            path.set_extension("csv");
        }

        match std::fs::write(&path, self.history.to_csv("Load")) {
            Ok(()) => {
                self.export_status = format!("Exported {} readings", self.history.len());
                log::info!("Exported CSV to {}", path.display());
            }
            Err(e) => {
                self.export_status = format!("Export failed: {}", e);
                log::warn!("CSV export to {} failed: {}", path.display(), e);
            }
        }
    }

    fn toggle_connection(&mut self) {
        let was_connected = self.serial.is_connected;
        self.serial.toggle(self.queue.clone_ref());

        if self.serial.is_connected && !was_connected {
            self.start_session();
        } else if !self.serial.is_connected {
            // Session file stays on disk; just stop appending to it.
            self.session = None;
        }
    }
}

impl eframe::App for LoadCellApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.request_repaint_after(Duration::from_millis(self.poll_interval_ms));

        if self.last_poll.elapsed() >= Duration::from_millis(self.poll_interval_ms) {
            self.poll_readings();
            self.last_poll = Instant::now();
        }

        // Top panel
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Load Cell Logger");
                ui.separator();

                let button_text = if self.serial.is_connected {
                    "⏹ Disconnect"
                } else {
                    "🔌 Connect"
                };
                if ui.button(button_text).clicked() {
                    self.toggle_connection();
                }

                ui.separator();
                ui.toggle_value(&mut self.show_settings, "⚙ Settings");
                ui.separator();
                ui.label(&self.serial.status);
                if self.serial.is_connected && !self.serial.reader_alive() {
                    // The producer died mid-stream; the plot just stops
                    // growing, so say so.
                    ui.colored_label(egui::Color32::YELLOW, "⚠ stream stopped");
                }

                ui.separator();
                match self.history.latest() {
                    Some(reading) => {
                        ui.label(format!("Load: {:.3} lb", reading.value));
                    }
                    None => {
                        ui.label("Load: —");
                    }
                }
            });
        });

        // Settings panel
        if self.show_settings {
            egui::SidePanel::left("settings_panel")
                .min_width(220.0)
                .show(ctx, |ui| {
                    ui.heading("Connection");
                    ui.separator();

                    if ui.button("🔃 Refresh ports").clicked() {
                        self.serial.scan_ports();
                    }

                    let selected_label = self
                        .serial
                        .ports
                        .get(self.serial.selected_port)
                        .map(|p| p.label.clone())
                        .unwrap_or_else(|| "No ports".to_string());
                    egui::ComboBox::from_label("Port")
                        .selected_text(selected_label)
                        .show_ui(ui, |ui| {
                            for (i, port) in self.serial.ports.iter().enumerate() {
                                ui.selectable_value(
                                    &mut self.serial.selected_port,
                                    i,
                                    &port.label,
                                );
                            }
                        });

                    egui::ComboBox::from_label("Baud")
                        .selected_text(self.serial.baud.to_string())
                        .show_ui(ui, |ui| {
                            for &baud in BAUD_RATES {
                                ui.selectable_value(
                                    &mut self.serial.baud,
                                    baud,
                                    baud.to_string(),
                                );
                            }
                        });

                    if !self.serial.is_connected
                        && ui.button("Try last device").clicked()
                        && self.serial.try_remembered(self.queue.clone_ref())
                    {
                        self.start_session();
                    }

                    ui.separator();

                    // Polling
                    ui.add(
                        egui::Slider::new(&mut self.poll_interval_ms, 50..=2000)
                            .text("Poll interval (ms)"),
                    );

                    ui.separator();

                    // Display settings
                    ui.collapsing("Display", |ui| {
                        ui.add(
                            egui::Slider::new(&mut self.chart.settings.line_width, 0.5..=5.0)
                                .text("Line width"),
                        );
                        ui.checkbox(&mut self.chart.settings.show_grid, "Show grid");
                        ui.checkbox(&mut self.chart.settings.show_legend, "Show legend");

                        if ui.checkbox(&mut self.use_y_range, "Fixed y-range").changed() {
                            self.sync_y_range();
                        }
                        if self.use_y_range {
                            let min_changed = ui
                                .add(egui::DragValue::new(&mut self.y_min).prefix("Min: "))
                                .changed();
                            let max_changed = ui
                                .add(egui::DragValue::new(&mut self.y_max).prefix("Max: "))
                                .changed();
                            if min_changed || max_changed {
                                self.sync_y_range();
                            }
                        }
                    });

                    ui.separator();

                    // Color presets
                    ui.collapsing("Color", |ui| {
                        ui.horizontal(|ui| {
                            if ui.button("Green").clicked() {
                                self.chart.settings.color =
                                    egui::Color32::from_rgb(100, 255, 100);
                            }
                            if ui.button("Amber").clicked() {
                                self.chart.settings.color =
                                    egui::Color32::from_rgb(255, 176, 0);
                            }
                            if ui.button("Blue").clicked() {
                                self.chart.settings.color =
                                    egui::Color32::from_rgb(100, 150, 255);
                            }
                        });
                    });

                    ui.separator();

                    // Data
                    ui.collapsing("Data", |ui| {
                        if ui.button("Clear data").clicked() {
                            self.clear_data();
                        }
                        let can_export = !self.history.is_empty();
                        if ui
                            .add_enabled(can_export, egui::Button::new("Export CSV…"))
                            .clicked()
                        {
                            self.export_csv();
                        }
                        if !self.export_status.is_empty() {
                            ui.small(&self.export_status);
                        }
                        if let Some(session) = &self.session {
                            ui.small(format!("Logging to {}", session.path().display()));
                        }
                    });
                });
        }

        // Main chart
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.with_layout(egui::Layout::bottom_up(egui::Align::LEFT), |ui| {
                ui.horizontal(|ui| {
                    ui.small(format!("Readings: {}", self.history.len()));
                    ui.separator();
                    ui.small(format!("Queued: {}", self.queue.len()));
                });

                // Chart fills everything above the status line.
                ui.with_layout(egui::Layout::top_down(egui::Align::Min), |ui| {
                    self.chart.show(ui, &self.history);
                });
            });
        });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        // Stop and join the reader thread so the port is released cleanly.
        self.serial.disconnect();
        AppSettings::from_app(self).save();
        log::info!("Shut down cleanly");
    }
}
