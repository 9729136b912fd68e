//! Time-series chart widget
//!
//! Renders the full reading history as a load-vs-time line plot. The
//! widget keeps its own cached copy of the plotted points, synced from
//! the history each frame (appending only the new tail), so a redraw
//! does not rebuild the whole series every tick.

use chrono::{Local, TimeZone};
use eframe::egui::{self, Color32};
use egui_plot::{Legend, Line, Plot, PlotPoints};

use crate::data::History;

/// Display settings for the chart
#[derive(Clone)]
pub struct ChartSettings {
    /// Trace color
    pub color: Color32,

    /// Line thickness in pixels
    pub line_width: f32,

    /// Whether to show grid lines
    pub show_grid: bool,

    /// Whether to show the legend
    pub show_legend: bool,

    /// Fixed y-range; None = auto-scale to the data
    pub y_range: Option<(f64, f64)>,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            color: Color32::from_rgb(100, 255, 100),
            line_width: 1.5,
            show_grid: true,
            show_legend: true,
            y_range: None,
        }
    }
}

/// Load-vs-time chart widget
pub struct LoadChart {
    /// Display settings
    pub settings: ChartSettings,

    /// Cached plot points mirroring the history, as (epoch secs, value)
    series: Vec<[f64; 2]>,
}

impl Default for LoadChart {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadChart {
    pub fn new() -> Self {
        Self {
            settings: ChartSettings::default(),
            series: Vec::new(),
        }
    }

    /// Bring the cached series up to date with the history.
    ///
    /// The history is append-only between clears, so normally this just
    /// copies the new tail. A history shorter than the cache means it was
    /// cleared behind our back; rebuild from scratch.
    pub fn sync(&mut self, history: &History) {
        let readings = history.readings();
        if readings.len() < self.series.len() {
            self.series.clear();
        }
        for reading in &readings[self.series.len()..] {
            self.series.push([reading.timestamp, reading.value]);
        }
    }

    /// Drop the cached series. Called alongside a history clear.
    pub fn clear(&mut self) {
        self.series.clear();
    }

    /// Number of cached points (mirrors the history length).
    pub fn point_count(&self) -> usize {
        self.series.len()
    }

    /// Draw the chart, filling the available space.
    pub fn show(&mut self, ui: &mut egui::Ui, history: &History) {
        self.sync(history);

        let mut plot = Plot::new("load_history")
            .show_grid(self.settings.show_grid)
            .x_axis_formatter(|mark, _range| format_axis_time(mark.value))
            .y_axis_label("Load (lb)")
            .label_formatter(|name, point| {
                if name.is_empty() {
                    format!("{}\n{:.3}", format_axis_time(point.x), point.y)
                } else {
                    format!("{}\n{}\n{:.3}", name, format_axis_time(point.x), point.y)
                }
            });

        if self.settings.show_legend {
            plot = plot.legend(Legend::default());
        }
        if let Some((y_min, y_max)) = self.settings.y_range {
            // Keep x following the data, pin y to the configured range.
            plot = plot
                .include_y(y_min)
                .include_y(y_max)
                .auto_bounds(egui::Vec2b::new(true, false));
        }

        let points = PlotPoints::new(self.series.clone());
        let line = Line::new(points)
            .color(self.settings.color)
            .width(self.settings.line_width)
            .name("Load");

        plot.show(ui, |plot_ui| {
            plot_ui.line(line);
        });
    }
}

/// Axis tick label: local wall-clock time, seconds resolution.
fn format_axis_time(epoch_secs: f64) -> String {
    match Local.timestamp_opt(epoch_secs as i64, 0).single() {
        Some(dt) => dt.format("%H:%M:%S").to_string(),
        None => format!("{:.0}", epoch_secs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Reading;

    #[test]
    fn test_sync_appends_only_the_new_tail() {
        let mut chart = LoadChart::new();
        let mut history = History::new();

        history.push(Reading::new(1.0, 10.0));
        chart.sync(&history);
        assert_eq!(chart.point_count(), 1);

        history.push(Reading::new(2.0, 20.0));
        history.push(Reading::new(3.0, 30.0));
        chart.sync(&history);
        assert_eq!(chart.point_count(), 3);
        assert_eq!(chart.series[2], [3.0, 30.0]);
    }

    #[test]
    fn test_sync_rebuilds_after_history_clear() {
        let mut chart = LoadChart::new();
        let mut history = History::new();

        history.push(Reading::new(1.0, 10.0));
        history.push(Reading::new(2.0, 20.0));
        chart.sync(&history);

        history.clear();
        history.push(Reading::new(5.0, 50.0));
        chart.sync(&history);

        assert_eq!(chart.point_count(), 1);
        assert_eq!(chart.series[0], [5.0, 50.0]);
    }

    #[test]
    fn test_clear_empties_cached_series() {
        let mut chart = LoadChart::new();
        let mut history = History::new();
        history.push(Reading::new(1.0, 10.0));
        chart.sync(&history);

        chart.clear();
        assert_eq!(chart.point_count(), 0);
    }
}
