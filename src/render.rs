//! # Presentation Helpers
//!
//! Text formatting of the live state and chart frames built from history
//! snapshots. Drawing itself is left to a [`ChartRenderer`].

use std::fmt;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use crate::pipeline::history::{HistoryBuffer, HistorySample};
use crate::protocol::telemetry::{NightHours, TelemetryRecord, HOUR_UNKNOWN, LIGHT_UNKNOWN};

/// Placeholder shown for missing values
pub const MISSING: &str = "--";

/// Formatted live-state fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusView {
    pub device_time: String,
    pub temperature: String,
    pub humidity: String,
    pub light: String,
    pub mode: String,
    pub led: &'static str,
    pub buzzer: &'static str,
    pub interval: String,
    pub night_start: String,
    pub night_end: String,
}

impl StatusView {
    /// Format `record`, taking the night window from `hours`
    pub fn from_record(record: &TelemetryRecord, hours: NightHours) -> Self {
        Self {
            device_time: record.device_time.clone(),
            temperature: format_float(record.temperature_c, 1),
            humidity: format_float(record.humidity_pct, 0),
            light: if record.light_raw == LIGHT_UNKNOWN {
                MISSING.to_string()
            } else {
                record.light_raw.to_string()
            },
            mode: record.mode.clone(),
            led: on_off(record.led_on),
            buzzer: on_off(record.buzzer_on),
            interval: format!("{} ms", record.interval_ms),
            night_start: format_hour(hours.start),
            night_end: format_hour(hours.end),
        }
    }
}

impl fmt::Display for StatusView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] T={} C  H={} %  LDR={}  mode={}  LED={}  BUZZ={}  int={}  night {}h-{}h",
            self.device_time,
            self.temperature,
            self.humidity,
            self.light,
            self.mode,
            self.led,
            self.buzzer,
            self.interval,
            self.night_start,
            self.night_end
        )
    }
}

/// One-line status for the live record
pub fn format_status(record: &TelemetryRecord, hours: NightHours) -> String {
    StatusView::from_record(record, hours).to_string()
}

fn format_float(value: f64, decimals: usize) -> String {
    if value.is_nan() {
        MISSING.to_string()
    } else {
        format!("{:.*}", decimals, value)
    }
}

fn format_hour(hour: i32) -> String {
    if hour == HOUR_UNKNOWN {
        MISSING.to_string()
    } else {
        format!("{:02}", hour)
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "ON"
    } else {
        "OFF"
    }
}

/// Data for one chart redraw
#[derive(Debug, Clone, PartialEq)]
pub struct ChartFrame {
    /// Sample positions, `0..n`
    pub x: Vec<f64>,
    pub temperature: Vec<f64>,
    pub humidity: Vec<f64>,
    pub light: Vec<f64>,
    /// Autoscaled y-axis bounds over all three series
    pub y_range: Option<(f64, f64)>,
}

impl ChartFrame {
    /// Build a frame from a history snapshot
    ///
    /// Returns `None` with fewer than two samples; a single point is not drawn.
    pub fn from_samples(samples: &[HistorySample]) -> Option<Self> {
        if samples.len() < 2 {
            return None;
        }

        let temperature: Vec<f64> = samples.iter().map(|s| s.temperature_c).collect();
        let humidity: Vec<f64> = samples.iter().map(|s| s.humidity_pct).collect();
        let light: Vec<f64> = samples.iter().map(|s| s.light_raw).collect();

        let y_range = temperature
            .iter()
            .chain(&humidity)
            .chain(&light)
            .copied()
            .filter(|v| !v.is_nan())
            .fold(None, |range: Option<(f64, f64)>, v| match range {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            });

        Some(Self {
            x: (0..samples.len()).map(|i| i as f64).collect(),
            temperature,
            humidity,
            light,
            y_range,
        })
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Draws chart frames on the render cadence
pub trait ChartRenderer: Send {
    fn render(&mut self, frame: &ChartFrame);
}

/// Renderer for headless use: reports the latest point and y-range to the log
#[derive(Debug, Default)]
pub struct LogChartRenderer {
    frames: u64,
}

impl LogChartRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl ChartRenderer for LogChartRenderer {
    fn render(&mut self, frame: &ChartFrame) {
        let Some(last) = frame.len().checked_sub(1) else {
            return;
        };
        self.frames += 1;
        let range = match frame.y_range {
            Some((lo, hi)) => format!("{:.1}..{:.1}", lo, hi),
            None => MISSING.to_string(),
        };
        info!(
            "Chart: {} samples, T={} H={} LDR={} y={}",
            frame.len(),
            format_float(frame.temperature[last], 1),
            format_float(frame.humidity[last], 0),
            format_float(frame.light[last], 0),
            range
        );
    }
}

/// Snapshot `history` every `period` and hand the frame to `renderer`
///
/// The task runs until aborted.
pub fn spawn_chart_task<R>(history: HistoryBuffer, period: Duration, mut renderer: R) -> JoinHandle<()>
where
    R: ChartRenderer + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if let Some(frame) = ChartFrame::from_samples(&history.snapshot()) {
                renderer.render(&frame);
            }
        }
    })
}
