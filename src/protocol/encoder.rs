//! # Outbound Command and Line Encoder
//!
//! The fixed command vocabulary understood by the board firmware, plus the
//! inverse of the telemetry decoder for the known keys.

use std::fmt;

use super::telemetry::*;

/// Reporting intervals the firmware can switch between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportInterval {
    /// 1000 ms
    Ms1000,
    /// 2500 ms
    Ms2500,
    /// 5000 ms
    Ms5000,
    /// 10000 ms
    Ms10000,
}

impl ReportInterval {
    /// All selectable intervals, shortest first
    pub const ALL: [ReportInterval; 4] = [
        ReportInterval::Ms1000,
        ReportInterval::Ms2500,
        ReportInterval::Ms5000,
        ReportInterval::Ms10000,
    ];

    /// Interval length in milliseconds
    pub fn millis(self) -> u32 {
        match self {
            ReportInterval::Ms1000 => 1000,
            ReportInterval::Ms2500 => 2500,
            ReportInterval::Ms5000 => 5000,
            ReportInterval::Ms10000 => 10000,
        }
    }

    /// Look up an interval by its length in milliseconds
    pub fn from_millis(ms: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|i| i.millis() == ms)
    }
}

/// A command the host can send to the board
///
/// The set is closed: every variant maps to exactly one firmware token.
///
/// # Examples
///
/// ```
/// use smartroom_link::protocol::encoder::{Command, ReportInterval};
///
/// assert_eq!(Command::ModeAuto.token(), "MA");
/// assert_eq!(Command::Interval(ReportInterval::Ms2500).token(), "I2");
/// assert_eq!(Command::from_token("LOF"), Some(Command::LightOff));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Switch the board to automatic mode
    ModeAuto,
    /// Switch the board to manual mode
    ModeManual,
    /// Turn the light on (manual mode)
    LightOn,
    /// Turn the light off (manual mode)
    LightOff,
    /// Select the reporting interval
    Interval(ReportInterval),
    /// Move the night window start one hour later
    NightStartIncrement,
    /// Move the night window start one hour earlier
    NightStartDecrement,
    /// Move the night window end one hour later
    NightEndIncrement,
    /// Move the night window end one hour earlier
    NightEndDecrement,
}

impl Command {
    /// Every command in the vocabulary
    pub const ALL: [Command; 12] = [
        Command::ModeAuto,
        Command::ModeManual,
        Command::LightOn,
        Command::LightOff,
        Command::Interval(ReportInterval::Ms1000),
        Command::Interval(ReportInterval::Ms2500),
        Command::Interval(ReportInterval::Ms5000),
        Command::Interval(ReportInterval::Ms10000),
        Command::NightStartIncrement,
        Command::NightStartDecrement,
        Command::NightEndIncrement,
        Command::NightEndDecrement,
    ];

    /// Firmware token for this command
    pub fn token(self) -> &'static str {
        match self {
            Command::ModeAuto => "MA",
            Command::ModeManual => "ML",
            Command::LightOn => "LO",
            Command::LightOff => "LOF",
            Command::Interval(ReportInterval::Ms1000) => "I",
            Command::Interval(ReportInterval::Ms2500) => "I2",
            Command::Interval(ReportInterval::Ms5000) => "I5",
            Command::Interval(ReportInterval::Ms10000) => "I1",
            Command::NightStartIncrement => "SNI",
            Command::NightStartDecrement => "SND",
            Command::NightEndIncrement => "SI",
            Command::NightEndDecrement => "SD",
        }
    }

    /// Reverse lookup of [`Command::token`]
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.token() == token)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Encode a command as one newline-terminated line
pub fn encode_command(token: &str) -> Vec<u8> {
    let mut frame = Vec::with_capacity(token.len() + 1);
    frame.extend_from_slice(token.as_bytes());
    frame.push(b'\n');
    frame
}

/// Format a reading the way it appears on the wire and in recordings
///
/// Integral values keep a trailing `.0` and missing readings print as `nan`.
pub fn format_reading(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else {
        format!("{:?}", value)
    }
}

/// Serialize the known fields of a record back into a `DATA,` line
///
/// Used by tests and device simulators; the decoder accepts its output.
pub fn encode_telemetry_line(record: &TelemetryRecord) -> String {
    format!(
        "{}{}={},{}={},{}={},{}={},{}={},{}={},{}={},{}={},{}={},{}={}",
        DATA_MARKER,
        KEY_TEMPERATURE,
        format_reading(record.temperature_c),
        KEY_HUMIDITY,
        format_reading(record.humidity_pct),
        KEY_LIGHT,
        record.light_raw,
        KEY_TIME,
        record.device_time,
        KEY_MODE,
        record.mode,
        KEY_LED,
        u8::from(record.led_on),
        KEY_BUZZER,
        u8::from(record.buzzer_on),
        KEY_INTERVAL,
        record.interval_ms,
        KEY_NIGHT_START,
        record.night_start_hour,
        KEY_NIGHT_END,
        record.night_end_hour,
    )
}
