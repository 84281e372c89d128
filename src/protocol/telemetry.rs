//! # Telemetry Protocol Constants and Types
//!
//! Core definitions for the board's `DATA,...` status lines.

/// Prefix that marks a line as a telemetry sample
pub const DATA_MARKER: &str = "DATA,";

/// Device clock shown when the line carries no `time` key
pub const DEFAULT_DEVICE_TIME: &str = "--:--:--";

/// Mode shown when the line carries no `mode` key
pub const DEFAULT_MODE: &str = "UNK";

/// Light level reported when `ldr` is absent or unparsable
pub const LIGHT_UNKNOWN: i64 = -1;

/// Night window hour reported when `nst`/`nend` is absent or unparsable
pub const HOUR_UNKNOWN: i32 = -1;

/// Telemetry keys understood by the decoder
pub const KEY_TEMPERATURE: &str = "t";
pub const KEY_HUMIDITY: &str = "h";
pub const KEY_LIGHT: &str = "ldr";
pub const KEY_TIME: &str = "time";
pub const KEY_MODE: &str = "mode";
pub const KEY_LED: &str = "led";
pub const KEY_BUZZER: &str = "buzz";
pub const KEY_INTERVAL: &str = "int";
pub const KEY_NIGHT_START: &str = "nst";
pub const KEY_NIGHT_END: &str = "nend";

/// Column header of the CSV recording, in row order
pub const CSV_HEADER: [&str; 11] = [
    "pc_timestamp",
    "device_time",
    "temp_c",
    "hum_pct",
    "ldr",
    "led",
    "buzz",
    "mode",
    "interval",
    "night_start",
    "night_end",
];

/// One decoded status sample from the board
///
/// Every field degrades independently: a missing or malformed value takes the
/// documented default or sentinel instead of failing the whole record.
///
/// # Examples
///
/// ```
/// use smartroom_link::protocol::telemetry::TelemetryRecord;
///
/// let record = TelemetryRecord::default();
/// assert!(record.temperature_c.is_nan());
/// assert_eq!(record.light_raw, -1);
/// assert_eq!(record.mode, "UNK");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryRecord {
    /// Device-reported clock, opaque display string
    pub device_time: String,

    /// Temperature in °C, NaN when missing
    pub temperature_c: f64,

    /// Relative humidity in %, NaN when missing
    pub humidity_pct: f64,

    /// Raw LDR reading, -1 when missing
    pub light_raw: i64,

    /// Operating mode as reported by the device (e.g. `AUTO`, `MANUAL`)
    pub mode: String,

    /// Light output state
    pub led_on: bool,

    /// Buzzer state
    pub buzzer_on: bool,

    /// Reporting interval in milliseconds, 0 when missing
    pub interval_ms: i64,

    /// Night window start hour (0-23), -1 when unknown
    pub night_start_hour: i32,

    /// Night window end hour (0-23), -1 when unknown
    pub night_end_hour: i32,
}

impl Default for TelemetryRecord {
    fn default() -> Self {
        Self {
            device_time: DEFAULT_DEVICE_TIME.to_string(),
            temperature_c: f64::NAN,
            humidity_pct: f64::NAN,
            light_raw: LIGHT_UNKNOWN,
            mode: DEFAULT_MODE.to_string(),
            led_on: false,
            buzzer_on: false,
            interval_ms: 0,
            night_start_hour: HOUR_UNKNOWN,
            night_end_hour: HOUR_UNKNOWN,
        }
    }
}

impl TelemetryRecord {
    /// Whether the device reported a light level
    pub fn has_light(&self) -> bool {
        self.light_raw != LIGHT_UNKNOWN
    }

    /// Night window as `(start, end)` hours, if both are known
    pub fn night_window(&self) -> Option<(i32, i32)> {
        if self.night_start_hour == HOUR_UNKNOWN || self.night_end_hour == HOUR_UNKNOWN {
            None
        } else {
            Some((self.night_start_hour, self.night_end_hour))
        }
    }
}

/// Night window hours as last reported by the device
///
/// Records that omit an hour leave the previous value in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NightHours {
    pub start: i32,
    pub end: i32,
}

impl Default for NightHours {
    fn default() -> Self {
        Self {
            start: HOUR_UNKNOWN,
            end: HOUR_UNKNOWN,
        }
    }
}

impl NightHours {
    /// Take any hours `record` reports
    pub fn update(&mut self, record: &TelemetryRecord) {
        if record.night_start_hour != HOUR_UNKNOWN {
            self.start = record.night_start_hour;
        }
        if record.night_end_hour != HOUR_UNKNOWN {
            self.end = record.night_end_hour;
        }
    }
}

/// Classification of one inbound line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// Telemetry sample; carries the text after the `DATA,` marker
    Telemetry(&'a str),
    /// Diagnostic or log output from the device
    Raw,
}
