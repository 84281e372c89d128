//! # Telemetry Line Decoder
//!
//! Turns `DATA,key=value,...` lines into [`TelemetryRecord`]s.
//!
//! Decoding is total: each known key is parsed on its own into an `Option`,
//! and the documented default is substituted only when the record is built.
//! A malformed line therefore yields a record full of sentinels, never an error.

use std::collections::HashMap;

use super::telemetry::*;

/// Classify a raw line as telemetry or diagnostic text
///
/// Surrounding whitespace (including the line terminator) is ignored.
///
/// # Examples
///
/// ```
/// use smartroom_link::protocol::decoder::classify_line;
/// use smartroom_link::protocol::telemetry::LineKind;
///
/// assert_eq!(classify_line("DATA,t=21.5\r\n"), LineKind::Telemetry("t=21.5"));
/// assert_eq!(classify_line("BOOT OK\n"), LineKind::Raw);
/// ```
pub fn classify_line(line: &str) -> LineKind<'_> {
    match line.trim().strip_prefix(DATA_MARKER) {
        Some(payload) => LineKind::Telemetry(payload),
        None => LineKind::Raw,
    }
}

/// Decode a raw line, returning `None` for non-telemetry lines
///
/// # Arguments
///
/// * `line` - One line as received from the device, terminator included or not
///
/// # Returns
///
/// * `Option<TelemetryRecord>` - Decoded record, or `None` if the line lacks the `DATA,` marker
///
/// # Examples
///
/// ```
/// use smartroom_link::protocol::decoder::decode_line;
///
/// let record = decode_line("DATA,t=abc,mode=MANUAL").unwrap();
/// assert!(record.temperature_c.is_nan());
/// assert_eq!(record.mode, "MANUAL");
///
/// assert!(decode_line("BOOT OK").is_none());
/// ```
pub fn decode_line(line: &str) -> Option<TelemetryRecord> {
    match classify_line(line) {
        LineKind::Telemetry(payload) => Some(decode_payload(payload)),
        LineKind::Raw => None,
    }
}

/// Decode the part of a telemetry line that follows the `DATA,` marker
///
/// Tokens without `=` are skipped, unknown keys are ignored and the last
/// occurrence of a duplicated key wins.
pub fn decode_payload(payload: &str) -> TelemetryRecord {
    let fields = split_fields(payload);
    let get = |key: &str| fields.get(key).copied();

    TelemetryRecord {
        device_time: get(KEY_TIME).unwrap_or(DEFAULT_DEVICE_TIME).to_string(),
        temperature_c: parse_float(get(KEY_TEMPERATURE)).unwrap_or(f64::NAN),
        humidity_pct: parse_float(get(KEY_HUMIDITY)).unwrap_or(f64::NAN),
        light_raw: parse_light(get(KEY_LIGHT)).unwrap_or(LIGHT_UNKNOWN),
        mode: get(KEY_MODE).unwrap_or(DEFAULT_MODE).to_string(),
        led_on: parse_flag(get(KEY_LED)).unwrap_or(false),
        buzzer_on: parse_flag(get(KEY_BUZZER)).unwrap_or(false),
        interval_ms: parse_int::<i64>(get(KEY_INTERVAL)).unwrap_or(0),
        night_start_hour: parse_int::<i32>(get(KEY_NIGHT_START)).unwrap_or(HOUR_UNKNOWN),
        night_end_hour: parse_int::<i32>(get(KEY_NIGHT_END)).unwrap_or(HOUR_UNKNOWN),
    }
}

fn split_fields(payload: &str) -> HashMap<&str, &str> {
    payload
        .split(',')
        .filter_map(|token| token.split_once('='))
        .map(|(key, value)| (key.trim(), value.trim()))
        .collect()
}

fn parse_float(value: Option<&str>) -> Option<f64> {
    value?.parse::<f64>().ok()
}

/// The board may send the LDR reading as a float; it is truncated toward zero.
fn parse_light(value: Option<&str>) -> Option<i64> {
    parse_float(value)
        .filter(|v| v.is_finite())
        .map(|v| v.trunc() as i64)
}

fn parse_int<T: std::str::FromStr>(value: Option<&str>) -> Option<T> {
    value?.parse::<T>().ok()
}

fn parse_flag(value: Option<&str>) -> Option<bool> {
    parse_int::<i64>(value).map(|v| v != 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::encoder::encode_telemetry_line;

    const FULL_LINE: &str =
        "DATA,t=21.5,h=44,ldr=612,time=10:21:03,mode=AUTO,led=1,buzz=0,int=1000,nst=22,nend=6";

    #[test]
    fn test_decode_full_line() {
        let record = decode_line(FULL_LINE).expect("telemetry line");

        assert_eq!(record.temperature_c, 21.5);
        assert_eq!(record.humidity_pct, 44.0);
        assert_eq!(record.light_raw, 612);
        assert_eq!(record.device_time, "10:21:03");
        assert_eq!(record.mode, "AUTO");
        assert!(record.led_on);
        assert!(!record.buzzer_on);
        assert_eq!(record.interval_ms, 1000);
        assert_eq!(record.night_start_hour, 22);
        assert_eq!(record.night_end_hour, 6);
    }

    #[test]
    fn test_decode_partial_line_degrades_to_sentinels() {
        let record = decode_line("DATA,t=abc,mode=MANUAL").expect("telemetry line");

        assert!(record.temperature_c.is_nan(), "Unparsable temperature should be NaN");
        assert!(record.humidity_pct.is_nan());
        assert_eq!(record.light_raw, -1);
        assert_eq!(record.device_time, "--:--:--");
        assert_eq!(record.mode, "MANUAL");
        assert!(!record.led_on);
        assert!(!record.buzzer_on);
        assert_eq!(record.interval_ms, 0);
        assert_eq!(record.night_start_hour, -1);
        assert_eq!(record.night_end_hour, -1);
    }

    #[test]
    fn test_raw_lines_are_not_decoded() {
        assert!(decode_line("BOOT OK").is_none());
        assert!(decode_line("").is_none());
        assert!(decode_line("DATA").is_none(), "Marker requires the trailing comma");
        assert!(decode_line("data,t=1").is_none(), "Marker is case sensitive");
        assert_eq!(classify_line("  BOOT OK\r\n"), LineKind::Raw);
    }

    #[test]
    fn test_marker_only_yields_default_record() {
        let record = decode_line("DATA,").expect("telemetry line");
        assert_eq!(record.mode, DEFAULT_MODE);
        assert!(record.temperature_c.is_nan());
    }

    #[test]
    fn test_line_terminators_and_whitespace_are_ignored() {
        let record = decode_line("DATA, t = 19.0 ,mode= AUTO \r\n").expect("telemetry line");
        assert_eq!(record.temperature_c, 19.0);
        assert_eq!(record.mode, "AUTO");
    }

    #[test]
    fn test_keys_in_any_order_and_unknown_keys_ignored() {
        let record = decode_line("DATA,nend=7,foo=bar,h=51.5,t=20,x").expect("telemetry line");
        assert_eq!(record.night_end_hour, 7);
        assert_eq!(record.humidity_pct, 51.5);
        assert_eq!(record.temperature_c, 20.0);
    }

    #[test]
    fn test_last_duplicate_key_wins() {
        let record = decode_line("DATA,t=10,t=11.5").expect("telemetry line");
        assert_eq!(record.temperature_c, 11.5);
    }

    #[test]
    fn test_value_split_on_first_equals_only() {
        let record = decode_line("DATA,time=a=b").expect("telemetry line");
        assert_eq!(record.device_time, "a=b");
    }

    #[test]
    fn test_light_accepts_float_and_truncates() {
        assert_eq!(decode_line("DATA,ldr=612.9").unwrap().light_raw, 612);
        assert_eq!(decode_line("DATA,ldr=-3.7").unwrap().light_raw, -3);
        assert_eq!(decode_line("DATA,ldr=nan").unwrap().light_raw, -1);
        assert_eq!(decode_line("DATA,ldr=inf").unwrap().light_raw, -1);
        assert_eq!(decode_line("DATA,ldr=").unwrap().light_raw, -1);
    }

    #[test]
    fn test_flags_treat_any_nonzero_as_on() {
        let record = decode_line("DATA,led=2,buzz=1").unwrap();
        assert!(record.led_on);
        assert!(record.buzzer_on);

        let record = decode_line("DATA,led=on,buzz=1.0").unwrap();
        assert!(!record.led_on, "Non-integer flag falls back to off");
        assert!(!record.buzzer_on);
    }

    #[test]
    fn test_integer_fields_reject_floats() {
        let record = decode_line("DATA,int=2500.0,nst=x,nend=0").unwrap();
        assert_eq!(record.interval_ms, 0);
        assert_eq!(record.night_start_hour, -1);
        assert_eq!(record.night_end_hour, 0, "Hour 0 must stay distinct from unknown");
    }

    #[test]
    fn test_empty_string_values_are_kept_for_text_fields() {
        let record = decode_line("DATA,time=,mode=").unwrap();
        assert_eq!(record.device_time, "");
        assert_eq!(record.mode, "");
    }

    #[test]
    fn test_reencoding_known_fields_reproduces_values() {
        let lines = [
            FULL_LINE,
            "DATA,t=-4.25,h=99.5,ldr=0,time=00:00:00,mode=MANUAL,led=0,buzz=1,int=10000,nst=0,nend=23",
            "DATA,t=30,h=0,ldr=1023,time=23:59:59,mode=AUTO,led=1,buzz=1,int=2500,nst=20,nend=5",
        ];

        for line in lines {
            let record = decode_line(line).unwrap();
            let again = decode_line(&encode_telemetry_line(&record)).unwrap();
            assert_eq!(record, again, "Round trip changed values for {}", line);
        }
    }
}
