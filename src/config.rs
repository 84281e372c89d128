//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, SmartRoomError};

/// Baud rates accepted for the board's USB-UART bridge
pub const SUPPORTED_BAUD_RATES: &[u32] = &[9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600];

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub recording: RecordingConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Acquisition pipeline timing and sizing
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PipelineConfig {
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    #[serde(default = "default_stabilization_ms")]
    pub stabilization_ms: u64,

    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    #[serde(default = "default_render_interval_ms")]
    pub render_interval_ms: u64,
}

/// CSV recording configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RecordingConfig {
    /// Empty means "do not record at startup"
    #[serde(default)]
    pub csv_path: String,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud_rate() -> u32 { 115200 }
fn default_timeout_ms() -> u64 { 1000 }

fn default_tick_ms() -> u64 { 50 }
fn default_stabilization_ms() -> u64 { 2000 }
fn default_history_capacity() -> usize { 100 }
fn default_render_interval_ms() -> u64 { 500 }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            stabilization_ms: default_stabilization_ms(),
            history_capacity: default_history_capacity(),
            render_interval_ms: default_render_interval_ms(),
        }
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self { csv_path: String::new() }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serial: SerialConfig::default(),
            pipeline: PipelineConfig::default(),
            recording: RecordingConfig::default(),
        }
    }
}

impl SerialConfig {
    /// Read timeout as a [`Duration`]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl PipelineConfig {
    /// Dispatcher tick period
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Startup window during which received lines are discarded
    pub fn stabilization_delay(&self) -> Duration {
        Duration::from_millis(self.stabilization_ms)
    }

    /// Chart refresh period
    pub fn render_period(&self) -> Duration {
        Duration::from_millis(self.render_interval_ms)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use smartroom_link::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.trim().is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if !SUPPORTED_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(invalid(format!(
                "baud_rate must be one of: {}",
                SUPPORTED_BAUD_RATES
                    .iter()
                    .map(|b| b.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        if self.serial.timeout_ms == 0 || self.serial.timeout_ms > 10000 {
            return Err(invalid("timeout_ms must be between 1 and 10000"));
        }

        if self.pipeline.tick_ms == 0 || self.pipeline.tick_ms > 1000 {
            return Err(invalid("tick_ms must be between 1 and 1000"));
        }

        if self.pipeline.stabilization_ms > 60000 {
            return Err(invalid("stabilization_ms must be at most 60000"));
        }

        if self.pipeline.history_capacity == 0 || self.pipeline.history_capacity > 100_000 {
            return Err(invalid("history_capacity must be between 1 and 100000"));
        }

        if self.pipeline.render_interval_ms == 0 || self.pipeline.render_interval_ms > 60000 {
            return Err(invalid("render_interval_ms must be between 1 and 60000"));
        }

        Ok(())
    }
}

fn invalid(msg: impl std::fmt::Display) -> SmartRoomError {
    SmartRoomError::Config(toml::de::Error::custom(msg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.serial.baud_rate, 115200);
        assert_eq!(config.serial.read_timeout(), Duration::from_secs(1));
        assert_eq!(config.pipeline.tick_period(), Duration::from_millis(50));
        assert_eq!(config.pipeline.stabilization_delay(), Duration::from_secs(2));
        assert_eq!(config.pipeline.history_capacity, 100);
        assert_eq!(config.pipeline.render_period(), Duration::from_millis(500));
        assert!(config.recording.csv_path.is_empty());
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[serial]
port = "/dev/ttyACM1"

[pipeline]
history_capacity = 250

[recording]
csv_path = "room.csv"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyACM1");
        assert_eq!(config.serial.baud_rate, 115200);
        assert_eq!(config.pipeline.history_capacity, 250);
        assert_eq!(config.pipeline.tick_ms, 50);
        assert_eq!(config.recording.csv_path, "room.csv");
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: Config = toml::from_str("[serial]\nport = \"COM3\"\n").unwrap();
        assert_eq!(config.serial.port, "COM3");
        assert_eq!(config.pipeline, PipelineConfig::default());
        assert_eq!(config.recording, RecordingConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_shipped_default_file_matches_defaults() {
        let config = Config::load(concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[serial]
baud_rate = 420000

[pipeline]

[recording]
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        match Config::load(temp_file.path()) {
            Err(SmartRoomError::Config(e)) => assert!(e.to_string().contains("baud_rate")),
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/smartroom.toml");
        assert!(matches!(result, Err(SmartRoomError::Io(_))));
    }

    #[test]
    fn test_empty_serial_port() {
        let mut config = Config::default();
        config.serial.port = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeout_bounds() {
        let mut config = Config::default();
        config.serial.timeout_ms = 0;
        assert!(config.validate().is_err());
        config.serial.timeout_ms = 10001;
        assert!(config.validate().is_err());
        config.serial.timeout_ms = 10000;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tick_bounds() {
        let mut config = Config::default();
        config.pipeline.tick_ms = 0;
        assert!(config.validate().is_err());
        config.pipeline.tick_ms = 1001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_stabilization_is_allowed() {
        let mut config = Config::default();
        config.pipeline.stabilization_ms = 0;
        assert!(config.validate().is_ok());
        config.pipeline.stabilization_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_history_capacity_zero() {
        let mut config = Config::default();
        config.pipeline.history_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_render_interval_zero() {
        let mut config = Config::default();
        config.pipeline.render_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_baud_rates() {
        for &baud in SUPPORTED_BAUD_RATES {
            let mut config = Config::default();
            config.serial.baud_rate = baud;
            assert!(config.validate().is_ok(), "Baud rate {} should be valid", baud);
        }
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_serial_port(), "/dev/ttyUSB0");
        assert_eq!(default_baud_rate(), 115200);
        assert_eq!(default_timeout_ms(), 1000);
        assert_eq!(default_tick_ms(), 50);
        assert_eq!(default_stabilization_ms(), 2000);
        assert_eq!(default_history_capacity(), 100);
        assert_eq!(default_render_interval_ms(), 500);
    }
}
