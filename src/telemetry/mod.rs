//! # Telemetry Module
//!
//! Handles recording decoded telemetry to CSV files.
//!
//! This module handles:
//! - Opening a recording in append mode, writing the header only once per file
//! - Writing one flushed row per decoded record
//! - Closing the recording on request or on disconnect

pub mod csv_sink;

pub use csv_sink::CsvSink;
