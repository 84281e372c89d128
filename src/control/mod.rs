//! # Control Surface Module
//!
//! Turns operator input into control actions for the pipeline.
//!
//! This module handles:
//! - Parsing console lines into [`ControlAction`]s
//! - Mapping mode, light, interval and night-window requests to board commands
//! - Recording and connection lifecycle requests

pub mod console;

pub use console::{parse_action, ControlAction, ControlParseError, HELP};
