//! # Smart Room Link Library
//!
//! Host-side link to the Smart Room sensor/actuator board.
//!
//! This library provides the acquisition and dispatch pipeline for the board's
//! line-based serial protocol: a background line reader, a fault-tolerant
//! telemetry decoder, a bounded history window for live charts, and an
//! append-only CSV recorder fed from the same decoded records.

pub mod config;
pub mod control;
pub mod error;
pub mod pipeline;
pub mod protocol;
pub mod render;
pub mod serial;
pub mod telemetry;
