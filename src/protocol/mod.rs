//! # Device Line Protocol Module
//!
//! Text line protocol spoken by the Smart Room board over its serial link.
//!
//! This module handles:
//! - Telemetry record types and their "absent" sentinels
//! - Classifying inbound lines as telemetry or diagnostic text
//! - Decoding `DATA,key=value,...` lines field by field
//! - The closed outbound command vocabulary

pub mod telemetry;
pub mod decoder;
pub mod encoder;
