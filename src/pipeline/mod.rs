//! # Acquisition Pipeline Module
//!
//! Per-connection acquisition and dispatch pipeline.
//!
//! This module handles:
//! - Reading lines off the link on a background task
//! - Queueing them for a periodic dispatcher
//! - Decoding telemetry into the live state, history window and CSV sink
//! - Sending fire-and-forget commands back to the board
//!
//! A [`Connection`] owns one instance of every piece. It is built when a port
//! is opened and torn down on disconnect, so independent pipelines never
//! share state.

pub mod command;
pub mod dispatcher;
pub mod history;
pub mod reader;

use std::path::Path;

use tokio::time::Instant;
use tracing::info;

use crate::config::{PipelineConfig, SerialConfig};
use crate::error::Result;
use crate::protocol::encoder::Command;
use crate::protocol::telemetry::{NightHours, TelemetryRecord};
use crate::serial::port_trait::{LineSink, LineSource};
use crate::serial::BoardSerial;

use command::CommandChannel;
use dispatcher::{Dispatcher, RawLineSink, TickSummary};
use history::HistoryBuffer;
use reader::{ingress_queue, LineReader, ReaderExit};

/// One live link to the board and its pipeline
///
/// # Examples
///
/// ```no_run
/// use smartroom_link::config::Config;
/// use smartroom_link::pipeline::Connection;
/// use smartroom_link::protocol::encoder::Command;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = Config::default();
///     let mut connection = Connection::open(&config.serial, &config.pipeline)?;
///
///     connection.send(Command::ModeAuto).await;
///     let mut log = Vec::new();
///     connection.tick(&mut log);
///
///     connection.close().await;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Connection {
    port_name: String,
    reader: LineReader,
    dispatcher: Dispatcher,
    commands: CommandChannel,
    link_failure_reported: bool,
}

impl Connection {
    /// Open the configured serial port and start its pipeline
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::SmartRoomError::Serial`] if the port cannot be opened
    pub fn open(serial: &SerialConfig, pipeline: &PipelineConfig) -> Result<Self> {
        let port = BoardSerial::open(serial)?;
        let port_name = port.device_path().to_string();
        let (source, sink) = port.into_split();
        Ok(Self::start(port_name, source, sink, pipeline))
    }

    /// Start a pipeline over an already-open transport
    ///
    /// The stabilization window starts now.
    pub fn start<S, K>(port_name: impl Into<String>, source: S, sink: K, config: &PipelineConfig) -> Self
    where
        S: LineSource + 'static,
        K: LineSink + 'static,
    {
        let port_name = port_name.into();
        let (producer, queue) = ingress_queue();
        let reader = LineReader::spawn(source, producer);
        let dispatcher = Dispatcher::new(
            queue,
            HistoryBuffer::new(config.history_capacity),
            Instant::now(),
            config.stabilization_delay(),
        );

        info!("Connected to {}", port_name);
        Self {
            port_name,
            reader,
            dispatcher,
            commands: CommandChannel::new(sink),
            link_failure_reported: false,
        }
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Run one dispatcher tick
    pub fn tick(&mut self, raw: &mut dyn RawLineSink) -> TickSummary {
        self.dispatcher.tick(raw)
    }

    /// Run one dispatcher tick as if at `now`
    pub fn tick_at(&mut self, now: Instant, raw: &mut dyn RawLineSink) -> TickSummary {
        self.dispatcher.tick_at(now, raw)
    }

    /// Most recent decoded record
    pub fn live(&self) -> Option<&TelemetryRecord> {
        self.dispatcher.live()
    }

    /// Last known night window hours
    pub fn night_hours(&self) -> NightHours {
        self.dispatcher.night_hours()
    }

    /// Shared handle to the history window, for the chart cadence
    pub fn history(&self) -> HistoryBuffer {
        self.dispatcher.history().clone()
    }

    /// Start recording to `path`, closing any previous recording
    pub fn start_recording<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.dispatcher.start_recording(path)
    }

    pub fn stop_recording(&mut self) {
        self.dispatcher.stop_recording();
    }

    pub fn is_recording(&self) -> bool {
        self.dispatcher.recorder().is_open()
    }

    pub fn recording_path(&self) -> Option<&Path> {
        self.dispatcher.recorder().path()
    }

    /// Send a command to the board; failures are only logged
    pub async fn send(&mut self, command: Command) {
        self.commands.send(command).await;
    }

    /// Send an arbitrary token without validation
    pub async fn send_token(&mut self, token: &str) {
        self.commands.send_token(token).await;
    }

    /// Whether the reader task is still running
    pub fn is_reading(&self) -> bool {
        self.reader.is_running()
    }

    /// Report a lost link once: the reader ended on its own
    pub fn take_link_failure(&mut self) -> Option<ReaderExit> {
        if self.link_failure_reported {
            return None;
        }

        match self.reader.exit() {
            Some(exit) if exit.is_link_failure() => {
                self.link_failure_reported = true;
                Some(exit)
            }
            _ => None,
        }
    }

    /// Tear the pipeline down: stop recording, then stop and join the reader
    ///
    /// Returns once the reader has fully ended, so the port can be reopened.
    pub async fn close(mut self) -> ReaderExit {
        self.dispatcher.stop_recording();
        let exit = self.reader.shutdown().await;
        info!("Disconnected from {}", self.port_name);
        exit
    }
}
