//! # Smart Room Link
//!
//! Host-side console for the Smart Room sensor/actuator board.
//!
//! This application reads the board's telemetry stream over a serial port,
//! shows its device log output, keeps a live history for charting, records
//! telemetry to CSV on request and sends mode/light/interval commands back.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use smartroom_link::config::Config;
use smartroom_link::control::{parse_action, ControlAction, ControlParseError, HELP};
use smartroom_link::error::SmartRoomError;
use smartroom_link::pipeline::dispatcher::RawLineSink;
use smartroom_link::pipeline::Connection;
use smartroom_link::render::{format_status, spawn_chart_task, LogChartRenderer};
use smartroom_link::serial::list_ports;

/// Configuration file used when `--config` is not given and it exists
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// File name prefix of the rolling log
const LOG_FILE_PREFIX: &str = "smartroom-link.log";

/// Command-line options
#[derive(Debug, Parser)]
#[command(name = "smartroom-link", version, about)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial port, overriding the configuration
    #[arg(short, long)]
    port: Option<String>,

    /// Start recording telemetry to this CSV file once connected
    #[arg(short, long)]
    record: Option<PathBuf>,

    /// Also write a daily-rolling log file into this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// List available serial ports and exit
    #[arg(long)]
    list_ports: bool,
}

/// Raw-line sink printing device log output to the terminal
///
/// Only the first write failure is logged.
#[derive(Debug, Default)]
struct ConsoleTerminal {
    write_failed: bool,
}

impl ConsoleTerminal {
    fn emit<W: Write>(&mut self, out: &mut W, line: &str) {
        if let Err(e) = out.write_all(line.as_bytes()).and_then(|()| out.flush()) {
            if !self.write_failed {
                warn!("Failed to write device output to the terminal: {}", e);
            }
            self.write_failed = true;
        }
    }
}

impl RawLineSink for ConsoleTerminal {
    fn raw_line(&mut self, line: &str) {
        let mut stdout = std::io::stdout().lock();
        self.emit(&mut stdout, line);
    }
}

/// User-interaction state: at most one live connection
struct App {
    config: Config,
    connection: Option<Connection>,
    chart: Option<JoinHandle<()>>,
    terminal: ConsoleTerminal,
    /// Recording requested on the command line, started on the first connect
    startup_recording: Option<PathBuf>,
}

impl App {
    fn new(config: Config) -> Self {
        let startup_recording = match config.recording.csv_path.as_str() {
            "" => None,
            path => Some(PathBuf::from(path)),
        };

        Self {
            config,
            connection: None,
            chart: None,
            terminal: ConsoleTerminal::default(),
            startup_recording,
        }
    }

    fn connection_mut(&mut self) -> smartroom_link::error::Result<&mut Connection> {
        self.connection.as_mut().ok_or(SmartRoomError::NotConnected)
    }

    /// Open `port` (or the configured one), closing any current connection first
    async fn connect(&mut self, port: Option<String>) {
        self.disconnect().await;

        let mut serial = self.config.serial.clone();
        if let Some(port) = port {
            serial.port = port;
        }

        let mut connection = match Connection::open(&serial, &self.config.pipeline) {
            Ok(connection) => connection,
            Err(e) => {
                error!("Failed to connect to {}: {}", serial.port, e);
                return;
            }
        };

        self.terminal.raw_line(&format!(">> CONNECTED TO {}\n", connection.port_name()));

        if let Some(path) = self.startup_recording.take() {
            if let Err(e) = connection.start_recording(&path) {
                error!("Failed to start recording: {}", e);
            }
        }

        self.chart = Some(spawn_chart_task(
            connection.history(),
            self.config.pipeline.render_period(),
            LogChartRenderer::new(),
        ));
        self.connection = Some(connection);
    }

    /// Stop recording, stop the reader and release the port
    async fn disconnect(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };

        if let Some(chart) = self.chart.take() {
            chart.abort();
        }

        let exit = connection.close().await;
        info!("Reader ended: {:?}", exit);
        self.terminal.raw_line(">> DISCONNECTED\n");
    }

    /// Dispatcher tick; reports a lost link once
    fn tick(&mut self) {
        let Some(connection) = self.connection.as_mut() else {
            return;
        };

        connection.tick(&mut self.terminal);
        if let Some(exit) = connection.take_link_failure() {
            error!(
                "Link to {} lost ({:?}); use 'connect' to reconnect",
                connection.port_name(),
                exit
            );
        }
    }

    /// Apply one console action
    ///
    /// # Returns
    ///
    /// * `bool` - `false` when the application should exit
    async fn handle(&mut self, action: ControlAction) -> bool {
        match action {
            ControlAction::Send(command) => match self.connection_mut() {
                Ok(connection) => connection.send(command).await,
                Err(e) => println!("{}", e),
            },
            ControlAction::SendToken(token) => match self.connection_mut() {
                Ok(connection) => connection.send_token(&token).await,
                Err(e) => println!("{}", e),
            },
            ControlAction::StartRecording(path) => match self.connection_mut() {
                Ok(connection) => {
                    if let Err(e) = connection.start_recording(&path) {
                        println!("{}", e);
                    }
                }
                Err(e) => println!("{}", e),
            },
            ControlAction::StopRecording => {
                if let Some(connection) = self.connection.as_mut() {
                    connection.stop_recording();
                }
            }
            ControlAction::Connect(port) => self.connect(port).await,
            ControlAction::Disconnect => self.disconnect().await,
            ControlAction::Status => self.print_status(),
            ControlAction::ListPorts => print_ports(),
            ControlAction::Help => println!("{}", HELP),
            ControlAction::Quit => return false,
        }
        true
    }

    fn print_status(&self) {
        let Some(connection) = self.connection.as_ref() else {
            println!("{}", SmartRoomError::NotConnected);
            return;
        };

        match connection.live() {
            Some(record) => println!("{}", format_status(record, connection.night_hours())),
            None => println!("No telemetry yet"),
        }

        match connection.recording_path() {
            Some(path) => println!("Recording to {}", path.display()),
            None => println!("Not recording"),
        }
    }
}

fn print_ports() {
    match list_ports() {
        Ok(ports) if ports.is_empty() => println!("No serial ports found"),
        Ok(ports) => {
            for port in ports {
                println!("{}", port);
            }
        }
        Err(e) => println!("{}", e),
    }
}

/// Install stderr logging, plus a rolling file log when `log_dir` is given
///
/// The returned guard must be held for the life of the program so buffered
/// file output is flushed on exit.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(filter).with(stderr_layer).init();
            None
        }
    }
}

/// Resolve the configuration from the file and command-line overrides
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Config::load(DEFAULT_CONFIG_PATH)
            .with_context(|| format!("Failed to load configuration from {}", DEFAULT_CONFIG_PATH))?,
        None => Config::default(),
    };

    if let Some(port) = &cli.port {
        config.serial.port = port.clone();
    }
    if let Some(path) = &cli.record {
        config.recording.csv_path = path.to_string_lossy().into_owned();
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Main entry point for the Smart Room link
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Parse the command line and set up logging
///    - Load the configuration and apply overrides
///    - Connect to the configured port (a failure leaves the console idle)
///
/// 2. **Main Loop**
///    - Run a dispatcher tick every `tick_ms` (50 ms by default)
///    - Parse console lines into control actions
///    - Handle Ctrl+C for graceful shutdown
///
/// 3. **Graceful Shutdown**
///    - Stop recording, stop the reader and release the port
///
/// # Errors
///
/// Returns error if the configuration cannot be loaded or is invalid
///
/// # Examples
///
/// ```bash
/// cargo run --release -- --port /dev/ttyACM0 --record room.csv
/// ```
///
/// Expected output:
/// ```text
/// INFO smartroom_link::pipeline: Connected to /dev/ttyACM0
/// >> CONNECTED TO /dev/ttyACM0
/// INFO smartroom_link::telemetry::csv_sink: Recording telemetry to room.csv
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_dir.as_deref());

    if cli.list_ports {
        print_ports();
        return Ok(());
    }

    info!("Smart Room link v{} starting...", env!("CARGO_PKG_VERSION"));
    let config = load_config(&cli)?;

    let mut ticker = interval(config.pipeline.tick_period());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut app = App::new(config);
    app.connect(None).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    info!("Type 'help' for commands, Ctrl+C to exit");

    loop {
        tokio::select! {
            _ = ticker.tick() => app.tick(),

            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match parse_action(&line) {
                    Ok(action) => {
                        if !app.handle(action).await {
                            break;
                        }
                    }
                    Err(ControlParseError::Empty) => {}
                    Err(e) => println!("{}", e),
                },
                Ok(None) => {
                    stdin_open = false;
                    info!("Console input closed; press Ctrl+C to exit");
                }
                Err(e) => {
                    stdin_open = false;
                    warn!("Console input failed: {}", e);
                }
            },

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    app.disconnect().await;
    Ok(())
}
