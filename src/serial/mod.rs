//! # Serial Communication Module
//!
//! Handles the serial link to the Smart Room board.
//!
//! This module handles:
//! - Opening the serial port at 115,200 baud (8N1)
//! - Splitting the port into a line source and a command sink
//! - Framing the inbound byte stream into text lines
//! - Listing the serial ports present on the host

pub mod framing;
pub mod port_trait;

use std::time::Duration;

use tokio::io::{ReadHalf, WriteHalf};
use tokio_serial::{SerialPortBuilderExt, SerialPortType, SerialStream};
use tracing::{debug, info};

use crate::config::SerialConfig;
use crate::error::{Result, SmartRoomError};
use port_trait::{AsyncLineSink, AsyncLineSource};

/// Baud rate of the board's UART (115,200 baud)
pub const BOARD_BAUD_RATE: u32 = 115_200;

/// Default read timeout of the line source (1 second)
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Line source over the read half of an opened port
pub type SerialLineSource = AsyncLineSource<ReadHalf<SerialStream>>;

/// Command sink over the write half of an opened port
pub type SerialLineSink = AsyncLineSink<WriteHalf<SerialStream>>;

/// Smart Room board serial port handle
///
/// Holds the opened port until it is split into its read and write halves.
pub struct BoardSerial {
    /// Serial port handle
    port: SerialStream,
    /// Device path (e.g., /dev/ttyUSB0 or COM3)
    device_path: String,
    /// Per-read timeout applied by the line source
    read_timeout: Duration,
}

impl std::fmt::Debug for BoardSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardSerial")
            .field("device_path", &self.device_path)
            .field("read_timeout", &self.read_timeout)
            .finish_non_exhaustive()
    }
}

impl BoardSerial {
    /// Open the configured serial port
    ///
    /// # Arguments
    ///
    /// * `config` - Port name, baud rate and read timeout
    ///
    /// # Returns
    ///
    /// * `Result<BoardSerial>` - Opened port or error
    ///
    /// # Errors
    ///
    /// Returns [`SmartRoomError::Serial`] if the port cannot be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use smartroom_link::config::SerialConfig;
    /// use smartroom_link::serial::BoardSerial;
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let serial = BoardSerial::open(&SerialConfig::default())?;
    ///     println!("Connected to: {}", serial.device_path());
    ///     Ok(())
    /// }
    /// ```
    pub fn open(config: &SerialConfig) -> Result<Self> {
        debug!("Opening serial port {} at {} baud", config.port, config.baud_rate);

        let port = Self::open_port(&config.port, config.baud_rate)?;
        info!("Opened Smart Room board at {}", config.port);

        Ok(Self {
            port,
            device_path: config.port.clone(),
            read_timeout: config.read_timeout(),
        })
    }

    /// Open a specific serial port with 8N1 settings
    fn open_port(path: &str, baud_rate: u32) -> Result<SerialStream> {
        tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| SmartRoomError::Serial(format!("Failed to open {}: {}", path, e)))
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Split into the line source (for the reader task) and the command sink
    pub fn into_split(self) -> (SerialLineSource, SerialLineSink) {
        let (read_half, write_half) = tokio::io::split(self.port);
        (
            AsyncLineSource::new(read_half, self.read_timeout),
            AsyncLineSink::new(write_half),
        )
    }
}

/// One serial port present on the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortEntry {
    /// Device name passed to [`BoardSerial::open`]
    pub name: String,
    /// Human readable description
    pub description: String,
}

impl std::fmt::Display for PortEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.name, self.description)
    }
}

/// List serial ports present on the host
///
/// # Errors
///
/// Returns [`SmartRoomError::Serial`] if the OS enumeration fails
pub fn list_ports() -> Result<Vec<PortEntry>> {
    let ports = tokio_serial::available_ports()
        .map_err(|e| SmartRoomError::Serial(format!("Failed to list ports: {}", e)))?;

    Ok(ports
        .into_iter()
        .map(|port| PortEntry {
            description: describe_port_type(&port.port_type),
            name: port.port_name,
        })
        .collect())
}

fn describe_port_type(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(usb) => usb
            .product
            .clone()
            .unwrap_or_else(|| format!("USB {:04x}:{:04x}", usb.vid, usb.pid)),
        SerialPortType::PciPort => "PCI serial".to_string(),
        SerialPortType::BluetoothPort => "Bluetooth serial".to_string(),
        SerialPortType::Unknown => "n/a".to_string(),
    }
}
