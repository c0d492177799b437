//! Core types and traits for the serial transport.
//!
//! `PortConfiguration` is the snapshot the connection manager opens ports
//! from. `SerialPortAdapter` is one open handle and `PortConnector` produces
//! handles, so the real driver and the simulated scale are interchangeable.

use super::error::PortError;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default command understood by NCI-protocol scales: `W` followed by a carriage return.
pub const DEFAULT_READ_COMMAND: &[u8] = b"W\r";

/// Default pause between sending the command and draining the reply.
pub const DEFAULT_WAIT: Duration = Duration::from_millis(250);

/// Default transport timeout for a single write or read call.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(1);

/// An open serial handle, boxed so fakes and real ports share one type.
pub type PortAdapter = Box<dyn SerialPortAdapter>;

/// Parameters for opening the scale's serial port and talking to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortConfiguration {
    /// OS device identifier (e.g. `/dev/ttyUSB0`, `COM3`). No connection can open without one.
    pub port: Option<String>,

    /// Baud rate (bits per second).
    pub baud_rate: u32,

    /// Parity checking mode.
    pub parity: Parity,

    /// Number of stop bits.
    pub stop_bits: StopBits,

    /// Number of data bits per character.
    pub byte_size: DataBits,

    /// Bytes written to the device to request a weight report.
    #[serde(with = "command_bytes")]
    pub read_command: Vec<u8>,

    /// Fixed pause between writing the command and draining the reply.
    #[serde(rename = "wait_ms", with = "duration_ms")]
    pub wait_duration: Duration,

    /// Transport timeout for an individual write or read call.
    #[serde(rename = "io_timeout_ms", with = "duration_ms")]
    pub timeout: Duration,
}

impl Default for PortConfiguration {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: 9600,
            parity: Parity::Even,
            stop_bits: StopBits::One,
            byte_size: DataBits::Seven,
            read_command: DEFAULT_READ_COMMAND.to_vec(),
            wait_duration: DEFAULT_WAIT,
            timeout: DEFAULT_IO_TIMEOUT,
        }
    }
}

impl PortConfiguration {
    /// Default configuration bound to the given port.
    pub fn for_port(port: impl Into<String>) -> Self {
        Self {
            port: Some(port.into()),
            ..Self::default()
        }
    }
}

/// Returned when a textual setting is outside its domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidSetting {
    pub given: String,
    pub allowed: &'static str,
}

impl fmt::Display for InvalidSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not one of {}", self.given, self.allowed)
    }
}

impl std::error::Error for InvalidSetting {}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl DataBits {
    pub const ALLOWED: &'static str = "5, 6, 7, 8";
}

impl TryFrom<u8> for DataBits {
    type Error = InvalidSetting;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            5 => Ok(Self::Five),
            6 => Ok(Self::Six),
            7 => Ok(Self::Seven),
            8 => Ok(Self::Eight),
            other => Err(InvalidSetting {
                given: other.to_string(),
                allowed: Self::ALLOWED,
            }),
        }
    }
}

impl From<DataBits> for u8 {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => 5,
            DataBits::Six => 6,
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        }
    }
}

impl FromStr for DataBits {
    type Err = InvalidSetting;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidSetting {
            given: s.to_string(),
            allowed: Self::ALLOWED,
        };
        s.trim()
            .parse::<u8>()
            .map_err(|_| invalid())
            .and_then(|bits| Self::try_from(bits).map_err(|_| invalid()))
    }
}

impl From<DataBits> for serialport::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => serialport::DataBits::Five,
            DataBits::Six => serialport::DataBits::Six,
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        }
    }
}

/// Parity checking modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    None,
    Even,
    Odd,
    Mark,
    Space,
}

impl Parity {
    pub const ALLOWED: &'static str = "'none', 'even', 'odd', 'mark', 'space'";

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Even => "even",
            Self::Odd => "odd",
            Self::Mark => "mark",
            Self::Space => "space",
        }
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Parity {
    type Err = InvalidSetting;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "even" => Ok(Self::Even),
            "odd" => Ok(Self::Odd),
            "mark" => Ok(Self::Mark),
            "space" => Ok(Self::Space),
            _ => Err(InvalidSetting {
                given: s.to_string(),
                allowed: Self::ALLOWED,
            }),
        }
    }
}

impl TryFrom<Parity> for serialport::Parity {
    type Error = PortError;

    fn try_from(parity: Parity) -> Result<Self, Self::Error> {
        match parity {
            Parity::None => Ok(serialport::Parity::None),
            Parity::Odd => Ok(serialport::Parity::Odd),
            Parity::Even => Ok(serialport::Parity::Even),
            Parity::Mark | Parity::Space => {
                Err(PortError::unsupported(format!("parity '{parity}'")))
            }
        }
    }
}

/// Number of stop bits. Serialized as the number itself (`1`, `1.5`, `2`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "f64")]
pub enum StopBits {
    One,
    OnePointFive,
    Two,
}

impl StopBits {
    pub const ALLOWED: &'static str = "1, 1.5, 2";
}

impl TryFrom<f64> for StopBits {
    type Error = InvalidSetting;

    fn try_from(bits: f64) -> Result<Self, Self::Error> {
        if bits == 1.0 {
            Ok(Self::One)
        } else if bits == 1.5 {
            Ok(Self::OnePointFive)
        } else if bits == 2.0 {
            Ok(Self::Two)
        } else {
            Err(InvalidSetting {
                given: bits.to_string(),
                allowed: Self::ALLOWED,
            })
        }
    }
}

impl FromStr for StopBits {
    type Err = InvalidSetting;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidSetting {
            given: s.to_string(),
            allowed: Self::ALLOWED,
        };
        s.trim()
            .parse::<f64>()
            .map_err(|_| invalid())
            .and_then(|bits| Self::try_from(bits).map_err(|_| invalid()))
    }
}

impl fmt::Display for StopBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::One => "1",
            Self::OnePointFive => "1.5",
            Self::Two => "2",
        })
    }
}

impl Serialize for StopBits {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::One => serializer.serialize_u8(1),
            Self::OnePointFive => serializer.serialize_f64(1.5),
            Self::Two => serializer.serialize_u8(2),
        }
    }
}

impl TryFrom<StopBits> for serialport::StopBits {
    type Error = PortError;

    fn try_from(bits: StopBits) -> Result<Self, Self::Error> {
        match bits {
            StopBits::One => Ok(serialport::StopBits::One),
            StopBits::Two => Ok(serialport::StopBits::Two),
            StopBits::OnePointFive => Err(PortError::unsupported("1.5 stop bits")),
        }
    }
}

/// Trait for serial port I/O operations on one open handle.
///
/// Dropping the handle closes the port.
pub trait SerialPortAdapter: Send + fmt::Debug {
    /// Write bytes to the serial port.
    ///
    /// Returns the number of bytes actually written.
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError>;

    /// Read bytes from the serial port into the provided buffer.
    ///
    /// Returns the number of bytes actually read.
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Number of received bytes waiting in the input buffer.
    fn bytes_to_read(&self) -> Result<usize, PortError>;

    /// Get the name/path of this serial port.
    fn name(&self) -> &str;
}

/// Opens serial handles from a configuration snapshot.
pub trait PortConnector: Send + Sync + fmt::Debug {
    /// Open a new handle. Must fail rather than block forever when the device is absent.
    fn open(&self, config: &PortConfiguration) -> Result<PortAdapter, PortError>;

    /// Ports the connector can currently see.
    fn available_ports(&self) -> Result<Vec<String>, PortError> {
        Ok(Vec::new())
    }
}

mod command_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        String::deserialize(deserializer).map(String::into_bytes)
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
