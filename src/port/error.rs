//! Port-specific error types.
//!
//! Transport failures are kept separate from the read taxonomy in the service
//! layer; the service decides how each one affects the connection state.

use thiserror::Error;

/// Errors that can occur while opening or using a serial port.
#[derive(Debug, Error)]
pub enum PortError {
    /// The specified serial port was not found on the system.
    #[error("Serial port not found: {0}")]
    NotFound(String),

    /// No port identifier has been configured yet.
    #[error("No serial port configured")]
    NoPortConfigured,

    /// An I/O error occurred during port operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport rejected the configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The setting is valid but this transport cannot apply it.
    #[error("{0} is not supported by the serial driver")]
    Unsupported(String),

    /// Operation timed out.
    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// A serialport-specific error occurred.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    /// Create a NotFound error from a port name.
    pub fn not_found(port_name: impl Into<String>) -> Self {
        Self::NotFound(port_name.into())
    }

    /// Create a Config error from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an Unsupported error naming the offending setting.
    pub fn unsupported(setting: impl Into<String>) -> Self {
        Self::Unsupported(setting.into())
    }

    /// Create a Timeout error from a duration.
    pub fn timeout(duration: std::time::Duration) -> Self {
        Self::Timeout(duration)
    }

    /// Whether this error means the operation ran out of time rather than failed outright.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Io(e) => e.kind() == std::io::ErrorKind::TimedOut,
            Self::Serial(e) => matches!(
                e.kind(),
                serialport::ErrorKind::Io(std::io::ErrorKind::TimedOut)
            ),
            _ => false,
        }
    }
}
