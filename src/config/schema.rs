//! Configuration schema definitions.
//!
//! Every section is optional in the file; missing keys take the defaults below.

use crate::port::PortConfiguration;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listener
    pub server: ServerConfig,
    /// Initial serial settings for the scale
    pub scale: PortConfiguration,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to. Keep this on loopback; there is no authentication.
    pub host: String,
    /// Port number for HTTP server
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

impl ServerConfig {
    /// Parse `host:port` into a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` takes precedence
    pub filter: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    #[default]
    Pretty,
    /// Compact format
    Compact,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{DataBits, Parity, StopBits};
    use std::time::Duration;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.scale.baud_rate, 9600);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[server]"));
        assert!(toml_str.contains("[scale]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [server]
            port = 8080

            [scale]
            port = "/dev/ttyUSB0"
            parity = "none"
            stop_bits = 2
            byte_size = 8
            read_command = "P\r\n"
            wait_ms = 400
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.scale.port.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(config.scale.parity, Parity::None);
        assert_eq!(config.scale.stop_bits, StopBits::Two);
        assert_eq!(config.scale.byte_size, DataBits::Eight);
        assert_eq!(config.scale.read_command, b"P\r\n");
        assert_eq!(config.scale.wait_duration, Duration::from_millis(400));
        // Defaults should still work
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.scale.baud_rate, 9600);
    }

    #[test]
    fn test_fractional_stop_bits() {
        let config: Config = toml::from_str("[scale]\nstop_bits = 1.5\n").unwrap();
        assert_eq!(config.scale.stop_bits, StopBits::OnePointFive);
    }

    #[test]
    fn test_socket_addr() {
        let addr = ServerConfig::default().socket_addr().unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:5000");
    }
}
