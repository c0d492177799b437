//! Configuration module for scale_bridge.
//!
//! Configuration comes from built-in defaults, optionally replaced by a TOML
//! file named with `--config`. Command-line arguments are applied on top in
//! `main`. Changes made over HTTP are never written back.
//!
//! # Example
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 5000
//!
//! [scale]
//! port = "/dev/ttyUSB0"
//! baud_rate = 9600
//! parity = "even"
//! stop_bits = 1
//! byte_size = 7
//! read_command = "W\r"
//! wait_ms = 250
//!
//! [logging]
//! filter = "scale_bridge=debug,info"
//! format = "compact"
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use schema::{Config, LogFormat, LoggingConfig, ServerConfig};
