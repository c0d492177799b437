//! Scale Bridge Library
//!
//! Exposes a serial-port postal scale to browser clients over a small local
//! HTTP interface.
//!
//! # Modules
//!
//! - `config`: TOML configuration and defaults
//! - `state`: Shared connection state
//! - `error`: Process-level error handling
//! - `port`: Port abstraction layer for serial communication
//! - `service`: Connection manager and weight reads
//! - `rest_api`: HTTP handlers

pub mod config;
pub mod error;
pub mod port;
pub mod rest_api;
pub mod service;
pub mod state;

// Re-export commonly used types for convenience
pub use error::{AppError, AppResult};
pub use port::{
    DataBits, MockConnector, Parity, PortConfiguration, PortConnector, PortError,
    SerialConnector, SerialPortAdapter, StopBits, SyncSerialPort,
};
pub use service::{
    FieldError, ReadError, ReadResult, ScaleService, SettingsUpdate, UpdateResult,
    WeightReading,
};
pub use state::{AppState, ConnectionState, ScaleState};

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
