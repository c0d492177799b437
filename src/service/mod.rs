//! Service layer for the scale connection.
//!
//! `ScaleService` is the only owner of the serial handle. It applies settings
//! updates field by field, reopens the port after every update and performs
//! weight reads. All of it funnels through one lock on `ScaleState`.
//!
//! # Architecture
//!
//! ```text
//! REST API ──> ScaleService ──> AppState (Arc<Mutex<ScaleState>>)
//!                   │
//!                   └──> PortConnector ──> serial driver / simulated scale
//! ```
//!
//! Every public operation is total: failures come back as values
//! (`UpdateResult::errors`, `UpdateResult::connection_error`, `ReadError`),
//! never as panics.

use crate::{
    port::{
        DataBits, Parity, PortAdapter, PortConfiguration, PortConnector, PortError, StopBits,
    },
    state::{AppState, ConnectionState, ScaleState},
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

// ========== Error Types ==========

/// Why a weight read produced no reading.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    /// No connection is open; apply settings first.
    #[error("Serial port is not connected")]
    NotConnected,
    /// Sending the read command failed. The port has been closed.
    #[error("Failed to send read command: {0}")]
    WriteFailed(String),
    /// The transport timed out. The port has been closed.
    #[error("Serial port timed out: {0}")]
    Timeout(String),
    /// Collecting the reply failed. The port has been closed.
    #[error("Failed to read scale response: {0}")]
    ReadFailed(String),
}

impl ReadError {
    /// Stable identifier for the failure kind, used in responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotConnected => "NotConnected",
            Self::WriteFailed(_) => "WriteFailed",
            Self::Timeout(_) => "Timeout",
            Self::ReadFailed(_) => "ReadFailed",
        }
    }

    fn on_write(err: PortError) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else {
            Self::WriteFailed(err.to_string())
        }
    }

    fn on_read(err: PortError) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else {
            Self::ReadFailed(err.to_string())
        }
    }
}

/// Result of one `read_weight` call.
pub type ReadResult = Result<WeightReading, ReadError>;

// ========== Request/Response DTOs ==========

/// A partial settings change, exactly as received from a client.
///
/// Values stay as raw text so each one can be validated and reported on its
/// own. Absent and empty fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SettingsUpdate {
    pub port: Option<String>,
    pub baud_rate: Option<String>,
    pub parity: Option<String>,
    pub stop_bits: Option<String>,
    pub byte_size: Option<String>,
}

impl SettingsUpdate {
    /// Build an update from raw `key=value` pairs.
    ///
    /// The first value of a repeated key wins. Unknown keys are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut update = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "port" => &mut update.port,
                "baud_rate" => &mut update.baud_rate,
                "parity" => &mut update.parity,
                "stop_bits" => &mut update.stop_bits,
                "byte_size" => &mut update.byte_size,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into());
            }
        }
        update
    }

    /// Supplied, non-empty fields in a fixed order.
    fn supplied(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("port", &self.port),
            ("baud_rate", &self.baud_rate),
            ("parity", &self.parity),
            ("stop_bits", &self.stop_bits),
            ("byte_size", &self.byte_size),
        ]
        .into_iter()
        .filter_map(|(name, value)| {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(|v| (name, v))
        })
    }
}

/// A rejected field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub given_value: String,
    pub error: String,
}

/// Outcome of a settings update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateResult {
    /// Fields that passed validation and were merged.
    pub applied: Vec<&'static str>,
    /// Fields that failed validation, keyed by field name.
    pub errors: BTreeMap<&'static str, FieldError>,
    /// Set when the port could not be opened with the resulting settings.
    pub connection_error: Option<String>,
    /// Whether the port is open after the update.
    pub connected: bool,
    /// The configuration now in effect.
    pub settings: PortConfiguration,
}

impl UpdateResult {
    /// No field errors and the port opened.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty() && self.connection_error.is_none()
    }
}

/// Bytes the scale returned for one read command, passed through unparsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeightReading {
    pub raw: Vec<u8>,
}

impl WeightReading {
    /// The reply as text; invalid UTF-8 is replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.raw).into_owned()
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

// ========== Service Implementation ==========

/// Connection manager and read operation for the scale.
#[derive(Clone)]
pub struct ScaleService {
    state: AppState,
    connector: Arc<dyn PortConnector>,
}

impl std::fmt::Debug for ScaleService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScaleService")
            .field("connector", &self.connector)
            .finish_non_exhaustive()
    }
}

impl ScaleService {
    /// Create a service starting Closed with the given configuration.
    pub fn new(connector: Arc<dyn PortConnector>, config: PortConfiguration) -> Self {
        Self {
            state: Arc::new(Mutex::new(ScaleState::new(config))),
            connector,
        }
    }

    /// The configuration most recently applied, whether or not it opened.
    pub fn settings(&self) -> PortConfiguration {
        self.state.lock().config.clone()
    }

    /// Whether the port is currently open.
    pub fn is_open(&self) -> bool {
        self.state.lock().connection.is_open()
    }

    /// Validate and merge `update`, then close and reopen the port.
    ///
    /// Invalid fields are reported and keep their previous value. The merged
    /// configuration becomes active even when the port fails to open; the
    /// previous connection is not restored in that case.
    pub fn update_settings(&self, update: &SettingsUpdate) -> UpdateResult {
        let mut st = self.state.lock();

        let mut candidate = st.config.clone();
        let mut applied = Vec::new();
        let mut errors = BTreeMap::new();
        for (field, value) in update.supplied() {
            match apply_field(&mut candidate, field, value) {
                Ok(()) => applied.push(field),
                Err(message) => {
                    warn!(field, value, %message, "Rejected settings field");
                    errors.insert(
                        field,
                        FieldError {
                            given_value: value.to_string(),
                            error: message,
                        },
                    );
                }
            }
        }

        if st.close() {
            info!("Closed serial port for reconfiguration");
        }
        st.config = candidate;

        let connection_error = match self.connector.open(&st.config) {
            Ok(port) => {
                info!(
                    port = port.name(),
                    baud_rate = st.config.baud_rate,
                    parity = %st.config.parity,
                    stop_bits = %st.config.stop_bits,
                    byte_size = u8::from(st.config.byte_size),
                    "Opened serial port"
                );
                st.connection = ConnectionState::Open { port };
                None
            }
            Err(e) => {
                let message = self.describe_open_failure(&e);
                warn!(port = ?st.config.port, error = %message, "Failed to open serial port; staying disconnected");
                Some(message)
            }
        };

        UpdateResult {
            applied,
            errors,
            connection_error,
            connected: st.connection.is_open(),
            settings: st.config.clone(),
        }
    }

    /// `update_settings` followed by `settings`.
    pub fn update_and_get_settings(&self, update: &SettingsUpdate) -> UpdateResult {
        let mut result = self.update_settings(update);
        result.settings = self.settings();
        result
    }

    /// Reopen the port with the current settings.
    pub fn connect(&self) -> UpdateResult {
        self.update_settings(&SettingsUpdate::default())
    }

    /// Send the read command, wait the configured duration and drain the reply.
    ///
    /// Holds the state lock for the whole exchange, so reads and updates are
    /// serialized. Any I/O failure closes the port.
    pub fn read_weight(&self) -> ReadResult {
        let mut st = self.state.lock();
        let ScaleState { config, connection } = &mut *st;

        let port = match connection {
            ConnectionState::Open { port } => port,
            ConnectionState::Closed => return Err(ReadError::NotConnected),
        };

        match exchange(port, config) {
            Ok(raw) => {
                debug!(bytes = raw.len(), "Drained scale response");
                Ok(WeightReading { raw })
            }
            Err(e) => {
                error!(error = %e, "Scale read failed; closing serial port");
                st.close();
                Err(e)
            }
        }
    }

    /// Close the port, e.g. on process shutdown. Idempotent.
    pub fn shutdown(&self) {
        if self.state.lock().close() {
            info!("Serial port closed");
        }
    }

    /// Serial ports visible to the connector.
    pub fn available_ports(&self) -> Result<Vec<String>, PortError> {
        self.connector.available_ports()
    }

    fn describe_open_failure(&self, err: &PortError) -> String {
        match err {
            PortError::NotFound(_) => {
                let detected = self
                    .connector
                    .available_ports()
                    .map(|ports| ports.join(", "))
                    .unwrap_or_default();
                format!("{err}. Detected ports: {detected}")
            }
            _ => err.to_string(),
        }
    }
}

/// Merge one raw field into `config`, or explain why it is out of domain.
fn apply_field(config: &mut PortConfiguration, field: &str, value: &str) -> Result<(), String> {
    match field {
        "port" => config.port = Some(value.to_string()),
        "baud_rate" => match value.trim().parse::<u32>() {
            Ok(rate) if rate > 0 => config.baud_rate = rate,
            _ => return Err("Baud rate must be a positive integer".to_string()),
        },
        "parity" => {
            config.parity = value.parse::<Parity>().map_err(|_| {
                format!("Parity must be one of the following: {}", Parity::ALLOWED)
            })?
        }
        "stop_bits" => {
            config.stop_bits = value.parse::<StopBits>().map_err(|_| {
                format!("Stop bits must be one of the following: {}", StopBits::ALLOWED)
            })?
        }
        "byte_size" => {
            config.byte_size = value.parse::<DataBits>().map_err(|_| {
                format!("Byte size must be one of the following: {}", DataBits::ALLOWED)
            })?
        }
        other => return Err(format!("Unknown setting '{other}'")),
    }
    Ok(())
}

/// Write the command, pause, then read exactly what is buffered.
fn exchange(port: &mut PortAdapter, config: &PortConfiguration) -> Result<Vec<u8>, ReadError> {
    port.write_bytes(&config.read_command)
        .map_err(ReadError::on_write)?;

    std::thread::sleep(config.wait_duration);

    let available = port.bytes_to_read().map_err(ReadError::on_read)?;
    let mut raw = vec![0u8; available];
    let mut filled = 0;
    while filled < available {
        match port.read_bytes(&mut raw[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) => return Err(ReadError::on_read(e)),
        }
    }
    raw.truncate(filled);
    Ok(raw)
}

// ========== Tests ==========
