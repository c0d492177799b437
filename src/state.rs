use parking_lot::Mutex;
use std::sync::Arc;

use crate::port::{PortAdapter, PortConfiguration};

/// A type alias for the shared, thread-safe scale state.
pub type AppState = Arc<Mutex<ScaleState>>;

/// Whether the serial connection is currently open.
#[derive(Debug, Default)]
pub enum ConnectionState {
    #[default]
    Closed,
    Open {
        /// The open handle. Dropping it closes the port.
        port: PortAdapter,
    },
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }
}

/// The active configuration and the connection handle, guarded together so an
/// update can never swap the handle out from under an in-flight read.
#[derive(Debug, Default)]
pub struct ScaleState {
    /// Last configuration that was applied, whether or not it opened.
    pub config: PortConfiguration,
    pub connection: ConnectionState,
}

impl ScaleState {
    pub fn new(config: PortConfiguration) -> Self {
        Self {
            config,
            connection: ConnectionState::Closed,
        }
    }

    /// Drop any open handle. Returns whether one was open.
    pub fn close(&mut self) -> bool {
        let was_open = self.connection.is_open();
        self.connection = ConnectionState::Closed;
        was_open
    }
}
