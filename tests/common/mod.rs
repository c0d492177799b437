//! Shared test utilities for scale_bridge tests.
//!
//! This module provides:
//! - A service wired to the simulated scale
//! - Settings update builders
//! - JSON assertion helpers

#![allow(dead_code)]

use scale_bridge::{MockConnector, PortConfiguration, ScaleService, SettingsUpdate};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Wait used by tests so reads stay fast.
pub const TEST_WAIT: Duration = Duration::from_millis(30);

/// Default configuration on `port` with a short wait.
pub fn fast_config(port: &str) -> PortConfiguration {
    PortConfiguration {
        wait_duration: TEST_WAIT,
        ..PortConfiguration::for_port(port)
    }
}

/// A Closed service on `MOCK0` backed by a fresh simulated scale.
pub fn scale_service() -> (ScaleService, MockConnector) {
    let connector = MockConnector::new();
    let service = ScaleService::new(Arc::new(connector.clone()), fast_config("MOCK0"));
    (service, connector)
}

/// A service whose simulated scale answers `reply` after `delay`, already connected.
pub fn connected_scale(reply: &[u8], delay: Duration) -> (ScaleService, MockConnector) {
    let (service, connector) = scale_service();
    connector.reply_with(reply, delay);
    let result = service.connect();
    assert!(result.connected, "simulated scale should open: {result:?}");
    (service, connector)
}

/// Builder for settings updates.
#[derive(Default)]
pub struct UpdateBuilder(SettingsUpdate);

impl UpdateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn port(mut self, v: &str) -> Self {
        self.0.port = Some(v.to_string());
        self
    }

    pub fn baud_rate(mut self, v: &str) -> Self {
        self.0.baud_rate = Some(v.to_string());
        self
    }

    pub fn parity(mut self, v: &str) -> Self {
        self.0.parity = Some(v.to_string());
        self
    }

    pub fn stop_bits(mut self, v: &str) -> Self {
        self.0.stop_bits = Some(v.to_string());
        self
    }

    pub fn byte_size(mut self, v: &str) -> Self {
        self.0.byte_size = Some(v.to_string());
        self
    }

    pub fn build(self) -> SettingsUpdate {
        self.0
    }
}

/// Assert that a JSON value contains specific fields with expected values.
///
/// # Example
/// ```ignore
/// let actual = json!({"status": "ok", "port": "COM1"});
/// let expected = json!({"status": "ok"});
/// assert_json_contains(&actual, &expected); // Passes - actual contains all of expected
/// ```
pub fn assert_json_contains(actual: &Value, expected: &Value) {
    match (actual, expected) {
        (Value::Object(actual_map), Value::Object(expected_map)) => {
            for (key, expected_value) in expected_map {
                let actual_value = actual_map
                    .get(key)
                    .unwrap_or_else(|| panic!("Expected key '{}' not found in {}", key, actual));
                assert_json_contains(actual_value, expected_value);
            }
        }
        _ => {
            assert_eq!(
                actual, expected,
                "JSON values differ: expected {:?}, got {:?}",
                expected, actual
            );
        }
    }
}
