//! Simulated serial scale for testing.
//!
//! `MockConnector` stands in for the OS driver and hands out `MockSerialPort`
//! handles that all share one simulated device. The device can be told to
//! reply to each command after a delay, to be absent, or to fail writes and
//! reads. Every handle, write and read is recorded so tests can verify what
//! the connection manager actually did.

use super::error::PortError;
use super::traits::{PortAdapter, PortConfiguration, PortConnector, SerialPortAdapter};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Inner state of the simulated device, shared by the connector and every handle.
#[derive(Debug, Default)]
struct MockDeviceState {
    /// Ports the simulated system exposes. Empty means any name opens.
    ports: Vec<String>,
    /// Whether the device is plugged in.
    absent: bool,
    /// Bytes sent back after each write, and how long the device takes.
    reply: Option<(Vec<u8>, Duration)>,
    /// Replies scheduled but not yet "on the wire".
    pending: VecDeque<(Instant, Vec<u8>)>,
    /// Bytes that have arrived and wait in the input buffer.
    read_queue: VecDeque<u8>,
    /// Log of all bytes written, with the id of the handle that wrote them.
    write_log: Vec<(u64, Vec<u8>)>,
    fail_next_write: bool,
    fail_next_read: bool,
    timeout_next_write: bool,
    timeout_next_read: bool,
    /// Configurations that were successfully opened, in order.
    opened: Vec<PortConfiguration>,
    open_attempts: usize,
    next_handle: u64,
    /// Id of the handle most recently opened.
    latest_handle: Option<u64>,
    live_handles: usize,
    max_live_handles: usize,
    /// Operations performed on a handle after a newer one was opened.
    stale_operations: usize,
    /// Total calls to `bytes_to_read`/`read_bytes` on any handle.
    read_calls: usize,
}

impl MockDeviceState {
    fn deliver_ready(&mut self) {
        let now = Instant::now();
        while let Some((ready_at, _)) = self.pending.front() {
            if *ready_at > now {
                break;
            }
            if let Some((_, bytes)) = self.pending.pop_front() {
                self.read_queue.extend(bytes);
            }
        }
    }

    fn touch(&mut self, handle: u64) {
        if self.latest_handle != Some(handle) {
            self.stale_operations += 1;
        }
    }
}

/// Connector for the simulated scale.
///
/// # Example
/// ```
/// use scale_bridge::port::{MockConnector, PortConfiguration, PortConnector, SerialPortAdapter};
/// use std::time::Duration;
///
/// let connector = MockConnector::new();
/// connector.reply_with(b"  1.25 lb\r", Duration::ZERO);
///
/// let mut port = connector.open(&PortConfiguration::for_port("MOCK0")).unwrap();
/// port.write_bytes(b"W\r").unwrap();
///
/// let mut buffer = [0u8; 32];
/// let n = port.read_bytes(&mut buffer).unwrap();
/// assert_eq!(&buffer[..n], b"  1.25 lb\r");
/// assert_eq!(connector.write_log(), vec![b"W\r".to_vec()]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<MockDeviceState>>,
}

impl MockConnector {
    /// A connector whose device is present but silent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the simulated system to these port names; others fail with `NotFound`.
    pub fn with_ports<I, S>(ports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let connector = Self::new();
        connector.state.lock().ports = ports.into_iter().map(Into::into).collect();
        connector
    }

    /// Make the device answer every write with `reply` once `delay` has elapsed.
    pub fn reply_with(&self, reply: &[u8], delay: Duration) {
        self.state.lock().reply = Some((reply.to_vec(), delay));
    }

    /// Stop answering writes.
    pub fn silence(&self) {
        self.state.lock().reply = None;
    }

    /// Simulate unplugging (`true`) or plugging in (`false`) the device.
    pub fn set_absent(&self, absent: bool) {
        self.state.lock().absent = absent;
    }

    /// Place bytes directly into the input buffer, as if sent unprompted.
    pub fn enqueue_read(&self, data: &[u8]) {
        self.state.lock().read_queue.extend(data);
    }

    /// Make the next write fail with a broken-pipe I/O error.
    pub fn fail_next_write(&self) {
        self.state.lock().fail_next_write = true;
    }

    /// Make the next write time out.
    pub fn timeout_next_write(&self) {
        self.state.lock().timeout_next_write = true;
    }

    /// Make the next buffer query or read fail.
    pub fn fail_next_read(&self) {
        self.state.lock().fail_next_read = true;
    }

    /// Make the next buffer query or read time out.
    pub fn timeout_next_read(&self) {
        self.state.lock().timeout_next_read = true;
    }

    /// All bytes written so far, one entry per write.
    pub fn write_log(&self) -> Vec<Vec<u8>> {
        self.state
            .lock()
            .write_log
            .iter()
            .map(|(_, data)| data.clone())
            .collect()
    }

    /// Number of writes performed on any handle.
    pub fn write_count(&self) -> usize {
        self.state.lock().write_log.len()
    }

    /// Number of buffer queries and reads performed on any handle.
    pub fn read_count(&self) -> usize {
        self.state.lock().read_calls
    }

    /// Configurations that opened successfully, oldest first.
    pub fn opened_configs(&self) -> Vec<PortConfiguration> {
        self.state.lock().opened.clone()
    }

    /// Number of open attempts, successful or not.
    pub fn open_attempts(&self) -> usize {
        self.state.lock().open_attempts
    }

    /// Handles currently open.
    pub fn live_handles(&self) -> usize {
        self.state.lock().live_handles
    }

    /// Highest number of handles that were ever open at the same time.
    pub fn max_live_handles(&self) -> usize {
        self.state.lock().max_live_handles
    }

    /// Operations performed through a handle that had already been superseded.
    pub fn stale_operations(&self) -> usize {
        self.state.lock().stale_operations
    }
}

impl PortConnector for MockConnector {
    fn open(&self, config: &PortConfiguration) -> Result<PortAdapter, PortError> {
        let mut state = self.state.lock();
        state.open_attempts += 1;

        let name = config.port.clone().ok_or(PortError::NoPortConfigured)?;
        if state.absent || (!state.ports.is_empty() && !state.ports.contains(&name)) {
            return Err(PortError::not_found(name));
        }
        if config.baud_rate == 0 {
            return Err(PortError::config("baud rate must be non-zero"));
        }

        let id = state.next_handle;
        state.next_handle += 1;
        state.latest_handle = Some(id);
        state.live_handles += 1;
        state.max_live_handles = state.max_live_handles.max(state.live_handles);
        state.opened.push(config.clone());

        Ok(Box::new(MockSerialPort {
            id,
            name,
            state: Arc::clone(&self.state),
        }))
    }

    fn available_ports(&self) -> Result<Vec<String>, PortError> {
        Ok(self.state.lock().ports.clone())
    }
}

/// One open handle on the simulated scale. Dropping it closes the port.
pub struct MockSerialPort {
    id: u64,
    name: String,
    state: Arc<Mutex<MockDeviceState>>,
}

impl SerialPortAdapter for MockSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();
        state.touch(self.id);

        if state.timeout_next_write {
            state.timeout_next_write = false;
            return Err(PortError::timeout(Duration::from_secs(1)));
        }
        if state.fail_next_write || state.absent {
            state.fail_next_write = false;
            return Err(PortError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "device disconnected",
            )));
        }

        state.write_log.push((self.id, data.to_vec()));
        if let Some((reply, delay)) = state.reply.clone() {
            state.pending.push_back((Instant::now() + delay, reply));
        }
        Ok(data.len())
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();
        state.touch(self.id);
        state.read_calls += 1;

        if state.timeout_next_read {
            state.timeout_next_read = false;
            return Err(PortError::timeout(Duration::from_secs(1)));
        }
        if state.fail_next_read {
            state.fail_next_read = false;
            return Err(PortError::Io(std::io::Error::other("read failed")));
        }
        state.deliver_ready();

        let mut bytes_read = 0;
        for byte in buffer.iter_mut() {
            match state.read_queue.pop_front() {
                Some(queued) => {
                    *byte = queued;
                    bytes_read += 1;
                }
                None => break,
            }
        }

        if bytes_read == 0 {
            Err(PortError::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "No data available",
            )))
        } else {
            Ok(bytes_read)
        }
    }

    fn bytes_to_read(&self) -> Result<usize, PortError> {
        let mut state = self.state.lock();
        state.touch(self.id);
        state.read_calls += 1;

        if state.timeout_next_read {
            state.timeout_next_read = false;
            return Err(PortError::Serial(serialport::Error::new(
                serialport::ErrorKind::Io(std::io::ErrorKind::TimedOut),
                "input buffer query timed out",
            )));
        }
        if state.fail_next_read {
            state.fail_next_read = false;
            return Err(PortError::Io(std::io::Error::other("input buffer unavailable")));
        }
        state.deliver_ready();
        Ok(state.read_queue.len())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for MockSerialPort {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.live_handles = state.live_handles.saturating_sub(1);
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}
