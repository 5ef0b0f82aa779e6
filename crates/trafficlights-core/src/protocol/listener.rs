//! Inbound data listener
//!
//! The controller sketch prints debug output on the serial line. A session
//! runs one listener task that drains whatever has arrived and forwards it
//! to a diagnostic sink over a channel. Nothing on this path is required by
//! the protocol, so read errors are logged and the listener keeps going.

use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::device::SerialDevice;

/// Device handle shared between the foreground session and its listener.
/// `None` once the device has been released.
pub(crate) type SharedDevice = Arc<Mutex<Option<Box<dyn SerialDevice>>>>;

/// One burst of bytes received from the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundData {
    /// Bytes exactly as read from the port
    pub bytes: Vec<u8>,
}

impl InboundData {
    /// Wrap one burst of received bytes
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Bytes decoded as text, invalid UTF-8 replaced
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    /// Numeric value of every byte, comma separated.
    ///
    /// Values are unsigned (0-255). The older tool printed signed bytes,
    /// so 0xFF showed up there as -1 and shows up here as 255.
    pub fn raw(&self) -> String {
        self.bytes
            .iter()
            .map(|b| b.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for InboundData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (raw: {})", self.text(), self.raw())
    }
}

/// Read everything the device currently has buffered in one go
pub(crate) fn drain(device: &mut dyn SerialDevice) -> io::Result<Vec<u8>> {
    let available = device.bytes_to_read()? as usize;
    if available == 0 {
        return Ok(Vec::new());
    }

    let mut buf = vec![0u8; available];
    match device.read(&mut buf) {
        Ok(n) => {
            buf.truncate(n);
            Ok(buf)
        }
        Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

/// Spawn the listener for a session.
///
/// The task stops when `shutdown` is cancelled or when it finds the device
/// released. It only ever reads, and only while holding the device lock.
pub(crate) fn spawn(
    device: SharedDevice,
    device_path: String,
    interval: Duration,
    sink: mpsc::UnboundedSender<InboundData>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }

            let mut guard = device.lock().await;
            let Some(dev) = guard.as_mut() else {
                break;
            };

            match drain(dev.as_mut()) {
                Ok(bytes) if bytes.is_empty() => {}
                Ok(bytes) => {
                    if sink.send(InboundData::new(bytes)).is_err() {
                        tracing::debug!("Diagnostic sink for {} closed", device_path);
                    }
                }
                Err(e) => {
                    tracing::warn!("Error reading incoming data from {}: {}", device_path, e);
                }
            }
        }
        tracing::debug!("Listener for {} stopped", device_path);
    })
}

/// Sink used when the caller did not ask for the inbound data itself:
/// every burst goes to the log.
pub(crate) fn spawn_log_sink() -> mpsc::UnboundedSender<InboundData> {
    let (tx, mut rx) = mpsc::unbounded_channel::<InboundData>();
    tokio::spawn(async move {
        while let Some(data) = rx.recv().await {
            tracing::info!("Incoming serial data: {}", data);
        }
    });
    tx
}
