//! Protocol errors

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

/// Boxed underlying cause carried by the session errors
pub type Cause = Box<dyn StdError + Send + Sync + 'static>;

/// Phase of `open` in which a connection attempt failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectErrorKind {
    /// The device did not report ready within the connect timeout
    Timeout,
    /// The readiness poll was cancelled
    Interrupted,
    /// The device could not be acquired
    DeviceOpen,
    /// The line parameters could not be applied
    Configure,
    /// The session was already opened once
    InvalidState,
}

impl fmt::Display for ConnectErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectErrorKind::Timeout => "timeout",
            ConnectErrorKind::Interrupted => "interrupted",
            ConnectErrorKind::DeviceOpen => "device open",
            ConnectErrorKind::Configure => "configure",
            ConnectErrorKind::InvalidState => "invalid state",
        };
        f.write_str(name)
    }
}

/// Signals that there was a problem connecting to a serial port.
///
/// By the time this error is returned the device has already been released.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct ConnectFailure {
    device_path: String,
    kind: ConnectErrorKind,
    message: String,
    #[source]
    cause: Option<Cause>,
}

impl ConnectFailure {
    /// Readiness poll ran past the connect timeout
    pub fn timeout(device_path: &str, timeout_ms: u64) -> Self {
        Self {
            device_path: device_path.to_string(),
            kind: ConnectErrorKind::Timeout,
            message: format!(
                "Timeout while connecting to {}, connect took longer than {} milliseconds",
                device_path, timeout_ms
            ),
            cause: None,
        }
    }

    /// Connection attempt was cancelled while waiting
    pub fn interrupted(device_path: &str) -> Self {
        Self {
            device_path: device_path.to_string(),
            kind: ConnectErrorKind::Interrupted,
            message: format!("Interrupted while connecting to {}", device_path),
            cause: None,
        }
    }

    /// Session was opened before
    pub fn invalid_state(device_path: &str) -> Self {
        Self {
            device_path: device_path.to_string(),
            kind: ConnectErrorKind::InvalidState,
            message: format!(
                "Session for {} was already used, create a new session to reconnect",
                device_path
            ),
            cause: None,
        }
    }

    /// Failure caused by an underlying device error
    pub fn with_cause(
        device_path: &str,
        kind: ConnectErrorKind,
        cause: impl Into<Cause>,
    ) -> Self {
        let cause = cause.into();
        Self {
            device_path: device_path.to_string(),
            kind,
            message: format!(
                "An error occurred while connecting to {}: {}",
                device_path, cause
            ),
            cause: Some(cause),
        }
    }

    /// Port the connection attempt was made on
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Phase in which the attempt failed
    pub fn kind(&self) -> ConnectErrorKind {
        self.kind
    }

    /// Human readable description
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Reason a command could not be transmitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmitErrorKind {
    /// Writing or flushing the byte failed
    Write,
    /// The session is not in the ready state
    NotReady,
    /// Cancelled before the byte was written
    Interrupted,
}

/// Signals that a command byte did not reach the device
#[derive(Error, Debug)]
#[error("{message}")]
pub struct TransmitFailure {
    device_path: String,
    kind: TransmitErrorKind,
    message: String,
    #[source]
    cause: Option<Cause>,
}

impl TransmitFailure {
    pub(crate) fn write(device_path: &str, cause: impl Into<Cause>) -> Self {
        let cause = cause.into();
        Self {
            device_path: device_path.to_string(),
            kind: TransmitErrorKind::Write,
            message: format!("Failed to send command to {}: {}", device_path, cause),
            cause: Some(cause),
        }
    }

    pub(crate) fn not_ready(device_path: &str) -> Self {
        Self {
            device_path: device_path.to_string(),
            kind: TransmitErrorKind::NotReady,
            message: format!("Not connected to {}", device_path),
            cause: None,
        }
    }

    pub(crate) fn interrupted(device_path: &str) -> Self {
        Self {
            device_path: device_path.to_string(),
            kind: TransmitErrorKind::Interrupted,
            message: format!("Interrupted before sending command to {}", device_path),
            cause: None,
        }
    }

    /// Port the command was meant for
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Why the transmission failed
    pub fn kind(&self) -> TransmitErrorKind {
        self.kind
    }

    /// Human readable description
    pub fn message(&self) -> &str {
        &self.message
    }
}
