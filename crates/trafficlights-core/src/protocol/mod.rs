//! Serial Protocol Communication
//!
//! Implements the single-byte color protocol spoken by the traffic light
//! controller sketch.
//!
//! Framing is fixed at 57600 baud, 8 data bits, 1 stop bit, no parity and no
//! flow control. Each command is one ASCII byte; the controller sends no
//! acknowledgement, anything it echoes back is diagnostic only.

pub mod commands;
pub mod device;
mod error;
pub mod listener;
pub mod serial;
mod session;

pub use commands::{list, resolve, Color, ColorCommand, ColorNotFound};
pub use device::{DeviceOpener, LineSettings, SerialChannel, SerialDevice, SystemOpener};
pub use error::{Cause, ConnectErrorKind, ConnectFailure, TransmitErrorKind, TransmitFailure};
pub use listener::InboundData;
pub use serial::{is_known_port, list_ports, PortInfo};
pub use session::{SerialSession, SessionConfig, SessionState, SessionTiming};

use std::time::Duration;

/// Baud rate the controller sketch listens on
pub const BAUD_RATE: u32 = 57600;

/// Default timeout for the readiness poll in milliseconds
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2000;

/// Interval between two readiness checks while opening
pub const READY_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Wait between port open and the command write.
/// The controller may still be booting when the port comes up.
pub const SETTLE_BEFORE_WRITE: Duration = Duration::from_millis(2000);

/// Wait between the command write and closing the port, so the byte leaves
/// the UART before the handle is dropped.
pub const SETTLE_AFTER_WRITE: Duration = Duration::from_millis(2000);

/// Interval at which the inbound listener checks for received bytes
pub const LISTEN_INTERVAL: Duration = Duration::from_millis(10);
