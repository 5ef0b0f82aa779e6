//! # TrafficLights Core Library
//!
//! Core functionality for switching Arduino-driven traffic lights over a
//! serial link.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - The registry of colors and their single-byte wire codes
//! - A serial session that opens the port, waits until it is ready, sends
//!   one command framed by settle delays and closes again
//! - A background listener that forwards the controller's debug output
//! - Serial port enumeration
//!
//! ## Example
//!
//! ```rust,no_run
//! use trafficlights_core::protocol::{resolve, SerialSession, SessionConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let command = resolve("green")?;
//!
//! let mut session = SerialSession::new(SessionConfig::new("/dev/ttyACM0"));
//! session.open().await?;
//! session.send_command(&command).await?;
//! # Ok(())
//! # }
//! ```

pub mod protocol;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::protocol::{
        list, list_ports, resolve, Color, ColorCommand, ConnectFailure, SerialSession,
        SessionConfig, SessionState, TransmitFailure,
    };
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
