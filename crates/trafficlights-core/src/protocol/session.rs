//! Session management
//!
//! Handles the lifecycle of one connection to the traffic light controller:
//! open and configure the port, wait until it reports ready, send a single
//! command and close again.
//!
//! Every access to the device handle (configure, readiness check, write,
//! listener reads, release) goes through the same lock, so the inbound
//! listener can never interleave with a write.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{
    device::{DeviceOpener, LineSettings, SystemOpener},
    listener::{self, InboundData, SharedDevice},
    ColorCommand, ConnectErrorKind, ConnectFailure, TransmitFailure, DEFAULT_CONNECT_TIMEOUT_MS,
    LISTEN_INTERVAL, READY_POLL_INTERVAL, SETTLE_AFTER_WRITE, SETTLE_BEFORE_WRITE,
};

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not connected
    Closed,
    /// Port acquired, waiting for it to report ready
    Opening,
    /// Connected and ready for a command
    Ready,
    /// Opening failed, the device has been released
    Failed,
}

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Serial port name
    pub device_path: String,
    /// How long the readiness poll may take, in milliseconds
    pub connect_timeout_ms: u64,
}

impl SessionConfig {
    /// Config for `device_path` with the default connect timeout
    pub fn new(device_path: impl Into<String>) -> Self {
        Self {
            device_path: device_path.into(),
            ..Self::default()
        }
    }

    /// Replace the connect timeout
    pub fn with_connect_timeout(mut self, timeout_ms: u64) -> Self {
        self.connect_timeout_ms = timeout_ms;
        self
    }

    /// Connect timeout as a duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            device_path: String::new(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }
}

/// Timing of the exchange with the controller.
///
/// The settle delays give the controller time to boot after the port
/// opens and the UART time to shift the byte out before the port closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    /// Wait between open and the write
    pub settle_before: Duration,
    /// Wait between the write and close
    pub settle_after: Duration,
    /// Interval between readiness checks
    pub ready_poll_interval: Duration,
    /// Interval at which the listener checks for inbound bytes
    pub listen_interval: Duration,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            settle_before: SETTLE_BEFORE_WRITE,
            settle_after: SETTLE_AFTER_WRITE,
            ready_poll_interval: READY_POLL_INTERVAL,
            listen_interval: LISTEN_INTERVAL,
        }
    }
}

/// One connection to the controller.
///
/// A session is opened at most once. After [`SerialSession::send_command`]
/// or [`SerialSession::close`] it stays closed; reconnecting takes a new
/// session.
pub struct SerialSession {
    config: SessionConfig,
    timing: SessionTiming,
    line: LineSettings,
    state: SessionState,
    /// Set once `open` has been attempted
    used: bool,
    device: SharedDevice,
    diagnostics: Option<mpsc::UnboundedSender<InboundData>>,
    /// Caller supplied, cancels waits
    cancel: CancellationToken,
    /// Child of `cancel`, stops the listener
    listener_stop: CancellationToken,
    listener: Option<JoinHandle<()>>,
}

impl SerialSession {
    /// Create a new session (not yet connected)
    pub fn new(config: SessionConfig) -> Self {
        let cancel = CancellationToken::new();
        Self {
            config,
            timing: SessionTiming::default(),
            line: LineSettings::default(),
            state: SessionState::Closed,
            used: false,
            device: Arc::new(Mutex::new(None)),
            diagnostics: None,
            listener_stop: cancel.child_token(),
            cancel,
            listener: None,
        }
    }

    /// Override the protocol timing
    pub fn with_timing(mut self, timing: SessionTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Deliver inbound data to this channel instead of the log
    pub fn with_diagnostics(mut self, sink: mpsc::UnboundedSender<InboundData>) -> Self {
        self.diagnostics = Some(sink);
        self
    }

    /// Cancelling `token` interrupts the readiness poll and the settle delays
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.listener_stop = token.child_token();
        self.cancel = token;
        self
    }

    /// Get current session state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Configuration the session was created with
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Protocol timing in effect
    pub fn timing(&self) -> &SessionTiming {
        &self.timing
    }

    /// Port this session talks to
    pub fn device_path(&self) -> &str {
        &self.config.device_path
    }

    /// Open the configured serial port
    pub async fn open(&mut self) -> Result<(), ConnectFailure> {
        self.open_with(&SystemOpener).await
    }

    /// Open the port through `opener`.
    ///
    /// On failure the listener is stopped and the device released before
    /// the error is returned.
    pub async fn open_with(&mut self, opener: &dyn DeviceOpener) -> Result<(), ConnectFailure> {
        if self.used {
            return Err(ConnectFailure::invalid_state(&self.config.device_path));
        }
        self.used = true;
        self.state = SessionState::Opening;

        tracing::info!(
            "Connecting to {} at {} baud",
            self.config.device_path,
            self.line.baud_rate
        );

        match self.connect(opener).await {
            Ok(()) => {
                self.state = SessionState::Ready;
                tracing::info!("Connected to {}", self.config.device_path);
                Ok(())
            }
            Err(e) => {
                self.release().await;
                self.state = SessionState::Failed;
                tracing::debug!("Open failed on {}: {:?}", self.config.device_path, e.kind());
                Err(e)
            }
        }
    }

    async fn connect(&mut self, opener: &dyn DeviceOpener) -> Result<(), ConnectFailure> {
        let path = self.config.device_path.clone();

        {
            let mut guard = self.device.lock().await;

            let mut dev = opener
                .open(&path, &self.line)
                .map_err(|e| ConnectFailure::with_cause(&path, ConnectErrorKind::DeviceOpen, e))?;

            dev.configure(&self.line)
                .map_err(|e| ConnectFailure::with_cause(&path, ConnectErrorKind::Configure, e))?;

            if self.line.suppress_reset {
                match dev.suppress_reset() {
                    Ok(()) => tracing::debug!("DTR suppressed on {}", path),
                    // The controller may reset on this platform, nothing more to do
                    Err(e) => tracing::warn!("Could not suppress DTR on {}: {} (continuing)", path, e),
                }
            }

            *guard = Some(dev);
        }

        // Listen before declaring ready so early output is not lost.
        // The listener owns the only sender, so the sink sees the channel
        // close once the listener stops.
        let sink = self
            .diagnostics
            .take()
            .unwrap_or_else(listener::spawn_log_sink);
        self.listener = Some(listener::spawn(
            self.device.clone(),
            path,
            self.timing.listen_interval,
            sink,
            self.listener_stop.clone(),
        ));

        self.wait_until_ready().await
    }

    /// Poll the device until it reports ready or the connect timeout runs out
    async fn wait_until_ready(&self) -> Result<(), ConnectFailure> {
        let path = &self.config.device_path;
        let timeout = self.config.connect_timeout();
        let start = Instant::now();

        loop {
            if self.check_ready().await {
                tracing::debug!("{} ready after {:?}", path, start.elapsed());
                return Ok(());
            }
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Err(ConnectFailure::timeout(path, self.config.connect_timeout_ms));
            }

            // Never sleep past the deadline, the last check lands on it
            let nap = self.timing.ready_poll_interval.min(timeout - elapsed);
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(ConnectFailure::interrupted(path)),
                _ = tokio::time::sleep(nap) => {}
            }
        }
    }

    async fn check_ready(&self) -> bool {
        let mut guard = self.device.lock().await;
        guard.as_mut().map(|dev| dev.is_ready()).unwrap_or(false)
    }

    /// Send a command to the controller, then close the session.
    ///
    /// The write is framed by the settle delays. The session is closed
    /// afterwards whether or not the write went through.
    pub async fn send_command(&mut self, command: &ColorCommand) -> Result<(), TransmitFailure> {
        if self.state != SessionState::Ready {
            return Err(TransmitFailure::not_ready(&self.config.device_path));
        }

        let result = self.transmit(command).await;
        if let Err(e) = &result {
            tracing::debug!("Send failed on {}: {:?}", self.config.device_path, e.kind());
        }

        self.settle(self.timing.settle_after).await;
        self.close().await;
        result
    }

    async fn transmit(&self, command: &ColorCommand) -> Result<(), TransmitFailure> {
        let path = &self.config.device_path;

        if !self.settle(self.timing.settle_before).await {
            return Err(TransmitFailure::interrupted(path));
        }

        let mut guard = self.device.lock().await;
        let dev = guard
            .as_mut()
            .ok_or_else(|| TransmitFailure::not_ready(path))?;

        dev.write_all(&command.to_bytes())
            .and_then(|_| dev.flush())
            .map_err(|e| TransmitFailure::write(path, e))?;

        tracing::info!(
            "Sent '{}' ({}) to {}",
            command.wire_code as char,
            command.name(),
            path
        );
        Ok(())
    }

    /// Sleep for `delay` unless cancelled first. Returns false when cancelled.
    async fn settle(&self, delay: Duration) -> bool {
        tracing::debug!("Waiting {}ms on {}", delay.as_millis(), self.config.device_path);
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }

    /// Close the session. Closing twice is a no-op.
    pub async fn close(&mut self) {
        let released = self.release().await;
        if self.state == SessionState::Ready {
            self.state = SessionState::Closed;
        }
        if released {
            tracing::info!("Closed connection to {}", self.config.device_path);
        }
    }

    /// Stop the listener, then drop the device handle. Returns whether a
    /// handle was actually released.
    async fn release(&mut self) -> bool {
        self.listener_stop.cancel();
        if let Some(handle) = self.listener.take() {
            if let Err(e) = handle.await {
                tracing::warn!("Listener for {} ended abnormally: {}", self.config.device_path, e);
            }
        }
        self.device.lock().await.take().is_some()
    }
}

impl Drop for SerialSession {
    fn drop(&mut self) {
        // The listener holds its own handle to the device; make it let go
        self.listener_stop.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_default() {
        let config = SessionConfig::default();
        assert!(config.device_path.is_empty());
        assert_eq!(config.connect_timeout_ms, 2000);
        assert_eq!(config.connect_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn test_session_config_builder() {
        let config = SessionConfig::new("/dev/ttyACM0").with_connect_timeout(500);
        assert_eq!(config.device_path, "/dev/ttyACM0");
        assert_eq!(config.connect_timeout_ms, 500);
    }

    #[test]
    fn test_default_timing() {
        let timing = SessionTiming::default();
        assert_eq!(timing.settle_before, Duration::from_millis(2000));
        assert_eq!(timing.settle_after, Duration::from_millis(2000));
        assert_eq!(timing.ready_poll_interval, Duration::from_millis(10));
    }

    #[test]
    fn test_new_session_is_closed() {
        let session = SerialSession::new(SessionConfig::new("COM3"));
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(session.device_path(), "COM3");
    }

    #[tokio::test]
    async fn test_send_without_open_is_rejected() {
        let mut session = SerialSession::new(SessionConfig::new("COM3"));
        let err = session
            .send_command(&ColorCommand::new(crate::protocol::Color::Red))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::protocol::TransmitErrorKind::NotReady);
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_open_missing_port_fails() {
        let mut session = SerialSession::new(
            SessionConfig::new("/dev/does-not-exist-trafficlights").with_connect_timeout(100),
        );
        let err = session.open().await.unwrap_err();
        assert_eq!(err.kind(), ConnectErrorKind::DeviceOpen);
        assert_eq!(session.state(), SessionState::Failed);
    }
}
