//! Serial devices
//!
//! The session talks to its port through [`SerialDevice`], so a simulated
//! device can take the place of a real one.

use serialport::{DataBits, FlowControl, Parity, SerialPort, SerialPortBuilder, StopBits};
use std::io::{self, Read, Write};
use std::time::Duration;

use super::BAUD_RATE;

/// Fixed line parameters applied to the device on open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSettings {
    /// Line speed
    pub baud_rate: u32,
    /// Bits per character
    pub data_bits: DataBits,
    /// Parity checking
    pub parity: Parity,
    /// Stop bits per character
    pub stop_bits: StopBits,
    /// Hardware/software flow control
    pub flow_control: FlowControl,
    /// Keep DTR deasserted so the controller is not reset on connect.
    /// Only a hint: some platforms toggle the line regardless.
    pub suppress_reset: bool,
    /// Blocking read/write timeout of the underlying handle
    pub io_timeout: Duration,
}

impl Default for LineSettings {
    fn default() -> Self {
        Self {
            baud_rate: BAUD_RATE,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
            suppress_reset: true,
            io_timeout: Duration::from_millis(100),
        }
    }
}

/// Abstraction over the device a session talks to
pub trait SerialDevice: Read + Write + Send {
    /// Apply framing parameters
    fn configure(&mut self, settings: &LineSettings) -> io::Result<()>;

    /// Try to keep the reset (DTR) line deasserted
    fn suppress_reset(&mut self) -> io::Result<()>;

    /// Whether the device is open and usable
    fn is_ready(&mut self) -> bool;

    /// Get number of bytes available to read
    fn bytes_to_read(&mut self) -> io::Result<u32>;
}

/// Acquires devices by path
pub trait DeviceOpener {
    /// Acquire the device at `path` for exclusive use
    fn open(&self, path: &str, settings: &LineSettings) -> io::Result<Box<dyn SerialDevice>>;
}

/// Opens real serial ports through the `serialport` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemOpener;

impl DeviceOpener for SystemOpener {
    fn open(&self, path: &str, settings: &LineSettings) -> io::Result<Box<dyn SerialDevice>> {
        let builder = serialport::new(path, settings.baud_rate)
            .dtr_on_open(!settings.suppress_reset)
            .timeout(settings.io_timeout);
        let port = open_exclusive(builder)?;
        Ok(Box::new(SerialChannel::new(port)))
    }
}

/// Open a tty and lock it so no other process can use it concurrently
#[cfg(unix)]
fn open_exclusive(builder: SerialPortBuilder) -> io::Result<Box<dyn SerialPort>> {
    let mut port = serialport::TTYPort::open(&builder)?;
    port.set_exclusive(true)?;
    Ok(Box::new(port))
}

/// COM ports are never shared on Windows
#[cfg(not(unix))]
fn open_exclusive(builder: SerialPortBuilder) -> io::Result<Box<dyn SerialPort>> {
    Ok(builder.open()?)
}

/// Serial port wrapper implementing SerialDevice
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
}

impl SerialChannel {
    /// Wrap an open port
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl Read for SerialChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl SerialDevice for SerialChannel {
    fn configure(&mut self, settings: &LineSettings) -> io::Result<()> {
        self.port.set_baud_rate(settings.baud_rate)?;
        self.port.set_data_bits(settings.data_bits)?;
        self.port.set_parity(settings.parity)?;
        self.port.set_stop_bits(settings.stop_bits)?;
        self.port.set_flow_control(settings.flow_control)?;
        self.port.set_timeout(settings.io_timeout)?;
        Ok(())
    }

    fn suppress_reset(&mut self) -> io::Result<()> {
        // Same line state the controller sketch was tested with: DTR low, RTS high
        self.port.write_data_terminal_ready(false)?;
        self.port.write_request_to_send(true)?;
        Ok(())
    }

    fn is_ready(&mut self) -> bool {
        self.port.bytes_to_read().is_ok()
    }

    fn bytes_to_read(&mut self) -> io::Result<u32> {
        Ok(self.port.bytes_to_read()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_line_settings() {
        let settings = LineSettings::default();
        assert_eq!(settings.baud_rate, 57600);
        assert_eq!(settings.data_bits, DataBits::Eight);
        assert_eq!(settings.parity, Parity::None);
        assert_eq!(settings.stop_bits, StopBits::One);
        assert_eq!(settings.flow_control, FlowControl::None);
        assert!(settings.suppress_reset);
    }

    #[test]
    fn test_open_missing_port_fails() {
        let result = SystemOpener.open("/dev/does-not-exist-trafficlights", &LineSettings::default());
        assert!(result.is_err());
    }
}
