//! Command line arguments

use clap::{Parser, ValueEnum};
use trafficlights_core::protocol::DEFAULT_CONNECT_TIMEOUT_MS;

/// Command line client for controlling the traffic lights.
///
/// Listing ports takes precedence over listing colors, and any listing takes
/// precedence over switching.
#[derive(Parser, Debug)]
#[command(name = "trafficlights", version, about, long_about = None)]
pub struct Cli {
    /// List the available serial ports and exit
    #[arg(long)]
    pub list_ports: bool,

    /// List all supported colors and exit
    #[arg(long)]
    pub list_colors: bool,

    /// Serial port the traffic light controller is attached to
    #[arg(short, long, env = "TRAFFICLIGHTS_PORT")]
    pub port: Option<String>,

    /// The color the traffic light should switch to
    #[arg(short, long, requires = "port")]
    pub color: Option<String>,

    /// Milliseconds to wait for the port to become ready
    #[arg(short = 't', long = "timeout", value_name = "MS", default_value_t = DEFAULT_CONNECT_TIMEOUT_MS)]
    pub timeout_ms: u64,

    /// Output format for listings
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// What a parsed command line asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    ListPorts,
    ListColors,
    Switch { port: String, color: String },
    /// Neither a listing nor a complete switch request
    Idle,
}

impl Cli {
    pub fn action(&self) -> Action {
        if self.list_ports {
            return Action::ListPorts;
        }
        if self.list_colors {
            return Action::ListColors;
        }
        match (&self.port, &self.color) {
            (Some(port), Some(color)) if !port.trim().is_empty() && !color.trim().is_empty() => {
                Action::Switch {
                    port: port.clone(),
                    color: color.clone(),
                }
            }
            _ => Action::Idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("trafficlights").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_switch_request() {
        let cli = parse(&["-p", "/dev/ttyACM0", "-c", "green"]);
        assert_eq!(
            cli.action(),
            Action::Switch {
                port: "/dev/ttyACM0".to_string(),
                color: "green".to_string(),
            }
        );
        assert_eq!(cli.timeout_ms, 2000);
    }

    #[test]
    fn test_long_options() {
        let cli = parse(&["--port=COM3", "--color", "RED", "--timeout", "500"]);
        assert_eq!(cli.port.as_deref(), Some("COM3"));
        assert_eq!(cli.color.as_deref(), Some("RED"));
        assert_eq!(cli.timeout_ms, 500);
    }

    #[test]
    fn test_listing_takes_precedence() {
        let cli = parse(&["--list-colors", "--list-ports", "-p", "COM3", "-c", "red"]);
        assert_eq!(cli.action(), Action::ListPorts);

        let cli = parse(&["--list-colors", "-p", "COM3", "-c", "red"]);
        assert_eq!(cli.action(), Action::ListColors);
    }

    #[test]
    fn test_json_format() {
        let cli = parse(&["--list-colors", "--format", "json"]);
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn test_blank_color_is_idle() {
        let cli = parse(&["-p", "COM3", "-c", "  "]);
        assert_eq!(cli.action(), Action::Idle);
    }

    #[test]
    fn test_color_requires_port() {
        let result = Cli::try_parse_from(["trafficlights", "-c", "red"]);
        if std::env::var_os("TRAFFICLIGHTS_PORT").is_none() {
            assert!(result.is_err());
        }
    }

    #[test]
    fn test_invalid_timeout_rejected() {
        let result = Cli::try_parse_from(["trafficlights", "-p", "COM3", "-c", "red", "-t", "soon"]);
        assert!(result.is_err());
    }
}
