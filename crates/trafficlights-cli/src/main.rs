//! `trafficlights` command line client
//!
//! ```text
//! trafficlights --list-ports
//! trafficlights --list-colors
//! trafficlights -p /dev/ttyACM0 -c green
//! ```

mod cli;

use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use trafficlights_core::protocol::{
    is_known_port, list, list_ports, resolve, SerialSession, SessionConfig,
};

use cli::{Action, Cli, OutputFormat};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    match cli.action() {
        Action::ListPorts => print_ports(cli.format),
        Action::ListColors => print_colors(cli.format),
        Action::Switch { port, color } => switch_color(&port, &color, cli.timeout_ms).await,
        Action::Idle => {
            tracing::info!("Nothing to do, pass --port and --color or see --help");
            Ok(())
        }
    }
}

fn print_ports(format: OutputFormat) -> Result<()> {
    let ports = list_ports();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&ports)?),
        OutputFormat::Text => {
            println!("List of available COM ports:");
            for (num, port) in ports.iter().enumerate() {
                println!("    Port #{}: {}", num, port.describe());
            }
        }
    }
    Ok(())
}

fn print_colors(format: OutputFormat) -> Result<()> {
    let colors = list();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&colors)?),
        OutputFormat::Text => {
            println!("List of valid color names:");
            for command in &colors {
                println!("    - {}", command.name());
            }
        }
    }
    Ok(())
}

async fn switch_color(port: &str, color: &str, timeout_ms: u64) -> Result<()> {
    let command = resolve(color);
    if let Err(e) = &command {
        tracing::warn!("{}", e);
    }
    let port_valid = is_known_port(port);
    if !port_valid {
        tracing::warn!("Invalid port: {}", port);
    }
    let (Ok(command), true) = (command, port_valid) else {
        bail!("One or more required parameters are not correctly set, aborting.");
    };

    let token = CancellationToken::new();
    let ctrl_c = {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, closing the port");
                token.cancel();
            }
        })
    };

    let config = SessionConfig::new(port).with_connect_timeout(timeout_ms);
    let mut session = SerialSession::new(config).with_cancellation(token);

    let result = async {
        session.open().await?;
        session.send_command(&command).await?;
        Ok::<(), anyhow::Error>(())
    }
    .await;

    ctrl_c.abort();
    result
}
