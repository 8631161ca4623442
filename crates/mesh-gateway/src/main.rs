//! Mesh gateway — entry point.
//!
//! This binary bridges a hardware mesh network (reached over a serial link)
//! to web clients and to peer instances of itself.  A message addressed to a
//! device ID is delivered to every connected web client on every gateway,
//! regardless of which gateway the message entered through.
//!
//! # Usage
//!
//! ```text
//! mesh-gateway <HTTP_PORT> [SERIAL_DEVICE]
//!
//! Arguments:
//!   HTTP_PORT       WebSocket listener port (also selects this instance's
//!                   identity within --gateways)
//!   SERIAL_DEVICE   Serial device of the mesh coordinator; discovered by USB
//!                   enumeration when omitted
//!
//! Options:
//!   --bind <IP>           Listen interface [default: 0.0.0.0]
//!   --gateways <LIST>     Comma-separated full-mesh gateway addresses
//!                         [default: 0.0.0.0:3001,0.0.0.0:3002,0.0.0.0:3003]
//! ```
//!
//! # Startup order
//!
//! 1. Parse CLI arguments (invalid input prints usage and exits).
//! 2. Resolve and open the serial device (failure is fatal).
//! 3. Bind the listener and derive the self address from it.
//! 4. Start the dispatcher, the serial reader, and the peer connectors.
//! 5. Accept connections until Ctrl+C.
//!
//! Deriving the self address *before* dialling peers matters: it is both how
//! the instance excludes itself from the configured mesh set and what it
//! announces to the peers it dials.

use std::net::IpAddr;
use std::process;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mesh_gateway::application::{run_dispatcher, EndpointRegistry};
use mesh_gateway::domain::GatewayConfig;
use mesh_gateway::infrastructure::{
    connect_to_peers, open_link, resolve_device, run_serial_reader, run_server, LinkError,
};

/// Usage text printed on any startup problem an operator can fix.
const USAGE: &str = "Usage: mesh-gateway HTTP_PORT [SERIAL_DEVICE]\n\
                     Try 'mesh-gateway --help' for the full option list";

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Serial-to-WebSocket relay gateway for a hardware mesh network.
///
/// The `#[derive(Parser)]` macro from `clap` generates the argument parser
/// from the struct fields and their `#[arg(...)]` attributes.
#[derive(Debug, Parser)]
#[command(
    name = "mesh-gateway",
    about = "Relays mesh messages between a serial coordinator, web clients, and peer gateways",
    version
)]
struct Cli {
    /// TCP port for the WebSocket listener.
    http_port: u16,

    /// Serial device of the mesh coordinator (e.g. /dev/ttyACM0).
    ///
    /// When omitted, serial ports are enumerated and exactly one candidate
    /// coordinator device must be present.
    serial_device: Option<String>,

    /// IP address to bind the listener to.
    #[arg(long, default_value = "0.0.0.0", env = "GATEWAY_BIND")]
    bind: IpAddr,

    /// Comma-separated addresses of every gateway in the full mesh,
    /// including this instance's own.
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "0.0.0.0:3001,0.0.0.0:3002,0.0.0.0:3003",
        env = "GATEWAY_MESH"
    )]
    gateways: Vec<String>,
}

impl Cli {
    /// Converts the parsed CLI arguments into a [`GatewayConfig`].
    fn into_gateway_config(self) -> GatewayConfig {
        let defaults = GatewayConfig::default();
        GatewayConfig {
            bind_ip: self.bind,
            http_port: self.http_port,
            serial_device: self.serial_device,
            gateway_addresses: self.gateways,
            reconnect_initial: defaults.reconnect_initial,
            reconnect_max: defaults.reconnect_max,
        }
    }
}

/// Prints `info` and exits the process with code 0.
///
/// Startup problems an operator fixes by re-running with different arguments
/// (bad port, ambiguous device, unopenable serial line) are not crashes;
/// matching that, they exit cleanly after explaining themselves.
fn exit_with_info(info: &str) -> ! {
    println!("{info}");
    process::exit(0);
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// The `#[tokio::main]` attribute sets up the Tokio multi-threaded async
/// runtime.  All async tasks (the dispatcher, the serial reader, connection
/// tasks, peer connectors) run on this runtime's thread pool.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging setup ─────────────────────────────────────────────────────────
    //
    // `EnvFilter::try_from_default_env()` reads the `RUST_LOG` environment
    // variable.  If it is absent or invalid, fall back to `info` level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Parse CLI arguments ───────────────────────────────────────────────────
    //
    // `try_parse` instead of `parse`: argument mistakes print the usage text
    // and exit cleanly rather than with a failure status.  `--help` and
    // `--version` are not mistakes; they get clap's rendered output.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e)
            if matches!(
                e.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            ) =>
        {
            exit_with_info(&e.render().to_string())
        }
        Err(_) => exit_with_info(USAGE),
    };
    let config = cli.into_gateway_config();

    // ── Serial link ───────────────────────────────────────────────────────────
    let device = match resolve_device(config.serial_device.clone()) {
        Ok(device) => device,
        Err(e @ (LinkError::NoDevice | LinkError::AmbiguousDevice(_))) => {
            exit_with_info(&format!("{e}\n{USAGE}"))
        }
        Err(LinkError::Enumeration(e)) => {
            exit_with_info(&format!("Serial port enumeration failed: {e}"))
        }
    };
    let serial_stream = match open_link(&device) {
        Ok(stream) => stream,
        Err(e) => exit_with_info(&format!("Serial failed to open: {e}")),
    };

    // ── Listener and self address ─────────────────────────────────────────────
    info!("Opening http port {}", config.http_port);
    let listener = TcpListener::bind((config.bind_ip, config.http_port))
        .await
        .with_context(|| {
            format!("failed to bind listener on {}:{}", config.bind_ip, config.http_port)
        })?;

    let self_address = listener
        .local_addr()
        .context("failed to read bound listener address")?
        .to_string();
    info!("Serving clients on [{self_address}]");

    // ── Dispatcher, serial reader, peer connectors ────────────────────────────
    let (events_tx, events_rx) = mpsc::unbounded_channel();

    tokio::spawn(run_dispatcher(EndpointRegistry::new(), events_rx));
    tokio::spawn(run_serial_reader(serial_stream, events_tx.clone()));
    connect_to_peers(&config, &self_address, events_tx.clone());

    // ── Graceful shutdown flag ────────────────────────────────────────────────
    //
    // The accept loop checks this flag every 200 ms and exits cleanly once
    // Ctrl+C clears it.
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C — initiating graceful shutdown");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    // ── Main accept loop ──────────────────────────────────────────────────────
    run_server(listener, events_tx, running).await?;

    info!("mesh gateway stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_requires_http_port() {
        let result = Cli::try_parse_from(["mesh-gateway"]);
        assert!(result.is_err(), "HTTP_PORT is mandatory");
    }

    #[test]
    fn test_cli_port_only_invocation() {
        let cli = Cli::try_parse_from(["mesh-gateway", "3001"]).unwrap();
        assert_eq!(cli.http_port, 3001);
        assert!(cli.serial_device.is_none());
    }

    #[test]
    fn test_cli_port_and_device_invocation() {
        let cli = Cli::try_parse_from(["mesh-gateway", "3001", "/dev/ttyACM0"]).unwrap();
        assert_eq!(cli.serial_device.as_deref(), Some("/dev/ttyACM0"));
    }

    #[test]
    fn test_cli_help_is_not_a_usage_error() {
        // `--help` must surface clap's rendered help text, not the short
        // usage line that points back at `--help`.
        let err = Cli::try_parse_from(["mesh-gateway", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
        let rendered = err.render().to_string();
        assert!(rendered.contains("--gateways"));
    }

    #[test]
    fn test_cli_version_is_not_a_usage_error() {
        let err = Cli::try_parse_from(["mesh-gateway", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_cli_missing_port_is_a_usage_error() {
        let err = Cli::try_parse_from(["mesh-gateway"]).unwrap_err();
        assert_ne!(err.kind(), clap::error::ErrorKind::DisplayHelp);
        assert_ne!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_cli_non_numeric_port_is_rejected() {
        let result = Cli::try_parse_from(["mesh-gateway", "not-a-port"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_default_bind_is_any_interface() {
        let cli = Cli::try_parse_from(["mesh-gateway", "3001"]).unwrap();
        assert_eq!(cli.bind.to_string(), "0.0.0.0");
    }

    #[test]
    fn test_cli_default_mesh_is_three_gateways() {
        let cli = Cli::try_parse_from(["mesh-gateway", "3001"]).unwrap();
        assert_eq!(
            cli.gateways,
            vec!["0.0.0.0:3001", "0.0.0.0:3002", "0.0.0.0:3003"]
        );
    }

    #[test]
    fn test_cli_gateways_override_splits_on_commas() {
        let cli = Cli::try_parse_from([
            "mesh-gateway",
            "4000",
            "--gateways",
            "10.0.0.1:4000,10.0.0.2:4000",
        ])
        .unwrap();
        assert_eq!(cli.gateways, vec!["10.0.0.1:4000", "10.0.0.2:4000"]);
    }

    #[test]
    fn test_into_gateway_config_carries_cli_values() {
        // Arrange
        let cli = Cli::try_parse_from(["mesh-gateway", "3002", "/dev/ttyACM1"]).unwrap();

        // Act
        let config = cli.into_gateway_config();

        // Assert
        assert_eq!(config.http_port, 3002);
        assert_eq!(config.serial_device.as_deref(), Some("/dev/ttyACM1"));
        assert_eq!(config.gateway_addresses.len(), 3);
    }

    #[test]
    fn test_into_gateway_config_keeps_default_backoff() {
        let cli = Cli::try_parse_from(["mesh-gateway", "3001"]).unwrap();
        let config = cli.into_gateway_config();
        let defaults = GatewayConfig::default();
        assert_eq!(config.reconnect_initial, defaults.reconnect_initial);
        assert_eq!(config.reconnect_max, defaults.reconnect_max);
    }
}
