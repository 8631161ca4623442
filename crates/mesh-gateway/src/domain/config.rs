//! Gateway configuration types.
//!
//! [`GatewayConfig`] is the single source of truth for all runtime settings.
//! It is constructed from CLI arguments in `main.rs` (preferred for
//! production) or from defaults (useful for local development and tests).
//!
//! # Design rationale
//!
//! Keeping configuration as a plain struct (no global state, no environment
//! variable reads inside the domain) makes the gateway easy to embed in tests.
//! The infrastructure layer never reads args or env itself; it is handed this
//! struct.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// Baud rate of the mesh coordinator's serial interface.
pub const SERIAL_BAUD_RATE: u32 = 38_400;

/// All runtime configuration for the gateway.
///
/// Build this struct once at startup and then share it (it is cheap to clone)
/// with the infrastructure tasks.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Interface the WebSocket listener binds to.
    ///
    /// `0.0.0.0` accepts connections from any network interface; peers on the
    /// gateway mesh must be able to reach this address.
    pub bind_ip: IpAddr,

    /// Port the WebSocket listener binds to.
    pub http_port: u16,

    /// Serial device path of the mesh coordinator, e.g. `/dev/ttyACM0`.
    ///
    /// `None` means "discover it": enumerate serial ports and require exactly
    /// one candidate coordinator device.
    pub serial_device: Option<String>,

    /// Every gateway address in the full mesh, including this instance's own.
    ///
    /// The topology manager connects to each entry that is not equal to the
    /// derived self address.  The set is fixed for the process lifetime.
    pub gateway_addresses: Vec<String>,

    /// First delay before retrying a failed peer connection.
    pub reconnect_initial: Duration,

    /// Upper bound for the peer reconnect backoff.
    pub reconnect_max: Duration,
}

impl Default for GatewayConfig {
    /// Returns a `GatewayConfig` matching the canonical three-gateway
    /// development mesh.
    fn default() -> Self {
        Self {
            bind_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            http_port: 3001,
            serial_device: None,
            gateway_addresses: vec![
                "0.0.0.0:3001".to_string(),
                "0.0.0.0:3002".to_string(),
                "0.0.0.0:3003".to_string(),
            ],
            reconnect_initial: Duration::from_secs(1),
            reconnect_max: Duration::from_secs(30),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
