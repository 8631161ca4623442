//! Infrastructure layer for mesh-gateway.
//!
//! The infrastructure layer handles all I/O: reading lines from the serial
//! link, accepting WebSocket connections from clients and peer gateways, and
//! maintaining this instance's outbound connections to the rest of the mesh.
//!
//! # Responsibilities
//!
//! - Opening (or discovering) the mesh coordinator's serial device
//! - Binding the TCP listener and performing WebSocket upgrade handshakes
//! - Reading the `gateway-address` announcement from the handshake URI
//! - Dialling every other configured gateway and reconnecting with backoff
//! - Reducing all raw input to [`crate::application::GatewayEvent`]s
//!
//! # What does NOT belong here?
//!
//! - The fan-out policy (that is the application layer)
//! - Packet/frame parsing rules (gateway-core)
//! - Configuration parsing (that is done in `main.rs`)

pub mod peer_conn;
pub mod serial_link;
pub mod ws_server;

// Re-export the primary entry points so `main.rs` can call them concisely.
pub use peer_conn::connect_to_peers;
pub use serial_link::{open_link, resolve_device, run_serial_reader, LinkError};
pub use ws_server::run_server;
