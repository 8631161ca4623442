//! Application layer for mesh-gateway.
//!
//! The application layer holds the fan-out policy — the only part of the
//! gateway with a real invariant to violate — and the registry of endpoints
//! it fans out to.
//!
//! # Responsibilities
//!
//! - Tracking connected local clients and peer gateways ([`registry`])
//! - Deciding which endpoint sets receive a copy of each message ([`relay`])
//! - Serialising all dispatches through one event loop ([`dispatch`])
//!
//! # What does NOT belong here?
//!
//! - Opening sockets or serial ports (that is infrastructure)
//! - WebSocket framing (handled by tokio-tungstenite)
//! - Packet encoding rules (gateway-core)

pub mod dispatch;
pub mod registry;
pub mod relay;

// Re-export the primary entry points so `main.rs` and tests can call them concisely.
pub use dispatch::{run_dispatcher, GatewayEvent};
pub use registry::EndpointRegistry;
pub use relay::relay;
