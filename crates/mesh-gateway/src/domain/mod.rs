//! Domain layer for mesh-gateway.
//!
//! The domain layer contains pure business-logic types that have no
//! dependencies on I/O, networking, or external frameworks.
//!
//! # What belongs in the domain layer?
//!
//! - The channel envelope (the JSON "language" between clients and gateways)
//! - Configuration structures
//! - Source identity types ([`SourceKind`], [`ClientId`])
//!
//! # What does NOT belong here?
//!
//! - Any `tokio`, `TcpStream`, or `WebSocket` types
//! - Serial port handling or environment variable reading

pub mod channel;
pub mod config;
pub mod source;

// Re-export the most commonly needed types at the domain module boundary.
pub use channel::ChannelMessage;
pub use config::GatewayConfig;
pub use source::{ClientId, SourceKind};
