//! Domain layer for gateway-core.
//!
//! Pure business-logic types with no dependencies on I/O, networking, or
//! external frameworks.  The only type that matters here is [`message::MeshMessage`]:
//! everything the gateway relays is ultimately one of these.

pub mod message;

pub use message::MeshMessage;
