//! mesh-gateway library crate.
//!
//! This crate bridges a hardware mesh network (reached over a serial link) to
//! web clients and to peer gateway instances, so a message addressed to a
//! device ID is delivered regardless of which gateway the addressee's web
//! client is attached to.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Serial device (newline-framed text)     Browsers / peer gateways (JSON over WebSocket)
//!          ↕                                              ↕
//! [mesh-gateway]
//!   ├── domain/           Pure types: GatewayConfig, SourceKind, ChannelMessage
//!   ├── application/      Relay engine + endpoint registry (the fan-out policy)
//!   └── infrastructure/
//!         ├── serial_link/  Serial reader (tokio-serial + LinesCodec)
//!         ├── ws_server/    WebSocket accept loop (tokio-tungstenite)
//!         └── peer_conn/    Outbound full-mesh peer connections
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no external dependencies (no I/O, no async, no frameworks).
//! - `application` depends on `domain` and `gateway-core` only.
//! - `infrastructure` depends on all other layers plus `tokio`, `tungstenite`
//!   and `tokio-serial`.
//!
//! # The one real invariant
//!
//! All gateways hold a full mesh of direct connections to each other, and the
//! relay engine never re-forwards a peer-sourced message to another peer.
//! Together those two rules mean a message entering at any gateway reaches
//! every other gateway exactly once, never via a multi-hop relay chain — the
//! fan-out table in [`application::relay`] is the single place this is decided.

/// Domain layer: pure business-logic types (no I/O).
pub mod domain;

/// Application layer: the relay engine and endpoint registry.
pub mod application;

/// Infrastructure layer: serial link, WebSocket server, peer connections.
pub mod infrastructure;
