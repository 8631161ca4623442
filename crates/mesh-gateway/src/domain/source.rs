//! Source identity: who handed a message to the relay engine.
//!
//! Every message enters the gateway from exactly one of three places, and the
//! fan-out rule depends entirely on which one.  Tagging the source explicitly
//! (instead of scattering the rule across per-channel handlers) makes the
//! fan-out table in [`crate::application::relay`] a single reviewable
//! decision point.

use std::fmt;

use uuid::Uuid;

/// Session identifier for a local WebSocket connection.
///
/// Generated fresh for every accepted connection; dies with the connection.
pub type ClientId = Uuid;

/// Where a message entered this gateway instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// The serial link to the local mesh coordinator.
    HardwareLink {
        /// Mesh node that originated the message, as reported in the frame.
        /// Used only for log output.
        sender: String,
    },
    /// A WebSocket connection attached directly to this gateway.
    LocalClient(ClientId),
    /// Another gateway instance, identified by the address it announced when
    /// its connection was established.  Advisory only — never used for access
    /// control.
    PeerGateway(String),
}

impl fmt::Display for SourceKind {
    /// Formats the source as it appears in relay log lines, e.g.
    /// `local mesh node [node7]` or `gateway [0.0.0.0:3002]`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::HardwareLink { sender } => write!(f, "local mesh node [{sender}]"),
            SourceKind::LocalClient(id) => write!(f, "socket client [{id}]"),
            SourceKind::PeerGateway(addr) => write!(f, "gateway [{addr}]"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hardware_link_display_names_the_mesh_node() {
        let source = SourceKind::HardwareLink {
            sender: "node7".to_string(),
        };
        assert_eq!(source.to_string(), "local mesh node [node7]");
    }

    #[test]
    fn test_local_client_display_contains_session_id() {
        let id = Uuid::new_v4();
        let source = SourceKind::LocalClient(id);
        assert!(source.to_string().contains(&id.to_string()));
    }

    #[test]
    fn test_peer_gateway_display_names_the_address() {
        let source = SourceKind::PeerGateway("0.0.0.0:3002".to_string());
        assert_eq!(source.to_string(), "gateway [0.0.0.0:3002]");
    }
}
