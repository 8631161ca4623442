//! The mesh message: the one thing the gateway relays.
//!
//! A [`MeshMessage`] is deliberately minimal — a target device ID and an
//! opaque text body.  The gateway never interprets the body; it only decides
//! *where* copies go, based on where the message came from.

use serde::{Deserialize, Serialize};

/// A message addressed to a mesh device.
///
/// # Invariant
///
/// `target_id` must not contain the wire separator character
/// ([`crate::packet::codec::SEPARATOR`]).  If it did, the wire form
/// `target-body` would decode ambiguously.  [`crate::packet::codec::encode_packet`]
/// enforces this; construction itself does not, so the codec is the gatekeeper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshMessage {
    /// Identifier of the device this message is addressed to.
    pub target_id: String,
    /// Opaque message body.  May contain any text, including the separator.
    pub body: String,
}

impl MeshMessage {
    /// Convenience constructor used throughout the codec and tests.
    pub fn new(target_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            body: body.into(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
