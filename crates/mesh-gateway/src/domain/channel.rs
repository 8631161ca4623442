//! The channel envelope: JSON messages exchanged over every WebSocket.
//!
//! Both directions and both kinds of remote (web client and peer gateway)
//! speak the same envelope: a JSON object with a `"channel"` discriminant and
//! the encoded wire packet `target-body`.  The two channels are:
//!
//! - `"local packet"` — client ⇄ gateway traffic.
//! - `"gateway packet"` — gateway ⇄ gateway traffic.
//!
//! The channel name is what lets the receiving gateway classify the message's
//! source: a packet arriving on the gateway channel came from a peer and must
//! never be re-forwarded to peers (the loop-prevention invariant).
//!
//! # JSON representation
//!
//! ```json
//! {"channel":"local packet","packet":"lamp3-on"}
//! {"channel":"gateway packet","packet":"lamp3-on"}
//! ```
//!
//! Serde's `#[serde(tag = "channel")]` attribute handles the discriminant
//! automatically.

use serde::{Deserialize, Serialize};

/// One WebSocket text frame in either direction.
///
/// The `packet` field carries the encoded wire string; see
/// [`gateway_core::packet::codec`] for its format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
// `tag = "channel"` means serde reads/writes a `"channel"` field to determine
// which variant a JSON object is.
#[serde(tag = "channel")]
pub enum ChannelMessage {
    /// Client ⇄ gateway traffic.
    #[serde(rename = "local packet")]
    LocalPacket {
        /// Encoded wire packet, e.g. `"lamp3-on"`.
        packet: String,
    },
    /// Gateway ⇄ gateway traffic.
    #[serde(rename = "gateway packet")]
    GatewayPacket {
        /// Encoded wire packet, e.g. `"lamp3-on"`.
        packet: String,
    },
}

impl ChannelMessage {
    /// Returns the channel name as it appears on the wire.
    ///
    /// Used in log output so operators see the same names the protocol uses.
    pub fn channel_name(&self) -> &'static str {
        match self {
            ChannelMessage::LocalPacket { .. } => "local packet",
            ChannelMessage::GatewayPacket { .. } => "gateway packet",
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
