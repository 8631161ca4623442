//! Wire string codec for gateway packets.
//!
//! Wire format:
//! ```text
//! <target_id><SEPARATOR><body>
//! ```
//! where `SEPARATOR` is a single `'-'`.  Decoding splits at the *first*
//! separator, so the body may itself contain any number of separators — only
//! the target ID must be separator-free.
//!
//! This is the format carried inside both channel envelopes
//! (`LocalPacket` and `GatewayPacket`): for example `"lamp3-on"` addresses
//! device `lamp3` with body `on`.

use thiserror::Error;

use crate::domain::message::MeshMessage;

/// The single reserved character separating target ID from body on the wire.
pub const SEPARATOR: char = '-';

/// Errors that can occur during packet encoding or decoding.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    /// The target ID contains the separator, which would make the encoded
    /// packet ambiguous to decode.
    #[error("target id '{0}' contains the reserved separator '{SEPARATOR}'")]
    SeparatorInTargetId(String),

    /// The packet text contains no separator at all, so no target ID can be
    /// recovered.
    #[error("packet '{0}' has no '{SEPARATOR}' separator")]
    MissingSeparator(String),
}

/// Encodes a [`MeshMessage`] into its wire string form.
///
/// # Errors
///
/// Returns [`PacketError::SeparatorInTargetId`] if the target ID contains
/// `'-'`.  Rejecting at encode time keeps the round-trip contract honest:
/// anything this function produces decodes back to the same message.
///
/// # Examples
///
/// ```rust
/// use gateway_core::{encode_packet, MeshMessage};
///
/// let packet = encode_packet(&MeshMessage::new("lamp3", "on")).unwrap();
/// assert_eq!(packet, "lamp3-on");
/// ```
pub fn encode_packet(msg: &MeshMessage) -> Result<String, PacketError> {
    if msg.target_id.contains(SEPARATOR) {
        return Err(PacketError::SeparatorInTargetId(msg.target_id.clone()));
    }
    Ok(format!("{}{}{}", msg.target_id, SEPARATOR, msg.body))
}

/// Decodes a wire packet string back into a [`MeshMessage`].
///
/// Splits at the first `'-'`: everything before is the target ID, everything
/// after — including any further `'-'` characters — is the body.
///
/// # Errors
///
/// Returns [`PacketError::MissingSeparator`] if the text contains no `'-'`.
///
/// # Examples
///
/// ```rust
/// use gateway_core::{decode_packet, MeshMessage};
///
/// let msg = decode_packet("lamp3-turn-on").unwrap();
/// assert_eq!(msg, MeshMessage::new("lamp3", "turn-on"));
/// ```
pub fn decode_packet(packet: &str) -> Result<MeshMessage, PacketError> {
    match packet.split_once(SEPARATOR) {
        Some((target_id, body)) => Ok(MeshMessage::new(target_id, body)),
        None => Err(PacketError::MissingSeparator(packet.to_string())),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
