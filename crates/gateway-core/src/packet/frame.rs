//! Frame extractor for the hardware link.
//!
//! The mesh coordinator device shares its serial line between free-form debug
//! output and actual gateway traffic.  A line carries a message only if it
//! contains the literal structural marker:
//!
//! ```text
//! { "gateway-message": {"sender":"node7","receiver":"lamp3","message":"on"} }
//! ```
//!
//! Everything else on the line — firmware banners, timestamps, trailing
//! garbage after the object — is ignored.  A line without the marker is not
//! an error; it is simply "no message on this line" and callers drop it
//! silently.  A line *with* the marker whose embedded object fails to parse
//! is a reported error: the device tried to say something and we could not
//! understand it.
//!
//! # Parsing strategy
//!
//! We locate the marker, then hand the rest of the line to serde_json's
//! [`StreamDeserializer`](serde_json::StreamDeserializer), which parses
//! exactly one complete JSON object and stops — trailing bytes after the
//! closing brace are tolerated, matching what the device actually emits.

use serde::Deserialize;
use thiserror::Error;

use crate::domain::message::MeshMessage;

/// The literal marker introducing an embedded gateway message on a serial line.
pub const FRAME_MARKER: &str = "{ \"gateway-message\":";

/// Errors that can occur while extracting a message from a serial line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// The marker was present but the embedded object could not be parsed.
    ///
    /// This is reported (logged by callers) but non-fatal: the serial reader
    /// keeps going with the next line.
    #[error("malformed gateway-message object: {0}")]
    Malformed(String),
}

/// Result of scanning one serial line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The line carried a well-formed gateway message.
    Message {
        /// Mesh node that originated the message (used for logging only).
        sender: String,
        /// The decoded message, ready for the relay.
        message: MeshMessage,
    },
    /// The line carried no gateway message at all.  Not an error.
    NotAMessage,
}

/// Wire shape of the embedded object: `{"gateway-message": {...}}`.
#[derive(Debug, Deserialize)]
struct FrameEnvelope {
    #[serde(rename = "gateway-message")]
    gateway_message: FramePayload,
}

/// The inner object carried by the envelope.
#[derive(Debug, Deserialize)]
struct FramePayload {
    sender: String,
    receiver: String,
    message: String,
}

/// Extracts a gateway message from one line of serial text.
///
/// Returns [`FrameOutcome::NotAMessage`] when the marker is absent, and
/// [`FrameError::Malformed`] when the marker is present but the object after
/// it is not a complete, well-formed `{"gateway-message": {...}}` envelope.
///
/// # Examples
///
/// ```rust
/// use gateway_core::{extract_frame, FrameOutcome, MeshMessage};
///
/// let line = r#"[12:03] { "gateway-message": {"sender":"node7","receiver":"lamp3","message":"on"} }"#;
/// match extract_frame(line).unwrap() {
///     FrameOutcome::Message { sender, message } => {
///         assert_eq!(sender, "node7");
///         assert_eq!(message, MeshMessage::new("lamp3", "on"));
///     }
///     FrameOutcome::NotAMessage => unreachable!(),
/// }
/// ```
pub fn extract_frame(line: &str) -> Result<FrameOutcome, FrameError> {
    let Some(start) = line.find(FRAME_MARKER) else {
        return Ok(FrameOutcome::NotAMessage);
    };

    // Parse exactly one JSON object starting at the marker.  The stream
    // deserializer stops at the matching closing brace, so any trailing
    // serial noise after the object does not break the parse.
    let mut stream = serde_json::Deserializer::from_str(&line[start..])
        .into_iter::<FrameEnvelope>();

    match stream.next() {
        Some(Ok(envelope)) => {
            let payload = envelope.gateway_message;
            Ok(FrameOutcome::Message {
                sender: payload.sender,
                message: MeshMessage::new(payload.receiver, payload.message),
            })
        }
        Some(Err(e)) => Err(FrameError::Malformed(e.to_string())),
        // `next()` returning None means the input was empty after the marker,
        // which cannot happen (the marker itself is non-empty), but treat it
        // as malformed rather than panicking.
        None => Err(FrameError::Malformed("empty frame".to_string())),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
