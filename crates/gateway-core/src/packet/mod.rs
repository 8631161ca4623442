//! Packet module containing the wire string codec and the serial frame extractor.

pub mod codec;
pub mod frame;

pub use codec::{decode_packet, encode_packet, PacketError, SEPARATOR};
pub use frame::{extract_frame, FrameError, FrameOutcome};
