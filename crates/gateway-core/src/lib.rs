//! # gateway-core
//!
//! Shared library for the mesh gateway containing the packet codec and the
//! domain message type.
//!
//! This crate is transport-agnostic: it has zero dependencies on sockets,
//! serial ports, or async runtimes.  The gateway binary layers networking on
//! top of it.
//!
//! # Architecture overview (for beginners)
//!
//! A mesh gateway bridges three worlds that all speak about the same thing —
//! "deliver this text to the device with this ID" — in different encodings:
//!
//! - **Hardware link** – the serial connection to the local mesh coordinator
//!   emits newline-terminated text lines.  Some of those lines carry an
//!   embedded JSON object describing a message; most are unrelated debug
//!   output.  The [`packet::frame`] module tells the two apart.
//!
//! - **Wire packets** – web clients and peer gateways exchange a compact
//!   string form `target-body`.  The [`packet::codec`] module converts
//!   between that string and the typed [`MeshMessage`].
//!
//! - **`domain`** – the [`MeshMessage`] itself: a target device ID and a
//!   message body, nothing more.

// Declare the two top-level modules.  Rust will look for each in a
// subdirectory with the same name (e.g., src/packet/mod.rs).
pub mod domain;
pub mod packet;

// Re-export the most-used types at the crate root so callers can write
// `gateway_core::MeshMessage` instead of `gateway_core::domain::message::MeshMessage`.
pub use domain::message::MeshMessage;
pub use packet::codec::{decode_packet, encode_packet, PacketError, SEPARATOR};
pub use packet::frame::{extract_frame, FrameError, FrameOutcome};
