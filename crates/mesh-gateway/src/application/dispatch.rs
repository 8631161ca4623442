//! The dispatcher: one event loop that serialises every relay decision.
//!
//! All three input sources — the serial reader, each WebSocket connection
//! task, and each peer connector task — reduce their raw input to a
//! [`GatewayEvent`] and send it down one mpsc channel.  The dispatcher task
//! owns the [`EndpointRegistry`] outright and processes events strictly one
//! at a time: decode, fan out, done, next event.
//!
//! This is what gives the gateway its concurrency model: no two dispatches
//! ever interleave, so the registry needs no locking, and messages from a
//! single source are dispatched in arrival order (the per-connection task →
//! dispatcher channel → per-endpoint channel pipeline preserves it).  No
//! ordering is guaranteed across distinct sources.

use gateway_core::packet::codec::decode_packet;
use gateway_core::packet::frame::{extract_frame, FrameOutcome};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use crate::application::registry::EndpointRegistry;
use crate::application::relay::relay;
use crate::domain::channel::ChannelMessage;
use crate::domain::source::{ClientId, SourceKind};

/// Everything that can happen to the gateway, as seen by the dispatcher.
#[derive(Debug)]
pub enum GatewayEvent {
    /// One newline-terminated line arrived on the serial link.
    HardwareLine(String),
    /// A WebSocket connection completed its handshake.
    ClientConnected {
        id: ClientId,
        /// Announced gateway address from the handshake query, or the socket
        /// address when none was announced (i.e. a browser client).
        label: String,
        sender: UnboundedSender<ChannelMessage>,
    },
    /// A WebSocket connection closed.
    ClientDisconnected { id: ClientId },
    /// A `local packet` frame arrived from a connection.
    ClientPacket { id: ClientId, packet: String },
    /// A `gateway packet` frame arrived from a connection.
    PeerPacket { address: String, packet: String },
    /// An outbound peer connection was established (or re-established).
    PeerConnected {
        address: String,
        sender: UnboundedSender<ChannelMessage>,
    },
    /// An outbound peer connection dropped; the connector is backing off.
    PeerDisconnected { address: String },
}

/// Runs the dispatch loop until every event sender has been dropped.
///
/// Takes ownership of the registry — after this call, the dispatcher task is
/// the only place endpoint state lives.
pub async fn run_dispatcher(
    mut registry: EndpointRegistry,
    mut events: UnboundedReceiver<GatewayEvent>,
) {
    while let Some(event) = events.recv().await {
        handle_event(&mut registry, event);
    }
    debug!("all event sources gone; dispatcher exiting");
}

/// Processes a single event to completion.
///
/// Split out from the loop so unit tests can drive the dispatcher without
/// channels or an async runtime.
pub fn handle_event(registry: &mut EndpointRegistry, event: GatewayEvent) {
    match event {
        GatewayEvent::HardwareLine(line) => match extract_frame(&line) {
            Ok(FrameOutcome::Message { sender, message }) => {
                relay(registry, &message, &SourceKind::HardwareLink { sender });
            }
            // Most serial lines are unrelated device output; drop silently.
            Ok(FrameOutcome::NotAMessage) => {}
            Err(e) => warn!("unreadable gateway-message on serial line: {e}"),
        },

        GatewayEvent::ClientPacket { id, packet } => match decode_packet(&packet) {
            Ok(message) => relay(registry, &message, &SourceKind::LocalClient(id)),
            Err(e) => warn!("bad packet from client [{id}]: {e}"),
        },

        GatewayEvent::PeerPacket { address, packet } => match decode_packet(&packet) {
            Ok(message) => relay(registry, &message, &SourceKind::PeerGateway(address)),
            Err(e) => warn!("bad packet from gateway [{address}]: {e}"),
        },

        GatewayEvent::ClientConnected { id, label, sender } => {
            registry.register_local_client(id, label, sender);
        }
        GatewayEvent::ClientDisconnected { id } => {
            registry.unregister_local_client(id);
        }
        GatewayEvent::PeerConnected { address, sender } => {
            registry.register_peer(address, sender);
        }
        GatewayEvent::PeerDisconnected { address } => {
            registry.unregister_peer(&address);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    const SERIAL_LINE: &str =
        r#"{ "gateway-message": {"sender":"node7","receiver":"lamp3","message":"on"} }"#;

    #[test]
    fn test_serial_line_with_message_is_relayed() {
        // Arrange: registry with one client
        let mut registry = EndpointRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.register_local_client(Uuid::new_v4(), "c1".to_string(), tx);

        // Act
        handle_event(&mut registry, GatewayEvent::HardwareLine(SERIAL_LINE.to_string()));

        // Assert: the concrete expected packet was broadcast
        assert_eq!(
            rx.try_recv().unwrap(),
            ChannelMessage::LocalPacket {
                packet: "lamp3-on".to_string()
            }
        );
    }

    #[test]
    fn test_serial_noise_line_is_dropped_silently() {
        let mut registry = EndpointRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.register_local_client(Uuid::new_v4(), "c1".to_string(), tx);

        handle_event(
            &mut registry,
            GatewayEvent::HardwareLine("radio init complete".to_string()),
        );

        assert!(rx.try_recv().is_err(), "noise must not be relayed");
    }

    #[test]
    fn test_malformed_serial_frame_is_dropped_without_panic() {
        let mut registry = EndpointRegistry::new();
        handle_event(
            &mut registry,
            GatewayEvent::HardwareLine(r#"{ "gateway-message": {"sender":"#.to_string()),
        );
    }

    #[test]
    fn test_client_packet_fans_out_to_clients_and_peers() {
        // Arrange
        let mut registry = EndpointRegistry::new();
        let id = Uuid::new_v4();
        let (client_tx, mut client_rx) = mpsc::unbounded_channel();
        let (peer_tx, mut peer_rx) = mpsc::unbounded_channel();
        registry.register_local_client(id, "c1".to_string(), client_tx);
        registry.register_peer("0.0.0.0:3002".to_string(), peer_tx);

        // Act
        handle_event(
            &mut registry,
            GatewayEvent::ClientPacket {
                id,
                packet: "lamp3-on".to_string(),
            },
        );

        // Assert
        assert!(client_rx.try_recv().is_ok());
        assert!(peer_rx.try_recv().is_ok());
    }

    #[test]
    fn test_peer_packet_reaches_clients_only() {
        // The loop-prevention row, exercised at the event level.
        let mut registry = EndpointRegistry::new();
        let (client_tx, mut client_rx) = mpsc::unbounded_channel();
        let (peer_tx, mut peer_rx) = mpsc::unbounded_channel();
        registry.register_local_client(Uuid::new_v4(), "c1".to_string(), client_tx);
        registry.register_peer("0.0.0.0:3002".to_string(), peer_tx);

        handle_event(
            &mut registry,
            GatewayEvent::PeerPacket {
                address: "0.0.0.0:3002".to_string(),
                packet: "lamp3-on".to_string(),
            },
        );

        assert!(client_rx.try_recv().is_ok());
        assert!(peer_rx.try_recv().is_err(), "peer packet must not be re-forwarded");
    }

    #[test]
    fn test_separatorless_client_packet_is_dropped() {
        let mut registry = EndpointRegistry::new();
        let (client_tx, mut client_rx) = mpsc::unbounded_channel();
        registry.register_local_client(Uuid::new_v4(), "c1".to_string(), client_tx);

        handle_event(
            &mut registry,
            GatewayEvent::ClientPacket {
                id: Uuid::new_v4(),
                packet: "nodash".to_string(),
            },
        );

        assert!(client_rx.try_recv().is_err());
    }

    #[test]
    fn test_connect_then_disconnect_round_trip() {
        let mut registry = EndpointRegistry::new();
        let id = Uuid::new_v4();
        let (tx, _rx) = mpsc::unbounded_channel();

        handle_event(
            &mut registry,
            GatewayEvent::ClientConnected {
                id,
                label: "10.0.0.5:52110".to_string(),
                sender: tx,
            },
        );
        assert_eq!(registry.local_client_count(), 1);

        handle_event(&mut registry, GatewayEvent::ClientDisconnected { id });
        assert_eq!(registry.local_client_count(), 0);
    }

    #[test]
    fn test_peer_connect_and_disconnect_round_trip() {
        let mut registry = EndpointRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        handle_event(
            &mut registry,
            GatewayEvent::PeerConnected {
                address: "0.0.0.0:3002".to_string(),
                sender: tx,
            },
        );
        assert_eq!(registry.peer_count(), 1);

        handle_event(
            &mut registry,
            GatewayEvent::PeerDisconnected {
                address: "0.0.0.0:3002".to_string(),
            },
        );
        assert_eq!(registry.peer_count(), 0);
    }

    #[tokio::test]
    async fn test_run_dispatcher_exits_when_senders_drop() {
        // Arrange
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_dispatcher(EndpointRegistry::new(), rx));

        // Act: drop the only sender
        drop(tx);

        // Assert: the dispatcher task finishes
        handle.await.unwrap();
    }
}
