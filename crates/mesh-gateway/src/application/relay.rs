//! The relay engine: the source-dependent fan-out policy.
//!
//! This is the dispatch core of the whole gateway.  Given a decoded message
//! and where it came from, [`relay`] decides which endpoint sets receive a
//! copy:
//!
//! | source         | local clients                | peers |
//! |----------------|------------------------------|-------|
//! | hardware link  | yes                          | yes   |
//! | local client   | yes (including the sender)   | yes   |
//! | peer gateway   | yes                          | no    |
//!
//! The third row is the loop-prevention invariant.  Every gateway forwards
//! hardware-link and local-client messages to *all* of its peers, and every
//! gateway refuses to re-forward what it received from a peer — so a message
//! entering at one gateway reaches every other gateway exactly once, over the
//! direct connection, never via a multi-hop relay chain.  This only works
//! because the topology manager maintains a full mesh of direct connections;
//! there is no multi-hop routing anywhere.
//!
//! There is deliberately no self-filtering on the local-client row: a client
//! receives its own message back, matching the broadcast semantics every
//! client already expects.

use gateway_core::packet::codec::encode_packet;
use gateway_core::MeshMessage;
use tracing::{info, warn};

use crate::application::registry::EndpointRegistry;
use crate::domain::source::SourceKind;

/// Fans a message out to the endpoint sets dictated by its source.
///
/// Encodes the message once, then pushes the same wire packet to each
/// destination set.  Logging around the dispatch is observational only and
/// never gates delivery.
///
/// A message whose target ID contains the wire separator cannot be encoded
/// unambiguously; it is dropped with a warning rather than relayed lossily.
pub fn relay(registry: &EndpointRegistry, msg: &MeshMessage, source: &SourceKind) {
    info!(
        "Incoming from {source}, message '{}' for target {}",
        msg.body, msg.target_id
    );

    let packet = match encode_packet(msg) {
        Ok(packet) => packet,
        Err(e) => {
            warn!("dropping unrelayable message from {source}: {e}");
            return;
        }
    };

    match source {
        SourceKind::HardwareLink { .. } | SourceKind::LocalClient(_) => {
            registry.broadcast_to_local_clients(&packet);
            registry.forward_to_all_peers(&packet);
        }
        // Peer-sourced messages go to local clients only.  Re-forwarding to
        // peers would bounce the message around the mesh forever.
        SourceKind::PeerGateway(_) => {
            registry.broadcast_to_local_clients(&packet);
        }
    }

    info!("Done.");
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::channel::ChannelMessage;
    use tokio::sync::mpsc::{self, UnboundedReceiver};
    use uuid::Uuid;

    /// Builds a registry with one local client and two peers, returning the
    /// receiving ends so tests can count deliveries.
    fn registry_with_one_client_two_peers() -> (
        EndpointRegistry,
        UnboundedReceiver<ChannelMessage>,
        UnboundedReceiver<ChannelMessage>,
        UnboundedReceiver<ChannelMessage>,
    ) {
        let mut registry = EndpointRegistry::new();
        let (client_tx, client_rx) = mpsc::unbounded_channel();
        let (peer_a_tx, peer_a_rx) = mpsc::unbounded_channel();
        let (peer_b_tx, peer_b_rx) = mpsc::unbounded_channel();
        registry.register_local_client(Uuid::new_v4(), "c1".to_string(), client_tx);
        registry.register_peer("0.0.0.0:3002".to_string(), peer_a_tx);
        registry.register_peer("0.0.0.0:3003".to_string(), peer_b_tx);
        (registry, client_rx, peer_a_rx, peer_b_rx)
    }

    fn drain(rx: &mut UnboundedReceiver<ChannelMessage>) -> Vec<ChannelMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[test]
    fn test_hardware_link_message_reaches_client_and_both_peers_once() {
        // Arrange
        let (registry, mut client_rx, mut peer_a_rx, mut peer_b_rx) =
            registry_with_one_client_two_peers();
        let msg = MeshMessage::new("lamp3", "on");
        let source = SourceKind::HardwareLink {
            sender: "node7".to_string(),
        };

        // Act
        relay(&registry, &msg, &source);

        // Assert: exactly one copy each
        assert_eq!(
            drain(&mut client_rx),
            vec![ChannelMessage::LocalPacket {
                packet: "lamp3-on".to_string()
            }]
        );
        assert_eq!(
            drain(&mut peer_a_rx),
            vec![ChannelMessage::GatewayPacket {
                packet: "lamp3-on".to_string()
            }]
        );
        assert_eq!(
            drain(&mut peer_b_rx),
            vec![ChannelMessage::GatewayPacket {
                packet: "lamp3-on".to_string()
            }]
        );
    }

    #[test]
    fn test_peer_message_never_returns_to_any_peer() {
        // Arrange: message arrives from peer A
        let (registry, mut client_rx, mut peer_a_rx, mut peer_b_rx) =
            registry_with_one_client_two_peers();
        let msg = MeshMessage::new("lamp3", "on");
        let source = SourceKind::PeerGateway("0.0.0.0:3002".to_string());

        // Act
        relay(&registry, &msg, &source);

        // Assert: local clients get it; neither peer A nor peer B does
        assert_eq!(drain(&mut client_rx).len(), 1);
        assert!(drain(&mut peer_a_rx).is_empty(), "must not echo to origin peer");
        assert!(drain(&mut peer_b_rx).is_empty(), "must not relay to other peers");
    }

    #[test]
    fn test_local_client_message_returns_to_its_own_sender() {
        // Arrange: two clients, the message comes from c1
        let mut registry = EndpointRegistry::new();
        let c1 = Uuid::new_v4();
        let (c1_tx, mut c1_rx) = mpsc::unbounded_channel();
        let (c2_tx, mut c2_rx) = mpsc::unbounded_channel();
        let (peer_tx, mut peer_rx) = mpsc::unbounded_channel();
        registry.register_local_client(c1, "c1".to_string(), c1_tx);
        registry.register_local_client(Uuid::new_v4(), "c2".to_string(), c2_tx);
        registry.register_peer("0.0.0.0:3002".to_string(), peer_tx);

        // Act
        relay(
            &registry,
            &MeshMessage::new("lamp3", "on"),
            &SourceKind::LocalClient(c1),
        );

        // Assert: no self-exclusion — both clients and the peer get a copy
        assert_eq!(drain(&mut c1_rx).len(), 1);
        assert_eq!(drain(&mut c2_rx).len(), 1);
        assert_eq!(drain(&mut peer_rx).len(), 1);
    }

    #[test]
    fn test_relay_with_no_endpoints_is_a_no_op() {
        let registry = EndpointRegistry::new();
        // Must not panic with zero registered endpoints.
        relay(
            &registry,
            &MeshMessage::new("lamp3", "on"),
            &SourceKind::HardwareLink {
                sender: "node7".to_string(),
            },
        );
    }

    #[test]
    fn test_unencodable_target_is_dropped_not_relayed() {
        // Arrange: target ID containing the separator cannot round-trip
        let (registry, mut client_rx, mut peer_a_rx, mut peer_b_rx) =
            registry_with_one_client_two_peers();
        let msg = MeshMessage::new("lamp-3", "on");

        // Act
        relay(
            &registry,
            &msg,
            &SourceKind::HardwareLink {
                sender: "node7".to_string(),
            },
        );

        // Assert: nothing was delivered anywhere
        assert!(drain(&mut client_rx).is_empty());
        assert!(drain(&mut peer_a_rx).is_empty());
        assert!(drain(&mut peer_b_rx).is_empty());
    }

    #[test]
    fn test_body_separator_survives_the_relay() {
        let (registry, mut client_rx, _pa, _pb) = registry_with_one_client_two_peers();

        relay(
            &registry,
            &MeshMessage::new("door2", "lock-all"),
            &SourceKind::PeerGateway("0.0.0.0:3003".to_string()),
        );

        assert_eq!(
            drain(&mut client_rx),
            vec![ChannelMessage::LocalPacket {
                packet: "door2-lock-all".to_string()
            }]
        );
    }
}
