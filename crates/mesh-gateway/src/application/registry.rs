//! EndpointRegistry: the gateway's in-memory map of everything it can push to.
//!
//! The registry tracks two endpoint sets:
//!
//! - **Local clients** — one entry per accepted WebSocket connection, keyed
//!   by session [`ClientId`].  Created on connect, destroyed on disconnect.
//! - **Peer gateways** — one entry per configured mesh address with a live
//!   outbound connection, keyed by address string.  Created by the peer
//!   connector; replaced on reconnect.
//!
//! # Ownership and locking
//!
//! The registry is owned exclusively by the dispatcher task
//! ([`crate::application::dispatch`]).  Because that task processes one event
//! to completion before the next, no mutex is needed — exactly one dispatch
//! ever reads or mutates the registry at a time.
//!
//! # Delivery semantics
//!
//! All sends are fire-and-forget over unbounded mpsc channels: no capacity
//! limit, no acknowledgment, no dedup.  A send to an endpoint whose writer
//! task has already exited simply does nothing — disconnection is observed
//! via the transport's own close notification, which removes the entry.

use std::collections::HashMap;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use crate::domain::channel::ChannelMessage;
use crate::domain::source::ClientId;

/// A registered local client connection.
struct LocalClientEntry {
    /// Human-readable label for log output: the address the connection
    /// announced at handshake time, or its socket address.
    label: String,
    /// Outbound channel consumed by the connection's writer task.
    sender: UnboundedSender<ChannelMessage>,
}

/// Registry of all currently reachable endpoints.
#[derive(Default)]
pub struct EndpointRegistry {
    local_clients: HashMap<ClientId, LocalClientEntry>,
    peers: HashMap<String, UnboundedSender<ChannelMessage>>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a newly connected local client.
    pub fn register_local_client(
        &mut self,
        id: ClientId,
        label: String,
        sender: UnboundedSender<ChannelMessage>,
    ) {
        info!("Client [{label}] just connected");
        self.local_clients
            .insert(id, LocalClientEntry { label, sender });
    }

    /// Removes a local client after its connection closed.
    pub fn unregister_local_client(&mut self, id: ClientId) {
        if let Some(entry) = self.local_clients.remove(&id) {
            info!("Client [{}] just disconnected", entry.label);
        }
    }

    /// Registers (or replaces, after a reconnect) the outbound link to a peer.
    pub fn register_peer(&mut self, address: String, sender: UnboundedSender<ChannelMessage>) {
        info!("Listening to gateway [{address}]");
        self.peers.insert(address, sender);
    }

    /// Removes a peer whose outbound connection dropped.
    ///
    /// The peer connector re-registers once its reconnect succeeds.
    pub fn unregister_peer(&mut self, address: &str) {
        if self.peers.remove(address).is_some() {
            info!("Lost gateway [{address}]");
        }
    }

    /// Sends `packet` to every currently registered local client.
    ///
    /// Fire-and-forget: a client whose writer task has exited is skipped
    /// without error (its disconnect event will remove it shortly).
    pub fn broadcast_to_local_clients(&self, packet: &str) {
        debug!("Pushing to websocket clients...");
        for entry in self.local_clients.values() {
            let _ = entry.sender.send(ChannelMessage::LocalPacket {
                packet: packet.to_string(),
            });
        }
    }

    /// Sends `packet` to every peer gateway with a live outbound link.
    pub fn forward_to_all_peers(&self, packet: &str) {
        debug!("Pushing to gateways...");
        for sender in self.peers.values() {
            let _ = sender.send(ChannelMessage::GatewayPacket {
                packet: packet.to_string(),
            });
        }
    }

    /// Number of currently registered local clients.
    pub fn local_client_count(&self) -> usize {
        self.local_clients.len()
    }

    /// Number of peers with a live outbound link.
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
