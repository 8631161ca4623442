//! Topology manager: outbound connections to every other gateway.
//!
//! Loop prevention (see [`crate::application::relay`]) assumes a full mesh:
//! every gateway holds a direct connection to every other gateway, so a
//! single forwarding hop reaches the whole mesh.  This module builds and
//! keeps that mesh from this instance's side:
//!
//! - For every configured gateway address that is not our own, one
//!   independent connector task is spawned.  Connection attempts never block
//!   each other; a gateway that is down only costs its own link.
//! - On connect, the task announces our own address via the
//!   `gateway-address` query parameter so the remote side can label us.
//! - On failure or disconnect, the link is unregistered and redialled with
//!   exponential backoff (doubling from `reconnect_initial` up to
//!   `reconnect_max`), forever — mesh peers are configured statically, so a
//!   missing peer is expected to come back eventually.
//!
//! Outbound peer links are send-only: inbound gateway traffic arrives on the
//! *remote* gateway's outbound link into our accept loop, not here.  The read
//! side of these sockets is drained solely to detect disconnection.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::{debug, info, warn};

use crate::application::dispatch::GatewayEvent;
use crate::domain::channel::ChannelMessage;
use crate::domain::config::GatewayConfig;
use crate::infrastructure::ws_server::GATEWAY_ADDRESS_PARAM;

/// Spawns one connector task per configured peer.
///
/// Must be called with the `self_address` derived from the already-bound
/// listener, so the instance's own entry in the configured set is skipped
/// and the announcement carries the address peers can actually dial back.
pub fn connect_to_peers(
    config: &GatewayConfig,
    self_address: &str,
    events: UnboundedSender<GatewayEvent>,
) {
    for address in &config.gateway_addresses {
        if address == self_address {
            continue;
        }
        tokio::spawn(maintain_peer_link(
            address.clone(),
            self_address.to_string(),
            events.clone(),
            config.reconnect_initial,
            config.reconnect_max,
        ));
    }
}

/// Dials one peer forever, re-registering the link after every reconnect.
async fn maintain_peer_link(
    address: String,
    self_address: String,
    events: UnboundedSender<GatewayEvent>,
    initial_backoff: Duration,
    max_backoff: Duration,
) {
    let url = format!("ws://{address}/?{GATEWAY_ADDRESS_PARAM}={self_address}");
    let mut backoff = initial_backoff;

    loop {
        match connect_async(url.as_str()).await {
            Ok((ws_stream, _response)) => {
                info!("Listening to gateway [{address}]");
                backoff = initial_backoff;

                run_peer_session(&address, ws_stream, &events).await;

                if events
                    .send(GatewayEvent::PeerDisconnected {
                        address: address.clone(),
                    })
                    .is_err()
                {
                    // Dispatcher gone — shutdown, stop redialling.
                    return;
                }
                warn!("lost link to gateway [{address}]; reconnecting");
            }
            Err(e) => {
                warn!("cannot reach gateway [{address}]: {e}; retrying in {backoff:?}");
                if events.is_closed() {
                    return;
                }
            }
        }

        sleep(backoff).await;
        backoff = (backoff * 2).min(max_backoff);
    }
}

/// Runs one established outbound peer link until it drops.
///
/// Registers a fresh outbound channel with the dispatcher, then pumps that
/// channel into the socket while draining (and ignoring) anything the remote
/// writes on it.
async fn run_peer_session(
    address: &str,
    ws_stream: tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
    events: &UnboundedSender<GatewayEvent>,
) {
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ChannelMessage>();
    if events
        .send(GatewayEvent::PeerConnected {
            address: address.to_string(),
            sender: out_tx,
        })
        .is_err()
    {
        return;
    }

    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    loop {
        tokio::select! {
            // Outbound: dispatcher fanned a packet to this peer.
            outgoing = out_rx.recv() => {
                let Some(msg) = outgoing else {
                    // Registry dropped our sender (unregistered); session over.
                    break;
                };
                let json = match serde_json::to_string(&msg) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!("[{address}] envelope serialization error: {e}");
                        continue;
                    }
                };
                if ws_tx.send(WsMessage::Text(json)).await.is_err() {
                    break;
                }
            }

            // Inbound: drained only to notice the link dropping.  Real
            // peer-to-us traffic arrives on the remote's own outbound link
            // into our accept loop.
            incoming = ws_rx.next() => {
                match incoming {
                    Some(Ok(frame)) => {
                        debug!("[{address}] ignoring frame on outbound link: {}", frame_kind(&frame));
                    }
                    Some(Err(_)) | None => break,
                }
            }
        }
    }
}

/// Short frame-kind label for debug logging.
fn frame_kind(frame: &WsMessage) -> &'static str {
    match frame {
        WsMessage::Text(_) => "text",
        WsMessage::Binary(_) => "binary",
        WsMessage::Ping(_) => "ping",
        WsMessage::Pong(_) => "pong",
        WsMessage::Close(_) => "close",
        WsMessage::Frame(_) => "raw",
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
