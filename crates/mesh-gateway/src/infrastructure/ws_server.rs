//! WebSocket server: accept loop and per-connection tasks.
//!
//! This module is responsible for:
//!
//! 1. Accepting incoming TCP connections on the already-bound listener.
//! 2. Upgrading each connection to a WebSocket session, capturing the
//!    `gateway-address` the remote announced in the handshake URI (peers
//!    announce themselves; browsers do not).
//! 3. Registering every connection as a local client with the dispatcher —
//!    peers' inbound sockets receive local broadcasts too, exactly like any
//!    other connected socket.
//! 4. Turning inbound frames into [`GatewayEvent`]s: `local packet` frames
//!    become client-sourced messages, `gateway packet` frames become
//!    peer-sourced messages.
//! 5. Pumping the connection's outbound channel into the socket.
//! 6. Gracefully shutting down when the `running` flag is cleared.
//!
//! # Scalability
//!
//! Each connection runs in its own Tokio task.  The accept loop never blocks:
//! it accepts a connection and immediately spawns a task for it before
//! accepting the next one, so one slow client never delays the others.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::time::timeout;
use tokio_tungstenite::{
    accept_hdr_async,
    tungstenite::{
        handshake::server::{ErrorResponse, Request, Response},
        Error as WsError, Message as WsMessage,
    },
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::dispatch::GatewayEvent;
use crate::domain::channel::ChannelMessage;
use crate::domain::source::ClientId;

/// Query parameter a connecting gateway uses to announce its own address.
pub const GATEWAY_ADDRESS_PARAM: &str = "gateway-address";

// ── Public API ────────────────────────────────────────────────────────────────

/// Runs the accept loop until `running` is set to `false`.
///
/// Takes the listener already bound (binding happens in `main.rs`, where the
/// self address is derived from it *before* any peer connection is dialled).
///
/// # Parameters
///
/// - `listener` – The bound TCP listener.
/// - `events`   – Dispatcher channel; every connection task clones this.
/// - `running`  – Shared flag; the loop exits when this is set to `false`.
pub async fn run_server(
    listener: TcpListener,
    events: UnboundedSender<GatewayEvent>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    loop {
        // Check the shutdown flag before each accept attempt.
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        // Use a short timeout on `accept()` so the loop can periodically
        // check the `running` flag even when nothing is connecting.
        let accept_result = timeout(Duration::from_millis(200), listener.accept()).await;

        match accept_result {
            Ok(Ok((stream, peer_addr))) => {
                let events = events.clone();
                tokio::spawn(async move {
                    handle_connection(stream, peer_addr, events).await;
                });
            }
            Ok(Err(e)) => {
                // Transient accept error (e.g., too many open file descriptors).
                // Log it and continue rather than crashing the whole gateway.
                error!("accept error: {e}");
            }
            Err(_) => {
                // Timeout — nothing connected in the last 200 ms.
                // Loop back to check the `running` flag.
            }
        }
    }

    Ok(())
}

// ── Per-connection handler ────────────────────────────────────────────────────

/// Top-level handler for one accepted connection.
///
/// Wraps [`run_connection`] and logs the outcome, so `?` can be used for
/// clean error propagation inside while errors still end up in the log.
async fn handle_connection(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    events: UnboundedSender<GatewayEvent>,
) {
    match run_connection(raw_stream, peer_addr, events).await {
        Ok(()) => debug!("connection {peer_addr} closed normally"),
        Err(e) => warn!("connection {peer_addr} closed with error: {e:#}"),
    }
}

/// Runs the complete lifecycle of one WebSocket connection.
///
/// # Errors
///
/// Returns an error if the WebSocket handshake fails.  After a successful
/// handshake the connection never returns an error: individual bad frames
/// are logged and skipped, and a transport failure just ends the session.
async fn run_connection(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    events: UnboundedSender<GatewayEvent>,
) -> anyhow::Result<()> {
    // ── Step 1: WebSocket handshake, capturing the announced address ─────────
    //
    // A connecting gateway appends `?gateway-address=<its listen address>` to
    // the upgrade request so we can label its traffic.  Browsers send no such
    // parameter.  The announcement is advisory only — it labels log output
    // and peer-sourced packets, it is never used for access control.
    let mut announced: Option<String> = None;
    let callback = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        announced = query_param(request.uri().query(), GATEWAY_ADDRESS_PARAM);
        Ok(response)
    };

    let ws_stream = accept_hdr_async(raw_stream, callback).await?;

    // The label is how this connection appears in logs and as a peer source:
    // the announced gateway address when present, the socket address otherwise.
    let label = announced.unwrap_or_else(|| peer_addr.to_string());
    let id: ClientId = Uuid::new_v4();

    // ── Step 2: register with the dispatcher ──────────────────────────────────
    //
    // Every connection — browser or peer gateway — is registered as a local
    // client: broadcasts reach every connected socket, with no exceptions.
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ChannelMessage>();
    if events
        .send(GatewayEvent::ClientConnected {
            id,
            label: label.clone(),
            sender: out_tx,
        })
        .is_err()
    {
        // Dispatcher already gone — the gateway is shutting down.
        return Ok(());
    }

    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    // ── Step 3: writer task ───────────────────────────────────────────────────
    //
    // Drains the connection's outbound channel into the socket.  The task
    // ends when the registry drops the sender (after ClientDisconnected) or
    // the socket dies.
    let writer_label = label.clone();
    let writer_task = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    error!("[{writer_label}] envelope serialization error: {e}");
                    continue;
                }
            };
            if ws_tx.send(WsMessage::Text(json)).await.is_err() {
                debug!("[{writer_label}] WebSocket send failed (remote disconnected)");
                break;
            }
        }
    });

    // ── Step 4: read loop ─────────────────────────────────────────────────────
    loop {
        let ws_msg = match ws_rx.next().await {
            Some(Ok(msg)) => msg,
            Some(Err(WsError::ConnectionClosed | WsError::Protocol(_))) => {
                debug!("[{label}] WebSocket closed normally");
                break;
            }
            Some(Err(e)) => {
                warn!("[{label}] WebSocket error: {e}");
                break;
            }
            None => {
                debug!("[{label}] stream ended");
                break;
            }
        };

        match ws_msg {
            WsMessage::Text(json) => {
                let channel_msg: ChannelMessage = match serde_json::from_str(&json) {
                    Ok(m) => m,
                    Err(e) => {
                        // Don't close the session for one bad frame; the
                        // remote might behave on the next one.
                        warn!("[{label}] invalid envelope: {e}");
                        continue;
                    }
                };

                debug!("[{label}] received '{}' frame", channel_msg.channel_name());

                let event = match channel_msg {
                    ChannelMessage::LocalPacket { packet } => {
                        GatewayEvent::ClientPacket { id, packet }
                    }
                    ChannelMessage::GatewayPacket { packet } => GatewayEvent::PeerPacket {
                        address: label.clone(),
                        packet,
                    },
                };
                if events.send(event).is_err() {
                    break;
                }
            }

            WsMessage::Binary(_) => {
                // The channel protocol is JSON text only.
                warn!("[{label}] unexpected binary WebSocket frame (ignored)");
            }

            WsMessage::Ping(data) => {
                // Protocol-level ping; tokio-tungstenite answers it when the
                // sink is next written.  Just note it.
                debug!("[{label}] WebSocket ping ({} bytes)", data.len());
            }

            WsMessage::Pong(_) => {
                debug!("[{label}] WebSocket pong received");
            }

            WsMessage::Close(_) => {
                debug!("[{label}] WebSocket Close frame received");
                break;
            }

            WsMessage::Frame(_) => {
                debug!("[{label}] raw frame (ignored)");
            }
        }
    }

    // ── Step 5: deregister ────────────────────────────────────────────────────
    //
    // Removing the registry entry drops the outbound sender, which in turn
    // lets the writer task finish.
    let _ = events.send(GatewayEvent::ClientDisconnected { id });
    let _ = writer_task.await;

    Ok(())
}

// ── Helper ────────────────────────────────────────────────────────────────────

/// Extracts a single query parameter value from a raw query string.
///
/// The handshake URI is the only place this is needed, and the values are
/// plain socket addresses, so no percent-decoding is performed.
fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
