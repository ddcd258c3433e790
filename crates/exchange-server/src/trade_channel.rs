//! WebSocket trade/event channel.
//!
//! Per connection: `Handshaking → Open → Closing → Closed`.
//!
//! While open, the connection task reads trade requests, runs them
//! against the ledger and queues the JSON result on the connection's
//! outbound channel. Market-event notices are queued on the same channel
//! by the scheduler, so one writer task owns the socket's send half and
//! responses and notices interleave in queue order.
//!
//! Undecodable messages are logged and dropped; the connection stays open
//! and no response is sent for them.
//!
//! A connection holds one of `max_clients` slots from accept until its
//! task ends, handshake included. The handshake must finish within
//! `handshake_timeout` and is abandoned on shutdown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use exchange_core::{Ledger, TradeResult};
use exchange_protocol::{decode_trade_request, encode_trade_response};
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_hdr_async, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::types::{ConnectionId, ConnectionSet, Outbound, OutboundRx, OutboundTx};

/// Path the WebSocket upgrade must target.
pub const TRADE_PATH: &str = "/ws";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionState {
    Handshaking,
    Open,
    Closing,
    Closed,
}

/// Everything a trade connection task needs, cloned per connection.
#[derive(Debug, Clone)]
pub(crate) struct TradeChannel {
    pub ledger: Arc<Ledger>,
    pub connections: ConnectionSet,
    pub slots: Arc<Semaphore>,
    pub handshake_timeout: Duration,
}

impl TradeChannel {
    pub fn new(
        ledger: Arc<Ledger>,
        connections: ConnectionSet,
        max_clients: usize,
        handshake_timeout: Duration,
    ) -> Self {
        TradeChannel {
            ledger,
            connections,
            slots: Arc::new(Semaphore::new(max_clients)),
            handshake_timeout,
        }
    }
}

/// Accept trade connections until `cancel` fires.
pub(crate) async fn run_trade_listener(
    listener: TcpListener,
    channel: TradeChannel,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!(error = %e, "trade accept failed");
                        continue;
                    }
                };

                let slot = match Arc::clone(&channel.slots).try_acquire_owned() {
                    Ok(slot) => slot,
                    Err(_) => {
                        warn!(%peer, "no free trade slot, rejecting connection");
                        // Just drop the stream; client will see the connection closed.
                        continue;
                    }
                };

                let channel = channel.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, peer, channel, cancel, slot).await {
                        warn!(%peer, error = %e, "trade connection ended with error");
                    }
                });
            }
        }
    }

    info!("trade listener stopped");
}

struct Connection {
    peer: SocketAddr,
    id: Option<ConnectionId>,
    state: ConnectionState,
}

impl Connection {
    fn advance(&mut self, next: ConnectionState) {
        debug!(peer = %self.peer, conn = ?self.id.map(|c| c.0), from = ?self.state, to = ?next, "trade connection state");
        self.state = next;
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    channel: TradeChannel,
    cancel: CancellationToken,
    _slot: OwnedSemaphorePermit,
) -> Result<()> {
    let mut conn = Connection {
        peer,
        id: None,
        state: ConnectionState::Handshaking,
    };

    let ws = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!(%peer, "abandoning trade handshake for shutdown");
            return Ok(());
        }
        handshake = tokio::time::timeout(channel.handshake_timeout, accept_hdr_async(stream, check_path)) => {
            handshake
                .map_err(|_| anyhow!("websocket handshake timed out"))?
                .context("websocket handshake")?
        }
    };
    let (sink, mut source) = ws.split();

    let (out_tx, out_rx): (OutboundTx, OutboundRx) = mpsc::unbounded_channel();
    let id = channel.connections.insert(out_tx.clone()).await;
    conn.id = Some(id);
    conn.advance(ConnectionState::Open);
    info!(conn = id.0, %peer, "trade connection open");

    let writer = tokio::spawn(run_writer(id, sink, out_rx));

    let result = read_requests(id, &mut source, &channel.ledger, &out_tx, &cancel).await;

    conn.advance(ConnectionState::Closing);
    channel.connections.remove(id).await;
    // The writer drains what is queued, sends Close and exits once the
    // last sender is gone.
    drop(out_tx);
    if let Err(e) = writer.await {
        warn!(conn = id.0, error = %e, "trade writer task failed");
    }
    conn.advance(ConnectionState::Closed);
    info!(conn = id.0, %peer, "trade connection closed");

    result
}

type WsSink = futures::stream::SplitSink<WebSocketStream<TcpStream>, Message>;
type WsSource = futures::stream::SplitStream<WebSocketStream<TcpStream>>;

async fn run_writer(id: ConnectionId, mut sink: WsSink, mut out_rx: OutboundRx) {
    while let Some(msg) = out_rx.recv().await {
        if let Err(e) = sink.send(Message::Text(msg.into_text())).await {
            debug!(conn = id.0, error = %e, "trade write failed");
            return;
        }
    }
    let _ = sink.close().await;
}

async fn read_requests(
    id: ConnectionId,
    source: &mut WsSource,
    ledger: &Ledger,
    out_tx: &OutboundTx,
    cancel: &CancellationToken,
) -> Result<()> {
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(conn = id.0, "closing trade connection for shutdown");
                return Ok(());
            }
            next = source.next() => next,
        };

        let msg = match next {
            None => return Ok(()),
            Some(msg) => msg.context("reading trade message")?,
        };

        let text = match msg {
            Message::Text(text) => text,
            Message::Binary(bytes) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => {
                    warn!(conn = id.0, "dropping non-UTF-8 trade message");
                    continue;
                }
            },
            Message::Close(_) => return Ok(()),
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
        };

        if let Some(response) = handle_request(id, &text, ledger) {
            out_tx
                .send(Outbound::Response(response))
                .context("trade writer gone")?;
        }
    }
}

/// Run one inbound message against the ledger.
///
/// Returns the JSON response, or `None` if the message was dropped.
fn handle_request(id: ConnectionId, text: &str, ledger: &Ledger) -> Option<String> {
    let req = match decode_trade_request(text) {
        Ok(req) => req,
        Err(e) => {
            warn!(conn = id.0, error = %e, "dropping undecodable trade message");
            return None;
        }
    };

    let result = TradeResult::from(ledger.trade(req.side, &req.session_id, &req.resource, req.amount));
    debug!(
        conn = id.0,
        session = %req.session_id,
        action = %req.side,
        resource = %req.resource,
        amount = req.amount,
        success = result.success,
        "trade handled"
    );

    match encode_trade_response(&result) {
        Ok(json) => Some(json),
        Err(e) => {
            warn!(conn = id.0, error = %e, "failed to encode trade response");
            None
        }
    }
}

/// Only upgrades on [`TRADE_PATH`] (with or without a trailing slash).
fn check_path(req: &Request, resp: Response) -> Result<Response, ErrorResponse> {
    let path = req.uri().path();
    if path.trim_end_matches('/') == TRADE_PATH {
        return Ok(resp);
    }

    let mut err = ErrorResponse::new(Some(format!("no trade channel at {}", path)));
    *err.status_mut() = StatusCode::NOT_FOUND;
    Err(err)
}
