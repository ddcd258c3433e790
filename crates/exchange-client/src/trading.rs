// crates/exchange-client/src/trading.rs

use anyhow::{bail, Context, Result};
use exchange_core::{SessionId, Side};
use exchange_protocol::{classify_frame, encode_trade_request, OutboundFrame, TradeRequest, TradeResponse};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

/// A WebSocket connection to the trade channel, bound to one session.
pub struct TradeSession {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    session_id: SessionId,
}

impl TradeSession {
    /// Connect to `url` (e.g. `ws://127.0.0.1:5003/ws`).
    pub async fn connect(url: &str, session_id: SessionId) -> Result<Self> {
        let (ws, _) = connect_async(url)
            .await
            .with_context(|| format!("connecting to {}", url))?;
        debug!(url, session = %session_id, "trade channel connected");
        Ok(TradeSession { ws, session_id })
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub async fn buy(&mut self, resource: &str, amount: i64) -> Result<()> {
        self.request(Side::Buy, resource, amount).await
    }

    pub async fn sell(&mut self, resource: &str, amount: i64) -> Result<()> {
        self.request(Side::Sell, resource, amount).await
    }

    /// Send a trade request for this session. The response arrives later
    /// through [`next_frame`](Self::next_frame).
    pub async fn request(&mut self, side: Side, resource: &str, amount: i64) -> Result<()> {
        let req = TradeRequest {
            side,
            session_id: self.session_id.to_string(),
            resource: resource.to_string(),
            amount,
        };
        let text = encode_trade_request(&req)?;
        self.send_text(text).await
    }

    /// Send an arbitrary text frame.
    pub async fn send_text(&mut self, text: String) -> Result<()> {
        self.ws
            .send(Message::Text(text))
            .await
            .context("sending trade message")
    }

    /// Next response or notice; `None` once the server closes.
    pub async fn next_frame(&mut self) -> Result<Option<OutboundFrame>> {
        while let Some(msg) = self.ws.next().await {
            match msg.context("reading trade channel")? {
                Message::Text(text) => return Ok(Some(classify_frame(&text))),
                Message::Close(_) => return Ok(None),
                _ => continue,
            }
        }
        Ok(None)
    }

    /// Next trade response, passing any notices that arrive first to
    /// `on_notice`.
    pub async fn next_response<F>(&mut self, mut on_notice: F) -> Result<TradeResponse>
    where
        F: FnMut(String),
    {
        loop {
            match self.next_frame().await? {
                Some(OutboundFrame::Response(res)) => return Ok(res),
                Some(OutboundFrame::Notice(text)) => on_notice(text),
                None => bail!("trade channel closed while waiting for a response"),
            }
        }
    }

    pub async fn close(mut self) -> Result<()> {
        self.ws.close(None).await.context("closing trade channel")
    }
}
