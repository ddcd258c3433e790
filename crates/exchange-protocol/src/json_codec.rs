//! JSON encoding/decoding for exchange payloads.
//!
//! One payload per buffer. The trade channel's message framing (one
//! WebSocket text frame per payload) and the price feed's (one datagram
//! per payload) are provided by the transport, not here.

use exchange_core::{PriceSnapshot, Side, TradeResult};
use thiserror::Error;

use crate::wire_types::{symbol_map, RawTradeRequest, TradeRequest, TradeResponse, WirePrices};

/// Errors that can arise when decoding an inbound payload.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Not JSON, or JSON of the wrong shape.
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// `Action` absent or null.
    #[error("missing action")]
    MissingAction,

    /// `Action` is neither `"Buy"` nor `"Sell"`.
    #[error("unknown action: {0}")]
    UnknownAction(String),
}

pub fn decode_trade_request(text: &str) -> Result<TradeRequest, DecodeError> {
    let raw: RawTradeRequest = serde_json::from_str(text.trim())?;

    let action = raw.action.ok_or(DecodeError::MissingAction)?;
    let side = Side::from_action(&action).ok_or(DecodeError::UnknownAction(action))?;

    Ok(TradeRequest {
        side,
        session_id: raw.session_id.unwrap_or_default(),
        resource: raw.resource.unwrap_or_default(),
        amount: raw.amount,
    })
}

pub fn encode_trade_request(req: &TradeRequest) -> Result<String, serde_json::Error> {
    serde_json::to_string(&RawTradeRequest::from(req))
}

pub fn encode_trade_response(res: &TradeResult) -> Result<String, serde_json::Error> {
    serde_json::to_string(&TradeResponse::from(res))
}

pub fn decode_trade_response(text: &str) -> Result<TradeResponse, DecodeError> {
    Ok(serde_json::from_str(text)?)
}

pub fn encode_prices(snapshot: &PriceSnapshot) -> Result<String, serde_json::Error> {
    serde_json::to_string(&symbol_map(snapshot))
}

pub fn decode_prices(payload: &[u8]) -> Result<WirePrices, DecodeError> {
    Ok(serde_json::from_slice(payload)?)
}
