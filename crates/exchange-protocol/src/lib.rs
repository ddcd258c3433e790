//! exchange-protocol
//!
//! Wire-level encoding/decoding for the exchange.
//!
//! This crate turns logical exchange values (`exchange_core::TradeResult`,
//! `PriceSnapshot`, trade requests) into UTF-8 JSON text and back again.
//!
//! - [`wire_types`] : serde shapes of every JSON payload
//! - [`json_codec`] : encode/decode functions and [`DecodeError`]
//! - [`events`]     : market-event notice text
//! - [`frame`]      : telling trade responses and notices apart

pub mod wire_types;
pub mod json_codec;
pub mod events;
pub mod frame;

pub use wire_types::{TradeRequest, TradeResponse, WirePrices};
pub use json_codec::{
    DecodeError,
    decode_prices,
    decode_trade_request,
    decode_trade_response,
    encode_prices,
    encode_trade_request,
    encode_trade_response,
};
pub use events::{market_event_notice, parse_lot_number, LOT_RANGE};
pub use frame::{classify_frame, OutboundFrame};
