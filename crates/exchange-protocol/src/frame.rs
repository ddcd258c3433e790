//! Telling outbound trade-channel frames apart.
//!
//! Trade responses and market-event notices share one stream of text
//! frames with no type tag. Consumers try the trade-response shape first
//! and treat anything else as a notice. A notice whose text happens to be
//! a valid trade-response object would be misread as a response; the
//! server never produces such notices.

use crate::json_codec::decode_trade_response;
use crate::wire_types::TradeResponse;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Response(TradeResponse),
    Notice(String),
}

pub fn classify_frame(text: &str) -> OutboundFrame {
    match decode_trade_response(text) {
        Ok(res) => OutboundFrame::Response(res),
        Err(_) => OutboundFrame::Notice(text.to_string()),
    }
}
