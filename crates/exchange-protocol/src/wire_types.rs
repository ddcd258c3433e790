//! JSON payload shapes.
//!
//! Field names are PascalCase on the wire:
//!
//! ```text
//! trade request  (client → server, trade channel)
//!   {"Action": "Buy"|"Sell", "SessionId": str, "Resource": str, "Amount": int}
//!
//! trade response (server → client, trade channel)
//!   {"Success": bool, "Message": str, "NewBalance": int, "Inventory": {str: int}}
//!   Inventory is omitted on failure.
//!
//! price update   (server → all, UDP datagram)
//!   {"QuantumOre": 200, "SpaceMineral": 150, "GalacticGas": 80}
//! ```

use std::collections::BTreeMap;

use exchange_core::{Inventory, Side, TradeResult};
use serde::{Deserialize, Serialize};

/// Symbol → price (or held quantity) as it appears on the wire.
pub type WirePrices = BTreeMap<String, u64>;

/// A decoded trade request.
///
/// Only the action is checked at decode time. Empty ids/resources and
/// non-positive amounts are left for the ledger, which answers them with
/// an invalid-input result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeRequest {
    pub side: Side,
    pub session_id: String,
    pub resource: String,
    pub amount: i64,
}

/// Raw request as parsed from JSON; every field may be missing or null.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RawTradeRequest {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub amount: i64,
}

impl From<&TradeRequest> for RawTradeRequest {
    fn from(req: &TradeRequest) -> Self {
        RawTradeRequest {
            action: Some(req.side.as_str().to_string()),
            session_id: Some(req.session_id.clone()),
            resource: Some(req.resource.clone()),
            amount: req.amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TradeResponse {
    pub success: bool,
    pub message: String,
    pub new_balance: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<WirePrices>,
}

impl From<&TradeResult> for TradeResponse {
    fn from(res: &TradeResult) -> Self {
        TradeResponse {
            success: res.success,
            message: res.message.clone(),
            new_balance: res.new_balance,
            inventory: res.inventory.as_ref().map(symbol_map),
        }
    }
}

/// Re-key an inventory or price snapshot by wire symbol.
pub fn symbol_map(map: &Inventory) -> WirePrices {
    map.iter()
        .map(|(resource, qty)| (resource.symbol().to_string(), *qty))
        .collect()
}
