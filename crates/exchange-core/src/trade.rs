//! Trade outcomes.
//!
//! - [`TradeReceipt`]: what a successful buy/sell did, including the
//!   session's balance and inventory right after it.
//! - [`TradeResult`]: the client-facing shape that both successes and
//!   domain rejections collapse into.

use crate::error::TradeError;
use crate::resource::Resource;
use crate::session::Inventory;
use crate::side::Side;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeReceipt {
    pub side: Side,
    pub resource: Resource,
    pub amount: u64,
    pub unit_price: u64,
    /// `unit_price * amount`, debited on buy and credited on sell.
    pub total: u64,
    pub new_balance: u64,
    /// Copy of the session's inventory after the trade.
    pub inventory: Inventory,
}

impl TradeReceipt {
    pub fn message(&self) -> String {
        match self.side {
            Side::Buy => format!("Bought {} units of {}", self.amount, self.resource),
            Side::Sell => format!("Sold {} units of {}", self.amount, self.resource),
        }
    }
}

/// Result of a trade as reported to the trading client.
///
/// On failure `new_balance` is 0 and `inventory` is `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeResult {
    pub success: bool,
    pub message: String,
    pub new_balance: u64,
    pub inventory: Option<Inventory>,
}

impl TradeResult {
    pub fn failure(err: &TradeError) -> Self {
        TradeResult {
            success: false,
            message: err.to_string(),
            new_balance: 0,
            inventory: None,
        }
    }
}

impl From<TradeReceipt> for TradeResult {
    fn from(receipt: TradeReceipt) -> Self {
        TradeResult {
            success: true,
            message: receipt.message(),
            new_balance: receipt.new_balance,
            inventory: Some(receipt.inventory),
        }
    }
}

impl From<Result<TradeReceipt, TradeError>> for TradeResult {
    fn from(outcome: Result<TradeReceipt, TradeError>) -> Self {
        match outcome {
            Ok(receipt) => receipt.into(),
            Err(err) => TradeResult::failure(&err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_carries_message_and_no_inventory() {
        let res = TradeResult::from(Err(TradeError::InsufficientFunds {
            needed: 2000,
            available: 1000,
        }));
        assert!(!res.success);
        assert_eq!(res.message, "insufficient credits: need 2000, have 1000");
        assert_eq!(res.new_balance, 0);
        assert!(res.inventory.is_none());
    }

    #[test]
    fn success_reports_receipt() {
        let receipt = TradeReceipt {
            side: Side::Sell,
            resource: Resource::GalacticGas,
            amount: 3,
            unit_price: 80,
            total: 240,
            new_balance: 1240,
            inventory: Inventory::from([(Resource::GalacticGas, 0)]),
        };
        let res = TradeResult::from(Ok(receipt));
        assert!(res.success);
        assert_eq!(res.message, "Sold 3 units of GalacticGas");
        assert_eq!(res.new_balance, 1240);
        assert_eq!(
            res.inventory,
            Some(Inventory::from([(Resource::GalacticGas, 0)]))
        );
    }
}
