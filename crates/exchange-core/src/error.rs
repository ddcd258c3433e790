//! Error types for the exchange core.
//!
//! Trade errors are domain outcomes: the network layer recovers them into
//! a failed [`TradeResult`](crate::TradeResult) instead of dropping the
//! connection. [`LedgerError`] covers invariant violations.

use thiserror::Error;

use crate::resource::Resource;
use crate::session::SessionId;

/// Reasons a buy or sell is rejected. Rejection never mutates the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TradeError {
    /// Empty session id or resource, non-positive amount, or an amount
    /// whose proceeds cannot be represented.
    #[error("invalid trade request: {0}")]
    InvalidInput(&'static str),

    #[error("session not found: {0}")]
    UnknownSession(String),

    #[error("resource does not exist: {0}")]
    UnknownResource(String),

    #[error("insufficient credits: need {needed}, have {available}")]
    InsufficientFunds { needed: u64, available: u64 },

    #[error("insufficient {resource} on board: need {needed}, have {held}")]
    InsufficientInventory {
        resource: Resource,
        needed: u64,
        held: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// A freshly minted id matched an existing session.
    #[error("session id collision: {0}")]
    SessionIdCollision(SessionId),
}
