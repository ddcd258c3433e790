//! exchange-core
//!
//! Pure exchange logic:
//! - resource catalog and price table
//! - sessions (registered ships) with credits and inventory
//! - the ledger that serializes every trade and price tick

pub mod side;
pub mod resource;
pub mod session;
pub mod prices;
pub mod trade;
pub mod ledger;
pub mod error;

pub use side::Side;
pub use resource::Resource;
pub use session::{Inventory, Session, SessionId, DEFAULT_CREDITS};
pub use prices::{PriceSnapshot, PriceTable, DEFAULT_MAX_PRICE_STEP};
pub use trade::{TradeReceipt, TradeResult};
pub use ledger::Ledger;
pub use error::{LedgerError, TradeError};
