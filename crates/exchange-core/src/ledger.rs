//! The exchange ledger.
//!
//! Single source of truth for sessions, inventories, credits and prices.
//! Every public operation takes the same lock for the whole in-memory
//! mutation, so:
//! - trades are atomic and linearizable with respect to each other,
//! - a price tick is visible all at once or not at all,
//! - everything handed out is a copy, never a reference into the state.
//!
//! The ledger has no I/O; callers copy results out before touching a
//! socket.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rand::Rng;

use crate::error::{LedgerError, TradeError};
use crate::prices::{PriceSnapshot, PriceTable, DEFAULT_MAX_PRICE_STEP};
use crate::resource::Resource;
use crate::session::{Session, SessionId};
use crate::side::Side;
use crate::trade::TradeReceipt;

#[derive(Debug, Default)]
struct LedgerState {
    sessions: HashMap<SessionId, Session>,
    prices: PriceTable,
}

#[derive(Debug)]
pub struct Ledger {
    state: Mutex<LedgerState>,
    max_price_step: u64,
}

impl Default for Ledger {
    fn default() -> Self {
        Ledger::with_prices(PriceTable::default(), DEFAULT_MAX_PRICE_STEP)
    }
}

impl Ledger {
    /// Ledger with the catalog's opening prices and the default tick step.
    pub fn new() -> Self {
        Ledger::default()
    }

    pub fn with_prices(prices: PriceTable, max_price_step: u64) -> Self {
        Ledger {
            state: Mutex::new(LedgerState {
                sessions: HashMap::new(),
                prices,
            }),
            max_price_step,
        }
    }

    // Every mutation completes before the guard drops, so a poisoned lock
    // still guards consistent state.
    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -------------------------------------------------------------------------
    // Sessions
    // -------------------------------------------------------------------------

    /// Mint a fresh session for `name` with default credits and an empty hold.
    pub fn register_session(&self, name: &str) -> Result<SessionId, LedgerError> {
        let id = SessionId::generate();
        self.insert_session(id.clone(), name)?;
        Ok(id)
    }

    /// Insert a session under a caller-chosen id.
    ///
    /// An existing session is never overwritten.
    pub fn insert_session(&self, id: SessionId, name: &str) -> Result<(), LedgerError> {
        let mut state = self.lock();
        match state.sessions.entry(id) {
            Entry::Occupied(occupied) => {
                Err(LedgerError::SessionIdCollision(occupied.key().clone()))
            }
            Entry::Vacant(vacant) => {
                let session = Session::new(vacant.key().clone(), name);
                vacant.insert(session);
                Ok(())
            }
        }
    }

    /// Copy of a session's current state.
    pub fn session(&self, id: &str) -> Option<Session> {
        self.lock().sessions.get(id).cloned()
    }

    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }

    // -------------------------------------------------------------------------
    // Trades
    // -------------------------------------------------------------------------

    pub fn buy(&self, session_id: &str, resource: &str, amount: i64) -> Result<TradeReceipt, TradeError> {
        self.trade(Side::Buy, session_id, resource, amount)
    }

    pub fn sell(&self, session_id: &str, resource: &str, amount: i64) -> Result<TradeReceipt, TradeError> {
        self.trade(Side::Sell, session_id, resource, amount)
    }

    /// Execute one trade at the current price.
    ///
    /// Checks run in order: input shape, session, resource, then funds or
    /// held quantity. A rejected trade leaves the ledger untouched.
    pub fn trade(
        &self,
        side: Side,
        session_id: &str,
        resource: &str,
        amount: i64,
    ) -> Result<TradeReceipt, TradeError> {
        let amount = validate_request(session_id, resource, amount)?;

        let mut guard = self.lock();
        let LedgerState { sessions, prices } = &mut *guard;

        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| TradeError::UnknownSession(session_id.to_string()))?;
        let resource: Resource = resource
            .parse()
            .map_err(|_| TradeError::UnknownResource(resource.to_string()))?;
        let unit_price = prices.price(resource);

        let total = match side {
            Side::Buy => apply_buy(session, resource, amount, unit_price)?,
            Side::Sell => apply_sell(session, resource, amount, unit_price)?,
        };

        Ok(TradeReceipt {
            side,
            resource,
            amount,
            unit_price,
            total,
            new_balance: session.credits,
            inventory: session.inventory.clone(),
        })
    }

    // -------------------------------------------------------------------------
    // Prices
    // -------------------------------------------------------------------------

    /// Randomly move every price and return the new table.
    pub fn tick_prices(&self) -> PriceSnapshot {
        let mut rng = rand::thread_rng();
        self.tick_prices_with(&mut rng)
    }

    pub fn tick_prices_with<R: Rng + ?Sized>(&self, rng: &mut R) -> PriceSnapshot {
        let mut state = self.lock();
        state.prices.perturb(rng, self.max_price_step);
        state.prices.snapshot()
    }

    /// Current prices without moving them.
    pub fn prices(&self) -> PriceSnapshot {
        self.lock().prices.snapshot()
    }
}

// -----------------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------------

fn validate_request(session_id: &str, resource: &str, amount: i64) -> Result<u64, TradeError> {
    if session_id.trim().is_empty() {
        return Err(TradeError::InvalidInput("missing session id"));
    }
    if resource.trim().is_empty() {
        return Err(TradeError::InvalidInput("missing resource"));
    }
    if amount <= 0 {
        return Err(TradeError::InvalidInput("amount must be positive"));
    }
    Ok(amount.unsigned_abs())
}

/// Returns the total debited.
fn apply_buy(session: &mut Session, resource: Resource, amount: u64, unit_price: u64) -> Result<u64, TradeError> {
    let total = unit_price.checked_mul(amount);
    let total = match total {
        Some(total) if total <= session.credits => total,
        _ => {
            return Err(TradeError::InsufficientFunds {
                needed: unit_price.saturating_mul(amount),
                available: session.credits,
            })
        }
    };

    let held = session.held(resource);
    let new_held = held
        .checked_add(amount)
        .ok_or(TradeError::InvalidInput("amount too large"))?;

    session.credits -= total;
    session.inventory.insert(resource, new_held);
    Ok(total)
}

/// Returns the total credited.
fn apply_sell(session: &mut Session, resource: Resource, amount: u64, unit_price: u64) -> Result<u64, TradeError> {
    let held = session.held(resource);
    if held < amount {
        return Err(TradeError::InsufficientInventory {
            resource,
            needed: amount,
            held,
        });
    }

    let total = unit_price
        .checked_mul(amount)
        .ok_or(TradeError::InvalidInput("amount too large"))?;
    let new_credits = session
        .credits
        .checked_add(total)
        .ok_or(TradeError::InvalidInput("amount too large"))?;

    session.credits = new_credits;
    session.inventory.insert(resource, held - amount);
    Ok(total)
}
