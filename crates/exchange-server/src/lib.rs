//! exchange-server
//!
//! Multi-transport exchange service:
//! - TCP registration listener (ship name in, session id out)
//! - UDP price broadcaster
//! - WebSocket trade/event channel
//! - periodic price and market-event ticks

pub mod config;
pub mod types;
pub mod server;
pub mod price_broadcaster;

// these are internal modules, not re-exported
mod registration;
mod trade_channel;
mod scheduler;

pub use server::{bind, bind_with_ledger, run, BoundServer, ServerHandle};
