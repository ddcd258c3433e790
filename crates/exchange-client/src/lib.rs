//! exchange-client
//!
//! Client side of the exchange's three transports:
//! - [`register`]: TCP, ship name in, session id out
//! - [`PriceFeed`]: UDP price datagrams
//! - [`TradeSession`]: WebSocket trade requests, responses and notices

pub mod registration;
pub mod price_feed;
pub mod trading;

pub use registration::register;
pub use price_feed::PriceFeed;
pub use trading::TradeSession;
