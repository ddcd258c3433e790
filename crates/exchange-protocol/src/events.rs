//! Market-event notices pushed to every trade-channel peer.
//!
//! A notice is plain text carrying a random lot number, e.g.
//! `Event of the day: unique lot #4821!`.

use std::ops::RangeInclusive;

/// Range lot numbers are drawn from.
pub const LOT_RANGE: RangeInclusive<u32> = 1000..=9998;

const NOTICE_PREFIX: &str = "Event of the day: unique lot #";

pub fn market_event_notice(lot: u32) -> String {
    format!("{}{}!", NOTICE_PREFIX, lot)
}

/// Extract the lot number from a notice produced by [`market_event_notice`].
pub fn parse_lot_number(notice: &str) -> Option<u32> {
    notice
        .strip_prefix(NOTICE_PREFIX)?
        .strip_suffix('!')?
        .parse()
        .ok()
}
