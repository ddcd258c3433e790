//! Side (Buy / Sell) of a trade.

use std::fmt;

/// Trade side: Buy or Sell.
///
/// The wire spelling is the `Action` field of a trade request
/// (`"Buy"` / `"Sell"`, case-sensitive).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "Buy",
            Side::Sell => "Sell",
        }
    }

    /// Try to parse the wire action (`"Buy"` / `"Sell"`).
    pub fn from_action(action: &str) -> Option<Self> {
        match action {
            "Buy" => Some(Side::Buy),
            "Sell" => Some(Side::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
