//! Fixed resource catalog.
//!
//! The catalog is closed: symbols outside it are rejected by the
//! ledger as unknown resources rather than created on demand.

use std::fmt;
use std::str::FromStr;

/// A tradeable resource.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {
    QuantumOre,
    SpaceMineral,
    GalacticGas,
}

impl Resource {
    /// Every resource in the catalog, in wire-symbol order.
    pub const ALL: [Resource; 3] = [
        Resource::QuantumOre,
        Resource::SpaceMineral,
        Resource::GalacticGas,
    ];

    /// Wire symbol, e.g. `"QuantumOre"`.
    pub fn symbol(self) -> &'static str {
        match self {
            Resource::QuantumOre => "QuantumOre",
            Resource::SpaceMineral => "SpaceMineral",
            Resource::GalacticGas => "GalacticGas",
        }
    }

    /// Unit price the exchange opens with.
    pub fn initial_price(self) -> u64 {
        match self {
            Resource::QuantumOre => 200,
            Resource::SpaceMineral => 150,
            Resource::GalacticGas => 80,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Returned when a symbol is not part of the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSymbol(pub String);

impl FromStr for Resource {
    type Err = UnknownSymbol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resource::ALL
            .iter()
            .copied()
            .find(|r| r.symbol() == s)
            .ok_or_else(|| UnknownSymbol(s.to_string()))
    }
}
