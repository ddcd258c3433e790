//! Session (registered ship) representation.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use uuid::Uuid;

use crate::resource::Resource;

/// Credits every new session starts with.
pub const DEFAULT_CREDITS: u64 = 1000;

/// Held quantity per resource. An absent resource means zero.
pub type Inventory = BTreeMap<Resource, u64>;

/// Opaque session identifier handed to the client at registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    /// Mint a fresh id (UUID v4, hyphenated).
    pub fn generate() -> Self {
        SessionId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Lets the ledger look sessions up by the raw `&str` from a request.
impl Borrow<str> for SessionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        SessionId(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        SessionId(s.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A registered ship and its holdings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub name: String,
    pub credits: u64,
    pub inventory: Inventory,
}

impl Session {
    pub fn new(id: SessionId, name: impl Into<String>) -> Self {
        Session {
            id,
            name: name.into(),
            credits: DEFAULT_CREDITS,
            inventory: Inventory::new(),
        }
    }

    /// Quantity held of `resource` (0 if never traded).
    pub fn held(&self, resource: Resource) -> u64 {
        self.inventory.get(&resource).copied().unwrap_or(0)
    }
}
