//! Shared types for the exchange server.
//!
//! This module defines:
//! - `ConnectionId`: a lightweight handle for open trade connections
//! - `Outbound`: text frames queued for one connection's writer
//! - `ConnectionSet`: the open connections, used for market-event fan-out

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::RwLock;

/// Identifier for an open trade connection.
///
/// Unique over the lifetime of the `ConnectionSet` that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u64);

/// A text frame waiting to be written to a trade connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// JSON trade response to a request from this connection.
    Response(String),
    /// Market-event notice fanned out to every connection.
    Notice(String),
}

impl Outbound {
    pub fn into_text(self) -> String {
        match self {
            Outbound::Response(text) | Outbound::Notice(text) => text,
        }
    }
}

pub type OutboundTx = mpsc::UnboundedSender<Outbound>;
pub type OutboundRx = mpsc::UnboundedReceiver<Outbound>;

/// Open trade connections and their outbound channels.
///
/// Inserts, removals and fan-out snapshots all go through one `RwLock`;
/// the lock is never held while a frame is written to a socket.
#[derive(Debug, Clone, Default)]
pub struct ConnectionSet {
    peers: Arc<RwLock<HashMap<ConnectionId, OutboundTx>>>,
    next_id: Arc<AtomicU64>,
}

impl ConnectionSet {
    pub fn new() -> Self {
        ConnectionSet::default()
    }

    /// Register a connection's outbound channel and return its id.
    pub async fn insert(&self, tx: OutboundTx) -> ConnectionId {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.peers.write().await.insert(id, tx);
        id
    }

    /// Returns whether the connection was still registered.
    pub async fn remove(&self, id: ConnectionId) -> bool {
        self.peers.write().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.peers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.peers.read().await.is_empty()
    }

    /// Queue `notice` on every open connection.
    ///
    /// Connections whose writer has already gone away are skipped; they
    /// do not stop delivery to the rest. Returns how many accepted it.
    pub async fn fan_out(&self, notice: &str) -> usize {
        // Snapshot of current peers to minimize lock hold time.
        let current: Vec<(ConnectionId, OutboundTx)> = {
            let guard = self.peers.read().await;
            guard.iter().map(|(id, tx)| (*id, tx.clone())).collect()
        };

        let mut delivered = 0;
        for (id, tx) in current {
            if tx.send(Outbound::Notice(notice.to_string())).is_ok() {
                delivered += 1;
            } else {
                tracing::debug!(conn = id.0, "skipping closed connection during fan-out");
            }
        }
        delivered
    }
}
