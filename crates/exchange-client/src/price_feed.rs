// crates/exchange-client/src/price_feed.rs

use std::net::SocketAddr;

use anyhow::{Context, Result};
use exchange_protocol::{decode_prices, WirePrices};
use tokio::net::UdpSocket;
use tracing::warn;

/// Largest price datagram accepted.
const MAX_DATAGRAM: usize = 4096;

/// Listener for UDP price updates.
pub struct PriceFeed {
    socket: UdpSocket,
}

impl PriceFeed {
    /// Listen on `addr` (e.g. `0.0.0.0:5002` for broadcasts).
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .with_context(|| format!("binding price feed on {}", addr))?;
        socket.set_broadcast(true)?;
        Ok(PriceFeed { socket })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Wait for the next decodable price update.
    ///
    /// Datagrams that are not a symbol → price map are skipped.
    pub async fn next_snapshot(&self) -> Result<WirePrices> {
        let mut buf = [0u8; MAX_DATAGRAM];
        loop {
            let (n, from) = self
                .socket
                .recv_from(&mut buf)
                .await
                .context("receiving price update")?;
            match decode_prices(&buf[..n]) {
                Ok(prices) => return Ok(prices),
                Err(e) => warn!(%from, error = %e, "ignoring bad price datagram"),
            }
        }
    }
}
