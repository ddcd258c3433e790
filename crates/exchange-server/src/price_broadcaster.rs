//! UDP price broadcaster.
//!
//! Owns one broadcast-enabled socket. Each tick moves the ledger's
//! prices and sends the new table as a single JSON datagram. Delivery is
//! best effort: no retry, no acknowledgement.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use anyhow::{Context, Result};
use exchange_core::{Ledger, PriceSnapshot};
use exchange_protocol::encode_prices;
use tokio::net::UdpSocket;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct PriceBroadcaster {
    socket: UdpSocket,
    target: SocketAddr,
}

impl PriceBroadcaster {
    /// Bind an ephemeral socket able to send to `target`.
    pub async fn bind(target: SocketAddr) -> Result<Self> {
        let local: SocketAddr = if target.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local)
            .await
            .context("binding price broadcast socket")?;
        socket
            .set_broadcast(true)
            .context("enabling broadcast on price socket")?;

        Ok(PriceBroadcaster { socket, target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Send one snapshot as a datagram. Returns the bytes sent.
    pub async fn broadcast(&self, snapshot: &PriceSnapshot) -> Result<usize> {
        let payload = encode_prices(snapshot).context("encoding prices")?;
        let sent = self
            .socket
            .send_to(payload.as_bytes(), self.target)
            .await
            .with_context(|| format!("sending prices to {}", self.target))?;
        Ok(sent)
    }

    /// Tick the ledger's prices and broadcast the result.
    ///
    /// A failed send is logged and dropped.
    pub async fn publish_tick(&self, ledger: &Ledger) {
        let snapshot = ledger.tick_prices();
        match self.broadcast(&snapshot).await {
            Ok(bytes) => debug!(bytes, target = %self.target, "price update sent"),
            Err(e) => warn!(error = %e, "price update dropped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exchange_core::Resource;

    #[tokio::test]
    async fn snapshot_arrives_as_one_json_datagram() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.expect("bind");
        let target = receiver.local_addr().expect("addr");
        let broadcaster = PriceBroadcaster::bind(target).await.expect("broadcaster");

        let snapshot = PriceSnapshot::from([
            (Resource::QuantumOre, 210),
            (Resource::SpaceMineral, 140),
            (Resource::GalacticGas, 75),
        ]);
        let sent = broadcaster.broadcast(&snapshot).await.expect("send");

        let mut buf = [0u8; 2048];
        let (n, _) = receiver.recv_from(&mut buf).await.expect("recv");
        assert_eq!(n, sent);
        let prices = exchange_protocol::decode_prices(&buf[..n]).expect("decode");
        assert_eq!(prices.get("QuantumOre"), Some(&210));
        assert_eq!(prices.get("SpaceMineral"), Some(&140));
        assert_eq!(prices.get("GalacticGas"), Some(&75));
    }

    #[tokio::test]
    async fn publish_tick_sends_the_ledger_prices() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.expect("bind");
        let broadcaster = PriceBroadcaster::bind(receiver.local_addr().expect("addr"))
            .await
            .expect("broadcaster");
        let ledger = Ledger::new();

        broadcaster.publish_tick(&ledger).await;

        let mut buf = [0u8; 2048];
        let (n, _) = receiver.recv_from(&mut buf).await.expect("recv");
        let prices = exchange_protocol::decode_prices(&buf[..n]).expect("decode");
        let current = ledger.prices();
        for (resource, price) in current {
            assert_eq!(prices.get(resource.symbol()), Some(&price));
        }
    }
}
