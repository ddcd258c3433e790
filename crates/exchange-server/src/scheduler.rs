//! Periodic tasks.
//!
//! Two independent loops, both ended by the server's cancellation token:
//! - price ticker: fixed period, moves prices and broadcasts them over UDP
//! - market events: random delay per cycle, fans a notice out to every
//!   open trade connection

use std::sync::Arc;
use std::time::Duration;

use exchange_core::Ledger;
use exchange_protocol::{market_event_notice, LOT_RANGE};
use rand::Rng;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::price_broadcaster::PriceBroadcaster;
use crate::types::ConnectionSet;

/// Tick prices every `period` until cancelled. The first tick is one
/// period after start.
pub(crate) async fn run_price_ticker(
    broadcaster: PriceBroadcaster,
    ledger: Arc<Ledger>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => broadcaster.publish_tick(&ledger).await,
        }
    }

    info!("price ticker stopped");
}

/// Fan out a market event after each random delay in `min..=max` until
/// cancelled.
pub(crate) async fn run_market_events(
    connections: ConnectionSet,
    min: Duration,
    max: Duration,
    cancel: CancellationToken,
) {
    loop {
        let delay = random_delay(min, max);
        debug!(?delay, "next market event scheduled");

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = sleep(delay) => {}
        }

        let notice = market_event_notice(random_lot());
        let delivered = connections.fan_out(&notice).await;
        info!(delivered, notice = %notice, "market event broadcast");
    }

    info!("market event task stopped");
}

fn random_delay(min: Duration, max: Duration) -> Duration {
    if min >= max {
        return min;
    }
    rand::thread_rng().gen_range(min..=max)
}

fn random_lot() -> u32 {
    rand::thread_rng().gen_range(LOT_RANGE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Outbound;
    use exchange_protocol::parse_lot_number;
    use tokio::sync::mpsc;

    #[test]
    fn delays_stay_in_range() {
        let min = Duration::from_secs(60);
        let max = Duration::from_secs(300);
        for _ in 0..1_000 {
            let d = random_delay(min, max);
            assert!(d >= min && d <= max);
        }
        assert_eq!(random_delay(max, max), max);
    }

    #[test]
    fn lots_stay_in_range() {
        for _ in 0..1_000 {
            assert!(LOT_RANGE.contains(&random_lot()));
        }
    }

    #[tokio::test]
    async fn market_events_reach_connections_until_cancelled() {
        let connections = ConnectionSet::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        connections.insert(tx).await;

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_market_events(
            connections.clone(),
            Duration::from_millis(10),
            Duration::from_millis(20),
            cancel.clone(),
        ));

        let first = rx.recv().await.expect("notice");
        match first {
            Outbound::Notice(text) => assert!(parse_lot_number(&text).is_some()),
            other => panic!("unexpected: {:?}", other),
        }

        cancel.cancel();
        task.await.expect("task");

        // Drain anything already queued; nothing more arrives after stop.
        while rx.try_recv().is_ok() {}
        sleep(Duration::from_millis(60)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn price_ticker_stops_on_cancel() {
        let receiver = tokio::net::UdpSocket::bind("127.0.0.1:0").await.expect("bind");
        let broadcaster = PriceBroadcaster::bind(receiver.local_addr().expect("addr"))
            .await
            .expect("broadcaster");
        let ledger = Arc::new(Ledger::new());
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run_price_ticker(
            broadcaster,
            Arc::clone(&ledger),
            Duration::from_millis(10),
            cancel.clone(),
        ));

        let mut buf = [0u8; 2048];
        let (n, _) = receiver.recv_from(&mut buf).await.expect("recv");
        assert!(exchange_protocol::decode_prices(&buf[..n]).is_ok());

        cancel.cancel();
        task.await.expect("task");
    }
}
