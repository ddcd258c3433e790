// crates/exchange-server/tests/exchange_server.rs
use std::collections::HashSet;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use exchange_client::{register, PriceFeed, TradeSession};
use exchange_protocol::{parse_lot_number, OutboundFrame};
use exchange_server::config::Config;
use exchange_server::{bind, ServerHandle};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};

const WAIT: Duration = Duration::from_secs(5);
const NEVER: Duration = Duration::from_secs(3600);

async fn within<F: Future>(fut: F) -> F::Output {
    timeout(WAIT, fut).await.expect("timed out")
}

fn loopback_config(price_port: u16) -> Config {
    Config {
        bind_addr: "127.0.0.1".to_string(),
        registration_port: 0,
        trade_port: 0,
        price_port,
        broadcast_addr: "127.0.0.1".to_string(),
        price_tick: NEVER,
        event_delay_min: NEVER,
        event_delay_max: NEVER,
        registration_timeout: Duration::from_secs(2),
        ..Config::default()
    }
}

async fn start(config: Config) -> ServerHandle {
    bind(config).await.expect("bind").spawn()
}

async fn start_quiet() -> ServerHandle {
    // Nothing listens on this port; price ticks never fire anyway.
    start(loopback_config(9)).await
}

async fn wait_for_connections(handle: &ServerHandle, n: usize) {
    within(async {
        while handle.connections().len().await != n {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
}

#[tokio::test]
async fn falcon_registers_and_trades() {
    let handle = start_quiet().await;

    let id = within(register(handle.registration_addr(), "Falcon")).await.expect("register");
    assert_eq!(handle.ledger().session(id.as_str()).expect("session").name, "Falcon");

    let mut trade = within(TradeSession::connect(&handle.trade_url(), id.clone()))
        .await
        .expect("connect");
    assert_eq!(trade.session_id(), &id);

    trade.buy("QuantumOre", 5).await.expect("send");
    let res = within(trade.next_response(|_| {})).await.expect("response");
    assert!(res.success);
    assert_eq!(res.new_balance, 0);
    assert_eq!(res.inventory.expect("inventory").get("QuantumOre"), Some(&5));

    trade.sell("QuantumOre", 5).await.expect("send");
    let res = within(trade.next_response(|_| {})).await.expect("response");
    assert!(res.success);
    assert_eq!(res.new_balance, 1000);
    assert_eq!(res.inventory.expect("inventory").get("QuantumOre"), Some(&0));

    trade.buy("Unobtainium", 1).await.expect("send");
    let res = within(trade.next_response(|_| {})).await.expect("response");
    assert!(!res.success);
    assert!(res.inventory.is_none());

    trade.close().await.expect("close");
    handle.shutdown().await;
}

#[tokio::test]
async fn trade_errors_are_reported_not_fatal() {
    let handle = start_quiet().await;
    let id = within(register(handle.registration_addr(), "Skiff")).await.expect("register");
    let mut trade = within(TradeSession::connect(&handle.trade_url(), id)).await.expect("connect");

    trade.buy("GalacticGas", 13).await.expect("send");
    let res = within(trade.next_response(|_| {})).await.expect("response");
    assert!(!res.success);
    assert!(res.message.contains("insufficient credits"));

    trade.sell("GalacticGas", 1).await.expect("send");
    let res = within(trade.next_response(|_| {})).await.expect("response");
    assert!(!res.success);

    trade.buy("GalacticGas", 0).await.expect("send");
    let res = within(trade.next_response(|_| {})).await.expect("response");
    assert!(!res.success);

    // Still open and trading.
    trade.buy("GalacticGas", 12).await.expect("send");
    let res = within(trade.next_response(|_| {})).await.expect("response");
    assert!(res.success);
    assert_eq!(res.new_balance, 1000 - 12 * 80);

    handle.shutdown().await;
}

#[tokio::test]
async fn unknown_session_over_the_wire() {
    let handle = start_quiet().await;
    let mut trade = within(TradeSession::connect(&handle.trade_url(), "no-such-session".into()))
        .await
        .expect("connect");

    trade.buy("QuantumOre", 1).await.expect("send");
    let res = within(trade.next_response(|_| {})).await.expect("response");
    assert!(!res.success);
    assert!(res.message.contains("session not found"));
    assert_eq!(handle.ledger().session_count(), 0);

    handle.shutdown().await;
}

#[tokio::test]
async fn malformed_messages_are_ignored() {
    let handle = start_quiet().await;
    let id = within(register(handle.registration_addr(), "Lenient")).await.expect("register");
    let mut trade = within(TradeSession::connect(&handle.trade_url(), id)).await.expect("connect");

    trade.send_text("definitely not json".to_string()).await.expect("send");
    trade.send_text(r#"{"Action":"Hold","Amount":1}"#.to_string()).await.expect("send");
    trade.send_text(r#"{"SessionId":"x"}"#.to_string()).await.expect("send");
    trade.buy("SpaceMineral", 1).await.expect("send");

    // The first frame back answers the valid request.
    match within(trade.next_frame()).await.expect("frame") {
        Some(OutboundFrame::Response(res)) => {
            assert!(res.success);
            assert_eq!(res.new_balance, 850);
        }
        other => panic!("unexpected: {:?}", other),
    }

    handle.shutdown().await;
}

#[tokio::test]
async fn blank_registration_closes_silently() {
    let handle = start_quiet().await;

    let mut stream = within(TcpStream::connect(handle.registration_addr())).await.expect("connect");
    stream.write_all(b"   \r\n").await.expect("write");
    let mut reply = Vec::new();
    within(stream.read_to_end(&mut reply)).await.expect("read");
    assert!(reply.is_empty());

    assert!(within(register(handle.registration_addr(), "")).await.is_err());
    assert_eq!(handle.ledger().session_count(), 0);

    handle.shutdown().await;
}

#[tokio::test]
async fn stalled_registration_does_not_block_others() {
    let handle = start_quiet().await;

    let _stalled = within(TcpStream::connect(handle.registration_addr())).await.expect("connect");
    let id = within(register(handle.registration_addr(), "Punctual")).await.expect("register");
    assert!(handle.ledger().session(id.as_str()).is_some());

    handle.shutdown().await;
}

#[tokio::test]
async fn concurrent_registrations_get_distinct_ids() {
    let handle = start_quiet().await;
    let addr = handle.registration_addr();

    let tasks: Vec<_> = (0..20)
        .map(|i| tokio::spawn(async move { register(addr, &format!("Ship-{}", i)).await }))
        .collect();

    let mut ids = HashSet::new();
    for task in tasks {
        let id = within(task).await.expect("join").expect("register");
        ids.insert(id);
    }
    assert_eq!(ids.len(), 20);
    assert_eq!(handle.ledger().session_count(), 20);

    handle.shutdown().await;
}

#[tokio::test]
async fn prices_are_broadcast_each_tick() {
    let feed = PriceFeed::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await.expect("feed");
    let port = feed.local_addr().expect("addr").port();

    let handle = start(Config {
        price_tick: Duration::from_millis(50),
        ..loopback_config(port)
    })
    .await;

    for _ in 0..2 {
        let prices = within(feed.next_snapshot()).await.expect("snapshot");
        let symbols: HashSet<&str> = prices.keys().map(String::as_str).collect();
        assert_eq!(symbols, HashSet::from(["QuantumOre", "SpaceMineral", "GalacticGas"]));
        assert!(prices.values().all(|&p| p >= 1));
    }

    handle.shutdown().await;
}

#[tokio::test]
async fn market_event_reaches_survivors_after_a_disconnect() {
    let handle = start(Config {
        event_delay_min: Duration::from_millis(150),
        event_delay_max: Duration::from_millis(200),
        ..loopback_config(9)
    })
    .await;
    let url = handle.trade_url();

    let mut first = within(TradeSession::connect(&url, "a".into())).await.expect("connect");
    let dropped = within(TradeSession::connect(&url, "b".into())).await.expect("connect");
    let mut third = within(TradeSession::connect(&url, "c".into())).await.expect("connect");
    wait_for_connections(&handle, 3).await;

    // Abrupt disconnect, no close handshake.
    drop(dropped);

    for session in [&mut first, &mut third] {
        match within(session.next_frame()).await.expect("frame") {
            Some(OutboundFrame::Notice(text)) => assert!(parse_lot_number(&text).is_some()),
            other => panic!("unexpected: {:?}", other),
        }
    }

    handle.shutdown().await;
}

#[tokio::test]
async fn wrong_path_is_refused() {
    let handle = start_quiet().await;
    let url = format!("ws://{}/prices", handle.trade_addr());
    assert!(within(TradeSession::connect(&url, "x".into())).await.is_err());
    assert!(handle.connections().is_empty().await);
    handle.shutdown().await;
}

#[tokio::test]
async fn connections_beyond_the_limit_are_dropped() {
    let handle = start(Config {
        max_clients: 1,
        ..loopback_config(9)
    })
    .await;
    let url = handle.trade_url();

    let _first = within(TradeSession::connect(&url, "a".into())).await.expect("connect");
    wait_for_connections(&handle, 1).await;

    assert!(within(TradeSession::connect(&url, "b".into())).await.is_err());
    handle.shutdown().await;
}

#[tokio::test]
async fn simultaneous_connections_respect_the_limit() {
    let handle = start(Config {
        max_clients: 1,
        ..loopback_config(9)
    })
    .await;
    let url = handle.trade_url();

    let attempts: Vec<_> = (0..5)
        .map(|i| {
            let url = url.clone();
            tokio::spawn(async move { TradeSession::connect(&url, format!("ship-{}", i).into()).await })
        })
        .collect();

    let mut open = Vec::new();
    for attempt in attempts {
        if let Ok(session) = within(attempt).await.expect("join") {
            open.push(session);
        }
    }

    assert_eq!(open.len(), 1);
    wait_for_connections(&handle, 1).await;
    handle.shutdown().await;
}

/// Wait for the server to drop a raw TCP connection.
async fn wait_for_server_close(stream: &mut TcpStream) {
    let mut buf = [0u8; 64];
    // A clean EOF or a reset both mean the server let go.
    if let Ok(n) = within(stream.read(&mut buf)).await {
        assert_eq!(n, 0, "unexpected bytes from server");
    }
}

#[tokio::test]
async fn stalled_handshake_times_out_and_frees_its_slot() {
    let handle = start(Config {
        max_clients: 1,
        handshake_timeout: Duration::from_millis(300),
        ..loopback_config(9)
    })
    .await;

    // TCP only, never sends the upgrade request.
    let mut stalled = within(TcpStream::connect(handle.trade_addr())).await.expect("tcp");
    wait_for_server_close(&mut stalled).await;

    let _trade = within(TradeSession::connect(&handle.trade_url(), "after".into()))
        .await
        .expect("slot freed");
    wait_for_connections(&handle, 1).await;
    handle.shutdown().await;
}

#[tokio::test]
async fn shutdown_abandons_pending_handshakes() {
    let handle = start(Config {
        handshake_timeout: NEVER,
        ..loopback_config(9)
    })
    .await;

    let mut stalled = within(TcpStream::connect(handle.trade_addr())).await.expect("tcp");
    // Let the listener accept it before shutting down.
    sleep(Duration::from_millis(100)).await;
    handle.shutdown().await;

    wait_for_server_close(&mut stalled).await;
}

#[tokio::test]
async fn shutdown_closes_connections_and_listeners() {
    let handle = start_quiet().await;
    let registration = handle.registration_addr();
    let id = within(register(registration, "Last")).await.expect("register");
    let mut trade = within(TradeSession::connect(&handle.trade_url(), id)).await.expect("connect");
    wait_for_connections(&handle, 1).await;
    let connections = handle.connections();

    handle.shutdown().await;

    // Closed by the server: either a clean close or a reset.
    match within(trade.next_frame()).await {
        Ok(None) | Err(_) => {}
        Ok(Some(frame)) => panic!("unexpected frame after shutdown: {:?}", frame),
    }
    wait_for_empty(&connections).await;

    assert!(within(register(registration, "TooLate")).await.is_err());
}

async fn wait_for_empty(connections: &exchange_server::types::ConnectionSet) {
    within(async {
        while !connections.is_empty().await {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
}
