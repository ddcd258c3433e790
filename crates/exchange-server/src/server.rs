//! Listener binding and top-level server wiring.
//!
//! This module:
//! - Binds the registration listener, the trade listener and the price
//!   broadcast socket (failure here is the only fatal error).
//! - Spawns:
//!   - the two accept loops, which spawn one task per connection,
//!   - the price ticker and the market-event task.
//! - Stops all of them through one cancellation token.
//!
//! The per-connection logic and the periodic loops live in the
//! `registration`, `trade_channel` and `scheduler` modules.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use exchange_core::Ledger;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::price_broadcaster::PriceBroadcaster;
use crate::registration::run_registration_listener;
use crate::scheduler::{run_market_events, run_price_ticker};
use crate::trade_channel::{run_trade_listener, TradeChannel, TRADE_PATH};
use crate::types::ConnectionSet;

/// A server whose sockets are bound but whose tasks are not running yet.
#[derive(Debug)]
pub struct BoundServer {
    config: Config,
    ledger: Arc<Ledger>,
    connections: ConnectionSet,
    registration: TcpListener,
    registration_addr: SocketAddr,
    trade: TcpListener,
    trade_addr: SocketAddr,
    broadcaster: PriceBroadcaster,
}

/// Bind every socket with a fresh ledger.
pub async fn bind(config: Config) -> Result<BoundServer> {
    bind_with_ledger(config, Arc::new(Ledger::new())).await
}

/// Bind every socket around an existing ledger.
pub async fn bind_with_ledger(config: Config, ledger: Arc<Ledger>) -> Result<BoundServer> {
    config.validate()?;

    let addr = config.registration_addr_string();
    let registration = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding registration listener on {}", addr))?;
    let registration_addr = registration.local_addr()?;

    let addr = config.trade_addr_string();
    let trade = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding trade listener on {}", addr))?;
    let trade_addr = trade.local_addr()?;

    let broadcaster = PriceBroadcaster::bind(config.broadcast_target()?).await?;

    Ok(BoundServer {
        config,
        ledger,
        connections: ConnectionSet::new(),
        registration,
        registration_addr,
        trade,
        trade_addr,
        broadcaster,
    })
}

impl BoundServer {
    pub fn registration_addr(&self) -> SocketAddr {
        self.registration_addr
    }

    pub fn trade_addr(&self) -> SocketAddr {
        self.trade_addr
    }

    pub fn ledger(&self) -> Arc<Ledger> {
        Arc::clone(&self.ledger)
    }

    pub fn connections(&self) -> ConnectionSet {
        self.connections.clone()
    }

    /// Start the accept loops and periodic tasks.
    pub fn spawn(self) -> ServerHandle {
        let cancel = CancellationToken::new();
        let BoundServer {
            config,
            ledger,
            connections,
            registration,
            registration_addr,
            trade,
            trade_addr,
            broadcaster,
        } = self;

        info!(
            registration = %registration_addr,
            trade = %trade_addr,
            path = TRADE_PATH,
            prices = %broadcaster.target(),
            "exchange server started"
        );

        let tasks = vec![
            tokio::spawn(run_registration_listener(
                registration,
                Arc::clone(&ledger),
                config.registration_timeout,
                cancel.clone(),
            )),
            tokio::spawn(run_trade_listener(
                trade,
                TradeChannel::new(
                    Arc::clone(&ledger),
                    connections.clone(),
                    config.max_clients,
                    config.handshake_timeout,
                ),
                cancel.clone(),
            )),
            tokio::spawn(run_price_ticker(
                broadcaster,
                Arc::clone(&ledger),
                config.price_tick,
                cancel.clone(),
            )),
            tokio::spawn(run_market_events(
                connections.clone(),
                config.event_delay_min,
                config.event_delay_max,
                cancel.clone(),
            )),
        ];

        ServerHandle {
            cancel,
            tasks,
            ledger,
            connections,
            registration_addr,
            trade_addr,
        }
    }
}

/// Handle to a running server.
#[derive(Debug)]
pub struct ServerHandle {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    ledger: Arc<Ledger>,
    connections: ConnectionSet,
    registration_addr: SocketAddr,
    trade_addr: SocketAddr,
}

impl ServerHandle {
    pub fn registration_addr(&self) -> SocketAddr {
        self.registration_addr
    }

    pub fn trade_addr(&self) -> SocketAddr {
        self.trade_addr
    }

    /// `ws://` URL of the trade channel (loopback if bound to all interfaces).
    pub fn trade_url(&self) -> String {
        let mut addr = self.trade_addr;
        if addr.ip().is_unspecified() {
            addr.set_ip(std::net::Ipv4Addr::LOCALHOST.into());
        }
        format!("ws://{}{}", addr, TRADE_PATH)
    }

    pub fn ledger(&self) -> Arc<Ledger> {
        Arc::clone(&self.ledger)
    }

    pub fn connections(&self) -> ConnectionSet {
        self.connections.clone()
    }

    /// Stop accepting, stop the periodic tasks and close open trade
    /// connections. Waits for the accept loops and periodic tasks.
    pub async fn shutdown(self) {
        info!("exchange server shutting down");
        self.cancel.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "server task failed");
            }
        }
    }
}

/// Bind, serve until Ctrl-C, then shut down.
pub async fn run(config: Config) -> Result<()> {
    let server = bind(config).await?;
    let handle = server.spawn();

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;

    handle.shutdown().await;
    Ok(())
}
