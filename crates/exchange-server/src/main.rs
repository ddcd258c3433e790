//! Exchange server binary.

use anyhow::Result;
use clap::Parser;
use exchange_server::config::Config;
use exchange_server::server;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "exchange-server")]
#[command(about = "Space resource exchange: TCP registration, UDP prices, WebSocket trading")]
struct Cli {
    /// TCP port for ship registration
    #[arg(long)]
    registration_port: Option<u16>,

    /// UDP port price updates are broadcast to
    #[arg(long)]
    price_port: Option<u16>,

    /// TCP port for the WebSocket trade channel
    #[arg(long)]
    trade_port: Option<u16>,

    /// Destination address for price datagrams
    #[arg(long)]
    broadcast_addr: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = Config::from_env()?;
    if let Some(port) = cli.registration_port {
        config.registration_port = port;
    }
    if let Some(port) = cli.price_port {
        config.price_port = port;
    }
    if let Some(port) = cli.trade_port {
        config.trade_port = port;
    }
    if let Some(addr) = cli.broadcast_addr {
        config.broadcast_addr = addr;
    }

    tracing::info!(
        registration_port = config.registration_port,
        price_port = config.price_port,
        trade_port = config.trade_port,
        max_clients = config.max_clients,
        "starting exchange-server"
    );

    server::run(config).await
}
