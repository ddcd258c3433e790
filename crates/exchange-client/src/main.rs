// crates/exchange-client/src/main.rs

use std::net::SocketAddr;

use anyhow::Result;
use clap::{Parser, Subcommand};
use exchange_client::{register, PriceFeed, TradeSession};
use exchange_core::{SessionId, Side};
use exchange_protocol::OutboundFrame;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "exchange-client")]
#[command(about = "Command-line client for the space resource exchange")]
struct Cli {
    /// Server host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Registration (TCP) port
    #[arg(long, default_value_t = 5001)]
    registration_port: u16,

    /// Trade channel (WebSocket) port
    #[arg(long, default_value_t = 5003)]
    trade_port: u16,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register a ship and print its session id
    Register {
        name: String,
    },
    /// Print price updates as they arrive
    Prices {
        /// UDP port to listen on
        #[arg(long, default_value_t = 5002)]
        port: u16,
    },
    /// Send one trade and print the response
    Trade {
        #[arg(long)]
        session: String,
        #[arg(value_enum)]
        action: Action,
        resource: String,
        amount: i64,
    },
    /// Print market-event notices as they arrive
    Events {
        /// Session id to attach (not needed for notices)
        #[arg(long, default_value = "")]
        session: String,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum Action {
    Buy,
    Sell,
}

impl From<Action> for Side {
    fn from(action: Action) -> Self {
        match action {
            Action::Buy => Side::Buy,
            Action::Sell => Side::Sell,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let trade_url = format!("ws://{}:{}/ws", cli.host, cli.trade_port);

    match cli.command {
        Command::Register { name } => {
            let id = register((cli.host.as_str(), cli.registration_port), &name).await?;
            println!("{}", id);
        }
        Command::Prices { port } => {
            let feed = PriceFeed::bind(SocketAddr::from(([0, 0, 0, 0], port))).await?;
            info!(port, "listening for prices");
            loop {
                let prices = feed.next_snapshot().await?;
                let line: Vec<String> = prices.iter().map(|(s, p)| format!("{}={}", s, p)).collect();
                println!("{}", line.join(" "));
            }
        }
        Command::Trade {
            session,
            action,
            resource,
            amount,
        } => {
            let mut trade = TradeSession::connect(&trade_url, SessionId::from(session)).await?;
            info!(session = %trade.session_id(), "trading");
            trade.request(action.into(), &resource, amount).await?;
            let res = trade.next_response(|notice| println!("event: {}", notice)).await?;
            println!(
                "{}: {} (balance {})",
                if res.success { "ok" } else { "failed" },
                res.message,
                res.new_balance
            );
            if let Some(inventory) = res.inventory {
                for (symbol, qty) in inventory {
                    println!("  {} x{}", symbol, qty);
                }
            }
            trade.close().await?;
        }
        Command::Events { session } => {
            let mut trade = TradeSession::connect(&trade_url, SessionId::from(session)).await?;
            while let Some(frame) = trade.next_frame().await? {
                match frame {
                    OutboundFrame::Notice(text) => println!("event: {}", text),
                    OutboundFrame::Response(res) => println!("response: {}", res.message),
                }
            }
        }
    }

    Ok(())
}
