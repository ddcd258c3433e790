//! Configuration for the exchange server.
//!
//! Use the defaults or override via environment variables:
//!
//! - `EXCHANGE_BIND_ADDR`                  (default: "0.0.0.0")
//! - `EXCHANGE_REGISTRATION_PORT`          (default: "5001")
//! - `EXCHANGE_PRICE_PORT`                 (default: "5002")
//! - `EXCHANGE_BROADCAST_ADDR`             (default: "255.255.255.255")
//! - `EXCHANGE_TRADE_PORT`                 (default: "5003")
//! - `EXCHANGE_MAX_CLIENTS`                (default: "1024")
//! - `EXCHANGE_PRICE_TICK_SECS`            (default: "30")
//! - `EXCHANGE_EVENT_MIN_SECS`             (default: "60")
//! - `EXCHANGE_EVENT_MAX_SECS`             (default: "300")
//! - `EXCHANGE_REGISTRATION_TIMEOUT_SECS`  (default: "10")
//! - `EXCHANGE_HANDSHAKE_TIMEOUT_SECS`     (default: "10")

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// IP address / interface the TCP listeners bind to.
    pub bind_addr: String,

    /// TCP port for ship registration.
    pub registration_port: u16,

    /// UDP port price updates are sent to.
    pub price_port: u16,

    /// Destination address for price datagrams (normally the broadcast address).
    pub broadcast_addr: String,

    /// TCP port for the WebSocket trade/event channel.
    pub trade_port: u16,

    /// Maximum number of simultaneously open trade connections.
    pub max_clients: usize,

    /// Period between price ticks.
    pub price_tick: Duration,

    /// Bounds of the random delay between market events (inclusive).
    pub event_delay_min: Duration,
    pub event_delay_max: Duration,

    /// How long a registration client has to send its ship name.
    pub registration_timeout: Duration,

    /// How long a trade client has to complete the WebSocket upgrade.
    pub handshake_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: "0.0.0.0".to_string(),
            registration_port: 5001,
            price_port: 5002,
            broadcast_addr: "255.255.255.255".to_string(),
            trade_port: 5003,
            max_clients: 1024,
            price_tick: Duration::from_secs(30),
            event_delay_min: Duration::from_secs(60),
            event_delay_max: Duration::from_secs(300),
            registration_timeout: Duration::from_secs(10),
            handshake_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    /// Construct a `Config` from environment variables, falling back
    /// to the defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        let config = Config {
            bind_addr: env::var("EXCHANGE_BIND_ADDR").unwrap_or(defaults.bind_addr),
            registration_port: read_env_or_default("EXCHANGE_REGISTRATION_PORT", defaults.registration_port)?,
            price_port: read_env_or_default("EXCHANGE_PRICE_PORT", defaults.price_port)?,
            broadcast_addr: env::var("EXCHANGE_BROADCAST_ADDR").unwrap_or(defaults.broadcast_addr),
            trade_port: read_env_or_default("EXCHANGE_TRADE_PORT", defaults.trade_port)?,
            max_clients: read_env_or_default("EXCHANGE_MAX_CLIENTS", defaults.max_clients)?,
            price_tick: read_secs_or_default("EXCHANGE_PRICE_TICK_SECS", defaults.price_tick)?,
            event_delay_min: read_secs_or_default("EXCHANGE_EVENT_MIN_SECS", defaults.event_delay_min)?,
            event_delay_max: read_secs_or_default("EXCHANGE_EVENT_MAX_SECS", defaults.event_delay_max)?,
            registration_timeout: read_secs_or_default(
                "EXCHANGE_REGISTRATION_TIMEOUT_SECS",
                defaults.registration_timeout,
            )?,
            handshake_timeout: read_secs_or_default(
                "EXCHANGE_HANDSHAKE_TIMEOUT_SECS",
                defaults.handshake_timeout,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the scheduler or listeners cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.price_tick.is_zero() {
            bail!("price tick period must be non-zero");
        }
        if self.event_delay_min.is_zero() {
            bail!("market event delay must be non-zero");
        }
        if self.event_delay_min > self.event_delay_max {
            bail!(
                "market event delay range is empty: {:?} > {:?}",
                self.event_delay_min,
                self.event_delay_max
            );
        }
        if self.registration_timeout.is_zero() {
            bail!("registration timeout must be non-zero");
        }
        if self.handshake_timeout.is_zero() {
            bail!("handshake timeout must be non-zero");
        }
        if self.max_clients == 0 {
            bail!("max_clients must be at least 1");
        }
        self.broadcast_target()?;
        Ok(())
    }

    /// `bind_addr:registration_port`
    pub fn registration_addr_string(&self) -> String {
        format!("{}:{}", self.bind_addr, self.registration_port)
    }

    /// `bind_addr:trade_port`
    pub fn trade_addr_string(&self) -> String {
        format!("{}:{}", self.bind_addr, self.trade_port)
    }

    /// Where price datagrams go.
    pub fn broadcast_target(&self) -> Result<SocketAddr> {
        let target = format!("{}:{}", self.broadcast_addr, self.price_port);
        target
            .parse()
            .with_context(|| format!("invalid broadcast address {}", target))
    }
}

fn read_env_or_default<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .with_context(|| format!("invalid value for {}: {:?}", key, val)),
        Err(_) => Ok(default),
    }
}

fn read_secs_or_default(key: &str, default: Duration) -> Result<Duration> {
    read_env_or_default(key, default.as_secs()).map(Duration::from_secs)
}
