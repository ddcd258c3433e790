// crates/exchange-client/src/registration.rs

use anyhow::{bail, Context, Result};
use exchange_core::SessionId;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::debug;

/// Register `ship_name` and return the issued session id.
///
/// The server closes the connection without a reply when it refuses a
/// registration; that surfaces here as an error.
pub async fn register<A: ToSocketAddrs>(addr: A, ship_name: &str) -> Result<SessionId> {
    let mut stream = TcpStream::connect(addr)
        .await
        .context("connecting to registration server")?;

    stream
        .write_all(ship_name.as_bytes())
        .await
        .context("sending ship name")?;

    let mut reply = String::new();
    stream
        .read_to_string(&mut reply)
        .await
        .context("reading session id")?;

    let id = reply.trim();
    if id.is_empty() {
        bail!("registration refused for {:?}", ship_name);
    }

    debug!(ship = ship_name, session = id, "registered");
    Ok(SessionId::from(id))
}
