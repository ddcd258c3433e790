//! Registration listener.
//!
//! One request/response per TCP connection:
//! `Accepted → AwaitingName → SessionIssued → Closed`.
//!
//! The client writes its ship name as raw text; the server answers with
//! the session id as raw text and closes. There is no error payload: a
//! timeout, read failure or empty name just closes the connection.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use exchange_core::{Ledger, SessionId};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Largest ship name read from a single registration.
pub(crate) const MAX_NAME_LEN: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RegistrationState {
    Accepted,
    AwaitingName,
    SessionIssued,
    Closed,
}

struct Registration {
    peer: SocketAddr,
    state: RegistrationState,
}

impl Registration {
    fn advance(&mut self, next: RegistrationState) {
        debug!(peer = %self.peer, from = ?self.state, to = ?next, "registration state");
        self.state = next;
    }
}

/// Accept registrations until `cancel` fires.
///
/// Each connection gets its own task, so a stalled client only holds up
/// itself.
pub(crate) async fn run_registration_listener(
    listener: TcpListener,
    ledger: Arc<Ledger>,
    read_timeout: Duration,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let ledger = Arc::clone(&ledger);
                    tokio::spawn(async move {
                        match handle_registration(stream, peer, &ledger, read_timeout).await {
                            Ok(Some(id)) => debug!(%peer, session = %id, "registration complete"),
                            Ok(None) => debug!(%peer, "registration closed without a session"),
                            Err(e) => warn!(%peer, error = %e, "registration failed"),
                        }
                    });
                }
                Err(e) => warn!(error = %e, "registration accept failed"),
            }
        }
    }

    info!("registration listener stopped");
}

/// Serve one registration connection.
///
/// Returns the issued id, or `None` if the peer never sent a usable name.
pub(crate) async fn handle_registration(
    mut stream: TcpStream,
    peer: SocketAddr,
    ledger: &Ledger,
    read_timeout: Duration,
) -> Result<Option<SessionId>> {
    let mut reg = Registration {
        peer,
        state: RegistrationState::Accepted,
    };
    reg.advance(RegistrationState::AwaitingName);

    let mut buf = [0u8; MAX_NAME_LEN];
    let n = match timeout(read_timeout, stream.read(&mut buf)).await {
        Ok(read) => read.context("reading ship name")?,
        Err(_) => {
            debug!(%peer, "timed out waiting for ship name");
            reg.advance(RegistrationState::Closed);
            return Ok(None);
        }
    };

    let name = String::from_utf8_lossy(&buf[..n]);
    let name = name.trim();
    if name.is_empty() {
        reg.advance(RegistrationState::Closed);
        return Ok(None);
    }

    let id = ledger.register_session(name)?;
    stream
        .write_all(id.as_str().as_bytes())
        .await
        .context("writing session id")?;
    reg.advance(RegistrationState::SessionIssued);
    info!(%peer, ship = name, session = %id, "ship registered");

    // Best effort: the peer may already be gone.
    let _ = stream.shutdown().await;
    reg.advance(RegistrationState::Closed);

    Ok(Some(id))
}
