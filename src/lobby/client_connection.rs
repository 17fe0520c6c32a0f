use crate::lobby::messages::{Messages, Responses};
use crate::network::{Conn, ConnectionError, Received};
use async_std::net::TcpStream;
use async_std::prelude::Stream;
use async_std::sync::Mutex;
use async_std::task::block_on;
use bincode::{Decode, Encode};
use futures::StreamExt;
use log::{error, info};
use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use unicode_segmentation::UnicodeSegmentation;

const PING_INTERVAL: Duration = Duration::from_secs(5);
const MAX_DATA_SIZE: u32 = 1024 * 64;
const MAX_NAME_GRAPHEMES: usize = 32;

#[derive(Clone, Debug, PartialEq, Encode, Decode)]
pub enum ConnectionInitError {
    ConnectionClosed,
    NameNotReceived,
    NameTooLong,
    NameExists,
    InvalidName,
    NetworkError(ConnectionError),
}

/// Names of the connected players, compared case-insensitively.
pub struct NameRegistry {
    names: HashSet<String>,
    current_uid: u64,
}

impl NameRegistry {
    pub fn new() -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(NameRegistry {
            names: HashSet::new(),
            current_uid: 0,
        }))
    }

    /// register `name`, returning a fresh player id
    fn register(&mut self, name: &str) -> Result<u64, ConnectionInitError> {
        validate_name(name)?;
        if !self.names.insert(name.to_lowercase()) {
            return Err(ConnectionInitError::NameExists);
        }
        self.current_uid = self.current_uid.wrapping_add(1);
        Ok(self.current_uid)
    }

    fn remove(&mut self, name: &str) {
        self.names.remove(&name.to_lowercase());
    }
}

/// a name is non-blank, single line, and at most 32 graphemes
fn validate_name(name: &str) -> Result<(), ConnectionInitError> {
    if name.trim().is_empty() || name.chars().any(char::is_control) {
        return Err(ConnectionInitError::InvalidName);
    }
    if name.graphemes(true).count() > MAX_NAME_GRAPHEMES {
        return Err(ConnectionInitError::NameTooLong);
    }
    Ok(())
}

pub struct ClientConnection {
    inner: Conn<Responses, Messages>,
    player_name: String,
    player_id: u64,
    socket_address: SocketAddr,
    names: Arc<Mutex<NameRegistry>>,
}

/// Handle Client Connection
///
/// # Convention
///
/// The connection should start by sending `Messages::Name(name)`,
/// otherwise the connection will return `NameNotReceived`.
impl ClientConnection {
    pub async fn init(
        tcp: TcpStream,
        socket_address: SocketAddr,
        names: Arc<Mutex<NameRegistry>>,
    ) -> Result<Self, (ConnectionInitError, Option<Conn<Responses, Messages>>)> {
        let mut inner = Conn::init(tcp, Some(PING_INTERVAL), MAX_DATA_SIZE);
        let (player_name, player_id) = loop {
            match inner.next().await {
                None => return Err((ConnectionInitError::ConnectionClosed, None)),
                Some(Received::Response(Messages::Name(name))) => {
                    let registered = names.lock().await.register(&name);
                    match registered {
                        Ok(id) => break (name, id),
                        Err(e) => return Err((e, Some(inner))),
                    }
                }
                Some(Received::Response(_)) => {
                    return Err((ConnectionInitError::NameNotReceived, Some(inner)))
                }
                // jump over Ping
                Some(Received::Ping) => {}
                Some(Received::Error(e)) | Some(Received::RemoteError(e)) => {
                    return Err((ConnectionInitError::NetworkError(e), Some(inner)))
                }
            }
        };
        info!("player {player_id}: {player_name} connected to server from {socket_address}");
        let _ = inner
            .sender()
            .send(Responses::NameAccepted(player_name.clone()))
            .await;
        Ok(ClientConnection {
            inner,
            player_name,
            player_id,
            socket_address,
            names,
        })
    }

    pub(crate) fn sender(&self) -> &async_std::channel::Sender<Responses> {
        self.inner.sender()
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    pub fn player_id(&self) -> u64 {
        self.player_id
    }
}

impl Stream for ClientConnection {
    type Item = Messages;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            // this loop skips `Ping`
            match self.inner.poll_next_unpin(cx) {
                Poll::Ready(None) => break Poll::Ready(None),
                Poll::Ready(Some(Received::Response(msg))) => break Poll::Ready(Some(msg)),
                Poll::Ready(Some(Received::Ping)) => {}
                Poll::Ready(Some(Received::Error(e))) => {
                    // log and quit on connection error automatically
                    let address = self.socket_address;
                    error!("connection error ({e}) of {address}");
                    break Poll::Ready(None);
                }
                Poll::Ready(Some(Received::RemoteError(e))) => {
                    let address = self.socket_address;
                    error!("remote connection error ({e}) of {address}");
                    break Poll::Ready(None);
                }
                Poll::Pending => break Poll::Pending,
            }
        }
    }
}

impl Drop for ClientConnection {
    fn drop(&mut self) {
        info!(
            "player {}: {} ({}) disconnected from server",
            self.player_id, self.player_name, self.socket_address
        );
        block_on(self.names.lock()).remove(&self.player_name);
    }
}

impl Display for ConnectionInitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionInitError::ConnectionClosed => f.write_str("connection closed"),
            ConnectionInitError::NameNotReceived => f.write_str("name not received"),
            ConnectionInitError::NameTooLong => f.write_str("name too long"),
            ConnectionInitError::NameExists => f.write_str("name already in use"),
            ConnectionInitError::InvalidName => f.write_str("invalid name"),
            ConnectionInitError::NetworkError(e) => write!(f, "network error: {}", e),
        }
    }
}

#[cfg(test)]
mod test_names {
    use super::*;

    #[test]
    fn names_are_validated() {
        assert_eq!(validate_name("枫原万叶"), Ok(()));
        assert_eq!(validate_name(""), Err(ConnectionInitError::InvalidName));
        assert_eq!(validate_name("   "), Err(ConnectionInitError::InvalidName));
        assert_eq!(validate_name("a\nb"), Err(ConnectionInitError::InvalidName));
        assert_eq!(validate_name(&"x".repeat(32)), Ok(()));
        assert_eq!(
            validate_name(&"x".repeat(33)),
            Err(ConnectionInitError::NameTooLong)
        );
        // one grapheme, several bytes
        assert_eq!(validate_name(&"é".repeat(32)), Ok(()));
    }

    #[test]
    fn names_are_unique_ignoring_case() {
        let registry = NameRegistry::new();
        let mut registry = block_on(registry.lock());
        let first = registry.register("Alice").unwrap();
        assert_eq!(
            registry.register("aLICE"),
            Err(ConnectionInitError::NameExists)
        );
        let second = registry.register("bob").unwrap();
        assert_ne!(first, second);
        registry.remove("ALICE");
        assert!(registry.register("alice").is_ok());
    }
}
