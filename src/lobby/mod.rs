mod client_connection;
mod game_manager;
mod game_session;
pub(crate) mod messages;

use crate::game::SessionConfig;
use anyhow::Result;
use async_std::net::TcpListener;
use async_std::task;
pub use client_connection::{ClientConnection, ConnectionInitError, NameRegistry};
use game_manager::GameManager;
use log::{info, warn};
pub use messages::{Messages, Responses};
use std::net::SocketAddrV4;

pub async fn start_server(addrs: SocketAddrV4, session_config: SessionConfig) -> Result<()> {
    let listener = TcpListener::bind(addrs).await?;
    info!("server listening on {}", addrs);
    serve(listener, session_config).await
}

/// accept connections on `listener` until it fails
pub async fn serve(listener: TcpListener, session_config: SessionConfig) -> Result<()> {
    let names = NameRegistry::new();
    let game_manager = GameManager::new(session_config);
    loop {
        let (stream, socket) = listener.accept().await?;
        let names = names.clone();
        let game_manager = game_manager.clone();
        task::spawn(async move {
            match ClientConnection::init(stream, socket, names).await {
                Ok(conn) => game_manager.accept_connection(conn),
                Err((e, Some(conn))) => {
                    warn!("connection from {} refused: {}", socket, e);
                    let _ = conn
                        .sender()
                        .send(Responses::ConnectionInitFailure(e))
                        .await;
                }
                Err((e, None)) => warn!("connection from {} lost: {}", socket, e),
            }
        });
    }
}
