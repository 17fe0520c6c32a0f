pub mod game;
pub mod lobby;
pub(crate) mod network;

pub use game::*;
pub use lobby::{serve, start_server, ConnectionInitError, Messages, Responses};
pub use network::{Conn, ConnectionError, Received};

pub(crate) const CHANNEL_SIZE: usize = 16;
