//! Network Infrastructure
//!
//! Framed, checksummed `bincode` messages over TCP.
pub(crate) mod connection;
pub(crate) mod utility;
pub use connection::{Conn, ConnectionError, Received};
