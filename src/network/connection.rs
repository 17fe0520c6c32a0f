//! A wrapper to convert a TCP connection into a channel `Sender` and a `Stream`.
//!
//! Every payload is a `bincode` value framed as `[TYPE, SIZE, PAYLOAD, CRC32]`.
//!
//! - Any tcp write failure closes both sides of the connection.
//! - When the remote side closes its write half, the stream ends.
//! - With pinging enabled, a broken network is eventually detected as a
//!   write failure.
//! - Dropping `Conn` closes both sides of the connection.
//!
//! The following errors on receiving are reported to the remote socket
//! before the connection is closed:
//!
//! - DecodeError: fail to decode payload bytes
//! - MaxDataLengthExceeded: data payload too long
//! - DataCorrupted: checksum does not match
//! - UnknownMessageType: message type byte does not match
use crate::network::utility::{self, BIN_CONFIG};
use async_std::channel::{bounded, Receiver, Sender};
use async_std::io::BufReader;
use async_std::net::TcpStream;
use async_std::prelude::Stream;
use async_std::task;
use bincode::{decode_from_slice, encode_to_vec, Decode, Encode};
use crc32fast::hash as checksum;
use futures::{AsyncWriteExt, StreamExt};
use log::{error, warn};
use std::fmt::{Debug, Display, Formatter};
use std::io::ErrorKind;
use std::net::Shutdown;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

const NET_CHANNEL_SIZE: usize = 20;

/// Connection portal.
///
/// The first type parameter is the type of messages sent,
/// the second type parameter is the type of responses received.
///
/// dropping this struct will close the connection
pub struct Conn<Msg, Rsp> {
    sender: Sender<Msg>,
    receiver: Receiver<Received<Rsp>>,
}

impl<Msg, Rsp> Conn<Msg, Rsp>
where
    Msg: Send + 'static + Encode,
    Rsp: Send + 'static + Decode<()>,
{
    pub fn init(tcp: TcpStream, ping_interval: Option<Duration>, max_data_size: u32) -> Self {
        let (msg_sender, msg_receiver) = bounded(NET_CHANNEL_SIZE);
        let (rsp_sender, rsp_receiver) = bounded(NET_CHANNEL_SIZE);
        if let Some(ping_interval) = ping_interval {
            send_ping(&tcp, ping_interval);
        }
        send_messages(&tcp, msg_receiver, max_data_size);
        retrieve_messages(&tcp, rsp_sender, max_data_size);
        Conn {
            sender: msg_sender,
            receiver: rsp_receiver,
        }
    }
}

impl<Msg, Rsp> Conn<Msg, Rsp> {
    pub fn sender(&self) -> &Sender<Msg> {
        &self.sender
    }
}

impl<Msg, Rsp> Stream for Conn<Msg, Rsp> {
    type Item = Received<Rsp>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_next_unpin(cx)
    }
}

/// wrapper of responses received
pub enum Received<T> {
    /// normal message received
    Response(T),
    /// ping
    Ping,
    /// local socket error
    Error(ConnectionError),
    /// remote socket error: reason for connection close
    RemoteError(ConnectionError),
}

#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub enum ConnectionError {
    /// Attempting to send or receive over-sized data payload
    MaxDataLengthExceeded,
    /// Cannot decode message type
    UnknownMessageType,
    /// checksum incorrect
    DataCorrupted,
    /// payload is not a valid bincode value
    DecodeError,
    /// Cannot decode error message
    UnknownError,
}

enum Frame<Msg> {
    Data(Msg),
    Ping,
    Error(ConnectionError),
}

// frame types
const DATA: u8 = 0;
const PING: u8 = 100;
const ERROR: u8 = 200;

/// This function takes the ownership of the only instance of `Sender<Rsp>`.
///
/// Dropping the receiver of responses closes *both* sides of the connection.
fn retrieve_messages<Rsp>(tcp: &TcpStream, rsp_sender: Sender<Received<Rsp>>, max_data_size: u32)
where
    Rsp: Send + 'static + Decode<()>,
{
    let mut tcp = tcp.clone();
    let inner = tcp.clone();
    task::spawn(async move {
        let mut reader = BufReader::new(inner);
        loop {
            match read_frame::<Rsp>(&mut reader, max_data_size).await {
                Ok(Some(rsp)) => {
                    if rsp_sender.send(rsp).await.is_err() {
                        let _ = tcp.shutdown(Shutdown::Both);
                        break;
                    }
                }
                // no more frames to read
                Ok(None) => {
                    let _ = tcp.shutdown(Shutdown::Read);
                    break;
                }
                Err(e) => {
                    warn!("closing connection on receive error: {}", e);
                    let _ = rsp_sender.send(Received::Error(e.clone())).await;
                    let _ = write_frame::<()>(&mut tcp, Frame::Error(e), 0).await;
                    let _ = tcp.shutdown(Shutdown::Both);
                    break;
                }
            }
        }
    });
}

/// This function takes the ownership of `Receiver<Msg>`.
///
/// Dropping all instances of `Sender<Msg>` closes the connection.
///
/// An over-sized message is logged and skipped. Any other write error
/// closes *both* sides of the connection.
fn send_messages<Msg>(tcp: &TcpStream, mut msg_receiver: Receiver<Msg>, max_data_size: u32)
where
    Msg: Send + 'static + Encode,
{
    let mut tcp = tcp.clone();
    task::spawn(async move {
        while let Some(msg) = msg_receiver.next().await {
            if let Err(e) = write_frame(&mut tcp, Frame::Data(msg), max_data_size).await {
                if e.kind() == ErrorKind::InvalidData {
                    error!("message not sent: {}", e);
                } else {
                    break;
                }
            }
        }
        let _ = tcp.shutdown(Shutdown::Both);
    });
}

/// Check if tcp connection is still alive by pinging,
/// shutdown connection when pinging fails.
fn send_ping(tcp: &TcpStream, ping_interval: Duration) {
    let mut tcp = tcp.clone();
    task::spawn(async move {
        loop {
            task::sleep(ping_interval).await;
            if write_frame::<()>(&mut tcp, Frame::Ping, 0).await.is_err() {
                let _ = tcp.shutdown(Shutdown::Both);
                break;
            }
        }
    });
}

/// `Ok(Some)` if a frame was read.
/// `Ok(None)` if there is no more data to read.
async fn read_frame<Rsp>(
    reader: &mut BufReader<TcpStream>,
    max_data_size: u32,
) -> Result<Option<Received<Rsp>>, ConnectionError>
where
    Rsp: Decode<()>,
{
    let frame_type = match utility::read_one_byte(reader).await {
        None => return Ok(None),
        Some(t) => t,
    };
    match frame_type {
        DATA => {
            let size = match utility::read_be_u32(reader).await {
                None => return Ok(None),
                Some(s) => s,
            };
            if size > max_data_size {
                return Err(ConnectionError::MaxDataLengthExceeded);
            }
            let payload = match utility::read_n_bytes(reader, size).await {
                None => return Ok(None),
                Some(p) => p,
            };
            let check_sum = match utility::read_be_u32(reader).await {
                None => return Ok(None),
                Some(s) => s,
            };
            if checksum(&payload) != check_sum {
                return Err(ConnectionError::DataCorrupted);
            }
            match decode_from_slice(&payload, BIN_CONFIG) {
                Ok((rsp, _)) => Ok(Some(Received::Response(rsp))),
                Err(_) => Err(ConnectionError::DecodeError),
            }
        }
        ERROR => {
            let error_code = match utility::read_one_byte(reader).await {
                None => return Ok(None),
                Some(c) => c,
            };
            Ok(Some(Received::RemoteError(
                ConnectionError::from_error_code(error_code),
            )))
        }
        PING => Ok(Some(Received::Ping)),
        _ => Err(ConnectionError::UnknownMessageType),
    }
}

/// Attempt to write a frame to TcpStream.
///
/// If the payload cannot be encoded or is too large, return `InvalidData`.
async fn write_frame<Msg: Encode>(
    tcp: &mut TcpStream,
    frame: Frame<Msg>,
    max_data_size: u32,
) -> std::io::Result<()> {
    match frame {
        Frame::Data(msg) => {
            let payload = encode_to_vec(msg, BIN_CONFIG)
                .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e.to_string()))?;
            let bytes = wrap_data_payload(&payload, max_data_size)?;
            tcp.write_all(&bytes).await
        }
        Frame::Error(e) => tcp.write_all(&[ERROR, e.error_code()]).await,
        Frame::Ping => tcp.write_all(&[PING]).await,
    }
}

/// Write data bytes and checksum.
///
/// structure: `[TYPE, SIZE, PAYLOAD, CHECKSUM]`
#[inline]
pub(crate) fn wrap_data_payload(payload: &[u8], max_data_len: u32) -> std::io::Result<Vec<u8>> {
    let size = payload.len();
    if size > max_data_len as usize {
        return Err(std::io::Error::new(
            ErrorKind::InvalidData,
            "payload too large",
        ));
    }
    // type + payload size + payload + checksum
    let mut dat = Vec::with_capacity(1 + 4 + size + 4);
    dat.push(DATA);
    dat.extend((size as u32).to_be_bytes());
    dat.extend(payload);
    dat.extend(checksum(payload).to_be_bytes());
    Ok(dat)
}

impl ConnectionError {
    fn error_code(&self) -> u8 {
        match self {
            // UnknownError won't get sent
            ConnectionError::UnknownError => 100,
            ConnectionError::MaxDataLengthExceeded => 200,
            ConnectionError::UnknownMessageType => 201,
            ConnectionError::DecodeError => 202,
            ConnectionError::DataCorrupted => 203,
        }
    }

    fn from_error_code(code: u8) -> Self {
        match code {
            200 => ConnectionError::MaxDataLengthExceeded,
            201 => ConnectionError::UnknownMessageType,
            202 => ConnectionError::DecodeError,
            203 => ConnectionError::DataCorrupted,
            _ => ConnectionError::UnknownError,
        }
    }
}

impl Display for ConnectionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionError::MaxDataLengthExceeded => f.write_str("max data length exceeded"),
            ConnectionError::UnknownMessageType => f.write_str("unknown message type"),
            ConnectionError::DataCorrupted => f.write_str("data corrupted"),
            ConnectionError::DecodeError => f.write_str("decode error"),
            ConnectionError::UnknownError => f.write_str("unknown error"),
        }
    }
}

impl<T> Debug for Received<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Received::Response(_) => f.write_str("Received::Response"),
            Received::Ping => f.write_str("Received::Ping"),
            Received::Error(e) => write!(f, "Received::Error({})", e),
            Received::RemoteError(e) => write!(f, "Received::RemoteError({})", e),
        }
    }
}

#[cfg(test)]
mod test_network_module {
    use super::*;
    use async_std::net::TcpListener;
    use futures::executor::block_on;
    use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

    /// accept one connection on an OS-assigned loopback port
    fn listen_once() -> (SocketAddr, task::JoinHandle<TcpStream>) {
        let listener = block_on(TcpListener::bind(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0)))
            .unwrap();
        let address = listener.local_addr().unwrap();
        let accepted = task::spawn(async move { listener.accept().await.unwrap().0 });
        (address, accepted)
    }

    fn tokens() -> Vec<String> {
        (0..50).map(|i| format!("{}_{}", i / 19, i % 19)).collect()
    }

    #[test]
    fn send_strings_with_ping() {
        let (address, accepted) = listen_once();
        let sent = tokens();
        let expected = sent.clone();
        task::spawn(async move {
            let server: Conn<String, String> =
                Conn::init(accepted.await, Some(Duration::from_millis(5)), 128);
            for token in sent {
                task::sleep(Duration::from_millis(2)).await;
                server.sender().send(token).await.unwrap();
            }
        });
        let tcp = block_on(TcpStream::connect(address)).unwrap();
        let mut client: Conn<String, String> =
            Conn::init(tcp, Some(Duration::from_millis(5)), 128);
        let received = block_on(async move {
            let mut received = Vec::new();
            while let Some(r) = client.next().await {
                match r {
                    Received::Response(token) => received.push(token),
                    Received::Ping => {}
                    other => panic!("error receiving message: {:?}", other),
                }
            }
            received
        });
        assert_eq!(received, expected);
    }

    #[test]
    fn oversized_message_is_skipped() {
        let (address, accepted) = listen_once();
        let tcp = block_on(TcpStream::connect(address)).unwrap();
        let client: Conn<String, String> = Conn::init(tcp, None, 16);
        let received = block_on(async move {
            let mut server: Conn<String, String> = Conn::init(accepted.await, None, 16);
            client.sender().send("x".repeat(64)).await.unwrap();
            client.sender().send("PASS".to_string()).await.unwrap();
            drop(client);
            let mut received = Vec::new();
            while let Some(r) = server.next().await {
                if let Received::Response(token) = r {
                    received.push(token);
                }
            }
            received
        });
        assert_eq!(received, vec!["PASS".to_string()]);
    }

    #[test]
    fn corrupted_frame_is_reported() {
        let (address, accepted) = listen_once();
        let mut raw = block_on(TcpStream::connect(address)).unwrap();
        let mut frame = wrap_data_payload(&encode_to_vec("3_3", BIN_CONFIG).unwrap(), 64).unwrap();
        let last = frame.len() - 1;
        frame[last] ^= 0xff;
        let (local, remote) = block_on(async move {
            let mut server: Conn<String, String> = Conn::init(accepted.await, None, 64);
            raw.write_all(&frame).await.unwrap();
            let local = server.next().await;
            let mut remote = BufReader::new(raw);
            let error_frame = (
                utility::read_one_byte(&mut remote).await,
                utility::read_one_byte(&mut remote).await,
            );
            (local, error_frame)
        });
        assert!(matches!(
            local,
            Some(Received::Error(ConnectionError::DataCorrupted))
        ));
        assert_eq!(
            remote,
            (Some(ERROR), Some(ConnectionError::DataCorrupted.error_code()))
        );
    }

    #[test]
    fn decode_failure_reaches_both_sides() {
        let (address, accepted) = listen_once();
        let tcp = block_on(TcpStream::connect(address)).unwrap();
        // the server sends integers, the client expects booleans
        let mut client: Conn<(), bool> = Conn::init(tcp, None, 64);
        let server_side = task::spawn(async move {
            let mut server: Conn<u32, ()> = Conn::init(accepted.await, None, 64);
            server.sender().send(1).await.unwrap();
            server.sender().send(300).await.unwrap();
            let mut received = Vec::new();
            while let Some(r) = server.next().await {
                received.push(r);
            }
            received
        });
        let client_side = block_on(async move {
            let mut received = Vec::new();
            while let Some(r) = client.next().await {
                received.push(r);
            }
            received
        });
        let server_side = block_on(server_side);
        assert_eq!(client_side.len(), 2);
        assert!(matches!(client_side[0], Received::Response(true)));
        assert!(matches!(
            client_side[1],
            Received::Error(ConnectionError::DecodeError)
        ));
        assert_eq!(server_side.len(), 1);
        assert!(matches!(
            server_side[0],
            Received::RemoteError(ConnectionError::DecodeError)
        ));
    }
}
