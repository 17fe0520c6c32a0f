use async_std::io::BufReader;
use async_std::net::TcpStream;
use bincode::config::{self, Configuration};
use futures::AsyncReadExt;

/// encoding of every payload on the wire
pub(crate) const BIN_CONFIG: Configuration = config::standard();

pub(crate) async fn read_n_bytes(reader: &mut BufReader<TcpStream>, n: u32) -> Option<Vec<u8>> {
    let mut payload = vec![0u8; n as usize];
    reader.read_exact(&mut payload).await.ok()?;
    Some(payload)
}

pub(crate) async fn read_be_u32(reader: &mut BufReader<TcpStream>) -> Option<u32> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes).await.ok()?;
    Some(u32::from_be_bytes(bytes))
}

pub(crate) async fn read_one_byte(reader: &mut BufReader<TcpStream>) -> Option<u8> {
    let mut byte = [0u8; 1];
    reader.read_exact(&mut byte).await.ok()?;
    Some(byte[0])
}
