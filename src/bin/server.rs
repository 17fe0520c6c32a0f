use anyhow::{Error, Result};
use futures::executor::block_on;
use log::{error, info, LevelFilter};
use std::env;
use std::net::SocketAddrV4;
use std::str::FromStr;
use weiqi::{start_server, SessionConfig};

fn main() {
    env_logger::builder()
        .filter_module("weiqi", LevelFilter::Trace)
        .init();
    if let Err(e) = run_server() {
        error!("server ended in error: {e}");
    }
}

fn run_server() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        return Err(Error::msg(
            "usage: ./server {ipv4 address} [play timeout seconds], example: ./server 127.0.0.1:8080 90",
        ));
    }
    let ipv4 = SocketAddrV4::from_str(&args[1])?;
    let session_config = match args.get(2) {
        Some(timeout) => SessionConfig {
            play_timeout: u64::from_str(timeout)?,
        },
        None => SessionConfig::default(),
    };
    info!(
        "server started, play timeout {} seconds",
        session_config.play_timeout
    );
    block_on(start_server(ipv4, session_config))
}
