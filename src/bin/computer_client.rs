use anyhow::{Error, Result};
use async_std::net::TcpStream;
use futures::executor::block_on;
use futures::StreamExt;
use log::{error, info, warn, LevelFilter};
use std::env;
use std::net::SocketAddrV4;
use std::str::FromStr;
use std::time::Duration;
use weiqi::{
    Color, ComputerPlayer, Conn, FirstEmpty, Messages, Received, Responses, PASS,
};

const PING_INTERVAL: Option<Duration> = Some(Duration::from_secs(5));
const MAX_DATA_SIZE: u32 = 1024 * 64;

fn main() {
    env_logger::builder().filter_level(LevelFilter::Info).init();
    if let Err(e) = block_on(run_client()) {
        error!("client stopped on error {}", e);
    }
}

async fn run_client() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 || args.len() > 5 {
        return Err(Error::msg(
            "usage: ./computer_client {ipv4 address} {name} [BLACK|WHITE] [board size], example: ./computer_client 127.0.0.1:8080 hal WHITE 9",
        ));
    }
    let address = SocketAddrV4::from_str(&args[1])?;
    let color = match args.get(3).map(|c| c.to_uppercase()) {
        None => None,
        Some(c) if c == "BLACK" => Some(Color::Black),
        Some(c) if c == "WHITE" => Some(Color::White),
        Some(c) => return Err(Error::msg(format!("unknown color {}", c))),
    };
    let board_size = args.get(4).cloned().unwrap_or_default();

    let mut conn: Conn<Messages, Responses> =
        Conn::init(TcpStream::connect(address).await?, PING_INTERVAL, MAX_DATA_SIZE);
    let sender = conn.sender().clone();
    sender.send(Messages::Name(args[2].clone())).await?;
    sender
        .send(Messages::RequestGame { color, board_size })
        .await?;

    let mut player: Option<ComputerPlayer<FirstEmpty>> = None;
    while let Some(rsp) = conn.next().await {
        let rsp = match rsp {
            Received::Response(rsp) => rsp,
            Received::Ping => continue,
            Received::Error(e) => return Err(Error::msg(format!("connection error: {}", e))),
            Received::RemoteError(e) => {
                return Err(Error::msg(format!("server side connection error: {}", e)))
            }
        };
        match rsp {
            Responses::NameAccepted(name) => info!("registered as {}", name),
            Responses::ConnectionInitFailure(e) => {
                return Err(Error::msg(format!("connection refused: {}", e)))
            }
            Responses::WaitingForOpponent => info!("waiting for an opponent"),
            Responses::GameStarted {
                color,
                board_size,
                opponent,
            } => {
                info!("playing {} on {}x{} against {}", color, board_size, board_size, opponent);
                player = Some(ComputerPlayer::new(color, board_size, FirstEmpty::default()));
            }
            Responses::Turn {
                mover,
                played,
                next,
            } => {
                info!("{} played {}, {} to move", mover, played, next);
                let choice = player
                    .as_mut()
                    .and_then(|p| p.on_turn(mover, played, next));
                if let Some(choice) = choice {
                    sender.send(Messages::Move(choice.to_string())).await?;
                }
            }
            Responses::InvalidMove(reason) => {
                warn!("move refused: {}", reason);
                sender.send(Messages::Move(PASS.to_string())).await?;
            }
            Responses::GameEnded {
                cause,
                winner,
                winner_score,
                loser,
                loser_score,
                draw,
            } => {
                if draw {
                    info!("{}: draw {} to {}", cause, winner_score, loser_score);
                } else {
                    info!(
                        "{}: {} wins {} to {} against {}",
                        cause, winner, winner_score, loser_score, loser
                    );
                }
                sender.send(Messages::Exit).await?;
                break;
            }
            Responses::Error(e) => warn!("server error: {}", e),
        }
    }
    info!("connection closed");
    Ok(())
}
