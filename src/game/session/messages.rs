use crate::game::board::Color::{self, Black, White};
use crate::game::session::api::{
    EndCause, EndReport, InvalidMove, Played, PlayerQuitReason, PlayerResponse, TurnReport,
};
use crate::CHANNEL_SIZE;
use anyhow::Result;
use async_std::channel::{bounded, Receiver, Sender};
use async_std::task;
use futures::{future, stream, stream_select, StreamExt};
use log::trace;
use std::fmt::{Display, Formatter};

/// actions received from players
#[derive(Debug)]
pub(crate) enum PlayerAction {
    /// move token, `x_y` or `PASS`
    Play(String),
    /// player sends this if it needs to quit
    Quit(PlayerQuitReason),
}

/// messages sent to the session from players or the turn timer
#[derive(Debug)]
pub(crate) enum SessionMessage {
    Player(Color, PlayerAction),
    /// the player to move at the given ply ran out of time
    Timeout(Color, usize),
}

/// response sent from the session to players
#[derive(Debug)]
pub(crate) enum SessionResponse {
    Player(Color, PlayerResponse),
}

/// This is a router that distributes responses to black and white players.
///
/// A player that stopped listening does not stop delivery to the other one.
/// The router stops when the session drops its sender.
pub(crate) fn message_sender(
    black: Sender<PlayerResponse>,
    white: Sender<PlayerResponse>,
) -> Sender<SessionResponse> {
    let (sender, mut receiver) = bounded(CHANNEL_SIZE);
    task::spawn(async move {
        while let Some(session_response) = receiver.next().await {
            let SessionResponse::Player(color, response) = session_response;
            let delivered = match color {
                Black => black.send(response).await.is_ok(),
                White => white.send(response).await.is_ok(),
            };
            if !delivered {
                trace!("{} player no longer listening", color);
            }
        }
    });
    sender
}

/// This is a router that collects all messages from black, white and the timer.
///
/// A player action stream that ends is reported once as a disconnect.
pub(crate) fn message_receiver(
    black: Receiver<PlayerAction>,
    white: Receiver<PlayerAction>,
    timer: Receiver<SessionMessage>,
) -> Receiver<SessionMessage> {
    let (message_sender, messages) = bounded(CHANNEL_SIZE);
    task::spawn(async move {
        let black = with_disconnect(black)
            .map(|act| SessionMessage::Player(Black, act))
            .fuse();
        let white = with_disconnect(white)
            .map(|act| SessionMessage::Player(White, act))
            .fuse();
        let timer = timer.fuse();
        let mut fused = stream_select!(black, white, timer);
        while let Some(message) = fused.next().await {
            if message_sender.send(message).await.is_err() {
                break;
            }
        }
    });
    messages
}

fn with_disconnect(actions: Receiver<PlayerAction>) -> impl stream::Stream<Item = PlayerAction> {
    actions.chain(stream::once(future::ready(PlayerAction::Quit(
        PlayerQuitReason::Disconnected,
    ))))
}

pub(crate) async fn broadcast_to_players(
    player_response: PlayerResponse,
    responses: &Sender<SessionResponse>,
) -> Result<()> {
    responses
        .send(SessionResponse::Player(Black, player_response.clone()))
        .await?;
    responses
        .send(SessionResponse::Player(White, player_response))
        .await?;
    Ok(())
}

impl Display for EndCause {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            EndCause::Finished => f.write_str("FINISHED"),
            EndCause::Aborted => f.write_str("ABORTED"),
            EndCause::Timeout => f.write_str("TIMEOUT"),
        }
    }
}

impl Display for Played {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Played::First => f.write_str("FIRST"),
            Played::Pass => f.write_str("PASS"),
            Played::Stone(p) => write!(f, "{}", p),
        }
    }
}

impl Display for InvalidMove {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidMove::Malformed(token) => write!(f, "malformed move '{}'", token),
            InvalidMove::NotYourTurn => f.write_str("not your turn"),
            InvalidMove::Violation(v) => write!(f, "{}", v),
        }
    }
}

impl Display for TurnReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}) played {}, {} ({}) to move",
            self.mover_name, self.mover, self.played, self.next_name, self.next
        )
    }
}

impl Display for EndReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_draw() {
            write!(
                f,
                "{}: draw between {} and {} at {}",
                self.cause, self.winner_name, self.loser_name, self.winner_score
            )
        } else {
            write!(
                f,
                "{}: {} wins {} to {} against {}",
                self.cause, self.winner_name, self.winner_score, self.loser_score, self.loser_name
            )
        }
    }
}
