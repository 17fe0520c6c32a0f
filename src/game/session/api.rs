use crate::game::board::{Color, MoveViolation, Position};
use crate::game::session::messages::PlayerAction::{self, Play, Quit};
use async_std::channel::{Receiver, Sender};
use bincode::{Decode, Encode};
use std::time::Duration;

/// Public API used for interacting with a match
pub struct Commands {
    color: Color,
    board_size: usize,
    name: String,
    opponent_name: String,
    listener: Option<Receiver<PlayerResponse>>,
    action_sender: Sender<PlayerAction>,
}

/// all player actions are here
impl Commands {
    /// submit a move token, either `x_y` or `PASS`
    pub async fn play(&self, token: &str) {
        let _ = self.action_sender.send(Play(token.to_string())).await;
    }

    pub async fn pass(&self) {
        self.play(PASS).await
    }

    /// `quit()` should be called before ending the game so that the
    /// opponent is told why the match ended.
    ///
    /// Dropping `Commands` without quitting is treated as a disconnect.
    pub async fn quit(&self, reason: PlayerQuitReason) {
        let _ = self.action_sender.send(Quit(reason)).await;
    }

    pub fn get_listener(&mut self) -> Option<Receiver<PlayerResponse>> {
        self.listener.take()
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn board_size(&self) -> usize {
        self.board_size
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn opponent_name(&self) -> &str {
        &self.opponent_name
    }

    pub(crate) fn new(
        color: Color,
        board_size: usize,
        players: (&PlayerInfo, &PlayerInfo),
        action_sender: Sender<PlayerAction>,
        listener: Receiver<PlayerResponse>,
    ) -> Commands {
        let (me, opponent) = players;
        Commands {
            color,
            board_size,
            name: me.name.clone(),
            opponent_name: opponent.name.clone(),
            listener: Some(listener),
            action_sender,
        }
    }
}

/// the pass token, matched case-insensitively
pub const PASS: &str = "PASS";

/// identity of a participant
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerInfo {
    pub id: u64,
    pub name: String,
}

impl PlayerInfo {
    pub fn new(id: u64, name: &str) -> Self {
        PlayerInfo {
            id,
            name: name.to_string(),
        }
    }
}

/// the reason of player quit
#[derive(Debug)]
pub enum PlayerQuitReason {
    /// gives up the match, back to lobby
    QuitSession,
    /// leaves the server
    ExitGame,
    Disconnected,
    Error(String),
}

/// response to players
#[derive(Clone, Debug, PartialEq)]
pub enum PlayerResponse {
    /// broadcast to both players after every confirmed move
    Turn(TurnReport),
    /// sent only to the submitter, the turn does not change
    InvalidMove(InvalidMove),
    /// broadcast to both players, the session ends after this
    GameEnded(EndReport),
}

/// what a confirmed turn consisted of
#[derive(Clone, Copy, Debug, PartialEq, Eq, Encode, Decode)]
pub enum Played {
    /// announcement that the match started, nothing was played
    First,
    Pass,
    Stone(Position),
}

#[derive(Clone, Debug, PartialEq)]
pub struct TurnReport {
    pub mover: Color,
    pub mover_name: String,
    pub played: Played,
    pub next: Color,
    pub next_name: String,
}

/// why a submitted move was refused
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub enum InvalidMove {
    Malformed(String),
    NotYourTurn,
    Violation(MoveViolation),
}

impl InvalidMove {
    /// short tag reported to the player
    pub fn tag(&self) -> &'static str {
        match self {
            InvalidMove::Malformed(_) => "malformed move",
            InvalidMove::NotYourTurn => "not your turn",
            InvalidMove::Violation(v) => v.tag(),
        }
    }
}

/// how a match ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Encode, Decode)]
pub enum EndCause {
    /// two passes in a row or the stone ceiling
    Finished,
    /// a player quit, exited or disconnected
    Aborted,
    Timeout,
}

/// final result of a match.
///
/// On a draw `winner` is `None` and the winner fields hold black.
#[derive(Clone, Debug, PartialEq)]
pub struct EndReport {
    pub cause: EndCause,
    pub winner: Option<Color>,
    pub winner_name: String,
    pub winner_score: usize,
    pub loser_name: String,
    pub loser_score: usize,
}

impl EndReport {
    pub fn is_draw(&self) -> bool {
        self.winner.is_none()
    }
}

/// client time should be shorter
///
/// `play_timeout` is in seconds, 0 means no timeout
#[derive(Clone, PartialEq, Debug, Encode, Decode)]
pub struct SessionConfig {
    pub play_timeout: u64,
}

impl SessionConfig {
    pub fn play_timeout(&self) -> Option<Duration> {
        match self.play_timeout {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig { play_timeout: 90 }
    }
}
