//! Wire messages between a client and the server.
//!
//! - disconnection without a clear exit signal is considered a disconnection.
//! - a connection must start with `Messages::Name`.
use crate::game::{Color, EndCause, EndReport, Played, PlayerResponse};
use crate::lobby::client_connection::ConnectionInitError;
use bincode::{Decode, Encode};

#[derive(Clone, PartialEq, Debug, Encode, Decode)]
pub enum Messages {
    /// register a player name, case-insensitively unique
    Name(String),
    /// Ask to be paired with the next requester.
    ///
    /// The color and board size of the first requester are used,
    /// `None` means black. A non-numeric board size means 19.
    RequestGame {
        color: Option<Color>,
        board_size: String,
    },
    /// move token `x_y` or `PASS`
    Move(String),
    /// leave the current match or stop waiting, back to the lobby
    Quit,
    /// leave the server, closing the connection
    /// exiting without sending `Exit` is considered `Disconnected`
    Exit,
}

#[derive(Clone, PartialEq, Debug, Encode, Decode)]
pub enum Responses {
    /// response to `Name`
    NameAccepted(String),
    /// the connection is closed after this
    ConnectionInitFailure(ConnectionInitError),
    /// response to `RequestGame` when nobody else is waiting
    WaitingForOpponent,
    /// both players receive this when paired
    GameStarted {
        color: Color,
        board_size: usize,
        opponent: String,
    },
    /// a move was confirmed, `played` is `FIRST` at the start
    Turn {
        mover: Color,
        played: Played,
        next: Color,
    },
    /// the submitted move was refused with a short reason tag
    InvalidMove(String),
    /// final result, `draw` tells whether winner and loser are tied
    GameEnded {
        cause: EndCause,
        winner: String,
        winner_score: usize,
        loser: String,
        loser_score: usize,
        draw: bool,
    },
    /// message not expected in the current state
    Error(String),
}

impl From<PlayerResponse> for Responses {
    fn from(rsp: PlayerResponse) -> Self {
        match rsp {
            PlayerResponse::Turn(t) => Responses::Turn {
                mover: t.mover,
                played: t.played,
                next: t.next,
            },
            PlayerResponse::InvalidMove(reason) => Responses::InvalidMove(reason.tag().to_string()),
            PlayerResponse::GameEnded(end) => Responses::from(end),
        }
    }
}

impl From<EndReport> for Responses {
    fn from(end: EndReport) -> Self {
        Responses::GameEnded {
            cause: end.cause,
            draw: end.is_draw(),
            winner: end.winner_name,
            winner_score: end.winner_score,
            loser: end.loser_name,
            loser_score: end.loser_score,
        }
    }
}
