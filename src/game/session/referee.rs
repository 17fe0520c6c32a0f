use crate::game::board::{Board, Color, MoveChecker, MoveViolation, Position};
use crate::game::session::api::{EndCause, InvalidMove, Played, PASS};
use std::cmp::Ordering;

/// lifecycle of a match
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchState {
    AwaitingFirstMove,
    InProgress,
    Finished,
    Aborted,
    TimedOut,
}

impl MatchState {
    pub fn is_over(&self) -> bool {
        !matches!(self, MatchState::AwaitingFirstMove | MatchState::InProgress)
    }
}

/// outcome of one referee operation
#[derive(Clone, Debug, PartialEq)]
pub enum MatchEvent {
    TurnConfirmed {
        mover: Color,
        played: Played,
        next: Color,
    },
    InvalidMove {
        submitter: Color,
        reason: InvalidMove,
    },
    GameEnded(GameEnd),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GameEnd {
    pub cause: EndCause,
    pub black_score: usize,
    pub white_score: usize,
    /// `None` on a draw
    pub winner: Option<Color>,
}

/// The turn state machine of one match.
///
/// Every operation returns the events it produced, in order.
/// Once the match is over every operation is a no-op.
pub struct Referee {
    board: Board,
    previous_board: Board,
    next_board: Board,
    checker: MoveChecker,
    move_number: usize,
    last_move: Option<Played>,
    previous_move: Option<Played>,
    state: MatchState,
}

impl Referee {
    pub fn new(board_size: usize) -> Self {
        let board = Board::new(board_size);
        Referee {
            previous_board: board.clone(),
            next_board: board.clone(),
            board,
            checker: MoveChecker::new(),
            move_number: 0,
            last_move: None,
            previous_move: None,
            state: MatchState::AwaitingFirstMove,
        }
    }

    /// announce the match, black to play
    pub fn start(&self) -> Vec<MatchEvent> {
        if self.state != MatchState::AwaitingFirstMove || self.move_number != 0 {
            return Vec::new();
        }
        vec![MatchEvent::TurnConfirmed {
            mover: Color::Black,
            played: Played::First,
            next: Color::Black,
        }]
    }

    /// handle a move token `x_y` or `PASS` submitted by `color`
    pub fn confirm_move(&mut self, color: Color, token: &str) -> Vec<MatchEvent> {
        if self.state.is_over() {
            return Vec::new();
        }
        if color != self.to_move() {
            return vec![MatchEvent::InvalidMove {
                submitter: color,
                reason: InvalidMove::NotYourTurn,
            }];
        }
        let token = token.trim();
        if token.eq_ignore_ascii_case(PASS) {
            return self.confirm_pass(color);
        }
        match parse_move(token) {
            Some(position) => self.confirm_stone(color, position),
            None => vec![MatchEvent::InvalidMove {
                submitter: color,
                reason: InvalidMove::Malformed(token.to_string()),
            }],
        }
    }

    /// `color` quit the match
    pub fn end_aborted_game(&mut self, color: Color) -> Vec<MatchEvent> {
        self.forfeit(color, MatchState::Aborted, EndCause::Aborted)
    }

    /// `color` left the server or lost its connection
    pub fn end_game_exit(&mut self, color: Color) -> Vec<MatchEvent> {
        self.forfeit(color, MatchState::Aborted, EndCause::Aborted)
    }

    /// `color` did not move in time
    pub fn end_timeout(&mut self, color: Color) -> Vec<MatchEvent> {
        self.forfeit(color, MatchState::TimedOut, EndCause::Timeout)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn previous_board(&self) -> &Board {
        &self.previous_board
    }

    pub fn state(&self) -> MatchState {
        self.state
    }

    pub fn move_number(&self) -> usize {
        self.move_number
    }

    pub fn last_move(&self) -> Option<Played> {
        self.last_move
    }

    pub fn previous_move(&self) -> Option<Played> {
        self.previous_move
    }

    /// black moves on even plies
    pub fn to_move(&self) -> Color {
        if self.move_number % 2 == 0 {
            Color::Black
        } else {
            Color::White
        }
    }

    /// player to move and current ply, `None` once the match is over
    pub fn turn(&self) -> Option<(Color, usize)> {
        if self.state.is_over() {
            None
        } else {
            Some((self.to_move(), self.move_number))
        }
    }

    fn confirm_pass(&mut self, color: Color) -> Vec<MatchEvent> {
        if self.last_move == Some(Played::Pass) {
            return vec![self.finish()];
        }
        self.previous_board.clone_from(&self.board);
        self.advance(Played::Pass);
        vec![MatchEvent::TurnConfirmed {
            mover: color,
            played: Played::Pass,
            next: self.to_move(),
        }]
    }

    fn confirm_stone(&mut self, color: Color, position: Position) -> Vec<MatchEvent> {
        let valid = self.checker.check_move(
            position,
            color,
            &self.board,
            &self.previous_board,
            &mut self.next_board,
        );
        if !valid {
            let violation = self.checker.violation().unwrap_or(MoveViolation::NotOnBoard);
            return vec![MatchEvent::InvalidMove {
                submitter: color,
                reason: InvalidMove::Violation(violation),
            }];
        }
        let before = self.board.clone();
        if let Err(violation) = self.board.set_stone(position, color) {
            return vec![MatchEvent::InvalidMove {
                submitter: color,
                reason: InvalidMove::Violation(violation),
            }];
        }
        self.previous_board = before;
        self.advance(Played::Stone(position));
        let mut events = vec![MatchEvent::TurnConfirmed {
            mover: color,
            played: Played::Stone(position),
            next: self.to_move(),
        }];
        if self.board.stone_count(color) >= self.stone_ceiling() {
            events.push(self.finish());
        }
        events
    }

    fn advance(&mut self, played: Played) {
        self.previous_move = self.last_move.replace(played);
        self.move_number += 1;
        self.state = MatchState::InProgress;
    }

    /// a single color covering half of the board ends the match
    fn stone_ceiling(&self) -> usize {
        self.board.size() * self.board.size() / 2
    }

    fn finish(&mut self) -> MatchEvent {
        let (black_score, white_score) = self.board.calculate_winner();
        self.state = MatchState::Finished;
        let winner = match black_score.cmp(&white_score) {
            Ordering::Greater => Some(Color::Black),
            Ordering::Less => Some(Color::White),
            Ordering::Equal => None,
        };
        MatchEvent::GameEnded(GameEnd {
            cause: EndCause::Finished,
            black_score,
            white_score,
            winner,
        })
    }

    fn forfeit(&mut self, color: Color, state: MatchState, cause: EndCause) -> Vec<MatchEvent> {
        if self.state.is_over() {
            return Vec::new();
        }
        let (black, white) = self.board.calculate_winner();
        let (black_score, white_score) = match color {
            Color::Black => (0, white),
            Color::White => (black, 0),
        };
        self.state = state;
        vec![MatchEvent::GameEnded(GameEnd {
            cause,
            black_score,
            white_score,
            winner: Some(color.other()),
        })]
    }
}

/// parse `x_y`, both non-negative integers
fn parse_move(token: &str) -> Option<Position> {
    let (x, y) = token.split_once('_')?;
    Some(Position::new(x.trim().parse().ok()?, y.trim().parse().ok()?))
}
