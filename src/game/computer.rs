//! Automated participant.
//!
//! A `ComputerPlayer` keeps its own copy of the board, updated from the
//! confirmed turns it is told about, and asks a `MoveGenerator` for a move
//! whenever it is on turn.
use crate::game::board::{Board, Color, MoveChecker, Position};
use crate::game::session::{Commands, EndReport, Played, PlayerResponse};
use log::{debug, warn};
use rand::prelude::*;

/// chooses the next move of `color`, either a stone or a pass
pub trait MoveGenerator: Send {
    fn next_move(&mut self, board: &Board, previous: &Board, color: Color) -> Played;
}

/// Plays the first empty intersection, row by row, then passes.
pub struct FirstEmpty {
    moves_left: usize,
}

impl FirstEmpty {
    pub fn new(max_moves: usize) -> Self {
        FirstEmpty {
            moves_left: max_moves,
        }
    }
}

impl Default for FirstEmpty {
    fn default() -> Self {
        FirstEmpty::new(3)
    }
}

impl MoveGenerator for FirstEmpty {
    fn next_move(&mut self, board: &Board, _: &Board, _: Color) -> Played {
        if self.moves_left == 0 {
            return Played::Pass;
        }
        match board.intersections().find(|i| !i.is_occupied()) {
            Some(i) => {
                self.moves_left -= 1;
                Played::Stone(i.position())
            }
            None => Played::Pass,
        }
    }
}

/// Plays a random legal move for a bounded number of moves, then passes.
pub struct RandomLegal<R = StdRng> {
    rng: R,
    moves_left: usize,
    checker: MoveChecker,
}

impl RandomLegal<StdRng> {
    pub fn new(max_moves: usize) -> Self {
        RandomLegal::with_rng(StdRng::from_entropy(), max_moves)
    }
}

impl<R: Rng + Send> RandomLegal<R> {
    pub fn with_rng(rng: R, max_moves: usize) -> Self {
        RandomLegal {
            rng,
            moves_left: max_moves,
            checker: MoveChecker::new(),
        }
    }

    fn is_legal(&mut self, position: Position, board: &Board, previous: &Board, color: Color) -> bool {
        let mut scratch = board.clone();
        if !self
            .checker
            .check_move(position, color, board, previous, &mut scratch)
        {
            return false;
        }
        // the checker lets suicide through
        let mut next = board.clone();
        next.set_stone(position, color).is_ok()
    }
}

impl<R: Rng + Send> MoveGenerator for RandomLegal<R> {
    fn next_move(&mut self, board: &Board, previous: &Board, color: Color) -> Played {
        if self.moves_left == 0 {
            return Played::Pass;
        }
        let mut candidates: Vec<Position> = board
            .intersections()
            .filter(|i| !i.is_occupied())
            .map(|i| i.position())
            .collect();
        candidates.shuffle(&mut self.rng);
        for position in candidates {
            if self.is_legal(position, board, previous, color) {
                self.moves_left -= 1;
                return Played::Stone(position);
            }
        }
        Played::Pass
    }
}

/// The board as seen by one automated participant.
pub struct ComputerPlayer<G> {
    color: Color,
    board: Board,
    previous: Board,
    generator: G,
}

impl<G: MoveGenerator> ComputerPlayer<G> {
    pub fn new(color: Color, board_size: usize, generator: G) -> Self {
        let board = Board::new(board_size);
        ComputerPlayer {
            color,
            previous: board.clone(),
            board,
            generator,
        }
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// mirror a confirmed turn, returning the move to submit if it is our turn
    pub fn on_turn(&mut self, mover: Color, played: Played, next: Color) -> Option<Played> {
        match played {
            Played::First => {}
            Played::Pass => self.previous.clone_from(&self.board),
            Played::Stone(position) => {
                self.previous.clone_from(&self.board);
                if let Err(e) = self.board.set_stone(position, mover) {
                    warn!("confirmed move {} rejected by mirror board: {}", position, e);
                }
            }
        }
        if next == self.color {
            let choice = self
                .generator
                .next_move(&self.board, &self.previous, self.color);
            debug!("{} computer plays {}", self.color, choice);
            Some(choice)
        } else {
            None
        }
    }

    /// start over on an empty board
    pub fn reset(&mut self) {
        self.board.clear();
        self.previous.clear();
    }
}

/// Drive `commands` with `generator` until the match ends.
///
/// A refused move is answered with a pass.
pub async fn run_computer_player<G: MoveGenerator>(
    mut commands: Commands,
    generator: G,
) -> Option<EndReport> {
    let listener = commands.get_listener()?;
    let mut player = ComputerPlayer::new(commands.color(), commands.board_size(), generator);
    while let Ok(response) = listener.recv().await {
        match response {
            PlayerResponse::Turn(report) => {
                if let Some(choice) = player.on_turn(report.mover, report.played, report.next) {
                    commands.play(&choice.to_string()).await;
                }
            }
            PlayerResponse::InvalidMove(reason) => {
                warn!("{} computer move refused: {}", player.color(), reason);
                commands.pass().await;
            }
            PlayerResponse::GameEnded(report) => {
                player.reset();
                return Some(report);
            }
        }
    }
    None
}

#[cfg(test)]
mod test_computer {
    use super::*;
    use crate::game::board::Color::{Black, White};
    use crate::game::session::{new_session, EndCause, PlayerInfo, SessionConfig};
    use async_std::task;
    use futures::executor::block_on;

    fn p(x: usize, y: usize) -> Position {
        Position::new(x, y)
    }

    #[test]
    fn first_empty_then_pass() {
        let mut board = Board::new(5);
        let previous = board.clone();
        let mut generator = FirstEmpty::new(2);
        assert_eq!(
            generator.next_move(&board, &previous, Black),
            Played::Stone(p(0, 0))
        );
        board.set_stone(p(0, 0), Black).unwrap();
        assert_eq!(
            generator.next_move(&board, &previous, Black),
            Played::Stone(p(0, 1))
        );
        assert_eq!(generator.next_move(&board, &previous, Black), Played::Pass);
    }

    #[test]
    fn random_legal_avoids_suicide() {
        let mut board = Board::new(5);
        board.set_stone(p(0, 1), White).unwrap();
        board.set_stone(p(1, 0), White).unwrap();
        let previous = board.clone();
        for seed in 0..50 {
            let mut generator = RandomLegal::with_rng(StdRng::seed_from_u64(seed), 1);
            match generator.next_move(&board, &previous, Black) {
                Played::Stone(position) => {
                    assert_ne!(position, p(0, 0));
                    assert!(!board.is_occupied(position));
                }
                other => panic!("expected a stone, got {:?}", other),
            }
            assert_eq!(generator.next_move(&board, &previous, Black), Played::Pass);
        }
    }

    #[test]
    fn mirror_follows_turns() {
        let mut player = ComputerPlayer::new(White, 9, FirstEmpty::default());
        assert_eq!(player.on_turn(Black, Played::First, Black), None);
        let choice = player.on_turn(Black, Played::Stone(p(0, 0)), White);
        assert_eq!(choice, Some(Played::Stone(p(0, 1))));
        assert_eq!(player.board().color_at(p(0, 0)), Some(Black));
        player.reset();
        assert_eq!(player.board().stone_count(Black), 0);
    }

    #[test]
    fn computers_play_a_match() {
        let (black, white) = new_session(
            7,
            PlayerInfo::new(1, "first"),
            PlayerInfo::new(2, "second"),
            9,
            SessionConfig { play_timeout: 0 },
        );
        block_on(async {
            let white = task::spawn(run_computer_player(white, FirstEmpty::default()));
            let black = run_computer_player(black, FirstEmpty::default()).await;
            let white = white.await;
            for report in [black, white] {
                let report = report.unwrap();
                assert_eq!(report.cause, EndCause::Finished);
                // three stones each in the top row, no territory
                assert!(report.is_draw());
                assert_eq!((report.winner_score, report.loser_score), (3, 3));
            }
        })
    }

    #[test]
    fn random_computers_finish() {
        let (black, white) = new_session(
            8,
            PlayerInfo::new(1, "first"),
            PlayerInfo::new(2, "second"),
            5,
            SessionConfig::default(),
        );
        block_on(async {
            let white = task::spawn(run_computer_player(
                white,
                RandomLegal::with_rng(StdRng::seed_from_u64(2), 10),
            ));
            let black = run_computer_player(
                black,
                RandomLegal::with_rng(StdRng::seed_from_u64(1), 10),
            )
            .await;
            assert_eq!(black.unwrap().cause, EndCause::Finished);
            assert_eq!(white.await.unwrap().cause, EndCause::Finished);
        })
    }
}
