pub mod board;
mod computer;
mod session;

pub use board::{parse_board_size, Board, Color, MoveChecker, MoveViolation, Position};
pub use computer::{run_computer_player, ComputerPlayer, FirstEmpty, MoveGenerator, RandomLegal};
pub use session::*;
