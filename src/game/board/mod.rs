mod board;
mod groups;
mod move_checker;
mod scoring;

use bincode::{Decode, Encode};
use std::fmt::{Display, Formatter};

pub use board::{parse_board_size, Board, DEFAULT_BOARD_SIZE, MAX_BOARD_SIZE, MIN_BOARD_SIZE};
pub use groups::IntersectionGroup;
pub use move_checker::MoveChecker;

/// Stone color of a player, black moves first
#[derive(Clone, PartialEq, Eq, Hash, Copy, Debug, Encode, Decode)]
#[repr(u8)]
pub enum Color {
    Black = 1,
    White = 2,
}

impl Color {
    pub fn other(&self) -> Self {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }
}

/// A board coordinate, 0-indexed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Encode, Decode)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub fn new(x: usize, y: usize) -> Self {
        Position { x, y }
    }
}

/// A stone on the board.
///
/// `initial_liberties` only depends on where the stone sits:
/// 2 in a corner, 3 on an edge, 4 elsewhere.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Stone {
    color: Color,
    liberties: u8,
    initial_liberties: u8,
}

impl Stone {
    pub(crate) fn new(color: Color, initial_liberties: u8) -> Self {
        Stone {
            color,
            liberties: initial_liberties,
            initial_liberties,
        }
    }

    pub fn color(&self) -> Color {
        self.color
    }

    /// open adjacent intersections of this single stone
    pub fn liberties(&self) -> u8 {
        self.liberties
    }

    pub fn initial_liberties(&self) -> u8 {
        self.initial_liberties
    }

    pub(crate) fn set_liberties(&mut self, liberties: u8) {
        self.liberties = liberties;
    }
}

/// One cell of the board grid, holding at most one stone.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Intersection {
    position: Position,
    stone: Option<Stone>,
}

impl Intersection {
    pub(crate) fn new(position: Position) -> Self {
        Intersection {
            position,
            stone: None,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn stone(&self) -> Option<&Stone> {
        self.stone.as_ref()
    }

    pub fn is_occupied(&self) -> bool {
        self.stone.is_some()
    }

    pub fn color(&self) -> Option<Color> {
        self.stone.map(|s| s.color())
    }

    pub(crate) fn stone_mut(&mut self) -> Option<&mut Stone> {
        self.stone.as_mut()
    }

    pub(crate) fn set_stone(&mut self, stone: Stone) {
        self.stone = Some(stone);
    }

    pub(crate) fn remove_stone(&mut self) -> Option<Stone> {
        self.stone.take()
    }
}

/// Why a stone cannot be played at some intersection.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Encode, Decode)]
pub enum MoveViolation {
    NotOnBoard,
    Occupied,
    Ko,
    Suicide,
}

impl MoveViolation {
    /// short tag reported to the player
    pub fn tag(&self) -> &'static str {
        match self {
            MoveViolation::NotOnBoard => "not on board",
            MoveViolation::Occupied => "occupied",
            MoveViolation::Ko => "ko rule",
            MoveViolation::Suicide => "suicide",
        }
    }
}

impl Display for MoveViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MoveViolation::NotOnBoard => f.write_str("Move not on board"),
            MoveViolation::Occupied => f.write_str("Occupied intersection"),
            MoveViolation::Ko => f.write_str("Ko rule"),
            MoveViolation::Suicide => f.write_str("Suicide"),
        }
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Color::Black => f.write_str("BLACK"),
            Color::White => f.write_str("WHITE"),
        }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.x, self.y)
    }
}
