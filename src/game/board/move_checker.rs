use crate::game::board::{Board, Color, MoveViolation, Position};

/// Validates a stone placement against range, occupancy and the Ko rule.
///
/// Suicide is not judged here, it is detected by `Board::set_stone`.
#[derive(Default, Debug)]
pub struct MoveChecker {
    violation: Option<MoveViolation>,
}

impl MoveChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a move, stopping at the first violation found.
    ///
    /// `next` is overwritten with `board` plus the candidate stone, and
    /// the move breaks Ko when that position equals `previous`.
    pub fn check_move(
        &mut self,
        position: Position,
        color: Color,
        board: &Board,
        previous: &Board,
        next: &mut Board,
    ) -> bool {
        self.violation = Self::find_violation(position, color, board, previous, next);
        self.violation.is_none()
    }

    fn find_violation(
        position: Position,
        color: Color,
        board: &Board,
        previous: &Board,
        next: &mut Board,
    ) -> Option<MoveViolation> {
        if !board.in_range(position) {
            return Some(MoveViolation::NotOnBoard);
        }
        if board.is_occupied(position) {
            return Some(MoveViolation::Occupied);
        }
        next.clone_from(board);
        match next.set_stone(position, color) {
            Ok(_) if next.same_position(previous) => Some(MoveViolation::Ko),
            // a suicide never recreates an earlier position
            _ => None,
        }
    }

    /// description of the last violation, empty if the last move was valid
    pub fn move_violations(&self) -> String {
        self.violation
            .map(|v| v.to_string())
            .unwrap_or_default()
    }

    pub fn violation(&self) -> Option<MoveViolation> {
        self.violation
    }
}
