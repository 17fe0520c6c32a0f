use crate::game::board::groups::{GroupTracker, IntersectionGroup};
use crate::game::board::{Color, Intersection, MoveViolation, Position, Stone};
use log::warn;
use std::collections::HashSet;
use std::fmt::{Display, Formatter, Write};

pub const MIN_BOARD_SIZE: usize = 5;
pub const MAX_BOARD_SIZE: usize = 19;
pub const DEFAULT_BOARD_SIZE: usize = 19;

/// The Go board.
///
/// Intersections are stored row by row, `x` being the row and `y` the column.
/// Cloning a board yields an independent snapshot sharing no mutable state.
#[derive(Clone, Debug)]
pub struct Board {
    pub(super) size: usize,
    pub(super) intersections: Vec<Intersection>,
    pub(super) groups: GroupTracker,
    /// contiguous empty regions found by the latest `calculate_winner`
    pub(super) empty_groups: Vec<Vec<Position>>,
    pub(super) black_score: usize,
    pub(super) white_score: usize,
}

/// parse the board size sent by a player, clamped to `[5, 19]`
pub fn parse_board_size(size: &str) -> usize {
    match size.trim().parse::<i64>() {
        Ok(n) => n.clamp(MIN_BOARD_SIZE as i64, MAX_BOARD_SIZE as i64) as usize,
        Err(_) => {
            warn!(
                "invalid board size '{}', falling back to {}",
                size, DEFAULT_BOARD_SIZE
            );
            DEFAULT_BOARD_SIZE
        }
    }
}

impl Board {
    /// create an empty board, `size` is clamped to `[5, 19]`
    pub fn new(size: usize) -> Self {
        let size = size.clamp(MIN_BOARD_SIZE, MAX_BOARD_SIZE);
        let intersections = (0..size * size)
            .map(|i| Intersection::new(Position::new(i / size, i % size)))
            .collect();
        Board {
            size,
            intersections,
            groups: GroupTracker::new(size * size),
            empty_groups: Vec::new(),
            black_score: 0,
            white_score: 0,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn in_range(&self, position: Position) -> bool {
        position.x < self.size && position.y < self.size
    }

    pub fn intersection(&self, position: Position) -> Option<&Intersection> {
        if self.in_range(position) {
            Some(&self.intersections[self.index(position)])
        } else {
            None
        }
    }

    pub fn intersections(&self) -> impl Iterator<Item = &Intersection> {
        self.intersections.iter()
    }

    pub fn stone(&self, position: Position) -> Option<&Stone> {
        self.intersection(position).and_then(|i| i.stone())
    }

    pub fn color_at(&self, position: Position) -> Option<Color> {
        self.intersection(position).and_then(|i| i.color())
    }

    pub fn is_occupied(&self, position: Position) -> bool {
        self.color_at(position).is_some()
    }

    /// in-range orthogonal neighbours of `position`
    pub fn neighbours(&self, position: Position) -> Vec<Position> {
        if !self.in_range(position) {
            return Vec::new();
        }
        neighbour_cells(self.size, self.index(position))
            .into_iter()
            .map(|c| self.position(c))
            .collect()
    }

    pub fn stone_count(&self, color: Color) -> usize {
        self.intersections
            .iter()
            .filter(|i| i.color() == Some(color))
            .count()
    }

    /// the chain containing the stone at `position`
    pub fn group_at(&self, position: Position) -> Option<IntersectionGroup> {
        let color = self.color_at(position)?;
        let cell = self.index(position);
        Some(IntersectionGroup {
            color,
            stones: self
                .groups
                .members(cell)
                .iter()
                .map(|&c| self.position(c))
                .collect(),
            liberties: self.group_liberties(cell),
        })
    }

    /// all chains currently on the board
    pub fn groups(&self) -> Vec<IntersectionGroup> {
        self.groups
            .roots()
            .filter_map(|root| self.group_at(self.position(root)))
            .collect()
    }

    /// true if both boards have the same stones at the same intersections
    pub fn same_position(&self, other: &Board) -> bool {
        self.size == other.size
            && self
                .intersections
                .iter()
                .zip(other.intersections.iter())
                .all(|(a, b)| a.color() == b.color())
    }

    /// Place a stone and resolve its consequences.
    ///
    /// Opponent chains left without liberties are captured before the
    /// new stone's own chain is examined. If the new chain still has no
    /// liberty the placement is undone and `Suicide` is returned,
    /// leaving the board as it was.
    ///
    /// Returns the positions of captured stones.
    pub fn set_stone(
        &mut self,
        position: Position,
        color: Color,
    ) -> Result<Vec<Position>, MoveViolation> {
        if !self.in_range(position) {
            return Err(MoveViolation::NotOnBoard);
        }
        let cell = self.index(position);
        if self.intersections[cell].is_occupied() {
            return Err(MoveViolation::Occupied);
        }
        let stone = Stone::new(color, self.initial_liberties(position));
        self.intersections[cell].set_stone(stone);
        self.refresh_around(cell);

        self.groups.add_stone(cell);
        let neighbours = neighbour_cells(self.size, cell);
        for &n in &neighbours {
            if self.cell_color(n) == Some(color) {
                self.groups.union(cell, n);
            }
        }

        let mut captured = Vec::new();
        for &n in &neighbours {
            if self.cell_color(n) == Some(color.other()) && self.group_liberties(n) == 0 {
                for member in self.groups.remove_group(n) {
                    self.intersections[member].remove_stone();
                    captured.push(member);
                }
            }
        }
        for &c in &captured {
            self.refresh_around(c);
        }

        if self.group_liberties(cell) == 0 {
            // nothing was captured, otherwise the stone would have a liberty
            debug_assert!(captured.is_empty());
            self.intersections[cell].remove_stone();
            self.refresh_around(cell);
            self.rebuild_groups();
            return Err(MoveViolation::Suicide);
        }

        Ok(captured.into_iter().map(|c| self.position(c)).collect())
    }

    /// Remove the stone at `position`, returning it.
    ///
    /// Neighbours regain their liberties and chains split by the removal
    /// are recomputed.
    pub fn remove_stone(&mut self, position: Position) -> Option<Stone> {
        if !self.in_range(position) {
            return None;
        }
        let cell = self.index(position);
        let stone = self.intersections[cell].remove_stone()?;
        self.refresh_around(cell);
        self.rebuild_groups();
        Some(stone)
    }

    /// remove all stones and scores
    pub fn clear(&mut self) {
        for i in self.intersections.iter_mut() {
            i.remove_stone();
        }
        self.groups.reset();
        self.empty_groups.clear();
        self.black_score = 0;
        self.white_score = 0;
    }

    /// maximal liberties of a stone at `position`: 2 corner, 3 edge, 4 inside
    pub fn initial_liberties(&self, position: Position) -> u8 {
        let last = self.size - 1;
        let edge_x = position.x == 0 || position.x == last;
        let edge_y = position.y == 0 || position.y == last;
        4 - edge_x as u8 - edge_y as u8
    }

    #[inline(always)]
    pub(super) fn index(&self, position: Position) -> usize {
        position.x * self.size + position.y
    }

    #[inline(always)]
    pub(super) fn position(&self, cell: usize) -> Position {
        Position::new(cell / self.size, cell % self.size)
    }

    #[inline(always)]
    pub(super) fn cell_color(&self, cell: usize) -> Option<Color> {
        self.intersections[cell].color()
    }

    /// distinct empty intersections next to the chain containing `cell`
    fn group_liberties(&self, cell: usize) -> usize {
        let mut liberties = HashSet::new();
        for &member in self.groups.members(cell) {
            for n in neighbour_cells(self.size, member) {
                if self.cell_color(n).is_none() {
                    liberties.insert(n);
                }
            }
        }
        liberties.len()
    }

    /// recompute the stone liberties of `cell` and its neighbours
    fn refresh_around(&mut self, cell: usize) {
        self.refresh_liberties(cell);
        for n in neighbour_cells(self.size, cell) {
            self.refresh_liberties(n);
        }
    }

    fn refresh_liberties(&mut self, cell: usize) {
        let occupied = neighbour_cells(self.size, cell)
            .into_iter()
            .filter(|&n| self.cell_color(n).is_some())
            .count() as u8;
        if let Some(stone) = self.intersections[cell].stone_mut() {
            let liberties = stone.initial_liberties() - occupied;
            stone.set_liberties(liberties);
        }
    }

    fn rebuild_groups(&mut self) {
        let colors: Vec<Option<Color>> = self.intersections.iter().map(|i| i.color()).collect();
        let size = self.size;
        self.groups
            .rebuild(|c| colors[c], |c| neighbour_cells(size, c));
    }
}

/// cell indices orthogonally adjacent to `cell` on a `size` x `size` board
pub(super) fn neighbour_cells(size: usize, cell: usize) -> Vec<usize> {
    let (x, y) = (cell / size, cell % size);
    let mut result = Vec::with_capacity(4);
    if x > 0 {
        result.push(cell - size);
    }
    if x + 1 < size {
        result.push(cell + size);
    }
    if y > 0 {
        result.push(cell - 1);
    }
    if y + 1 < size {
        result.push(cell + 1);
    }
    result
}

impl Display for Board {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for row in self.intersections.chunks(self.size) {
            for i in row {
                match i.color() {
                    Some(Color::Black) => f.write_char('x')?,
                    Some(Color::White) => f.write_char('o')?,
                    None => f.write_char('.')?,
                }
                f.write_char(' ')?;
            }
            f.write_char('\n')?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test_board {
    use super::*;
    use crate::game::board::Color::{Black, White};

    fn p(x: usize, y: usize) -> Position {
        Position::new(x, y)
    }

    #[test]
    fn size_is_clamped() {
        assert_eq!(Board::new(1).size(), 5);
        assert_eq!(Board::new(30).size(), 19);
        assert_eq!(Board::new(9).size(), 9);
        assert_eq!(parse_board_size("13"), 13);
        assert_eq!(parse_board_size("-4"), 5);
        assert_eq!(parse_board_size("100"), 19);
        assert_eq!(parse_board_size("nine"), DEFAULT_BOARD_SIZE);
    }

    #[test]
    fn initial_liberties_by_position() {
        for size in [5, 9, 19] {
            let b = Board::new(size);
            let last = size - 1;
            for x in 0..size {
                for y in 0..size {
                    let expected = match (x == 0 || x == last, y == 0 || y == last) {
                        (true, true) => 2,
                        (true, false) | (false, true) => 3,
                        (false, false) => 4,
                    };
                    assert_eq!(b.initial_liberties(p(x, y)), expected);
                }
            }
        }
        let mut b = Board::new(9);
        b.set_stone(p(0, 0), Black).unwrap();
        b.set_stone(p(0, 4), Black).unwrap();
        b.set_stone(p(4, 4), Black).unwrap();
        assert_eq!(b.stone(p(0, 0)).unwrap().initial_liberties(), 2);
        assert_eq!(b.stone(p(0, 4)).unwrap().initial_liberties(), 3);
        assert_eq!(b.stone(p(4, 4)).unwrap().initial_liberties(), 4);
    }

    #[test]
    fn neighbour_liberties_are_updated() {
        let mut b = Board::new(9);
        b.set_stone(p(4, 4), Black).unwrap();
        b.set_stone(p(4, 5), White).unwrap();
        assert_eq!(b.stone(p(4, 4)).unwrap().liberties(), 3);
        assert_eq!(b.stone(p(4, 5)).unwrap().liberties(), 3);
        b.set_stone(p(3, 4), White).unwrap();
        assert_eq!(b.stone(p(4, 4)).unwrap().liberties(), 2);
        b.remove_stone(p(4, 5));
        assert_eq!(b.stone(p(4, 4)).unwrap().liberties(), 3);
    }

    #[test]
    fn out_of_range_and_occupied_are_rejected() {
        let mut b = Board::new(9);
        assert_eq!(b.set_stone(p(9, 0), Black), Err(MoveViolation::NotOnBoard));
        b.set_stone(p(2, 2), Black).unwrap();
        assert_eq!(b.set_stone(p(2, 2), White), Err(MoveViolation::Occupied));
        assert_eq!(b.color_at(p(2, 2)), Some(Black));
        assert_eq!(b.stone_count(White), 0);
    }

    #[test]
    fn adjacent_stones_form_one_group() {
        let mut b = Board::new(9);
        b.set_stone(p(2, 2), Black).unwrap();
        b.set_stone(p(2, 4), Black).unwrap();
        assert_eq!(b.groups().len(), 2);
        // joins both chains
        b.set_stone(p(2, 3), Black).unwrap();
        let groups = b.groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 3);
        assert_eq!(groups[0].liberties, 8);
        assert!(groups[0].contains(p(2, 4)));
    }

    #[test]
    fn corner_capture() {
        let mut b = Board::new(9);
        b.set_stone(p(0, 0), Black).unwrap();
        assert_eq!(b.set_stone(p(1, 0), White), Ok(vec![]));
        assert_eq!(b.set_stone(p(0, 1), White), Ok(vec![p(0, 0)]));
        assert!(!b.is_occupied(p(0, 0)));
        assert_eq!(b.stone_count(Black), 0);
        assert_eq!(b.stone(p(1, 0)).unwrap().liberties(), 3);
        assert_eq!(b.stone(p(0, 1)).unwrap().liberties(), 3);
    }

    #[test]
    fn multi_stone_capture() {
        let mut b = Board::new(9);
        // white chain of three on the top edge
        for y in 2..5 {
            b.set_stone(p(0, y), White).unwrap();
        }
        for y in 2..5 {
            b.set_stone(p(1, y), Black).unwrap();
        }
        b.set_stone(p(0, 1), Black).unwrap();
        let mut captured = b.set_stone(p(0, 5), Black).unwrap();
        captured.sort_by_key(|c| c.y);
        assert_eq!(captured, vec![p(0, 2), p(0, 3), p(0, 4)]);
        assert_eq!(b.stone_count(White), 0);
        assert_eq!(b.group_at(p(1, 3)).unwrap().liberties, 8);
    }

    #[test]
    fn suicide_is_undone() {
        let mut b = Board::new(9);
        b.set_stone(p(0, 1), White).unwrap();
        b.set_stone(p(1, 0), White).unwrap();
        let before = b.clone();
        assert_eq!(b.set_stone(p(0, 0), Black), Err(MoveViolation::Suicide));
        assert!(b.same_position(&before));
        assert_eq!(b.groups().len(), 2);
        assert_eq!(b.stone(p(0, 1)).unwrap().liberties(), 3);
    }

    #[test]
    fn multi_stone_suicide_is_undone() {
        let mut b = Board::new(5);
        // black pair at the corner surrounded by white, filling the last liberty
        b.set_stone(p(0, 0), Black).unwrap();
        b.set_stone(p(0, 2), White).unwrap();
        b.set_stone(p(1, 0), White).unwrap();
        b.set_stone(p(1, 1), White).unwrap();
        let before = b.clone();
        assert_eq!(b.set_stone(p(0, 1), Black), Err(MoveViolation::Suicide));
        assert!(b.same_position(&before));
        assert_eq!(b.group_at(p(0, 0)).unwrap().len(), 1);
    }

    #[test]
    fn capture_before_suicide() {
        let mut b = Board::new(9);
        // white stone at 0_1 with its last liberty at 0_0
        b.set_stone(p(0, 1), White).unwrap();
        b.set_stone(p(0, 2), Black).unwrap();
        b.set_stone(p(1, 1), Black).unwrap();
        b.set_stone(p(1, 0), White).unwrap();
        // 0_0 has no liberty for black, but it captures 0_1
        assert_eq!(b.set_stone(p(0, 0), Black), Ok(vec![p(0, 1)]));
        assert_eq!(b.color_at(p(0, 0)), Some(Black));
        assert_eq!(b.stone(p(0, 0)).unwrap().liberties(), 1);
    }

    #[test]
    fn copy_is_independent() {
        let mut original = Board::new(9);
        original.set_stone(p(3, 3), Black).unwrap();
        original.calculate_winner();
        let mut copy = original.clone();
        copy.set_stone(p(3, 4), White).unwrap();
        copy.remove_stone(p(3, 3));
        copy.calculate_winner();
        assert_eq!(original.color_at(p(3, 3)), Some(Black));
        assert!(!original.is_occupied(p(3, 4)));
        assert_eq!(original.groups().len(), 1);
        assert_eq!((original.black_score(), original.white_score()), (81, 0));
        assert_eq!((copy.black_score(), copy.white_score()), (0, 81));
    }

    #[test]
    fn remove_stone_splits_group() {
        let mut b = Board::new(9);
        for y in 0..3 {
            b.set_stone(p(4, y), Black).unwrap();
        }
        assert_eq!(b.groups().len(), 1);
        assert!(b.remove_stone(p(4, 1)).is_some());
        assert!(b.remove_stone(p(4, 1)).is_none());
        assert_eq!(b.groups().len(), 2);
        assert_eq!(b.group_at(p(4, 0)).unwrap().len(), 1);
    }

    #[test]
    fn clear_empties_board() {
        let mut b = Board::new(9);
        b.set_stone(p(1, 1), Black).unwrap();
        b.set_stone(p(2, 2), White).unwrap();
        b.calculate_winner();
        b.clear();
        assert_eq!(b.stone_count(Black) + b.stone_count(White), 0);
        assert!(b.groups().is_empty());
        assert_eq!((b.black_score(), b.white_score()), (0, 0));
        assert!(b.same_position(&Board::new(9)));
    }

    #[test]
    fn display_board() {
        let mut b = Board::new(5);
        b.set_stone(p(0, 0), Black).unwrap();
        b.set_stone(p(4, 4), White).unwrap();
        let text = b.to_string();
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0], "x . . . . ");
        assert_eq!(rows[4], ". . . . o ");
    }
}
