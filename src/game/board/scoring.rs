//! Area scoring: stones on the board plus empty regions bordered by one color.
use crate::game::board::board::{neighbour_cells, Board};
use crate::game::board::{Color, Position};
use std::collections::VecDeque;

impl Board {
    /// Score the current position.
    ///
    /// Each contiguous empty region touching stones of exactly one color
    /// counts as that color's territory. Returns `(black, white)` and
    /// stores both scores and the empty regions found.
    pub fn calculate_winner(&mut self) -> (usize, usize) {
        let cells = self.size * self.size;
        let mut visited = vec![false; cells];
        let mut black = self.stone_count(Color::Black);
        let mut white = self.stone_count(Color::White);
        let mut regions = Vec::new();

        for start in 0..cells {
            if visited[start] || self.cell_color(start).is_some() {
                continue;
            }
            let (region, touches_black, touches_white) = self.empty_region(start, &mut visited);
            match (touches_black, touches_white) {
                (true, false) => black += region.len(),
                (false, true) => white += region.len(),
                _ => {}
            }
            regions.push(region.into_iter().map(|c| self.position(c)).collect());
        }

        self.empty_groups = regions;
        self.black_score = black;
        self.white_score = white;
        (black, white)
    }

    /// flood fill the empty region containing `start`
    fn empty_region(&self, start: usize, visited: &mut [bool]) -> (Vec<usize>, bool, bool) {
        let mut region = Vec::new();
        let mut touches_black = false;
        let mut touches_white = false;
        let mut queue = VecDeque::from([start]);
        visited[start] = true;
        while let Some(cell) = queue.pop_front() {
            region.push(cell);
            for n in neighbour_cells(self.size, cell) {
                match self.cell_color(n) {
                    Some(Color::Black) => touches_black = true,
                    Some(Color::White) => touches_white = true,
                    None if !visited[n] => {
                        visited[n] = true;
                        queue.push_back(n);
                    }
                    None => {}
                }
            }
        }
        (region, touches_black, touches_white)
    }

    pub fn black_score(&self) -> usize {
        self.black_score
    }

    pub fn white_score(&self) -> usize {
        self.white_score
    }

    /// empty regions found by the latest scoring
    pub fn empty_groups(&self) -> &[Vec<Position>] {
        &self.empty_groups
    }
}
