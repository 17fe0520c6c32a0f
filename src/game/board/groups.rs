//! Partition of the occupied intersections into chains.
//!
//! Every cell index has a parent; a cell whose parent is itself is a root.
//! Only roots of occupied cells own a non-empty member list. Chains only
//! grow by union, so splitting (single stone removal) rebuilds the partition.
use crate::game::board::{Color, Position};

/// A read-only view of one chain of same-colored, connected stones.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct IntersectionGroup {
    pub color: Color,
    pub stones: Vec<Position>,
    /// distinct empty intersections adjacent to the chain
    pub liberties: usize,
}

impl IntersectionGroup {
    pub fn len(&self) -> usize {
        self.stones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stones.is_empty()
    }

    pub fn contains(&self, position: Position) -> bool {
        self.stones.contains(&position)
    }
}

#[derive(Clone, Debug)]
pub(crate) struct GroupTracker {
    parent: Vec<usize>,
    members: Vec<Vec<usize>>,
}

impl GroupTracker {
    pub(crate) fn new(cells: usize) -> Self {
        GroupTracker {
            parent: (0..cells).collect(),
            members: vec![Vec::new(); cells],
        }
    }

    /// root of the chain containing `cell`
    pub(crate) fn root(&self, mut cell: usize) -> usize {
        while self.parent[cell] != cell {
            cell = self.parent[cell];
        }
        cell
    }

    /// register a freshly placed stone as its own chain
    pub(crate) fn add_stone(&mut self, cell: usize) {
        self.parent[cell] = cell;
        self.members[cell] = vec![cell];
    }

    /// merge the chains of `a` and `b`, returning the surviving root
    pub(crate) fn union(&mut self, a: usize, b: usize) -> usize {
        let (ra, rb) = (self.root(a), self.root(b));
        if ra == rb {
            return ra;
        }
        // union by size keeps the trees shallow
        let (big, small) = if self.members[ra].len() >= self.members[rb].len() {
            (ra, rb)
        } else {
            (rb, ra)
        };
        let moved = std::mem::take(&mut self.members[small]);
        self.members[big].extend(moved);
        self.parent[small] = big;
        big
    }

    pub(crate) fn members(&self, cell: usize) -> &[usize] {
        &self.members[self.root(cell)]
    }

    /// dissolve the chain containing `cell`, returning its former members
    pub(crate) fn remove_group(&mut self, cell: usize) -> Vec<usize> {
        let root = self.root(cell);
        let members = std::mem::take(&mut self.members[root]);
        for &m in &members {
            self.parent[m] = m;
        }
        members
    }

    /// roots of all current chains
    pub(crate) fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.members
            .iter()
            .enumerate()
            .filter(|(_, m)| !m.is_empty())
            .map(|(i, _)| i)
    }

    pub(crate) fn reset(&mut self) {
        for (i, p) in self.parent.iter_mut().enumerate() {
            *p = i;
        }
        for m in self.members.iter_mut() {
            m.clear();
        }
    }

    /// recompute the whole partition from cell colors and adjacency
    pub(crate) fn rebuild<F, N>(&mut self, color_of: F, neighbours: N)
    where
        F: Fn(usize) -> Option<Color>,
        N: Fn(usize) -> Vec<usize>,
    {
        self.reset();
        let cells = self.parent.len();
        for cell in 0..cells {
            if color_of(cell).is_some() {
                self.add_stone(cell);
            }
        }
        for cell in 0..cells {
            if let Some(color) = color_of(cell) {
                for n in neighbours(cell) {
                    if n > cell && color_of(n) == Some(color) {
                        self.union(cell, n);
                    }
                }
            }
        }
    }
}
