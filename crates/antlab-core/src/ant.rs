use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::{Position, Turn};

/// Facing direction; index order is up, right, down, left.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Direction {
    /// North, -Y.
    #[default]
    Up,
    /// East, +X.
    Right,
    /// South, +Y.
    Down,
    /// West, -X.
    Left,
}

impl Direction {
    const ALL: [Self; 4] = [Self::Up, Self::Right, Self::Down, Self::Left];

    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Self::Up => 0,
            Self::Right => 1,
            Self::Down => 2,
            Self::Left => 3,
        }
    }

    /// Direction for `index mod 4`.
    #[must_use]
    pub const fn from_index(index: u8) -> Self {
        Self::ALL[(index % 4) as usize]
    }

    /// Applies `(dir + turn) mod 4`.
    #[must_use]
    pub fn turned(self, turn: Turn) -> Self {
        let index = (i16::from(self.index()) + i16::from(turn.delta())).rem_euclid(4);
        Self::from_index(index as u8)
    }

    /// Unit step for moving in this direction.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Right => (1, 0),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
        }
    }
}

/// One recorded move: where the ant arrived and which way it travelled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Visit {
    pub position: Position,
    pub heading: Direction,
}

/// Bounded, ordered record of the most recent visits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trail {
    capacity: usize,
    visits: VecDeque<Visit>,
}

impl Trail {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            visits: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, visit: Visit) {
        if self.capacity == 0 {
            return;
        }
        if self.visits.len() >= self.capacity {
            self.visits.pop_front();
        }
        self.visits.push_back(visit);
    }

    /// Visits oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Visit> + ExactSizeIterator + '_ {
        self.visits.iter()
    }

    /// The most recent `n` visits (fewer if the trail is shorter), oldest first.
    pub fn tail(&self, n: usize) -> impl Iterator<Item = &Visit> + '_ {
        self.visits.iter().skip(self.visits.len().saturating_sub(n))
    }

    #[must_use]
    pub fn last(&self) -> Option<&Visit> {
        self.visits.back()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.visits.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.visits.clear();
    }
}

/// Position, heading, and visit history of the ant for the current episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AntState {
    position: Position,
    direction: Direction,
    step_count: u64,
    visited: HashSet<Position>,
    trail: Trail,
}

impl AntState {
    /// Ant at `start`, facing up, keeping the last `trail_len` visits.
    #[must_use]
    pub fn new(start: Position, trail_len: usize) -> Self {
        Self {
            position: start,
            direction: Direction::Up,
            step_count: 0,
            visited: HashSet::new(),
            trail: Trail::with_capacity(trail_len),
        }
    }

    /// Returns to `start` facing up with no steps and no history.
    pub fn reset(&mut self, start: Position) {
        self.position = start;
        self.direction = Direction::Up;
        self.step_count = 0;
        self.visited.clear();
        self.trail.clear();
    }

    #[must_use]
    pub const fn position(&self) -> Position {
        self.position
    }

    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Engine steps charged to the current episode.
    #[must_use]
    pub const fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn charge_steps(&mut self, steps: u64) {
        self.step_count = self.step_count.saturating_add(steps);
    }

    /// Distinct cells entered since the last reset.
    #[must_use]
    pub fn visited(&self) -> &HashSet<Position> {
        &self.visited
    }

    #[must_use]
    pub const fn trail(&self) -> &Trail {
        &self.trail
    }

    pub(crate) fn turn(&mut self, turn: Turn) {
        self.direction = self.direction.turned(turn);
    }

    pub(crate) fn arrive(&mut self, position: Position) {
        self.position = position;
        self.visited.insert(position);
        self.trail.push(Visit {
            position,
            heading: self.direction,
        });
    }
}
