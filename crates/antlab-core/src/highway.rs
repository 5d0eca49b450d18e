//! Highway recognition over the ant's recent visits.

use serde::{Deserialize, Serialize};

use crate::{HighwayCriterion, Position, Trail};

/// A repeating move cycle that carries the ant across the grid.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Highway {
    /// Moves per cycle.
    pub period: usize,
    /// Net `(dx, dy)` travelled in one cycle.
    pub displacement: (i32, i32),
}

/// What a detector saw when its criterion fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighwaySignal {
    /// The ant has not left its cell for the whole window.
    Stationary,
    /// The ant's moves repeat and carry it across the grid.
    Periodic(Highway),
}

impl HighwaySignal {
    /// Cycle details, when the criterion measured one.
    #[must_use]
    pub const fn highway(self) -> Option<Highway> {
        match self {
            Self::Stationary => None,
            Self::Periodic(highway) => Some(highway),
        }
    }
}

/// Applies a [`HighwayCriterion`] to an ant's trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighwayDetector {
    criterion: HighwayCriterion,
}

impl Default for HighwayDetector {
    fn default() -> Self {
        Self::new(HighwayCriterion::default())
    }
}

impl HighwayDetector {
    #[must_use]
    pub const fn new(criterion: HighwayCriterion) -> Self {
        Self { criterion }
    }

    /// Evaluates the configured criterion once, returning what fired.
    #[must_use]
    pub fn inspect(&self, trail: &Trail) -> Option<HighwaySignal> {
        match self.criterion {
            HighwayCriterion::Stasis { window } => {
                is_stationary(trail.tail(window).map(|visit| visit.position))
                    .then_some(HighwaySignal::Stationary)
            }
            HighwayCriterion::Periodic { window, max_period } => {
                find_period(trail, window, max_period).map(HighwaySignal::Periodic)
            }
        }
    }

    /// Whether the trail satisfies the configured criterion.
    #[must_use]
    pub fn detect(&self, trail: &Trail) -> bool {
        self.inspect(trail).is_some()
    }
}

/// True when `positions` is non-empty and every entry is the same cell.
///
/// A tail shorter than the window is judged on whatever it holds.
pub fn is_stationary(positions: impl IntoIterator<Item = Position>) -> bool {
    let mut positions = positions.into_iter();
    let Some(first) = positions.next() else {
        return false;
    };
    positions.all(|pos| pos == first)
}

/// Smallest period `p <= max_period` with which the last `window` headings repeat
/// and whose cycle has a non-zero net displacement.
///
/// Returns `None` until the trail holds at least `window` visits.
#[must_use]
pub fn find_period(trail: &Trail, window: usize, max_period: usize) -> Option<Highway> {
    if window == 0 || trail.len() < window {
        return None;
    }
    let headings: Vec<_> = trail.tail(window).map(|visit| visit.heading).collect();
    for period in 1..=max_period.min(window / 2) {
        if !(period..window).all(|i| headings[i] == headings[i - period]) {
            continue;
        }
        let displacement = headings[window - period..]
            .iter()
            .fold((0, 0), |(x, y), heading| {
                let (dx, dy) = heading.offset();
                (x + dx, y + dy)
            });
        if displacement != (0, 0) {
            return Some(Highway {
                period,
                displacement,
            });
        }
    }
    None
}
