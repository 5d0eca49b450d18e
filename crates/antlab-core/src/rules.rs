//! Per-colour transition rules and the palette that tracks them.

use std::fmt;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{Grid, MAX_RULES, MIN_RULES};

/// RGB triple used by rendering sinks.
pub type Rgb = [u8; 3];

/// Display colours for the first rules, in colour order.
pub const BASE_COLORS: [Rgb; 5] = [
    [255, 255, 255],
    [0, 0, 0],
    [255, 0, 0],
    [0, 255, 0],
    [0, 0, 255],
];

/// Fixed colours for tables built from a turn pattern instead of by mutation.
const PATTERN_COLORS: [Rgb; MAX_RULES - BASE_COLORS.len()] = [
    [0, 255, 255],
    [255, 0, 255],
    [255, 255, 0],
    [255, 128, 0],
    [128, 0, 255],
];

/// Direction change applied when the ant leaves a cell.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Turn {
    /// Counter-clockwise, `-1`.
    Left,
    /// Clockwise, `+1`.
    #[default]
    Right,
}

impl Turn {
    /// Signed heading delta.
    #[must_use]
    pub const fn delta(self) -> i8 {
        match self {
            Self::Left => -1,
            Self::Right => 1,
        }
    }

    /// Uniform choice between left and right.
    pub fn random(rng: &mut dyn RngCore) -> Self {
        if rng.random_bool(0.5) {
            Self::Right
        } else {
            Self::Left
        }
    }

    fn from_char(c: char) -> Option<Self> {
        match c {
            'L' | 'l' => Some(Self::Left),
            'R' | 'r' => Some(Self::Right),
            _ => None,
        }
    }

    const fn as_char(self) -> char {
        match self {
            Self::Left => 'L',
            Self::Right => 'R',
        }
    }
}

/// Transition applied to a cell of one colour.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rule {
    /// Colour written into the cell when the ant leaves it.
    pub next: u8,
    /// Heading change applied before the ant moves on.
    pub turn: Turn,
}

impl Rule {
    #[must_use]
    pub const fn new(next: u8, turn: Turn) -> Self {
        Self { next, turn }
    }
}

/// One row of a rule table as written to discovery logs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleSnapshot {
    pub color: u8,
    pub next: u8,
    pub turn: i8,
}

/// Errors raised when building a rule table from a turn pattern.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleTableError {
    #[error("rule pattern needs at least 2 turns, got {0}")]
    TooFewRules(usize),
    #[error("rule pattern allows at most 10 turns, got {0}")]
    TooManyRules(usize),
    #[error("invalid turn '{0}' in rule pattern (expected L or R)")]
    InvalidTurn(char),
}

/// Display colours indexed by rule colour, grown and shrunk with the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: [Rgb; MAX_RULES],
    len: usize,
}

impl Palette {
    fn seed() -> Self {
        let mut colors = [[0; 3]; MAX_RULES];
        colors[..MIN_RULES].copy_from_slice(&BASE_COLORS[..MIN_RULES]);
        Self {
            colors,
            len: MIN_RULES,
        }
    }

    fn sample(color: usize, rng: &mut dyn RngCore) -> Rgb {
        match BASE_COLORS.get(color) {
            Some(&rgb) => rgb,
            None => [rng.random(), rng.random(), rng.random()],
        }
    }

    fn pattern_color(color: usize) -> Rgb {
        BASE_COLORS
            .get(color)
            .or_else(|| PATTERN_COLORS.get(color - BASE_COLORS.len()))
            .copied()
            .unwrap_or([128, 128, 128])
    }

    fn push(&mut self, rgb: Rgb) {
        self.colors[self.len] = rgb;
        self.len += 1;
    }

    fn pop(&mut self) {
        self.len -= 1;
        self.colors[self.len] = [0; 3];
    }

    /// Colour for `index`, or `None` when no rule defines it.
    #[must_use]
    pub fn get(&self, index: u8) -> Option<Rgb> {
        self.as_slice().get(index as usize).copied()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Rgb] {
        &self.colors[..self.len]
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Dense table of rules for colours `0..len`, bounded to `[2, capacity]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTable {
    rules: [Rule; MAX_RULES],
    len: usize,
    capacity: usize,
    palette: Palette,
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::seed()
    }
}

impl RuleTable {
    /// The classic two-colour ant: `{0: (1, right), 1: (0, left)}`.
    #[must_use]
    pub fn seed() -> Self {
        Self::with_capacity(MAX_RULES)
    }

    /// Seed table that will never grow beyond `max_rules` (clamped to `[2, 10]`).
    #[must_use]
    pub fn with_capacity(max_rules: usize) -> Self {
        let mut rules = [Rule::default(); MAX_RULES];
        rules[0] = Rule::new(1, Turn::Right);
        rules[1] = Rule::new(0, Turn::Left);
        Self {
            rules,
            len: MIN_RULES,
            capacity: max_rules.clamp(MIN_RULES, MAX_RULES),
            palette: Palette::seed(),
        }
    }

    /// Builds a chained table (`c -> c + 1`, last -> 0) from a pattern such as `"RLR"`.
    pub fn from_turns(pattern: &str) -> Result<Self, RuleTableError> {
        let turns = pattern
            .chars()
            .map(|c| Turn::from_char(c).ok_or(RuleTableError::InvalidTurn(c)))
            .collect::<Result<Vec<_>, _>>()?;
        if turns.len() < MIN_RULES {
            return Err(RuleTableError::TooFewRules(turns.len()));
        }
        if turns.len() > MAX_RULES {
            return Err(RuleTableError::TooManyRules(turns.len()));
        }

        let len = turns.len();
        let mut rules = [Rule::default(); MAX_RULES];
        let mut palette = Palette {
            colors: [[0; 3]; MAX_RULES],
            len: 0,
        };
        for (color, turn) in turns.into_iter().enumerate() {
            rules[color] = Rule::new(((color + 1) % len) as u8, turn);
            palette.push(Palette::pattern_color(color));
        }
        Ok(Self {
            rules,
            len,
            capacity: MAX_RULES,
            palette,
        })
    }

    /// Number of defined colours.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether no colour is defined.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Largest size `add_rule` may grow the table to.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Rule for `color`, or `None` when the colour is outside the table.
    #[must_use]
    pub fn get(&self, color: u8) -> Option<Rule> {
        self.as_slice().get(color as usize).copied()
    }

    #[must_use]
    pub fn contains(&self, color: u8) -> bool {
        (color as usize) < self.len
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Rule] {
        &self.rules[..self.len]
    }

    #[must_use]
    pub const fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Appends colour `len`, which decays to 0, and reroutes the previous last colour into it.
    ///
    /// The new rule's turn is drawn uniformly from left/right and one palette
    /// entry is appended. Returns `false` without touching anything when the
    /// table is already at capacity.
    pub fn add_rule(&mut self, rng: &mut dyn RngCore) -> bool {
        if self.len >= self.capacity {
            return false;
        }
        let color = self.len;
        let turn = Turn::random(rng);
        self.rules[color] = Rule::new(0, turn);
        self.rules[color - 1].next = color as u8;
        self.palette.push(Palette::sample(color, rng));
        self.len += 1;
        debug!(color, turn = turn.delta(), rules = self.len, "added rule");
        true
    }

    /// Drops the last colour after resetting every grid cell that holds it to 0.
    ///
    /// The preceding rule keeps its `next` value, so it may still point at the
    /// removed colour until the next `add_rule`. Returns `false` without
    /// touching anything when only two rules remain.
    pub fn remove_rule(&mut self, grid: &mut Grid) -> bool {
        if self.len <= MIN_RULES {
            return false;
        }
        let last = self.len - 1;
        let cleared = grid.replace(last as u8, 0);
        self.rules[last] = Rule::default();
        self.palette.pop();
        self.len = last;
        debug!(color = last, cleared, rules = self.len, "removed rule");
        true
    }

    /// Rows in ascending colour order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<RuleSnapshot> {
        self.as_slice()
            .iter()
            .enumerate()
            .map(|(color, rule)| RuleSnapshot {
                color: color as u8,
                next: rule.next,
                turn: rule.turn.delta(),
            })
            .collect()
    }
}

impl fmt::Display for RuleTable {
    /// Turn pattern, e.g. `RL` for the classic ant.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in self.as_slice() {
            write!(f, "{}", rule.turn.as_char())?;
        }
        Ok(())
    }
}
