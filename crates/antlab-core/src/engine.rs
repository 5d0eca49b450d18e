use crate::{AntState, ConfigError, Grid, RuleTable};

/// Result of a single engine tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The cell was rewritten and the ant advanced one cell.
    Moved,
    /// The ant stands on a colour the table no longer defines; nothing changed.
    Skipped,
}

/// Advances the automaton exactly one tick.
///
/// Reads the colour under the ant; if `rules` defines it, writes the rule's
/// next colour, turns, moves one cell with toroidal wrap, and records the new
/// position. An undefined colour leaves the grid and the ant untouched.
pub fn step(grid: &mut Grid, ant: &mut AntState, rules: &RuleTable) -> StepOutcome {
    let here = ant.position();
    let Some(rule) = grid.get(here).and_then(|color| rules.get(color)) else {
        return StepOutcome::Skipped;
    };

    grid.set(here, rule.next);
    ant.turn(rule.turn);
    let (dx, dy) = ant.direction().offset();
    let next = grid.wrap(here, dx, dy);
    ant.arrive(next);
    StepOutcome::Moved
}

/// Owns the grid and the ant; borrows the rule table on every tick.
#[derive(Debug, Clone)]
pub struct SimulationEngine {
    grid: Grid,
    ant: AntState,
}

impl SimulationEngine {
    /// Blank `size * size` grid with the ant at its centre, retaining `trail_len` visits.
    pub fn new(size: u32, trail_len: usize) -> Result<Self, ConfigError> {
        let grid = Grid::new(size)?;
        let ant = AntState::new(grid.center(), trail_len);
        Ok(Self { grid, ant })
    }

    /// One tick of the automaton under `rules`.
    pub fn step(&mut self, rules: &RuleTable) -> StepOutcome {
        step(&mut self.grid, &mut self.ant, rules)
    }

    /// Runs `steps` ticks, returning how many of them moved the ant.
    pub fn advance(&mut self, rules: &RuleTable, steps: u32) -> u32 {
        let mut moved = 0;
        for _ in 0..steps {
            if self.step(rules) == StepOutcome::Moved {
                moved += 1;
            }
        }
        moved
    }

    /// Zeroes the grid and returns the ant to the centre.
    pub fn reset(&mut self) {
        self.grid.fill(0);
        let center = self.grid.center();
        self.ant.reset(center);
    }

    #[must_use]
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    #[must_use]
    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    #[must_use]
    pub const fn ant(&self) -> &AntState {
        &self.ant
    }

    #[must_use]
    pub fn ant_mut(&mut self) -> &mut AntState {
        &mut self.ant
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Direction, Position};
    use rand::{SeedableRng, rngs::SmallRng};

    #[test]
    fn first_steps_of_classic_ant() {
        let rules = RuleTable::seed();
        let mut engine = SimulationEngine::new(8, 8).expect("engine");
        let start = Position::new(4, 4);
        assert_eq!(engine.ant().position(), start);

        // Colour 0: write 1, turn right (up -> right), step east.
        assert_eq!(engine.step(&rules), StepOutcome::Moved);
        assert_eq!(engine.grid().get(start), Some(1));
        assert_eq!(engine.ant().direction(), Direction::Right);
        assert_eq!(engine.ant().position(), Position::new(5, 4));

        // Three more right turns close a 2x2 square back at the start.
        engine.advance(&rules, 3);
        assert_eq!(engine.ant().position(), start);
        assert_eq!(engine.ant().direction(), Direction::Up);
        assert_eq!(engine.grid().count(1), 4);

        // Colour 1: write 0, turn left (up -> left), step west.
        assert_eq!(engine.step(&rules), StepOutcome::Moved);
        assert_eq!(engine.grid().get(start), Some(0));
        assert_eq!(engine.ant().direction(), Direction::Left);
        assert_eq!(engine.ant().position(), Position::new(3, 4));
        assert_eq!(engine.ant().trail().len(), 5);
        assert_eq!(engine.ant().visited().len(), 5);
    }

    #[test]
    fn movement_wraps_around_edges() {
        let rules = RuleTable::seed();
        let mut engine = SimulationEngine::new(3, 4).expect("engine");
        engine.ant_mut().reset(Position::new(2, 0));
        engine.step(&rules);
        assert_eq!(engine.ant().position(), Position::new(0, 0));
    }

    #[test]
    fn undefined_colour_is_a_full_noop() {
        let rules = RuleTable::seed();
        let mut engine = SimulationEngine::new(5, 8).expect("engine");
        let center = engine.grid().center();
        engine.grid_mut().set(center, 7);
        let before = engine.clone();

        assert_eq!(engine.step(&rules), StepOutcome::Skipped);
        assert_eq!(engine.advance(&rules, 50), 0);
        assert_eq!(engine.grid(), before.grid());
        assert_eq!(engine.ant(), before.ant());
    }

    #[test]
    fn stale_next_colour_strands_the_ant() {
        let mut rng = SmallRng::seed_from_u64(11);
        let mut rules = RuleTable::seed();
        let mut engine = SimulationEngine::new(5, 8).expect("engine");
        rules.add_rule(&mut rng);
        rules.remove_rule(engine.grid_mut());
        // Colour 1 still routes into the removed colour 2.
        let center = engine.grid().center();
        engine.grid_mut().set(center, 1);
        engine.ant_mut().reset(center);

        assert_eq!(engine.step(&rules), StepOutcome::Moved);
        assert_eq!(engine.grid().get(center), Some(2));
        assert!(!rules.contains(2));

        // Back on the stale cell the ant can never leave.
        engine.ant_mut().reset(center);
        let stranded = engine.clone();
        assert_eq!(engine.step(&rules), StepOutcome::Skipped);
        assert_eq!(engine.advance(&rules, 20), 0);
        assert_eq!(engine.ant().position(), center);
        assert_eq!(engine.ant(), stranded.ant());
        assert_eq!(engine.grid(), stranded.grid());
    }

    #[test]
    fn same_rules_same_trajectory() {
        let rules = RuleTable::from_turns("RLLR").expect("rules");
        let mut a = SimulationEngine::new(32, 16).expect("engine");
        let mut b = SimulationEngine::new(32, 16).expect("engine");
        assert_eq!(a.advance(&rules, 2_000), 2_000);
        b.advance(&rules, 2_000);
        assert_eq!(a.grid(), b.grid());
        assert_eq!(a.ant(), b.ant());
        assert!(a.grid().cells().iter().all(|&c| rules.contains(c)));
    }

    #[test]
    fn reset_restores_blank_state() {
        let rules = RuleTable::seed();
        let mut engine = SimulationEngine::new(16, 8).expect("engine");
        engine.advance(&rules, 200);
        engine.reset();
        assert_eq!(engine.grid().count(0), 256);
        assert_eq!(engine.ant().position(), Position::new(8, 8));
        assert_eq!(engine.ant().direction(), Direction::Up);
        assert!(engine.ant().trail().is_empty());
    }
}
