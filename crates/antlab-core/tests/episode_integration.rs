use std::sync::{Arc, Mutex};

use antlab_core::{
    Action, AntLabConfig, DiscoveryLog, EpisodeController, EpisodeOutcome, HighwayCriterion,
    HighwayDiscovery, RuleTable, SimulationEngine, find_period,
};

#[test]
fn classic_ant_exhausts_budget_under_stasis_detection() {
    let config = AntLabConfig {
        rng_seed: Some(0xA17),
        ..AntLabConfig::default()
    };
    let mut controller = EpisodeController::new(config).expect("controller");
    controller.reset();

    // Removing at the two-rule floor is a no-op, so the seed table runs untouched.
    for call in 1..500 {
        let result = controller.apply_action(Action::RemoveRule);
        assert_eq!(result.reward, 0.0, "call {call}");
        assert!(!result.terminated, "call {call}");
        assert_eq!(result.outcome, EpisodeOutcome::Running, "call {call}");
        assert_eq!(controller.rules(), &RuleTable::seed());
    }
    assert_eq!(controller.ant().step_count(), 49_900);

    let result = controller.apply_action(Action::RemoveRule);
    assert!(result.terminated);
    assert!(!result.truncated);
    assert_eq!(result.reward, -20.0);
    assert_eq!(result.outcome, EpisodeOutcome::BudgetExceeded);
    assert_eq!(result.observation.as_slice().len(), 160 * 160);
    assert_eq!(result.observation.active_cells(), 0);
    assert_eq!(controller.ant().step_count(), 0);
    assert_eq!(controller.stats().highways, 0);
    assert_eq!(controller.stats().budget_exhaustions, 1);
}

#[test]
fn grown_then_shrunk_table_exhausts_budget() {
    let config = AntLabConfig {
        rng_seed: Some(0x5EED),
        ..AntLabConfig::default()
    };
    let mut controller = EpisodeController::new(config).expect("controller");

    let result = controller.apply_action(Action::AddRule);
    assert_eq!(result.outcome, EpisodeOutcome::Running);
    assert_eq!(controller.rules().len(), 3);

    let result = controller.apply_action(Action::RemoveRule);
    assert_eq!(result.outcome, EpisodeOutcome::Running);
    assert_eq!(controller.rules().len(), 2);
    // The surviving rule for colour 1 still names the removed colour.
    assert_eq!(controller.rules().get(1).map(|rule| rule.next), Some(2));

    for call in 3..500 {
        let result = controller.apply_action(Action::RemoveRule);
        assert_eq!(result.reward, 0.0, "call {call}");
        assert!(!result.terminated, "call {call}");
        assert_eq!(result.outcome, EpisodeOutcome::Running, "call {call}");
        assert_eq!(controller.rules().len(), 2);
    }
    assert_eq!(controller.ant().step_count(), 49_900);

    let result = controller.apply_action(Action::RemoveRule);
    assert!(result.terminated);
    assert_eq!(result.reward, -20.0);
    assert_eq!(result.outcome, EpisodeOutcome::BudgetExceeded);
    assert_eq!(controller.rules(), &RuleTable::seed());
    assert_eq!(controller.stats().highways, 0);
    assert_eq!(controller.stats().rules_added, 1);
    assert_eq!(controller.stats().rules_removed, 1);
    assert_eq!(controller.stats().total_reward, -20.0);
}

#[test]
fn periodic_detector_flags_the_classic_highway() {
    let rules = RuleTable::seed();
    let window = 312;
    let mut engine = SimulationEngine::new(160, window).expect("engine");

    let mut found = None;
    for burst in 1..=200_u32 {
        engine.advance(&rules, 100);
        if let Some(highway) = find_period(engine.ant().trail(), window, 128) {
            found = Some((burst * 100, highway));
            break;
        }
    }

    let (steps, highway) = found.expect("classic ant builds a highway");
    assert!(steps >= 5_000, "highway flagged during the chaotic phase at {steps}");
    assert_eq!(highway.period, 104);
    assert_eq!(highway.displacement.0.abs(), 2);
    assert_eq!(highway.displacement.1.abs(), 2);
}

#[test]
fn seeded_controllers_play_identically() {
    let config = AntLabConfig {
        grid_size: 64,
        step_budget: 5_000,
        rng_seed: Some(0xDEADBEEF),
        ..AntLabConfig::default()
    };
    let mut a = EpisodeController::new(config.clone()).expect("a");
    let mut b = EpisodeController::new(config).expect("b");

    let script = [0_u8, 0, 1, 0, 0, 0, 1, 1, 0, 0, 0, 0, 0, 0, 0, 1];
    for round in 0..10 {
        for &value in &script {
            let action = Action::try_from(value).expect("action");
            let ra = a.apply_action(action);
            let rb = b.apply_action(action);
            assert_eq!(ra, rb, "round {round}");
        }
    }
    assert_eq!(a.rules(), b.rules());
    assert_eq!(a.grid(), b.grid());
    assert_eq!(a.stats(), b.stats());
}

#[test]
fn rule_table_invariants_hold_under_random_play() {
    use rand::{Rng, SeedableRng, rngs::SmallRng};

    let config = AntLabConfig {
        grid_size: 48,
        step_budget: 3_000,
        rng_seed: Some(3),
        ..AntLabConfig::default()
    };
    let mut controller = EpisodeController::new(config).expect("controller");
    let mut agent = SmallRng::seed_from_u64(17);
    for _ in 0..2_000 {
        let action = if agent.random_bool(0.6) {
            Action::AddRule
        } else {
            Action::RemoveRule
        };
        let before = controller.rules().len();
        let result = controller.apply_action(action);
        let rules = controller.rules();
        assert!((2..=10).contains(&rules.len()));
        assert_eq!(rules.palette().len(), rules.len());
        assert_eq!(rules.snapshot().len(), rules.len());
        for (color, row) in rules.snapshot().iter().enumerate() {
            assert_eq!(row.color as usize, color);
        }
        assert!(result.observation.as_slice().iter().all(|&c| c <= 1));
        if result.outcome == EpisodeOutcome::Running {
            match action {
                Action::AddRule => assert_eq!(rules.len(), (before + 1).min(10)),
                Action::RemoveRule => assert_eq!(rules.len(), (before - 1).max(2)),
            }
        }
    }
    assert!(controller.stats().budget_exhaustions > 0);
}

#[test]
fn periodic_discoveries_carry_cycle_details() {
    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<Vec<HighwayDiscovery>>>);

    impl DiscoveryLog for Shared {
        fn record(&mut self, discovery: &HighwayDiscovery) {
            self.0.lock().expect("lock").push(discovery.clone());
        }
    }

    let sink = Shared::default();
    let config = AntLabConfig {
        highway: HighwayCriterion::periodic(),
        rng_seed: Some(5),
        ..AntLabConfig::default()
    };
    let mut controller =
        EpisodeController::with_discovery_log(config, Box::new(sink.clone())).expect("controller");

    let mut rewarded = None;
    for call in 1..=200 {
        let result = controller.apply_action(Action::RemoveRule);
        if result.outcome == EpisodeOutcome::HighwayFound {
            rewarded = Some((call, result.reward));
            break;
        }
    }

    let (call, reward) = rewarded.expect("classic highway under periodic criterion");
    assert_eq!(reward, 50.0);
    let discoveries = sink.0.lock().expect("lock");
    assert_eq!(discoveries.len(), 1);
    assert_eq!(discoveries[0].steps, call * 100);
    assert_eq!(discoveries[0].rules, RuleTable::seed().snapshot());
    assert_eq!(discoveries[0].highway.map(|h| h.period), Some(104));
    assert_eq!(controller.ant().step_count(), 0);
}
