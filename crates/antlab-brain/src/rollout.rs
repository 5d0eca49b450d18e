use antlab_core::{EpisodeController, EpisodeOutcome, Observation, StepResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Policy, Transition};

/// Totals for one played episode.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct EpisodeSummary {
    pub actions: u64,
    pub total_reward: f64,
    /// `Running` when the action cap was hit before the episode ended.
    pub outcome: EpisodeOutcome,
    /// Whether the last result reported `terminated || truncated`.
    pub done: bool,
}

/// Lets `policy` choose one action from `observation`, applies it, and feeds
/// the result back to the policy.
pub fn play_step<P: Policy + ?Sized>(
    controller: &mut EpisodeController,
    policy: &mut P,
    observation: &Observation,
) -> StepResult {
    let action = policy.act(observation);
    let result = controller.apply_action(action);
    policy.observe(&Transition {
        action,
        result: &result,
    });
    result
}

/// Resets `controller` and lets `policy` act until the episode ends or `max_actions` is reached.
///
/// An episode ends on the first call that reports `terminated`/`truncated` or
/// returns a terminal outcome (the controller has already reset by then).
pub fn play_episode<P: Policy + ?Sized>(
    controller: &mut EpisodeController,
    policy: &mut P,
    max_actions: u64,
) -> EpisodeSummary {
    let mut observation = controller.reset();
    let mut summary = EpisodeSummary::default();
    while summary.actions < max_actions {
        let result = play_step(controller, policy, &observation);
        summary.actions += 1;
        summary.total_reward += f64::from(result.reward);
        summary.outcome = result.outcome;
        summary.done = result.terminated || result.truncated;
        observation = result.observation;
        if summary.done || result.outcome.is_terminal() {
            break;
        }
    }
    debug!(
        policy = policy.kind(),
        actions = summary.actions,
        reward = summary.total_reward,
        outcome = ?summary.outcome,
        "episode rollout finished",
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RandomPolicy, ScriptedPolicy};
    use antlab_core::{Action, AntLabConfig, Observation};

    #[derive(Default)]
    struct Counting {
        seen: usize,
        rewards: f32,
    }

    impl Policy for Counting {
        fn kind(&self) -> &'static str {
            "test.counting"
        }

        fn act(&mut self, _observation: &Observation) -> Action {
            Action::AddRule
        }

        fn observe(&mut self, transition: &Transition<'_>) {
            self.seen += 1;
            self.rewards += transition.result.reward;
        }
    }

    fn config() -> AntLabConfig {
        AntLabConfig {
            grid_size: 40,
            steps_per_action: 50,
            step_budget: 1_000,
            rng_seed: Some(21),
            ..AntLabConfig::default()
        }
    }

    #[test]
    fn rollout_stops_at_budget() {
        let mut controller = EpisodeController::new(config()).expect("controller");
        let mut policy = Counting::default();
        let summary = play_episode(&mut controller, &mut policy, 1_000);
        assert_eq!(summary.actions, 20);
        assert!(summary.done);
        assert_eq!(summary.outcome, EpisodeOutcome::BudgetExceeded);
        assert_eq!(summary.total_reward, -20.0);
        assert_eq!(policy.seen, 20);
        assert_eq!(policy.rewards, -20.0);
    }

    #[test]
    fn single_step_feeds_back_its_result() {
        let mut controller = EpisodeController::new(config()).expect("controller");
        let mut policy = Counting::default();
        let observation = controller.observation();
        let result = play_step(&mut controller, &mut policy, &observation);
        assert_eq!(policy.seen, 1);
        assert_eq!(result.outcome, EpisodeOutcome::Running);
        assert_eq!(controller.rules().len(), 3);
        assert_eq!(controller.ant().step_count(), 50);
        assert_eq!(controller.stats().actions, 1);
    }

    #[test]
    fn rollout_respects_action_cap() {
        let mut controller = EpisodeController::new(config()).expect("controller");
        let mut policy: ScriptedPolicy = "0 1".parse().expect("script");
        let summary = play_episode(&mut controller, &mut policy, 5);
        assert_eq!(summary.actions, 5);
        assert!(!summary.done);
        assert_eq!(summary.outcome, EpisodeOutcome::Running);
        assert_eq!(controller.ant().step_count(), 250);
    }

    #[test]
    fn boxed_policies_roll_out() {
        let mut controller = EpisodeController::new(config()).expect("controller");
        let mut policy: Box<dyn Policy> = Box::new(RandomPolicy::new(4));
        let summary = play_episode(&mut controller, &mut policy, 100);
        assert_eq!(summary.actions, 20);
        assert_eq!(summary.outcome, EpisodeOutcome::BudgetExceeded);
    }
}
