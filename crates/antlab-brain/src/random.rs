use antlab_core::{Action, Observation};
use rand::{Rng, SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};

use crate::Policy;

/// Uniform-ish coin flip between adding and removing rules.
#[derive(Debug, Clone)]
pub struct RandomPolicy {
    rng: SmallRng,
    add_probability: f64,
}

/// Serializable settings for [`RandomPolicy`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RandomPolicyConfig {
    pub seed: u64,
    /// Chance of choosing [`Action::AddRule`]; clamped to `[0, 1]`.
    pub add_probability: f64,
}

impl Default for RandomPolicyConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            add_probability: 0.5,
        }
    }
}

impl RandomPolicy {
    pub const KIND: &'static str = "random";

    /// Fair coin seeded with `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::from_config(RandomPolicyConfig {
            seed,
            ..RandomPolicyConfig::default()
        })
    }

    #[must_use]
    pub fn from_config(config: RandomPolicyConfig) -> Self {
        let add_probability = if config.add_probability.is_finite() {
            config.add_probability.clamp(0.0, 1.0)
        } else {
            0.5
        };
        Self {
            rng: SmallRng::seed_from_u64(config.seed),
            add_probability,
        }
    }

    #[must_use]
    pub const fn add_probability(&self) -> f64 {
        self.add_probability
    }
}

impl Policy for RandomPolicy {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn act(&mut self, _observation: &Observation) -> Action {
        if self.rng.random_bool(self.add_probability) {
            Action::AddRule
        } else {
            Action::RemoveRule
        }
    }
}
