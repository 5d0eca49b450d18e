//! Policies that choose rule-table actions for AntLab episodes.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use antlab_core::{Action, Observation, StepResult};

mod random;
mod rollout;
mod scripted;

pub use random::{RandomPolicy, RandomPolicyConfig};
pub use rollout::{EpisodeSummary, play_episode, play_step};
pub use scripted::{ScriptError, ScriptedPolicy};

/// Outcome of one action, fed back to the policy that chose it.
#[derive(Debug, Clone, Copy)]
pub struct Transition<'a> {
    pub action: Action,
    pub result: &'a StepResult,
}

/// Shared interface implemented by every decision maker.
pub trait Policy: Send {
    /// Static identifier of the policy implementation.
    fn kind(&self) -> &'static str;

    /// Chooses the next action given the latest observation.
    fn act(&mut self, observation: &Observation) -> Action;

    /// Receives the consequences of the last action.
    fn observe(&mut self, _transition: &Transition<'_>) {}
}

impl<P: Policy + ?Sized> Policy for Box<P> {
    fn kind(&self) -> &'static str {
        (**self).kind()
    }

    fn act(&mut self, observation: &Observation) -> Action {
        (**self).act(observation)
    }

    fn observe(&mut self, transition: &Transition<'_>) {
        (**self).observe(transition);
    }
}

type PolicySpawner = Box<dyn Fn(u64) -> Box<dyn Policy> + Send + Sync + 'static>;

struct PolicyEntry {
    kind: Cow<'static, str>,
    spawner: PolicySpawner,
}

/// Registry of policy factories keyed by opaque handles.
#[derive(Default)]
pub struct PolicyRegistry {
    next_key: u64,
    entries: HashMap<u64, PolicyEntry>,
}

impl fmt::Debug for PolicyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyRegistry")
            .field("next_key", &self.next_key)
            .field("entry_count", &self.entries.len())
            .finish()
    }
}

impl PolicyRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the random policy.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(RandomPolicy::KIND, |seed| Box::new(RandomPolicy::new(seed)));
        registry
    }

    /// Registers a new policy factory, returning its registry key.
    pub fn register<F>(&mut self, kind: impl Into<Cow<'static, str>>, factory: F) -> u64
    where
        F: Fn(u64) -> Box<dyn Policy> + Send + Sync + 'static,
    {
        let key = self.next_key;
        self.next_key += 1;
        self.entries.insert(
            key,
            PolicyEntry {
                kind: kind.into(),
                spawner: Box::new(factory),
            },
        );
        key
    }

    /// Removes a policy factory from the registry.
    pub fn unregister(&mut self, key: u64) -> bool {
        self.entries.remove(&key).is_some()
    }

    /// Instantiates the policy referenced by `key` with the given seed.
    #[must_use]
    pub fn spawn(&self, key: u64, seed: u64) -> Option<Box<dyn Policy>> {
        self.entries.get(&key).map(|entry| (entry.spawner)(seed))
    }

    /// Key of the first entry registered under `kind`.
    #[must_use]
    pub fn find(&self, kind: &str) -> Option<u64> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.kind == kind)
            .map(|(&key, _)| key)
            .min()
    }

    #[must_use]
    pub fn kind(&self, key: u64) -> Option<&str> {
        self.entries.get(&key).map(|entry| entry.kind.as_ref())
    }

    #[must_use]
    pub fn contains(&self, key: u64) -> bool {
        self.entries.contains_key(&key)
    }
}
