use std::str::FromStr;

use antlab_core::{Action, ActionError, Observation};
use thiserror::Error;

use crate::Policy;

/// Errors raised when building a scripted policy.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("action script is empty")]
    Empty,
    #[error("invalid action '{0}' in script")]
    Token(String),
    #[error(transparent)]
    Action(#[from] ActionError),
}

/// Replays a fixed action sequence, wrapping around at the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedPolicy {
    actions: Vec<Action>,
    cursor: usize,
}

impl ScriptedPolicy {
    pub const KIND: &'static str = "scripted";

    pub fn new(actions: Vec<Action>) -> Result<Self, ScriptError> {
        if actions.is_empty() {
            return Err(ScriptError::Empty);
        }
        Ok(Self { actions, cursor: 0 })
    }

    #[must_use]
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }
}

impl FromStr for ScriptedPolicy {
    type Err = ScriptError;

    /// Parses comma- or whitespace-separated tokens: `0`/`add`/`+` and `1`/`remove`/`-`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let actions = s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty())
            .map(|token| match token.to_ascii_lowercase().as_str() {
                "add" | "+" => Ok(Action::AddRule),
                "remove" | "-" => Ok(Action::RemoveRule),
                other => match other.parse::<usize>() {
                    Ok(value) => Action::try_from(value).map_err(ScriptError::from),
                    Err(_) => Err(ScriptError::Token(token.to_string())),
                },
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(actions)
    }
}

impl Policy for ScriptedPolicy {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn act(&mut self, _observation: &Observation) -> Action {
        let action = self.actions[self.cursor];
        self.cursor = (self.cursor + 1) % self.actions.len();
        action
    }
}
