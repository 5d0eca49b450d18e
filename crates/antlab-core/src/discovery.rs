use serde::{Deserialize, Serialize};

use crate::{Highway, RuleSnapshot};

/// Rule set that produced a highway, as handed to discovery sinks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HighwayDiscovery {
    /// Episode index in which the highway appeared.
    pub episode: u64,
    /// Engine steps charged to the episode when it was detected.
    pub steps: u64,
    /// Full rule table in ascending colour order.
    pub rules: Vec<RuleSnapshot>,
    /// Cycle information when the periodic criterion made the call.
    pub highway: Option<Highway>,
}

/// Append-only sink invoked whenever a highway is detected.
pub trait DiscoveryLog: Send {
    fn record(&mut self, discovery: &HighwayDiscovery);
}

/// No-op discovery sink.
#[derive(Debug, Default)]
pub struct NullDiscoveryLog;

impl DiscoveryLog for NullDiscoveryLog {
    fn record(&mut self, _discovery: &HighwayDiscovery) {}
}
