//! Sub-agents invoked by the orchestrator
//!
//! Each agent's public pipeline always returns a usable result; oracle
//! failures are absorbed by deterministic fallbacks inside the agent.

pub mod retry;
pub mod catalog;
pub mod coach;
pub mod chaos;
pub mod eval;

use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export commonly used types
pub use retry::RetryState;
pub use coach::{CoachAgent, CoachOutcome, Situation, SituationReport, Strategy};
pub use chaos::{ChaosAgent, ChaosOutcome, EventSource, ValidationFailure, Vulnerability};
pub use eval::{Critique, EvalAgent, EvalContext, EvalOutcome, RubricCriterion, ScoringRubric};

/// Agent selected by an orchestration decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Coach,
    Chaos,
    None,
}

impl AgentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Coach => "coach",
            AgentKind::Chaos => "chaos",
            AgentKind::None => "none",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
