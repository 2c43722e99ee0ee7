//! Coach agent: reactive hint state machine
//!
//! `analyze_situation → decide_strategy → generate_hint`
//!
//! Direct hints are a deterministic lookup. Socratic and escalated hints ask
//! the oracle for phrasing and fall back to the lookup on any failure.

use crate::agents::catalog::component_hint;
use crate::config::CoachConfig;
use crate::game::RoomState;
use crate::oracle::{self, OracleRequest, SharedOracle, DEFAULT_ORACLE_TIMEOUT};
use crate::types::{CoachHint, HintType};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Oracle purpose tag for hint phrasing
pub const PURPOSE_HINT: &str = "coach.hint";

/// Where the player currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Situation {
    /// Nothing placed yet
    Empty,
    /// More than the critical share of required components absent
    MissingCritical,
    /// Some required components absent
    MissingOptional,
    /// Same missing-component hint given twice without progress
    StuckSame,
    /// Two or more components, zero connections
    NoArrows,
    Complete,
}

/// How the next hint is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Direct,
    Socratic,
    Escalate,
    Skip,
}

impl Strategy {
    /// Severity level carried by hints of this strategy
    pub fn level(&self) -> u8 {
        match self {
            Strategy::Direct | Strategy::Skip => 1,
            Strategy::Socratic => 2,
            Strategy::Escalate => 3,
        }
    }
}

/// Output of `analyze_situation`
#[derive(Debug, Clone, PartialEq)]
pub struct SituationReport {
    pub situation: Situation,
    pub missing: Vec<String>,
    pub required: Vec<String>,
    pub required_covered: usize,
    pub node_count: usize,
    pub arrow_count: usize,
    pub prior_hints: usize,
    pub prior_level: u8,
    pub mission_title: String,
}

/// Result of one coach invocation
#[derive(Debug, Clone, PartialEq)]
pub struct CoachOutcome {
    pub report: SituationReport,
    pub strategy: Strategy,

    /// `None` when the strategy is `Skip`
    pub hint: Option<CoachHint>,
}

#[derive(Debug, Deserialize)]
struct HintReply {
    message: String,
}

/// Hint-producing agent
pub struct CoachAgent {
    config: CoachConfig,
    oracle: SharedOracle,
    timeout: Duration,
}

impl CoachAgent {
    pub fn new(config: CoachConfig, oracle: SharedOracle) -> Self {
        Self {
            config,
            oracle,
            timeout: DEFAULT_ORACLE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Classify the player's design into exactly one situation
    pub fn analyze_situation(&self, room: &RoomState, player_id: &str) -> SituationReport {
        let design = room.design(player_id);
        let node_count = design.map(|d| d.node_count).unwrap_or(0);
        let arrow_count = design.map(|d| d.arrow_count).unwrap_or(0);
        let missing = room.missing_required(player_id);
        let required = room.mission_required().to_vec();
        let required_covered = required.len() - missing.len();
        let history = room.hints(player_id);

        let situation = if node_count == 0 {
            Situation::Empty
        } else if !missing.is_empty() {
            let repeated = history
                .map(|h| is_stuck_on_same(h.last_n(2), required_covered))
                .unwrap_or(false);

            if repeated {
                Situation::StuckSame
            } else if missing.len() as f64 / required.len() as f64 > self.config.critical_missing_ratio {
                Situation::MissingCritical
            } else {
                Situation::MissingOptional
            }
        } else if node_count >= 2 && arrow_count == 0 {
            Situation::NoArrows
        } else {
            Situation::Complete
        };

        SituationReport {
            situation,
            missing,
            required,
            required_covered,
            node_count,
            arrow_count,
            prior_hints: history.map(|h| h.len()).unwrap_or(0),
            prior_level: history.map(|h| h.last_level()).unwrap_or(0),
            mission_title: room.mission_title.clone(),
        }
    }

    /// Map a situation and the number of prior hints to a strategy
    ///
    /// First hint direct, second socratic, later ones direct again; being
    /// stuck always escalates and a complete design is skipped.
    pub fn decide_strategy(situation: Situation, prior_hints: usize) -> Strategy {
        match situation {
            Situation::Complete => Strategy::Skip,
            Situation::StuckSame => Strategy::Escalate,
            _ if prior_hints == 1 => Strategy::Socratic,
            _ => Strategy::Direct,
        }
    }

    /// Execute the chosen strategy
    pub async fn generate_hint(&self, report: &SituationReport, strategy: Strategy) -> Option<CoachHint> {
        if strategy == Strategy::Skip {
            return None;
        }

        let (hint_type, missing) = match report.situation {
            Situation::Empty => (HintType::GettingStarted, report.required.clone()),
            Situation::NoArrows => (HintType::Connection, Vec::new()),
            Situation::Complete => (HintType::Encouragement, Vec::new()),
            Situation::MissingCritical | Situation::MissingOptional | Situation::StuckSame => {
                (HintType::MissingComponent, report.missing.clone())
            }
        };

        let deterministic = match strategy {
            Strategy::Escalate => step_by_step_message(&report.missing),
            _ => direct_message(report),
        };

        let message = match strategy {
            Strategy::Direct => deterministic,
            Strategy::Socratic | Strategy::Escalate => {
                let request = self.hint_request(report, strategy);
                match oracle::consult::<HintReply>(&self.oracle, &request).await {
                    Ok(reply) if !reply.message.trim().is_empty() => reply.message.trim().to_string(),
                    _ => deterministic,
                }
            }
            Strategy::Skip => return None,
        };

        Some(CoachHint {
            message,
            missing_components: missing,
            hint_type,
            level: strategy.level().max(report.prior_level),
        })
    }

    /// Full pipeline for one player
    pub async fn run(&self, room: &RoomState, player_id: &str) -> CoachOutcome {
        let report = self.analyze_situation(room, player_id);
        let strategy = Self::decide_strategy(report.situation, report.prior_hints);
        debug!(
            room_id = %room.room_id,
            player_id,
            situation = ?report.situation,
            ?strategy,
            "coach decision"
        );

        let hint = self.generate_hint(&report, strategy).await;
        CoachOutcome {
            report,
            strategy,
            hint,
        }
    }

    fn hint_request(&self, report: &SituationReport, strategy: Strategy) -> OracleRequest {
        let style = match strategy {
            Strategy::Socratic => {
                "Ask one leading question that makes the player discover the gap themselves. Do not name the component outright."
            }
            _ => {
                "The player is stuck. Give explicit, numbered steps that tell them exactly what to add and why."
            }
        };

        let system = format!(
            "You coach a player building a system architecture diagram. {style} \
             Keep it under 60 words. Reply with JSON: {{\"message\": string}}."
        );
        let user = format!(
            "Mission: {}\nRequired components: {}\nMissing components: {}\n\
             Components placed: {}, connections: {}\nHints already given: {}",
            report.mission_title,
            report.required.join(", "),
            report.missing.join(", "),
            report.node_count,
            report.arrow_count,
            report.prior_hints,
        );

        OracleRequest::new(PURPOSE_HINT, system, user).with_timeout(self.timeout)
    }
}

/// Last two hints name the same missing component and coverage has not grown
fn is_stuck_on_same(recent: Vec<&crate::game::HintRecord>, required_covered: usize) -> bool {
    let [first, second] = recent.as_slice() else {
        return false;
    };

    first.hint_type == HintType::MissingComponent
        && second.hint_type == HintType::MissingComponent
        && first.missing_components.first().is_some()
        && first.missing_components.first() == second.missing_components.first()
        && required_covered <= second.required_covered
}

fn direct_message(report: &SituationReport) -> String {
    match report.situation {
        Situation::Empty => {
            if report.required.is_empty() {
                "Start by placing the first component of your design on the canvas.".to_string()
            } else {
                format!(
                    "Start by placing the core components: {}.",
                    report.required.join(", ")
                )
            }
        }
        Situation::NoArrows => "Your components are not connected yet. Draw arrows to show how a request travels from the client through your system.".to_string(),
        Situation::Complete => "Every required component is in place. Check that each one is connected.".to_string(),
        Situation::MissingCritical | Situation::MissingOptional | Situation::StuckSame => report
            .missing
            .first()
            .map(|c| component_hint(c))
            .unwrap_or_default(),
    }
}

fn step_by_step_message(missing: &[String]) -> String {
    let steps: Vec<String> = missing
        .iter()
        .enumerate()
        .map(|(i, component)| format!("{}. Add a {}: {}", i + 1, component.replace('_', " "), component_hint(component)))
        .collect();

    format!("Let's go step by step.\n{}", steps.join("\n"))
}
