//! Event payloads exchanged with the Dispatcher
//!
//! Inbound events arrive from the real-time transport; outbound events are
//! handed back to it for delivery. Framing is the transport's concern.

use crate::game::GameState;
use serde::{Deserialize, Serialize};

/// A component placed on a player's canvas
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasNode {
    pub id: String,

    /// Design-component identifier (e.g. `load_balancer`)
    #[serde(alias = "type")]
    pub component: String,
}

impl CanvasNode {
    pub fn new(id: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            component: component.into(),
        }
    }
}

/// A connection between two canvas nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasArrow {
    pub source: String,
    pub target: String,
}

/// Distinct component identifiers in first-seen order
pub fn distinct_components(nodes: &[CanvasNode]) -> Vec<String> {
    let mut seen = Vec::new();
    for node in nodes {
        let component = node.component.trim();
        if !component.is_empty() && !seen.iter().any(|c: &String| c == component) {
            seen.push(component.to_string());
        }
    }
    seen
}

/// Category of a coach hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintType {
    GettingStarted,
    MissingComponent,
    Connection,
    Encouragement,
}

/// Hint delivered to one player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachHint {
    pub message: String,
    pub missing_components: Vec<String>,
    #[serde(rename = "type")]
    pub hint_type: HintType,
    pub level: u8,
}

/// Incident severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Simulated failure injected into a round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaosEvent {
    pub event_id: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub target_components: Vec<String>,
    pub hint: String,
}

/// One player's submitted design
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerResult {
    pub player_id: String,
    #[serde(default)]
    pub nodes: Vec<CanvasNode>,
    #[serde(default)]
    pub arrows: Vec<CanvasArrow>,

    /// Rubric score computed by the surrounding system, if any
    #[serde(default)]
    pub score: Option<f64>,
}

impl PlayerResult {
    pub fn deployed_components(&self) -> Vec<String> {
        distinct_components(&self.nodes)
    }
}

/// Evaluation of one side of the comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerVerdict {
    pub analysis: String,
    pub versus: String,
}

/// Structured comparison of both designs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
    pub player1: PlayerVerdict,
    pub player2: PlayerVerdict,
}

/// Coverage summary attached to a round result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageSummary {
    pub player_id: String,
    pub deployed: Vec<String>,
    pub missing_required: Vec<String>,
    pub arrow_count: usize,
    pub score: Option<f64>,
}

/// Final result of a round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundResult {
    pub comparison: Comparison,
    pub coverage: Vec<CoverageSummary>,
    pub revisions: u8,
    pub templated: bool,
}

/// Events delivered by the Dispatcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    CanvasUpdate {
        room_id: String,
        player_id: String,
        #[serde(default)]
        nodes: Vec<CanvasNode>,
        #[serde(default)]
        arrows: Vec<CanvasArrow>,
    },
    RoundStart {
        room_id: String,
        mission_title: String,
        required_components: Vec<String>,
    },
    BothSubmitted {
        room_id: String,
        player1_result: PlayerResult,
        player2_result: PlayerResult,
    },
    IncidentExpired {
        room_id: String,
    },
    NextRound {
        room_id: String,
    },
    PlayerLeft {
        room_id: String,
        player_id: String,
    },
}

impl InboundEvent {
    pub fn room_id(&self) -> &str {
        match self {
            InboundEvent::CanvasUpdate { room_id, .. }
            | InboundEvent::RoundStart { room_id, .. }
            | InboundEvent::BothSubmitted { room_id, .. }
            | InboundEvent::IncidentExpired { room_id }
            | InboundEvent::NextRound { room_id }
            | InboundEvent::PlayerLeft { room_id, .. } => room_id,
        }
    }
}

/// Events handed back to the Dispatcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    CoachHint {
        target_player_id: String,
        hint: CoachHint,
    },
    ChaosEvent {
        room_id: String,
        event: ChaosEvent,
    },
    RoundResult {
        room_id: String,
        result: RoundResult,
    },
    StateChanged {
        room_id: String,
        state: GameState,
    },
    AgentFailed {
        room_id: String,
        agent: String,
        reason: String,
    },
}
