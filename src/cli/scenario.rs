//! Scenario files for `archduel simulate`
//!
//! A scenario is a JSON array of inbound events, each stamped with the
//! number of seconds since the scenario started:
//!
//! ```json
//! [{"at_secs": 0, "event": {"type": "round_start", "room_id": "r1", ...}}]
//! ```

use crate::types::{CanvasArrow, CanvasNode, InboundEvent, PlayerResult};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Latest accepted offset, one week of simulated time
pub const MAX_OFFSET_SECS: f64 = 7.0 * 24.0 * 3600.0;

/// One inbound event at a scenario offset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedEvent {
    pub at_secs: f64,
    pub event: InboundEvent,
}

/// Ordered list of timed events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scenario {
    pub events: Vec<TimedEvent>,
}

impl Scenario {
    /// Load a scenario, sorted by offset
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        let mut scenario: Scenario = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse scenario {}", path.display()))?;

        for (index, timed) in scenario.events.iter().enumerate() {
            if !timed.at_secs.is_finite() || !(0.0..=MAX_OFFSET_SECS).contains(&timed.at_secs) {
                bail!(
                    "Scenario {} event {}: at_secs {} must be between 0 and {}",
                    path.display(),
                    index,
                    timed.at_secs,
                    MAX_OFFSET_SECS
                );
            }
        }

        scenario
            .events
            .sort_by(|a, b| a.at_secs.total_cmp(&b.at_secs));
        Ok(scenario)
    }

    /// Built-in round: a coach hint, a chaos event and a judged result
    pub fn demo(room_id: &str) -> Self {
        let room = room_id.to_string();
        let nodes = |components: &[&str]| -> Vec<CanvasNode> {
            components
                .iter()
                .enumerate()
                .map(|(i, c)| CanvasNode::new(format!("n{i}"), *c))
                .collect()
        };
        let chain = |len: usize| -> Vec<CanvasArrow> {
            (1..len)
                .map(|i| CanvasArrow {
                    source: format!("n{}", i - 1),
                    target: format!("n{i}"),
                })
                .collect()
        };

        let alice = ["client", "server"];
        let bob = ["client", "load_balancer", "server", "database"];
        let alice_final = ["client", "load_balancer", "server", "cache", "database"];

        let at = |at_secs: f64, event: InboundEvent| TimedEvent { at_secs, event };
        let update = |player: &str, components: &[&str]| InboundEvent::CanvasUpdate {
            room_id: room.clone(),
            player_id: player.to_string(),
            nodes: nodes(components),
            arrows: chain(components.len()),
        };

        Self {
            events: vec![
                at(
                    0.0,
                    InboundEvent::RoundStart {
                        room_id: room.clone(),
                        mission_title: "Design a URL shortener".to_string(),
                        required_components: ["client", "load_balancer", "server", "cache", "database"]
                            .iter()
                            .map(|c| c.to_string())
                            .collect(),
                    },
                ),
                at(2.0, update("alice", &alice)),
                at(4.0, update("bob", &bob)),
                at(20.0, update("alice", &alice)),
                at(30.0, update("bob", &bob)),
                at(60.0, InboundEvent::IncidentExpired { room_id: room.clone() }),
                at(
                    90.0,
                    InboundEvent::BothSubmitted {
                        room_id: room.clone(),
                        player1_result: PlayerResult {
                            player_id: "alice".to_string(),
                            nodes: nodes(&alice_final),
                            arrows: chain(alice_final.len()),
                            score: None,
                        },
                        player2_result: PlayerResult {
                            player_id: "bob".to_string(),
                            nodes: nodes(&bob),
                            arrows: chain(bob.len()),
                            score: None,
                        },
                    },
                ),
                at(95.0, InboundEvent::NextRound { room_id: room.clone() }),
            ],
        }
    }
}
