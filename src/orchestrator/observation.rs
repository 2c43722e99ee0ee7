//! Situation summary consumed by the decide stage
//!
//! Captured from a [`RoomState`] without side effects. Every hard guard is
//! evaluated against this snapshot, never against the live room.

use crate::game::room::secs_between;
use crate::game::{GameState, RoomState};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write;

/// One player's view in the summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSnapshot {
    pub player_id: String,
    pub node_count: usize,
    pub arrow_count: usize,
    pub deployed: Vec<String>,
    pub missing_required: Vec<String>,
    pub required_covered: usize,

    /// Share of required components deployed, 0.0..=1.0
    pub coverage: f64,

    /// Seconds since the design last changed
    pub idle_secs: f64,
    pub hint_count: usize,
    pub hint_level: u8,

    /// Seconds until the coach may target this player again
    pub coach_cooldown_remaining: f64,
}

impl PlayerSnapshot {
    /// Whether there is anything left to coach
    pub fn needs_help(&self) -> bool {
        self.node_count == 0
            || !self.missing_required.is_empty()
            || (self.node_count >= 2 && self.arrow_count == 0)
    }
}

/// Structured situation summary of one room
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub room_id: String,
    pub state: GameState,
    pub elapsed_secs: f64,
    pub mission_title: String,
    pub required: Vec<String>,
    pub players: Vec<PlayerSnapshot>,
    pub deployed_union: Vec<String>,
    pub chaos_fired: bool,

    /// The chaos agent's own warm-up and cooldown are satisfied
    pub chaos_ready: bool,
}

impl Observation {
    pub fn capture(
        room: &RoomState,
        now: DateTime<Utc>,
        coach_cooldown_secs: f64,
        chaos_ready: bool,
    ) -> Self {
        let elapsed_secs = room.round_elapsed_secs(now);
        let required = room.mission_required().to_vec();

        let players = room
            .players()
            .iter()
            .map(|player_id| {
                let design = room.design(player_id);
                let required_covered = room.required_covered(player_id);
                let node_count = design.map(|d| d.node_count).unwrap_or(0);
                let coverage = if required.is_empty() {
                    if node_count > 0 { 1.0 } else { 0.0 }
                } else {
                    required_covered as f64 / required.len() as f64
                };

                PlayerSnapshot {
                    player_id: player_id.clone(),
                    node_count,
                    arrow_count: design.map(|d| d.arrow_count).unwrap_or(0),
                    deployed: design
                        .map(|d| d.deployed_component_ids.clone())
                        .unwrap_or_default(),
                    missing_required: room.missing_required(player_id),
                    required_covered,
                    coverage,
                    idle_secs: room
                        .secs_since_activity(player_id, now)
                        .unwrap_or(elapsed_secs),
                    hint_count: room.hint_count(player_id),
                    hint_level: room.hints(player_id).map(|h| h.last_level()).unwrap_or(0),
                    coach_cooldown_remaining: room
                        .coach_triggered_at(player_id)
                        .map(|at| (coach_cooldown_secs - secs_between(now, at)).max(0.0))
                        .unwrap_or(0.0),
                }
            })
            .collect();

        Self {
            room_id: room.room_id.clone(),
            state: room.state(),
            elapsed_secs,
            mission_title: room.mission_title.clone(),
            required,
            players,
            deployed_union: room.deployed_union().into_iter().collect(),
            chaos_fired: room.chaos_fired(),
            chaos_ready,
        }
    }

    pub fn player(&self, player_id: &str) -> Option<&PlayerSnapshot> {
        self.players.iter().find(|p| p.player_id == player_id)
    }

    /// Textual form handed to the oracle
    pub fn summary(&self) -> String {
        let yes_no = |b: bool| if b { "yes" } else { "no" };

        let mut text = format!(
            "Room {} is {} with {:.0}s elapsed. Mission \"{}\" requires [{}].\n\
             Chaos fired this round: {}. Chaos agent ready: {}.\n",
            self.room_id,
            self.state,
            self.elapsed_secs,
            self.mission_title,
            self.required.join(", "),
            yes_no(self.chaos_fired),
            yes_no(self.chaos_ready)
        );

        for p in &self.players {
            let _ = writeln!(
                text,
                "- {}: {} nodes, {} arrows, missing [{}], idle {:.0}s, {} hints (level {}), coach cooldown {:.0}s",
                p.player_id,
                p.node_count,
                p.arrow_count,
                p.missing_required.join(", "),
                p.idle_secs,
                p.hint_count,
                p.hint_level,
                p.coach_cooldown_remaining
            );
        }
        text
    }
}
