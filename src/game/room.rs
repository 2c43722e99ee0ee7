//! Per-room mutable context
//!
//! One `RoomState` exists per active room. The round state itself is only
//! written through [`crate::game::GameStateMachine`]; everything else is
//! bookkeeping the Orchestrator folds agent results into.

use crate::game::GameState;
use crate::types::{distinct_components, CanvasArrow, CanvasNode, ChaosEvent, HintType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Maximum hints remembered per player (bounded storage guarantee)
pub const MAX_HINTS_PER_PLAYER: usize = 5;

/// Seats per room
pub const MAX_PLAYERS: usize = 2;

/// Seconds from `earlier` to `later`, clamped at zero
pub fn secs_between(later: DateTime<Utc>, earlier: DateTime<Utc>) -> f64 {
    let millis = (later - earlier).num_milliseconds();
    (millis.max(0) as f64) / 1000.0
}

/// Latest known design of one player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerDesign {
    pub node_count: usize,
    pub arrow_count: usize,
    pub deployed_component_ids: Vec<String>,
    pub last_updated: DateTime<Utc>,

    /// Last time the design actually changed (counts or component set)
    pub last_changed: DateTime<Utc>,
}

impl PlayerDesign {
    fn empty(now: DateTime<Utc>) -> Self {
        Self {
            node_count: 0,
            arrow_count: 0,
            deployed_component_ids: Vec::new(),
            last_updated: now,
            last_changed: now,
        }
    }

    pub fn has_component(&self, component: &str) -> bool {
        self.deployed_component_ids.iter().any(|c| c == component)
    }
}

/// One delivered hint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HintRecord {
    pub message: String,
    pub hint_type: HintType,
    pub level: u8,
    pub timestamp: DateTime<Utc>,
    pub missing_components: Vec<String>,

    /// Required components the player had deployed when the hint was given
    pub required_covered: usize,
}

/// Bounded, ordered hint log for one player
#[derive(Debug, Clone, Default)]
pub struct HintHistory {
    entries: VecDeque<HintRecord>,
}

impl HintHistory {
    /// Append, evicting the oldest entry once the cap is reached.
    ///
    /// The stored level never drops below the previous entry's level.
    fn push(&mut self, mut record: HintRecord) -> HintRecord {
        record.level = record.level.max(self.last_level());

        if self.entries.len() >= MAX_HINTS_PER_PLAYER {
            self.entries.pop_front();
        }
        self.entries.push_back(record.clone());
        record
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &HintRecord> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&HintRecord> {
        self.entries.back()
    }

    /// Level of the most recent hint, 0 when none was given
    pub fn last_level(&self) -> u8 {
        self.entries.back().map(|h| h.level).unwrap_or(0)
    }

    /// The last `n` hints, oldest first
    pub fn last_n(&self, n: usize) -> Vec<&HintRecord> {
        let start = self.entries.len().saturating_sub(n);
        self.entries.range(start..).collect()
    }
}

/// Mutable context of one game room
#[derive(Debug, Clone)]
pub struct RoomState {
    pub room_id: String,

    state: GameState,
    entered_at: DateTime<Utc>,

    pub round_number: u32,
    pub mission_title: String,
    round_started_at: Option<DateTime<Utc>>,
    mission_required: Vec<String>,

    players: Vec<String>,
    player_designs: BTreeMap<String, PlayerDesign>,
    hint_history: BTreeMap<String, HintHistory>,

    past_event_ids: BTreeSet<String>,
    coach_triggered_at: BTreeMap<String, DateTime<Utc>>,
    chaos_triggered_at: Option<DateTime<Utc>>,
    last_agent_call: Option<DateTime<Utc>>,
    active_incident: Option<ChaosEvent>,
}

impl RoomState {
    /// Create a room in `WAITING`
    pub fn new(room_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            room_id: room_id.into(),
            state: GameState::Waiting,
            entered_at: now,
            round_number: 0,
            mission_title: String::new(),
            round_started_at: None,
            mission_required: Vec::new(),
            players: Vec::new(),
            player_designs: BTreeMap::new(),
            hint_history: BTreeMap::new(),
            past_event_ids: BTreeSet::new(),
            coach_triggered_at: BTreeMap::new(),
            chaos_triggered_at: None,
            last_agent_call: None,
            active_incident: None,
        }
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn entered_at(&self) -> DateTime<Utc> {
        self.entered_at
    }

    /// Only the state machine writes the round state.
    pub(crate) fn apply_state(&mut self, target: GameState, now: DateTime<Utc>) {
        self.state = target;
        self.entered_at = now;
    }

    // ------------------------------------------------------------------
    // Round bookkeeping
    // ------------------------------------------------------------------

    /// Record the mission of a round that just entered `PLAYING`
    pub fn begin_round(&mut self, mission_title: impl Into<String>, required: &[String], now: DateTime<Utc>) {
        self.round_number += 1;
        self.mission_title = mission_title.into();
        self.round_started_at = Some(now);

        self.mission_required.clear();
        for component in required {
            let component = component.trim();
            if !component.is_empty() && !self.mission_required.iter().any(|c| c == component) {
                self.mission_required.push(component.to_string());
            }
        }
    }

    /// Clear per-round history, cooldowns and designs for the next round
    pub fn reset_for_next_round(&mut self) {
        self.round_started_at = None;
        self.mission_title.clear();
        self.mission_required.clear();
        self.player_designs.clear();
        self.hint_history.clear();
        self.past_event_ids.clear();
        self.coach_triggered_at.clear();
        self.chaos_triggered_at = None;
        self.last_agent_call = None;
        self.active_incident = None;
    }

    pub fn round_started_at(&self) -> Option<DateTime<Utc>> {
        self.round_started_at
    }

    /// Seconds since the round started, 0 if no round is running
    pub fn round_elapsed_secs(&self, now: DateTime<Utc>) -> f64 {
        self.round_started_at
            .map(|start| secs_between(now, start))
            .unwrap_or(0.0)
    }

    pub fn mission_required(&self) -> &[String] {
        &self.mission_required
    }

    // ------------------------------------------------------------------
    // Players and designs
    // ------------------------------------------------------------------

    /// Seat a player; `false` if the room is full
    pub fn join(&mut self, player_id: &str) -> bool {
        if self.players.iter().any(|p| p == player_id) {
            return true;
        }
        if self.players.len() >= MAX_PLAYERS {
            return false;
        }
        self.players.push(player_id.to_string());
        true
    }

    /// Remove a player and everything recorded for them
    pub fn leave(&mut self, player_id: &str) {
        self.players.retain(|p| p != player_id);
        self.player_designs.remove(player_id);
        self.hint_history.remove(player_id);
        self.coach_triggered_at.remove(player_id);
    }

    pub fn players(&self) -> &[String] {
        &self.players
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Replace a player's design snapshot; returns whether it changed
    pub fn update_design(
        &mut self,
        player_id: &str,
        nodes: &[CanvasNode],
        arrows: &[CanvasArrow],
        now: DateTime<Utc>,
    ) -> bool {
        let deployed = distinct_components(nodes);
        let design = self
            .player_designs
            .entry(player_id.to_string())
            .or_insert_with(|| PlayerDesign::empty(now));

        let changed = design.node_count != nodes.len()
            || design.arrow_count != arrows.len()
            || design.deployed_component_ids != deployed;

        design.node_count = nodes.len();
        design.arrow_count = arrows.len();
        design.deployed_component_ids = deployed;
        design.last_updated = now;
        if changed {
            design.last_changed = now;
        }
        changed
    }

    pub fn design(&self, player_id: &str) -> Option<&PlayerDesign> {
        self.player_designs.get(player_id)
    }

    pub fn designs(&self) -> impl Iterator<Item = (&String, &PlayerDesign)> {
        self.player_designs.iter()
    }

    /// Union of every player's deployed components
    pub fn deployed_union(&self) -> BTreeSet<String> {
        self.player_designs
            .values()
            .flat_map(|d| d.deployed_component_ids.iter().cloned())
            .collect()
    }

    /// Required components the player has not deployed, in mission order
    pub fn missing_required(&self, player_id: &str) -> Vec<String> {
        let design = self.player_designs.get(player_id);
        self.mission_required
            .iter()
            .filter(|c| design.map(|d| !d.has_component(c)).unwrap_or(true))
            .cloned()
            .collect()
    }

    /// Number of required components the player has deployed
    pub fn required_covered(&self, player_id: &str) -> usize {
        self.mission_required.len() - self.missing_required(player_id).len()
    }

    /// Seconds since the player's design last changed
    pub fn secs_since_activity(&self, player_id: &str, now: DateTime<Utc>) -> Option<f64> {
        self.player_designs
            .get(player_id)
            .map(|d| secs_between(now, d.last_changed))
    }

    // ------------------------------------------------------------------
    // Hints
    // ------------------------------------------------------------------

    /// Append a hint; returns the record as stored (level clamped)
    pub fn push_hint(&mut self, player_id: &str, record: HintRecord) -> HintRecord {
        self.hint_history
            .entry(player_id.to_string())
            .or_default()
            .push(record)
    }

    pub fn hints(&self, player_id: &str) -> Option<&HintHistory> {
        self.hint_history.get(player_id)
    }

    pub fn hint_count(&self, player_id: &str) -> usize {
        self.hints(player_id).map(|h| h.len()).unwrap_or(0)
    }

    pub fn coach_triggered_at(&self, player_id: &str) -> Option<DateTime<Utc>> {
        self.coach_triggered_at.get(player_id).copied()
    }

    pub fn mark_coach_triggered(&mut self, player_id: &str, now: DateTime<Utc>) {
        self.coach_triggered_at.insert(player_id.to_string(), now);
    }

    /// Most recent coach trigger for any player in the room
    pub fn last_coach_trigger(&self) -> Option<DateTime<Utc>> {
        self.coach_triggered_at.values().max().copied()
    }

    // ------------------------------------------------------------------
    // Chaos
    // ------------------------------------------------------------------

    pub fn past_event_ids(&self) -> &BTreeSet<String> {
        &self.past_event_ids
    }

    pub fn remember_event_id(&mut self, event_id: &str) {
        self.past_event_ids.insert(event_id.to_string());
    }

    pub fn chaos_triggered_at(&self) -> Option<DateTime<Utc>> {
        self.chaos_triggered_at
    }

    pub fn chaos_fired(&self) -> bool {
        self.chaos_triggered_at.is_some()
    }

    /// Set the chaos trigger time; refused once already set this round
    pub fn mark_chaos_fired(&mut self, now: DateTime<Utc>) -> bool {
        if self.chaos_triggered_at.is_some() {
            return false;
        }
        self.chaos_triggered_at = Some(now);
        true
    }

    pub fn active_incident(&self) -> Option<&ChaosEvent> {
        self.active_incident.as_ref()
    }

    pub fn set_active_incident(&mut self, event: Option<ChaosEvent>) {
        self.active_incident = event;
    }

    // ------------------------------------------------------------------
    // Orchestrator throttle
    // ------------------------------------------------------------------

    pub fn last_agent_call(&self) -> Option<DateTime<Utc>> {
        self.last_agent_call
    }

    pub fn mark_agent_call(&mut self, now: DateTime<Utc>) {
        self.last_agent_call = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quickcheck_macros::quickcheck;

    fn nodes(components: &[&str]) -> Vec<CanvasNode> {
        components
            .iter()
            .enumerate()
            .map(|(i, c)| CanvasNode::new(format!("n{i}"), *c))
            .collect()
    }

    fn hint(level: u8) -> HintRecord {
        HintRecord {
            message: "hint".to_string(),
            hint_type: HintType::MissingComponent,
            level,
            timestamp: Utc::now(),
            missing_components: vec![],
            required_covered: 0,
        }
    }

    #[test]
    fn test_missing_required_in_mission_order() {
        let now = Utc::now();
        let mut room = RoomState::new("r", now);
        room.begin_round(
            "Chat",
            &["server".to_string(), "database".to_string(), "cache".to_string()],
            now,
        );
        room.update_design("p1", &nodes(&["cache", "server"]), &[], now);

        assert_eq!(room.missing_required("p1"), vec!["database"]);
        assert_eq!(room.required_covered("p1"), 2);
        assert_eq!(room.missing_required("unknown").len(), 3);
    }

    #[test]
    fn test_begin_round_dedups_required() {
        let now = Utc::now();
        let mut room = RoomState::new("r", now);
        room.begin_round("m", &["a".to_string(), "a".to_string(), " ".to_string()], now);
        assert_eq!(room.mission_required(), ["a".to_string()]);
        assert_eq!(room.round_number, 1);
    }

    #[test]
    fn test_update_design_tracks_changes() {
        let start = Utc::now();
        let mut room = RoomState::new("r", start);
        assert!(room.update_design("p1", &nodes(&["server"]), &[], start));

        let later = start + Duration::seconds(12);
        assert!(!room.update_design("p1", &nodes(&["server"]), &[], later));
        let design = room.design("p1").unwrap();
        assert_eq!(design.last_updated, later);
        assert_eq!(design.last_changed, start);
        assert_eq!(room.secs_since_activity("p1", later), Some(12.0));
    }

    #[test]
    fn test_hint_history_capped() {
        let mut room = RoomState::new("r", Utc::now());
        for _ in 0..9 {
            room.push_hint("p1", hint(1));
        }
        assert_eq!(room.hint_count("p1"), MAX_HINTS_PER_PLAYER);
    }

    #[test]
    fn test_hint_level_clamped_non_decreasing() {
        let mut room = RoomState::new("r", Utc::now());
        room.push_hint("p1", hint(2));
        let stored = room.push_hint("p1", hint(1));
        assert_eq!(stored.level, 2);
    }

    #[test]
    fn test_chaos_fires_once_per_round() {
        let now = Utc::now();
        let mut room = RoomState::new("r", now);
        assert!(room.mark_chaos_fired(now));
        assert!(!room.mark_chaos_fired(now + Duration::seconds(1)));
        assert_eq!(room.chaos_triggered_at(), Some(now));

        room.reset_for_next_round();
        assert!(!room.chaos_fired());
    }

    #[test]
    fn test_reset_clears_round_bookkeeping() {
        let now = Utc::now();
        let mut room = RoomState::new("r", now);
        room.join("p1");
        room.begin_round("m", &["a".to_string()], now);
        room.update_design("p1", &nodes(&["a"]), &[], now);
        room.push_hint("p1", hint(3));
        room.remember_event_id("evt-1");
        room.mark_coach_triggered("p1", now);
        room.mark_agent_call(now);

        room.reset_for_next_round();

        assert!(room.past_event_ids().is_empty());
        assert_eq!(room.hint_count("p1"), 0);
        assert!(room.design("p1").is_none());
        assert!(room.coach_triggered_at("p1").is_none());
        assert!(room.last_agent_call().is_none());
        assert_eq!(room.players(), ["p1".to_string()]);
    }

    #[test]
    fn test_room_seats_two_players() {
        let mut room = RoomState::new("r", Utc::now());
        assert!(room.join("p1"));
        assert!(room.join("p2"));
        assert!(room.join("p1"));
        assert!(!room.join("p3"));
        room.leave("p1");
        room.leave("p2");
        assert!(room.is_empty());
    }

    #[quickcheck]
    fn prop_hint_history_bounded_and_monotonic(levels: Vec<u8>) -> bool {
        let mut room = RoomState::new("r", Utc::now());
        for level in levels {
            room.push_hint("p1", hint(level % 4));
        }

        let Some(history) = room.hints("p1") else {
            return true;
        };
        let stored: Vec<u8> = history.iter().map(|h| h.level).collect();
        history.len() <= MAX_HINTS_PER_PLAYER && stored.windows(2).all(|w| w[0] <= w[1])
    }
}
