//! Orchestrator agent
//!
//! One pass per player update, always in order:
//! - observe: snapshot the room into an [`Observation`]
//! - decide: oracle or rule-based action list, bounded by hard guards
//! - dispatch: run the selected agents and fold their results into the room
//!
//! Passes for the same room are throttled; a throttled pass touches nothing.

pub mod observation;

pub use observation::{Observation, PlayerSnapshot};

use crate::agents::{AgentKind, ChaosAgent, CoachAgent};
use crate::config::{EngineConfig, OrchestratorConfig};
use crate::errors::OracleError;
use crate::game::room::secs_between;
use crate::game::{GameState, GameStateMachine, HintRecord, RoomState};
use crate::oracle::{self, OracleRequest, SharedOracle};
use crate::types::{CoachHint, OutboundEvent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Oracle purpose tag for orchestration decisions
pub const PURPOSE_DECIDE: &str = "orchestrator.decide";

/// One entry of the decide stage's ordered action list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub agent: AgentKind,
    #[serde(default)]
    pub target_player: Option<String>,
    #[serde(default)]
    pub reason: String,
}

impl Action {
    pub fn none(reason: impl Into<String>) -> Self {
        Self {
            agent: AgentKind::None,
            target_player: None,
            reason: reason.into(),
        }
    }

    pub fn coach(player_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            agent: AgentKind::Coach,
            target_player: Some(player_id.into()),
            reason: reason.into(),
        }
    }

    pub fn chaos(reason: impl Into<String>) -> Self {
        Self {
            agent: AgentKind::Chaos,
            target_player: None,
            reason: reason.into(),
        }
    }
}

/// Why a selected action produced nothing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("guard violation: {0}")]
    GuardViolation(String),

    #[error("transition {from} -> {to} rejected")]
    TransitionRejected { from: GameState, to: GameState },

    #[error("result discarded: {0}")]
    Discarded(String),
}

#[derive(Debug, Deserialize)]
struct DecisionReply {
    #[serde(default)]
    actions: Vec<Action>,
}

/// Decides which sub-agents run for each player update
pub struct OrchestratorAgent {
    config: OrchestratorConfig,
    oracle: SharedOracle,
    coach: CoachAgent,
    chaos: ChaosAgent,
    timeout: Duration,
}

impl OrchestratorAgent {
    pub fn new(config: &EngineConfig, oracle: SharedOracle) -> Self {
        let timeout = config.oracle.timeout();

        Self {
            config: config.orchestrator.clone(),
            coach: CoachAgent::new(config.coach.clone(), oracle.clone()).with_timeout(timeout),
            chaos: ChaosAgent::new(config.chaos.clone(), oracle.clone()).with_timeout(timeout),
            oracle,
            timeout,
        }
    }

    /// Full pipeline for one update from `trigger_player`
    pub async fn run(
        &self,
        room: &mut RoomState,
        trigger_player: &str,
        now: DateTime<Utc>,
    ) -> Vec<OutboundEvent> {
        if let Some(last) = room.last_agent_call() {
            let since = secs_between(now, last);
            if since < self.config.cooldown_secs {
                debug!(room_id = %room.room_id, since, "orchestration throttled");
                return Vec::new();
            }
        }
        room.mark_agent_call(now);

        let observation = self.observe(room, now);
        let actions = self.decide(&observation, trigger_player).await;
        self.dispatch(room, &actions, now).await
    }

    /// Snapshot the room; no side effects
    pub fn observe(&self, room: &RoomState, now: DateTime<Utc>) -> Observation {
        Observation::capture(
            room,
            now,
            self.config.coach_cooldown_secs,
            self.chaos.is_ready(room, now),
        )
    }

    /// Ordered action list, never empty
    pub async fn decide(&self, observation: &Observation, trigger_player: &str) -> Vec<Action> {
        if let Some(reason) = self.round_guard(observation) {
            return vec![Action::none(reason)];
        }

        let proposed = match self.consult(observation, trigger_player).await {
            Ok(actions) => {
                debug!(room_id = %observation.room_id, count = actions.len(), "oracle proposed actions");
                actions
            }
            Err(_) => self.rule_based(observation, trigger_player),
        };

        self.apply_guards(proposed, observation)
    }

    /// Deterministic decision with the same guard semantics as the oracle path
    pub fn rule_based(&self, observation: &Observation, trigger_player: &str) -> Vec<Action> {
        let mut actions = Vec::new();

        if let Some(player) = observation.player(trigger_player) {
            if player.needs_help()
                && player.idle_secs >= self.config.stuck_after_secs
                && player.coach_cooldown_remaining <= 0.0
            {
                actions.push(Action::coach(
                    &player.player_id,
                    format!("design static for {:.0}s", player.idle_secs),
                ));
            }
        }

        let covered = observation
            .players
            .iter()
            .any(|p| p.coverage >= self.config.chaos_min_coverage);
        if covered
            && !observation.chaos_fired
            && observation.chaos_ready
            && observation.elapsed_secs >= self.config.chaos_min_round_age_secs
            && !observation.deployed_union.is_empty()
        {
            actions.push(Action::chaos("coverage and cooldown conditions met"));
        }

        actions
    }

    /// Drop every action a hard guard forbids; guards only veto
    pub fn apply_guards(&self, proposed: Vec<Action>, observation: &Observation) -> Vec<Action> {
        if let Some(reason) = self.round_guard(observation) {
            return vec![Action::none(reason)];
        }

        let mut accepted: Vec<Action> = Vec::new();
        let mut coached: BTreeSet<String> = BTreeSet::new();

        for action in proposed {
            let violation = match action.agent {
                AgentKind::None => continue,
                AgentKind::Chaos => self.chaos_violation(observation, &accepted),
                AgentKind::Coach => self.coach_violation(observation, &action, &coached),
            };

            if let Some(reason) = violation {
                info!(
                    room_id = %observation.room_id,
                    agent = %action.agent,
                    reason = %reason,
                    "guard violation dropped"
                );
                continue;
            }

            if let Some(player) = &action.target_player {
                if action.agent == AgentKind::Coach {
                    coached.insert(player.clone());
                }
            }
            accepted.push(action);
        }

        if accepted.is_empty() {
            accepted.push(Action::none("no eligible action"));
        }
        accepted
    }

    /// Run each action and fold its result into the room.
    ///
    /// Actions are independent: a failure is reported as `agent_failed` and
    /// never prevents the next action from running.
    pub async fn dispatch(
        &self,
        room: &mut RoomState,
        actions: &[Action],
        now: DateTime<Utc>,
    ) -> Vec<OutboundEvent> {
        let mut events = Vec::new();

        for action in actions {
            let result = match action.agent {
                AgentKind::None => continue,
                AgentKind::Coach => match action.target_player.as_deref() {
                    Some(player_id) => self.dispatch_coach(room, player_id, now).await,
                    None => Err(DispatchError::GuardViolation("coach action without target".to_string())),
                },
                AgentKind::Chaos => self.dispatch_chaos(room, now).await,
            };

            match result {
                Ok(mut produced) => events.append(&mut produced),
                Err(err) => {
                    warn!(room_id = %room.room_id, agent = %action.agent, error = %err, "dispatch step failed");
                    events.push(OutboundEvent::AgentFailed {
                        room_id: room.room_id.clone(),
                        agent: action.agent.to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        events
    }

    async fn dispatch_coach(
        &self,
        room: &mut RoomState,
        player_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<OutboundEvent>, DispatchError> {
        if !room.players().iter().any(|p| p == player_id) {
            return Err(DispatchError::GuardViolation(format!("unknown player {player_id}")));
        }

        let outcome = self.coach.run(room, player_id).await;
        let Some(hint) = outcome.hint else {
            return Ok(Vec::new());
        };

        if !room.state().is_round_active() {
            return Err(DispatchError::Discarded(format!("room is {}", room.state())));
        }

        let stored = room.push_hint(
            player_id,
            HintRecord {
                message: hint.message,
                hint_type: hint.hint_type,
                level: hint.level,
                timestamp: now,
                missing_components: hint.missing_components,
                required_covered: outcome.report.required_covered,
            },
        );
        room.mark_coach_triggered(player_id, now);
        info!(room_id = %room.room_id, player_id, level = stored.level, "coach hint delivered");

        Ok(vec![OutboundEvent::CoachHint {
            target_player_id: player_id.to_string(),
            hint: CoachHint {
                message: stored.message,
                missing_components: stored.missing_components,
                hint_type: stored.hint_type,
                level: stored.level,
            },
        }])
    }

    async fn dispatch_chaos(
        &self,
        room: &mut RoomState,
        now: DateTime<Utc>,
    ) -> Result<Vec<OutboundEvent>, DispatchError> {
        if room.chaos_fired() {
            return Err(DispatchError::GuardViolation("chaos already fired this round".to_string()));
        }
        let from = room.state();
        if !from.can_transition_to(GameState::InBasket) {
            return Err(DispatchError::TransitionRejected {
                from,
                to: GameState::InBasket,
            });
        }

        let outcome = self.chaos.run(room).await;

        if GameStateMachine::try_transition(room, GameState::InBasket, now).is_err() {
            return Err(DispatchError::TransitionRejected {
                from: room.state(),
                to: GameState::InBasket,
            });
        }
        room.mark_chaos_fired(now);
        room.remember_event_id(&outcome.event.event_id);
        room.set_active_incident(Some(outcome.event.clone()));
        info!(
            room_id = %room.room_id,
            event_id = %outcome.event.event_id,
            source = ?outcome.source,
            retries = outcome.retry_count,
            "chaos event fired"
        );

        Ok(vec![
            OutboundEvent::StateChanged {
                room_id: room.room_id.clone(),
                state: GameState::InBasket,
            },
            OutboundEvent::ChaosEvent {
                room_id: room.room_id.clone(),
                event: outcome.event,
            },
        ])
    }

    async fn consult(
        &self,
        observation: &Observation,
        trigger_player: &str,
    ) -> Result<Vec<Action>, OracleError> {
        let system = format!(
            "You orchestrate helper agents in a two-player system design game. \
             Choose which agents to run now. \"coach\" sends a hint to one player who seems stuck; \
             do not coach a player whose coach cooldown is above 0s. \"chaos\" injects one failure \
             scenario per round into a design that is mostly complete. Choose \"none\" when nothing \
             is needed. Reply with JSON: {{\"actions\": [{{\"agent\": \"coach\"|\"chaos\"|\"none\", \
             \"target_player\": string|null, \"reason\": string}}]}}. Rounds younger than {:.0}s never get chaos.",
            self.config.chaos_min_round_age_secs
        );
        let user = format!("{}\nUpdate from: {}", observation.summary(), trigger_player);

        let request = OracleRequest::new(PURPOSE_DECIDE, system, user).with_timeout(self.timeout);
        let reply: DecisionReply = oracle::consult(&self.oracle, &request).await?;
        Ok(reply.actions)
    }

    fn round_guard(&self, observation: &Observation) -> Option<String> {
        if observation.state != GameState::Playing {
            return Some(format!("room is {}", observation.state));
        }
        if observation.elapsed_secs < self.config.min_round_age_secs {
            return Some(format!("round is only {:.0}s old", observation.elapsed_secs));
        }
        None
    }

    fn chaos_violation(&self, observation: &Observation, accepted: &[Action]) -> Option<String> {
        if accepted.iter().any(|a| a.agent == AgentKind::Chaos) {
            return Some("chaos already selected".to_string());
        }
        if observation.chaos_fired {
            return Some("chaos already fired this round".to_string());
        }
        if observation.elapsed_secs < self.config.chaos_min_round_age_secs {
            return Some(format!("round is only {:.0}s old", observation.elapsed_secs));
        }
        if !observation.chaos_ready {
            return Some("chaos agent is cooling down".to_string());
        }
        if observation.deployed_union.is_empty() {
            return Some("no deployed components".to_string());
        }
        None
    }

    fn coach_violation(
        &self,
        observation: &Observation,
        action: &Action,
        coached: &BTreeSet<String>,
    ) -> Option<String> {
        let Some(target) = action.target_player.as_deref() else {
            return Some("coach action without target".to_string());
        };
        let Some(player) = observation.player(target) else {
            return Some(format!("unknown player {target}"));
        };
        if coached.contains(target) {
            return Some(format!("{target} already selected"));
        }
        if player.coach_cooldown_remaining > 0.0 {
            return Some(format!(
                "{target} coach cooldown has {:.0}s left",
                player.coach_cooldown_remaining
            ));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::ScriptedOracle;
    use crate::types::{CanvasArrow, CanvasNode};
    use chrono::Duration as ChronoDuration;
    use quickcheck_macros::quickcheck;
    use std::sync::Arc;

    fn at(t0: DateTime<Utc>, secs: i64) -> DateTime<Utc> {
        t0 + ChronoDuration::seconds(secs)
    }

    fn nodes(components: &[&str]) -> Vec<CanvasNode> {
        components
            .iter()
            .enumerate()
            .map(|(i, c)| CanvasNode::new(i.to_string(), *c))
            .collect()
    }

    fn arrow() -> Vec<CanvasArrow> {
        vec![CanvasArrow {
            source: "0".to_string(),
            target: "1".to_string(),
        }]
    }

    /// Playing room with alice (server only) and bob (server + database)
    fn playing_room(t0: DateTime<Utc>) -> RoomState {
        let mut room = RoomState::new("r1", t0);
        assert!(GameStateMachine::transition(&mut room, GameState::Playing, t0));
        room.begin_round(
            "Photo sharing",
            &["server".to_string(), "database".to_string()],
            t0,
        );
        room.join("alice");
        room.join("bob");
        room.update_design("alice", &nodes(&["server"]), &[], at(t0, 1));
        room.update_design("bob", &nodes(&["server", "database"]), &arrow(), at(t0, 1));
        room
    }

    fn orchestrator(oracle: SharedOracle) -> OrchestratorAgent {
        OrchestratorAgent::new(&EngineConfig::default(), oracle)
    }

    fn observation(elapsed_secs: f64) -> Observation {
        Observation {
            room_id: "r1".to_string(),
            state: GameState::Playing,
            elapsed_secs,
            mission_title: "Photo sharing".to_string(),
            required: vec!["server".to_string()],
            players: vec![PlayerSnapshot {
                player_id: "alice".to_string(),
                node_count: 1,
                arrow_count: 0,
                deployed: vec!["server".to_string()],
                missing_required: Vec::new(),
                required_covered: 1,
                coverage: 1.0,
                idle_secs: 30.0,
                hint_count: 0,
                hint_level: 0,
                coach_cooldown_remaining: 0.0,
            }],
            deployed_union: vec!["server".to_string()],
            chaos_fired: false,
            chaos_ready: true,
        }
    }

    #[quickcheck]
    fn prop_no_chaos_before_25s(tenths: u16, kinds: Vec<u8>) -> bool {
        let obs = observation((tenths % 250) as f64 / 10.0);
        let proposed = kinds
            .iter()
            .map(|k| match k % 3 {
                0 => Action::chaos("oracle"),
                1 => Action::coach("alice", "oracle"),
                _ => Action::none("oracle"),
            })
            .collect();

        orchestrator(None)
            .apply_guards(proposed, &obs)
            .iter()
            .all(|a| a.agent != AgentKind::Chaos)
    }

    #[test]
    fn test_round_guard_blocks_everything() {
        let orch = orchestrator(None);

        let young = orch.apply_guards(vec![Action::coach("alice", "x")], &observation(5.0));
        assert_eq!(young.len(), 1);
        assert_eq!(young[0].agent, AgentKind::None);

        let mut judging = observation(60.0);
        judging.state = GameState::Judging;
        let actions = orch.apply_guards(vec![Action::chaos("x")], &judging);
        assert_eq!(actions[0].agent, AgentKind::None);
    }

    #[test]
    fn test_guards_drop_duplicates_and_unknown_players() {
        let actions = orchestrator(None).apply_guards(
            vec![
                Action::chaos("a"),
                Action::chaos("b"),
                Action::coach("alice", "a"),
                Action::coach("alice", "b"),
                Action::coach("mallory", "c"),
            ],
            &observation(40.0),
        );
        let kinds: Vec<AgentKind> = actions.iter().map(|a| a.agent).collect();
        assert_eq!(kinds, vec![AgentKind::Chaos, AgentKind::Coach]);
    }

    #[test]
    fn test_guards_respect_chaos_readiness_and_cooldown() {
        let orch = orchestrator(None);

        let mut fired = observation(40.0);
        fired.chaos_fired = true;
        assert_eq!(orch.apply_guards(vec![Action::chaos("x")], &fired)[0].agent, AgentKind::None);

        let mut cooling = observation(40.0);
        cooling.chaos_ready = false;
        cooling.players[0].coach_cooldown_remaining = 5.0;
        let actions = orch.apply_guards(vec![Action::chaos("x"), Action::coach("alice", "y")], &cooling);
        assert_eq!(actions, vec![Action::none("no eligible action")]);
    }

    #[test]
    fn test_rule_based_coaches_static_player() {
        let t0 = Utc::now();
        let room = playing_room(t0);
        let orch = orchestrator(None);

        let obs = orch.observe(&room, at(t0, 20));
        let actions = orch.rule_based(&obs, "alice");
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].agent, AgentKind::Coach);
        assert_eq!(actions[0].target_player.as_deref(), Some("alice"));

        // bob covers everything and is wired up
        assert!(orch.rule_based(&obs, "bob").is_empty());
    }

    #[test]
    fn test_rule_based_chaos_after_warmup() {
        let t0 = Utc::now();
        let room = playing_room(t0);
        let orch = orchestrator(None);

        let obs = orch.observe(&room, at(t0, 30));
        let actions = orch.rule_based(&obs, "bob");
        assert_eq!(actions, vec![Action::chaos("coverage and cooldown conditions met")]);
    }

    #[tokio::test]
    async fn test_oracle_chaos_before_25s_dropped() {
        let t0 = Utc::now();
        let room = playing_room(t0);
        let oracle = Arc::new(ScriptedOracle::new().reply(
            PURPOSE_DECIDE,
            r#"{"actions": [{"agent": "chaos", "reason": "now"}, {"agent": "coach", "target_player": "alice", "reason": "stuck"}]}"#,
        ));
        let orch = orchestrator(Some(oracle.clone()));

        let obs = orch.observe(&room, at(t0, 15));
        let actions = orch.decide(&obs, "alice").await;
        assert_eq!(actions, vec![Action::coach("alice", "stuck")]);
        assert_eq!(oracle.calls(PURPOSE_DECIDE), 1);
    }

    #[tokio::test]
    async fn test_decide_skips_oracle_for_young_round() {
        let t0 = Utc::now();
        let room = playing_room(t0);
        let oracle = Arc::new(ScriptedOracle::new());
        let orch = orchestrator(Some(oracle.clone()));

        let actions = orch.decide(&orch.observe(&room, at(t0, 5)), "alice").await;
        assert_eq!(actions[0].agent, AgentKind::None);
        assert_eq!(oracle.calls(PURPOSE_DECIDE), 0);
    }

    #[tokio::test]
    async fn test_run_dispatches_coach_hint() {
        let t0 = Utc::now();
        let mut room = playing_room(t0);
        let orch = orchestrator(None);

        let events = orch.run(&mut room, "alice", at(t0, 20)).await;
        assert_eq!(events.len(), 1);
        match &events[0] {
            OutboundEvent::CoachHint { target_player_id, hint } => {
                assert_eq!(target_player_id, "alice");
                assert_eq!(hint.missing_components, vec!["database"]);
                assert_eq!(hint.level, 1);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(room.hint_count("alice"), 1);
        assert_eq!(room.coach_triggered_at("alice"), Some(at(t0, 20)));
    }

    #[tokio::test]
    async fn test_throttled_pass_is_noop() {
        let t0 = Utc::now();
        let mut room = playing_room(t0);
        let oracle = Arc::new(ScriptedOracle::new());
        let orch = orchestrator(Some(oracle.clone()));

        orch.run(&mut room, "alice", at(t0, 20)).await;
        let before = format!("{:?}", room);
        let calls = oracle.requests().len();

        let events = orch.run(&mut room, "bob", at(t0, 22)).await;
        assert!(events.is_empty());
        assert_eq!(format!("{:?}", room), before);
        assert_eq!(oracle.requests().len(), calls);
    }

    #[tokio::test]
    async fn test_chaos_dispatch_enters_in_basket() {
        let t0 = Utc::now();
        let mut room = playing_room(t0);
        let orch = orchestrator(None);

        let events = orch.dispatch(&mut room, &[Action::chaos("test")], at(t0, 30)).await;
        assert_eq!(room.state(), GameState::InBasket);
        assert!(room.chaos_fired());
        assert_eq!(room.past_event_ids().len(), 1);
        assert!(room.active_incident().is_some());
        assert!(matches!(events[0], OutboundEvent::StateChanged { state: GameState::InBasket, .. }));
        assert!(matches!(events[1], OutboundEvent::ChaosEvent { .. }));
    }

    #[tokio::test]
    async fn test_partial_failure_reported_independently() {
        let t0 = Utc::now();
        let mut room = playing_room(t0);
        room.mark_chaos_fired(at(t0, 2));
        let orch = orchestrator(None);

        let events = orch
            .dispatch(
                &mut room,
                &[Action::chaos("again"), Action::coach("alice", "stuck")],
                at(t0, 40),
            )
            .await;

        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], OutboundEvent::AgentFailed { agent, .. } if agent == "chaos"));
        assert!(matches!(events[1], OutboundEvent::CoachHint { .. }));
        assert_eq!(room.state(), GameState::Playing);
    }

    #[tokio::test]
    async fn test_chaos_transition_rejected_leaves_room_untouched() {
        let t0 = Utc::now();
        let mut room = RoomState::new("r1", t0);
        room.join("alice");
        room.update_design("alice", &nodes(&["server"]), &[], t0);
        let orch = orchestrator(None);

        let events = orch.dispatch(&mut room, &[Action::chaos("x")], at(t0, 40)).await;
        assert!(matches!(&events[0], OutboundEvent::AgentFailed { reason, .. } if reason.contains("rejected")));
        assert_eq!(room.state(), GameState::Waiting);
        assert!(!room.chaos_fired());
        assert!(room.past_event_ids().is_empty());
    }
}
