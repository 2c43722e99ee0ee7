//! Game engine
//!
//! Entry point for the Dispatcher. Routes each inbound event to its room,
//! drives the state machine and the orchestrator, and returns the outbound
//! events to deliver. Rooms are handled independently; within a room the
//! room lock serializes events.

use crate::agents::{EvalAgent, EvalContext, ScoringRubric};
use crate::config::EngineConfig;
use crate::errors::{GameError, Result};
use crate::game::{GameState, GameStateMachine, RoomHandle, RoomRegistry, RoomState};
use crate::oracle::{LanguageModelOracle, OllamaOracle, SharedOracle};
use crate::orchestrator::{DispatchError, OrchestratorAgent};
use crate::types::{
    CanvasArrow, CanvasNode, CoverageSummary, InboundEvent, OutboundEvent, PlayerResult,
    RoundResult,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Dispatcher-facing engine owning every room
pub struct GameEngine {
    registry: RoomRegistry,
    orchestrator: OrchestratorAgent,
    eval: EvalAgent,
}

impl GameEngine {
    /// Build the engine, connecting to Ollama when the oracle is enabled
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let oracle: SharedOracle = if config.oracle.enabled {
            let ollama = OllamaOracle::with_config(&config.oracle.base_url, &config.oracle.model)?;
            info!(model = ollama.model(), url = ollama.base_url(), "oracle enabled");
            Some(Arc::new(ollama) as Arc<dyn LanguageModelOracle>)
        } else {
            info!("oracle disabled, running on deterministic fallbacks");
            None
        };

        Ok(Self::with_oracle(config, oracle))
    }

    /// Build the engine around an explicit oracle (or none)
    pub fn with_oracle(config: EngineConfig, oracle: SharedOracle) -> Self {
        let eval = EvalAgent::new(config.eval.clone(), oracle.clone(), ScoringRubric::default())
            .with_timeout(config.oracle.timeout());

        Self {
            registry: RoomRegistry::new(),
            orchestrator: OrchestratorAgent::new(&config, oracle),
            eval,
        }
    }

    pub fn with_rubric(mut self, rubric: ScoringRubric) -> Self {
        self.eval = self.eval.with_rubric(rubric);
        self
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Copy of a room's current state
    pub async fn snapshot(&self, room_id: &str) -> Result<RoomState> {
        let handle = self
            .registry
            .get(room_id)
            .ok_or_else(|| GameError::RoomNotFound(room_id.to_string()))?;
        let room = handle.lock().await;
        Ok(room.clone())
    }

    /// Handle one event at the current time
    pub async fn handle(&self, event: InboundEvent) -> Vec<OutboundEvent> {
        self.handle_at(event, Utc::now()).await
    }

    /// Handle one event at `now`
    pub async fn handle_at(&self, event: InboundEvent, now: DateTime<Utc>) -> Vec<OutboundEvent> {
        debug!(room_id = event.room_id(), "inbound event");

        match event {
            InboundEvent::RoundStart {
                room_id,
                mission_title,
                required_components,
            } => self.round_start(&room_id, mission_title, &required_components, now).await,
            InboundEvent::CanvasUpdate {
                room_id,
                player_id,
                nodes,
                arrows,
            } => self.canvas_update(&room_id, &player_id, &nodes, &arrows, now).await,
            InboundEvent::BothSubmitted {
                room_id,
                player1_result,
                player2_result,
            } => self.both_submitted(&room_id, player1_result, player2_result, now).await,
            InboundEvent::IncidentExpired { room_id } => self.incident_expired(&room_id, now).await,
            InboundEvent::NextRound { room_id } => self.next_round(&room_id, now).await,
            InboundEvent::PlayerLeft { room_id, player_id } => self.player_left(&room_id, &player_id).await,
        }
    }

    async fn round_start(
        &self,
        room_id: &str,
        mission_title: String,
        required: &[String],
        now: DateTime<Utc>,
    ) -> Vec<OutboundEvent> {
        let handle = self.registry.get_or_create(room_id, now);
        let mut room = handle.lock().await;

        // PLAYING is also reachable from IN_BASKET, which only incident expiry may take
        if room.state() != GameState::Waiting {
            debug!(room_id, state = %room.state(), "round start outside waiting ignored");
            return Vec::new();
        }
        if !GameStateMachine::transition(&mut room, GameState::Playing, now) {
            return Vec::new();
        }
        room.begin_round(mission_title, required, now);
        info!(
            room_id,
            round = room.round_number,
            mission = %room.mission_title,
            required = room.mission_required().len(),
            "round started"
        );

        vec![state_changed(&room)]
    }

    async fn canvas_update(
        &self,
        room_id: &str,
        player_id: &str,
        nodes: &[CanvasNode],
        arrows: &[CanvasArrow],
        now: DateTime<Utc>,
    ) -> Vec<OutboundEvent> {
        let Some(handle) = self.room(room_id) else {
            return Vec::new();
        };
        let mut room = handle.lock().await;

        if !room.state().is_round_active() {
            debug!(room_id, player_id, state = %room.state(), "canvas update outside an active round");
            return Vec::new();
        }
        if !room.join(player_id) {
            warn!(room_id, player_id, "room is full, update ignored");
            return Vec::new();
        }
        room.update_design(player_id, nodes, arrows, now);

        self.orchestrator.run(&mut room, player_id, now).await
    }

    async fn both_submitted(
        &self,
        room_id: &str,
        player1: PlayerResult,
        player2: PlayerResult,
        now: DateTime<Utc>,
    ) -> Vec<OutboundEvent> {
        let Some(handle) = self.room(room_id) else {
            return Vec::new();
        };

        let ctx = {
            let mut room = handle.lock().await;
            if !GameStateMachine::transition(&mut room, GameState::Judging, now) {
                return Vec::new();
            }
            room.set_active_incident(None);

            EvalContext {
                mission_title: room.mission_title.clone(),
                required: room.mission_required().to_vec(),
                player1,
                player2,
            }
        };
        let mut events = vec![OutboundEvent::StateChanged {
            room_id: room_id.to_string(),
            state: GameState::Judging,
        }];

        // The room lock is released while the evaluation talks to the oracle.
        let outcome = self.eval.run(&ctx).await;

        let mut room = handle.lock().await;
        if room.state() != GameState::Judging {
            info!(room_id, state = %room.state(), "room left judging, evaluation discarded");
            events.push(OutboundEvent::AgentFailed {
                room_id: room_id.to_string(),
                agent: "eval".to_string(),
                reason: DispatchError::Discarded(format!("room is {}", room.state())).to_string(),
            });
            return events;
        }
        if !GameStateMachine::transition(&mut room, GameState::Finished, now) {
            return events;
        }
        info!(
            room_id,
            revisions = outcome.revisions,
            templated = outcome.templated,
            "round judged"
        );

        events.push(state_changed(&room));
        events.push(OutboundEvent::RoundResult {
            room_id: room_id.to_string(),
            result: RoundResult {
                coverage: vec![coverage(&ctx, &ctx.player1), coverage(&ctx, &ctx.player2)],
                comparison: outcome.comparison,
                revisions: outcome.revisions,
                templated: outcome.templated,
            },
        });
        events
    }

    async fn incident_expired(&self, room_id: &str, now: DateTime<Utc>) -> Vec<OutboundEvent> {
        let Some(handle) = self.room(room_id) else {
            return Vec::new();
        };
        let mut room = handle.lock().await;

        if room.state() != GameState::InBasket {
            debug!(room_id, state = %room.state(), "incident expiry without an incident ignored");
            return Vec::new();
        }
        if !GameStateMachine::transition(&mut room, GameState::Playing, now) {
            return Vec::new();
        }
        room.set_active_incident(None);
        vec![state_changed(&room)]
    }

    async fn next_round(&self, room_id: &str, now: DateTime<Utc>) -> Vec<OutboundEvent> {
        let Some(handle) = self.room(room_id) else {
            return Vec::new();
        };
        let (events, empty) = {
            let mut room = handle.lock().await;
            if !GameStateMachine::transition(&mut room, GameState::Waiting, now) {
                return Vec::new();
            }
            room.reset_for_next_round();
            (vec![state_changed(&room)], room.is_empty())
        };

        if empty {
            self.registry.remove(room_id);
            info!(room_id, "room back to waiting with no players, discarded");
        }
        events
    }

    async fn player_left(&self, room_id: &str, player_id: &str) -> Vec<OutboundEvent> {
        let Some(handle) = self.room(room_id) else {
            return Vec::new();
        };

        let empty = {
            let mut room = handle.lock().await;
            room.leave(player_id);
            room.is_empty()
        };
        if empty {
            self.registry.remove(room_id);
            info!(room_id, "last player left, room discarded");
        }
        Vec::new()
    }

    fn room(&self, room_id: &str) -> Option<RoomHandle> {
        let room = self.registry.get(room_id);
        if room.is_none() {
            debug!(room_id, "event for unknown room ignored");
        }
        room
    }
}

fn state_changed(room: &RoomState) -> OutboundEvent {
    OutboundEvent::StateChanged {
        room_id: room.room_id.clone(),
        state: room.state(),
    }
}

fn coverage(ctx: &EvalContext, result: &PlayerResult) -> CoverageSummary {
    let deployed = result.deployed_components();
    let missing_required = ctx
        .required
        .iter()
        .filter(|c| !deployed.contains(c))
        .cloned()
        .collect();

    CoverageSummary {
        player_id: result.player_id.clone(),
        deployed,
        missing_required,
        arrow_count: result.arrows.len(),
        score: result.score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn start(room_id: &str) -> InboundEvent {
        InboundEvent::RoundStart {
            room_id: room_id.to_string(),
            mission_title: "Chat".to_string(),
            required_components: vec!["server".to_string(), "database".to_string()],
        }
    }

    fn engine() -> GameEngine {
        GameEngine::with_oracle(EngineConfig::default(), None)
    }

    #[tokio::test]
    async fn test_round_start_creates_room() {
        let engine = engine();
        let events = engine.handle_at(start("r1"), Utc::now()).await;
        assert_eq!(
            events,
            vec![OutboundEvent::StateChanged {
                room_id: "r1".to_string(),
                state: GameState::Playing,
            }]
        );
        assert_eq!(engine.registry().room_ids(), vec!["r1"]);
    }

    #[tokio::test]
    async fn test_second_round_start_rejected() {
        let engine = engine();
        let t0 = Utc::now();
        engine.handle_at(start("r1"), t0).await;
        assert!(engine.handle_at(start("r1"), t0 + Duration::seconds(1)).await.is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_unknown_room() {
        let err = engine().snapshot("ghost").await.unwrap_err();
        assert!(matches!(err, GameError::RoomNotFound(id) if id == "ghost"));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = EngineConfig::default();
        config.eval.imbalance_ratio = 0.5;
        assert!(matches!(GameEngine::new(config), Err(GameError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_unknown_room_ignored() {
        let events = engine()
            .handle(InboundEvent::IncidentExpired {
                room_id: "ghost".to_string(),
            })
            .await;
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_next_round_discards_room_nobody_joined() {
        let engine = engine();
        let t0 = Utc::now();
        engine.handle_at(start("r1"), t0).await;

        let judged = engine
            .handle_at(
                InboundEvent::BothSubmitted {
                    room_id: "r1".to_string(),
                    player1_result: PlayerResult {
                        player_id: "alice".to_string(),
                        nodes: Vec::new(),
                        arrows: Vec::new(),
                        score: None,
                    },
                    player2_result: PlayerResult {
                        player_id: "bob".to_string(),
                        nodes: Vec::new(),
                        arrows: Vec::new(),
                        score: None,
                    },
                },
                t0 + Duration::seconds(30),
            )
            .await;
        assert!(judged.iter().any(|e| matches!(e, OutboundEvent::RoundResult { .. })));

        let events = engine
            .handle_at(
                InboundEvent::NextRound {
                    room_id: "r1".to_string(),
                },
                t0 + Duration::seconds(31),
            )
            .await;
        assert_eq!(
            events,
            vec![OutboundEvent::StateChanged {
                room_id: "r1".to_string(),
                state: GameState::Waiting,
            }]
        );
        assert!(engine.registry().is_empty());
    }

    #[tokio::test]
    async fn test_player_left_discards_empty_room() {
        let engine = engine();
        let t0 = Utc::now();
        engine.handle_at(start("r1"), t0).await;
        engine
            .handle_at(
                InboundEvent::CanvasUpdate {
                    room_id: "r1".to_string(),
                    player_id: "alice".to_string(),
                    nodes: vec![CanvasNode::new("1", "server")],
                    arrows: Vec::new(),
                },
                t0 + Duration::seconds(1),
            )
            .await;

        engine
            .handle(InboundEvent::PlayerLeft {
                room_id: "r1".to_string(),
                player_id: "alice".to_string(),
            })
            .await;
        assert!(engine.registry().is_empty());
    }
}
