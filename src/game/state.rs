//! Round lifecycle state machine
//!
//! Deterministic finite state machine over a room's round:
//! - Safety: only the seven edges below are ever taken
//! - Single choke point: every state change goes through [`GameStateMachine::transition`]
//! - Rejected transitions are no-ops on the room

use crate::errors::{GameError, Result};
use crate::game::room::RoomState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Round states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameState {
    /// Room open, no round running
    Waiting,

    /// Players are building their designs
    Playing,

    /// A chaos incident is active
    InBasket,

    /// Both players submitted, evaluation running
    Judging,

    /// Result delivered, waiting for the next round
    Finished,
}

impl GameState {
    /// Every state, in lifecycle order
    pub const ALL: [GameState; 5] = [
        GameState::Waiting,
        GameState::Playing,
        GameState::InBasket,
        GameState::Judging,
        GameState::Finished,
    ];

    /// Valid successors of this state
    ///
    /// Valid transitions (7 edges):
    /// 1. Waiting  → Playing   (round start)
    /// 2. Playing  → InBasket  (chaos event fired)
    /// 3. InBasket → Playing   (incident expired)
    /// 4. Playing  → Judging   (both submitted)
    /// 5. InBasket → Judging   (both submitted during an incident)
    /// 6. Judging  → Finished  (evaluation delivered)
    /// 7. Finished → Waiting   (next round)
    pub fn successors(&self) -> &'static [GameState] {
        use GameState::*;

        match self {
            Waiting => &[Playing],
            Playing => &[InBasket, Judging],
            InBasket => &[Playing, Judging],
            Judging => &[Finished],
            Finished => &[Waiting],
        }
    }

    /// Check whether `target` is a valid successor
    pub fn can_transition_to(&self, target: GameState) -> bool {
        self.successors().contains(&target)
    }

    /// States in which players may still edit their designs
    pub fn is_round_active(&self) -> bool {
        matches!(self, GameState::Playing | GameState::InBasket)
    }

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            GameState::Waiting => "WAITING",
            GameState::Playing => "PLAYING",
            GameState::InBasket => "IN_BASKET",
            GameState::Judging => "JUDGING",
            GameState::Finished => "FINISHED",
        }
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validates and applies transitions over a [`RoomState`].
pub struct GameStateMachine;

impl GameStateMachine {
    /// Attempt a transition, returning the rejection as an error.
    ///
    /// On success the room's state and `entered_at` are updated; on failure the
    /// room is untouched.
    pub fn try_transition(room: &mut RoomState, target: GameState, now: DateTime<Utc>) -> Result<()> {
        let from = room.state();
        if !from.can_transition_to(target) {
            return Err(GameError::InvalidTransition {
                from: from.to_string(),
                to: target.to_string(),
            });
        }

        room.apply_state(target, now);
        debug!(room_id = %room.room_id, %from, to = %target, "state transition");
        Ok(())
    }

    /// Attempt a transition; `false` means rejected and nothing changed.
    pub fn transition(room: &mut RoomState, target: GameState, now: DateTime<Utc>) -> bool {
        match Self::try_transition(room, target, now) {
            Ok(()) => true,
            Err(err) => {
                warn!(room_id = %room.room_id, error = %err, "transition rejected");
                false
            }
        }
    }
}
