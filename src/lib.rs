//! archduel - orchestration engine for two-player system design duels
//!
//! Two players build architecture diagrams against a mission while three
//! agents act on the room: a coach that hints, a chaos agent that injects a
//! failure scenario, and a judge that compares the final designs. Every agent
//! degrades to a deterministic fallback when the language-model oracle is
//! unavailable, so the round itself never depends on it.
//!
//! # Architecture
//!
//! - **game**: round state machine, per-room state, room registry
//! - **orchestrator**: observe / decide / dispatch with hard guards
//! - **agents**: coach, chaos and evaluation pipelines
//! - **oracle**: fallible language-model boundary
//! - **engine**: Dispatcher-facing event handling

pub mod errors;
pub mod types;
pub mod config;
pub mod game;
pub mod oracle;
pub mod agents;
pub mod orchestrator;
pub mod engine;
pub mod cli;

// Re-export commonly used types
pub use errors::{GameError, OracleError, Result};
pub use config::EngineConfig;
pub use engine::GameEngine;
pub use game::{GameState, RoomState};
pub use types::{InboundEvent, OutboundEvent};
