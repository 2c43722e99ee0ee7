//! Game module
//!
//! Round state machine, per-room context and the registry owning them.

pub mod state;
pub mod room;
pub mod registry;

// Re-export commonly used types
pub use state::{GameState, GameStateMachine};
pub use room::{HintHistory, HintRecord, PlayerDesign, RoomState, MAX_HINTS_PER_PLAYER};
pub use registry::{RoomHandle, RoomRegistry};
