//! Type definitions module
//!
//! Payloads shared between the engine, the agents and the Dispatcher.

pub mod events;

// Re-export commonly used types
pub use events::{
    distinct_components, CanvasArrow, CanvasNode, ChaosEvent, CoachHint, Comparison,
    CoverageSummary, HintType, InboundEvent, OutboundEvent, PlayerResult, PlayerVerdict,
    RoundResult, Severity,
};
