//! CLI module for archduel
//!
//! Handles command-line argument parsing and simulation scenarios.

pub mod args;
pub mod scenario;

pub use args::{Args, Commands};
pub use scenario::{Scenario, TimedEvent};
