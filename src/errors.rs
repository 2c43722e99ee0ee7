//! Error types for the archduel engine
//!
//! Oracle failures are always recovered locally by the calling agent.
//! Transition and guard failures are load-bearing: they mean "no action taken".

use thiserror::Error;

/// Failures at the language-model boundary.
///
/// Every variant is treated identically by the agents: the calling stage
/// switches to its deterministic path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// Call exceeded its deadline
    #[error("Oracle timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    /// Transport-level failure (connection refused, TLS, ...)
    #[error("Oracle transport failure: {0}")]
    Http(String),

    /// Non-success HTTP status
    #[error("Oracle returned HTTP {code}: {body}")]
    Status { code: u16, body: String },

    /// Reply was not the structured JSON the stage asked for
    #[error("Malformed oracle response: {0}")]
    Malformed(String),

    /// No oracle configured for this engine
    #[error("Oracle unavailable")]
    Unavailable,
}

impl From<reqwest::Error> for OracleError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            OracleError::Timeout { after_ms: 0 }
        } else {
            OracleError::Http(err.to_string())
        }
    }
}

/// Main error type for the engine
#[derive(Error, Debug)]
pub enum GameError {
    /// State machine transition errors
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Event addressed to a room that does not exist
    #[error("Room not found: {0}")]
    RoomNotFound(String),

    /// Oracle errors that escaped an agent boundary
    #[error(transparent)]
    Oracle(#[from] OracleError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, GameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GameError::InvalidTransition {
            from: "WAITING".to_string(),
            to: "JUDGING".to_string(),
        };
        assert!(err.to_string().contains("WAITING"));
        assert!(err.to_string().contains("JUDGING"));
    }

    #[test]
    fn test_oracle_error_wraps_transparently() {
        let err: GameError = OracleError::Timeout { after_ms: 8000 }.into();
        assert_eq!(err.to_string(), "Oracle timed out after 8000ms");
    }

    #[test]
    fn test_status_error_display() {
        let err = OracleError::Status {
            code: 503,
            body: "overloaded".to_string(),
        };
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("overloaded"));
    }
}
