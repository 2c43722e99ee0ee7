//! Language-model oracle boundary
//!
//! The oracle is untrusted and fallible. Every call carries a timeout, and
//! every reply is decoded into a typed response or rejected as malformed.
//! Callers get a `Result<T, OracleError>` and pick their deterministic path
//! on `Err`.

pub mod json;
pub mod ollama;
pub mod scripted;

use crate::errors::OracleError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub use ollama::OllamaOracle;
pub use scripted::ScriptedOracle;

/// Default per-call deadline
pub const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(8);

/// Message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A single oracle call
#[derive(Debug, Clone, PartialEq)]
pub struct OracleRequest {
    /// Pipeline stage issuing the call (e.g. `chaos.generate`)
    pub purpose: &'static str,
    pub messages: Vec<ChatMessage>,

    /// Ask the backend for structured JSON output
    pub structured: bool,
    pub timeout: Duration,
}

impl OracleRequest {
    pub fn new(purpose: &'static str, system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            purpose,
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            structured: true,
            timeout: DEFAULT_ORACLE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Concatenated message contents, used by prompt-inspecting tests
    pub fn text(&self) -> String {
        self.messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// External text-generation service
#[async_trait]
pub trait LanguageModelOracle: Send + Sync {
    /// Raw completion text for the request
    async fn complete(&self, request: &OracleRequest) -> Result<String, OracleError>;

    /// Backend name for logs
    fn name(&self) -> &str;
}

/// Optional shared oracle handle held by agents
pub type SharedOracle = Option<Arc<dyn LanguageModelOracle>>;

/// Issue a request with its deadline and decode the structured reply.
pub async fn ask_json<T: DeserializeOwned>(
    oracle: &dyn LanguageModelOracle,
    request: &OracleRequest,
) -> Result<T, OracleError> {
    let after_ms = request.timeout.as_millis() as u64;

    let reply = match tokio::time::timeout(request.timeout, oracle.complete(request)).await {
        Ok(Ok(reply)) => reply,
        Ok(Err(OracleError::Timeout { .. })) | Err(_) => {
            return Err(OracleError::Timeout { after_ms });
        }
        Ok(Err(err)) => return Err(err),
    };

    json::decode(&reply)
}

/// Like [`ask_json`], with `Unavailable` when no oracle is configured.
///
/// Failures are logged here once so every stage reports them the same way.
pub async fn consult<T: DeserializeOwned>(
    oracle: &SharedOracle,
    request: &OracleRequest,
) -> Result<T, OracleError> {
    let Some(oracle) = oracle else {
        return Err(OracleError::Unavailable);
    };

    let result = ask_json(oracle.as_ref(), request).await;
    if let Err(err) = &result {
        warn!(
            oracle = oracle.name(),
            purpose = request.purpose,
            error = %err,
            "oracle call failed, using deterministic path"
        );
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Reply {
        ok: bool,
    }

    #[tokio::test]
    async fn test_consult_without_oracle_is_unavailable() {
        let request = OracleRequest::new("test", "sys", "user");
        let err = consult::<Reply>(&None, &request).await.unwrap_err();
        assert_eq!(err, OracleError::Unavailable);
    }

    #[tokio::test]
    async fn test_ask_json_decodes_reply() {
        let oracle = ScriptedOracle::new().reply("test", r#"{"ok": true}"#);
        let request = OracleRequest::new("test", "sys", "user");
        let reply: Reply = ask_json(&oracle, &request).await.unwrap();
        assert!(reply.ok);
    }

    #[tokio::test]
    async fn test_ask_json_times_out() {
        let oracle = ScriptedOracle::new()
            .reply("test", r#"{"ok": true}"#)
            .with_latency(Duration::from_millis(200));
        let request =
            OracleRequest::new("test", "sys", "user").with_timeout(Duration::from_millis(20));

        let err = ask_json::<Reply>(&oracle, &request).await.unwrap_err();
        assert_eq!(err, OracleError::Timeout { after_ms: 20 });
    }

    #[tokio::test]
    async fn test_malformed_reply_is_error() {
        let oracle: Arc<dyn LanguageModelOracle> =
            Arc::new(ScriptedOracle::new().reply("test", "I cannot help with that"));
        let request = OracleRequest::new("test", "sys", "user");
        let err = consult::<Reply>(&Some(oracle), &request).await.unwrap_err();
        assert!(matches!(err, OracleError::Malformed(_)));
    }

    #[test]
    fn test_request_text_joins_messages() {
        let request = OracleRequest::new("test", "system part", "user part");
        assert_eq!(request.text(), "system part\nuser part");
        assert!(request.structured);
    }
}
