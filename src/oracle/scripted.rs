//! Scripted oracle
//!
//! Serves canned replies per request purpose, in order. Purposes with no
//! remaining replies answer `Unavailable`. Used by tests and by the offline
//! `simulate` command.

use crate::errors::OracleError;
use crate::oracle::{LanguageModelOracle, OracleRequest};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// Oracle answering from per-purpose reply queues
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    replies: Mutex<HashMap<&'static str, VecDeque<Result<String, OracleError>>>>,
    requests: Mutex<Vec<OracleRequest>>,
    latency: Option<Duration>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a text reply for `purpose`
    pub fn reply(self, purpose: &'static str, text: impl Into<String>) -> Self {
        self.push(purpose, Ok(text.into()));
        self
    }

    /// Queue a failure for `purpose`
    pub fn fail(self, purpose: &'static str, error: OracleError) -> Self {
        self.push(purpose, Err(error));
        self
    }

    /// Delay every reply
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Queue a reply after construction
    pub fn push(&self, purpose: &'static str, reply: Result<String, OracleError>) {
        let mut replies = self.replies.lock().unwrap_or_else(|e| e.into_inner());
        replies.entry(purpose).or_default().push_back(reply);
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<OracleRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of calls made for `purpose`
    pub fn calls(&self, purpose: &str) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|r| r.purpose == purpose)
            .count()
    }
}

#[async_trait]
impl LanguageModelOracle for ScriptedOracle {
    async fn complete(&self, request: &OracleRequest) -> Result<String, OracleError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut replies = self.replies.lock().unwrap_or_else(|e| e.into_inner());
        replies
            .get_mut(request.purpose)
            .and_then(|queue| queue.pop_front())
            .unwrap_or(Err(OracleError::Unavailable))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
