//! Ollama chat oracle
//!
//! Non-streaming `POST /api/chat`; structured requests set `format: "json"`.

use crate::errors::OracleError;
use crate::oracle::{ChatMessage, LanguageModelOracle, OracleRequest};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Default Ollama API endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default model
pub const DEFAULT_MODEL: &str = "qwen2.5:7b-instruct";

/// Ollama-backed oracle
#[derive(Debug, Clone)]
pub struct OllamaOracle {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaOracle {
    /// Create oracle with default settings
    pub fn new() -> Result<Self, OracleError> {
        Self::with_config(DEFAULT_OLLAMA_URL, DEFAULT_MODEL)
    }

    /// Create oracle with custom endpoint and model
    ///
    /// Deadlines are applied per request by the caller, not on the client.
    pub fn with_config(base_url: &str, model: &str) -> Result<Self, OracleError> {
        let client = Client::builder().build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if Ollama is reachable
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/api/version", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl LanguageModelOracle for OllamaOracle {
    async fn complete(&self, request: &OracleRequest) -> Result<String, OracleError> {
        let url = format!("{}/api/chat", self.base_url);

        let body = ChatRequest {
            model: &self.model,
            messages: &request.messages,
            stream: false,
            format: request.structured.then_some("json"),
        };

        let response = self
            .client
            .post(&url)
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let code = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(OracleError::Status { code, body });
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| OracleError::Malformed(format!("unexpected chat response: {}", e)))?;

        Ok(reply.message.content)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// Ollama chat request
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
}

/// Ollama chat response
#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oracle_creation() {
        let oracle = OllamaOracle::new().unwrap();
        assert_eq!(oracle.model(), DEFAULT_MODEL);
        assert_eq!(oracle.base_url(), DEFAULT_OLLAMA_URL);
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let oracle = OllamaOracle::with_config("http://localhost:11434/", "llama3.1:8b").unwrap();
        assert_eq!(oracle.base_url(), "http://localhost:11434");
        assert_eq!(oracle.model(), "llama3.1:8b");
    }

    #[test]
    fn test_chat_request_shape() {
        let messages = vec![ChatMessage::system("s"), ChatMessage::user("u")];
        let body = ChatRequest {
            model: "m",
            messages: &messages,
            stream: false,
            format: Some("json"),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["format"], "json");
        assert_eq!(value["messages"][1]["role"], "user");
        assert_eq!(value["stream"], false);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let oracle = OllamaOracle::with_config("http://127.0.0.1:9", "m").unwrap();
        let request = OracleRequest::new("test", "s", "u")
            .with_timeout(std::time::Duration::from_millis(500));
        let err = oracle.complete(&request).await.unwrap_err();
        assert!(matches!(
            err,
            OracleError::Http(_) | OracleError::Timeout { .. }
        ));
    }
}
