//! Embedding providers
//!
//! Defines a common interface for embedding backends and an HTTP client for
//! OpenAI-compatible `/v1/embeddings` endpoints.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::EmbeddingConfig;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("API request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Failed to parse response: {0}")]
    ParseError(String),
    #[error("Missing API key")]
    MissingApiKey,
    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Common trait for all embedding backends
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Model identifier recorded next to each stored vector
    fn model(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Client for OpenAI-compatible embedding endpoints.
pub struct HttpEmbeddingClient {
    client: Client,
    config: EmbeddingConfig,
}

impl HttpEmbeddingClient {
    pub fn new(config: EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self, EmbeddingError> {
        Self::new(EmbeddingConfig::from_env())
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    fn parse_response(body: &str) -> Result<Vec<f32>, EmbeddingError> {
        let parsed: EmbeddingResponse = serde_json::from_str(body)
            .map_err(|e| EmbeddingError::ParseError(format!("Failed to parse JSON: {}", e)))?;
        let first = parsed
            .data
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("Empty data array in response".to_string()))?;
        if first.embedding.is_empty() {
            return Err(EmbeddingError::InvalidResponse("Empty embedding vector".to_string()));
        }
        Ok(first.embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingClient {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(EmbeddingError::MissingApiKey)?;

        let request_body = EmbeddingRequest {
            model: &self.config.model,
            input: text,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(EmbeddingError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }
        Self::parse_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response() {
        let body = r#"{"object":"list","data":[{"object":"embedding","index":0,"embedding":[0.1,-0.2,0.3]}],"model":"text-embedding-3-small"}"#;
        let v = HttpEmbeddingClient::parse_response(body).unwrap();
        assert_eq!(v, vec![0.1, -0.2, 0.3]);
    }

    #[test]
    fn test_parse_response_errors() {
        assert!(matches!(
            HttpEmbeddingClient::parse_response(r#"{"data":[]}"#),
            Err(EmbeddingError::InvalidResponse(_))
        ));
        assert!(matches!(
            HttpEmbeddingClient::parse_response("<html>"),
            Err(EmbeddingError::ParseError(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_request() {
        let client = HttpEmbeddingClient::new(EmbeddingConfig {
            endpoint: "http://127.0.0.1:9/v1/embeddings".to_string(),
            ..EmbeddingConfig::default()
        })
        .unwrap();
        assert!(matches!(
            client.embed("hello").await,
            Err(EmbeddingError::MissingApiKey)
        ));
    }
}
