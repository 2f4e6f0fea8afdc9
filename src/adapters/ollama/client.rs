//! Low-level Ollama HTTP client.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::errors::{MemoryError, MemoryResult};
use crate::domain::models::ModelConfig;

/// HTTP client for one Ollama server.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaClient {
    pub fn new(config: &ModelConfig) -> MemoryResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                MemoryError::EmbedderUnavailable(format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Generate an embedding via `/api/embeddings`.
    pub async fn embeddings(&self, model: &str, prompt: &str) -> MemoryResult<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let body = EmbeddingsRequest { model, prompt };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| MemoryError::EmbedderUnavailable(format!("embeddings request: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MemoryError::EmbedderUnavailable(format!(
                "embeddings request: HTTP {status}: {body}"
            )));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| MemoryError::EmbedderUnavailable(format!("embeddings response: {e}")))?;

        if parsed.embedding.is_empty() {
            return Err(MemoryError::EmbedderUnavailable(
                "embeddings response carried no vector".to_string(),
            ));
        }
        Ok(parsed.embedding)
    }

    /// Run a non-streaming completion via `/api/generate`.
    pub async fn generate(&self, model: &str, prompt: &str) -> MemoryResult<String> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model,
            prompt,
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| MemoryError::SummarizerFailed(format!("generate request: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MemoryError::SummarizerFailed(format!(
                "generate request: HTTP {status}: {body}"
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| MemoryError::SummarizerFailed(format!("generate response: {e}")))?;
        Ok(parsed.response)
    }

    /// Reachability probe against the model listing.
    pub async fn health(&self) -> MemoryResult<()> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| MemoryError::EmbedderUnavailable(format!("health check: {e}")))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(MemoryError::EmbedderUnavailable(format!(
                "health check: HTTP {}",
                response.status()
            )))
        }
    }
}
