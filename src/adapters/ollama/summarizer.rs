//! Ollama consolidation provider.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::errors::{MemoryError, MemoryResult};
use crate::domain::models::ModelConfig;
use crate::domain::ports::Summarizer;

use super::client::OllamaClient;
use super::retry::RetryPolicy;

/// [`Summarizer`] backed by an Ollama server.
pub struct OllamaSummarizer {
    client: Arc<OllamaClient>,
    model: String,
    retry: RetryPolicy,
}

impl OllamaSummarizer {
    pub fn new(client: Arc<OllamaClient>, config: &ModelConfig) -> Self {
        Self {
            client,
            model: config.consolidation_model.clone(),
            retry: RetryPolicy::new(config.max_retries),
        }
    }

    fn build_prompt(texts: &[String]) -> String {
        let mut prompt = String::from(
            "Consolidate the following memories into one concise piece of knowledge. \
             Preserve concrete facts; drop conversational filler. Reply with the \
             consolidated knowledge only.\n\n",
        );
        for (index, text) in texts.iter().enumerate() {
            prompt.push_str(&format!("Memory {}:\n{}\n\n", index + 1, text));
        }
        prompt
    }
}

#[async_trait]
impl Summarizer for OllamaSummarizer {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn consolidate(&self, texts: &[String]) -> MemoryResult<String> {
        if texts.is_empty() {
            return Err(MemoryError::BadInput(
                "cannot consolidate zero texts".to_string(),
            ));
        }
        let prompt = Self::build_prompt(texts);
        let summary = self
            .retry
            .execute(|| self.client.generate(&self.model, &prompt))
            .await?;
        let summary = summary.trim();
        if summary.is_empty() {
            return Err(MemoryError::SummarizerFailed(
                "model returned an empty summary".to_string(),
            ));
        }
        Ok(summary.to_string())
    }

    async fn health(&self) -> MemoryResult<()> {
        self.client.health().await
    }
}
