//! Remote embedding provider for OpenAI-compatible `/embeddings` endpoints.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{l2_normalize, EmbeddingProvider};
use crate::config::EmbeddingConfig;

pub struct OpenAiEmbeddings {
    base_url: String,
    model: String,
    dimensions: usize,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

impl OpenAiEmbeddings {
    pub fn new(config: &EmbeddingConfig, api_key: String) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimensions: config.dimensions,
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let input = text.replace('\n', " ");
        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "input": input.trim(),
            }))
            .send()
            .await
            .context("embedding request failed")?;

        anyhow::ensure!(
            response.status().is_success(),
            "embedding request failed with HTTP {}",
            response.status()
        );

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .context("invalid embedding response")?;
        let embedding = parsed
            .data
            .into_iter()
            .next()
            .context("embedding response had no data")?
            .embedding;

        anyhow::ensure!(
            embedding.len() == self.dimensions,
            "unexpected embedding size {}, expected {}",
            embedding.len(),
            self.dimensions
        );

        Ok(l2_normalize(&embedding))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
