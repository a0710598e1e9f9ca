//! Text-to-vector embedding pipeline.
//!
//! Provides the [`EmbeddingProvider`] trait and a remote implementation against an
//! OpenAI-compatible `/embeddings` endpoint. The provider is created via
//! [`create_provider`] from configuration.

pub mod openai;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{api_key_from_env, EmbeddingConfig};

/// Trait for embedding text into vectors.
///
/// Implementations produce L2-normalized vectors of exactly [`dimensions`](Self::dimensions)
/// entries.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string into a vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Return the number of dimensions this provider produces.
    fn dimensions(&self) -> usize;
}

/// Create an embedding provider from config.
///
/// `"none"` or a missing API key yields `Ok(None)`: similarity search is then absent
/// and retrieval relies on keyword search alone.
pub fn create_provider(config: &EmbeddingConfig) -> Result<Option<Arc<dyn EmbeddingProvider>>> {
    match config.provider.as_str() {
        "none" => Ok(None),
        "openai" => match api_key_from_env(&config.api_key_env) {
            Some(key) => Ok(Some(Arc::new(openai::OpenAiEmbeddings::new(config, key)))),
            None => {
                tracing::warn!(
                    env = %config.api_key_env,
                    "embedding API key not set; similarity search disabled"
                );
                Ok(None)
            }
        },
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: openai, none"),
    }
}

/// L2-normalize a vector. Returns the input unchanged if its norm is zero.
pub fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

/// Convert an f32 embedding slice to raw bytes for sqlite-vec.
pub fn embedding_to_bytes(embedding: &[f32]) -> &[u8] {
    unsafe {
        std::slice::from_raw_parts(
            embedding.as_ptr() as *const u8,
            std::mem::size_of_val(embedding),
        )
    }
}
