#![allow(dead_code)]

use async_trait::async_trait;
use rusqlite::Connection;
use serde_json::Value;
use std::sync::{Arc, Mutex};

use dotspark::db;
use dotspark::embedding::{l2_normalize, EmbeddingProvider};
use dotspark::provider::{CompletionProvider, CompletionRequest};
use dotspark::store::{SimilaritySearch, VectorFilter, VectorHit, VectorRecord};
use dotspark::ProviderError;

/// Vector size used by every test database.
pub const DIM: usize = 16;

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    db::open_memory_database(DIM).unwrap()
}

pub fn shared_db() -> Arc<Mutex<Connection>> {
    Arc::new(Mutex::new(test_db()))
}

// ── Completion providers ──────────────────────────────────────────────────────

/// Returns the same reply to every prompt and records the prompts it saw.
pub struct ScriptedProvider {
    reply: Value,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(reply: Value) -> Arc<Self> {
        Arc::new(Self {
            reply,
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Value, ProviderError> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        Ok(self.reply.clone())
    }
}

/// Fails every call with a network error.
pub struct FailingProvider;

#[async_trait]
impl CompletionProvider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: &CompletionRequest) -> Result<Value, ProviderError> {
        Err(ProviderError::Network("connection refused".into()))
    }
}

// ── Embeddings and similarity ─────────────────────────────────────────────────

/// Deterministic bag-of-words embedding: each lowercase word adds weight to one bucket.
pub struct WordBucketEmbedding;

#[async_trait]
impl EmbeddingProvider for WordBucketEmbedding {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let mut v = vec![0.0f32; DIM];
        for word in text.to_lowercase().split_whitespace() {
            let bucket = word.bytes().fold(7usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
            v[bucket % DIM] += 1.0;
        }
        if v.iter().all(|x| *x == 0.0) {
            v[0] = 1.0;
        }
        Ok(l2_normalize(&v))
    }

    fn dimensions(&self) -> usize {
        DIM
    }
}

/// Similarity store that is always down.
pub struct FailingSearch;

#[async_trait]
impl SimilaritySearch for FailingSearch {
    async fn search(&self, _query: &str, _filter: &VectorFilter) -> Result<Vec<VectorHit>, ProviderError> {
        Err(ProviderError::Unavailable("vector store offline".into()))
    }

    async fn store(&self, _record: VectorRecord) -> Result<String, ProviderError> {
        Err(ProviderError::Unavailable("vector store offline".into()))
    }
}

/// Keeps every stored record in memory; searches find nothing.
#[derive(Default)]
pub struct RecordingSearch {
    pub records: Mutex<Vec<VectorRecord>>,
}

impl RecordingSearch {
    pub fn stored(&self) -> Vec<VectorRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Wait for background archival to land, up to about a second.
    pub async fn wait_for(&self, count: usize) -> Vec<VectorRecord> {
        for _ in 0..100 {
            let stored = self.stored();
            if stored.len() >= count {
                return stored;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        self.stored()
    }
}

#[async_trait]
impl SimilaritySearch for RecordingSearch {
    async fn search(&self, _query: &str, _filter: &VectorFilter) -> Result<Vec<VectorHit>, ProviderError> {
        Ok(Vec::new())
    }

    async fn store(&self, record: VectorRecord) -> Result<String, ProviderError> {
        let mut records = self.records.lock().unwrap();
        records.push(record);
        Ok(format!("rec-{}", records.len()))
    }
}

pub fn record(user: &str, content_type: &str, content: &str) -> VectorRecord {
    VectorRecord {
        user_id: user.into(),
        content_type: content_type.into(),
        content_id: None,
        session_id: None,
        content: content.into(),
        metadata: None,
    }
}
