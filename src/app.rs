//! Application wiring.
//!
//! [`App`] opens the database, creates whichever providers are configured and builds
//! the classifier, retriever and conversation engine on top of them. The MCP tools and
//! the terminal commands both go through it.

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;
use std::sync::{Arc, Mutex};

use crate::cognition::{Classifier, CognitiveStructure};
use crate::config::DotsparkConfig;
use crate::conversation::ConversationEngine;
use crate::error::{require_text, require_user};
use crate::provider::CompletionProvider;
use crate::retrieval::Retriever;
use crate::store::{
    NewStructure, SimilaritySearch, SqliteStructureStore, SqliteVectorStore, StoredStructure,
    StructureStore, VectorRecord,
};

/// Result of storing a new thought.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredThought {
    pub structure: StoredStructure,
    pub classification: CognitiveStructure,
    /// Whether the thought was also indexed for similarity search.
    pub indexed: bool,
}

pub struct App {
    pub classifier: Classifier,
    pub retriever: Retriever,
    pub conversation: ConversationEngine,
    structures: SqliteStructureStore,
    similarity: Option<Arc<dyn SimilaritySearch>>,
}

impl App {
    /// Build everything from configuration, opening the configured database.
    pub fn from_config(config: &DotsparkConfig) -> Result<Self> {
        let db_path = config.resolved_db_path();
        let conn = crate::db::open_database(&db_path, config.embedding.dimensions)?;
        tracing::info!(db = %db_path.display(), "database ready");

        let completion = crate::provider::create_provider(&config.completion)
            .context("failed to create completion provider")?;
        Self::with_connection(config, conn, completion)
    }

    /// Build on an already opened connection with an explicit completion provider.
    pub fn with_connection(
        config: &DotsparkConfig,
        conn: Connection,
        completion: Option<Arc<dyn CompletionProvider>>,
    ) -> Result<Self> {
        let db = Arc::new(Mutex::new(conn));

        let embedding = crate::embedding::create_provider(&config.embedding)
            .context("failed to create embedding provider")?;
        let similarity: Option<Arc<dyn SimilaritySearch>> = embedding
            .map(|e| Arc::new(SqliteVectorStore::new(Arc::clone(&db), e)) as Arc<dyn SimilaritySearch>);

        Ok(Self::assemble(config, db, completion, similarity))
    }

    /// Build from explicit collaborators.
    pub fn assemble(
        config: &DotsparkConfig,
        db: Arc<Mutex<Connection>>,
        completion: Option<Arc<dyn CompletionProvider>>,
        similarity: Option<Arc<dyn SimilaritySearch>>,
    ) -> Self {
        tracing::info!(
            completion = completion.as_ref().map(|p| p.name()).unwrap_or("none"),
            similarity = similarity.is_some(),
            "providers ready"
        );

        let structures = SqliteStructureStore::new(db);
        let classifier = Classifier::new(completion);
        let retriever = Retriever::new(
            classifier.clone(),
            similarity.clone(),
            Some(Arc::new(structures.clone()) as Arc<dyn StructureStore>),
            config.retrieval.clone(),
        );
        let conversation =
            ConversationEngine::new(retriever.clone(), similarity.clone(), config.conversation.clone());

        Self {
            classifier,
            retriever,
            conversation,
            structures,
            similarity,
        }
    }

    /// Classify a thought and store it for later retrieval.
    ///
    /// The structure row is written first; indexing into the similarity store is
    /// best-effort and only logged on failure.
    pub async fn store_thought(&self, user_id: &str, content: &str) -> Result<StoredThought> {
        require_user(user_id)?;
        require_text(content, "content")?;

        let classification = self.classifier.classify(content).await?;
        let structure = self
            .structures
            .insert(user_id, NewStructure::from(&classification))
            .await
            .context("failed to store structure")?;

        let indexed = match &self.similarity {
            Some(similarity) => {
                let record = VectorRecord {
                    user_id: user_id.to_string(),
                    content_type: structure.kind.as_str().to_string(),
                    content_id: Some(structure.id.clone()),
                    session_id: None,
                    content: structure.searchable_text(),
                    metadata: Some(serde_json::json!({
                        "heading": structure.heading,
                        "confidence": classification.confidence,
                    })),
                };
                match similarity.store(record).await {
                    Ok(_) => true,
                    Err(e) => {
                        tracing::warn!(id = %structure.id, error = %e, "failed to index structure");
                        false
                    }
                }
            }
            None => false,
        };

        tracing::info!(
            id = %structure.id,
            user_id = %user_id,
            kind = %structure.kind,
            indexed,
            "thought stored"
        );

        Ok(StoredThought {
            structure,
            classification,
            indexed,
        })
    }
}
