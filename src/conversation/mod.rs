//! Conversational context engine.
//!
//! [`ConversationEngine::process_message`] runs one turn for a session:
//!
//! 1. analyze the message's intent against the session so far
//! 2. detect whether it refers to a previously discussed point
//! 3. generate a reply grounded in that point, the session's recent topics and the
//!    user's own stored material
//! 4. update the session (messages, topics, points, flow)
//! 5. archive the exchange into the similarity store in the background
//!
//! The session lock is held for steps 1 to 4, so concurrent turns of the same session
//! apply one after the other.

pub mod context;
pub mod intent;
pub mod points;
pub mod response;
pub mod sessions;
pub mod summary;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::ConversationConfig;
use crate::error::{require_text, require_user, EngineError};
use crate::retrieval::{RetrievalOptions, Retriever};
use crate::store::{truncate_chars, SimilaritySearch, VectorRecord};

pub use context::{ConversationContext, DiscussedPoint, Message, Role};
pub use intent::{Intent, MessageAnalysis};
pub use points::{canonicalize, detect_point_reference, PointExtractor, RegexPointExtractor};
pub use sessions::{SessionHandle, SessionStore};
pub use summary::ConversationSummary;

/// Content type under which exchanges are archived.
pub const CONVERSATION_CONTENT_TYPE: &str = "conversation";
/// Characters of the assistant reply kept in archive metadata.
const ARCHIVED_REPLY_CHARS: usize = 500;

/// One prior turn supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: String,
    pub content: String,
}

/// Outcome of one conversational turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResult {
    pub response: String,
    pub detected_intent: Intent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referenced_point: Option<String>,
    pub suggested_follow_ups: Vec<String>,
    /// Whether session context or retrieved material shaped the reply.
    pub context_used: bool,
}

pub struct ConversationEngine {
    retriever: Retriever,
    archive: Option<Arc<dyn SimilaritySearch>>,
    extractor: Arc<dyn PointExtractor>,
    sessions: SessionStore,
    config: ConversationConfig,
}

impl ConversationEngine {
    pub fn new(
        retriever: Retriever,
        archive: Option<Arc<dyn SimilaritySearch>>,
        config: ConversationConfig,
    ) -> Self {
        let extractor = Arc::new(RegexPointExtractor::new(config.max_points_per_turn));
        let sessions = SessionStore::new(Duration::from_secs(config.session_ttl_secs), config.max_sessions);
        Self {
            retriever,
            archive,
            extractor,
            sessions,
            config,
        }
    }

    /// Replace the default regex point extractor.
    pub fn with_extractor(mut self, extractor: Arc<dyn PointExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Return the session's context handle, creating an empty context on first use.
    pub fn get_or_create_context(&self, session_id: &str, user_id: &str) -> Result<SessionHandle, EngineError> {
        require_user(user_id)?;
        require_text(session_id, "session id")?;
        self.sessions.get_or_create(session_id, user_id)
    }

    /// A copy of the session's current state, if the session is live.
    pub async fn context_snapshot(&self, session_id: &str) -> Option<ConversationContext> {
        let handle = self.sessions.get(session_id)?;
        let context = handle.lock().await;
        Some(context.clone())
    }

    /// Run one turn of the conversation.
    pub async fn process_message(
        &self,
        message: &str,
        session_id: &str,
        user_id: &str,
        history: &[HistoryTurn],
    ) -> Result<TurnResult, EngineError> {
        require_user(user_id)?;
        require_text(message, "message")?;
        require_text(session_id, "session id")?;

        let handle = self.sessions.get_or_create(session_id, user_id)?;
        let mut context = handle.lock().await;
        let classifier = self.retriever.classifier();

        let analysis = intent::analyze_intent(classifier, message, &context, history).await;
        let referenced = points::detect_point_reference(
            message,
            &context.discussed_points,
            self.config.recent_points_window,
        );
        tracing::debug!(
            session_id = %session_id,
            intent = %analysis.intent,
            referenced = referenced.as_deref().unwrap_or("-"),
            "message analyzed"
        );

        let grounding = response::ReplyGrounding {
            session: response::session_grounding(&context, &analysis, referenced.as_deref()),
            retrieved: self.retrieved_grounding(message, user_id).await,
        };
        let reply = response::reply_or_fallback(
            classifier,
            message,
            &context,
            &analysis,
            referenced.as_deref(),
            &grounding,
        )
        .await;

        self.update_context(&mut context, message, &reply.text, &analysis, referenced.as_deref());
        drop(context);

        self.archive_exchange(user_id, session_id, message, &reply.text);

        tracing::info!(
            session_id = %session_id,
            user_id = %user_id,
            intent = %analysis.intent,
            context_used = grounding.is_used(),
            "turn processed"
        );

        Ok(TurnResult {
            response: reply.text,
            detected_intent: analysis.intent,
            referenced_point: referenced,
            suggested_follow_ups: reply.follow_ups,
            context_used: grounding.is_used(),
        })
    }

    /// Summarize a live session. Unknown or expired sessions summarize to nothing.
    pub async fn conversation_summary(&self, session_id: &str) -> Result<ConversationSummary, EngineError> {
        require_text(session_id, "session id")?;
        match self.sessions.get(session_id) {
            Some(handle) => Ok(summary::summarize(&*handle.lock().await)),
            None => Ok(ConversationSummary::default()),
        }
    }

    /// Snippets of the user's own material related to the message.
    async fn retrieved_grounding(&self, message: &str, user_id: &str) -> Vec<String> {
        let limit = self.config.grounding_limit;
        if limit == 0 {
            return Vec::new();
        }
        let options = RetrievalOptions {
            include_vector: true,
            include_database: true,
            include_semantic: false,
            limit,
        };
        match self.retriever.retrieve(message, user_id, &options).await {
            Ok(result) => result
                .related_content
                .iter()
                .map(|hit| format!("[{}] {}", hit.content_type, hit.content))
                .chain(result.similar_structures.iter().map(|s| {
                    format!("[{}] {}: {}", s.structure.kind, s.structure.heading, s.structure.body)
                }))
                .take(limit)
                .collect(),
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "retrieval for grounding failed");
                Vec::new()
            }
        }
    }

    fn update_context(
        &self,
        context: &mut ConversationContext,
        message: &str,
        reply: &str,
        analysis: &MessageAnalysis,
        referenced: Option<&str>,
    ) {
        let now = Utc::now();
        let extracted = self.extractor.extract(reply);
        let extracted: Vec<String> = extracted
            .into_iter()
            .take(self.config.max_points_per_turn)
            .collect();

        context.push_messages(
            [
                Message {
                    role: Role::User,
                    content: message.to_string(),
                    timestamp: now,
                    points_discussed: None,
                    key_topics: None,
                    last_mentioned_point: referenced.map(str::to_string),
                },
                Message {
                    role: Role::Assistant,
                    content: reply.to_string(),
                    timestamp: now,
                    points_discussed: Some(extracted.clone()),
                    key_topics: Some(analysis.topics.clone()),
                    last_mentioned_point: None,
                },
            ],
            self.config.max_messages,
        );
        context.merge_topics(&analysis.topics, self.config.max_topics);

        for point in &extracted {
            let key = canonicalize(point);
            if !key.is_empty() {
                context.record_point(key, point, referenced, now);
            }
        }
        if let Some(key) = referenced {
            context.reinforce_point(key, reply, now);
        }
        context.record_flow(analysis.intent.as_str(), self.config.max_messages);
    }

    /// Store the exchange in the similarity store without waiting for it.
    fn archive_exchange(&self, user_id: &str, session_id: &str, message: &str, reply: &str) {
        let Some(archive) = self.archive.clone() else {
            tracing::debug!(session_id = %session_id, "no similarity store, exchange not archived");
            return;
        };
        let record = VectorRecord {
            user_id: user_id.to_string(),
            content_type: CONVERSATION_CONTENT_TYPE.to_string(),
            content_id: None,
            session_id: Some(session_id.to_string()),
            content: format!("User: {message}\nAssistant: {reply}"),
            metadata: Some(serde_json::json!({
                "userMessage": message,
                "aiResponse": truncate_chars(reply, ARCHIVED_REPLY_CHARS),
                "timestamp": Utc::now().to_rfc3339(),
            })),
        };
        let session_id = session_id.to_string();
        tokio::spawn(async move {
            match archive.store(record).await {
                Ok(id) => tracing::debug!(session_id = %session_id, id = %id, "exchange archived"),
                Err(e) => tracing::warn!(session_id = %session_id, error = %e, "failed to archive exchange"),
            }
        });
    }
}
