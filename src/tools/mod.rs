pub mod classify_thought;
pub mod conversation_summary;
pub mod converse;
pub mod retrieve_context;
pub mod store_thought;

use classify_thought::ClassifyThoughtParams;
use conversation_summary::ConversationSummaryParams;
use converse::ConverseParams;
use retrieve_context::RetrieveContextParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use std::sync::Arc;
use store_thought::StoreThoughtParams;

use dotspark::conversation::HistoryTurn;
use dotspark::retrieval::{RankFilters, RetrievalOptions};
use dotspark::App;

const MAX_LIMIT: usize = 50;

/// The dotspark MCP tool handler. Holds the shared [`App`] and exposes every tool via
/// the `#[tool_router]` macro.
#[derive(Clone)]
pub struct DotsparkTools {
    tool_router: ToolRouter<Self>,
    app: Arc<App>,
    default_limit: usize,
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("serialization failed: {e}"))
}

#[tool_router]
impl DotsparkTools {
    pub fn new(app: Arc<App>, default_limit: usize) -> Self {
        Self {
            tool_router: Self::tool_router(),
            app,
            default_limit,
        }
    }

    /// Classify a thought as a dot, wheel or chakra.
    #[tool(description = "Classify a thought. Types: dot (single insight, no goal or timeline), wheel (goal with actionable, time-bound steps), chakra (life-level purpose spanning several life domains).")]
    async fn classify_thought(
        &self,
        Parameters(params): Parameters<ClassifyThoughtParams>,
    ) -> Result<String, String> {
        tracing::info!(content_len = params.content.len(), "classify_thought called");

        let classifier = &self.app.classifier;
        let structure = classifier
            .classify(&params.content)
            .await
            .map_err(|e| e.to_string())?;

        if !params.analyze.unwrap_or(false) {
            return to_json(&structure);
        }

        let (semantics, entities) = tokio::join!(
            classifier.analyze_semantics(&params.content),
            classifier.extract_entities(&params.content),
        );
        to_json(&serde_json::json!({
            "cognitiveStructure": structure,
            "semanticAnalysis": semantics.map_err(|e| e.to_string())?,
            "keyEntities": entities.map_err(|e| e.to_string())?,
        }))
    }

    /// Retrieve context relevant to a query from the user's own material.
    #[tool(description = "Search a user's stored thoughts and notes by natural language query. Returns the query's classification, related content, similar structures and grounded insights.")]
    async fn retrieve_context(
        &self,
        Parameters(params): Parameters<RetrieveContextParams>,
    ) -> Result<String, String> {
        tracing::info!(
            user_id = %params.user_id,
            ranked = params.ranked.unwrap_or(false),
            "retrieve_context called"
        );

        if params.ranked.unwrap_or(false) {
            let filters = RankFilters {
                types: params.types.unwrap_or_default(),
            };
            let result = self
                .app
                .retriever
                .enhanced_search(&params.query, &params.user_id, &filters)
                .await
                .map_err(|e| e.to_string())?;
            return to_json(&result);
        }

        let limit = params.limit.unwrap_or(self.default_limit);
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(format!("invalid input: limit must be between 1 and {MAX_LIMIT}"));
        }
        let options = RetrievalOptions {
            include_vector: params.include_vector.unwrap_or(true),
            include_database: params.include_database.unwrap_or(true),
            include_semantic: params.include_semantic.unwrap_or(true),
            limit,
        };
        let result = self
            .app
            .retriever
            .retrieve(&params.query, &params.user_id, &options)
            .await
            .map_err(|e| e.to_string())?;
        to_json(&result)
    }

    /// Run one conversational turn.
    #[tool(description = "Send a message in a conversation session. The reply remembers earlier turns, follows references to previously discussed points, and is grounded in the user's stored material.")]
    async fn converse(
        &self,
        Parameters(params): Parameters<ConverseParams>,
    ) -> Result<String, String> {
        tracing::info!(
            session_id = %params.session_id,
            user_id = %params.user_id,
            "converse called"
        );

        let history: Vec<HistoryTurn> = params
            .history
            .unwrap_or_default()
            .into_iter()
            .map(|turn| HistoryTurn {
                role: turn.role,
                content: turn.content,
            })
            .collect();

        let result = self
            .app
            .conversation
            .process_message(&params.message, &params.session_id, &params.user_id, &history)
            .await
            .map_err(|e| e.to_string())?;
        to_json(&result)
    }

    /// Summarize a conversation session.
    #[tool(description = "Summarize a conversation session: topics by frequency, key points by user interest, high-interest points and the flow of intents.")]
    async fn conversation_summary(
        &self,
        Parameters(params): Parameters<ConversationSummaryParams>,
    ) -> Result<String, String> {
        tracing::info!(session_id = %params.session_id, "conversation_summary called");
        let summary = self
            .app
            .conversation
            .conversation_summary(&params.session_id)
            .await
            .map_err(|e| e.to_string())?;
        to_json(&summary)
    }

    /// Classify and store a new thought.
    #[tool(description = "Classify a thought and store it as the user's dot, wheel or chakra so later retrieval and conversations can use it.")]
    async fn store_thought(
        &self,
        Parameters(params): Parameters<StoreThoughtParams>,
    ) -> Result<String, String> {
        tracing::info!(
            user_id = %params.user_id,
            content_len = params.content.len(),
            "store_thought called"
        );
        let stored = self
            .app
            .store_thought(&params.user_id, &params.content)
            .await
            .map_err(|e| format!("{e:#}"))?;
        to_json(&stored)
    }
}

#[tool_handler]
impl ServerHandler for DotsparkTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "dotspark organizes a user's thoughts into dots, wheels and chakras. Use \
                 store_thought to save, classify_thought to classify without saving, \
                 retrieve_context to search, and converse for grounded multi-turn conversation."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
