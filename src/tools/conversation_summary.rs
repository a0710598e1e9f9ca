//! MCP `conversation_summary` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `conversation_summary` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ConversationSummaryParams {
    #[schemars(description = "Conversation session id")]
    pub session_id: String,
}
