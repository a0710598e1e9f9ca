//! MCP `converse` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One earlier turn of the conversation.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct HistoryTurnParam {
    #[schemars(description = "'user' or 'assistant'")]
    pub role: String,
    pub content: String,
}

/// Parameters for the `converse` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ConverseParams {
    #[schemars(description = "The user's message")]
    pub message: String,

    #[schemars(description = "Conversation session id. A new session starts on first use.")]
    pub session_id: String,

    #[schemars(description = "The user sending the message. Must match the session's owner.")]
    pub user_id: String,

    #[schemars(description = "Optional prior turns, oldest first. The last five are used.")]
    pub history: Option<Vec<HistoryTurnParam>>,
}
