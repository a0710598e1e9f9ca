//! MCP `classify_thought` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `classify_thought` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ClassifyThoughtParams {
    #[schemars(description = "The thought to classify as a dot, wheel or chakra")]
    pub content: String,

    /// Also return the semantic profile and extracted entities.
    #[schemars(
        description = "If true, also return semantic analysis and key entities. Defaults to false."
    )]
    pub analyze: Option<bool>,
}
