//! MCP `retrieve_context` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `retrieve_context` MCP tool.
///
/// With `ranked` set, retrieval runs with every source enabled and a wider limit, and
/// the merged results come back ranked.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RetrieveContextParams {
    #[schemars(description = "Natural language query")]
    pub query: String,

    #[schemars(description = "Owner of the material to search. Results never cross users.")]
    pub user_id: String,

    #[schemars(description = "Search the similarity store. Defaults to true.")]
    pub include_vector: Option<bool>,

    #[schemars(
        description = "Search stored structures by keyword. Defaults to true. Always runs when similarity search finds nothing."
    )]
    pub include_database: Option<bool>,

    #[schemars(description = "Run semantic analysis of the query. Defaults to true.")]
    pub include_semantic: Option<bool>,

    /// Maximum results per source (1-50).
    #[schemars(description = "Maximum results per source (1-50). Defaults to the configured limit.")]
    pub limit: Option<usize>,

    #[schemars(
        description = "If true, run an enhanced search and return related content and similar structures ranked together."
    )]
    pub ranked: Option<bool>,

    #[schemars(
        description = "Preferred types for ranking ('dot', 'wheel', 'chakra', 'entry'). Items of other types are down-weighted."
    )]
    pub types: Option<Vec<String>>,
}
