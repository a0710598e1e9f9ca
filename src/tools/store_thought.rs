use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct StoreThoughtParams {
    #[schemars(description = "The thought to classify and store")]
    pub content: String,

    #[schemars(description = "Owner of the thought")]
    pub user_id: String,
}
