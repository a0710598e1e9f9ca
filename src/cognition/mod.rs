//! Thought classification and analysis.
//!
//! [`Classifier`] turns raw text into a [`CognitiveStructure`], a [`SemanticAnalysis`],
//! [`KeyEntities`] and [`ContextualInsights`]. Replies from the completion model pass
//! through [`parse`] before use; whenever the model is absent or misbehaves the
//! classifier answers from deterministic rules instead.

pub mod classifier;
pub mod parse;
pub mod types;

pub use classifier::Classifier;
pub use types::{
    CognitiveStructure, Complexity, ContextualInsights, HistoryEntry, KeyEntities,
    RelatedSnippet, SemanticAnalysis, StructureKind, SuggestedStructure, TimeHorizon,
};
