//! Hybrid retrieval and conversational context for a personal thought assistant.
//!
//! dotspark takes free text from a user and
//!
//! - classifies it into one of three structural granularities,
//! - profiles it semantically,
//! - answers it conversationally with memory of earlier turns, grounded in the user's
//!   own previously stored material.
//!
//! | Structure | Meaning |
//! |-----------|---------|
//! | **Dot** | A single insight. No goal, no timeline. |
//! | **Wheel** | A goal- and timeline-bound project. |
//! | **Chakra** | A life-level purpose or identity change spanning several life domains. |
//!
//! # Architecture
//!
//! - **Language model**: any OpenAI-compatible chat completions endpoint, optional.
//!   Every model-backed step has a deterministic fallback.
//! - **Storage**: SQLite with FTS5 for keyword search over stored structures and
//!   [sqlite-vec](https://github.com/asg017/sqlite-vec) for similarity search
//! - **Embeddings**: OpenAI-compatible `/embeddings` endpoint, optional
//! - **Transport**: MCP over stdio (primary) or Streamable HTTP
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`db`]: SQLite initialization, schema and migrations
//! - [`provider`]: Text-completion provider abstraction
//! - [`embedding`]: Text-to-vector embedding
//! - [`store`]: Similarity and keyword store collaborators
//! - [`cognition`]: Classification, semantic analysis, entities and insights
//! - [`retrieval`]: Hybrid retrieval and ranking
//! - [`conversation`]: Per-session conversational memory and grounded replies
//! - [`app`]: Wiring of all of the above from configuration

pub mod app;
pub mod cognition;
pub mod config;
pub mod conversation;
pub mod db;
pub mod embedding;
pub mod error;
pub mod provider;
pub mod retrieval;
pub mod store;

pub use app::{App, StoredThought};
pub use error::{EngineError, ProviderError};
