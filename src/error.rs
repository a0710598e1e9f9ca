//! Error taxonomy.
//!
//! [`ProviderError`] covers every way a collaborator (completion model, embedding
//! endpoint, similarity store) can fail. It is caught at the call site and replaced
//! with a deterministic fallback, so it never reaches callers of the engine.
//! [`EngineError`] is what the engine's public operations return: bad input or a
//! missing owner, both detected before any provider call is made.

/// Failures raised by external collaborators.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// No provider of this kind is configured.
    #[error("provider not configured")]
    NotConfigured,

    #[error("network error: {0}")]
    Network(String),

    #[error("provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The reply arrived but did not match the expected shape.
    #[error("parse error: {0}")]
    Parse(String),

    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }
}

impl From<anyhow::Error> for ProviderError {
    fn from(e: anyhow::Error) -> Self {
        Self::Unavailable(format!("{e:#}"))
    }
}

/// Errors surfaced to callers of the engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Missing or empty query, content, message or session id.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No owning user, or the user does not own the session.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

/// Reject empty or whitespace-only text.
pub(crate) fn require_text(value: &str, field: &str) -> Result<(), EngineError> {
    if value.trim().is_empty() {
        return Err(EngineError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Reject a missing owner before any provider call is attempted.
pub(crate) fn require_user(user_id: &str) -> Result<(), EngineError> {
    if user_id.trim().is_empty() {
        return Err(EngineError::Unauthorized("no owning user".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_invalid_input() {
        assert_eq!(
            require_text("   ", "query"),
            Err(EngineError::InvalidInput("query must not be empty".into()))
        );
        assert!(require_text("hello", "query").is_ok());
    }

    #[test]
    fn missing_user_is_unauthorized() {
        assert!(matches!(require_user(""), Err(EngineError::Unauthorized(_))));
        assert!(require_user("42").is_ok());
    }
}
