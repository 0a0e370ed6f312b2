//! Error types for the Trello client core.
//!
//! # Design
//! Every failure the core can produce is a variant of [`ApiError`]. Callers
//! match on the variant (never on the rendered text) to decide how to report
//! it; the core itself never recovers from any of them.

use std::fmt;

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Which matching tier produced an ambiguous name resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Exact,
    Partial,
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchTier::Exact => f.write_str("exact"),
            MatchTier::Partial => f.write_str("partial"),
        }
    }
}

/// Errors returned by `Transport`, `Resolver` and the typed API operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required input (credential, id, name) was missing or invalid.
    /// Raised before any network access.
    #[error("{0}")]
    Config(String),

    /// DNS, connect, TLS or timeout failure while talking to the API.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The API answered with a status >= 300.
    #[error("trello API error ({status}): {message}")]
    Remote { status: u16, message: String },

    /// A non-empty success body was not valid JSON for the expected shape.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// No candidate matched the queried name.
    #[error("list name {query:?} not found on board {scope:?}")]
    NotFound { query: String, scope: String },

    /// More than one candidate matched within the deciding tier.
    #[error("list name {query:?} is ambiguous on board {scope:?} ({count} {tier} matches)")]
    Ambiguous {
        query: String,
        scope: String,
        count: usize,
        tier: MatchTier,
    },
}

impl ApiError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        ApiError::Config(message.into())
    }

    pub(crate) fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        ApiError::Transport(Box::new(err))
    }
}
