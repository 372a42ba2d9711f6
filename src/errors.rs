//! Typed error surface of the sync layer.
//!
//! One enum covers every repository operation. Live subscriptions can fail
//! many subscribers with the same underlying error, so the type is `Clone`
//! and carries owned payloads only.

use thiserror::Error;

/// Errors surfaced by repository operations and live subscriptions.
///
/// `FeatureUnavailable` is the only recoverable variant: it means the
/// capability is not wired for this deployment and the caller should fall
/// back to cache-only reads. Everything else is surfaced once and never
/// retried by this layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("Feature is not available for this deployment")]
    FeatureUnavailable,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Record not found")]
    NotFound,

    #[error("Failed to decode record: {0}")]
    DecodingFailed(String),

    #[error("Failed to encode record: {0}")]
    EncodingFailed(String),

    #[error("Transport failure: {0}")]
    Transport(String),
}

impl RepositoryError {
    /// True when the caller should degrade to cache-only reads instead of
    /// treating the operation as failed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::FeatureUnavailable)
    }
}
