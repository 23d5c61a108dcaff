//! Error kinds surfaced by the store and its pipelines.
//!
//! The CLI and HTTP server map these onto exit messages and status codes;
//! inside the library they separate caller mistakes ([`StoreError::Input`],
//! [`StoreError::NotFound`]) from collaborator failures
//! ([`StoreError::Backend`], [`StoreError::BackendUnavailable`]) and local
//! persistence failures ([`StoreError::Persistence`]).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A required field is missing or malformed. The operation never starts.
    #[error("invalid input: {0}")]
    Input(String),

    /// Lookup or delete of an unknown id. Batch deletes report this per id
    /// instead of failing the whole call.
    #[error("not found: {0}")]
    NotFound(String),

    /// The embedding/generation backend could not be reached.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The embedding/generation backend returned an error response.
    #[error("backend request failed: {0}")]
    Backend(String),

    /// The registry or index file could not be read or written.
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl StoreError {
    pub(crate) fn input(msg: impl Into<String>) -> Self {
        StoreError::Input(msg.into())
    }

    pub(crate) fn persistence(err: impl std::fmt::Display) -> Self {
        StoreError::Persistence(err.to_string())
    }
}
