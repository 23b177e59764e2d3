use hatch_engine::LoadError;
use hatch_storage::StorageError;
use thiserror::Error;

use crate::validation::ValidationError;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Failures surfaced by registry resolution and installation.
///
/// Nothing here is retried automatically. A caller that wants another
/// attempt starts over at resolution.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("package '{id}' not found")]
    NotFound { id: String },

    /// Transport failure or a non-success status other than 404.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The bundle lacks a manifest or code entry, or the manifest is not JSON.
    #[error("malformed manifest: {0}")]
    MalformedManifest(String),

    #[error(transparent)]
    ValidationError(#[from] ValidationError),

    /// The package was persisted but could not be turned into an instance.
    #[error(transparent)]
    LoadError(#[from] LoadError),

    #[error(transparent)]
    StorageError(#[from] StorageError),

    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl StoreError {
    pub fn not_found(id: impl Into<String>) -> Self {
        StoreError::NotFound { id: id.into() }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(value: reqwest::Error) -> Self {
        StoreError::NetworkError(value.to_string())
    }
}
