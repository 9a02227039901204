//! Catalogue port: access to the fetched question cache.

use crate::assessment::domain::Catalog;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for catalogue operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Source of the immutable question catalogue.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Loads the cached catalogue.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFetched`] when no cache exists yet and
    /// [`CatalogError::Malformed`] when the cache cannot be decoded.
    async fn load(&self) -> CatalogResult<Catalog>;
}

/// Errors returned by catalogue sources.
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    /// No cached catalogue exists; the fetch step has not run.
    #[error("questions cache not found; run the fetch step first")]
    NotFetched,

    /// The cache exists but cannot be decoded.
    #[error("malformed questions cache: {0}")]
    Malformed(String),

    /// The cache could not be read.
    #[error("failed to read questions cache: {0}")]
    Io(Arc<std::io::Error>),
}
