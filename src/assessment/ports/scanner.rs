//! Scanner port: optional, named static-analysis evidence sources.
//!
//! A scanner may be absent on the host; the pipeline degrades to a skip
//! note per affected entry instead of failing the merge.

use async_trait::async_trait;
use camino::Utf8Path;
use std::sync::Arc;
use thiserror::Error;

/// Result type for scanner operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// One named, optional evidence source.
#[async_trait]
pub trait EvidenceScanner: Send + Sync {
    /// The scanner's stable name, used as the evidence source label.
    fn name(&self) -> &str;

    /// Whether the scanner can run on this host.
    async fn available(&self) -> bool;

    /// Runs the scanner over the target tree and returns raw findings.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Execution`] when the scanner runs but fails,
    /// and [`ScanError::Io`] when it cannot be spawned.
    async fn collect(&self, target: &Utf8Path) -> ScanResult<serde_json::Value>;
}

/// Errors returned by scanner implementations.
#[derive(Debug, Clone, Error)]
pub enum ScanError {
    /// The scanner ran and reported failure.
    #[error("scanner '{scanner}' failed: {message}")]
    Execution {
        /// Scanner name.
        scanner: String,
        /// Scanner diagnostic output.
        message: String,
    },

    /// The scanner process could not be spawned or read.
    #[error("scanner '{scanner}' i/o failure: {source}")]
    Io {
        /// Scanner name.
        scanner: String,
        /// Underlying error.
        source: Arc<std::io::Error>,
    },
}
