//! Store port: durable per-assessment state.
//!
//! The report files are the unit of durable state. Every CLI command is a
//! scoped read-modify-write through this port; the codec's round-trip
//! guarantee is what keeps concurrent human edits to unrelated entries safe.

use crate::assessment::domain::{EvidenceBundle, EvidenceLedger, LinkageMap};
use crate::report::domain::PillarId;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Durable storage contract for one assessment.
#[async_trait]
pub trait AssessmentStore: Send + Sync {
    /// Lists pillars with a report file, in canonical pillar order.
    async fn list_pillars(&self) -> StoreResult<Vec<PillarId>>;

    /// Reads one pillar's report text; `None` when the file is absent.
    async fn read_report(&self, pillar: &PillarId) -> StoreResult<Option<String>>;

    /// Writes one pillar's report text.
    async fn write_report(&self, pillar: &PillarId, text: &str) -> StoreResult<()>;

    /// Reads the linkage map; `None` before the first sync.
    async fn read_linkage(&self) -> StoreResult<Option<LinkageMap>>;

    /// Writes the linkage map. Called after every entry that gains a link
    /// so an interrupted sync loses at most the in-flight entry.
    async fn write_linkage(&self, linkage: &LinkageMap) -> StoreResult<()>;

    /// Reads the evidence application ledger; `None` before first use.
    async fn read_ledger(&self) -> StoreResult<Option<EvidenceLedger>>;

    /// Writes the evidence application ledger.
    async fn write_ledger(&self, ledger: &EvidenceLedger) -> StoreResult<()>;

    /// Reads the persisted evidence bundle; `None` before the first scan.
    async fn read_evidence(&self) -> StoreResult<Option<EvidenceBundle>>;

    /// Writes the evidence bundle.
    async fn write_evidence(&self, bundle: &EvidenceBundle) -> StoreResult<()>;

    /// Writes the assessment index document.
    async fn write_index(&self, text: &str) -> StoreResult<()>;
}

/// Errors returned by store implementations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Filesystem-level failure.
    #[error("store i/o failure on {path}: {source}")]
    Io {
        /// Path the operation touched.
        path: String,
        /// Underlying error.
        source: Arc<std::io::Error>,
    },

    /// A persisted JSON artefact cannot be decoded.
    #[error("malformed store artefact {path}: {message}")]
    Malformed {
        /// Path of the artefact.
        path: String,
        /// Decoder diagnostic.
        message: String,
    },
}

impl StoreError {
    /// Wraps an I/O error with the path it occurred on.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    /// Wraps a decoding error with the artefact path.
    pub fn malformed(path: impl Into<String>, message: impl ToString) -> Self {
        Self::Malformed {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
