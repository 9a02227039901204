//! Port contracts for the assessment engine.
//!
//! Ports define infrastructure-agnostic interfaces for the external
//! collaborators: the question catalogue cache, the report store, the task
//! tracker, and optional evidence scanners.

pub mod catalog;
pub mod scanner;
pub mod store;
pub mod tracker;

pub use catalog::{CatalogError, CatalogResult, CatalogSource};
pub use scanner::{EvidenceScanner, ScanError, ScanResult};
pub use store::{AssessmentStore, StoreError, StoreResult};
pub use tracker::{
    CreateTaskRequest, TaskTracker, TrackerError, TrackerResult, TrackerTaskStatus,
};
