//! Application services: evidence merge, task sync, and orchestration.

mod merge;
mod orchestrator;
mod sync;

pub use merge::{EvidenceMergeService, MergeOptions, MergeOutcome};
pub use orchestrator::{
    AssessmentService, OperationFailure, OrchestratorError, OrchestratorResult, RecordedStatus,
    RunSummary, UnansweredEntry,
};
pub use sync::{SyncAction, SyncRecord, SyncReport, TaskSyncService};
