//! Tracker port: the minimal task-tracker capability surface.
//!
//! The sync engine only needs five operations, so alternate trackers can be
//! substituted by implementing this trait; the tracker's own status
//! vocabulary is folded into [`TrackerTaskStatus`].

use crate::report::domain::{PillarId, QuestionId, TaskRef};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for tracker operations.
pub type TrackerResult<T> = Result<T, TrackerError>;

/// The coarse task state the sync engine reasons about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerTaskStatus {
    /// The task accepts further work (includes blocked/in-progress states).
    Open,
    /// The task is in a terminal state.
    Closed,
}

/// Request payload for creating one tracker task per question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskRequest {
    /// Task title shown in the tracker.
    pub title: String,
    /// Question the task will be permanently linked to.
    pub question: QuestionId,
    /// Pillar the question belongs to.
    pub pillar: PillarId,
}

/// Task tracker capability contract.
#[async_trait]
pub trait TaskTracker: Send + Sync {
    /// Creates a task and returns its permanent identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Unavailable`] on transient faults; the
    /// caller retries on a later run without side effects because the
    /// linkage check precedes every create.
    async fn create_task(&self, request: &CreateTaskRequest) -> TrackerResult<TaskRef>;

    /// Reads the current task status.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::NotFound`] when the identifier is unknown
    /// to the tracker.
    async fn get_status(&self, task: &TaskRef) -> TrackerResult<TrackerTaskStatus>;

    /// Moves the task to its terminal state.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Unavailable`] on transient faults.
    async fn close(&self, task: &TaskRef) -> TrackerResult<()>;

    /// Moves a closed task back to an open state.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Unavailable`] on transient faults.
    async fn reopen(&self, task: &TaskRef) -> TrackerResult<()>;

    /// Appends a comment to the task. Comments are append-only; existing
    /// tracker comments are never edited.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Unavailable`] on transient faults.
    async fn comment(&self, task: &TaskRef, text: &str) -> TrackerResult<()>;
}

#[async_trait]
impl<T: TaskTracker + ?Sized> TaskTracker for Box<T> {
    async fn create_task(&self, request: &CreateTaskRequest) -> TrackerResult<TaskRef> {
        (**self).create_task(request).await
    }

    async fn get_status(&self, task: &TaskRef) -> TrackerResult<TrackerTaskStatus> {
        (**self).get_status(task).await
    }

    async fn close(&self, task: &TaskRef) -> TrackerResult<()> {
        (**self).close(task).await
    }

    async fn reopen(&self, task: &TaskRef) -> TrackerResult<()> {
        (**self).reopen(task).await
    }

    async fn comment(&self, task: &TaskRef, text: &str) -> TrackerResult<()> {
        (**self).comment(task, text).await
    }
}

/// Errors returned by tracker implementations.
#[derive(Debug, Clone, Error)]
pub enum TrackerError {
    /// The tracker is unreachable; the operation can be retried later.
    #[error("tracker unavailable: {0}")]
    Unavailable(Arc<dyn std::error::Error + Send + Sync>),

    /// The tracker answered but the response was not usable.
    #[error("tracker protocol error: {0}")]
    Protocol(String),

    /// The referenced task does not exist in the tracker.
    #[error("tracker task not found: {0}")]
    NotFound(TaskRef),
}

impl TrackerError {
    /// Wraps a transport-level failure.
    pub fn unavailable(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Unavailable(Arc::new(err))
    }
}
