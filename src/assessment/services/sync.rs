//! Task sync engine.
//!
//! Reconciles each question entry with its linked tracker task: creates
//! missing tasks, posts answers, closes answered work, reopens regressions
//! this tool caused, and records conflicts for closures a human made
//! directly in the tracker. Every step is guarded by the permanent linkage
//! check, so a crashed or repeated run never duplicates tasks.

use crate::assessment::domain::{short_title, LinkageMap, PushedState};
use crate::assessment::ports::{
    CreateTaskRequest, TaskTracker, TrackerError, TrackerTaskStatus,
};
use crate::report::domain::{PillarId, QuestionEntry, QuestionId, QuestionStatus, TaskRef};
use mockable::Clock;
use std::sync::Arc;
use tracing::{debug, warn};

/// One reconciliation step taken (or recorded) for an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// A tracker task was created and permanently linked.
    Created {
        /// The new task reference.
        task: TaskRef,
    },
    /// The recorded answer was posted to the task.
    Commented,
    /// The linked task was closed.
    Closed,
    /// The linked task was reopened after an explicit answer regression.
    Reopened,
    /// A linkage known on only one side was restored to the other.
    Relinked,
    /// Entry and task were already consistent.
    Unchanged,
    /// The task is in a state a human set outside this tool; recorded for
    /// review, never auto-resolved.
    Conflict {
        /// Human-readable description of the conflict.
        note: String,
    },
    /// The tracker failed for this entry; the batch continues.
    Failed {
        /// The tracker diagnostic.
        error: String,
    },
}

/// Reconciliation outcome for one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRecord {
    /// Question the record belongs to.
    pub question: QuestionId,
    /// Pillar the question belongs to.
    pub pillar: PillarId,
    /// Actions taken, in order.
    pub actions: Vec<SyncAction>,
}

impl SyncRecord {
    /// Whether any action mutated the entry or linkage (so the caller must
    /// persist before moving on).
    #[must_use]
    pub fn mutated(&self) -> bool {
        self.actions.iter().any(|action| {
            matches!(
                action,
                SyncAction::Created { .. }
                    | SyncAction::Commented
                    | SyncAction::Closed
                    | SyncAction::Reopened
                    | SyncAction::Relinked
            )
        })
    }
}

/// Summary of one full sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Per-entry reconciliation records.
    pub records: Vec<SyncRecord>,
}

impl SyncReport {
    /// Number of entries matching the given predicate over their actions.
    fn count(&self, pred: impl Fn(&SyncAction) -> bool) -> usize {
        self.records
            .iter()
            .filter(|record| record.actions.iter().any(&pred))
            .count()
    }

    /// Entries that gained a task link.
    #[must_use]
    pub fn created(&self) -> usize {
        self.count(|action| matches!(action, SyncAction::Created { .. }))
    }

    /// Entries whose task was closed.
    #[must_use]
    pub fn closed(&self) -> usize {
        self.count(|action| matches!(action, SyncAction::Closed))
    }

    /// Entries whose task was reopened.
    #[must_use]
    pub fn reopened(&self) -> usize {
        self.count(|action| matches!(action, SyncAction::Reopened))
    }

    /// Entries already consistent with their task.
    #[must_use]
    pub fn unchanged(&self) -> usize {
        self.count(|action| matches!(action, SyncAction::Unchanged))
    }

    /// Entries with a recorded conflict.
    #[must_use]
    pub fn conflicts(&self) -> usize {
        self.count(|action| matches!(action, SyncAction::Conflict { .. }))
    }

    /// Entries whose tracker operations failed.
    #[must_use]
    pub fn failures(&self) -> usize {
        self.count(|action| matches!(action, SyncAction::Failed { .. }))
    }
}

/// Task sync engine, generic over the tracker capability port.
#[derive(Clone)]
pub struct TaskSyncService<T, C>
where
    T: TaskTracker,
    C: Clock + Send + Sync,
{
    tracker: Arc<T>,
    clock: Arc<C>,
}

impl<T, C> TaskSyncService<T, C>
where
    T: TaskTracker,
    C: Clock + Send + Sync,
{
    /// Creates a sync engine over the given tracker.
    #[must_use]
    pub const fn new(tracker: Arc<T>, clock: Arc<C>) -> Self {
        Self { tracker, clock }
    }

    /// Reconciles one entry with the tracker.
    ///
    /// Mutates the entry (linkage field) and the linkage map, but performs
    /// no storage I/O; the orchestrator persists after each mutated entry
    /// so an interruption loses at most the in-flight one.
    pub async fn sync_entry(
        &self,
        pillar: &PillarId,
        entry: &mut QuestionEntry,
        linkage: &mut LinkageMap,
    ) -> SyncRecord {
        let mut actions = Vec::new();
        self.reconcile_linkage(entry, linkage, &mut actions);

        let task_ref = match entry.task_ref() {
            Some(task_ref) => task_ref.clone(),
            None => match self.create_link(pillar, entry, linkage).await {
                Ok(task_ref) => {
                    actions.push(SyncAction::Created {
                        task: task_ref.clone(),
                    });
                    task_ref
                }
                Err(err) => {
                    warn!(question = %entry.id(), error = %err, "task creation failed");
                    actions.push(SyncAction::Failed {
                        error: err.to_string(),
                    });
                    return record(pillar, entry.id(), actions);
                }
            },
        };

        match self.tracker.get_status(&task_ref).await {
            Ok(status) => {
                self.reconcile_status(entry, &task_ref, status, linkage, &mut actions)
                    .await;
            }
            Err(err) => {
                actions.push(SyncAction::Failed {
                    error: err.to_string(),
                });
            }
        }

        if actions.is_empty() {
            actions.push(SyncAction::Unchanged);
        }
        record(pillar, entry.id(), actions)
    }

    /// Repairs divergence between the report's linkage field and the
    /// linkage map: whichever side knows the reference wins, and permanence
    /// violations surface as conflicts.
    fn reconcile_linkage(
        &self,
        entry: &mut QuestionEntry,
        linkage: &mut LinkageMap,
        actions: &mut Vec<SyncAction>,
    ) {
        match (entry.task_ref().cloned(), linkage.link(entry.id()).cloned()) {
            (Some(in_report), None) => {
                // The report knows a link the map lost; restore the map.
                match linkage.record_link(entry.id().clone(), in_report) {
                    Ok(()) => actions.push(SyncAction::Relinked),
                    Err(err) => actions.push(SyncAction::Conflict {
                        note: err.to_string(),
                    }),
                }
            }
            (None, Some(link)) => {
                match entry.link_task(link.task_ref, &*self.clock) {
                    Ok(()) => actions.push(SyncAction::Relinked),
                    Err(err) => actions.push(SyncAction::Conflict {
                        note: err.to_string(),
                    }),
                }
            }
            (Some(in_report), Some(link)) if in_report != link.task_ref => {
                actions.push(SyncAction::Conflict {
                    note: format!(
                        "report links {in_report} but the linkage map records {}",
                        link.task_ref
                    ),
                });
            }
            _ => {}
        }
    }

    async fn create_link(
        &self,
        pillar: &PillarId,
        entry: &mut QuestionEntry,
        linkage: &mut LinkageMap,
    ) -> Result<TaskRef, TrackerError> {
        let request = CreateTaskRequest {
            title: format!("{} {}", entry.id(), short_title(entry.title())),
            question: entry.id().clone(),
            pillar: pillar.clone(),
        };
        let task_ref = self.tracker.create_task(&request).await?;
        if let Err(err) = linkage.record_link(entry.id().clone(), task_ref.clone()) {
            return Err(TrackerError::Protocol(err.to_string()));
        }
        if let Err(err) = entry.link_task(task_ref.clone(), &*self.clock) {
            return Err(TrackerError::Protocol(err.to_string()));
        }
        debug!(question = %entry.id(), task = %task_ref, "task created and linked");
        Ok(task_ref)
    }

    async fn reconcile_status(
        &self,
        entry: &mut QuestionEntry,
        task_ref: &TaskRef,
        status: TrackerTaskStatus,
        linkage: &mut LinkageMap,
        actions: &mut Vec<SyncAction>,
    ) {
        let answered = entry.status() == QuestionStatus::Answered;
        match (answered, status) {
            (true, TrackerTaskStatus::Open) => {
                // A comment that landed before a failed close must not be
                // posted again on the retry; the linkage map remembers it.
                let already_posted = matches!(
                    linkage.link(entry.id()).and_then(|link| link.last_pushed),
                    Some(PushedState::Commented | PushedState::Closed)
                );
                if !entry.answer().is_empty() && !already_posted {
                    match self.tracker.comment(task_ref, entry.answer()).await {
                        Ok(()) => {
                            linkage.record_pushed(entry.id(), PushedState::Commented);
                            actions.push(SyncAction::Commented);
                        }
                        Err(err) => {
                            actions.push(SyncAction::Failed {
                                error: err.to_string(),
                            });
                            return;
                        }
                    }
                }
                match self.tracker.close(task_ref).await {
                    Ok(()) => {
                        linkage.record_pushed(entry.id(), PushedState::Closed);
                        actions.push(SyncAction::Closed);
                    }
                    Err(err) => actions.push(SyncAction::Failed {
                        error: err.to_string(),
                    }),
                }
            }
            (false, TrackerTaskStatus::Closed) => {
                let we_closed = linkage
                    .link(entry.id())
                    .and_then(|link| link.last_pushed)
                    == Some(PushedState::Closed);
                if we_closed {
                    match self.tracker.reopen(task_ref).await {
                        Ok(()) => {
                            linkage.record_pushed(entry.id(), PushedState::Reopened);
                            actions.push(SyncAction::Reopened);
                        }
                        Err(err) => actions.push(SyncAction::Failed {
                            error: err.to_string(),
                        }),
                    }
                } else {
                    // A closure we never pushed is a human decision.
                    actions.push(SyncAction::Conflict {
                        note: format!(
                            "task {task_ref} closed externally while entry is {}",
                            entry.status()
                        ),
                    });
                }
            }
            (true, TrackerTaskStatus::Closed) | (false, TrackerTaskStatus::Open) => {}
        }
    }
}

fn record(pillar: &PillarId, question: &QuestionId, actions: Vec<SyncAction>) -> SyncRecord {
    SyncRecord {
        question: question.clone(),
        pillar: pillar.clone(),
        actions,
    }
}
