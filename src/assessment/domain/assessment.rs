//! Assessment aggregate: pillar reports, linkage map, evidence ledger.

use super::{AssessmentDomainError, EvidenceFingerprint};
use crate::report::domain::{QuestionId, TaskRef};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The tracker state this tool last pushed for a linked task.
///
/// Distinguishes closures we performed from closures a human made directly
/// in the tracker, which drives the conflict policy during sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushedState {
    /// We posted the recorded answer as a task comment but have not yet
    /// confirmed the close.
    Commented,
    /// We closed the task after the entry was answered.
    Closed,
    /// We reopened the task after an explicit answer regression.
    Reopened,
}

/// Permanent linkage of one question to one tracker task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskLink {
    /// The tracker-issued task identifier.
    pub task_ref: TaskRef,
    /// The state this tool last pushed to the tracker, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_pushed: Option<PushedState>,
}

/// Question-to-task linkage map, persisted as `kanbus-map.json`.
///
/// Linkage is one-to-one and permanent: once a question maps to a task it
/// never maps to a different one, which is what makes an interrupted sync
/// safe to re-run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkageMap {
    /// Links keyed by question id.
    #[serde(default)]
    tasks: BTreeMap<QuestionId, TaskLink>,
}

impl LinkageMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the link for a question, if one was ever recorded.
    #[must_use]
    pub fn link(&self, id: &QuestionId) -> Option<&TaskLink> {
        self.tasks.get(id)
    }

    /// Records a new linkage. Recording the identical reference again is a
    /// no-op so a resumed sync stays idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`AssessmentDomainError::LinkageReassigned`] when the
    /// question is already linked to a different task.
    pub fn record_link(
        &mut self,
        id: QuestionId,
        task_ref: TaskRef,
    ) -> Result<(), AssessmentDomainError> {
        match self.tasks.get(&id) {
            Some(existing) if existing.task_ref == task_ref => Ok(()),
            Some(existing) => Err(AssessmentDomainError::LinkageReassigned {
                id,
                existing: existing.task_ref.clone(),
                requested: task_ref,
            }),
            None => {
                self.tasks.insert(
                    id,
                    TaskLink {
                        task_ref,
                        last_pushed: None,
                    },
                );
                Ok(())
            }
        }
    }

    /// Records the tracker state we just pushed for a linked question.
    pub fn record_pushed(&mut self, id: &QuestionId, pushed: PushedState) {
        if let Some(link) = self.tasks.get_mut(id) {
            link.last_pushed = Some(pushed);
        }
    }

    /// Returns the plain question-to-task view used by report validation.
    #[must_use]
    pub fn task_refs(&self) -> BTreeMap<QuestionId, TaskRef> {
        self.tasks
            .iter()
            .map(|(id, link)| (id.clone(), link.task_ref.clone()))
            .collect()
    }

    /// Number of linked questions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether any question is linked yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Evidence application ledger, persisted as `evidence-ledger.json`.
///
/// Keys are question ids; values the fingerprints of every evidence block
/// already applied to that entry. Re-applying a recorded fingerprint is a
/// no-op, which is what makes `apply-evidence` byte-idempotent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceLedger {
    #[serde(default)]
    applied: BTreeMap<QuestionId, BTreeSet<EvidenceFingerprint>>,
}

impl EvidenceLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the fingerprint was already applied to the question.
    #[must_use]
    pub fn contains(&self, id: &QuestionId, fingerprint: &EvidenceFingerprint) -> bool {
        self.applied
            .get(id)
            .is_some_and(|set| set.contains(fingerprint))
    }

    /// Records an application. Returns `false` when it was already present
    /// (the duplicate-application case).
    pub fn record(&mut self, id: &QuestionId, fingerprint: EvidenceFingerprint) -> bool {
        self.applied
            .entry(id.clone())
            .or_default()
            .insert(fingerprint)
    }
}
