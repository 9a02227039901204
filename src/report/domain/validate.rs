//! Report-level invariant validation.
//!
//! Validation is pure: it collects every violated invariant rather than
//! stopping at the first, and never repairs anything. Each violation names
//! the offending entry so the operator can act on it.

use super::{PillarReport, QuestionId, QuestionStatus, TaskRef};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// One violated report invariant.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Violation {
    /// Two entries share one question id.
    #[error("{id}: duplicate question id")]
    DuplicateId {
        /// The duplicated identifier.
        id: QuestionId,
    },

    /// An entry has an empty title.
    #[error("{id}: empty title")]
    EmptyTitle {
        /// Entry with the empty title.
        id: QuestionId,
    },

    /// An entry is `answered` but carries no answer text.
    #[error("{id}: status is answered but the answer is empty")]
    AnsweredWithoutAnswer {
        /// Entry missing its answer.
        id: QuestionId,
    },

    /// An entry is `needs_human` but records no question for the human.
    #[error("{id}: status is needs_human but no human question is recorded")]
    NeedsHumanWithoutQuestion {
        /// Entry missing its open question.
        id: QuestionId,
    },

    /// A previously observed tracker linkage is missing from the report.
    #[error("{id}: task linkage {expected} was cleared from the report")]
    LinkageCleared {
        /// Entry whose linkage disappeared.
        id: QuestionId,
        /// The permanently linked reference.
        expected: TaskRef,
    },

    /// A previously observed tracker linkage points at a different task.
    #[error("{id}: task linkage changed from {expected} to {found}")]
    LinkageChanged {
        /// Entry whose linkage changed.
        id: QuestionId,
        /// The permanently linked reference.
        expected: TaskRef,
        /// The reference now present in the report.
        found: TaskRef,
    },
}

/// Validates one pillar report against the invariants in the data model,
/// including permanence of any linkage previously observed in
/// `expected_links`. Returns every violation found.
#[must_use]
pub fn validate(
    report: &PillarReport,
    expected_links: &BTreeMap<QuestionId, TaskRef>,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut seen: BTreeSet<&QuestionId> = BTreeSet::new();

    for entry in report.entries() {
        if !seen.insert(entry.id()) {
            violations.push(Violation::DuplicateId {
                id: entry.id().clone(),
            });
        }
        if entry.title().trim().is_empty() {
            violations.push(Violation::EmptyTitle {
                id: entry.id().clone(),
            });
        }
        if entry.status() == QuestionStatus::Answered && entry.answer().trim().is_empty() {
            violations.push(Violation::AnsweredWithoutAnswer {
                id: entry.id().clone(),
            });
        }
        if entry.status() == QuestionStatus::NeedsHuman && entry.human_questions().trim().is_empty()
        {
            violations.push(Violation::NeedsHumanWithoutQuestion {
                id: entry.id().clone(),
            });
        }
        if let Some(expected) = expected_links.get(entry.id()) {
            match entry.task_ref() {
                None => violations.push(Violation::LinkageCleared {
                    id: entry.id().clone(),
                    expected: expected.clone(),
                }),
                Some(found) if found != expected => violations.push(Violation::LinkageChanged {
                    id: entry.id().clone(),
                    expected: expected.clone(),
                    found: found.clone(),
                }),
                Some(_) => {}
            }
        }
    }

    violations
}
