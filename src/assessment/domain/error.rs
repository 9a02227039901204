//! Error types for assessment domain invariants.

use crate::report::domain::{QuestionId, TaskRef};
use thiserror::Error;

/// Errors returned while mutating assessment-wide state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssessmentDomainError {
    /// A question already linked to one task was asked to link to another.
    /// Linkage is permanent and one-to-one.
    #[error("linkage for {id} is permanent: {existing} cannot become {requested}")]
    LinkageReassigned {
        /// Question whose linkage was rejected.
        id: QuestionId,
        /// The permanently linked reference.
        existing: TaskRef,
        /// The reference the caller attempted to record.
        requested: TaskRef,
    },

    /// The question id is not present in any pillar report.
    #[error("question {id} not found in any pillar report")]
    UnknownQuestion {
        /// The unmatched identifier.
        id: QuestionId,
    },
}
