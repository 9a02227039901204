//! Error types for report domain validation and parsing.

use super::{QuestionId, QuestionStatus, TaskRef};
use thiserror::Error;

/// Errors returned while constructing or mutating report domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReportDomainError {
    /// The question identifier is empty or not representable in a block
    /// header.
    #[error("invalid question id '{0}'")]
    InvalidQuestionId(String),

    /// The pillar slug is empty or not a kebab-case identifier.
    #[error("invalid pillar id '{0}'")]
    InvalidPillarId(String),

    /// The tracker reference is empty or spans multiple lines.
    #[error("invalid task reference '{0}'")]
    InvalidTaskRef(String),

    /// The requested status transition is outside the transition table.
    #[error("invalid transition for {id}: {from} -> {to}")]
    InvalidTransition {
        /// Entry whose transition was rejected.
        id: QuestionId,
        /// Status the entry currently holds.
        from: QuestionStatus,
        /// Status that was requested.
        to: QuestionStatus,
    },

    /// Free text contains a line the report format reserves for structure
    /// (a field label or block header), which would corrupt the stored
    /// report on the next parse.
    #[error("text for {id} starts a line with a reserved report token: '{line}'")]
    ReservedLine {
        /// Entry whose text was rejected.
        id: QuestionId,
        /// The offending line.
        line: String,
    },

    /// An empty answer was supplied to the record-answer operation.
    #[error("refusing to mark {id} answered with an empty answer")]
    EmptyAnswer {
        /// Entry whose answer was rejected.
        id: QuestionId,
    },

    /// A question already linked to one tracker task was asked to link to
    /// another. Linkage is permanent and one-to-one.
    #[error("task linkage for {id} is permanent: {existing} cannot become {requested}")]
    TaskRefReassigned {
        /// Entry whose linkage was rejected.
        id: QuestionId,
        /// The permanently linked reference.
        existing: TaskRef,
        /// The reference the caller attempted to assign.
        requested: TaskRef,
    },
}

/// Error returned while parsing status tokens from report text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown status: {0}")]
pub struct ParseStatusError(pub String);

/// Error returned while parsing confidence tokens from report text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown confidence: {0}")]
pub struct ParseConfidenceError(pub String);
