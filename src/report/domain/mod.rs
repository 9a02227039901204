//! Domain model for pillar reports and question entries.
//!
//! The report domain models question entries, their status state machine,
//! and report-level validation while keeping all infrastructure concerns
//! outside of the domain boundary.

mod entry;
mod error;
mod pillar;
mod validate;

pub use entry::{
    Confidence, PersistedEntryData, QuestionEntry, QuestionId, QuestionStatus, TaskRef,
    TransitionCause,
};
pub(crate) use entry::{
    BLOCK_HEADER_PREFIX, FIELD_LABELS, LABEL_ANSWER, LABEL_CONFIDENCE, LABEL_EVIDENCE,
    LABEL_HUMAN_QUESTIONS, LABEL_KANBUS_TASK, LABEL_LAST_UPDATED, LABEL_QUESTION, LABEL_STATUS,
};
pub use error::{ParseConfidenceError, ParseStatusError, ReportDomainError};
pub use pillar::{PillarId, PillarReport};
pub use validate::{validate, Violation};
