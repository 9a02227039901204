//! Question entry aggregate and the status state machine.

use super::{ParseConfidenceError, ParseStatusError, ReportDomainError};
use chrono::{DateTime, Timelike, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

pub(crate) const LABEL_QUESTION: &str = "Question";
pub(crate) const LABEL_STATUS: &str = "Status";
pub(crate) const LABEL_CONFIDENCE: &str = "Confidence";
pub(crate) const LABEL_ANSWER: &str = "Answer";
pub(crate) const LABEL_EVIDENCE: &str = "Evidence";
pub(crate) const LABEL_HUMAN_QUESTIONS: &str = "Human Questions";
pub(crate) const LABEL_KANBUS_TASK: &str = "Kanbus Task";
pub(crate) const LABEL_LAST_UPDATED: &str = "Last Updated";

/// Recognised field labels in their authoritative order.
///
/// The codec owns the block layout; the vocabulary lives here so free-text
/// fields can refuse lines that would be read back as structure.
pub(crate) const FIELD_LABELS: [&str; 8] = [
    LABEL_QUESTION,
    LABEL_STATUS,
    LABEL_CONFIDENCE,
    LABEL_ANSWER,
    LABEL_EVIDENCE,
    LABEL_HUMAN_QUESTIONS,
    LABEL_KANBUS_TASK,
    LABEL_LAST_UPDATED,
];

pub(crate) const BLOCK_HEADER_PREFIX: &str = "## ";

/// Whether the stored-form grammar would read this line as structure
/// rather than field content.
fn is_reserved_line(line: &str) -> bool {
    line.starts_with(BLOCK_HEADER_PREFIX)
        || FIELD_LABELS.iter().any(|label| {
            line.strip_prefix(*label)
                .is_some_and(|rest| rest.starts_with(':'))
        })
}

/// Returns the first line of `text` that collides with the stored-form
/// grammar, if any.
fn reserved_line(text: &str) -> Option<&str> {
    text.split('\n').find(|line| is_reserved_line(line))
}

/// Stable question identifier sourced from the external catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(String);

impl QuestionId {
    /// Creates a question identifier from catalogue data.
    ///
    /// # Errors
    ///
    /// Returns [`ReportDomainError::InvalidQuestionId`] when the value is
    /// empty or contains characters that would break the report block
    /// header (`:` or line breaks).
    pub fn new(value: impl Into<String>) -> Result<Self, ReportDomainError> {
        let value = value.into();
        if value.trim().is_empty() || value.contains(':') || value.contains('\n') {
            return Err(ReportDomainError::InvalidQuestionId(value));
        }
        Ok(Self(value))
    }

    /// Returns the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of the linked task in the external tracker.
///
/// Once recorded for a question the linkage is permanent; see
/// [`QuestionEntry::link_task`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskRef(String);

impl TaskRef {
    /// Creates a task reference from a tracker-issued identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ReportDomainError::InvalidTaskRef`] when the identifier is
    /// empty or spans multiple lines.
    pub fn new(value: impl Into<String>) -> Result<Self, ReportDomainError> {
        let value = value.into();
        if value.trim().is_empty() || value.contains('\n') {
            return Err(ReportDomainError::InvalidTaskRef(value));
        }
        Ok(Self(value))
    }

    /// Returns the tracker identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Question answer lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionStatus {
    /// No answer and no evidence recorded yet.
    Unanswered,
    /// Evidence gathered or a partial answer recorded.
    Partial,
    /// A non-empty human answer has been recorded.
    Answered,
    /// The question is blocked on further human input.
    NeedsHuman,
}

impl QuestionStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unanswered => "unanswered",
            Self::Partial => "partial",
            Self::Answered => "answered",
            Self::NeedsHuman => "needs_human",
        }
    }

    /// Reports whether a transition to `to` is legal for the given cause.
    ///
    /// The state machine is deliberately narrow: evidence application may
    /// only advance `unanswered` to `partial`; recording an answer reaches
    /// `answered` from any non-answered state; `needs_human` is reachable
    /// from every other state and resolves back to `partial`; and a
    /// recorded answer regresses only through an explicit caller decision.
    #[must_use]
    pub const fn can_transition_to(self, to: Self, cause: TransitionCause) -> bool {
        match cause {
            TransitionCause::EvidenceApplied => {
                matches!((self, to), (Self::Unanswered, Self::Partial))
            }
            TransitionCause::AnswerRecorded => matches!(
                (self, to),
                (
                    Self::Unanswered | Self::Partial | Self::NeedsHuman,
                    Self::Answered
                )
            ),
            TransitionCause::HumanFlagged => {
                !matches!(self, Self::NeedsHuman) && matches!(to, Self::NeedsHuman)
            }
            TransitionCause::FlagResolved => {
                matches!((self, to), (Self::NeedsHuman, Self::Partial))
            }
            TransitionCause::Reopened => matches!((self, to), (Self::Answered, Self::Partial)),
        }
    }
}

impl TryFrom<&str> for QuestionStatus {
    type Error = ParseStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "unanswered" => Ok(Self::Unanswered),
            "partial" => Ok(Self::Partial),
            "answered" => Ok(Self::Answered),
            "needs_human" => Ok(Self::NeedsHuman),
            other => Err(ParseStatusError(other.to_owned())),
        }
    }
}

impl fmt::Display for QuestionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confidence recorded alongside an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Low confidence in the recorded answer.
    Low,
    /// Medium confidence in the recorded answer.
    Medium,
    /// High confidence in the recorded answer.
    High,
    /// Confidence is not applicable (no answer yet).
    #[serde(rename = "n/a")]
    NotApplicable,
}

impl Confidence {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::NotApplicable => "n/a",
        }
    }
}

impl TryFrom<&str> for Confidence {
    type Error = ParseConfidenceError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "n/a" => Ok(Self::NotApplicable),
            other => Err(ParseConfidenceError(other.to_owned())),
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a status transition is being requested.
///
/// Transitions are only legal for the component that owns the cause: the
/// evidence merge engine uses [`TransitionCause::EvidenceApplied`], the
/// record-answer operation the remaining causes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionCause {
    /// Machine-gathered evidence was attached.
    EvidenceApplied,
    /// A non-empty human answer was recorded.
    AnswerRecorded,
    /// The caller flagged the entry as needing human input.
    HumanFlagged,
    /// A `needs_human` flag was resolved without a full answer.
    FlagResolved,
    /// The caller explicitly reopened a recorded answer.
    Reopened,
}

/// One question within a pillar report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionEntry {
    id: QuestionId,
    title: String,
    question_text: String,
    status: QuestionStatus,
    confidence: Confidence,
    answer: String,
    evidence: String,
    human_questions: String,
    task_ref: Option<TaskRef>,
    last_updated: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted question entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedEntryData {
    /// Persisted question identifier.
    pub id: QuestionId,
    /// Persisted short title.
    pub title: String,
    /// Persisted full question text.
    pub question_text: String,
    /// Persisted lifecycle status.
    pub status: QuestionStatus,
    /// Persisted answer confidence.
    pub confidence: Confidence,
    /// Persisted human-authored answer.
    pub answer: String,
    /// Persisted machine-appended evidence.
    pub evidence: String,
    /// Persisted open questions for the interviewee.
    pub human_questions: String,
    /// Persisted tracker linkage, if any.
    pub task_ref: Option<TaskRef>,
    /// Persisted latest mutation timestamp.
    pub last_updated: DateTime<Utc>,
}

impl QuestionEntry {
    /// Creates a fresh entry from catalogue data.
    #[must_use]
    pub fn new(
        id: QuestionId,
        title: impl Into<String>,
        question_text: impl Into<String>,
        clock: &impl Clock,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            question_text: question_text.into(),
            status: QuestionStatus::Unanswered,
            confidence: Confidence::NotApplicable,
            answer: String::new(),
            evidence: String::new(),
            human_questions: String::new(),
            task_ref: None,
            last_updated: report_timestamp(clock),
        }
    }

    /// Reconstructs an entry from persisted report text.
    #[must_use]
    pub fn from_persisted(data: PersistedEntryData) -> Self {
        Self {
            id: data.id,
            title: data.title,
            question_text: data.question_text,
            status: data.status,
            confidence: data.confidence,
            answer: data.answer,
            evidence: data.evidence,
            human_questions: data.human_questions,
            task_ref: data.task_ref,
            last_updated: data.last_updated,
        }
    }

    /// Returns the question identifier.
    #[must_use]
    pub const fn id(&self) -> &QuestionId {
        &self.id
    }

    /// Returns the short title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the full catalogue question text.
    #[must_use]
    pub fn question_text(&self) -> &str {
        &self.question_text
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> QuestionStatus {
        self.status
    }

    /// Returns the answer confidence.
    #[must_use]
    pub const fn confidence(&self) -> Confidence {
        self.confidence
    }

    /// Returns the human-authored answer, empty when unanswered.
    #[must_use]
    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// Returns the accumulated evidence text.
    #[must_use]
    pub fn evidence(&self) -> &str {
        &self.evidence
    }

    /// Returns the open questions for the human interviewee.
    #[must_use]
    pub fn human_questions(&self) -> &str {
        &self.human_questions
    }

    /// Returns the linked tracker task, if any.
    #[must_use]
    pub const fn task_ref(&self) -> Option<&TaskRef> {
        self.task_ref.as_ref()
    }

    /// Returns the latest mutation timestamp.
    #[must_use]
    pub const fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// Requests a status transition for the given cause.
    ///
    /// # Errors
    ///
    /// Returns [`ReportDomainError::InvalidTransition`] identifying the
    /// current and requested states when the transition table forbids the
    /// move.
    pub fn transition_to(
        &mut self,
        to: QuestionStatus,
        cause: TransitionCause,
        clock: &impl Clock,
    ) -> Result<(), ReportDomainError> {
        if !self.status.can_transition_to(to, cause) {
            return Err(ReportDomainError::InvalidTransition {
                id: self.id.clone(),
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.touch(clock);
        Ok(())
    }

    /// Records a human answer and moves the entry to `answered`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportDomainError::EmptyAnswer`] when the answer is blank
    /// (an empty answer never reaches `answered`),
    /// [`ReportDomainError::ReservedLine`] when a line of the answer would
    /// be read back as report structure, or
    /// [`ReportDomainError::InvalidTransition`] when the entry is already
    /// `answered`. A rejected answer leaves the entry untouched.
    pub fn record_answer(
        &mut self,
        answer: &str,
        confidence: Confidence,
        clock: &impl Clock,
    ) -> Result<(), ReportDomainError> {
        if answer.trim().is_empty() {
            return Err(ReportDomainError::EmptyAnswer {
                id: self.id.clone(),
            });
        }
        if let Some(line) = reserved_line(answer) {
            return Err(ReportDomainError::ReservedLine {
                id: self.id.clone(),
                line: line.to_owned(),
            });
        }
        self.transition_to(
            QuestionStatus::Answered,
            TransitionCause::AnswerRecorded,
            clock,
        )?;
        self.answer = answer.to_owned();
        self.confidence = confidence;
        Ok(())
    }

    /// Flags the entry as requiring further human input, optionally
    /// recording an open question for the interviewee.
    ///
    /// # Errors
    ///
    /// Returns [`ReportDomainError::InvalidTransition`] when the entry is
    /// already flagged, or [`ReportDomainError::ReservedLine`] when a line
    /// of the open question would be read back as report structure (the
    /// entry is left untouched).
    pub fn flag_needs_human(
        &mut self,
        open_question: Option<&str>,
        clock: &impl Clock,
    ) -> Result<(), ReportDomainError> {
        if let Some(line) = open_question.and_then(reserved_line) {
            return Err(ReportDomainError::ReservedLine {
                id: self.id.clone(),
                line: line.to_owned(),
            });
        }
        self.transition_to(
            QuestionStatus::NeedsHuman,
            TransitionCause::HumanFlagged,
            clock,
        )?;
        if let Some(question) = open_question.filter(|q| !q.trim().is_empty()) {
            append_line(&mut self.human_questions, question);
        }
        Ok(())
    }

    /// Appends an evidence fragment without touching answer or human
    /// questions. Status changes are the caller's responsibility via
    /// [`Self::transition_to`].
    ///
    /// Machine-gathered text must never fail the merge, so fragment lines
    /// that collide with the stored-form grammar are neutralised with a
    /// leading space; the indented form round-trips verbatim.
    pub fn append_evidence(&mut self, fragment: &str, clock: &impl Clock) {
        if reserved_line(fragment).is_none() {
            append_line(&mut self.evidence, fragment);
        } else {
            let neutral = fragment
                .split('\n')
                .map(|line| {
                    if is_reserved_line(line) {
                        format!(" {line}")
                    } else {
                        line.to_owned()
                    }
                })
                .collect::<Vec<_>>()
                .join("\n");
            append_line(&mut self.evidence, &neutral);
        }
        self.touch(clock);
    }

    /// Records the permanent tracker linkage for this question.
    ///
    /// Re-linking the same reference is a no-op so that a resumed sync run
    /// is idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`ReportDomainError::TaskRefReassigned`] when a different
    /// reference is already linked.
    pub fn link_task(
        &mut self,
        task_ref: TaskRef,
        clock: &impl Clock,
    ) -> Result<(), ReportDomainError> {
        match &self.task_ref {
            Some(existing) if *existing == task_ref => Ok(()),
            Some(existing) => Err(ReportDomainError::TaskRefReassigned {
                id: self.id.clone(),
                existing: existing.clone(),
                requested: task_ref,
            }),
            None => {
                self.task_ref = Some(task_ref);
                self.touch(clock);
                Ok(())
            }
        }
    }

    /// Advances `last_updated`, keeping it monotonically non-decreasing
    /// even if the wall clock steps backwards between runs.
    fn touch(&mut self, clock: &impl Clock) {
        self.last_updated = self.last_updated.max(report_timestamp(clock));
    }
}

/// Reads the clock at the second precision the report format stores, so a
/// written entry parses back to an equal value.
fn report_timestamp(clock: &impl Clock) -> DateTime<Utc> {
    let now = clock.utc();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Appends `fragment` to `target` as a new line, separating it from
/// existing content without disturbing existing bytes.
fn append_line(target: &mut String, fragment: &str) {
    if !target.is_empty() && !target.ends_with('\n') {
        target.push('\n');
    }
    target.push_str(fragment);
}
