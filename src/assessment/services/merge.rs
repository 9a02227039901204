//! Evidence merge engine.
//!
//! Applies machine-gathered evidence to question entries without ever
//! touching human-authored fields. Every application is fingerprinted in
//! the ledger, so re-running a merge with identical evidence is a no-op and
//! report bytes stay stable.

use crate::assessment::domain::{EvidenceBlock, EvidenceFingerprint, EvidenceLedger};
use crate::report::domain::{
    QuestionEntry, QuestionStatus, ReportDomainError, TransitionCause,
};
use mockable::Clock;
use std::sync::Arc;
use tracing::debug;

/// Caller policy for one merge pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// Regress an `answered` entry to `partial` when new evidence arrives.
    /// Off by default: regression is an explicit human decision.
    pub reopen_answered: bool,
}

/// Result of applying one evidence block or skip note to one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The block was appended and recorded in the ledger.
    Applied {
        /// Fingerprint recorded in the ledger.
        fingerprint: EvidenceFingerprint,
    },
    /// An identical block was already applied; nothing changed.
    Duplicate,
}

/// Evidence merge engine.
#[derive(Clone)]
pub struct EvidenceMergeService<C>
where
    C: Clock + Send + Sync,
{
    clock: Arc<C>,
}

impl<C> EvidenceMergeService<C>
where
    C: Clock + Send + Sync,
{
    /// Creates a merge engine with the given clock.
    #[must_use]
    pub const fn new(clock: Arc<C>) -> Self {
        Self { clock }
    }

    /// Applies one evidence block to one entry.
    ///
    /// New evidence is appended under a delimited marker, preserving all
    /// prior evidence for audit; `answer` and `human_questions` are never
    /// mutated. Status only advances `unanswered -> partial`; an
    /// `answered` entry keeps its status unless
    /// [`MergeOptions::reopen_answered`] is set.
    ///
    /// # Errors
    ///
    /// Returns [`ReportDomainError::InvalidTransition`] only if the status
    /// advance is rejected, which the guards above prevent in practice.
    pub fn apply(
        &self,
        entry: &mut QuestionEntry,
        block: &EvidenceBlock,
        ledger: &mut EvidenceLedger,
        options: MergeOptions,
    ) -> Result<MergeOutcome, ReportDomainError> {
        let fingerprint = block.fingerprint();
        if !ledger.record(entry.id(), fingerprint.clone()) {
            debug!(question = %entry.id(), source = block.source(), "evidence already applied");
            return Ok(MergeOutcome::Duplicate);
        }

        let marker = format!(
            "--- evidence: {} {} ---\n{}",
            block.source(),
            fingerprint.short(),
            block.body()
        );
        entry.append_evidence(&marker, &*self.clock);

        match entry.status() {
            QuestionStatus::Unanswered => {
                entry.transition_to(
                    QuestionStatus::Partial,
                    TransitionCause::EvidenceApplied,
                    &*self.clock,
                )?;
            }
            QuestionStatus::Answered if options.reopen_answered => {
                entry.transition_to(
                    QuestionStatus::Partial,
                    TransitionCause::Reopened,
                    &*self.clock,
                )?;
            }
            QuestionStatus::Partial | QuestionStatus::Answered | QuestionStatus::NeedsHuman => {}
        }

        debug!(question = %entry.id(), source = block.source(), "evidence applied");
        Ok(MergeOutcome::Applied { fingerprint })
    }

    /// Records that a named evidence source was unavailable, leaving the
    /// entry status untouched. The note itself is fingerprinted so a
    /// re-run does not duplicate it.
    pub fn note_unavailable(
        &self,
        entry: &mut QuestionEntry,
        source: &str,
        ledger: &mut EvidenceLedger,
    ) -> MergeOutcome {
        let note = format!("skipped: {source} not available");
        let fingerprint = EvidenceFingerprint::over(source, &note);
        if !ledger.record(entry.id(), fingerprint.clone()) {
            return MergeOutcome::Duplicate;
        }
        entry.append_evidence(&note, &*self.clock);
        MergeOutcome::Applied { fingerprint }
    }
}
