//! Assessment orchestrator.
//!
//! Composes the codec, the merge engine, and the sync engine behind the
//! operations the CLI exposes. Every operation is a scoped
//! read-modify-write through the store port, and every operation is safe
//! to re-run: initialisation skips existing reports, merges are gated by
//! the evidence ledger, and sync is gated by the permanent linkage map.

use crate::assessment::domain::{
    attribution_notice, pillar_url, short_title, AssessmentDomainError, Catalog, EvidenceBundle,
    Inventory, ScannerOutcome,
};
use crate::assessment::ports::{
    AssessmentStore, CatalogError, EvidenceScanner, StoreError, TaskTracker,
};
use crate::assessment::services::{
    EvidenceMergeService, MergeOptions, MergeOutcome, SyncAction, SyncReport, TaskSyncService,
};
use crate::report::codec::{self, SchemaError};
use crate::report::domain::{
    validate, Confidence, PillarId, PillarReport, QuestionEntry, QuestionId, QuestionStatus,
    ReportDomainError, TransitionCause, Violation,
};
use camino::Utf8Path;
use mockable::Clock;
use std::sync::Arc;
use tracing::{info, warn};

/// Result type for orchestrator operations.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

/// Errors that abort an orchestrator operation outright.
///
/// Per-entry problems never surface here; they are collected in the
/// operation's [`RunSummary`] so one bad entry cannot block the rest.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OrchestratorError {
    /// Durable storage failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The catalogue cache could not be loaded.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// A report file deviates from the fixed schema.
    #[error("report for pillar '{pillar}' failed to parse: {source}")]
    Schema {
        /// Pillar whose report is malformed.
        pillar: PillarId,
        /// The schema diagnostic.
        source: SchemaError,
    },

    /// A domain rule rejected the requested mutation.
    #[error(transparent)]
    Domain(#[from] ReportDomainError),

    /// The linkage map rejected the requested mutation.
    #[error(transparent)]
    Linkage(#[from] AssessmentDomainError),

    /// `apply-evidence` was invoked before any `scan-evidence` run.
    #[error("no evidence bundle found; run scan-evidence first")]
    NoEvidence,

    /// The named pillar has no report file.
    #[error("no report exists for pillar '{0}'")]
    UnknownPillar(PillarId),

    /// The named question is not present in the pillar's report.
    #[error("question '{0}' not found in the report")]
    UnknownQuestion(QuestionId),
}

/// A per-entry problem recorded while the operation continued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationFailure {
    /// Pillar the failure occurred in, when known.
    pub pillar: Option<PillarId>,
    /// Question the failure concerns, when known.
    pub question: Option<QuestionId>,
    /// Human-readable diagnostic.
    pub message: String,
}

/// Counts and failures for one orchestrator operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Entries (or reports) the operation mutated.
    pub changed: usize,
    /// Entries (or reports) already in the desired state.
    pub unchanged: usize,
    /// Per-entry problems the operation skipped over.
    pub failures: Vec<OperationFailure>,
}

impl RunSummary {
    /// Whether the operation completed without per-entry failures.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, pillar: Option<&PillarId>, question: Option<&QuestionId>, message: String) {
        self.failures.push(OperationFailure {
            pillar: pillar.cloned(),
            question: question.cloned(),
            message,
        });
    }
}

/// The status an operator may record for a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordedStatus {
    /// A complete human answer; requires non-empty answer text.
    Answered,
    /// The question needs further human input.
    NeedsHuman,
    /// The flagged input arrived but the answer is still incomplete.
    Partial,
}

/// One open question in the `list-unanswered` view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnansweredEntry {
    /// Pillar the question belongs to.
    pub pillar: PillarId,
    /// Question identifier.
    pub question: QuestionId,
    /// Short question title.
    pub title: String,
    /// Current lifecycle status.
    pub status: QuestionStatus,
    /// Open questions recorded for the interviewee, empty when none.
    pub human_questions: String,
}

/// Assessment orchestrator over store and tracker ports.
pub struct AssessmentService<S, T, C>
where
    S: AssessmentStore,
    T: TaskTracker,
    C: Clock + Send + Sync,
{
    assessment: String,
    store: Arc<S>,
    merge: EvidenceMergeService<C>,
    sync: TaskSyncService<T, C>,
    clock: Arc<C>,
}

impl<S, T, C> AssessmentService<S, T, C>
where
    S: AssessmentStore,
    T: TaskTracker,
    C: Clock + Send + Sync,
{
    /// Creates an orchestrator for one named assessment.
    #[must_use]
    pub fn new(assessment: impl Into<String>, store: Arc<S>, tracker: Arc<T>, clock: Arc<C>) -> Self {
        Self {
            assessment: assessment.into(),
            store,
            merge: EvidenceMergeService::new(Arc::clone(&clock)),
            sync: TaskSyncService::new(tracker, Arc::clone(&clock)),
            clock,
        }
    }

    /// Creates one report per catalogue pillar and one tracker task per
    /// question, then writes the assessment index.
    ///
    /// Re-running skips pillars whose report already exists and questions
    /// that are already linked, so a crashed initialisation resumes where
    /// it stopped.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Store`] on storage failure; tracker
    /// failures are collected per entry in the summary.
    pub async fn initialize(&self, catalog: &Catalog) -> OrchestratorResult<RunSummary> {
        let mut summary = RunSummary::default();
        for pillar in catalog.pillars() {
            if self.store.read_report(&pillar).await?.is_some() {
                summary.unchanged += 1;
                continue;
            }
            let report = self.scaffold_report(&pillar, catalog);
            self.store
                .write_report(&pillar, &codec::serialize(&report))
                .await?;
            info!(pillar = %pillar, entries = report.entries().len(), "report created");
            summary.changed += 1;
        }
        self.write_index().await?;

        let (sync, sync_summary) = self.sync_tasks().await?;
        for record in &sync.records {
            for action in &record.actions {
                if let SyncAction::Failed { error } = action {
                    summary.fail(Some(&record.pillar), Some(&record.question), error.clone());
                }
            }
        }
        summary.failures.extend(sync_summary.failures);
        Ok(summary)
    }

    fn scaffold_report(&self, pillar: &PillarId, catalog: &Catalog) -> PillarReport {
        let url = pillar_url(pillar);
        let preamble = format!(
            "# {} Pillar\n\nAssessment: {}\n\n{}\n\n",
            pillar.title(),
            self.assessment,
            attribution_notice(&url),
        );
        let mut report = PillarReport::new(pillar.clone(), preamble, String::new());
        for question in catalog.for_pillar(pillar) {
            report.push_entry(QuestionEntry::new(
                question.id.clone(),
                short_title(&question.text),
                question.text.clone(),
                &*self.clock,
            ));
        }
        report
    }

    /// Gathers evidence for the target tree: the inventory plus each named
    /// scanner, recording unavailable scanners as missing. Persists the
    /// resulting bundle for later `apply_evidence` runs.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Store`] when the bundle cannot be
    /// persisted; individual scanner failures are collected in the summary
    /// and the scanner treated as missing.
    pub async fn scan_evidence(
        &self,
        inventory: Inventory,
        scanners: &[Arc<dyn EvidenceScanner>],
        target: &Utf8Path,
    ) -> OrchestratorResult<(EvidenceBundle, RunSummary)> {
        let mut summary = RunSummary::default();
        let mut bundle = EvidenceBundle {
            inventory,
            ..EvidenceBundle::default()
        };
        for scanner in scanners {
            let name = scanner.name().to_owned();
            if !scanner.available().await {
                info!(scanner = %name, "scanner not available");
                bundle.scanners.insert(name, ScannerOutcome::Missing);
                continue;
            }
            match scanner.collect(target).await {
                Ok(output) => {
                    bundle.scanners.insert(name, ScannerOutcome::Ok { output });
                    summary.changed += 1;
                }
                Err(err) => {
                    warn!(scanner = %name, error = %err, "scanner failed");
                    summary.fail(None, None, err.to_string());
                    bundle.scanners.insert(name, ScannerOutcome::Missing);
                }
            }
        }
        self.store.write_evidence(&bundle).await?;
        Ok((bundle, summary))
    }

    /// Merges the persisted evidence bundle into every pillar report.
    ///
    /// Each block (and each skip note for a missing scanner) is gated by
    /// the fingerprint ledger, so re-running with the same bundle changes
    /// no bytes. Reports are rewritten only when an entry actually changed.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::NoEvidence`] before any scan, and
    /// [`OrchestratorError::Schema`] when a report fails to parse.
    pub async fn apply_evidence(&self, options: MergeOptions) -> OrchestratorResult<RunSummary> {
        let bundle = self
            .store
            .read_evidence()
            .await?
            .ok_or(OrchestratorError::NoEvidence)?;
        let mut ledger = self.store.read_ledger().await?.unwrap_or_default();
        let blocks = bundle.blocks();
        let missing = bundle.missing_sources();

        let mut summary = RunSummary::default();
        for pillar in self.store.list_pillars().await? {
            let mut report = match self.load_report(&pillar).await {
                Ok(report) => report,
                Err(err @ OrchestratorError::Schema { .. }) => {
                    warn!(pillar = %pillar, error = %err, "skipping malformed report");
                    summary.fail(Some(&pillar), None, err.to_string());
                    continue;
                }
                Err(err) => return Err(err),
            };
            let before = codec::serialize(&report);
            for entry in report.entries_mut() {
                let mut touched = false;
                for block in &blocks {
                    match self.merge.apply(entry, block, &mut ledger, options) {
                        Ok(MergeOutcome::Applied { .. }) => touched = true,
                        Ok(MergeOutcome::Duplicate) => {}
                        Err(err) => {
                            summary.fail(Some(&pillar), Some(entry.id()), err.to_string());
                        }
                    }
                }
                for source in &missing {
                    if self.merge.note_unavailable(entry, source, &mut ledger)
                        != MergeOutcome::Duplicate
                    {
                        touched = true;
                    }
                }
                if touched {
                    summary.changed += 1;
                } else {
                    summary.unchanged += 1;
                }
            }
            let after = codec::serialize(&report);
            if after != before {
                self.store.write_report(&pillar, &after).await?;
            }
        }
        self.store.write_ledger(&ledger).await?;

        // Push the status changes the merge produced out to the tracker.
        let (_, sync_summary) = self.sync_tasks().await?;
        summary.failures.extend(sync_summary.failures);
        self.write_index().await?;
        Ok(summary)
    }

    /// Lists every question not yet `answered`, in pillar and report order.
    ///
    /// A pillar whose report fails to parse is skipped and surfaced in the
    /// summary alongside the listing, so one corrupt file never hides the
    /// open questions of the remaining pillars.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Store`] when a report cannot be read.
    pub async fn list_unanswered(
        &self,
    ) -> OrchestratorResult<(Vec<UnansweredEntry>, RunSummary)> {
        let mut open = Vec::new();
        let mut summary = RunSummary::default();
        for pillar in self.store.list_pillars().await? {
            let report = match self.load_report(&pillar).await {
                Ok(report) => report,
                Err(err @ OrchestratorError::Schema { .. }) => {
                    warn!(pillar = %pillar, error = %err, "skipping malformed report");
                    summary.fail(Some(&pillar), None, err.to_string());
                    continue;
                }
                Err(err) => return Err(err),
            };
            for entry in report.entries() {
                if entry.status() != QuestionStatus::Answered {
                    open.push(UnansweredEntry {
                        pillar: pillar.clone(),
                        question: entry.id().clone(),
                        title: entry.title().to_owned(),
                        status: entry.status(),
                        human_questions: entry.human_questions().to_owned(),
                    });
                }
            }
        }
        Ok((open, summary))
    }

    /// Records a human decision for one question, then syncs that entry's
    /// task.
    ///
    /// `Answered` requires non-empty answer text; `NeedsHuman` records the
    /// text as an open question for the interviewee; `Partial` resolves a
    /// `needs_human` flag whose input arrived incomplete. Tracker failures
    /// during the follow-up sync are returned in the summary; the recorded
    /// answer is durable regardless.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::UnknownQuestion`] when the question is
    /// absent and [`OrchestratorError::Domain`] when the state machine
    /// rejects the move.
    pub async fn record_answer(
        &self,
        pillar: &PillarId,
        question: &QuestionId,
        status: RecordedStatus,
        confidence: Confidence,
        text: Option<&str>,
    ) -> OrchestratorResult<RunSummary> {
        let mut report = self.load_report(pillar).await?;
        let entry = report
            .entry_mut(question)
            .ok_or_else(|| OrchestratorError::UnknownQuestion(question.clone()))?;
        match status {
            RecordedStatus::Answered => {
                entry.record_answer(text.unwrap_or(""), confidence, &*self.clock)?;
            }
            RecordedStatus::NeedsHuman => {
                entry.flag_needs_human(text, &*self.clock)?;
            }
            RecordedStatus::Partial => {
                entry.transition_to(QuestionStatus::Partial, TransitionCause::FlagResolved, &*self.clock)?;
            }
        }
        info!(pillar = %pillar, question = %question, status = %entry.status(), "answer recorded");

        let mut linkage = self.store.read_linkage().await?.unwrap_or_default();
        let mut summary = RunSummary::default();
        if let Some(entry) = report.entry_mut(question) {
            let record = self.sync.sync_entry(pillar, entry, &mut linkage).await;
            if record.mutated() {
                self.store.write_linkage(&linkage).await?;
            }
            for action in &record.actions {
                if let SyncAction::Failed { error } = action {
                    summary.fail(Some(pillar), Some(question), error.clone());
                }
            }
        }
        summary.changed = 1;
        self.store
            .write_report(pillar, &codec::serialize(&report))
            .await?;
        self.write_index().await?;
        Ok(summary)
    }

    /// Reconciles every entry with the task tracker.
    ///
    /// The linkage map is persisted after every entry that mutated, so an
    /// interrupted run loses at most the in-flight entry and a re-run
    /// continues without duplicating tasks.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Store`] on storage failure; tracker
    /// failures are recorded per entry and malformed pillar reports are
    /// skipped and reported in the summary.
    pub async fn sync_tasks(&self) -> OrchestratorResult<(SyncReport, RunSummary)> {
        let mut linkage = self.store.read_linkage().await?.unwrap_or_default();
        let mut sync_report = SyncReport::default();
        let mut summary = RunSummary::default();
        for pillar in self.store.list_pillars().await? {
            let mut report = match self.load_report(&pillar).await {
                Ok(report) => report,
                Err(err @ OrchestratorError::Schema { .. }) => {
                    warn!(pillar = %pillar, error = %err, "skipping malformed report");
                    summary.fail(Some(&pillar), None, err.to_string());
                    continue;
                }
                Err(err) => return Err(err),
            };
            let before = codec::serialize(&report);
            for entry in report.entries_mut() {
                let record = self.sync.sync_entry(&pillar, entry, &mut linkage).await;
                if record.mutated() {
                    self.store.write_linkage(&linkage).await?;
                }
                sync_report.records.push(record);
            }
            let after = codec::serialize(&report);
            if after != before {
                self.store.write_report(&pillar, &after).await?;
            }
        }
        info!(
            created = sync_report.created(),
            closed = sync_report.closed(),
            reopened = sync_report.reopened(),
            conflicts = sync_report.conflicts(),
            failures = sync_report.failures(),
            "sync complete"
        );
        Ok((sync_report, summary))
    }

    /// Validates every pillar report against the data-model invariants and
    /// the permanence of all previously observed task linkages.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Store`] on storage failure. A report
    /// that fails to parse is itself an invariant violation; it is reported
    /// in the summary and the remaining pillars are still validated.
    pub async fn validate_assessment(
        &self,
    ) -> OrchestratorResult<(Vec<(PillarId, Violation)>, RunSummary)> {
        let linkage = self.store.read_linkage().await?.unwrap_or_default();
        let expected = linkage.task_refs();
        let mut violations = Vec::new();
        let mut summary = RunSummary::default();
        for pillar in self.store.list_pillars().await? {
            let report = match self.load_report(&pillar).await {
                Ok(report) => report,
                Err(err @ OrchestratorError::Schema { .. }) => {
                    summary.fail(Some(&pillar), None, err.to_string());
                    continue;
                }
                Err(err) => return Err(err),
            };
            for violation in validate(&report, &expected) {
                violations.push((pillar.clone(), violation));
            }
        }
        Ok((violations, summary))
    }

    async fn load_report(&self, pillar: &PillarId) -> OrchestratorResult<PillarReport> {
        let text = self
            .store
            .read_report(pillar)
            .await?
            .ok_or_else(|| OrchestratorError::UnknownPillar(pillar.clone()))?;
        codec::parse(pillar.clone(), &text).map_err(|source| OrchestratorError::Schema {
            pillar: pillar.clone(),
            source,
        })
    }

    /// Rewrites the index document summarising answer progress per pillar.
    /// Malformed reports are left out of the index rather than blocking it.
    async fn write_index(&self) -> OrchestratorResult<()> {
        let mut lines = vec![format!("# Assessment: {}", self.assessment), String::new()];
        for pillar in self.store.list_pillars().await? {
            let report = match self.load_report(&pillar).await {
                Ok(report) => report,
                Err(OrchestratorError::Schema { .. } | OrchestratorError::UnknownPillar(_)) => {
                    continue;
                }
                Err(err) => return Err(err),
            };
            let total = report.entries().len();
            let answered = report
                .entries()
                .iter()
                .filter(|entry| entry.status() == QuestionStatus::Answered)
                .count();
            lines.push(format!(
                "- [{}]({}.md): {answered}/{total} answered",
                pillar.title(),
                pillar.as_str(),
            ));
        }
        lines.push(String::new());
        self.store.write_index(&lines.join("\n")).await?;
        Ok(())
    }
}
