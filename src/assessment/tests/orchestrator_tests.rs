//! Orchestrator tests: full operation flows over in-memory ports.

use super::{pillar, qid, sample_catalog, FixedClock};
use crate::assessment::adapters::{InMemoryStore, InMemoryTracker};
use crate::assessment::domain::{EvidenceBundle, Inventory, ScannerOutcome};
use crate::assessment::ports::AssessmentStore;
use crate::assessment::services::{
    AssessmentService, MergeOptions, OrchestratorError, RecordedStatus,
};
use crate::report::domain::{Confidence, QuestionStatus, ReportDomainError, Violation};
use rstest::{fixture, rstest};
use std::sync::Arc;

struct Harness {
    store: Arc<InMemoryStore>,
    tracker: Arc<InMemoryTracker>,
    service: AssessmentService<InMemoryStore, InMemoryTracker, FixedClock>,
}

#[fixture]
fn harness() -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let tracker = Arc::new(InMemoryTracker::new());
    let service = AssessmentService::new(
        "payments-api-20260830",
        Arc::clone(&store),
        Arc::clone(&tracker),
        Arc::new(FixedClock::base()),
    );
    Harness {
        store,
        tracker,
        service,
    }
}

fn sample_bundle() -> EvidenceBundle {
    let mut bundle = EvidenceBundle {
        inventory: Inventory {
            languages: vec![".rs".to_owned()],
            infra: vec!["terraform".to_owned()],
            ci: vec!["github-actions".to_owned()],
        },
        ..EvidenceBundle::default()
    };
    bundle
        .scanners
        .insert("semgrep".to_owned(), ScannerOutcome::Missing);
    bundle
}

// ── initialize ──────────────────────────────────────────────────────

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn initialize_scaffolds_reports_tasks_and_index(harness: Harness) {
    let summary = harness
        .service
        .initialize(&sample_catalog())
        .await
        .expect("initialize should succeed");

    assert_eq!(summary.changed, 2, "one report per catalogue pillar");
    assert!(summary.is_clean());
    let security = harness
        .store
        .report(&pillar("security"))
        .expect("security report should exist");
    assert!(security.starts_with("# Security Pillar\n"));
    assert!(security.contains("CC BY-SA 4.0"));
    assert!(security.contains("## SEC-1: "));
    assert!(security.contains("## SEC-2: "));
    assert_eq!(harness.tracker.created(), 3, "one task per question");
    let index = harness.store.index().expect("index should be written");
    assert!(index.contains("Security"));
    assert!(index.contains("0/2 answered"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn initialize_twice_is_idempotent(harness: Harness) {
    harness
        .service
        .initialize(&sample_catalog())
        .await
        .expect("first initialize should succeed");
    let first_security = harness.store.report(&pillar("security"));

    let summary = harness
        .service
        .initialize(&sample_catalog())
        .await
        .expect("second initialize should succeed");

    assert_eq!(summary.changed, 0);
    assert_eq!(summary.unchanged, 2);
    assert_eq!(harness.tracker.created(), 3, "no duplicate tasks");
    assert_eq!(harness.store.report(&pillar("security")), first_security);
}

// ── apply-evidence ──────────────────────────────────────────────────

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn apply_evidence_requires_a_prior_scan(harness: Harness) {
    harness
        .service
        .initialize(&sample_catalog())
        .await
        .expect("initialize should succeed");

    let result = harness.service.apply_evidence(MergeOptions::default()).await;

    assert!(matches!(result, Err(OrchestratorError::NoEvidence)));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn apply_evidence_twice_is_byte_stable(harness: Harness) {
    harness
        .service
        .initialize(&sample_catalog())
        .await
        .expect("initialize should succeed");
    harness
        .store
        .write_evidence(&sample_bundle())
        .await
        .expect("bundle write should succeed");

    let first = harness
        .service
        .apply_evidence(MergeOptions::default())
        .await
        .expect("first apply should succeed");
    let security_after_first = harness.store.report(&pillar("security"));
    let reliability_after_first = harness.store.report(&pillar("reliability"));

    let second = harness
        .service
        .apply_evidence(MergeOptions::default())
        .await
        .expect("second apply should succeed");

    assert_eq!(first.changed, 3, "every entry gains evidence");
    assert_eq!(second.changed, 0);
    assert_eq!(second.unchanged, 3);
    assert_eq!(harness.store.report(&pillar("security")), security_after_first);
    assert_eq!(
        harness.store.report(&pillar("reliability")),
        reliability_after_first
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn applied_evidence_advances_status_and_notes_missing_scanners(harness: Harness) {
    harness
        .service
        .initialize(&sample_catalog())
        .await
        .expect("initialize should succeed");
    harness
        .store
        .write_evidence(&sample_bundle())
        .await
        .expect("bundle write should succeed");

    harness
        .service
        .apply_evidence(MergeOptions::default())
        .await
        .expect("apply should succeed");

    let security = harness
        .store
        .report(&pillar("security"))
        .expect("security report should exist");
    assert!(security.contains("Status: partial"));
    assert!(security.contains("--- evidence: inventory "));
    assert!(security.contains("languages=.rs, infra=terraform, ci=github-actions"));
    assert!(security.contains("skipped: semgrep not available"));
}

// ── record-answer and list-unanswered ───────────────────────────────

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn recording_an_answer_shrinks_the_unanswered_list(harness: Harness) {
    harness
        .service
        .initialize(&sample_catalog())
        .await
        .expect("initialize should succeed");
    let (initial, _) = harness
        .service
        .list_unanswered()
        .await
        .expect("listing should succeed");
    assert_eq!(initial.len(), 3);

    harness
        .service
        .record_answer(
            &pillar("security"),
            &qid("SEC-1"),
            RecordedStatus::Answered,
            Confidence::High,
            Some("SSO via a central IdP."),
        )
        .await
        .expect("recording should succeed");

    let (open, _) = harness
        .service
        .list_unanswered()
        .await
        .expect("listing should succeed");
    assert_eq!(open.len(), 2);
    assert!(open.iter().all(|entry| entry.question != qid("SEC-1")));
    let index = harness.store.index().expect("index should be rewritten");
    assert!(index.contains("1/2 answered"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn empty_answer_is_rejected(harness: Harness) {
    harness
        .service
        .initialize(&sample_catalog())
        .await
        .expect("initialize should succeed");

    let result = harness
        .service
        .record_answer(
            &pillar("security"),
            &qid("SEC-1"),
            RecordedStatus::Answered,
            Confidence::High,
            Some("   "),
        )
        .await;

    assert!(matches!(
        result,
        Err(OrchestratorError::Domain(ReportDomainError::EmptyAnswer { .. }))
    ));
    let (open, _) = harness
        .service
        .list_unanswered()
        .await
        .expect("listing should succeed");
    assert_eq!(open.len(), 3, "nothing may change on rejection");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn needs_human_flag_records_the_open_question(harness: Harness) {
    harness
        .service
        .initialize(&sample_catalog())
        .await
        .expect("initialize should succeed");

    harness
        .service
        .record_answer(
            &pillar("security"),
            &qid("SEC-2"),
            RecordedStatus::NeedsHuman,
            Confidence::NotApplicable,
            Some("Which KMS keys cover the data lake?"),
        )
        .await
        .expect("flagging should succeed");

    let (open, _) = harness
        .service
        .list_unanswered()
        .await
        .expect("listing should succeed");
    let flagged = open
        .iter()
        .find(|entry| entry.question == qid("SEC-2"))
        .expect("SEC-2 should still be open");
    assert_eq!(flagged.status, QuestionStatus::NeedsHuman);
    assert_eq!(flagged.human_questions, "Which KMS keys cover the data lake?");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_question_is_reported(harness: Harness) {
    harness
        .service
        .initialize(&sample_catalog())
        .await
        .expect("initialize should succeed");

    let result = harness
        .service
        .record_answer(
            &pillar("security"),
            &qid("SEC-99"),
            RecordedStatus::Answered,
            Confidence::High,
            Some("text"),
        )
        .await;

    assert!(matches!(result, Err(OrchestratorError::UnknownQuestion(_))));
}

// ── sync-tasks ──────────────────────────────────────────────────────

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn recording_an_answer_closes_its_task(harness: Harness) {
    harness
        .service
        .initialize(&sample_catalog())
        .await
        .expect("initialize should succeed");
    harness
        .service
        .record_answer(
            &pillar("security"),
            &qid("SEC-1"),
            RecordedStatus::Answered,
            Confidence::High,
            Some("SSO via a central IdP."),
        )
        .await
        .expect("recording should succeed");

    let linkage = harness.store.linkage().expect("linkage should exist");
    let task_ref = linkage
        .link(&qid("SEC-1"))
        .expect("SEC-1 should be linked")
        .task_ref
        .clone();
    let task = harness.tracker.task(&task_ref).expect("task should exist");
    assert_eq!(task.status, crate::assessment::ports::TrackerTaskStatus::Closed);
    assert_eq!(task.comments, vec!["SSO via a central IdP.".to_owned()]);

    // A full sync afterwards is a no-op end to end.
    let (report, summary) = harness
        .service
        .sync_tasks()
        .await
        .expect("sync should succeed");
    assert_eq!(report.closed(), 0);
    assert_eq!(report.unchanged(), 3);
    assert!(summary.is_clean());
    assert_eq!(harness.tracker.created(), 3, "sync never re-creates");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn linkage_persists_after_every_mutating_entry(harness: Harness) {
    harness
        .service
        .initialize(&sample_catalog())
        .await
        .expect("initialize should succeed");

    assert_eq!(
        harness.store.linkage_writes(),
        3,
        "one write per linked entry bounds the crash window"
    );
    let linkage = harness.store.linkage().expect("linkage should be stored");
    assert_eq!(linkage.len(), 3);
}

// ── validate ────────────────────────────────────────────────────────

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn validate_passes_after_a_clean_flow(harness: Harness) {
    harness
        .service
        .initialize(&sample_catalog())
        .await
        .expect("initialize should succeed");

    let (violations, summary) = harness
        .service
        .validate_assessment()
        .await
        .expect("validation should run");

    assert!(violations.is_empty(), "unexpected violations: {violations:?}");
    assert!(summary.is_clean());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn validate_flags_a_cleared_task_linkage(harness: Harness) {
    harness
        .service
        .initialize(&sample_catalog())
        .await
        .expect("initialize should succeed");
    let security = pillar("security");
    let text = harness
        .store
        .report(&security)
        .expect("security report should exist");
    let linkage = harness.store.linkage().expect("linkage should exist");
    let task_ref = &linkage
        .link(&qid("SEC-1"))
        .expect("SEC-1 should be linked")
        .task_ref;
    let edited = text.replace(
        &format!("Kanbus Task: {task_ref}"),
        "Kanbus Task:",
    );
    harness
        .store
        .write_report(&security, &edited)
        .await
        .expect("report write should succeed");

    let (violations, _) = harness
        .service
        .validate_assessment()
        .await
        .expect("validation should run");

    assert!(violations.iter().any(|(p, violation)| {
        *p == security && matches!(violation, Violation::LinkageCleared { id, .. } if *id == qid("SEC-1"))
    }));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn malformed_pillar_is_skipped_and_reported(harness: Harness) {
    harness
        .service
        .initialize(&sample_catalog())
        .await
        .expect("initialize should succeed");
    harness
        .store
        .write_report(&pillar("security"), "## broken header without colon\n")
        .await
        .expect("report write should succeed");

    let (violations, summary) = harness
        .service
        .validate_assessment()
        .await
        .expect("validation should run");

    assert_eq!(summary.failures.len(), 1);
    assert_eq!(
        summary.failures.first().and_then(|f| f.pillar.clone()),
        Some(pillar("security"))
    );
    // The reliability pillar was still validated.
    assert!(violations.iter().all(|(p, _)| *p != pillar("security")));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn listing_survives_a_malformed_pillar(harness: Harness) {
    harness
        .service
        .initialize(&sample_catalog())
        .await
        .expect("initialize should succeed");
    harness
        .store
        .write_report(&pillar("security"), "## broken header without colon\n")
        .await
        .expect("report write should succeed");

    let (open, summary) = harness
        .service
        .list_unanswered()
        .await
        .expect("listing should succeed");

    assert!(open.iter().any(|entry| entry.question == qid("REL-1")));
    assert!(open.iter().all(|entry| entry.pillar != pillar("security")));
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(
        summary.failures.first().and_then(|f| f.pillar.clone()),
        Some(pillar("security"))
    );
}
