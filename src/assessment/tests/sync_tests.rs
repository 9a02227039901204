//! Sync engine tests: linkage permanence, close/reopen, conflict policy.

use super::{fresh_entry, pillar, FixedClock};
use crate::assessment::adapters::InMemoryTracker;
use crate::assessment::domain::{LinkageMap, PushedState};
use crate::assessment::ports::{TaskTracker, TrackerTaskStatus};
use crate::assessment::services::{SyncAction, TaskSyncService};
use crate::report::domain::{
    Confidence, QuestionStatus, TaskRef, TransitionCause,
};
use rstest::{fixture, rstest};
use std::sync::Arc;

struct Harness {
    tracker: Arc<InMemoryTracker>,
    service: TaskSyncService<InMemoryTracker, FixedClock>,
}

#[fixture]
fn harness() -> Harness {
    let tracker = Arc::new(InMemoryTracker::new());
    let service = TaskSyncService::new(Arc::clone(&tracker), Arc::new(FixedClock::base()));
    Harness { tracker, service }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn first_sync_creates_and_permanently_links(harness: Harness) {
    let mut entry = fresh_entry("SEC-1");
    let mut linkage = LinkageMap::new();

    let record = harness
        .service
        .sync_entry(&pillar("security"), &mut entry, &mut linkage)
        .await;

    assert!(matches!(record.actions.as_slice(), [SyncAction::Created { .. }]));
    let task_ref = entry.task_ref().expect("entry should be linked").clone();
    assert_eq!(
        linkage.link(entry.id()).map(|link| &link.task_ref),
        Some(&task_ref)
    );
    let task = harness.tracker.task(&task_ref).expect("task should exist");
    assert!(task.request.title.starts_with("SEC-1 "));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn resumed_sync_never_duplicates_tasks(harness: Harness) {
    let mut entry = fresh_entry("SEC-1");
    let mut linkage = LinkageMap::new();
    let security = pillar("security");

    harness
        .service
        .sync_entry(&security, &mut entry, &mut linkage)
        .await;
    let record = harness
        .service
        .sync_entry(&security, &mut entry, &mut linkage)
        .await;

    assert_eq!(record.actions, vec![SyncAction::Unchanged]);
    assert_eq!(harness.tracker.created(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn link_lost_from_report_is_restored_from_map(harness: Harness) {
    // Simulates the crash window where the map was persisted but the
    // report write never happened.
    let mut linked = fresh_entry("SEC-1");
    let mut linkage = LinkageMap::new();
    let security = pillar("security");
    harness
        .service
        .sync_entry(&security, &mut linked, &mut linkage)
        .await;
    let task_ref = linked.task_ref().expect("entry should be linked").clone();

    let mut entry = fresh_entry("SEC-1");
    harness
        .service
        .sync_entry(&security, &mut entry, &mut linkage)
        .await;

    assert_eq!(entry.task_ref(), Some(&task_ref));
    assert_eq!(harness.tracker.created(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn map_restored_from_report_is_marked_for_persistence(harness: Harness) {
    // The opposite crash window: the report was persisted but the map
    // write never happened. The repair must count as a mutation or the
    // restored map is silently dropped and the divergence recurs.
    let mut entry = fresh_entry("SEC-1");
    let mut linkage = LinkageMap::new();
    let security = pillar("security");
    harness
        .service
        .sync_entry(&security, &mut entry, &mut linkage)
        .await;
    let task_ref = entry.task_ref().expect("entry should be linked").clone();

    let mut lost = LinkageMap::new();
    let record = harness
        .service
        .sync_entry(&security, &mut entry, &mut lost)
        .await;

    assert!(record.actions.contains(&SyncAction::Relinked));
    assert!(record.mutated(), "restored map must be persisted");
    assert_eq!(lost.link(entry.id()).map(|link| &link.task_ref), Some(&task_ref));
    assert_eq!(harness.tracker.created(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn answered_entry_comments_answer_and_closes_task(harness: Harness) {
    let clock = FixedClock::base();
    let mut entry = fresh_entry("SEC-1");
    entry
        .record_answer("SSO via a central IdP.", Confidence::High, &clock)
        .expect("answer should record");
    let mut linkage = LinkageMap::new();
    let security = pillar("security");

    let record = harness
        .service
        .sync_entry(&security, &mut entry, &mut linkage)
        .await;

    assert!(matches!(
        record.actions.as_slice(),
        [SyncAction::Created { .. }, SyncAction::Commented, SyncAction::Closed]
    ));
    let task_ref = entry.task_ref().expect("entry should be linked");
    let task = harness.tracker.task(task_ref).expect("task should exist");
    assert_eq!(task.status, TrackerTaskStatus::Closed);
    assert_eq!(task.comments, vec!["SSO via a central IdP.".to_owned()]);
    assert_eq!(
        linkage.link(entry.id()).and_then(|link| link.last_pushed),
        Some(PushedState::Closed)
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn close_retry_does_not_repost_the_answer(harness: Harness) {
    let clock = FixedClock::base();
    let mut entry = fresh_entry("SEC-1");
    entry
        .record_answer("SSO via a central IdP.", Confidence::High, &clock)
        .expect("answer should record");
    let mut linkage = LinkageMap::new();
    let security = pillar("security");
    harness.tracker.fail_next_close();

    let record = harness
        .service
        .sync_entry(&security, &mut entry, &mut linkage)
        .await;

    assert!(matches!(
        record.actions.as_slice(),
        [SyncAction::Created { .. }, SyncAction::Commented, SyncAction::Failed { .. }]
    ));
    assert!(record.mutated(), "the posted comment must be persisted");
    assert_eq!(
        linkage.link(entry.id()).and_then(|link| link.last_pushed),
        Some(PushedState::Commented)
    );

    let record = harness
        .service
        .sync_entry(&security, &mut entry, &mut linkage)
        .await;

    assert_eq!(record.actions, vec![SyncAction::Closed]);
    let task_ref = entry.task_ref().expect("entry should be linked");
    let task = harness.tracker.task(task_ref).expect("task should exist");
    assert_eq!(task.status, TrackerTaskStatus::Closed);
    assert_eq!(task.comments.len(), 1, "answer must not be re-posted");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn already_closed_answered_entry_is_unchanged(harness: Harness) {
    let clock = FixedClock::base();
    let mut entry = fresh_entry("SEC-1");
    entry
        .record_answer("SSO via a central IdP.", Confidence::High, &clock)
        .expect("answer should record");
    let mut linkage = LinkageMap::new();
    let security = pillar("security");
    harness
        .service
        .sync_entry(&security, &mut entry, &mut linkage)
        .await;

    let record = harness
        .service
        .sync_entry(&security, &mut entry, &mut linkage)
        .await;

    assert_eq!(record.actions, vec![SyncAction::Unchanged]);
    let task_ref = entry.task_ref().expect("entry should be linked");
    let task = harness.tracker.task(task_ref).expect("task should exist");
    assert_eq!(task.comments.len(), 1, "answer must not be re-posted");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn regression_we_pushed_reopens_the_task(harness: Harness) {
    let clock = FixedClock::base();
    let mut entry = fresh_entry("SEC-1");
    entry
        .record_answer("SSO via a central IdP.", Confidence::High, &clock)
        .expect("answer should record");
    let mut linkage = LinkageMap::new();
    let security = pillar("security");
    harness
        .service
        .sync_entry(&security, &mut entry, &mut linkage)
        .await;
    entry
        .transition_to(QuestionStatus::Partial, TransitionCause::Reopened, &clock)
        .expect("explicit reopen should be legal");

    let record = harness
        .service
        .sync_entry(&security, &mut entry, &mut linkage)
        .await;

    assert_eq!(record.actions, vec![SyncAction::Reopened]);
    let task_ref = entry.task_ref().expect("entry should be linked");
    let task = harness.tracker.task(task_ref).expect("task should exist");
    assert_eq!(task.status, TrackerTaskStatus::Open);
    assert_eq!(
        linkage.link(entry.id()).and_then(|link| link.last_pushed),
        Some(PushedState::Reopened)
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn human_closure_is_a_conflict_not_a_reopen(harness: Harness) {
    let mut entry = fresh_entry("SEC-1");
    let mut linkage = LinkageMap::new();
    let security = pillar("security");
    harness
        .service
        .sync_entry(&security, &mut entry, &mut linkage)
        .await;
    let task_ref = entry.task_ref().expect("entry should be linked").clone();
    harness
        .tracker
        .force_status(&task_ref, TrackerTaskStatus::Closed);

    let record = harness
        .service
        .sync_entry(&security, &mut entry, &mut linkage)
        .await;

    assert!(matches!(record.actions.as_slice(), [SyncAction::Conflict { .. }]));
    let status = harness
        .tracker
        .get_status(&task_ref)
        .await
        .expect("status read should succeed");
    assert_eq!(status, TrackerTaskStatus::Closed, "human closure must stand");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn create_failure_is_recorded_and_leaves_entry_unlinked(harness: Harness) {
    harness.tracker.fail_creates(true);
    let mut entry = fresh_entry("SEC-1");
    let mut linkage = LinkageMap::new();

    let record = harness
        .service
        .sync_entry(&pillar("security"), &mut entry, &mut linkage)
        .await;

    assert!(matches!(record.actions.as_slice(), [SyncAction::Failed { .. }]));
    assert!(entry.task_ref().is_none());
    assert!(linkage.is_empty());

    // The next run succeeds and creates exactly one task.
    harness.tracker.fail_creates(false);
    harness
        .service
        .sync_entry(&pillar("security"), &mut entry, &mut linkage)
        .await;
    assert_eq!(harness.tracker.created(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn divergent_report_and_map_references_conflict(harness: Harness) {
    let mut entry = fresh_entry("SEC-1");
    let clock = FixedClock::base();
    entry
        .link_task(
            TaskRef::new("kanbus-human-edit").expect("valid ref"),
            &clock,
        )
        .expect("linking should succeed");
    let mut linkage = LinkageMap::new();
    linkage
        .record_link(
            entry.id().clone(),
            TaskRef::new("kanbus-mem-9999").expect("valid ref"),
        )
        .expect("recording should succeed");

    let record = harness
        .service
        .sync_entry(&pillar("security"), &mut entry, &mut linkage)
        .await;

    assert!(
        record
            .actions
            .iter()
            .any(|action| matches!(action, SyncAction::Conflict { .. })),
        "diverged linkage must surface as a conflict: {:?}",
        record.actions
    );
}
