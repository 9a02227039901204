//! In-memory port implementations.
//!
//! Deterministic fakes for the store, tracker, and catalogue ports. They
//! back the service tests and double as a dry-run mode: the tracker hands
//! out sequential identifiers and records every comment, and both fakes
//! support failure injection.

use crate::assessment::domain::{Catalog, EvidenceBundle, EvidenceLedger, LinkageMap};
use crate::assessment::ports::{
    AssessmentStore, CatalogError, CatalogResult, CatalogSource, CreateTaskRequest, StoreError,
    StoreResult, TaskTracker, TrackerError, TrackerResult, TrackerTaskStatus,
};
use crate::report::domain::{PillarId, TaskRef};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

/// One task held by the in-memory tracker.
#[derive(Debug, Clone)]
pub struct TrackedTask {
    /// The create request that produced the task.
    pub request: CreateTaskRequest,
    /// Current task status.
    pub status: TrackerTaskStatus,
    /// Comments in arrival order.
    pub comments: Vec<String>,
}

#[derive(Debug, Default)]
struct TrackerState {
    tasks: BTreeMap<TaskRef, TrackedTask>,
    next_id: u32,
    fail_creates: bool,
    fail_next_close: bool,
}

/// In-memory [`TaskTracker`] issuing sequential `kanbus-mem-NNNN` ids.
#[derive(Debug, Default)]
pub struct InMemoryTracker {
    state: Mutex<TrackerState>,
}

impl InMemoryTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes every subsequent `create_task` fail as unavailable.
    pub fn fail_creates(&self, fail: bool) {
        self.state().fail_creates = fail;
    }

    /// Makes the next `close` fail as unavailable, simulating a transient
    /// tracker fault between a posted comment and its close.
    pub fn fail_next_close(&self) {
        self.state().fail_next_close = true;
    }

    /// Forces a task status, simulating a human acting in the tracker.
    pub fn force_status(&self, task: &TaskRef, status: TrackerTaskStatus) {
        if let Some(tracked) = self.state().tasks.get_mut(task) {
            tracked.status = status;
        }
    }

    /// Returns a snapshot of one task, if it exists.
    #[must_use]
    pub fn task(&self, task: &TaskRef) -> Option<TrackedTask> {
        self.state().tasks.get(task).cloned()
    }

    /// Number of tasks ever created.
    #[must_use]
    pub fn created(&self) -> usize {
        self.state().tasks.len()
    }
}

#[async_trait]
impl TaskTracker for InMemoryTracker {
    async fn create_task(&self, request: &CreateTaskRequest) -> TrackerResult<TaskRef> {
        let mut state = self.state();
        if state.fail_creates {
            return Err(TrackerError::unavailable(std::io::Error::other(
                "tracker offline",
            )));
        }
        state.next_id += 1;
        let task_ref = TaskRef::new(format!("kanbus-mem-{:04}", state.next_id))
            .map_err(|err| TrackerError::Protocol(err.to_string()))?;
        state.tasks.insert(
            task_ref.clone(),
            TrackedTask {
                request: request.clone(),
                status: TrackerTaskStatus::Open,
                comments: Vec::new(),
            },
        );
        Ok(task_ref)
    }

    async fn get_status(&self, task: &TaskRef) -> TrackerResult<TrackerTaskStatus> {
        self.state()
            .tasks
            .get(task)
            .map(|tracked| tracked.status)
            .ok_or_else(|| TrackerError::NotFound(task.clone()))
    }

    async fn close(&self, task: &TaskRef) -> TrackerResult<()> {
        if std::mem::take(&mut self.state().fail_next_close) {
            return Err(TrackerError::unavailable(std::io::Error::other(
                "tracker offline",
            )));
        }
        self.set_status(task, TrackerTaskStatus::Closed)
    }

    async fn reopen(&self, task: &TaskRef) -> TrackerResult<()> {
        self.set_status(task, TrackerTaskStatus::Open)
    }

    async fn comment(&self, task: &TaskRef, text: &str) -> TrackerResult<()> {
        self.state()
            .tasks
            .get_mut(task)
            .map(|tracked| tracked.comments.push(text.to_owned()))
            .ok_or_else(|| TrackerError::NotFound(task.clone()))
    }
}

impl InMemoryTracker {
    fn set_status(&self, task: &TaskRef, status: TrackerTaskStatus) -> TrackerResult<()> {
        self.state()
            .tasks
            .get_mut(task)
            .map(|tracked| tracked.status = status)
            .ok_or_else(|| TrackerError::NotFound(task.clone()))
    }
}

#[derive(Debug, Default)]
struct StoreState {
    reports: BTreeMap<PillarId, String>,
    linkage: Option<LinkageMap>,
    ledger: Option<EvidenceLedger>,
    evidence: Option<EvidenceBundle>,
    index: Option<String>,
    linkage_writes: usize,
    fail_writes: bool,
}

/// In-memory [`AssessmentStore`].
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes every subsequent write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.state().fail_writes = fail;
    }

    fn check_writable(&self, path: &str) -> StoreResult<()> {
        if self.state().fail_writes {
            return Err(StoreError::io(
                path,
                std::io::Error::other("write rejected"),
            ));
        }
        Ok(())
    }

    /// Returns one stored report text, if present.
    #[must_use]
    pub fn report(&self, pillar: &PillarId) -> Option<String> {
        self.state().reports.get(pillar).cloned()
    }

    /// Returns the stored linkage map, if written.
    #[must_use]
    pub fn linkage(&self) -> Option<LinkageMap> {
        self.state().linkage.clone()
    }

    /// Returns the stored index document, if written.
    #[must_use]
    pub fn index(&self) -> Option<String> {
        self.state().index.clone()
    }

    /// Number of linkage writes observed, for crash-window assertions.
    #[must_use]
    pub fn linkage_writes(&self) -> usize {
        self.state().linkage_writes
    }
}

#[async_trait]
impl AssessmentStore for InMemoryStore {
    async fn list_pillars(&self) -> StoreResult<Vec<PillarId>> {
        let mut pillars: Vec<PillarId> = self.state().reports.keys().cloned().collect();
        pillars.sort_by(|a, b| a.canonical_rank().cmp(&b.canonical_rank()));
        Ok(pillars)
    }

    async fn read_report(&self, pillar: &PillarId) -> StoreResult<Option<String>> {
        Ok(self.state().reports.get(pillar).cloned())
    }

    async fn write_report(&self, pillar: &PillarId, text: &str) -> StoreResult<()> {
        self.check_writable(pillar.as_str())?;
        self.state().reports.insert(pillar.clone(), text.to_owned());
        Ok(())
    }

    async fn read_linkage(&self) -> StoreResult<Option<LinkageMap>> {
        Ok(self.state().linkage.clone())
    }

    async fn write_linkage(&self, linkage: &LinkageMap) -> StoreResult<()> {
        self.check_writable("kanbus-map.json")?;
        let mut state = self.state();
        state.linkage = Some(linkage.clone());
        state.linkage_writes += 1;
        Ok(())
    }

    async fn read_ledger(&self) -> StoreResult<Option<EvidenceLedger>> {
        Ok(self.state().ledger.clone())
    }

    async fn write_ledger(&self, ledger: &EvidenceLedger) -> StoreResult<()> {
        self.check_writable("evidence-ledger.json")?;
        self.state().ledger = Some(ledger.clone());
        Ok(())
    }

    async fn read_evidence(&self) -> StoreResult<Option<EvidenceBundle>> {
        Ok(self.state().evidence.clone())
    }

    async fn write_evidence(&self, bundle: &EvidenceBundle) -> StoreResult<()> {
        self.check_writable("evidence.json")?;
        self.state().evidence = Some(bundle.clone());
        Ok(())
    }

    async fn write_index(&self, text: &str) -> StoreResult<()> {
        self.check_writable("index.md")?;
        self.state().index = Some(text.to_owned());
        Ok(())
    }
}

/// In-memory [`CatalogSource`] serving a fixed catalogue.
#[derive(Debug, Clone)]
pub struct InMemoryCatalog {
    catalog: Option<Catalog>,
}

impl InMemoryCatalog {
    /// Serves the given catalogue.
    #[must_use]
    pub const fn new(catalog: Catalog) -> Self {
        Self {
            catalog: Some(catalog),
        }
    }

    /// Simulates a missing cache.
    #[must_use]
    pub const fn unfetched() -> Self {
        Self { catalog: None }
    }
}

#[async_trait]
impl CatalogSource for InMemoryCatalog {
    async fn load(&self) -> CatalogResult<Catalog> {
        self.catalog.clone().ok_or(CatalogError::NotFetched)
    }
}
