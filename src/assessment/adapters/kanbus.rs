//! Kanbus tracker adapter.
//!
//! Drives the `kanbus` CLI: `create` for new tasks, `console snapshot` for
//! status reads and short-to-full id resolution, `comment` for answers, and
//! `update --status` for close/reopen. The CLI prints a short id on create;
//! the snapshot is consulted to resolve the full one so the linkage map
//! stores stable references.

use crate::assessment::ports::{
    CreateTaskRequest, TaskTracker, TrackerError, TrackerResult, TrackerTaskStatus,
};
use crate::report::domain::TaskRef;
use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, warn};

const ID_PREFIX: &str = "ID: ";

/// A full Kanbus id carries at least this many hyphens; anything shorter
/// is a display abbreviation.
const FULL_ID_HYPHENS: usize = 5;

/// One issue record in a `kanbus console snapshot`.
#[derive(Debug, Deserialize)]
struct SnapshotIssue {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    created_at: String,
}

#[derive(Debug, Deserialize)]
struct Snapshot {
    #[serde(default)]
    issues: Vec<SnapshotIssue>,
}

/// [`TaskTracker`] backed by the Kanbus CLI.
#[derive(Debug, Clone)]
pub struct KanbusTracker {
    program: String,
}

impl KanbusTracker {
    /// Creates a tracker invoking the given binary name.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> TrackerResult<String> {
        debug!(program = %self.program, ?args, "invoking tracker");
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .await
            .map_err(TrackerError::unavailable)?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            return Ok(stdout);
        }
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        Err(TrackerError::Protocol(if stderr.trim().is_empty() {
            stdout
        } else {
            stderr
        }))
    }

    async fn snapshot(&self) -> TrackerResult<Snapshot> {
        let raw = self.run(&["console", "snapshot"]).await?;
        serde_json::from_str(&raw).map_err(|err| TrackerError::Protocol(err.to_string()))
    }

    /// Resolves a display-abbreviated id to the full one via the console
    /// snapshot, falling back to the short id when the snapshot is
    /// unavailable or ambiguous.
    async fn resolve_full_id(&self, short_id: &str, title: Option<&str>) -> String {
        if short_id.matches('-').count() >= FULL_ID_HYPHENS {
            return short_id.to_owned();
        }
        let Ok(snapshot) = self.snapshot().await else {
            return short_id.to_owned();
        };
        let mut candidates: Vec<&SnapshotIssue> = snapshot
            .issues
            .iter()
            .filter(|issue| issue.id.starts_with(short_id))
            .filter(|issue| title.is_none_or(|title| issue.title == title))
            .collect();
        candidates.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        candidates
            .last()
            .map_or_else(|| short_id.to_owned(), |issue| issue.id.clone())
    }

    async fn update_status(&self, task: &TaskRef, status: &str) -> TrackerResult<()> {
        match self
            .run(&["update", task.as_str(), "--status", status])
            .await
        {
            Ok(_) => Ok(()),
            // Already in the requested state; the operation is idempotent.
            Err(TrackerError::Protocol(message))
                if message.contains("no updates requested") =>
            {
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

#[async_trait]
impl TaskTracker for KanbusTracker {
    async fn create_task(&self, request: &CreateTaskRequest) -> TrackerResult<TaskRef> {
        let out = self
            .run(&["create", &request.title, "--type", "task"])
            .await?;
        let short_id = out
            .lines()
            .find_map(|line| line.split_once(ID_PREFIX).map(|(_, id)| id.trim()))
            .ok_or_else(|| {
                TrackerError::Protocol(format!("create output carries no task id: {out}"))
            })?;
        let full_id = self.resolve_full_id(short_id, Some(&request.title)).await;
        TaskRef::new(full_id).map_err(|err| TrackerError::Protocol(err.to_string()))
    }

    async fn get_status(&self, task: &TaskRef) -> TrackerResult<TrackerTaskStatus> {
        let snapshot = self.snapshot().await?;
        let issue = snapshot
            .issues
            .iter()
            .find(|issue| issue.id == task.as_str() || issue.id.starts_with(task.as_str()))
            .ok_or_else(|| TrackerError::NotFound(task.clone()))?;
        Ok(match issue.status.as_str() {
            "closed" | "done" => TrackerTaskStatus::Closed,
            _ => TrackerTaskStatus::Open,
        })
    }

    async fn close(&self, task: &TaskRef) -> TrackerResult<()> {
        self.update_status(task, "closed").await
    }

    async fn reopen(&self, task: &TaskRef) -> TrackerResult<()> {
        match self.update_status(task, "open").await {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(task = %task, error = %err, "reopen failed");
                Err(err)
            }
        }
    }

    async fn comment(&self, task: &TaskRef, text: &str) -> TrackerResult<()> {
        self.run(&["comment", task.as_str(), text]).await.map(|_| ())
    }
}
