//! Task tracker client: create/read/update tracked tasks and poll for
//! status transitions.

mod http;
mod poll;

pub use http::HttpTaskTracker;
pub use poll::{poll_until, PollOutcome, DEFAULT_POLL_RETRIES, POLL_INTERVAL};

use crate::core::{TaskEvent, TaskStatus};
use crate::errors::OrchestratorError;
use async_trait::async_trait;
use std::fmt::Debug;

/// The caller name reported to the tracker on every request.
pub const CALLER: &str = "stagehand";

/// Protocol surface of the external task-tracking service.
///
/// The orchestrator only ever reads or writes task records through this
/// trait; it never owns them.
#[async_trait]
pub trait TaskTracker: Send + Sync + Debug {
    /// Requests a fresh task identifier for this run.
    async fn request_task(
        &self,
        run_id: &str,
        project: &str,
    ) -> Result<String, OrchestratorError>;

    /// Fetches the task's event log, oldest first.
    async fn task_events(&self, task_id: &str) -> Result<Vec<TaskEvent>, OrchestratorError>;

    /// Appends a status update to the task and returns its id.
    async fn update_task(
        &self,
        task_id: &str,
        status: TaskStatus,
        message: &str,
    ) -> Result<String, OrchestratorError>;

    /// Asks whether an artifact with this content hash is already stored.
    ///
    /// Returns the stored artifact's uri on a hit, `None` on a miss.
    async fn artifact_uri_for_hash(
        &self,
        hash: &str,
    ) -> Result<Option<String>, OrchestratorError>;
}
