//! Mock remote-service clients that record calls and return scripted
//! responses.

use crate::config::RoutingRule;
use crate::core::{ArtifactRecord, TaskEvent, TaskStatus};
use crate::errors::OrchestratorError;
use crate::executor::JobExecutor;
use crate::storage::{ObjectStat, ObjectStore};
use crate::tracker::TaskTracker;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::path::Path;

/// A scripted task tracker.
///
/// Event responses can be queued one-shot per task (each fetch consumes
/// one) or kept sticky (returned whenever the queue is empty).
#[derive(Debug, Default)]
pub struct MockTracker {
    task_id_queue: Mutex<VecDeque<String>>,
    task_request_count: Mutex<usize>,
    event_queues: Mutex<HashMap<String, VecDeque<Vec<TaskEvent>>>>,
    sticky_events: Mutex<HashMap<String, Vec<TaskEvent>>>,
    event_fetch_count: Mutex<usize>,
    fail_event_fetches: Mutex<bool>,
    stored_hashes: Mutex<HashMap<String, String>>,
    updates: Mutex<Vec<(String, TaskStatus)>>,
}

impl MockTracker {
    /// Creates a tracker with no scripted responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a task id to hand out on the next `request_task`.
    pub fn queue_task_id(&self, task_id: impl Into<String>) {
        self.task_id_queue.lock().push_back(task_id.into());
    }

    /// Returns how many task ids were requested.
    #[must_use]
    pub fn task_requests(&self) -> usize {
        *self.task_request_count.lock()
    }

    /// Queues a one-shot event log response for a task.
    pub fn push_events(&self, task_id: &str, events: Vec<TaskEvent>) {
        self.event_queues
            .lock()
            .entry(task_id.to_string())
            .or_default()
            .push_back(events);
    }

    /// Sets the sticky event log returned once the queue is drained.
    pub fn keep_events(&self, task_id: &str, events: Vec<TaskEvent>) {
        self.sticky_events.lock().insert(task_id.to_string(), events);
    }

    /// Makes every event fetch fail with a remote-status error.
    pub fn fail_event_fetches(&self) {
        *self.fail_event_fetches.lock() = true;
    }

    /// Returns how many times the event log was fetched.
    #[must_use]
    pub fn event_fetches(&self) -> usize {
        *self.event_fetch_count.lock()
    }

    /// Registers a stored artifact hash for dedup lookups.
    pub fn store_hash(&self, hash: &str, uri: &str) {
        self.stored_hashes
            .lock()
            .insert(hash.to_string(), uri.to_string());
    }

    /// Returns the recorded task status updates.
    #[must_use]
    pub fn updates(&self) -> Vec<(String, TaskStatus)> {
        self.updates.lock().clone()
    }
}

#[async_trait]
impl TaskTracker for MockTracker {
    async fn request_task(
        &self,
        _run_id: &str,
        _project: &str,
    ) -> Result<String, OrchestratorError> {
        let mut count = self.task_request_count.lock();
        *count += 1;
        let scripted = self.task_id_queue.lock().pop_front();
        Ok(scripted.unwrap_or_else(|| format!("task-{}", *count)))
    }

    async fn task_events(&self, task_id: &str) -> Result<Vec<TaskEvent>, OrchestratorError> {
        *self.event_fetch_count.lock() += 1;
        if *self.fail_event_fetches.lock() {
            return Err(OrchestratorError::remote_status(
                format!("fetching events for task {task_id}"),
                500,
            ));
        }
        if let Some(events) = self
            .event_queues
            .lock()
            .get_mut(task_id)
            .and_then(VecDeque::pop_front)
        {
            return Ok(events);
        }
        Ok(self
            .sticky_events
            .lock()
            .get(task_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_task(
        &self,
        task_id: &str,
        status: TaskStatus,
        _message: &str,
    ) -> Result<String, OrchestratorError> {
        self.updates.lock().push((task_id.to_string(), status));
        Ok(task_id.to_string())
    }

    async fn artifact_uri_for_hash(
        &self,
        hash: &str,
    ) -> Result<Option<String>, OrchestratorError> {
        Ok(self.stored_hashes.lock().get(hash).cloned())
    }
}

/// A scripted object store recording every bucket, upload, listing, and
/// download.
#[derive(Debug, Default)]
pub struct MockObjectStore {
    buckets: Mutex<Vec<String>>,
    uploads: Mutex<Vec<(String, String)>>,
    listing: Mutex<Vec<String>>,
    downloads: Mutex<Vec<(String, String)>>,
}

impl MockObjectStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `(bucket, key)` pairs of uploaded objects.
    #[must_use]
    pub fn uploads(&self) -> Vec<(String, String)> {
        self.uploads.lock().clone()
    }

    /// Returns the buckets created.
    #[must_use]
    pub fn buckets(&self) -> Vec<String> {
        self.buckets.lock().clone()
    }

    /// Sets the keys returned by `list_objects`.
    pub fn keep_listing(&self, keys: Vec<String>) {
        *self.listing.lock() = keys;
    }

    /// Returns `(key, destination)` pairs of downloaded objects.
    #[must_use]
    pub fn downloads(&self) -> Vec<(String, String)> {
        self.downloads.lock().clone()
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn ensure_bucket(&self, bucket: &str) -> Result<(), OrchestratorError> {
        let mut buckets = self.buckets.lock();
        if !buckets.iter().any(|b| b == bucket) {
            buckets.push(bucket.to_string());
        }
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        _file_path: &Path,
    ) -> Result<ObjectStat, OrchestratorError> {
        self.uploads
            .lock()
            .push((bucket.to_string(), key.to_string()));
        Ok(ObjectStat {
            etag: Some("mock-etag".to_string()),
            last_modified: Some(crate::utils::iso_timestamp()),
        })
    }

    async fn stat_object(
        &self,
        _bucket: &str,
        _key: &str,
    ) -> Result<ObjectStat, OrchestratorError> {
        Ok(ObjectStat {
            etag: Some("mock-etag".to_string()),
            last_modified: Some(crate::utils::iso_timestamp()),
        })
    }

    async fn list_objects(
        &self,
        _bucket: &str,
        prefix: &str,
        _recursive: bool,
    ) -> Result<Vec<String>, OrchestratorError> {
        Ok(self
            .listing
            .lock()
            .iter()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn get_object_to_file(
        &self,
        _bucket: &str,
        key: &str,
        dest: &Path,
    ) -> Result<(), OrchestratorError> {
        self.downloads
            .lock()
            .push((key.to_string(), dest.to_string_lossy().into_owned()));
        Ok(())
    }
}

/// One recorded job submission.
#[derive(Debug, Clone)]
pub struct Submission {
    /// The endpoint the job was posted to.
    pub resource_url: String,
    /// The task id the job reports against.
    pub task_id: String,
    /// The routing rules shipped with the job.
    pub rules: Vec<RoutingRule>,
    /// The artifact manifest shipped with the job.
    pub artifacts: Vec<ArtifactRecord>,
}

/// A scripted job executor.
#[derive(Debug, Default)]
pub struct MockJobExecutor {
    submissions: Mutex<Vec<Submission>>,
    fail_status: Mutex<Option<u16>>,
}

impl MockJobExecutor {
    /// Creates an executor that accepts every submission.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every submission fail with the given HTTP status.
    pub fn fail_submissions(&self, status: u16) {
        *self.fail_status.lock() = Some(status);
    }

    /// Returns the recorded submissions.
    #[must_use]
    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().clone()
    }
}

#[async_trait]
impl JobExecutor for MockJobExecutor {
    async fn submit(
        &self,
        resource_url: &str,
        artifacts: &[ArtifactRecord],
        task_id: &str,
        rules: &[&RoutingRule],
    ) -> Result<(), OrchestratorError> {
        if let Some(status) = *self.fail_status.lock() {
            return Err(OrchestratorError::remote_status(
                format!("submitting job for task {task_id} to {resource_url}"),
                status,
            ));
        }
        self.submissions.lock().push(Submission {
            resource_url: resource_url.to_string(),
            task_id: task_id.to_string(),
            rules: rules.iter().map(|&r| r.clone()).collect(),
            artifacts: artifacts.to_vec(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tracker_hands_out_queued_then_generated_ids() {
        let tracker = MockTracker::new();
        tracker.queue_task_id("scripted");

        assert_eq!(tracker.request_task("run", "proj").await.unwrap(), "scripted");
        let generated = tracker.request_task("run", "proj").await.unwrap();
        assert!(generated.starts_with("task-"));
        assert_eq!(tracker.task_requests(), 2);
    }

    #[tokio::test]
    async fn test_tracker_one_shot_then_sticky_events() {
        let tracker = MockTracker::new();
        tracker.push_events("t", vec![TaskEvent::new(TaskStatus::Started)]);
        tracker.keep_events("t", vec![TaskEvent::new(TaskStatus::Completed)]);

        let first = tracker.task_events("t").await.unwrap();
        assert_eq!(first[0].status, TaskStatus::Started);
        let second = tracker.task_events("t").await.unwrap();
        assert_eq!(second[0].status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_store_records_uploads() {
        let store = MockObjectStore::new();
        store.ensure_bucket("run-1").await.unwrap();
        store
            .put_object("run-1", "artifacts/a.zip", Path::new("/tmp/a.zip"))
            .await
            .unwrap();

        assert_eq!(store.buckets(), vec!["run-1".to_string()]);
        assert_eq!(store.uploads().len(), 1);
    }

    #[tokio::test]
    async fn test_listing_filters_by_prefix() {
        let store = MockObjectStore::new();
        store.keep_listing(vec![
            "artifacts/a.zip".to_string(),
            "logs/run.log".to_string(),
        ]);

        let keys = store.list_objects("run-1", "artifacts/", true).await.unwrap();
        assert_eq!(keys, vec!["artifacts/a.zip".to_string()]);
    }

    #[test]
    fn test_stat_object_returns_metadata() {
        let store = MockObjectStore::new();
        let stat = tokio_test::block_on(store.stat_object("run-1", "artifacts/a.zip")).unwrap();
        assert!(stat.etag.is_some());
    }

    #[tokio::test]
    async fn test_executor_failure_mode() {
        let executor = MockJobExecutor::new();
        executor.fail_submissions(500);

        let result = executor.submit("http://resource", &[], "task", &[]).await;
        assert!(result.is_err());
        assert!(executor.submissions().is_empty());
    }
}
