//! Object storage client: bucket-per-run artifact storage.

mod http;

pub use http::HttpObjectStore;

use crate::errors::OrchestratorError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::Path;

/// Metadata for one stored object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectStat {
    /// Storage-assigned etag, if the service reports one.
    pub etag: Option<String>,
    /// Last modification time as reported by the service.
    pub last_modified: Option<String>,
}

/// Interface boundary of the external object storage service.
///
/// Buckets are created per run; artifact objects live under an
/// `artifacts/` prefix inside the run's bucket.
#[async_trait]
pub trait ObjectStore: Send + Sync + Debug {
    /// Creates a bucket, treating "already exists" as success.
    async fn ensure_bucket(&self, bucket: &str) -> Result<(), OrchestratorError>;

    /// Uploads a local file to `bucket`/`key` and returns its metadata.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        file_path: &Path,
    ) -> Result<ObjectStat, OrchestratorError>;

    /// Fetches metadata for a stored object.
    async fn stat_object(&self, bucket: &str, key: &str) -> Result<ObjectStat, OrchestratorError>;

    /// Lists object keys under a prefix.
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        recursive: bool,
    ) -> Result<Vec<String>, OrchestratorError>;

    /// Downloads a stored object to a local file.
    async fn get_object_to_file(
        &self,
        bucket: &str,
        key: &str,
        dest: &Path,
    ) -> Result<(), OrchestratorError>;
}
