//! HTTP implementation of the object storage interface.
//!
//! Speaks a plain REST layout: `{base}/{bucket}` for bucket operations
//! and `{base}/{bucket}/{key}` for objects, with credentials carried in
//! headers on every request.

use super::{ObjectStat, ObjectStore};
use crate::config::StorageConfig;
use crate::errors::OrchestratorError;
use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

const ACCESS_KEY_HEADER: &str = "x-storage-access-key";
const SECRET_KEY_HEADER: &str = "x-storage-secret-key";

/// Object storage client for a bucket-per-run REST service.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    client: reqwest::Client,
    base_url: String,
    access_key: String,
    secret_key: String,
}

impl HttpObjectStore {
    /// Creates a storage client from the run's storage settings.
    #[must_use]
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            access_key: config.access_key.clone(),
            secret_key: config.secret_key.clone(),
        }
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/{bucket}/{key}", self.base_url)
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header(ACCESS_KEY_HEADER, &self.access_key)
            .header(SECRET_KEY_HEADER, &self.secret_key)
    }

    fn stat_from_headers(headers: &reqwest::header::HeaderMap) -> ObjectStat {
        let header_str = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim_matches('"').to_string())
        };
        ObjectStat {
            etag: header_str("etag"),
            last_modified: header_str("last-modified"),
        }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn ensure_bucket(&self, bucket: &str) -> Result<(), OrchestratorError> {
        let url = format!("{}/{bucket}", self.base_url);
        let context = format!("creating bucket {bucket} at {}", self.base_url);

        let response = self
            .authed(self.client.put(&url))
            .send()
            .await
            .map_err(|e| OrchestratorError::transport(context.clone(), e))?;

        // An existing bucket is fine; the bucket is keyed by run id and
        // every artifact of the run belongs in it.
        if response.status().is_success() || response.status() == reqwest::StatusCode::CONFLICT {
            Ok(())
        } else {
            Err(OrchestratorError::remote_status(
                context,
                response.status().as_u16(),
            ))
        }
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        file_path: &Path,
    ) -> Result<ObjectStat, OrchestratorError> {
        let url = self.object_url(bucket, key);
        let context = format!("uploading {} to {bucket}/{key}", file_path.display());
        debug!(bucket, key, "uploading object");

        let bytes = tokio::fs::read(file_path).await?;
        let response = self
            .authed(self.client.put(&url))
            .body(bytes)
            .send()
            .await
            .map_err(|e| OrchestratorError::transport(context.clone(), e))?;

        if !response.status().is_success() {
            return Err(OrchestratorError::remote_status(
                context,
                response.status().as_u16(),
            ));
        }

        // Stat after the upload: not every service echoes object
        // metadata on the PUT response.
        self.stat_object(bucket, key).await
    }

    async fn stat_object(&self, bucket: &str, key: &str) -> Result<ObjectStat, OrchestratorError> {
        let url = self.object_url(bucket, key);
        let context = format!("stat of {bucket}/{key}");

        let response = self
            .authed(self.client.head(&url))
            .send()
            .await
            .map_err(|e| OrchestratorError::transport(context.clone(), e))?;

        if !response.status().is_success() {
            return Err(OrchestratorError::remote_status(
                context,
                response.status().as_u16(),
            ));
        }

        Ok(Self::stat_from_headers(response.headers()))
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        recursive: bool,
    ) -> Result<Vec<String>, OrchestratorError> {
        let url = format!("{}/{bucket}", self.base_url);
        let context = format!("listing {bucket}/{prefix}");

        let response = self
            .authed(self.client.get(&url))
            .query(&[("prefix", prefix), ("recursive", &recursive.to_string())])
            .send()
            .await
            .map_err(|e| OrchestratorError::transport(context.clone(), e))?;

        if !response.status().is_success() {
            return Err(OrchestratorError::remote_status(
                context,
                response.status().as_u16(),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| OrchestratorError::transport(context, e))
    }

    async fn get_object_to_file(
        &self,
        bucket: &str,
        key: &str,
        dest: &Path,
    ) -> Result<(), OrchestratorError> {
        let url = self.object_url(bucket, key);
        let context = format!("downloading {bucket}/{key} to {}", dest.display());
        debug!(bucket, key, dest = %dest.display(), "downloading object");

        let response = self
            .authed(self.client.get(&url))
            .send()
            .await
            .map_err(|e| OrchestratorError::transport(context.clone(), e))?;

        if !response.status().is_success() {
            return Err(OrchestratorError::remote_status(
                context,
                response.status().as_u16(),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| OrchestratorError::transport(context, e))?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, &bytes).await?;
        Ok(())
    }
}
