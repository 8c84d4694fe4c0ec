//! Job submission to remote execution endpoints.

use crate::config::RoutingRule;
use crate::core::ArtifactRecord;
use crate::errors::OrchestratorError;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt::Debug;
use tracing::debug;

/// The body posted to an execution endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct JobRequest<'a> {
    /// Manifest of the artifacts the job consumes.
    pub artifacts: &'a [ArtifactRecord],
    /// The tracker task id the executor reports progress against.
    pub task_id: &'a str,
    /// The routing rules that selected this endpoint.
    pub config: &'a [&'a RoutingRule],
}

/// Interface boundary of the remote job execution service.
#[async_trait]
pub trait JobExecutor: Send + Sync + Debug {
    /// Submits a job to the endpoint at `resource_url`.
    ///
    /// A non-success response is fatal; the submission is never retried
    /// and no polling follows a failed submission.
    async fn submit(
        &self,
        resource_url: &str,
        artifacts: &[ArtifactRecord],
        task_id: &str,
        rules: &[&RoutingRule],
    ) -> Result<(), OrchestratorError>;
}

/// Executor client posting jobs over HTTP.
#[derive(Debug, Clone, Default)]
pub struct HttpJobExecutor {
    client: reqwest::Client,
}

impl HttpJobExecutor {
    /// Creates a new executor client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobExecutor for HttpJobExecutor {
    async fn submit(
        &self,
        resource_url: &str,
        artifacts: &[ArtifactRecord],
        task_id: &str,
        rules: &[&RoutingRule],
    ) -> Result<(), OrchestratorError> {
        debug!(resource_url, task_id, "submitting job");
        let body = JobRequest {
            artifacts,
            task_id,
            config: rules,
        };
        let context = format!("submitting job for task {task_id} to {resource_url}");

        let response = self
            .client
            .post(resource_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| OrchestratorError::transport(context.clone(), e))?;

        if !response.status().is_success() {
            return Err(OrchestratorError::remote_status(
                context,
                response.status().as_u16(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DedupState;

    #[test]
    fn test_job_request_wire_shape() {
        let artifacts = vec![ArtifactRecord {
            filename: "out.zip".to_string(),
            uri: "run-1/artifacts/out.zip".to_string(),
            etag: Some("etag-1".to_string()),
            state: DedupState::Uploaded,
            timestamp: "2026-01-01T00:00:00.000000+00:00".to_string(),
        }];
        let rule = RoutingRule {
            files: "*".to_string(),
            resource: "runner".to_string(),
        };
        let request = JobRequest {
            artifacts: &artifacts,
            task_id: "task-1",
            config: &[&rule],
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["task_id"], "task-1");
        assert_eq!(value["artifacts"][0]["filename"], "out.zip");
        assert_eq!(value["config"][0]["resource"], "runner");
    }
}
