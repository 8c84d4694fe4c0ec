//! HTTP implementation of the task tracker protocol.

use super::{TaskTracker, CALLER};
use crate::core::{TaskEvent, TaskStatus};
use crate::errors::OrchestratorError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct TaskEnvelope {
    task: TaskBody,
}

#[derive(Debug, Deserialize)]
struct TaskBody {
    task_id: String,
}

#[derive(Debug, Deserialize)]
struct ArtifactEnvelope {
    artifact: ArtifactBody,
}

#[derive(Debug, Deserialize)]
struct ArtifactBody {
    uri: String,
}

/// Task tracker client speaking the tracker's JSON-over-HTTP protocol.
#[derive(Debug, Clone)]
pub struct HttpTaskTracker {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTaskTracker {
    /// Creates a client for the tracker at `base_url`.
    ///
    /// Redirects are not followed: the hash probe answers with a
    /// 302-equivalent status carrying a JSON body, never a real redirect.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, OrchestratorError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| OrchestratorError::transport("building tracker client", e))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl TaskTracker for HttpTaskTracker {
    async fn request_task(
        &self,
        run_id: &str,
        project: &str,
    ) -> Result<String, OrchestratorError> {
        debug!(tracker = %self.base_url, "requesting new task id");
        let body = json!({
            "run_id": run_id,
            "caller": CALLER,
            "project": project,
            "message": "Requesting new task id",
            "status": "started",
        });

        let context = format!("requesting new task id from tracker at {}", self.base_url);
        let response = self
            .client
            .post(&self.base_url)
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

        let envelope: TaskEnvelope = response
            .json()
            .await
            .map_err(|e| OrchestratorError::transport(context, e))?;
        Ok(envelope.task.task_id)
    }

    async fn task_events(&self, task_id: &str) -> Result<Vec<TaskEvent>, OrchestratorError> {
        let url = format!("{}/{task_id}/events", self.base_url);
        let context = format!("fetching events for task {task_id}");

        let response = self
            .client
            .get(&url)
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

    async fn update_task(
        &self,
        task_id: &str,
        status: TaskStatus,
        message: &str,
    ) -> Result<String, OrchestratorError> {
        let url = format!("{}/{task_id}", self.base_url);
        let context = format!("updating task {task_id} at {}", self.base_url);
        let body = json!({
            "message": message,
            "status": status,
            "caller": CALLER,
        });

        let response = self
            .client
            .put(&url)
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

        let envelope: TaskEnvelope = response
            .json()
            .await
            .map_err(|e| OrchestratorError::transport(context, e))?;
        Ok(envelope.task.task_id)
    }

    async fn artifact_uri_for_hash(
        &self,
        hash: &str,
    ) -> Result<Option<String>, OrchestratorError> {
        let url = format!("{}/hash/{hash}", self.base_url);
        let context = format!("looking up artifact hash at {}", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| OrchestratorError::transport(context.clone(), e))?;

        match response.status() {
            reqwest::StatusCode::FOUND => {
                debug!(hash, "artifact hash found");
                let envelope: ArtifactEnvelope = response
                    .json()
                    .await
                    .map_err(|e| OrchestratorError::transport(context, e))?;
                Ok(Some(envelope.artifact.uri))
            }
            reqwest::StatusCode::NOT_FOUND => {
                debug!(hash, "artifact hash not found");
                Ok(None)
            }
            status => Err(OrchestratorError::remote_status(context, status.as_u16())),
        }
    }
}
