//! The per-stage execution state machine.
//!
//! A stage moves `pending -> started -> completed` or
//! `pending -> started -> failed`. The `started` transition is persisted
//! before any remote call; an interrupted run finding a stage stuck in
//! `started` re-attempts it from the top, which is safe because task
//! submission is idempotent per task id.

use crate::artifacts::{archive, local_artifact, ArtifactManager};
use crate::config::StageDefinition;
use crate::context::RunContext;
use crate::core::{ArtifactRecord, StageState, TaskStatus};
use crate::errors::{
    DependencyNotSatisfiedError, OrchestratorError, PollTimeoutError, TaskFailedError,
};
use crate::tracker::{poll_until, PollOutcome, DEFAULT_POLL_RETRIES};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One executable pipeline stage.
///
/// Holds its definition, the resolved definitions of its dependencies,
/// and the shared run context. All state transitions go through the
/// context's state store.
#[derive(Debug, Clone)]
pub struct Stage {
    definition: Arc<StageDefinition>,
    dependencies: Vec<Arc<StageDefinition>>,
    ctx: Arc<RunContext>,
}

impl Stage {
    /// Creates a stage wired to its resolved dependencies.
    #[must_use]
    pub fn new(
        definition: Arc<StageDefinition>,
        dependencies: Vec<Arc<StageDefinition>>,
        ctx: Arc<RunContext>,
    ) -> Self {
        Self {
            definition,
            dependencies,
            ctx,
        }
    }

    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Returns the stage definition.
    #[must_use]
    pub fn definition(&self) -> &StageDefinition {
        &self.definition
    }

    /// Runs the stage through its state machine.
    ///
    /// A stage already persisted as completed returns immediately with
    /// no side effects. With `wait` set, the stage's artifacts are
    /// displayed once it reaches a terminal state.
    ///
    /// # Errors
    ///
    /// Returns an error if a dependency has not completed, on any remote
    /// failure, if the tracked task fails, or if polling times out.
    pub async fn execute(&self, wait: bool) -> Result<(), OrchestratorError> {
        if self.ctx.state.get(self.name()).state == StageState::Completed {
            info!(stage = self.name(), "stage already completed, skipping");
            return Ok(());
        }

        if let Some(dependency) = self.first_unsatisfied_dependency().await? {
            return Err(DependencyNotSatisfiedError::new(self.name(), dependency).into());
        }

        // Persisted before the first remote call for crash safety.
        self.ctx.state.record(self.name(), StageState::Started)?;
        info!(stage = self.name(), "stage started");

        let task_id = self
            .ctx
            .tracker
            .request_task(&self.ctx.run_id(), &self.ctx.config.project_name)
            .await?;
        self.ctx.state.set_task_id(self.name(), &task_id)?;
        debug!(stage = self.name(), %task_id, "task id assigned");

        let artifacts = self.upload_project_artifacts().await?;
        if let Err(err) = self.submit_jobs(&artifacts, &task_id).await {
            // A refused submission is terminal; the task is never polled.
            self.ctx.state.record(self.name(), StageState::Failed)?;
            return Err(err);
        }
        self.check_task_status(&task_id).await?;

        if wait {
            self.display().await?;
        }
        Ok(())
    }

    /// Lists and downloads the run's stored artifacts.
    ///
    /// A read path with no state mutation. Missing artifacts are a
    /// warning, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if a dependency has not completed or on any
    /// storage failure.
    pub async fn display(&self) -> Result<(), OrchestratorError> {
        if let Some(dependency) = self.first_unsatisfied_dependency().await? {
            return Err(DependencyNotSatisfiedError::new(self.name(), dependency).into());
        }

        let run_id = self.ctx.run_id();
        let keys = self
            .ctx
            .storage
            .list_objects(&run_id, "artifacts/", true)
            .await?;
        if keys.is_empty() {
            warn!(%run_id, "no artifacts found for run");
            return Ok(());
        }

        let download_dir = self.ctx.download_dir();
        for key in keys {
            let filename = key.rsplit('/').next().unwrap_or(key.as_str()).to_string();
            let dest = download_dir.join(filename);
            self.ctx
                .storage
                .get_object_to_file(&run_id, &key, &dest)
                .await?;
            info!(%key, dest = %dest.display(), "downloaded artifact");
        }
        Ok(())
    }

    /// Returns the first dependency that is not verifiably completed.
    ///
    /// Every dependency must be completed in the persisted state AND
    /// report completed on a fresh poll of the tracker; the local record
    /// alone is not trusted.
    async fn first_unsatisfied_dependency(
        &self,
    ) -> Result<Option<String>, OrchestratorError> {
        for dependency in &self.dependencies {
            let record = self.ctx.state.get(&dependency.name);
            if record.state != StageState::Completed {
                return Ok(Some(dependency.name.clone()));
            }
            let Some(task_id) = record.task_id else {
                return Ok(Some(dependency.name.clone()));
            };
            let outcome = poll_until(
                self.ctx.tracker.as_ref(),
                &task_id,
                &TaskStatus::Completed,
                DEFAULT_POLL_RETRIES,
            )
            .await?;
            if outcome != PollOutcome::Reached {
                debug!(
                    stage = self.name(),
                    dependency = %dependency.name,
                    "dependency task not completed at tracker"
                );
                return Ok(Some(dependency.name.clone()));
            }
        }
        Ok(None)
    }

    /// Archives the project tree and pushes it through dedup/upload.
    async fn upload_project_artifacts(
        &self,
    ) -> Result<Vec<ArtifactRecord>, OrchestratorError> {
        let zip_path = self
            .ctx
            .scratch_dir()
            .join(format!("{}.zip", self.name()));
        archive::pack(&self.ctx.base_path, &zip_path)?;

        let artifact = local_artifact(&zip_path)?;
        let manager = ArtifactManager::new(
            Arc::clone(&self.ctx.tracker),
            Arc::clone(&self.ctx.storage),
        );
        manager.upload_all(&self.ctx.run_id(), &[artifact]).await
    }

    /// Submits one job per routed resource.
    async fn submit_jobs(
        &self,
        artifacts: &[ArtifactRecord],
        task_id: &str,
    ) -> Result<(), OrchestratorError> {
        let executor_base = self.ctx.config.executor_url.trim_end_matches('/');
        for (resource, rules) in self.definition.routed_resources()? {
            let resource_url = format!("{executor_base}{}", resource.uri);
            self.ctx
                .executor
                .submit(&resource_url, artifacts, task_id, &rules)
                .await?;
            self.ctx
                .tracker
                .update_task(
                    task_id,
                    TaskStatus::Running,
                    &format!("Submitted stage {} to resource {}", self.name(), resource.name),
                )
                .await?;
        }
        Ok(())
    }

    /// Polls the task to a terminal status and persists the result.
    async fn check_task_status(&self, task_id: &str) -> Result<(), OrchestratorError> {
        match poll_until(
            self.ctx.tracker.as_ref(),
            task_id,
            &TaskStatus::Completed,
            DEFAULT_POLL_RETRIES,
        )
        .await?
        {
            PollOutcome::Reached => {
                self.ctx
                    .tracker
                    .update_task(
                        task_id,
                        TaskStatus::Completed,
                        &format!("Stage {} completed", self.name()),
                    )
                    .await?;
                self.ctx.state.record(self.name(), StageState::Completed)?;
                info!(stage = self.name(), "stage completed");
                Ok(())
            }
            PollOutcome::Failed => {
                self.ctx.state.record(self.name(), StageState::Failed)?;
                let events = self.ctx.tracker.task_events(task_id).await?;
                Err(TaskFailedError::new(task_id, events).into())
            }
            PollOutcome::TimedOut => {
                self.ctx.state.record(self.name(), StageState::Failed)?;
                Err(PollTimeoutError::new(task_id, DEFAULT_POLL_RETRIES).into())
            }
        }
    }
}
