//! Persisted run state: one record per stage, flushed after every
//! transition so an aborted run can resume and skip completed stages.

use crate::core::StageState;
use crate::errors::OrchestratorError;
use crate::utils::{generate_run_id, iso_timestamp};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Name of the reserved directory holding orchestrator state inside a
/// project tree. Paths under it are never shipped as build artifacts.
pub const STATE_DIR_NAME: &str = "stagehand.d";

/// The persisted record of one stage's progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    /// Current state of the stage.
    #[serde(default)]
    pub state: StageState,
    /// Tracker task id, once one has been requested.
    #[serde(default)]
    pub task_id: Option<String>,
    /// When the stage entered `Started` (ISO 8601).
    #[serde(default)]
    pub started_at: Option<String>,
    /// When the stage reached a terminal state (ISO 8601).
    #[serde(default)]
    pub ended_at: Option<String>,
}

/// The durable state of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    /// The run identifier; doubles as the storage bucket name.
    pub run_id: String,
    /// Per-stage records, keyed by stage name.
    #[serde(default)]
    pub stages: BTreeMap<String, StageRecord>,
}

impl RunState {
    fn new() -> Self {
        Self {
            run_id: generate_run_id(),
            stages: BTreeMap::new(),
        }
    }
}

/// File-backed store for a run's state.
///
/// Single writer by construction: stages execute sequentially and every
/// mutation goes through this store, which flushes the full state file
/// on each transition.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    inner: RwLock<RunState>,
}

impl StateStore {
    /// Opens the state file at `path`, creating a fresh run if absent.
    ///
    /// An existing file is read back as-is, which is what allows a rerun
    /// to skip stages already recorded as completed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or created.
    pub fn load_or_create(path: impl Into<PathBuf>) -> Result<Self, OrchestratorError> {
        let path = path.into();
        let state = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_yaml::from_str(&content)?
        } else {
            RunState::new()
        };

        let store = Self {
            path,
            inner: RwLock::new(state),
        };
        store.flush()?;
        Ok(store)
    }

    /// Returns the state file path for a project rooted at `base_path`.
    #[must_use]
    pub fn default_path(base_path: &Path) -> PathBuf {
        base_path.join(STATE_DIR_NAME).join("state").join("state.yml")
    }

    /// Returns the run id.
    #[must_use]
    pub fn run_id(&self) -> String {
        self.inner.read().run_id.clone()
    }

    /// Returns the record for a stage, defaulting to a pending record.
    #[must_use]
    pub fn get(&self, stage: &str) -> StageRecord {
        self.inner
            .read()
            .stages
            .get(stage)
            .cloned()
            .unwrap_or_default()
    }

    /// Records a state transition for a stage and flushes to disk.
    ///
    /// `Started` stamps `started_at`; terminal states stamp `ended_at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the state file cannot be written.
    pub fn record(&self, stage: &str, state: StageState) -> Result<(), OrchestratorError> {
        {
            let mut inner = self.inner.write();
            let record = inner.stages.entry(stage.to_string()).or_default();
            record.state = state;
            match state {
                StageState::Started => record.started_at = Some(iso_timestamp()),
                StageState::Completed | StageState::Failed => {
                    record.ended_at = Some(iso_timestamp());
                }
                StageState::Pending => {}
            }
        }
        self.flush()
    }

    /// Attaches a tracker task id to a stage's record and flushes.
    ///
    /// # Errors
    ///
    /// Returns an error if the state file cannot be written.
    pub fn set_task_id(&self, stage: &str, task_id: &str) -> Result<(), OrchestratorError> {
        {
            let mut inner = self.inner.write();
            let record = inner.stages.entry(stage.to_string()).or_default();
            record.task_id = Some(task_id.to_string());
        }
        self.flush()
    }

    /// Returns a snapshot of the full run state.
    #[must_use]
    pub fn snapshot(&self) -> RunState {
        self.inner.read().clone()
    }

    fn flush(&self) -> Result<(), OrchestratorError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(&*self.inner.read())?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}
