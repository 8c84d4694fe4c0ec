//! Error types for the stagehand orchestrator.
//!
//! Nothing in here is recovered locally: every error surfaces through
//! [`OrchestratorError`] to the run driver, which decides whether to
//! terminate the process. The core never exits on its own.

use crate::core::TaskEvent;
use thiserror::Error;

/// The main error type for orchestrator operations.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// A stage or run configuration failed validation.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The stage dependency relation contains a cycle.
    #[error("{0}")]
    CircularDependency(#[from] CircularDependencyError),

    /// A stage references a dependency that does not exist.
    #[error("{0}")]
    UnknownDependency(#[from] UnknownDependencyError),

    /// A stage was executed before one of its dependencies completed.
    #[error("{0}")]
    DependencyNotSatisfied(#[from] DependencyNotSatisfiedError),

    /// A network-level failure talking to a remote collaborator.
    #[error("{context}: {source}")]
    Transport {
        /// What the orchestrator was doing when the transport failed.
        context: String,
        /// The underlying client error.
        source: reqwest::Error,
    },

    /// A remote collaborator answered with a non-success HTTP status.
    #[error("{context}: remote returned HTTP {status}")]
    RemoteStatus {
        /// What the orchestrator was doing when the remote refused.
        context: String,
        /// The HTTP status code returned.
        status: u16,
    },

    /// The tracked task reported a terminal `failed` status.
    #[error("{0}")]
    TaskFailed(#[from] TaskFailedError),

    /// Status polling exhausted its retry budget without a decisive answer.
    #[error("{0}")]
    PollTimeout(#[from] PollTimeoutError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML (de)serialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON (de)serialization error.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Archive packaging error.
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

impl OrchestratorError {
    /// Creates a transport error with context.
    #[must_use]
    pub fn transport(context: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            context: context.into(),
            source,
        }
    }

    /// Creates a remote-status error with context.
    #[must_use]
    pub fn remote_status(context: impl Into<String>, status: u16) -> Self {
        Self::RemoteStatus {
            context: context.into(),
            status,
        }
    }
}

/// Error raised when a stage or run definition is malformed.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
}

impl ValidationError {
    /// Creates a new validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }
}

/// Error raised when the dependency relation contains a cycle.
#[derive(Debug, Clone, Error)]
#[error("Circular dependency detected: {}", cycle_path.join(" -> "))]
pub struct CircularDependencyError {
    /// The path of stages forming the cycle, first stage repeated at the end.
    pub cycle_path: Vec<String>,
}

impl CircularDependencyError {
    /// Creates a new circular dependency error.
    #[must_use]
    pub fn new(cycle_path: Vec<String>) -> Self {
        Self { cycle_path }
    }
}

/// Error raised when a stage names a dependency that is not defined.
#[derive(Debug, Clone, Error)]
#[error("Stage '{stage}' depends on unknown stage '{dependency}'")]
pub struct UnknownDependencyError {
    /// The stage with the bad reference.
    pub stage: String,
    /// The dependency name that could not be resolved.
    pub dependency: String,
}

impl UnknownDependencyError {
    /// Creates a new unknown dependency error.
    #[must_use]
    pub fn new(stage: impl Into<String>, dependency: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            dependency: dependency.into(),
        }
    }
}

/// Error raised when a stage runs before a dependency has completed.
#[derive(Debug, Clone, Error)]
#[error("Stage '{stage}' cannot run: dependency '{dependency}' has not completed")]
pub struct DependencyNotSatisfiedError {
    /// The stage that was asked to run.
    pub stage: String,
    /// The dependency that is not yet completed.
    pub dependency: String,
}

impl DependencyNotSatisfiedError {
    /// Creates a new dependency-not-satisfied error.
    #[must_use]
    pub fn new(stage: impl Into<String>, dependency: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            dependency: dependency.into(),
        }
    }
}

/// Error raised when the tracker reports a task as failed.
#[derive(Debug, Clone, Error)]
#[error("Task {task_id} failed: {}", summarize_events(.events))]
pub struct TaskFailedError {
    /// The failed task's identifier.
    pub task_id: String,
    /// The task's event log at the time of failure.
    pub events: Vec<TaskEvent>,
}

impl TaskFailedError {
    /// Creates a new task-failed error.
    #[must_use]
    pub fn new(task_id: impl Into<String>, events: Vec<TaskEvent>) -> Self {
        Self {
            task_id: task_id.into(),
            events,
        }
    }
}

fn summarize_events(events: &[TaskEvent]) -> String {
    if events.is_empty() {
        return "no events recorded".to_string();
    }
    events
        .iter()
        .map(|e| {
            format!(
                "[{} {}]",
                e.status,
                e.message.as_deref().unwrap_or("no message")
            )
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Error raised when polling exhausts its retries without a decisive status.
#[derive(Debug, Clone, Error)]
#[error("Task {task_id} reached no decisive status after {retries} poll attempts")]
pub struct PollTimeoutError {
    /// The task being polled.
    pub task_id: String,
    /// The number of poll attempts made.
    pub retries: u32,
}

impl PollTimeoutError {
    /// Creates a new poll timeout error.
    #[must_use]
    pub fn new(task_id: impl Into<String>, retries: u32) -> Self {
        Self {
            task_id: task_id.into(),
            retries,
        }
    }
}
