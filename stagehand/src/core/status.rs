//! Stage and task status enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The persisted execution state of a pipeline stage.
///
/// Transitions: `Pending -> Started -> Completed` on success, or
/// `Pending -> Started -> Failed` on terminal failure. A stage whose
/// persisted state is `Completed` is skipped on re-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    /// Stage has not run yet.
    Pending,
    /// Stage execution has begun; persisted before any remote call.
    Started,
    /// Stage completed successfully.
    Completed,
    /// Stage failed.
    Failed,
}

impl Default for StageState {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Started => write!(f, "started"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl StageState {
    /// Returns true if the state is terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// A status value carried by a tracker task event.
///
/// The tracker's vocabulary is open-ended; statuses this crate does not
/// interpret are preserved verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// The task has been created.
    Started,
    /// The task is being worked on.
    Running,
    /// The task finished successfully.
    Completed,
    /// The task finished unsuccessfully.
    Failed,
    /// Any status this crate does not interpret.
    #[serde(untagged)]
    Other(String),
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started => write!(f, "started"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}
