//! Shared per-run context threaded through stages.

use crate::config::RunConfig;
use crate::executor::JobExecutor;
use crate::state::{StateStore, STATE_DIR_NAME};
use crate::storage::ObjectStore;
use crate::tracker::TaskTracker;
use std::path::PathBuf;
use std::sync::Arc;

/// Everything a stage needs to execute: configuration, the run's state
/// store, and the remote service clients.
///
/// The context is created once per run by the pipeline and shared by
/// reference; the state store inside it is the run's single writer.
#[derive(Debug)]
pub struct RunContext {
    /// Root of the project tree being built.
    pub base_path: PathBuf,
    /// The run configuration.
    pub config: RunConfig,
    /// Durable per-stage state, flushed on every transition.
    pub state: StateStore,
    /// Task tracker client.
    pub tracker: Arc<dyn TaskTracker>,
    /// Object storage client.
    pub storage: Arc<dyn ObjectStore>,
    /// Job execution client.
    pub executor: Arc<dyn JobExecutor>,
}

impl RunContext {
    /// Returns the run identifier.
    #[must_use]
    pub fn run_id(&self) -> String {
        self.state.run_id()
    }

    /// Directory for archives awaiting upload; lives inside the state
    /// directory so it is never packaged as a build artifact.
    #[must_use]
    pub fn scratch_dir(&self) -> PathBuf {
        self.base_path.join(STATE_DIR_NAME).join("scratch")
    }

    /// Directory that downloaded artifacts are written to.
    #[must_use]
    pub fn download_dir(&self) -> PathBuf {
        self.base_path.join(STATE_DIR_NAME).join("downloads")
    }
}
