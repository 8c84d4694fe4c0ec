//! # Stagehand
//!
//! A pipeline-stage orchestrator. Stagehand executes a directed graph of
//! named stages, each delegated to a remote job-execution endpoint and
//! tracked by an external task service:
//!
//! - **Dependency graph**: stage definitions are validated once — cycles
//!   and unknown dependencies are rejected before anything runs
//! - **Stage state machine**: `pending -> started -> completed/failed`,
//!   persisted after every transition so interrupted runs resume safely
//! - **Tracked tasks**: remote progress is polled against the tracker's
//!   event log with a bounded retry budget and an explicit timeout
//! - **Content-addressed artifacts**: build outputs are hashed and only
//!   uploaded when the tracker has not seen the hash before
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stagehand::prelude::*;
//!
//! let config = RunConfig::from_file("stagehand.yml")?;
//! let definitions = StageDefinitions::from_file("stages.yml")?;
//!
//! let pipeline = Pipeline::new(".", config, definitions.stages)?;
//! pipeline.run(false).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod artifacts;
pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod executor;
pub mod graph;
pub mod observability;
pub mod pipeline;
pub mod stage;
pub mod state;
pub mod storage;
pub mod testing;
pub mod tracker;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::artifacts::{hash_file, ArtifactManager};
    pub use crate::config::{
        AnalyzerRegistry, AnalyzerSpec, ResourceDef, RoutingRule, RunConfig, StageDefinition,
        StageDefinitions, StorageConfig,
    };
    pub use crate::context::RunContext;
    pub use crate::core::{
        ArtifactRecord, DedupState, LocalArtifact, StageState, TaskEvent, TaskStatus,
    };
    pub use crate::errors::{
        CircularDependencyError, DependencyNotSatisfiedError, OrchestratorError,
        PollTimeoutError, TaskFailedError, UnknownDependencyError, ValidationError,
    };
    pub use crate::executor::{HttpJobExecutor, JobExecutor};
    pub use crate::graph::StageGraph;
    pub use crate::pipeline::Pipeline;
    pub use crate::stage::Stage;
    pub use crate::state::{RunState, StageRecord, StateStore, STATE_DIR_NAME};
    pub use crate::storage::{HttpObjectStore, ObjectStat, ObjectStore};
    pub use crate::tracker::{
        poll_until, HttpTaskTracker, PollOutcome, TaskTracker, DEFAULT_POLL_RETRIES,
    };
    pub use crate::utils::{generate_run_id, iso_timestamp};
}
