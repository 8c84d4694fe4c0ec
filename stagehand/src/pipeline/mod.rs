//! The pipeline orchestrator: owns the validated stage graph and the
//! run's persisted state, and drives execution or display across it.


use crate::config::{AnalyzerRegistry, RunConfig, StageDefinition};
use crate::context::RunContext;
use crate::errors::OrchestratorError;
use crate::executor::{HttpJobExecutor, JobExecutor};
use crate::graph::StageGraph;
use crate::stage::Stage;
use crate::state::StateStore;
use crate::storage::{HttpObjectStore, ObjectStore};
use crate::tracker::{HttpTaskTracker, TaskTracker};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, info_span, Instrument};

/// A validated, executable pipeline.
///
/// Stages run strictly in declared order; dependency-completion checks
/// inside each stage enforce correctness. The pipeline is the run
/// state's single writer, mediated through the shared context.
#[derive(Debug)]
pub struct Pipeline {
    ctx: Arc<RunContext>,
    graph: StageGraph,
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Builds a pipeline with HTTP clients for all remote services.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration or stage definitions fail
    /// validation, or if the state file cannot be opened.
    pub fn new(
        base_path: impl Into<PathBuf>,
        config: RunConfig,
        definitions: Vec<StageDefinition>,
    ) -> Result<Self, OrchestratorError> {
        let tracker: Arc<dyn TaskTracker> = Arc::new(HttpTaskTracker::new(&config.tracker_url)?);
        let storage: Arc<dyn ObjectStore> = Arc::new(HttpObjectStore::new(&config.storage));
        let executor: Arc<dyn JobExecutor> = Arc::new(HttpJobExecutor::new());
        Self::with_clients(base_path, config, definitions, tracker, storage, executor)
    }

    /// Builds a pipeline over explicitly supplied service clients.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration or stage definitions fail
    /// validation, or if the state file cannot be opened.
    pub fn with_clients(
        base_path: impl Into<PathBuf>,
        config: RunConfig,
        definitions: Vec<StageDefinition>,
        tracker: Arc<dyn TaskTracker>,
        storage: Arc<dyn ObjectStore>,
        executor: Arc<dyn JobExecutor>,
    ) -> Result<Self, OrchestratorError> {
        config.validate()?;

        let registry = AnalyzerRegistry::from_config(&config);
        let definitions = registry.expand(definitions)?;
        let graph = StageGraph::build(&definitions)?;

        let base_path = base_path.into();
        let state = StateStore::load_or_create(StateStore::default_path(&base_path))?;
        let ctx = Arc::new(RunContext {
            base_path,
            config,
            state,
            tracker,
            storage,
            executor,
        });

        let stages = (0..graph.len())
            .filter_map(|position| {
                graph.node(position).map(|node| {
                    Stage::new(
                        Arc::clone(&node.definition),
                        graph.dependencies_of(position),
                        Arc::clone(&ctx),
                    )
                })
            })
            .collect();

        Ok(Self { ctx, graph, stages })
    }

    /// Returns the run identifier.
    #[must_use]
    pub fn run_id(&self) -> String {
        self.ctx.run_id()
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.graph.len()
    }

    /// Looks up a stage by name.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&Stage> {
        self.graph
            .position(name)
            .and_then(|position| self.stages.get(position))
    }

    /// Iterates stages in declared order.
    pub fn stages(&self) -> impl Iterator<Item = &Stage> {
        self.stages.iter()
    }

    /// Executes every stage in declared order.
    ///
    /// The first failing stage aborts the run; the state file reflects
    /// the last persisted transition, so a rerun resumes from there and
    /// skips completed stages. With `wait` set, artifacts are displayed
    /// once the whole graph is terminal.
    ///
    /// # Errors
    ///
    /// Returns the first stage error encountered.
    pub async fn run(&self, wait: bool) -> Result<(), OrchestratorError> {
        let run_id = self.run_id();
        let span = info_span!("pipeline_run", run_id = %run_id);
        async {
            info!(stages = self.stages.len(), "starting pipeline run");
            for stage in &self.stages {
                let stage_span = info_span!("stage", stage = stage.name());
                stage.execute(false).instrument(stage_span).await?;
            }
            if wait {
                self.display().await?;
            }
            info!("pipeline run finished");
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Runs every stage's display in declared order.
    ///
    /// # Errors
    ///
    /// Returns the first display error encountered.
    pub async fn display(&self) -> Result<(), OrchestratorError> {
        for stage in &self.stages {
            stage.display().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{StageState, TaskEvent, TaskStatus};
    use crate::testing::fixtures;
    use crate::testing::mocks::{MockJobExecutor, MockObjectStore, MockTracker};
    use pretty_assertions::assert_eq;

    struct Harness {
        _dir: tempfile::TempDir,
        tracker: Arc<MockTracker>,
        executor: Arc<MockJobExecutor>,
        pipeline: Pipeline,
    }

    fn harness(definitions: Vec<crate::config::StageDefinition>) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("source.txt"), "project file").unwrap();

        let tracker = Arc::new(MockTracker::new());
        let storage = Arc::new(MockObjectStore::new());
        let executor = Arc::new(MockJobExecutor::new());

        let pipeline = Pipeline::with_clients(
            dir.path(),
            fixtures::run_config(),
            definitions,
            Arc::clone(&tracker) as _,
            Arc::clone(&storage) as _,
            Arc::clone(&executor) as _,
        )
        .unwrap();

        Harness {
            _dir: dir,
            tracker,
            executor,
            pipeline,
        }
    }

    fn completed_event() -> TaskEvent {
        TaskEvent::new(TaskStatus::Completed)
    }

    #[test]
    fn test_pipeline_rejects_cyclic_definitions() {
        let dir = tempfile::tempdir().unwrap();
        let result = Pipeline::with_clients(
            dir.path(),
            fixtures::run_config(),
            vec![
                fixtures::style_stage(&["validate"]),
                fixtures::validate_stage(&["style"]),
            ],
            Arc::new(MockTracker::new()),
            Arc::new(MockObjectStore::new()),
            Arc::new(MockJobExecutor::new()),
        );
        assert!(matches!(
            result.unwrap_err(),
            OrchestratorError::CircularDependency(_)
        ));
    }

    #[tokio::test]
    async fn test_run_executes_stages_in_declared_order() {
        let harness = harness(vec![fixtures::default_stage(), fixtures::dependent_stage()]);
        harness.tracker.queue_task_id("task-default");
        harness.tracker.queue_task_id("task-dependent");
        harness
            .tracker
            .keep_events("task-default", vec![completed_event()]);
        harness
            .tracker
            .keep_events("task-dependent", vec![completed_event()]);

        harness.pipeline.run(false).await.unwrap();

        let submissions = harness.executor.submissions();
        assert_eq!(submissions.len(), 2);
        assert_eq!(submissions[0].resource_url, "http://executor.local:8000/default");
        assert_eq!(
            submissions[1].resource_url,
            "http://executor.local:8000/dependent"
        );
    }

    #[tokio::test]
    async fn test_rerun_skips_completed_stages() {
        let harness = harness(vec![fixtures::default_stage()]);
        harness.tracker.queue_task_id("task-default");
        harness
            .tracker
            .keep_events("task-default", vec![completed_event()]);

        harness.pipeline.run(false).await.unwrap();
        assert_eq!(harness.tracker.task_requests(), 1);

        harness.pipeline.run(false).await.unwrap();
        // The completed stage short-circuits; no second task requested.
        assert_eq!(harness.tracker.task_requests(), 1);
    }

    #[tokio::test]
    async fn test_failed_stage_aborts_the_run() {
        let harness = harness(vec![fixtures::default_stage(), fixtures::dependent_stage()]);
        harness.tracker.queue_task_id("task-default");
        harness.tracker.keep_events(
            "task-default",
            vec![TaskEvent::new(TaskStatus::Failed).with_message("boom")],
        );

        let err = harness.pipeline.run(false).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::TaskFailed(_)));

        // The dependent stage never ran.
        assert_eq!(harness.executor.submissions().len(), 1);
        let snapshot = harness.pipeline.ctx.state.snapshot();
        assert_eq!(snapshot.stages["default"].state, StageState::Failed);
        assert!(!snapshot.stages.contains_key("dependent"));
    }

    #[test]
    fn test_stage_lookup_by_name() {
        let harness = harness(vec![fixtures::default_stage(), fixtures::dependent_stage()]);
        assert_eq!(harness.pipeline.stage_count(), 2);
        assert!(harness.pipeline.stage("default").is_some());
        assert!(harness.pipeline.stage("missing").is_none());
    }

    #[tokio::test]
    async fn test_run_state_records_terminal_states() {
        let harness = harness(vec![fixtures::default_stage()]);
        harness.tracker.queue_task_id("task-default");
        harness
            .tracker
            .keep_events("task-default", vec![completed_event()]);

        harness.pipeline.run(false).await.unwrap();

        let snapshot = harness.pipeline.ctx.state.snapshot();
        assert_eq!(snapshot.stages["default"].state, StageState::Completed);
    }
}
