use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use codeloom_core::config::{FlowConfig, ModelConfig};
use codeloom_core::error::{CodeloomError, Result};
use codeloom_core::traits::GenerationService;
use codeloom_core::types::RunId;

use crate::approval::ApprovalBroker;
use crate::checkpoint::CheckpointStore;
use crate::graph::{Graph, DOCUMENTER, GENERATOR, REVIEWER, TERMINAL};
use crate::state::{RunOutcome, WorkflowState};
use crate::steps::{
    ApprovalGateStep, DocumenterStep, FallbackStep, GeneratorStep, OrchestratorStep, ReviewerStep,
    Step, StepContext,
};

const DEFAULT_APPROVAL_TIMEOUT_SECS: u64 = 60;

/// Per-run configuration.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Suspend at the approval gate for an operator decision.
    pub interactive: bool,
    /// Maximum traversals of the review→generation retry edge.
    pub max_retries: u32,
    /// Model id override for this run.
    pub model: Option<String>,
    /// Approval-gate timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            interactive: false,
            max_retries: 3,
            model: None,
            timeout_secs: None,
        }
    }
}

impl RunConfig {
    pub fn from_flow(flow: &FlowConfig) -> Self {
        Self {
            interactive: flow.interactive,
            max_retries: flow.max_retries,
            model: None,
            timeout_secs: Some(flow.approval_timeout_secs),
        }
    }
}

/// A failed run: the error plus whatever state accumulated before it.
///
/// Callers may inspect the partially-populated state — this is a documented
/// observable, not error masking.
#[derive(Debug, Error)]
#[error("run failed at step '{step}': {source}")]
pub struct RunError {
    pub step: String,
    #[source]
    pub source: CodeloomError,
    pub state: WorkflowState,
}

/// Drives runs through the workflow graph.
///
/// The graph and step set are immutable and shared; each `run` call owns an
/// independent state machine, so any number of runs may execute
/// concurrently on the same engine.
pub struct Engine {
    graph: Arc<Graph>,
    steps: HashMap<&'static str, Arc<dyn Step>>,
    base_model: ModelConfig,
    approvals: Arc<ApprovalBroker>,
    checkpoints: Option<Arc<CheckpointStore>>,
}

impl Engine {
    pub fn new(
        graph: Graph,
        steps: Vec<Arc<dyn Step>>,
        base_model: ModelConfig,
        checkpoints: Option<Arc<CheckpointStore>>,
    ) -> Self {
        Self {
            graph: Arc::new(graph),
            steps: steps.into_iter().map(|s| (s.name(), s)).collect(),
            base_model,
            approvals: Arc::new(ApprovalBroker::new()),
            checkpoints,
        }
    }

    /// Assemble the standard code workflow over a generation service.
    pub fn standard(
        service: Arc<dyn GenerationService>,
        base_model: ModelConfig,
        checkpoints: Option<Arc<CheckpointStore>>,
    ) -> Self {
        let steps: Vec<Arc<dyn Step>> = vec![
            Arc::new(OrchestratorStep::new(service.clone())),
            Arc::new(GeneratorStep::new(service.clone())),
            Arc::new(ReviewerStep::new(service.clone())),
            Arc::new(DocumenterStep::new(service.clone())),
            Arc::new(FallbackStep::new(service)),
            Arc::new(ApprovalGateStep),
        ];
        Self::new(Graph::standard(), steps, base_model, checkpoints)
    }

    /// Broker for resolving approval-gate decisions from outside the run.
    pub fn approvals(&self) -> Arc<ApprovalBroker> {
        self.approvals.clone()
    }

    pub fn checkpoints(&self) -> Option<Arc<CheckpointStore>> {
        self.checkpoints.clone()
    }

    /// Execute a run from the graph entry to the terminal step.
    pub async fn run(
        &self,
        run_id: &RunId,
        task: &str,
        config: RunConfig,
    ) -> std::result::Result<RunOutcome, RunError> {
        self.run_cancellable(run_id, task, config, CancellationToken::new())
            .await
    }

    /// Execute a run, checking `cancel` between steps. A cancelled run
    /// fails with [`CodeloomError::Cancelled`] and keeps its partial state.
    pub async fn run_cancellable(
        &self,
        run_id: &RunId,
        task: &str,
        config: RunConfig,
        cancel: CancellationToken,
    ) -> std::result::Result<RunOutcome, RunError> {
        let state = WorkflowState::new(task);
        if state.task_description.trim().is_empty() {
            return Err(self.fail(
                self.graph.entry(),
                CodeloomError::Config("task description must not be empty".into()),
                state,
            ));
        }

        info!(run = %run_id, "starting run");
        self.drive(run_id, state, self.graph.entry(), config, cancel)
            .await
    }

    /// Resume a checkpointed run from its last completed step.
    pub async fn resume(
        &self,
        run_id: &RunId,
        config: RunConfig,
    ) -> std::result::Result<RunOutcome, RunError> {
        let record = match self.load_checkpoint(run_id) {
            Ok(r) => r,
            Err(e) => return Err(self.fail(self.graph.entry(), e, WorkflowState::new(""))),
        };

        info!(run = %run_id, step = %record.0, "resuming run");
        let (last_step, mut state) = record;

        // Re-resolve the transition out of the last completed step; retry
        // bookkeeping is part of the snapshot, so this picks up exactly
        // where the interrupted run left off.
        let next = match self.next_step(&last_step, &mut state, &config) {
            Ok(n) => n,
            Err(e) => return Err(self.fail(&last_step, e, state)),
        };

        self.drive(run_id, state, next, config, CancellationToken::new())
            .await
    }

    fn load_checkpoint(&self, run_id: &RunId) -> Result<(String, WorkflowState)> {
        let store = self
            .checkpoints
            .as_deref()
            .ok_or_else(|| CodeloomError::Checkpoint("checkpointing is disabled".into()))?;
        let record = store
            .load(run_id)?
            .ok_or_else(|| CodeloomError::Checkpoint(format!("no checkpoint for run {run_id}")))?;
        Ok((record.step, record.state))
    }

    async fn drive(
        &self,
        run_id: &RunId,
        mut state: WorkflowState,
        start: &'static str,
        config: RunConfig,
        cancel: CancellationToken,
    ) -> std::result::Result<RunOutcome, RunError> {
        let ctx = StepContext {
            run_id: run_id.clone(),
            model: self.run_model(&config),
            interactive: config.interactive,
            approval_timeout: Duration::from_secs(
                config.timeout_secs.unwrap_or(DEFAULT_APPROVAL_TIMEOUT_SECS),
            ),
            approvals: self.approvals.clone(),
        };

        // Safety bound against a misconfigured graph: generous enough for a
        // fully-retried legal run, small enough to stop any unbounded cycle.
        let iteration_cap = 2 * (self.graph.node_count() + config.max_retries as usize);
        let mut iterations = 0usize;
        let mut current = start;

        while current != TERMINAL {
            if cancel.is_cancelled() {
                return Err(self.fail(current, CodeloomError::Cancelled, state));
            }

            iterations += 1;
            if iterations > iteration_cap {
                return Err(self.fail(current, CodeloomError::IterationLimit(iteration_cap), state));
            }

            let Some(step) = self.steps.get(current) else {
                return Err(self.fail(
                    current,
                    CodeloomError::Graph(format!("no step registered for '{current}'")),
                    state,
                ));
            };

            debug!(run = %run_id, step = current, iteration = iterations, "applying step");
            if let Err(e) = step.apply(&mut state, &ctx).await {
                return Err(self.fail(current, e, state));
            }

            if let Some(store) = self.checkpoints.as_deref() {
                if let Err(e) = store.save(run_id, current, &state) {
                    return Err(self.fail(current, e, state));
                }
            }

            current = match self.next_step(current, &mut state, &config) {
                Ok(next) => next,
                Err(e) => return Err(self.fail(current, e, state)),
            };
        }

        info!(run = %run_id, iterations, "run complete");

        // A finished run no longer needs its resume snapshot
        if let Some(store) = self.checkpoints.as_deref() {
            if let Err(e) = store.delete(run_id) {
                warn!(run = %run_id, error = %e, "failed to clear checkpoint");
            }
        }

        Ok(RunOutcome::from(state))
    }

    /// Resolve the next step, applying the engine-owned retry bound on the
    /// reviewer→generator cycle. The router stays a pure function of state;
    /// loop termination is guaranteed here.
    fn next_step(
        &self,
        current: &str,
        state: &mut WorkflowState,
        config: &RunConfig,
    ) -> Result<&'static str> {
        let next = self.graph.next(current, state)?;

        if current == REVIEWER && next == GENERATOR {
            if state.retry_count >= config.max_retries {
                warn!(
                    retries = state.retry_count,
                    "retry budget exhausted, forcing documentation"
                );
                return Ok(DOCUMENTER);
            }
            state.retry_count += 1;
            debug!(retry = state.retry_count, "retrying generation");
        }

        Ok(next)
    }

    fn run_model(&self, config: &RunConfig) -> ModelConfig {
        let mut model = self.base_model.clone();
        if let Some(id) = &config.model {
            model.model_id = id.clone();
        }
        model
    }

    fn fail(&self, step: &str, source: CodeloomError, state: WorkflowState) -> RunError {
        error!(step, error = %source, "run failed");
        RunError {
            step: step.to_string(),
            source,
            state,
        }
    }
}
