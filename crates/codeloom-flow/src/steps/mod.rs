//! Step implementations for the standard code workflow.

pub mod documenter;
pub mod fallback;
pub mod gate;
pub mod generator;
pub mod orchestrator;
pub mod reviewer;

pub use documenter::DocumenterStep;
pub use fallback::FallbackStep;
pub use gate::ApprovalGateStep;
pub use generator::GeneratorStep;
pub use orchestrator::OrchestratorStep;
pub use reviewer::ReviewerStep;

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;

use codeloom_core::config::ModelConfig;
use codeloom_core::error::Result;
use codeloom_core::types::RunId;

use crate::approval::ApprovalBroker;
use crate::state::WorkflowState;

/// Per-run data a step may need beyond the state itself.
pub struct StepContext {
    pub run_id: RunId,
    /// Model configuration for this run (overrides already applied).
    pub model: ModelConfig,
    /// Whether the approval gate suspends for an operator decision.
    pub interactive: bool,
    /// How long the gate waits before defaulting to rejection.
    pub approval_timeout: Duration,
    pub approvals: Arc<ApprovalBroker>,
}

/// A named unit of work that transforms the workflow state.
///
/// The engine hands the state to exactly one step at a time; a step mutates
/// it in place and returns ownership to the engine by returning.
pub trait Step: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn apply<'a>(
        &'a self,
        state: &'a mut WorkflowState,
        ctx: &'a StepContext,
    ) -> BoxFuture<'a, Result<()>>;
}
