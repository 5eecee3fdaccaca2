use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::debug;

use codeloom_core::error::Result;
use codeloom_core::traits::GenerationService;

use super::{Step, StepContext};
use crate::graph::FALLBACK;
use crate::state::WorkflowState;

/// Generic-assistant path for tasks the orchestrator could not classify.
///
/// Writes `documented_artifact` so every path leaves the final text in the
/// same field.
pub struct FallbackStep {
    service: Arc<dyn GenerationService>,
}

impl FallbackStep {
    pub fn new(service: Arc<dyn GenerationService>) -> Self {
        Self { service }
    }
}

impl Step for FallbackStep {
    fn name(&self) -> &'static str {
        FALLBACK
    }

    fn apply<'a>(
        &'a self,
        state: &'a mut WorkflowState,
        ctx: &'a StepContext,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let user = format!("Task: {}", state.task_description);
            let response = self
                .service
                .complete(&ctx.model, "You are a helpful coding assistant.", &user)
                .await?;

            debug!(run = %ctx.run_id, "fallback response recorded");
            state.documented_artifact = Some(response.trim().to_string());
            Ok(())
        })
    }
}
