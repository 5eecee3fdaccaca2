use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::debug;

use codeloom_core::error::Result;
use codeloom_core::traits::GenerationService;

use super::{Step, StepContext};
use crate::graph::REVIEWER;
use crate::state::WorkflowState;

/// Reviews the current artifact and records the feedback.
pub struct ReviewerStep {
    service: Arc<dyn GenerationService>,
}

impl ReviewerStep {
    pub fn new(service: Arc<dyn GenerationService>) -> Self {
        Self { service }
    }
}

impl Step for ReviewerStep {
    fn name(&self) -> &'static str {
        REVIEWER
    }

    fn apply<'a>(
        &'a self,
        state: &'a mut WorkflowState,
        ctx: &'a StepContext,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            // When routed here directly (no generated artifact yet), the
            // task itself carries the code under review.
            let code = state
                .generated_artifact
                .as_deref()
                .unwrap_or(&state.task_description);

            let instruction = format!(
                "Review this code for errors, inefficiencies, or security flaws:\n{code}\nSuggest concise fixes and improvements."
            );

            let feedback = self
                .service
                .complete(&ctx.model, &instruction, "Review the code above")
                .await?;

            debug!(run = %ctx.run_id, bytes = feedback.len(), "review feedback recorded");
            state.review_feedback = Some(feedback.trim().to_string());
            Ok(())
        })
    }
}
