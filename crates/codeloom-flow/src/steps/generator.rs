use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::debug;

use codeloom_core::error::{CodeloomError, Result};
use codeloom_core::traits::GenerationService;

use super::{Step, StepContext};
use crate::graph::GENERATOR;
use crate::output::strip_code_fences;
use crate::state::WorkflowState;

/// Produces (or on retry, reproduces) the code artifact for the task.
pub struct GeneratorStep {
    service: Arc<dyn GenerationService>,
}

impl GeneratorStep {
    pub fn new(service: Arc<dyn GenerationService>) -> Self {
        Self { service }
    }

    fn instruction(state: &WorkflowState) -> String {
        let mut instruction = format!(
            "Write clean, efficient code for: {}.\nReturn ONLY the code, no explanations.",
            state.task_description
        );
        // On a retry pass, feed the reviewer's objections back in
        if let Some(feedback) = state.review_feedback.as_deref() {
            instruction.push_str(&format!(
                "\n\nA previous attempt received this review feedback; address it:\n{feedback}"
            ));
        }
        instruction
    }
}

impl Step for GeneratorStep {
    fn name(&self) -> &'static str {
        GENERATOR
    }

    fn apply<'a>(
        &'a self,
        state: &'a mut WorkflowState,
        ctx: &'a StepContext,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let instruction = Self::instruction(state);
            let raw = self
                .service
                .complete(&ctx.model, &instruction, &state.task_description)
                .await?;

            let artifact = strip_code_fences(raw.trim());
            if artifact.is_empty() {
                return Err(CodeloomError::step(GENERATOR, "generation returned empty output"));
            }

            debug!(run = %ctx.run_id, bytes = artifact.len(), "generated artifact");
            state.generated_artifact = Some(artifact);
            Ok(())
        })
    }
}
