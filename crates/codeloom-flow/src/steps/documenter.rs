use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::debug;

use codeloom_core::error::{CodeloomError, Result};
use codeloom_core::traits::GenerationService;

use super::{Step, StepContext};
use crate::graph::DOCUMENTER;
use crate::output::strip_code_fences;
use crate::state::WorkflowState;

/// Adds comments and a docstring to the current artifact.
pub struct DocumenterStep {
    service: Arc<dyn GenerationService>,
}

impl DocumenterStep {
    pub fn new(service: Arc<dyn GenerationService>) -> Self {
        Self { service }
    }
}

impl Step for DocumenterStep {
    fn name(&self) -> &'static str {
        DOCUMENTER
    }

    fn apply<'a>(
        &'a self,
        state: &'a mut WorkflowState,
        ctx: &'a StepContext,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            // When routed here directly, the task itself carries the code.
            let code = state
                .generated_artifact
                .as_deref()
                .unwrap_or(&state.task_description);

            let instruction = format!(
                "Add detailed comments and a docstring to this code:\n{code}\nReturn the code with inline comments."
            );

            let raw = self
                .service
                .complete(&ctx.model, &instruction, "Document the code")
                .await?;

            let documented = strip_code_fences(raw.trim());
            if documented.is_empty() {
                return Err(CodeloomError::step(
                    DOCUMENTER,
                    "documentation returned empty output",
                ));
            }

            debug!(run = %ctx.run_id, bytes = documented.len(), "documented artifact");
            state.documented_artifact = Some(documented);
            Ok(())
        })
    }
}
