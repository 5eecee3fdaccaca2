use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, warn};

use codeloom_core::error::Result;
use codeloom_core::traits::GenerationService;
use codeloom_core::types::RoutingDecision;

use super::{Step, StepContext};
use crate::graph::ORCHESTRATOR;
use crate::state::WorkflowState;

const CLASSIFY_INSTRUCTION: &str = "You are an orchestrator. Decide which agent to call based on the task:\n\
- If the task asks to write or generate code, respond with GENERATE.\n\
- If the task asks to review or debug code, respond with REVIEW.\n\
- If the task asks to add docs or explain code, respond with DOCUMENT.\n\
Respond ONLY with GENERATE, REVIEW, or DOCUMENT.";

/// Classifies the task and records the routing decision.
///
/// This is the one point where open-vocabulary model output crosses into a
/// closed enum, so it is deliberately defensive: unexpected text, empty
/// text, and service failure all collapse to `Unknown` (the fallback path)
/// instead of aborting the run.
pub struct OrchestratorStep {
    service: Arc<dyn GenerationService>,
}

impl OrchestratorStep {
    pub fn new(service: Arc<dyn GenerationService>) -> Self {
        Self { service }
    }
}

impl Step for OrchestratorStep {
    fn name(&self) -> &'static str {
        ORCHESTRATOR
    }

    fn apply<'a>(
        &'a self,
        state: &'a mut WorkflowState,
        ctx: &'a StepContext,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let decision = match self
                .service
                .complete(&ctx.model, CLASSIFY_INSTRUCTION, &state.task_description)
                .await
            {
                Ok(raw) => RoutingDecision::normalize(&raw),
                Err(e) => {
                    warn!(run = %ctx.run_id, error = %e, "classification failed, using fallback path");
                    RoutingDecision::Unknown
                }
            };

            debug!(run = %ctx.run_id, %decision, "orchestrator decision");
            state.routing_decision = Some(decision);
            Ok(())
        })
    }
}
