use futures::future::BoxFuture;
use tracing::{debug, warn};

use codeloom_core::error::Result;
use codeloom_core::types::ApprovalStatus;

use super::{Step, StepContext};
use crate::graph::APPROVAL_GATE;
use crate::state::WorkflowState;

/// Pauses the run for an external yes/no decision.
///
/// Non-interactive runs approve immediately and never suspend. Interactive
/// runs block on the approval broker; a timeout or a closed channel
/// resolves to rejection. This is the only step that may suspend a run, and
/// it suspends only that run — other runs keep progressing.
pub struct ApprovalGateStep;

impl Step for ApprovalGateStep {
    fn name(&self) -> &'static str {
        APPROVAL_GATE
    }

    fn apply<'a>(
        &'a self,
        state: &'a mut WorkflowState,
        ctx: &'a StepContext,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if !ctx.interactive {
                state.approval_status = Some(ApprovalStatus::Approved);
                return Ok(());
            }

            debug!(run = %ctx.run_id, "awaiting approval decision");
            let rx = ctx.approvals.request(&ctx.run_id).await;

            let status = match tokio::time::timeout(ctx.approval_timeout, rx).await {
                Ok(Ok(decision)) => decision,
                Ok(Err(_)) => {
                    warn!(run = %ctx.run_id, "approval channel closed, rejecting");
                    ApprovalStatus::Rejected
                }
                Err(_) => {
                    warn!(
                        run = %ctx.run_id,
                        timeout_secs = ctx.approval_timeout.as_secs(),
                        "approval timed out, rejecting"
                    );
                    ApprovalStatus::Rejected
                }
            };

            debug!(run = %ctx.run_id, %status, "approval resolved");
            state.approval_status = Some(status);
            Ok(())
        })
    }
}
