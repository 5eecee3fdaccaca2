use serde::{Deserialize, Serialize};

use codeloom_core::types::{ApprovalStatus, RoutingDecision};

/// The mutable record threaded through one run of the graph.
///
/// Each run owns its own copy; the engine hands it to exactly one step at a
/// time. The serde field names are the wire format used by the checkpoint
/// store and the JSON output surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowState {
    /// The caller's task, immutable for the lifetime of the run.
    pub task_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_decision: Option<RoutingDecision>,
    /// Latest generated artifact; overwritten on each retry pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_artifact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_feedback: Option<String>,
    /// The final deliverable, whichever path produced it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documented_artifact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_status: Option<ApprovalStatus>,
    /// Traversals of the review→generation edge so far. Owned by the
    /// engine; steps never touch it.
    #[serde(default)]
    pub retry_count: u32,
}

impl WorkflowState {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task_description: task.into(),
            routing_decision: None,
            generated_artifact: None,
            review_feedback: None,
            documented_artifact: None,
            approval_status: None,
            retry_count: 0,
        }
    }
}

/// Final projection of a completed run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    pub decision: Option<RoutingDecision>,
    pub generated_artifact: Option<String>,
    pub review_feedback: Option<String>,
    pub documented_artifact: Option<String>,
    pub approval_status: Option<ApprovalStatus>,
}

impl From<WorkflowState> for RunOutcome {
    fn from(state: WorkflowState) -> Self {
        Self {
            decision: state.routing_decision,
            generated_artifact: state.generated_artifact,
            review_feedback: state.review_feedback,
            documented_artifact: state.documented_artifact,
            approval_status: state.approval_status,
        }
    }
}
