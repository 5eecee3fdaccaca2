use std::sync::Arc;

use crate::state::WorkflowState;

/// Step names — the graph's vocabulary.
pub const ORCHESTRATOR: &str = "orchestrator";
pub const GENERATOR: &str = "generator";
pub const REVIEWER: &str = "reviewer";
pub const DOCUMENTER: &str = "documenter";
pub const FALLBACK: &str = "fallback";
pub const APPROVAL_GATE: &str = "approval_gate";
/// Pseudo-step marking the end of a run. No step is registered under it.
pub const TERMINAL: &str = "terminal";

/// Pure routing function evaluated at a conditional edge.
///
/// A router reads state and names the next step; it never mutates state and
/// never performs I/O. The result must be one of the edge's declared
/// destinations — the graph enforces this.
pub trait Router: Send + Sync + 'static {
    fn decide(&self, state: &WorkflowState) -> &'static str;
}

/// Outgoing transition from a step.
#[derive(Clone)]
pub enum Edge {
    /// Unconditional transition.
    Direct { to: &'static str },
    /// Transition chosen by a router, constrained to `allowed`.
    Routed {
        router: Arc<dyn Router>,
        allowed: Vec<&'static str>,
    },
}
