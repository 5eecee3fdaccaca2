//! Static workflow topology: named steps connected by unconditional and
//! routed edges. Built once at startup and shared read-only across runs.

pub mod edge;
pub mod router;

pub use edge::{
    Edge, Router, APPROVAL_GATE, DOCUMENTER, FALLBACK, GENERATOR, ORCHESTRATOR, REVIEWER, TERMINAL,
};
pub use router::{needs_retry, DecisionRouter, ReviewRouter};

use std::collections::HashMap;
use std::sync::Arc;

use codeloom_core::error::{CodeloomError, Result};

use crate::state::WorkflowState;

/// The workflow topology. Immutable after construction.
pub struct Graph {
    entry: &'static str,
    edges: HashMap<&'static str, Edge>,
}

impl Graph {
    pub fn builder(entry: &'static str) -> GraphBuilder {
        GraphBuilder {
            entry,
            edges: HashMap::new(),
        }
    }

    /// The standard code-workflow topology:
    ///
    /// ```text
    /// orchestrator ─(decision)─> generator | reviewer | documenter | fallback
    /// generator ──────────────> reviewer
    /// reviewer ──(feedback)───> generator | documenter
    /// documenter ─────────────> approval_gate ──> terminal
    /// fallback ───────────────> terminal
    /// ```
    pub fn standard() -> Self {
        Graph::builder(ORCHESTRATOR)
            .routed(
                ORCHESTRATOR,
                DecisionRouter,
                &[GENERATOR, REVIEWER, DOCUMENTER, FALLBACK],
            )
            .direct(GENERATOR, REVIEWER)
            .routed(REVIEWER, ReviewRouter, &[GENERATOR, DOCUMENTER])
            .direct(DOCUMENTER, APPROVAL_GATE)
            .direct(APPROVAL_GATE, TERMINAL)
            .direct(FALLBACK, TERMINAL)
            .build()
    }

    pub fn entry(&self) -> &'static str {
        self.entry
    }

    /// Number of steps with outgoing edges (every step except terminal).
    pub fn node_count(&self) -> usize {
        self.edges.len()
    }

    /// Resolve the next step from `current`.
    ///
    /// A routed edge's result is validated against its declared destination
    /// set; an out-of-range result is a programming error, not retried.
    pub fn next(&self, current: &str, state: &WorkflowState) -> Result<&'static str> {
        let edge = self.edges.get(current).ok_or_else(|| {
            CodeloomError::Graph(format!("no outgoing edge from step '{current}'"))
        })?;

        match edge {
            Edge::Direct { to } => Ok(to),
            Edge::Routed { router, allowed } => {
                let dest = router.decide(state);
                if !allowed.contains(&dest) {
                    return Err(CodeloomError::Graph(format!(
                        "router at '{current}' chose '{dest}', outside its declared destinations {allowed:?}"
                    )));
                }
                Ok(dest)
            }
        }
    }
}

pub struct GraphBuilder {
    entry: &'static str,
    edges: HashMap<&'static str, Edge>,
}

impl GraphBuilder {
    /// Add an unconditional edge.
    pub fn direct(mut self, from: &'static str, to: &'static str) -> Self {
        self.edges.insert(from, Edge::Direct { to });
        self
    }

    /// Add a conditional edge bound to `router`, restricted to `allowed`.
    pub fn routed(
        mut self,
        from: &'static str,
        router: impl Router,
        allowed: &[&'static str],
    ) -> Self {
        self.edges.insert(
            from,
            Edge::Routed {
                router: Arc::new(router),
                allowed: allowed.to_vec(),
            },
        );
        self
    }

    pub fn build(self) -> Graph {
        Graph {
            entry: self.entry,
            edges: self.edges,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeloom_core::types::RoutingDecision;

    #[test]
    fn test_standard_topology() {
        let graph = Graph::standard();
        assert_eq!(graph.entry(), ORCHESTRATOR);
        assert_eq!(graph.node_count(), 6);
    }

    #[test]
    fn test_orchestrator_routes_each_decision() {
        let graph = Graph::standard();
        let mut state = WorkflowState::new("task");

        state.routing_decision = Some(RoutingDecision::Generate);
        assert_eq!(graph.next(ORCHESTRATOR, &state).unwrap(), GENERATOR);

        state.routing_decision = Some(RoutingDecision::Review);
        assert_eq!(graph.next(ORCHESTRATOR, &state).unwrap(), REVIEWER);

        state.routing_decision = Some(RoutingDecision::Document);
        assert_eq!(graph.next(ORCHESTRATOR, &state).unwrap(), DOCUMENTER);

        state.routing_decision = Some(RoutingDecision::Unknown);
        assert_eq!(graph.next(ORCHESTRATOR, &state).unwrap(), FALLBACK);

        state.routing_decision = None;
        assert_eq!(graph.next(ORCHESTRATOR, &state).unwrap(), FALLBACK);
    }

    #[test]
    fn test_direct_edges() {
        let graph = Graph::standard();
        let state = WorkflowState::new("task");
        assert_eq!(graph.next(GENERATOR, &state).unwrap(), REVIEWER);
        assert_eq!(graph.next(DOCUMENTER, &state).unwrap(), APPROVAL_GATE);
        assert_eq!(graph.next(APPROVAL_GATE, &state).unwrap(), TERMINAL);
        assert_eq!(graph.next(FALLBACK, &state).unwrap(), TERMINAL);
    }

    #[test]
    fn test_missing_edge_is_graph_error() {
        let graph = Graph::standard();
        let state = WorkflowState::new("task");
        let err = graph.next(TERMINAL, &state).unwrap_err();
        assert!(matches!(err, CodeloomError::Graph(_)));
    }

    #[test]
    fn test_out_of_range_router_is_graph_error() {
        struct RogueRouter;
        impl Router for RogueRouter {
            fn decide(&self, _state: &WorkflowState) -> &'static str {
                "nonexistent"
            }
        }

        let graph = Graph::builder(ORCHESTRATOR)
            .routed(ORCHESTRATOR, RogueRouter, &[GENERATOR])
            .build();
        let state = WorkflowState::new("task");
        let err = graph.next(ORCHESTRATOR, &state).unwrap_err();
        assert!(matches!(err, CodeloomError::Graph(_)));
    }
}
