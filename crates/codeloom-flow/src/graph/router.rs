use codeloom_core::types::RoutingDecision;

use super::edge::{Router, DOCUMENTER, FALLBACK, GENERATOR, REVIEWER};
use crate::state::WorkflowState;

/// Keywords in review feedback that send the run back to the generator.
const TROUBLE_KEYWORDS: [&str; 2] = ["error", "fix"];

/// Routes the orchestrator's classification to the matching step.
///
/// Anything other than the three known decisions — including an unset
/// decision — goes to the fallback step.
pub struct DecisionRouter;

impl Router for DecisionRouter {
    fn decide(&self, state: &WorkflowState) -> &'static str {
        match state.routing_decision {
            Some(RoutingDecision::Generate) => GENERATOR,
            Some(RoutingDecision::Review) => REVIEWER,
            Some(RoutingDecision::Document) => DOCUMENTER,
            Some(RoutingDecision::Unknown) | None => FALLBACK,
        }
    }
}

/// Sends the run back to the generator when review feedback flags trouble,
/// otherwise forward to documentation.
///
/// Pure predicate only — the retry bound on this cycle is the engine's job.
pub struct ReviewRouter;

impl Router for ReviewRouter {
    fn decide(&self, state: &WorkflowState) -> &'static str {
        if needs_retry(state) {
            GENERATOR
        } else {
            DOCUMENTER
        }
    }
}

/// True when the latest review feedback contains a trouble keyword.
/// Unset feedback never retries.
pub fn needs_retry(state: &WorkflowState) -> bool {
    let Some(feedback) = state.review_feedback.as_deref() else {
        return false;
    };
    let feedback = feedback.to_lowercase();
    TROUBLE_KEYWORDS.iter().any(|kw| feedback.contains(kw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_decision(decision: Option<RoutingDecision>) -> WorkflowState {
        let mut state = WorkflowState::new("task");
        state.routing_decision = decision;
        state
    }

    fn state_with_feedback(feedback: &str) -> WorkflowState {
        let mut state = WorkflowState::new("task");
        state.review_feedback = Some(feedback.to_string());
        state
    }

    #[test]
    fn test_decision_routing_table() {
        let router = DecisionRouter;
        assert_eq!(
            router.decide(&state_with_decision(Some(RoutingDecision::Generate))),
            GENERATOR
        );
        assert_eq!(
            router.decide(&state_with_decision(Some(RoutingDecision::Review))),
            REVIEWER
        );
        assert_eq!(
            router.decide(&state_with_decision(Some(RoutingDecision::Document))),
            DOCUMENTER
        );
        assert_eq!(
            router.decide(&state_with_decision(Some(RoutingDecision::Unknown))),
            FALLBACK
        );
        assert_eq!(router.decide(&state_with_decision(None)), FALLBACK);
    }

    #[test]
    fn test_needs_retry_on_trouble_keywords() {
        assert!(needs_retry(&state_with_feedback(
            "There is an error in the loop"
        )));
        assert!(needs_retry(&state_with_feedback("Please FIX the imports")));
        assert!(needs_retry(&state_with_feedback("ERRORS everywhere")));
    }

    #[test]
    fn test_no_retry_on_clean_feedback() {
        assert!(!needs_retry(&state_with_feedback("Code looks good")));
        assert!(!needs_retry(&state_with_feedback("")));
        assert!(!needs_retry(&WorkflowState::new("task")));
    }

    #[test]
    fn test_review_router_destinations() {
        let router = ReviewRouter;
        assert_eq!(
            router.decide(&state_with_feedback("fix the off-by-one")),
            GENERATOR
        );
        assert_eq!(router.decide(&state_with_feedback("ship it")), DOCUMENTER);
        assert_eq!(router.decide(&WorkflowState::new("task")), DOCUMENTER);
    }
}
