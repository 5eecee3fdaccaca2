//! Workflow graph execution engine.
//!
//! A workflow is a small directed graph of named steps (orchestrator,
//! generator, reviewer, documenter, fallback, approval gate) threaded by a
//! single mutable [`WorkflowState`]. The [`Engine`] walks the graph from its
//! entry step, resolving each transition via fixed edges or a [`Router`],
//! checkpointing after every step so interrupted runs can resume, and
//! bounding the one designed cycle (reviewer → generator) with a hard retry
//! cap.

pub mod approval;
pub mod checkpoint;
pub mod engine;
pub mod graph;
pub mod output;
pub mod state;
pub mod steps;

pub use approval::ApprovalBroker;
pub use checkpoint::{CheckpointRecord, CheckpointStore};
pub use engine::{Engine, RunConfig, RunError};
pub use graph::{Graph, Router};
pub use state::{RunOutcome, WorkflowState};
pub use steps::{Step, StepContext};
