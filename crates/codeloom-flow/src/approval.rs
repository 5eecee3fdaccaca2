use std::collections::HashMap;

use tokio::sync::{oneshot, Mutex};

use codeloom_core::types::{ApprovalStatus, RunId};

struct Pending {
    waiting: HashMap<RunId, oneshot::Sender<ApprovalStatus>>,
    /// Decisions that arrived before the run reached the gate.
    decided: HashMap<RunId, ApprovalStatus>,
}

/// Brokers approval decisions between suspended runs and the outside world.
///
/// A run suspended at the approval gate awaits the receiver returned by
/// [`request`](Self::request); any other task resolves it via
/// [`respond`](Self::respond). Decisions that arrive early are held and
/// consumed by the next `request` for that run.
pub struct ApprovalBroker {
    pending: Mutex<Pending>,
}

impl ApprovalBroker {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(Pending {
                waiting: HashMap::new(),
                decided: HashMap::new(),
            }),
        }
    }

    /// Register a pending decision for `run_id` and return the receiver the
    /// gate awaits. Resolves immediately if a decision was already recorded.
    pub async fn request(&self, run_id: &RunId) -> oneshot::Receiver<ApprovalStatus> {
        let (tx, rx) = oneshot::channel();
        let mut pending = self.pending.lock().await;
        if let Some(status) = pending.decided.remove(run_id) {
            let _ = tx.send(status);
        } else {
            pending.waiting.insert(run_id.clone(), tx);
        }
        rx
    }

    /// Resolve a decision for `run_id`. Returns true if a run was actively
    /// waiting; otherwise the decision is held for the run's next request.
    pub async fn respond(&self, run_id: &RunId, status: ApprovalStatus) -> bool {
        let mut pending = self.pending.lock().await;
        if let Some(tx) = pending.waiting.remove(run_id) {
            // Ignore send error (receiver may have been dropped on timeout)
            let _ = tx.send(status);
            true
        } else {
            pending.decided.insert(run_id.clone(), status);
            false
        }
    }

    /// Runs currently suspended at the approval gate.
    pub async fn pending_runs(&self) -> Vec<RunId> {
        self.pending.lock().await.waiting.keys().cloned().collect()
    }
}

impl Default for ApprovalBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn respond_approve() {
        let broker = ApprovalBroker::new();
        let run = RunId::new();

        let rx = broker.request(&run).await;
        assert!(broker.respond(&run, ApprovalStatus::Approved).await);
        assert_eq!(rx.await.unwrap(), ApprovalStatus::Approved);
    }

    #[tokio::test]
    async fn respond_reject() {
        let broker = ApprovalBroker::new();
        let run = RunId::new();

        let rx = broker.request(&run).await;
        assert!(broker.respond(&run, ApprovalStatus::Rejected).await);
        assert_eq!(rx.await.unwrap(), ApprovalStatus::Rejected);
    }

    #[tokio::test]
    async fn early_decision_is_held_for_request() {
        let broker = ApprovalBroker::new();
        let run = RunId::new();

        // Decision lands before the run reaches the gate
        assert!(!broker.respond(&run, ApprovalStatus::Approved).await);

        let rx = broker.request(&run).await;
        assert_eq!(rx.await.unwrap(), ApprovalStatus::Approved);
    }

    #[tokio::test]
    async fn dropped_receiver_does_not_poison_broker() {
        let broker = ApprovalBroker::new();
        let run = RunId::new();

        let rx = broker.request(&run).await;
        drop(rx);
        // Sender hits a dropped receiver; respond still cleans up
        assert!(broker.respond(&run, ApprovalStatus::Approved).await);
        assert!(broker.pending_runs().await.is_empty());
    }

    #[tokio::test]
    async fn pending_runs_listed() {
        let broker = ApprovalBroker::new();
        let a = RunId::new();
        let b = RunId::new();

        let _rx_a = broker.request(&a).await;
        let _rx_b = broker.request(&b).await;

        let pending = broker.pending_runs().await;
        assert_eq!(pending.len(), 2);
    }
}
