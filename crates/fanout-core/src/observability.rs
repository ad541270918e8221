use serde::{Deserialize, Serialize};

/// Point-in-time counters for one orchestration run.
///
/// `created` counts every session handed out, so a task requeued for lack of
/// resources and launched again is counted twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestrationCounts {
    pub total: usize,
    pub created: usize,
    pub completed: usize,
    pub creation_failures: usize,
    pub execution_failures: usize,
    pub creation_retries: usize,
    pub resource_requeues: usize,
    pub stopped: usize,
    pub pending: usize,
    pub active: usize,
}

impl OrchestrationCounts {
    pub fn failed(&self) -> usize {
        self.creation_failures + self.execution_failures
    }

    /// Tasks that ended the run without a live or finished session:
    /// permanent creation failures plus whatever was still pending.
    pub fn not_started(&self) -> usize {
        self.creation_failures + self.pending
    }

    /// Progress measure used by idle detection.
    ///
    /// A resource requeue followed by a relaunch nets to zero here, so a task
    /// stuck in that loop still shows up as no progress.
    pub fn progress(&self) -> u64 {
        let net_created = self.created.saturating_sub(self.resource_requeues);
        (net_created + self.completed + self.failed()) as u64
    }
}
