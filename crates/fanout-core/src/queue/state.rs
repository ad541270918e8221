//! Task state machine for the orchestrator.

use serde::{Deserialize, Serialize};

/// Where a task currently lives.
///
/// State transitions:
/// - Pending -> Active -> Completed
/// - Pending -> Pending (creation retry, re-queued at the front)
/// - Pending -> Failed (creation retries exhausted)
/// - Active -> Failed (execution failure)
/// - Active -> Pending (resource unavailable, re-queued at the front)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskState {
    /// Waiting for a launch slot.
    Pending,

    /// A session exists and is being monitored.
    Active,

    /// Session finished successfully.
    Completed,

    /// Failed permanently (creation or execution).
    Failed,
}

impl TaskState {
    fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }

    pub fn can_transition_to(self, next: TaskState) -> bool {
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (TaskState::Pending, TaskState::Pending)
                | (TaskState::Pending, TaskState::Active)
                | (TaskState::Pending, TaskState::Failed)
                | (TaskState::Active, TaskState::Completed)
                | (TaskState::Active, TaskState::Failed)
                | (TaskState::Active, TaskState::Pending)
        )
    }
}
