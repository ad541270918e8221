//! Permanent failure records kept for the final report.

use serde::{Deserialize, Serialize};

use crate::domain::{SessionSerial, SessionStatus, TaskKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No session could be created within the retry budget.
    Creation,

    /// A session was created and ended in a failed status.
    Execution,
}

/// One permanently failed task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedTask {
    pub task: TaskKey,
    pub kind: FailureKind,
    pub serial: Option<SessionSerial>,
    pub status: Option<SessionStatus>,
    pub detail: String,
}

impl FailedTask {
    pub fn creation(task: TaskKey, detail: impl Into<String>) -> Self {
        Self {
            task,
            kind: FailureKind::Creation,
            serial: None,
            status: None,
            detail: detail.into(),
        }
    }

    pub fn execution(
        task: TaskKey,
        serial: SessionSerial,
        status: Option<SessionStatus>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            task,
            kind: FailureKind::Execution,
            serial: Some(serial),
            status,
            detail: detail.into(),
        }
    }
}
