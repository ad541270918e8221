//! Session status model as reported by the session backend.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::ids::SessionSerial;

/// Status of a remote worker session.
///
/// State transitions:
/// - Initializing -> Running -> Completed
/// - Initializing -> Running -> Failed
/// - any non-terminal -> Stopped (explicit stop)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    /// Accepted by the backend, worker not started yet.
    Initializing,

    /// Worker is executing.
    Running,

    /// Worker finished successfully.
    Completed,

    /// Worker terminated with an error.
    Failed,

    /// Worker was stopped before it finished.
    Stopped,
}

impl SessionStatus {
    pub fn name(self) -> &'static str {
        match self {
            SessionStatus::Initializing => "Initializing",
            SessionStatus::Running => "Running",
            SessionStatus::Completed => "Completed",
            SessionStatus::Failed => "Failed",
            SessionStatus::Stopped => "Stopped",
        }
    }

    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionStatus::Completed | SessionStatus::Failed | SessionStatus::Stopped
        )
    }

    pub fn is_running(self) -> bool {
        matches!(self, SessionStatus::Running)
    }

    pub fn is_success(self) -> bool {
        matches!(self, SessionStatus::Completed)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Status plus the backend's failure detail, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub status: SessionStatus,
    pub detail: Option<String>,
}

impl SessionInfo {
    pub fn new(status: SessionStatus) -> Self {
        Self {
            status,
            detail: None,
        }
    }

    pub fn with_detail(status: SessionStatus, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: Some(detail.into()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_running(&self) -> bool {
        self.status.is_running()
    }
}

/// Full status map plus the version token used for `wait_for_change`.
#[derive(Debug, Clone, Default)]
pub struct StatusSnapshot {
    pub sessions: HashMap<SessionSerial, SessionInfo>,
    pub version: u64,
}

impl StatusSnapshot {
    pub fn get(&self, serial: SessionSerial) -> Option<&SessionInfo> {
        self.sessions.get(&serial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(SessionStatus::Initializing, false, false)]
    #[case(SessionStatus::Running, false, false)]
    #[case(SessionStatus::Completed, true, true)]
    #[case(SessionStatus::Failed, true, false)]
    #[case(SessionStatus::Stopped, true, false)]
    fn terminal_and_success(
        #[case] status: SessionStatus,
        #[case] terminal: bool,
        #[case] success: bool,
    ) {
        assert_eq!(status.is_terminal(), terminal);
        assert_eq!(status.is_success(), success);
    }

    #[test]
    fn display_uses_name() {
        assert_eq!(SessionStatus::Running.to_string(), "Running");
        assert!(SessionInfo::new(SessionStatus::Running).is_running());
    }
}
