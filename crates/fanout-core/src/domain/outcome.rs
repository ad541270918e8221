//! Classification of an active session's status into what the loop does next.

use serde::{Deserialize, Serialize};

use super::session::SessionInfo;

/// Failure details that mean "the backend had no capacity", not "the task broke".
pub const DEFAULT_RESOURCE_PATTERNS: &[&str] = &[
    "insufficient memory",
    "no dispatcher",
    "no available capacity",
    "not enough heap",
    "resource unavailable",
];

/// What the control loop should do with one active session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Progress {
    /// Non-terminal: keep monitoring.
    Active,

    /// Terminal success.
    Completed,

    /// Terminal failure caused by capacity exhaustion. Requeued, not counted.
    ResourceUnavailable,

    /// Terminal failure for any other reason.
    Failed,
}

/// Narrow allowlist of "no capacity" signatures, matched case-insensitively
/// as substrings of the failure detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePatterns {
    enabled: bool,
    patterns: Vec<String>,
}

impl ResourcePatterns {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            enabled: true,
            patterns: patterns
                .into_iter()
                .map(|p| p.as_ref().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Carve-out switched off: every terminal failure is a plain failure.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            patterns: Vec::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn matches(&self, detail: &str) -> bool {
        if !self.enabled {
            return false;
        }
        let detail = detail.to_lowercase();
        self.patterns.iter().any(|p| detail.contains(p.as_str()))
    }

    /// Decide the next step for a session given its current status.
    pub fn classify(&self, info: &SessionInfo) -> Progress {
        if !info.is_terminal() {
            return Progress::Active;
        }
        if info.status.is_success() {
            return Progress::Completed;
        }
        match info.detail.as_deref() {
            Some(detail) if self.matches(detail) => Progress::ResourceUnavailable,
            _ => Progress::Failed,
        }
    }
}

impl Default for ResourcePatterns {
    fn default() -> Self {
        Self::new(DEFAULT_RESOURCE_PATTERNS)
    }
}
