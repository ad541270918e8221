//! Run summary and exit status.

use serde::Serialize;

use crate::observability::OrchestrationCounts;
use crate::queue::{FailedTask, FailureKind};

/// Process exit status, distinguishable without parsing logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitStatus {
    Success,
    /// Some tasks never got a session, including ones still pending when the
    /// run was interrupted or aborted.
    CreationFailures,
    /// Some created sessions failed during execution.
    ExecutionFailures,
    BothFailures,
    /// Uncaught orchestration or setup error.
    InternalError,
}

impl ExitStatus {
    /// `not_started` covers creation failures and tasks left pending.
    pub fn from_failures(not_started: usize, execution_failures: usize) -> Self {
        match (not_started > 0, execution_failures > 0) {
            (false, false) => ExitStatus::Success,
            (true, false) => ExitStatus::CreationFailures,
            (false, true) => ExitStatus::ExecutionFailures,
            (true, true) => ExitStatus::BothFailures,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::CreationFailures => 1,
            ExitStatus::ExecutionFailures => 2,
            ExitStatus::BothFailures => 3,
            ExitStatus::InternalError => 4,
        }
    }
}

/// Final state of one `Orchestrator::run`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub counts: OrchestrationCounts,
    pub failed: Vec<FailedTask>,
    /// Stopped by the cancellation token.
    pub interrupted: bool,
    /// Stopped by the failure circuit breaker.
    pub aborted: bool,
    pub exit_status: ExitStatus,
}

impl RunReport {
    pub fn new(
        counts: OrchestrationCounts,
        failed: Vec<FailedTask>,
        interrupted: bool,
        aborted: bool,
    ) -> Self {
        // Tasks still pending at the end never got a session either.
        let exit_status = ExitStatus::from_failures(counts.not_started(), counts.execution_failures);
        Self {
            counts,
            failed,
            interrupted,
            aborted,
            exit_status,
        }
    }

    pub fn exit_status(&self) -> ExitStatus {
        self.exit_status
    }

    /// Human-readable summary, one line per entry.
    pub fn summary_lines(&self) -> Vec<String> {
        let c = &self.counts;
        let mut lines = vec![
            format!(
                "tasks={} created={} completed={} failed={} (creation={}, execution={})",
                c.total,
                c.created,
                c.completed,
                c.failed(),
                c.creation_failures,
                c.execution_failures
            ),
            format!(
                "creation_retries={} resource_requeues={} stopped={} pending={} active={}",
                c.creation_retries, c.resource_requeues, c.stopped, c.pending, c.active
            ),
            format!("never started={}", c.not_started()),
        ];
        if self.interrupted {
            lines.push("run interrupted by shutdown request".to_string());
        }
        if self.aborted {
            lines.push("run aborted: failure limit reached".to_string());
        }
        for failure in &self.failed {
            let kind = match failure.kind {
                FailureKind::Creation => "creation",
                FailureKind::Execution => "execution",
            };
            let serial = failure
                .serial
                .map(|s| format!(" {s}"))
                .unwrap_or_default();
            let status = failure
                .status
                .map(|s| format!(" [{s}]"))
                .unwrap_or_default();
            lines.push(format!(
                "FAILED {} ({kind}){serial}{status}: {}",
                failure.task, failure.detail
            ));
        }
        lines.push(format!(
            "exit status {} ({:?})",
            self.exit_status.code(),
            self.exit_status
        ));
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SessionSerial, SessionStatus, TaskKey};
    use chrono::NaiveDate;
    use rstest::rstest;

    #[rstest]
    #[case(0, 0, 0)]
    #[case(2, 0, 1)]
    #[case(0, 5, 2)]
    #[case(1, 1, 3)]
    fn exit_code_mapping(#[case] creation: usize, #[case] execution: usize, #[case] code: u8) {
        assert_eq!(ExitStatus::from_failures(creation, execution).code(), code);
    }

    #[test]
    fn interrupted_run_with_pending_tasks_is_not_success() {
        let counts = OrchestrationCounts {
            total: 4,
            pending: 4,
            ..Default::default()
        };
        let report = RunReport::new(counts, Vec::new(), true, false);
        assert_eq!(report.exit_status(), ExitStatus::CreationFailures);
        assert!(report.summary_lines().iter().any(|l| l == "never started=4"));
    }

    #[test]
    fn aborted_run_counts_pending_and_execution_failures() {
        let counts = OrchestrationCounts {
            total: 6,
            created: 2,
            execution_failures: 2,
            pending: 4,
            ..Default::default()
        };
        let report = RunReport::new(counts, Vec::new(), false, true);
        assert_eq!(report.exit_status(), ExitStatus::BothFailures);
    }

    #[test]
    fn internal_error_is_four() {
        assert_eq!(ExitStatus::InternalError.code(), 4);
    }

    #[test]
    fn summary_lists_every_failure() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let failed = vec![
            FailedTask::creation(TaskKey::new(date, 0), "connection refused"),
            FailedTask::execution(
                TaskKey::new(date, 1),
                SessionSerial::new(12),
                Some(SessionStatus::Failed),
                "ZeroDivisionError",
            ),
        ];
        let counts = OrchestrationCounts {
            total: 2,
            created: 1,
            creation_failures: 1,
            execution_failures: 1,
            ..Default::default()
        };
        let report = RunReport::new(counts, failed, false, false);
        let lines = report.summary_lines();

        assert_eq!(report.exit_status(), ExitStatus::BothFailures);
        assert!(lines.iter().any(|l| l == "FAILED 2024-01-02/p0 (creation): connection refused"));
        assert!(lines
            .iter()
            .any(|l| l == "FAILED 2024-01-02/p1 (execution) serial-12 [Failed]: ZeroDivisionError"));
        assert_eq!(lines.last().unwrap(), "exit status 3 (BothFailures)");
    }
}
