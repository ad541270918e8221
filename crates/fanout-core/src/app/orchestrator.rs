//! Orchestrator - セッションのスケジューリングループ
//!
//! # フロー（1 iteration）
//! 1. 空き枠があるだけ pending から session を作成（失敗は retry policy に従う）
//! 2. status_map() で active な session を分類
//!    （完了 / 実行中 / リソース不足で再投入 / 失敗）
//! 3. 失敗数が上限に達したら中断（circuit breaker）
//! 4. 進捗が止まっていれば警告（idle detection、制御には影響しない）
//! 5. 何も起動できない間は wait_for_change() で状態変化を待つ
//!
//! キャンセルは CancellationToken で受け取り、各フェーズの先頭と
//! 起動ループ内で確認します。

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::idle::{IdleDetector, IdlePhase};
use super::report::RunReport;
use crate::config::{ExecutionSettings, JobConfig};
use crate::domain::{
    Progress, ResourcePatterns, SessionSerial, StatusSnapshot, TaskKey, WorkerPayload,
};
use crate::ports::SessionClient;
use crate::queue::{RetryDecision, RetryPolicy, TaskBoard};

/// Detail recorded when an active serial is absent from the status map.
pub const SESSION_DISAPPEARED: &str = "session disappeared";

/// Builds the payload handed to `create_session` for one task.
pub type PayloadFn = dyn Fn(&TaskKey) -> WorkerPayload + Send + Sync;

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("session client returned the unassigned serial for {0}")]
    SentinelSerial(TaskKey),

    #[error("session client returned {serial} for {task}, already tracked for {existing}")]
    DuplicateSerial {
        task: TaskKey,
        serial: SessionSerial,
        existing: TaskKey,
    },
}

/// Loop tuning, taken from the validated `execution` section.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub max_concurrent_sessions: usize,
    pub retry: RetryPolicy,
    pub max_failures: Option<usize>,
    pub resource_patterns: ResourcePatterns,
    pub resource_retry_delay: Duration,
    pub status_timeout: Duration,
    pub poll_fallback: Duration,
    pub startup_idle_iterations: u32,
    pub idle_iterations: u32,
    pub delete_successful: bool,
    pub delete_failed: bool,
    pub stop_on_shutdown: bool,
}

impl OrchestratorSettings {
    pub fn from_execution(execution: &ExecutionSettings) -> Self {
        Self {
            max_concurrent_sessions: execution.max_concurrent_sessions,
            retry: RetryPolicy::new(execution.max_retries, execution.retry_delay),
            max_failures: execution.max_failures,
            resource_patterns: execution.resource_patterns.clone(),
            resource_retry_delay: execution.resource_retry_delay,
            status_timeout: execution.status_timeout,
            poll_fallback: execution.poll_fallback,
            startup_idle_iterations: execution.startup_idle_iterations,
            idle_iterations: execution.idle_iterations,
            delete_successful: execution.delete_successful,
            delete_failed: execution.delete_failed,
            stop_on_shutdown: execution.stop_on_shutdown,
        }
    }
}

/// Sleep for `delay` unless cancelled first. Returns false when cancelled.
async fn pause(cancel: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

/// Drives every task of a run through a `SessionClient`.
///
/// All run state lives in a `TaskBoard` owned by the orchestrator, so the loop
/// needs no locks. The board survives `run()` to allow a later
/// `shutdown_cleanup()`.
pub struct Orchestrator {
    client: Arc<dyn SessionClient>,
    settings: OrchestratorSettings,
    payload: Box<PayloadFn>,
    board: TaskBoard,
    cleaned_up: bool,
}

impl Orchestrator {
    pub fn new<F>(client: Arc<dyn SessionClient>, settings: OrchestratorSettings, payload: F) -> Self
    where
        F: Fn(&TaskKey) -> WorkerPayload + Send + Sync + 'static,
    {
        Self {
            client,
            settings,
            payload: Box::new(payload),
            board: TaskBoard::default(),
            cleaned_up: false,
        }
    }

    /// Orchestrator for a validated job: settings and payloads come from `config`.
    pub fn for_job(client: Arc<dyn SessionClient>, config: Arc<JobConfig>) -> Self {
        let settings = OrchestratorSettings::from_execution(&config.execution);
        Self::new(client, settings, move |task| config.payload_for(task))
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub fn board(&self) -> &TaskBoard {
        &self.board
    }

    fn breaker_tripped(&self) -> bool {
        self.settings
            .max_failures
            .is_some_and(|max| self.board.failures_total() >= max)
    }

    fn can_launch(&self) -> bool {
        self.board.has_pending() && self.board.active_len() < self.settings.max_concurrent_sessions
    }

    /// Run `tasks` to completion, cancellation, or the failure limit.
    ///
    /// Session-level errors never escape; only broken client invariants do.
    pub async fn run(
        &mut self,
        tasks: Vec<TaskKey>,
        cancel: &CancellationToken,
    ) -> Result<RunReport, OrchestratorError> {
        self.board = TaskBoard::new(tasks);
        self.cleaned_up = false;

        let mut idle =
            IdleDetector::new(self.settings.startup_idle_iterations, self.settings.idle_iterations);
        let mut interrupted = false;
        let mut aborted = false;

        info!(
            total = self.board.counts().total,
            cap = self.settings.max_concurrent_sessions,
            max_retries = self.settings.retry.max_retries,
            max_failures = ?self.settings.max_failures,
            "orchestration started"
        );

        loop {
            if cancel.is_cancelled() {
                interrupted = true;
                break;
            }

            self.launch(cancel).await?;
            if self.breaker_tripped() {
                aborted = true;
                break;
            }
            if cancel.is_cancelled() {
                interrupted = true;
                break;
            }
            if self.board.is_drained() {
                break;
            }

            let version = match self.client.status_map().await {
                Ok(snapshot) => {
                    if self.classify(&snapshot, cancel).await {
                        aborted = true;
                        break;
                    }
                    Some(snapshot.version)
                }
                Err(e) => {
                    warn!(error = %e, kind = ?e.kind(), "status map unavailable; retrying after fallback delay");
                    pause(cancel, self.settings.poll_fallback).await;
                    None
                }
            };

            let progress = self.board.progress();
            let started = self.board.counts().created > 0;
            if let Some(warning) = idle.observe(progress, started) {
                let phase = match warning.phase {
                    IdlePhase::Startup => "startup",
                    IdlePhase::SteadyState => "steady",
                };
                warn!(
                    phase,
                    iterations = warning.iterations,
                    progress,
                    active = self.board.active_len(),
                    pending = self.board.pending_len(),
                    "no progress; sessions may be stalled"
                );
            }

            if cancel.is_cancelled() {
                interrupted = true;
                break;
            }
            if self.board.is_drained() {
                break;
            }

            // 起動できる task があるなら待たずに次の iteration へ
            if let Some(version) = version
                && !self.can_launch()
            {
                self.wait(version, cancel).await;
            }
        }

        if interrupted || aborted {
            if aborted {
                error!(
                    failures = self.board.failures_total(),
                    max_failures = ?self.settings.max_failures,
                    "failure limit reached; aborting run"
                );
            } else {
                warn!("shutdown requested; no further sessions will be created");
            }
            if self.settings.stop_on_shutdown {
                self.shutdown_cleanup().await;
            } else if self.board.active_len() > 0 {
                warn!(
                    active = self.board.active_len(),
                    "leaving active sessions running"
                );
            }
        } else {
            self.post_run_cleanup().await;
        }

        let report = RunReport::new(
            self.board.counts(),
            self.board.failed().to_vec(),
            interrupted,
            aborted,
        );
        info!(
            completed = report.counts.completed,
            creation_failures = report.counts.creation_failures,
            execution_failures = report.counts.execution_failures,
            exit_code = report.exit_status().code(),
            "orchestration finished"
        );
        Ok(report)
    }

    /// Fill free capacity from the front of the pending queue.
    async fn launch(&mut self, cancel: &CancellationToken) -> Result<(), OrchestratorError> {
        while self.can_launch() && !cancel.is_cancelled() && !self.breaker_tripped() {
            let Some(task) = self.board.next_pending() else {
                break;
            };
            let payload = (self.payload)(&task);

            match self.client.create_session(&task, &payload).await {
                Ok(serial) => {
                    if !serial.is_assigned() {
                        return Err(OrchestratorError::SentinelSerial(task));
                    }
                    if let Some(existing) = self.board.task_for(serial) {
                        return Err(OrchestratorError::DuplicateSerial {
                            task,
                            serial,
                            existing,
                        });
                    }
                    self.board.activate(task, serial);
                    info!(task = %task, serial = %serial, query = %payload.query_name, "session created");
                }
                Err(e) => match self.settings.retry.decide(self.board.retries_used(&task)) {
                    RetryDecision::Retry { retry, delay } => {
                        self.board.requeue_for_retry(task);
                        warn!(
                            task = %task,
                            retry,
                            max_retries = self.settings.retry.max_retries,
                            error = %e,
                            kind = ?e.kind(),
                            "session creation failed; retrying"
                        );
                        if !pause(cancel, delay).await {
                            break;
                        }
                    }
                    RetryDecision::GiveUp { attempts } => {
                        error!(task = %task, attempts, error = %e, "session creation failed permanently");
                        self.board.fail_creation(task, e.to_string());
                    }
                },
            }
        }
        Ok(())
    }

    /// Apply one status snapshot to every active task. Returns true when the
    /// failure limit was reached.
    async fn classify(&mut self, snapshot: &StatusSnapshot, cancel: &CancellationToken) -> bool {
        for (task, serial) in self.board.active_sessions() {
            if self.breaker_tripped() {
                return true;
            }

            let Some(info) = snapshot.get(serial) else {
                error!(task = %task, serial = %serial, "session missing from status map");
                self.board.fail_execution(task, None, SESSION_DISAPPEARED);
                continue;
            };

            match self.settings.resource_patterns.classify(info) {
                Progress::Active => {
                    debug!(task = %task, serial = %serial, status = %info.status, "session active");
                }
                Progress::Completed => {
                    self.board.complete(task);
                    info!(task = %task, serial = %serial, "session completed");
                }
                Progress::ResourceUnavailable => {
                    let detail = info.detail.as_deref().unwrap_or_default();
                    if let Err(e) = self.client.delete_session(serial).await {
                        warn!(task = %task, serial = %serial, error = %e, "failed to delete resource-starved session");
                    }
                    let requeues = self
                        .board
                        .requeue_resource(task)
                        .map(|(_, n)| n)
                        .unwrap_or_default();
                    warn!(
                        task = %task,
                        serial = %serial,
                        status = %info.status,
                        detail,
                        requeues,
                        "session lacked resources; requeueing"
                    );
                    if !pause(cancel, self.settings.resource_retry_delay).await {
                        return false;
                    }
                }
                Progress::Failed => {
                    let detail = info
                        .detail
                        .clone()
                        .unwrap_or_else(|| format!("session ended {}", info.status));
                    error!(
                        task = %task,
                        serial = %serial,
                        status = %info.status,
                        detail = %detail,
                        "session failed"
                    );
                    self.board.fail_execution(task, Some(info.status), detail);
                }
            }
        }
        self.breaker_tripped()
    }

    async fn wait(&self, version: u64, cancel: &CancellationToken) {
        tokio::select! {
            _ = cancel.cancelled() => {}
            changed = self.client.wait_for_change(version, self.settings.status_timeout) => match changed {
                Ok(Some(current)) => debug!(version = current, "session status changed"),
                Ok(None) => debug!(version, "no status change before timeout"),
                Err(e) => {
                    warn!(error = %e, "status wait failed; falling back to polling");
                    pause(cancel, self.settings.poll_fallback).await;
                }
            },
        }
    }

    /// Stop then delete every session still tracked as active.
    ///
    /// Safe to call more than once; only the first call touches the backend.
    /// Errors are logged and never escalated.
    pub async fn shutdown_cleanup(&mut self) {
        if self.cleaned_up {
            return;
        }
        self.cleaned_up = true;

        let drained = self.board.drain_active();
        if drained.is_empty() {
            return;
        }
        info!(sessions = drained.len(), "stopping active sessions");
        for (task, serial) in drained {
            if let Err(e) = self.client.stop_session(serial).await {
                warn!(task = %task, serial = %serial, error = %e, "failed to stop session");
            }
            if let Err(e) = self.client.delete_session(serial).await {
                warn!(task = %task, serial = %serial, error = %e, "failed to delete session");
            }
        }
    }

    async fn post_run_cleanup(&self) {
        let mut targets: Vec<SessionSerial> = Vec::new();
        if self.settings.delete_successful {
            targets.extend_from_slice(self.board.completed_serials());
        }
        if self.settings.delete_failed {
            targets.extend(self.board.failed_serials());
        }
        if targets.is_empty() {
            return;
        }
        info!(sessions = targets.len(), "deleting finished sessions");
        for serial in targets {
            if let Err(e) = self.client.delete_session(serial).await {
                warn!(serial = %serial, error = %e, "failed to delete finished session");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    use crate::app::ExitStatus;
    use crate::domain::{ExecutionMode, SessionError, generate_tasks};
    use crate::impls::{InMemorySessionClient, RunScript};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn key(p: u32) -> TaskKey {
        TaskKey::new(date(1), p)
    }

    fn settings(cap: usize) -> OrchestratorSettings {
        OrchestratorSettings {
            max_concurrent_sessions: cap,
            retry: RetryPolicy::new(3, Duration::from_secs(5)),
            max_failures: None,
            resource_patterns: ResourcePatterns::default(),
            resource_retry_delay: Duration::from_secs(10),
            status_timeout: Duration::from_secs(1),
            poll_fallback: Duration::from_secs(2),
            startup_idle_iterations: 60,
            idle_iterations: 20,
            delete_successful: false,
            delete_failed: false,
            stop_on_shutdown: false,
        }
    }

    fn payload(task: &TaskKey) -> WorkerPayload {
        WorkerPayload {
            task: *task,
            query_name: format!("test-{}-{}", task.date.format("%Y%m%d"), task.partition),
            script_path: PathBuf::from("worker.py"),
            launcher: "python3".into(),
            heap_size_gb: 1.0,
            mode: ExecutionMode::Batch,
            env: BTreeMap::new(),
            jvm_args: Vec::new(),
            replay: None,
        }
    }

    fn orchestrator(client: &Arc<InMemorySessionClient>, settings: OrchestratorSettings) -> Orchestrator {
        Orchestrator::new(client.clone(), settings, payload)
    }

    #[tokio::test(start_paused = true)]
    async fn six_tasks_all_succeed_within_cap() {
        let client = Arc::new(InMemorySessionClient::new());
        let tasks = generate_tasks(date(1), date(3), false, 2);
        let mut orch = orchestrator(&client, settings(2));

        let report = orch.run(tasks.clone(), &CancellationToken::new()).await.unwrap();

        assert_eq!(report.counts.total, 6);
        assert_eq!(report.counts.created, 6);
        assert_eq!(report.counts.completed, 6);
        assert_eq!(report.counts.failed(), 0);
        assert_eq!(report.exit_status(), ExitStatus::Success);
        assert_eq!(client.create_attempts(), tasks);
        assert!(client.peak_live() <= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_sessions_fill_but_never_exceed_cap() {
        let client = Arc::new(InMemorySessionClient::with_default_run(RunScript::completes_after(2)));
        let tasks: Vec<_> = (0..10).map(key).collect();
        let mut orch = orchestrator(&client, settings(3));

        let report = orch.run(tasks, &CancellationToken::new()).await.unwrap();

        assert_eq!(report.counts.completed, 10);
        assert_eq!(client.peak_live(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn creation_gives_up_after_budget() {
        let client = Arc::new(InMemorySessionClient::new());
        client.fail_creation(key(0), 4, SessionError::Connection("refused".into()));
        let mut orch = orchestrator(&client, settings(2));

        let report = orch.run(vec![key(0), key(1)], &CancellationToken::new()).await.unwrap();

        let attempts = client.create_attempts().iter().filter(|k| **k == key(0)).count();
        assert_eq!(attempts, 4);
        assert_eq!(report.counts.creation_failures, 1);
        assert_eq!(report.counts.creation_retries, 3);
        assert_eq!(report.counts.completed, 1);
        assert_eq!(report.failed[0].task, key(0));
        assert_eq!(report.exit_status(), ExitStatus::CreationFailures);
    }

    #[tokio::test(start_paused = true)]
    async fn creation_recovers_within_budget() {
        let client = Arc::new(InMemorySessionClient::new());
        client.fail_creation(key(0), 3, SessionError::Timeout("slow".into()));
        let mut orch = orchestrator(&client, settings(1));

        let report = orch.run(vec![key(0)], &CancellationToken::new()).await.unwrap();

        assert_eq!(client.create_calls(), 4);
        assert_eq!(report.counts.completed, 1);
        assert_eq!(report.exit_status(), ExitStatus::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn resource_starved_session_is_requeued_not_failed() {
        let client = Arc::new(InMemorySessionClient::new());
        client.push_run(key(0), RunScript::fails_after(0, "Insufficient memory on dispatcher"));
        let mut orch = orchestrator(&client, settings(1));

        let report = orch.run(vec![key(0)], &CancellationToken::new()).await.unwrap();

        assert_eq!(report.counts.completed, 1);
        assert_eq!(report.counts.failed(), 0);
        assert_eq!(report.counts.resource_requeues, 1);
        assert_eq!(orch.board().resource_requeues_of(&key(0)), 1);
        assert_eq!(report.counts.creation_retries, 0);
        assert_eq!(client.create_calls(), 2);
        assert_eq!(client.deletes(), vec![SessionSerial::new(1)]);
        assert_eq!(report.exit_status(), ExitStatus::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_carve_out_treats_resource_detail_as_failure() {
        let client = Arc::new(InMemorySessionClient::new());
        client.push_run(key(0), RunScript::fails_after(0, "no dispatcher available"));
        let mut cfg = settings(1);
        cfg.resource_patterns = ResourcePatterns::disabled();
        let mut orch = orchestrator(&client, cfg);

        let report = orch.run(vec![key(0)], &CancellationToken::new()).await.unwrap();

        assert_eq!(report.counts.execution_failures, 1);
        assert_eq!(report.counts.resource_requeues, 0);
        assert_eq!(report.failed[0].detail, "no dispatcher available");
        assert!(client.deletes().is_empty(), "failed sessions are kept");
        assert_eq!(report.exit_status(), ExitStatus::ExecutionFailures);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_limit_aborts_the_run() {
        let client = Arc::new(InMemorySessionClient::new());
        for p in 0..3 {
            client.push_run(key(p), RunScript::fails_after(0, "ValueError"));
        }
        let mut cfg = settings(3);
        cfg.max_failures = Some(2);
        let mut orch = orchestrator(&client, cfg);

        let report = orch.run((0..3).map(key).collect(), &CancellationToken::new()).await.unwrap();

        assert!(report.aborted);
        assert_eq!(report.counts.execution_failures, 2);
        assert_eq!(report.counts.active, 1);
        assert_eq!(orch.board().active_sessions()[0].0, key(2));
        assert_eq!(report.exit_status(), ExitStatus::ExecutionFailures);
        assert!(client.stops().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn abort_stops_remaining_sessions_when_configured() {
        let client = Arc::new(InMemorySessionClient::with_default_run(RunScript::runs_forever()));
        client.push_run(key(0), RunScript::fails_after(0, "boom"));
        let mut cfg = settings(2);
        cfg.max_failures = Some(1);
        cfg.stop_on_shutdown = true;
        let mut orch = orchestrator(&client, cfg);

        let report = orch.run((0..3).map(key).collect(), &CancellationToken::new()).await.unwrap();

        assert!(report.aborted);
        assert_eq!(report.counts.stopped, 1);
        assert_eq!(report.counts.pending, 1);
        assert_eq!(client.stops(), vec![SessionSerial::new(2)]);
        assert_eq!(report.exit_status(), ExitStatus::BothFailures);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_start_creates_nothing_and_reports_unstarted() {
        let client = Arc::new(InMemorySessionClient::new());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut orch = orchestrator(&client, settings(2));

        let report = orch.run((0..4).map(key).collect(), &cancel).await.unwrap();

        assert!(report.interrupted);
        assert_eq!(client.create_calls(), 0);
        assert_eq!(report.counts.pending, 4);
        assert_eq!(report.exit_status(), ExitStatus::CreationFailures);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cleanup_runs_once() {
        let client = Arc::new(InMemorySessionClient::with_default_run(RunScript::runs_forever()));
        let mut cfg = settings(2);
        cfg.stop_on_shutdown = true;
        let mut orch = orchestrator(&client, cfg);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            trigger.cancel();
        });

        let report = orch.run(vec![key(0), key(1)], &cancel).await.unwrap();
        orch.shutdown_cleanup().await;

        assert!(report.interrupted);
        assert_eq!(report.counts.stopped, 2);
        assert_eq!(client.stops().len(), 2);
        assert_eq!(client.deletes().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_leaves_sessions_running_by_default() {
        let client = Arc::new(InMemorySessionClient::with_default_run(RunScript::runs_forever()));
        let mut orch = orchestrator(&client, settings(1));

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            trigger.cancel();
        });

        let report = orch.run(vec![key(0), key(1)], &cancel).await.unwrap();

        assert!(report.interrupted);
        assert_eq!(report.counts.active, 1);
        assert_eq!(report.counts.pending, 1);
        assert!(client.stops().is_empty());
        assert!(client.deletes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn post_run_cleanup_deletes_selected_populations() {
        let client = Arc::new(InMemorySessionClient::new());
        client.push_run(key(1), RunScript::fails_after(0, "boom"));
        let mut cfg = settings(2);
        cfg.delete_successful = true;
        let mut orch = orchestrator(&client, cfg.clone());

        orch.run(vec![key(0), key(1)], &CancellationToken::new()).await.unwrap();
        assert_eq!(client.deletes(), vec![SessionSerial::new(1)]);

        let client = Arc::new(InMemorySessionClient::new());
        client.push_run(key(1), RunScript::fails_after(0, "boom"));
        cfg.delete_successful = false;
        cfg.delete_failed = true;
        let mut orch = orchestrator(&client, cfg);

        orch.run(vec![key(0), key(1)], &CancellationToken::new()).await.unwrap();
        assert_eq!(client.deletes(), vec![SessionSerial::new(2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn status_and_wait_errors_are_tolerated() {
        let client = Arc::new(InMemorySessionClient::with_default_run(RunScript::completes_after(1)));
        client.fail_status_polls(2);
        client.fail_waits(1);
        let mut orch = orchestrator(&client, settings(1));

        let report = orch.run(vec![key(0), key(1)], &CancellationToken::new()).await.unwrap();

        assert_eq!(report.counts.completed, 2);
        assert_eq!(report.exit_status(), ExitStatus::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn sentinel_serial_is_an_invariant_error() {
        let client = Arc::new(InMemorySessionClient::new());
        client.set_next_serial(i64::MIN);
        let mut orch = orchestrator(&client, settings(1));

        let err = orch.run(vec![key(0)], &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::SentinelSerial(k) if k == key(0)));
    }
}
