//! InMemorySessionClient - 開発用・テスト用の session backend
//!
//! # 学習ポイント
//! - 決定的に動く fake（ネットワークなし）
//! - status_map() を呼ぶたびに session が 1 tick 進む
//! - std::sync::Mutex は .await をまたいで保持しない
//!
//! タスクごとに「作成失敗の回数」と「実行結果（RunScript）」を台本として渡せます。

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{
    SessionError, SessionInfo, SessionSerial, SessionStatus, StatusSnapshot, TaskKey,
    WorkerPayload,
};
use crate::ports::SessionClient;

/// How one session of a task plays out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunScript {
    /// Status polls the session stays non-terminal for.
    pub polls: u32,
    pub status: SessionStatus,
    pub detail: Option<String>,
}

impl RunScript {
    pub fn completes_after(polls: u32) -> Self {
        Self {
            polls,
            status: SessionStatus::Completed,
            detail: None,
        }
    }

    pub fn fails_after(polls: u32, detail: impl Into<String>) -> Self {
        Self {
            polls,
            status: SessionStatus::Failed,
            detail: Some(detail.into()),
        }
    }

    /// Never reaches a terminal status on its own.
    pub fn runs_forever() -> Self {
        Self {
            polls: u32::MAX,
            status: SessionStatus::Completed,
            detail: None,
        }
    }
}

#[derive(Debug)]
struct SimSession {
    remaining_polls: u32,
    script: RunScript,
    info: SessionInfo,
}

#[derive(Debug, Default)]
struct CallLog {
    create_attempts: Vec<TaskKey>,
    stops: Vec<SessionSerial>,
    deletes: Vec<SessionSerial>,
}

#[derive(Debug)]
struct Inner {
    next_serial: i64,
    sessions: HashMap<SessionSerial, SimSession>,
    create_errors: HashMap<TaskKey, VecDeque<SessionError>>,
    runs: HashMap<TaskKey, VecDeque<RunScript>>,
    default_run: RunScript,
    status_errors: u32,
    wait_errors: u32,
    version: u64,
    peak_live: usize,
    calls: CallLog,
}

impl Inner {
    fn live(&self) -> usize {
        self.sessions
            .values()
            .filter(|s| !s.info.is_terminal())
            .count()
    }

    fn tick(&mut self) {
        let mut changed = false;
        for session in self.sessions.values_mut() {
            if session.info.is_terminal() {
                continue;
            }
            if session.remaining_polls == 0 {
                session.info = SessionInfo {
                    status: session.script.status,
                    detail: session.script.detail.clone(),
                };
                changed = true;
            } else {
                session.remaining_polls -= 1;
                if session.info.status == SessionStatus::Initializing {
                    session.info = SessionInfo::new(SessionStatus::Running);
                    changed = true;
                }
            }
        }
        if changed {
            self.version += 1;
        }
    }
}

/// Scripted, deterministic session backend.
///
/// Sessions start `Initializing`; every `status_map()` call advances each
/// non-terminal session by one poll. With the default script a session
/// completes on the first poll after creation.
pub struct InMemorySessionClient {
    inner: Mutex<Inner>,
}

impl InMemorySessionClient {
    pub fn new() -> Self {
        Self::with_default_run(RunScript::completes_after(0))
    }

    pub fn with_default_run(default_run: RunScript) -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_serial: 1,
                sessions: HashMap::new(),
                create_errors: HashMap::new(),
                runs: HashMap::new(),
                default_run,
                status_errors: 0,
                wait_errors: 0,
                version: 0,
                peak_live: 0,
                calls: CallLog::default(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A panic while holding the lock only happens in a failing test.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The next `times` creation attempts for `task` fail with `error`.
    pub fn fail_creation(&self, task: TaskKey, times: u32, error: SessionError) {
        let mut inner = self.lock();
        let queue = inner.create_errors.entry(task).or_default();
        for _ in 0..times {
            queue.push_back(error.clone());
        }
    }

    /// Script the next session created for `task`. Scripts are consumed in order.
    pub fn push_run(&self, task: TaskKey, run: RunScript) {
        self.lock().runs.entry(task).or_default().push_back(run);
    }

    /// The next `times` calls to `status_map` fail with a connection error.
    pub fn fail_status_polls(&self, times: u32) {
        self.lock().status_errors += times;
    }

    /// The next `times` calls to `wait_for_change` fail with a connection error.
    pub fn fail_waits(&self, times: u32) {
        self.lock().wait_errors += times;
    }

    /// Serials handed out from now on start at `serial`.
    pub fn set_next_serial(&self, serial: i64) {
        self.lock().next_serial = serial;
    }

    /// Every creation attempt, failed ones included, in call order.
    pub fn create_attempts(&self) -> Vec<TaskKey> {
        self.lock().calls.create_attempts.clone()
    }

    pub fn create_calls(&self) -> usize {
        self.lock().calls.create_attempts.len()
    }

    pub fn stops(&self) -> Vec<SessionSerial> {
        self.lock().calls.stops.clone()
    }

    pub fn deletes(&self) -> Vec<SessionSerial> {
        self.lock().calls.deletes.clone()
    }

    /// Most non-terminal sessions that ever existed at once.
    pub fn peak_live(&self) -> usize {
        self.lock().peak_live
    }

    /// Sessions not yet deleted.
    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }

    pub fn status_of(&self, serial: SessionSerial) -> Option<SessionStatus> {
        self.lock().sessions.get(&serial).map(|s| s.info.status)
    }
}

impl Default for InMemorySessionClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionClient for InMemorySessionClient {
    async fn create_session(
        &self,
        task: &TaskKey,
        _payload: &WorkerPayload,
    ) -> Result<SessionSerial, SessionError> {
        let mut inner = self.lock();
        inner.calls.create_attempts.push(*task);

        if let Some(err) = inner
            .create_errors
            .get_mut(task)
            .and_then(|errors| errors.pop_front())
        {
            return Err(err);
        }

        let script = inner
            .runs
            .get_mut(task)
            .and_then(|runs| runs.pop_front())
            .unwrap_or_else(|| inner.default_run.clone());

        let serial = SessionSerial::new(inner.next_serial);
        inner.next_serial = inner.next_serial.wrapping_add(1);
        inner.sessions.insert(
            serial,
            SimSession {
                remaining_polls: script.polls,
                script,
                info: SessionInfo::new(SessionStatus::Initializing),
            },
        );
        inner.version += 1;
        let live = inner.live();
        inner.peak_live = inner.peak_live.max(live);
        Ok(serial)
    }

    async fn status_map(&self) -> Result<StatusSnapshot, SessionError> {
        let mut inner = self.lock();
        if inner.status_errors > 0 {
            inner.status_errors -= 1;
            return Err(SessionError::Connection("status map unavailable".into()));
        }
        inner.tick();
        Ok(StatusSnapshot {
            sessions: inner
                .sessions
                .iter()
                .map(|(serial, s)| (*serial, s.info.clone()))
                .collect(),
            version: inner.version,
        })
    }

    async fn wait_for_change(
        &self,
        version: u64,
        timeout: Duration,
    ) -> Result<Option<u64>, SessionError> {
        {
            let mut inner = self.lock();
            if inner.wait_errors > 0 {
                inner.wait_errors -= 1;
                return Err(SessionError::Connection("subscription dropped".into()));
            }
            if inner.version > version {
                return Ok(Some(inner.version));
            }
        }
        tokio::time::sleep(timeout).await;
        Ok(None)
    }

    async fn stop_session(&self, serial: SessionSerial) -> Result<(), SessionError> {
        let mut inner = self.lock();
        inner.calls.stops.push(serial);
        let Some(session) = inner.sessions.get_mut(&serial) else {
            return Err(SessionError::NotFound(serial.to_string()));
        };
        if !session.info.is_terminal() {
            session.info = SessionInfo::with_detail(SessionStatus::Stopped, "stopped by request");
            inner.version += 1;
        }
        Ok(())
    }

    async fn delete_session(&self, serial: SessionSerial) -> Result<(), SessionError> {
        let mut inner = self.lock();
        inner.calls.deletes.push(serial);
        if inner.sessions.remove(&serial).is_none() {
            return Err(SessionError::NotFound(serial.to_string()));
        }
        inner.version += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    use crate::domain::ExecutionMode;

    fn key(p: u32) -> TaskKey {
        TaskKey::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), p)
    }

    fn payload(task: TaskKey) -> WorkerPayload {
        WorkerPayload {
            task,
            query_name: format!("test-{}", task.partition),
            script_path: PathBuf::from("worker.py"),
            launcher: "python3".into(),
            heap_size_gb: 1.0,
            mode: ExecutionMode::Batch,
            env: BTreeMap::new(),
            jvm_args: Vec::new(),
            replay: None,
        }
    }

    #[tokio::test]
    async fn default_session_completes_on_first_poll() {
        let client = InMemorySessionClient::new();
        let serial = client.create_session(&key(0), &payload(key(0))).await.unwrap();
        assert_eq!(client.status_of(serial), Some(SessionStatus::Initializing));

        let snapshot = client.status_map().await.unwrap();
        assert_eq!(snapshot.get(serial).unwrap().status, SessionStatus::Completed);
    }

    #[tokio::test]
    async fn scripted_creation_failures_then_success() {
        let client = InMemorySessionClient::new();
        client.fail_creation(key(0), 2, SessionError::Timeout("slow".into()));

        for _ in 0..2 {
            let err = client.create_session(&key(0), &payload(key(0))).await.unwrap_err();
            assert_eq!(err, SessionError::Timeout("slow".into()));
        }
        client.create_session(&key(0), &payload(key(0))).await.unwrap();
        assert_eq!(client.create_calls(), 3);
    }

    #[tokio::test]
    async fn run_script_controls_terminal_status() {
        let client = InMemorySessionClient::new();
        client.push_run(key(0), RunScript::fails_after(1, "boom"));
        let serial = client.create_session(&key(0), &payload(key(0))).await.unwrap();

        let first = client.status_map().await.unwrap();
        assert_eq!(first.get(serial).unwrap().status, SessionStatus::Running);

        let second = client.status_map().await.unwrap();
        let info = second.get(serial).unwrap();
        assert_eq!(info.status, SessionStatus::Failed);
        assert_eq!(info.detail.as_deref(), Some("boom"));
        assert!(second.version > first.version);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_times_out_without_change() {
        let client = InMemorySessionClient::new();
        let snapshot = client.status_map().await.unwrap();
        let changed = client
            .wait_for_change(snapshot.version, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(changed, None);
    }

    #[tokio::test]
    async fn stop_and_delete_are_recorded() {
        let client = InMemorySessionClient::with_default_run(RunScript::runs_forever());
        let serial = client.create_session(&key(0), &payload(key(0))).await.unwrap();

        client.stop_session(serial).await.unwrap();
        assert_eq!(client.status_of(serial), Some(SessionStatus::Stopped));
        client.delete_session(serial).await.unwrap();
        assert_eq!(client.session_count(), 0);

        let err = client.delete_session(serial).await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound(_)));
        assert_eq!(client.stops(), vec![serial]);
        assert_eq!(client.deletes(), vec![serial, serial]);
    }
}
