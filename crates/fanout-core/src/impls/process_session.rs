//! ProcessSessionClient - ローカルプロセスを session として扱う backend
//!
//! 1 session = `launcher script_path` の子プロセス 1 つ。
//! 環境変数は WorkerPayload.env をそのまま渡します。
//!
//! # 実装詳細
//! - 子プロセスごとに監視 task を spawn し、終了したら状態を更新
//! - 状態の version は watch channel で配信（wait_for_change の long-poll）
//! - stop は CancellationToken で監視 task に kill を依頼
//! - orchestrator が終了しても子プロセスは kill しない（リモート session と同じ扱い）

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::{
    SessionError, SessionInfo, SessionSerial, SessionStatus, StatusSnapshot, TaskKey,
    WorkerPayload,
};
use crate::ports::SessionClient;

/// Characters of stderr kept as the failure detail.
const STDERR_TAIL_CHARS: usize = 512;

/// Bytes of stderr held in memory while the worker runs; older output is
/// dropped as new output arrives.
const STDERR_TAIL_BYTES: usize = 4096;

/// How long to wait for stderr to close after the process exited.
const STDERR_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug)]
struct ProcessSession {
    query_name: String,
    info: SessionInfo,
    stop: CancellationToken,
}

type Sessions = Arc<Mutex<HashMap<SessionSerial, ProcessSession>>>;

/// Runs each session as a local child process.
///
/// `heap_size_gb` from the payload is not enforced for local processes.
pub struct ProcessSessionClient {
    sessions: Sessions,
    version: Arc<watch::Sender<u64>>,
    next_serial: AtomicI64,
}

impl ProcessSessionClient {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            version: Arc::new(version),
            next_serial: AtomicI64::new(1),
        }
    }

    fn bump(version: &watch::Sender<u64>) {
        version.send_modify(|v| *v += 1);
    }
}

impl Default for ProcessSessionClient {
    fn default() -> Self {
        Self::new()
    }
}

fn lock(sessions: &Sessions) -> std::sync::MutexGuard<'_, HashMap<SessionSerial, ProcessSession>> {
    sessions.lock().unwrap_or_else(|e| e.into_inner())
}

fn tail(text: &str) -> String {
    let trimmed = text.trim();
    let count = trimmed.chars().count();
    if count <= STDERR_TAIL_CHARS {
        return trimmed.to_string();
    }
    trimmed.chars().skip(count - STDERR_TAIL_CHARS).collect()
}

/// Read `reader` to the end, keeping only the last `limit` bytes.
///
/// A read error ends the read early; whatever was collected is still
/// returned alongside it.
async fn read_tail<R: AsyncRead + Unpin>(mut reader: R, limit: usize) -> (Vec<u8>, Option<std::io::Error>) {
    let mut kept = Vec::with_capacity(limit.min(1024));
    let mut chunk = [0u8; 1024];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => return (kept, None),
            Ok(n) => {
                kept.extend_from_slice(&chunk[..n]);
                if kept.len() > limit {
                    let excess = kept.len() - limit;
                    kept.drain(..excess);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return (kept, Some(e)),
        }
    }
}

fn finish(sessions: &Sessions, version: &watch::Sender<u64>, serial: SessionSerial, info: SessionInfo) {
    {
        let mut guard = lock(sessions);
        // Deleted while running: nothing left to update.
        let Some(session) = guard.get_mut(&serial) else {
            return;
        };
        debug!(%serial, query = %session.query_name, status = %info.status, "local session finished");
        session.info = info;
    }
    ProcessSessionClient::bump(version);
}

#[async_trait]
impl SessionClient for ProcessSessionClient {
    async fn create_session(
        &self,
        task: &TaskKey,
        payload: &WorkerPayload,
    ) -> Result<SessionSerial, SessionError> {
        let mut child = Command::new(&payload.launcher)
            .arg(&payload.script_path)
            .envs(&payload.env)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                    SessionError::Configuration(format!(
                        "cannot launch `{}` for {task}: {e}",
                        payload.launcher
                    ))
                }
                _ => SessionError::Backend(format!("spawn failed for {task}: {e}")),
            })?;

        let serial = SessionSerial::new(self.next_serial.fetch_add(1, Ordering::Relaxed));
        let stop = CancellationToken::new();
        lock(&self.sessions).insert(
            serial,
            ProcessSession {
                query_name: payload.query_name.clone(),
                info: SessionInfo::new(SessionStatus::Running),
                stop: stop.clone(),
            },
        );
        Self::bump(&self.version);

        let sessions = Arc::clone(&self.sessions);
        let version = Arc::clone(&self.version);
        let stderr = child.stderr.take();

        tokio::spawn(async move {
            let stderr_task = tokio::spawn(async move {
                let Some(pipe) = stderr else {
                    return String::new();
                };
                let (bytes, err) = read_tail(pipe, STDERR_TAIL_BYTES).await;
                if let Some(e) = err {
                    warn!(%serial, error = %e, "reading worker stderr failed; detail may be partial");
                }
                // Workers are not required to write UTF-8.
                String::from_utf8_lossy(&bytes).into_owned()
            });

            let info = tokio::select! {
                status = child.wait() => match status {
                    Ok(status) if status.success() => SessionInfo::new(SessionStatus::Completed),
                    Ok(status) => {
                        let stderr = tokio::time::timeout(STDERR_DRAIN_TIMEOUT, stderr_task)
                            .await
                            .ok()
                            .and_then(|joined| joined.ok())
                            .unwrap_or_default();
                        let detail = match tail(&stderr) {
                            t if t.is_empty() => format!("worker exited with {status}"),
                            t => format!("worker exited with {status}: {t}"),
                        };
                        SessionInfo::with_detail(SessionStatus::Failed, detail)
                    }
                    Err(e) => SessionInfo::with_detail(
                        SessionStatus::Failed,
                        format!("waiting for worker failed: {e}"),
                    ),
                },
                _ = stop.cancelled() => {
                    if let Err(e) = child.kill().await {
                        warn!(%serial, error = %e, "failed to kill local session");
                    }
                    SessionInfo::with_detail(SessionStatus::Stopped, "stopped by request")
                }
            };

            finish(&sessions, &version, serial, info);
        });

        Ok(serial)
    }

    async fn status_map(&self) -> Result<StatusSnapshot, SessionError> {
        let version = *self.version.borrow();
        let sessions = lock(&self.sessions)
            .iter()
            .map(|(serial, s)| (*serial, s.info.clone()))
            .collect();
        Ok(StatusSnapshot { sessions, version })
    }

    async fn wait_for_change(
        &self,
        version: u64,
        timeout: Duration,
    ) -> Result<Option<u64>, SessionError> {
        let mut rx = self.version.subscribe();
        match tokio::time::timeout(timeout, rx.wait_for(|v| *v > version)).await {
            Ok(Ok(current)) => Ok(Some(*current)),
            Ok(Err(_)) => Err(SessionError::Connection("status channel closed".into())),
            Err(_) => Ok(None),
        }
    }

    async fn stop_session(&self, serial: SessionSerial) -> Result<(), SessionError> {
        let guard = lock(&self.sessions);
        let Some(session) = guard.get(&serial) else {
            return Err(SessionError::NotFound(serial.to_string()));
        };
        if !session.info.is_terminal() {
            session.stop.cancel();
        }
        Ok(())
    }

    async fn delete_session(&self, serial: SessionSerial) -> Result<(), SessionError> {
        let removed = lock(&self.sessions).remove(&serial);
        let Some(session) = removed else {
            return Err(SessionError::NotFound(serial.to_string()));
        };
        if !session.info.is_terminal() {
            session.stop.cancel();
        }
        Self::bump(&self.version);
        Ok(())
    }
}
