//! SessionClient port - リモート worker session の操作
//!
//! Control loop が外部システムに触れるのはこの trait だけです。
//!
//! # 設計原則
//! - status map + version token + wait_for_change は long-poll の抽象化
//! - `wait_for_change` の `Ok(None)` は「変化なし（timeout）」で、エラーではない
//! - stop / delete は best-effort（失敗しても呼び出し側はログだけ）

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{SessionError, SessionSerial, StatusSnapshot, TaskKey, WorkerPayload};

/// Create, observe, stop and delete remote worker sessions.
#[async_trait]
pub trait SessionClient: Send + Sync {
    /// Start a session for `task`. Returns the backend-assigned serial.
    async fn create_session(
        &self,
        task: &TaskKey,
        payload: &WorkerPayload,
    ) -> Result<SessionSerial, SessionError>;

    /// Status of every session this client knows about, plus a version token.
    async fn status_map(&self) -> Result<StatusSnapshot, SessionError>;

    /// Block until the status map moves past `version` or `timeout` elapses.
    ///
    /// Returns the new version, or `None` if nothing changed in time.
    async fn wait_for_change(
        &self,
        version: u64,
        timeout: Duration,
    ) -> Result<Option<u64>, SessionError>;

    async fn stop_session(&self, serial: SessionSerial) -> Result<(), SessionError>;

    async fn delete_session(&self, serial: SessionSerial) -> Result<(), SessionError>;
}
