//! Errors - エラー型と分類
//!
//! Session backend のエラーは「リトライすれば直るか」で分類します。

use thiserror::Error;

/// ErrorKind は session backend エラーの運用分類
///
/// - Transient: 一時的なエラー（リトライ推奨）
/// - Permanent: 恒久的なエラー（リトライ無意味）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Permanent,
}

/// Errors surfaced by a `SessionClient`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("session configuration rejected: {0}")]
    Configuration(String),

    #[error("session not found: {0}")]
    NotFound(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Connection(_) | SessionError::Timeout(_) | SessionError::Backend(_) => {
                ErrorKind::Transient
            }
            SessionError::Configuration(_) | SessionError::NotFound(_) => ErrorKind::Permanent,
        }
    }
}
