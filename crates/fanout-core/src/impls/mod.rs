//! Impls - SessionClient の実装
//!
//! # 含まれる実装
//! - **InMemorySessionClient**: 台本どおりに動く fake（テスト・`sim://`）
//! - **ProcessSessionClient**: ローカル子プロセスを session として扱う（`local://`）
//!
//! クエリエンジン本体のコントローラ実装は別クレートに置く想定です。
//!
//! どちらの backend も認証を行いません。`connection` の credentials は検証だけされ、
//! ここでは使われません（警告ログを出す）。

pub mod inmem_session;
pub mod process_session;

pub use self::inmem_session::{InMemorySessionClient, RunScript};
pub use self::process_session::ProcessSessionClient;

use std::sync::Arc;

use tracing::warn;

use crate::config::{ConfigError, Connection, Credentials};
use crate::ports::SessionClient;

/// Session backends selectable from `connection.url`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Local,
    Simulated,
}

impl Backend {
    pub fn from_url(url: &str) -> Result<Self, ConfigError> {
        let scheme = url.split_once("://").map(|(scheme, _)| scheme);
        match scheme {
            Some("local") => Ok(Backend::Local),
            Some("sim") => Ok(Backend::Simulated),
            _ => Err(ConfigError::UnsupportedBackend(url.to_string())),
        }
    }
}

/// Build the session client for a validated connection.
///
/// Neither backend authenticates. Configured credentials are accepted but
/// ignored, and a warning says so; the secret itself is never logged.
pub fn connect(connection: &Connection) -> Result<Arc<dyn SessionClient>, ConfigError> {
    let backend = Backend::from_url(&connection.url)?;
    if connection.credentials != Credentials::None {
        warn!(
            ?backend,
            username = connection.credentials.username().unwrap_or_default(),
            "backend does not authenticate; configured credentials are ignored"
        );
    }
    let client: Arc<dyn SessionClient> = match backend {
        Backend::Local => Arc::new(ProcessSessionClient::new()),
        Backend::Simulated => Arc::new(InMemorySessionClient::new()),
    };
    Ok(client)
}
