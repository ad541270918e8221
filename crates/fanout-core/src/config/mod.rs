//! Config - ジョブ定義の読み込みと検証
//!
//! # フロー
//! 1. YAML を `serde_yaml::Value` として読む
//! 2. 文字列中の `${VAR}` を環境変数で展開（未設定ならエラー）
//! 3. `RawJobConfig` に decode（未知のフィールドはエラー）
//! 4. 範囲・相互チェックを通して `JobConfig` を作る
//! 5. ファイルから読んだ場合は script_path を設定ファイルの場所から解決し、存在を確認
//!
//! Fail-fast: どこかで失敗したら session は一つも作らない。

mod env;
mod error;
mod job;
mod schema;
mod secret;
mod validate;

pub use env::{expand_env, expand_value};
pub use error::ConfigError;
pub use job::{
    Connection, Credentials, DateRange, ExecutionSettings, JobConfig, MIN_CYCLE_MILLIS,
    RESERVED_ENV, ReplaySettings, TimestampColumn,
};
pub use schema::{AuthMethod, RawJobConfig};
pub use secret::Secret;

use std::path::Path;

impl JobConfig {
    /// Read, expand and validate a job description file.
    ///
    /// A relative `execution.script_path` is taken relative to the file's
    /// directory, and the script must exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_yaml_str(&text)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        config.resolve_script(base_dir)?;
        Ok(config)
    }

    /// Parse a job description, expanding `${VAR}` from the process environment.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Self::from_yaml_with_env(text, |name| std::env::var(name).ok())
    }

    /// Parse a job description with an explicit environment lookup.
    pub fn from_yaml_with_env<F>(text: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut value: serde_yaml::Value = serde_yaml::from_str(text)?;
        expand_value(&mut value, &lookup)?;
        let raw: RawJobConfig = serde_yaml::from_value(value)?;
        validate::validate(raw)
    }
}
