//! Raw job description as written in YAML.
//!
//! Every struct denies unknown fields so a typo fails at load time instead of
//! silently falling back to a default. Values here are unchecked; see
//! `validate` for bounds and cross-field rules.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::domain::{ExecutionMode, ScriptLanguage};

use super::secret::Secret;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawJobConfig {
    pub name: String,
    pub connection: RawConnection,
    pub execution: RawExecution,
    #[serde(default)]
    pub replay: Option<RawReplay>,
    pub dates: RawDates,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    #[default]
    None,
    Password,
    PrivateKey,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConnection {
    pub url: String,
    #[serde(default)]
    pub auth_method: AuthMethod,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<Secret>,
    #[serde(default)]
    pub private_key_path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawExecution {
    pub script_path: String,
    #[serde(default)]
    pub mode: ExecutionMode,
    #[serde(default = "default_launcher")]
    pub launcher: String,
    pub num_partitions: u32,
    pub max_concurrent_sessions: u32,
    pub heap_size_gb: f64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Absent means the default limit; an explicit `null` disables it.
    #[serde(default = "default_max_failures")]
    pub max_failures: Option<u32>,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: f64,
    #[serde(default = "default_true")]
    pub resource_retry: bool,
    #[serde(default = "default_resource_retry_delay_secs")]
    pub resource_retry_delay_secs: f64,
    #[serde(default)]
    pub resource_patterns: Option<Vec<String>>,
    #[serde(default = "default_status_timeout_secs")]
    pub status_timeout_secs: f64,
    #[serde(default = "default_poll_fallback_secs")]
    pub poll_fallback_secs: f64,
    #[serde(default = "default_startup_idle_iterations")]
    pub startup_idle_iterations: u32,
    #[serde(default = "default_idle_iterations")]
    pub idle_iterations: u32,
    #[serde(default = "default_true")]
    pub delete_successful: bool,
    #[serde(default)]
    pub delete_failed: bool,
    #[serde(default)]
    pub stop_on_shutdown: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawReplay {
    pub replay_time: String,
    #[serde(default = "default_replay_speed")]
    pub replay_speed: f64,
    #[serde(default = "default_true")]
    pub sorted_replay: bool,
    #[serde(default)]
    pub buffer_rows: Option<u64>,
    #[serde(default)]
    pub replay_timestamp_columns: Vec<RawTimestampColumn>,
    #[serde(default = "default_init_timeout_minutes")]
    pub init_timeout_minutes: f64,
    #[serde(default)]
    pub script_language: ScriptLanguage,
    #[serde(default = "default_jvm_profile")]
    pub jvm_profile: String,
    #[serde(default = "default_server_name")]
    pub server_name: String,
}

/// Which column of a replayed table carries the replay clock.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawTimestampColumn {
    pub namespace: String,
    pub table: String,
    pub column: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawDates {
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub weekdays_only: bool,
}

fn default_launcher() -> String {
    "python3".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_max_failures() -> Option<u32> {
    Some(10)
}

fn default_retry_delay_secs() -> f64 {
    5.0
}

fn default_resource_retry_delay_secs() -> f64 {
    10.0
}

fn default_status_timeout_secs() -> f64 {
    5.0
}

fn default_poll_fallback_secs() -> f64 {
    2.0
}

fn default_startup_idle_iterations() -> u32 {
    60
}

fn default_idle_iterations() -> u32 {
    20
}

fn default_replay_speed() -> f64 {
    1.0
}

fn default_init_timeout_minutes() -> f64 {
    1.0
}

fn default_jvm_profile() -> String {
    "Default".to_string()
}

fn default_server_name() -> String {
    "AutoQuery".to_string()
}

fn default_true() -> bool {
    true
}
