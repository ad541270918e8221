//! Validated, typed job configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};

use crate::domain::{
    ExecutionMode, ReplayLaunch, ResourcePatterns, ScriptLanguage, TaskKey, WorkerPayload,
    dates_in_range, generate_tasks,
};

use super::ConfigError;
use super::secret::Secret;

/// Environment variables the orchestrator sets for every worker.
pub const RESERVED_ENV: &[&str] = &[
    "SIMULATION_NAME",
    "SIMULATION_DATE",
    "QUERY_NAME",
    "PARTITION_ID",
    "NUM_PARTITIONS",
    "REPLAY_TIME",
    "REPLAY_SPEED",
    "SORTED_REPLAY",
];

#[derive(Debug, Clone)]
pub struct JobConfig {
    pub name: String,
    pub connection: Connection,
    pub execution: ExecutionSettings,
    pub replay: Option<ReplaySettings>,
    pub dates: DateRange,
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct Connection {
    pub url: String,
    pub credentials: Credentials,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    None,
    Password { username: String, password: Secret },
    PrivateKey { username: String, key_path: PathBuf },
}

impl Credentials {
    pub fn username(&self) -> Option<&str> {
        match self {
            Credentials::None => None,
            Credentials::Password { username, .. } | Credentials::PrivateKey { username, .. } => {
                Some(username)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionSettings {
    pub script_path: PathBuf,
    pub mode: ExecutionMode,
    pub launcher: String,
    pub num_partitions: u32,
    pub max_concurrent_sessions: usize,
    pub heap_size_gb: f64,
    pub max_retries: u32,
    pub max_failures: Option<usize>,
    pub retry_delay: Duration,
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

#[derive(Debug, Clone, PartialEq)]
pub struct ReplaySettings {
    pub replay_time: NaiveTime,
    pub replay_speed: f64,
    pub sorted_replay: bool,
    pub buffer_rows: Option<u64>,
    pub timestamp_columns: Vec<TimestampColumn>,
    pub init_timeout: Duration,
    pub script_language: ScriptLanguage,
    pub jvm_profile: String,
    pub server_name: String,
}

/// Shortest engine update cycle a replay speed may ask for.
pub const MIN_CYCLE_MILLIS: u64 = 10;

impl ReplaySettings {
    /// Engine update cycle that keeps the simulated update rate at 1s when
    /// replaying faster than real time. `None` at 1x.
    pub fn target_cycle_millis(&self) -> Option<u64> {
        (self.replay_speed > 1.0).then(|| (1000.0 / self.replay_speed) as u64)
    }

    /// Extra JVM arguments for the replay engine, in a fixed order.
    pub fn jvm_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(rows) = self.buffer_rows {
            args.push(format!("-DReplayDatabase.BufferSize={rows}"));
        }
        if let Some(millis) = self.target_cycle_millis() {
            args.push(format!("-DPeriodicUpdateGraph.targetCycleDurationMillis={millis}"));
        }
        for c in &self.timestamp_columns {
            args.push(format!(
                "-DReplayDatabase.TimestampColumn.{}.{}={}",
                c.namespace, c.table, c.column
            ));
        }
        args
    }

    fn launch(&self) -> ReplayLaunch {
        ReplayLaunch {
            server_name: self.server_name.clone(),
            jvm_profile: self.jvm_profile.clone(),
            script_language: self.script_language,
            init_timeout: self.init_timeout,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampColumn {
    pub namespace: String,
    pub table: String,
    pub column: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub weekdays_only: bool,
}

impl DateRange {
    pub fn dates(&self) -> Vec<NaiveDate> {
        dates_in_range(self.start, self.end, self.weekdays_only)
    }
}

impl JobConfig {
    /// All tasks for this job, date-major then partition-minor.
    pub fn tasks(&self) -> Vec<TaskKey> {
        generate_tasks(
            self.dates.start,
            self.dates.end,
            self.dates.weekdays_only,
            self.execution.num_partitions,
        )
    }

    /// Make `execution.script_path` absolute against `base_dir` (the config
    /// file's directory) and require it to be an existing regular file.
    pub fn resolve_script(&mut self, base_dir: &Path) -> Result<(), ConfigError> {
        let path = &self.execution.script_path;
        let resolved = if path.is_absolute() {
            path.clone()
        } else {
            base_dir.join(path)
        };
        let reason = match std::fs::metadata(&resolved) {
            Ok(m) if m.is_file() => None,
            Ok(_) => Some("is not a regular file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Some("does not exist"),
            Err(_) => Some("cannot be read"),
        };
        if let Some(reason) = reason {
            return Err(ConfigError::Script {
                path: resolved,
                reason,
            });
        }
        self.execution.script_path = resolved;
        Ok(())
    }

    /// Extra JVM arguments for every session of this job; empty in batch mode.
    pub fn jvm_args(&self) -> Vec<String> {
        self.replay.as_ref().map(ReplaySettings::jvm_args).unwrap_or_default()
    }

    pub fn query_name(&self, task: &TaskKey) -> String {
        format!(
            "{}-{}-{}",
            self.name,
            task.date.format("%Y%m%d"),
            task.partition
        )
    }

    /// Build the launch description for one task.
    pub fn payload_for(&self, task: &TaskKey) -> WorkerPayload {
        let query_name = self.query_name(task);

        let mut env = self.env.clone();
        env.insert("SIMULATION_NAME".into(), self.name.clone());
        env.insert("SIMULATION_DATE".into(), task.date.format("%Y-%m-%d").to_string());
        env.insert("QUERY_NAME".into(), query_name.clone());
        env.insert("PARTITION_ID".into(), task.partition.to_string());
        env.insert(
            "NUM_PARTITIONS".into(),
            self.execution.num_partitions.to_string(),
        );
        if let Some(replay) = &self.replay {
            env.insert(
                "REPLAY_TIME".into(),
                replay.replay_time.format("%H:%M:%S").to_string(),
            );
            env.insert("REPLAY_SPEED".into(), replay.replay_speed.to_string());
            env.insert("SORTED_REPLAY".into(), replay.sorted_replay.to_string());
        }

        WorkerPayload {
            task: *task,
            query_name,
            script_path: self.execution.script_path.clone(),
            launcher: self.execution.launcher.clone(),
            heap_size_gb: self.execution.heap_size_gb,
            mode: self.execution.mode,
            env,
            jvm_args: self.jvm_args(),
            replay: self.replay.as_ref().map(ReplaySettings::launch),
        }
    }
}
