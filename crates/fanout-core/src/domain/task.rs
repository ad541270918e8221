use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// One unit of work: a single date processed by a single partition.
///
/// Ordering is date-major then partition-minor, which is also the order
/// `generate_tasks` produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskKey {
    pub date: NaiveDate,
    pub partition: u32,
}

impl TaskKey {
    pub fn new(date: NaiveDate, partition: u32) -> Self {
        Self { date, partition }
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/p{}", self.date.format("%Y-%m-%d"), self.partition)
    }
}

/// Dates in `[start, end]`, optionally skipping Saturdays and Sundays.
///
/// Returns an empty list when `end < start`; the config validator rejects that
/// case before it gets here.
pub fn dates_in_range(start: NaiveDate, end: NaiveDate, weekdays_only: bool) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut current = start;
    while current <= end {
        if !weekdays_only || !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            dates.push(current);
        }
        match current.checked_add_days(Days::new(1)) {
            Some(next) => current = next,
            None => break,
        }
    }
    dates
}

/// Expand a date range × partition count into the flat task list.
pub fn generate_tasks(
    start: NaiveDate,
    end: NaiveDate,
    weekdays_only: bool,
    num_partitions: u32,
) -> Vec<TaskKey> {
    let dates = dates_in_range(start, end, weekdays_only);
    let mut tasks = Vec::with_capacity(dates.len() * num_partitions as usize);
    for date in dates {
        for partition in 0..num_partitions {
            tasks.push(TaskKey::new(date, partition));
        }
    }
    tasks
}

/// How the worker consumes its date: replaying intraday data or as a batch job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    #[default]
    Replay,
    Batch,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Replay => f.write_str("replay"),
            ExecutionMode::Batch => f.write_str("batch"),
        }
    }
}

/// Language the worker script is written in, as the replay engine names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScriptLanguage {
    #[default]
    Python,
    Groovy,
}

impl fmt::Display for ScriptLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptLanguage::Python => f.write_str("Python"),
            ScriptLanguage::Groovy => f.write_str("Groovy"),
        }
    }
}

/// Replay-engine launch knobs carried alongside the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayLaunch {
    pub server_name: String,
    pub jvm_profile: String,
    pub script_language: ScriptLanguage,
    /// How long the engine may take to initialize the session.
    pub init_timeout: Duration,
}

/// Everything a backend needs to start the session for one task.
///
/// `env` is a `BTreeMap` so the launch environment is deterministic.
/// `jvm_args` and `replay` are meant for a replay-engine backend; the local
/// process backend does not use them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerPayload {
    pub task: TaskKey,
    pub query_name: String,
    pub script_path: PathBuf,
    pub launcher: String,
    pub heap_size_gb: f64,
    pub mode: ExecutionMode,
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub jvm_args: Vec<String>,
    #[serde(default)]
    pub replay: Option<ReplayLaunch>,
}
