//! What a run would do, without touching a backend.

use serde::Serialize;

use crate::config::JobConfig;
use crate::domain::{ExecutionMode, TaskKey};

/// One planned session.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedTask {
    pub task: TaskKey,
    pub query_name: String,
}

/// Task list for a validated job, as used by `--dry-run`.
#[derive(Debug, Clone, Serialize)]
pub struct RunPlan {
    pub name: String,
    pub mode: ExecutionMode,
    pub dates: usize,
    pub partitions: u32,
    pub max_concurrent_sessions: usize,
    /// Extra JVM arguments every replay session would get.
    pub jvm_args: Vec<String>,
    pub tasks: Vec<PlannedTask>,
}

impl RunPlan {
    pub fn for_job(config: &JobConfig) -> Self {
        let tasks = config
            .tasks()
            .into_iter()
            .map(|task| PlannedTask {
                query_name: config.query_name(&task),
                task,
            })
            .collect();
        Self {
            name: config.name.clone(),
            mode: config.execution.mode,
            dates: config.dates.dates().len(),
            partitions: config.execution.num_partitions,
            max_concurrent_sessions: config.execution.max_concurrent_sessions,
            jvm_args: config.jvm_args(),
            tasks,
        }
    }

    pub fn task_keys(&self) -> Vec<TaskKey> {
        self.tasks.iter().map(|t| t.task).collect()
    }

    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "{} ({}): {} dates x {} partitions = {} tasks, at most {} concurrent",
            self.name,
            self.mode,
            self.dates,
            self.partitions,
            self.tasks.len(),
            self.max_concurrent_sessions
        )];
        if !self.jvm_args.is_empty() {
            lines.push(format!("  jvm args: {}", self.jvm_args.join(" ")));
        }
        lines.extend(
            self.tasks
                .iter()
                .map(|t| format!("  {} -> {}", t.task, t.query_name)),
        );
        lines
    }
}
