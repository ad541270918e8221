//! In-memory orchestration state.

use std::collections::{BTreeMap, HashMap};

use super::{FailedTask, PendingQueue, TaskState};
use crate::domain::{SessionSerial, SessionStatus, TaskKey};
use crate::observability::OrchestrationCounts;

/// All task bookkeeping for one run.
///
/// Design:
/// - `states` is the single source of truth for where a task lives.
/// - `pending` and `active` hold keys only and are kept in sync with `states`.
/// - Every transition goes through a method here; the control loop never
///   touches the collections directly.
///
/// Invariant: a task is in at most one of {pending, active}; once Completed or
/// Failed it never comes back.
#[derive(Debug, Default)]
pub struct TaskBoard {
    states: HashMap<TaskKey, TaskState>,
    pending: PendingQueue,

    /// Ordered so status classification visits sessions deterministically.
    active: BTreeMap<TaskKey, SessionSerial>,

    /// Cache of every serial handed out in this run.
    by_serial: HashMap<SessionSerial, TaskKey>,

    /// Creation retries used so far; absent means none.
    retries: HashMap<TaskKey, u32>,

    /// Resource requeues per task. Never reset.
    resource_requeues: HashMap<TaskKey, u32>,

    failed: Vec<FailedTask>,
    completed_serials: Vec<SessionSerial>,
    counts: OrchestrationCounts,
}

impl TaskBoard {
    pub fn new(tasks: impl IntoIterator<Item = TaskKey>) -> Self {
        let mut board = Self::default();
        for task in tasks {
            if board.states.contains_key(&task) {
                continue;
            }
            board.states.insert(task, TaskState::Pending);
            board.pending.push_back(task);
        }
        board.counts.total = board.states.len();
        board
    }

    fn transition(&mut self, task: TaskKey, next: TaskState) {
        let current = self.states.get(&task).copied();
        debug_assert!(
            current.is_some_and(|s| s.can_transition_to(next)),
            "invalid transition for {task}: {current:?} -> {next:?}"
        );
        self.states.insert(task, next);
    }

    pub fn state_of(&self, task: &TaskKey) -> Option<TaskState> {
        self.states.get(task).copied()
    }

    /// Take the next task to launch. It stays `Pending` until activated,
    /// re-queued, or failed.
    pub fn next_pending(&mut self) -> Option<TaskKey> {
        self.pending.pop_front()
    }

    pub fn retries_used(&self, task: &TaskKey) -> u32 {
        self.retries.get(task).copied().unwrap_or(0)
    }

    /// Session created: Pending -> Active.
    pub fn activate(&mut self, task: TaskKey, serial: SessionSerial) {
        self.transition(task, TaskState::Active);
        self.retries.remove(&task);
        self.active.insert(task, serial);
        self.by_serial.insert(serial, task);
        self.counts.created += 1;
    }

    /// Creation failed but budget remains: back to the front of pending.
    pub fn requeue_for_retry(&mut self, task: TaskKey) -> u32 {
        self.transition(task, TaskState::Pending);
        let used = self.retries.entry(task).or_insert(0);
        *used += 1;
        let used = *used;
        self.pending.push_front(task);
        self.counts.creation_retries += 1;
        used
    }

    /// Creation retries exhausted: Pending -> Failed.
    pub fn fail_creation(&mut self, task: TaskKey, detail: impl Into<String>) {
        self.transition(task, TaskState::Failed);
        self.retries.remove(&task);
        self.failed.push(FailedTask::creation(task, detail));
        self.counts.creation_failures += 1;
    }

    /// Session completed: Active -> Completed.
    pub fn complete(&mut self, task: TaskKey) -> Option<SessionSerial> {
        let serial = self.active.remove(&task)?;
        self.transition(task, TaskState::Completed);
        self.retries.remove(&task);
        self.completed_serials.push(serial);
        self.counts.completed += 1;
        Some(serial)
    }

    /// Session failed for lack of capacity: Active -> front of Pending.
    /// Does not touch the retry budget or failure counters.
    ///
    /// Returns the dropped serial and how many times this task has now been
    /// requeued this way.
    pub fn requeue_resource(&mut self, task: TaskKey) -> Option<(SessionSerial, u32)> {
        let serial = self.active.remove(&task)?;
        self.transition(task, TaskState::Pending);
        self.by_serial.remove(&serial);
        self.pending.push_front(task);
        self.counts.resource_requeues += 1;
        let times = self.resource_requeues.entry(task).or_insert(0);
        *times += 1;
        Some((serial, *times))
    }

    pub fn resource_requeues_of(&self, task: &TaskKey) -> u32 {
        self.resource_requeues.get(task).copied().unwrap_or(0)
    }

    /// Session failed: Active -> Failed. The session itself is left alone.
    pub fn fail_execution(
        &mut self,
        task: TaskKey,
        status: Option<SessionStatus>,
        detail: impl Into<String>,
    ) -> Option<SessionSerial> {
        let serial = self.active.remove(&task)?;
        self.transition(task, TaskState::Failed);
        self.failed
            .push(FailedTask::execution(task, serial, status, detail));
        self.counts.execution_failures += 1;
        Some(serial)
    }

    /// Remove every active session from tracking, for shutdown cleanup.
    pub fn drain_active(&mut self) -> Vec<(TaskKey, SessionSerial)> {
        let drained: Vec<_> = std::mem::take(&mut self.active).into_iter().collect();
        self.counts.stopped += drained.len();
        drained
    }

    pub fn active_sessions(&self) -> Vec<(TaskKey, SessionSerial)> {
        self.active.iter().map(|(k, s)| (*k, *s)).collect()
    }

    pub fn task_for(&self, serial: SessionSerial) -> Option<TaskKey> {
        self.by_serial.get(&serial).copied()
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Nothing left to launch or monitor.
    pub fn is_drained(&self) -> bool {
        self.pending.is_empty() && self.active.is_empty()
    }

    pub fn failures_total(&self) -> usize {
        self.counts.failed()
    }

    pub fn failed(&self) -> &[FailedTask] {
        &self.failed
    }

    pub fn completed_serials(&self) -> &[SessionSerial] {
        &self.completed_serials
    }

    /// Serials of sessions that failed during execution.
    pub fn failed_serials(&self) -> Vec<SessionSerial> {
        self.failed.iter().filter_map(|f| f.serial).collect()
    }

    pub fn counts(&self) -> OrchestrationCounts {
        OrchestrationCounts {
            pending: self.pending.len(),
            active: self.active.len(),
            ..self.counts.clone()
        }
    }

    pub fn progress(&self) -> u64 {
        self.counts.progress()
    }
}
