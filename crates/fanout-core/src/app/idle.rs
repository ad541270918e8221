//! Stall heuristic: warn when nothing has moved for too many iterations.

/// Which threshold fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdlePhase {
    /// No task has left pending yet.
    Startup,
    SteadyState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleWarning {
    pub phase: IdlePhase,
    pub iterations: u32,
    pub progress: u64,
}

/// Tracks the progress counter across loop iterations. Observability only;
/// never changes control flow.
///
/// Only a new high-water mark counts as movement: the counter dips on a
/// resource requeue and climbs back on the relaunch, which is not progress.
#[derive(Debug, Clone)]
pub struct IdleDetector {
    startup_threshold: u32,
    steady_threshold: u32,
    best_progress: u64,
    idle_iterations: u32,
}

impl IdleDetector {
    pub fn new(startup_threshold: u32, steady_threshold: u32) -> Self {
        Self {
            startup_threshold: startup_threshold.max(1),
            steady_threshold: steady_threshold.max(1),
            best_progress: 0,
            idle_iterations: 0,
        }
    }

    /// Record one iteration. `started` is true once any task left pending.
    pub fn observe(&mut self, progress: u64, started: bool) -> Option<IdleWarning> {
        if progress > self.best_progress {
            self.best_progress = progress;
            self.idle_iterations = 0;
            return None;
        }

        self.idle_iterations += 1;
        let (phase, threshold) = if started {
            (IdlePhase::SteadyState, self.steady_threshold)
        } else {
            (IdlePhase::Startup, self.startup_threshold)
        };
        if self.idle_iterations < threshold {
            return None;
        }

        let warning = IdleWarning {
            phase,
            iterations: self.idle_iterations,
            progress,
        };
        self.idle_iterations = 0;
        Some(warning)
    }
}
