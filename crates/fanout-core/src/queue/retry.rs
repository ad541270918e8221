//! Retry policy for session-creation failures.

use std::time::Duration;

/// What to do after a creation attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Re-queue at the front after `delay`. `retry` is 1-indexed.
    Retry { retry: u32, delay: Duration },

    /// Budget spent; record the task as permanently failed.
    GiveUp { attempts: u32 },
}

/// Strict retry budget with a fixed delay between attempts.
///
/// `max_retries` counts retries, not attempts: `max_retries = 3` allows
/// 4 creation attempts in total.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Decide based on how many retries were already used for this task.
    pub fn decide(&self, retries_used: u32) -> RetryDecision {
        if retries_used < self.max_retries {
            RetryDecision::Retry {
                retry: retries_used + 1,
                delay: self.delay,
            }
        } else {
            RetryDecision::GiveUp {
                attempts: retries_used + 1,
            }
        }
    }
}
