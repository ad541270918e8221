//! Pending queue: FIFO for fresh tasks, front insertion for retries.

use std::collections::VecDeque;

use crate::domain::TaskKey;

/// Double-ended pending queue.
///
/// Fresh tasks go to the back in generation order. Creation retries and
/// resource-unavailable requeues go to the front so transient faults recover
/// before never-attempted work starts.
#[derive(Debug, Default)]
pub struct PendingQueue {
    items: VecDeque<TaskKey>,
}

impl PendingQueue {
    pub fn push_back(&mut self, task: TaskKey) {
        self.items.push_back(task);
    }

    pub fn push_front(&mut self, task: TaskKey) {
        self.items.push_front(task);
    }

    pub fn pop_front(&mut self) -> Option<TaskKey> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn key(p: u32) -> TaskKey {
        TaskKey::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), p)
    }

    #[test]
    fn retries_jump_ahead_of_fresh_tasks() {
        let mut queue = PendingQueue::default();
        for p in 0..3 {
            queue.push_back(key(p));
        }
        let first = queue.pop_front().unwrap();
        assert_eq!(first, key(0));

        queue.push_front(first);
        assert_eq!(queue.pop_front(), Some(key(0)));
        assert_eq!(queue.pop_front(), Some(key(1)));

        queue.push_back(key(9));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop_front(), Some(key(2)));
        assert_eq!(queue.pop_front(), Some(key(9)));
        assert!(queue.is_empty());
    }
}
