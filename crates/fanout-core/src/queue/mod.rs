//! Queue module: task state, pending queue, retry policy and the run's board.

mod board;
mod pending;
mod record;
mod retry;
mod state;

pub use board::TaskBoard;
pub use pending::PendingQueue;
pub use record::{FailedTask, FailureKind};
pub use retry::{RetryDecision, RetryPolicy};
pub use state::TaskState;
