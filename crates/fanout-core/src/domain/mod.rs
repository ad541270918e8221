//! Domain model (task keys, session serials, statuses, errors).

pub mod errors;
pub mod ids;
pub mod outcome;
pub mod session;
pub mod task;

pub use errors::{ErrorKind, SessionError};
pub use ids::SessionSerial;
pub use outcome::{DEFAULT_RESOURCE_PATTERNS, Progress, ResourcePatterns};
pub use session::{SessionInfo, SessionStatus, StatusSnapshot};
pub use task::{
    ExecutionMode, ReplayLaunch, ScriptLanguage, TaskKey, WorkerPayload, dates_in_range,
    generate_tasks,
};
