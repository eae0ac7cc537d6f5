pub mod dependency;
pub mod error;
pub mod retry;
pub mod runner;

pub use dependency::{DependencyError, DependencyMachine, EdgeCondition, JobCompleted, JobStatus, SubmitJob};
pub use error::{JobError, JobResult};
pub use retry::{calculate_retry_delay, BackoffConfig, RetryMode};
pub use runner::{JobOutcome, JobRunner};
