use std::borrow::Cow;

use job_engine::{Categorizable, FailureKind, SafeErrorCategory};
use thiserror::Error;

/// Top-level Job Runner error. Always caught and folded into the job
/// record by `JobRunner::run`; never propagated past it.
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Adapter(#[from] ingestion_adapters::AdapterError),

    #[error(transparent)]
    Warehouse(#[from] warehouse::WarehouseError),

    #[error("job payload is not valid for its declared job type: {0}")]
    Deserialization(#[from] job_engine::DeserializationError),

    #[error("no rows were inserted and this adapter requires at least one")]
    EmptyResultRequired,
}

impl Categorizable for JobError {
    fn category(&self) -> SafeErrorCategory {
        match self {
            JobError::Adapter(e) => e.category(),
            JobError::Warehouse(e) => e.category(),
            JobError::Deserialization(e) => match e.failure_kind() {
                FailureKind::Retryable => SafeErrorCategory::Transient,
                FailureKind::NonRetryable => SafeErrorCategory::Config,
            },
            JobError::EmptyResultRequired => SafeErrorCategory::Upsert,
        }
    }

    fn safe_message(&self) -> Cow<'static, str> {
        match self {
            JobError::Adapter(e) => e.safe_message(),
            JobError::Warehouse(e) => e.safe_message(),
            JobError::Deserialization(_) => "job payload did not match its declared type".into(),
            JobError::EmptyResultRequired => "adapter returned zero rows but requires at least one".into(),
        }
    }
}

impl JobError {
    pub fn failure_kind(&self) -> FailureKind {
        if self.category().is_retryable() {
            FailureKind::Retryable
        } else {
            FailureKind::NonRetryable
        }
    }
}

pub type JobResult<T> = std::result::Result<T, JobError>;
