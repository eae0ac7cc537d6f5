//! Structured errors and batch outcomes.
//!
//! # The Error Boundary Rule
//!
//! No `anyhow::Error` crosses the [`EventBus`](crate::EventBus) boundary.
//! `anyhow` is fine as internal transport inside a fetch or a write, but the
//! event a machine observes must be a typed, matchable fact.

use std::borrow::Cow;
use std::fmt;

use thiserror::Error;

/// Safe-to-expose category for a failure, independent of its internal
/// detail. Mirrors the `ConfigError / AuthError / TransientNetworkError /
/// RateLimited / ParseError / UpsertError / Cancelled` split used by the
/// fetch and write layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafeErrorCategory {
    Config,
    Auth,
    Transient,
    RateLimited,
    Parse,
    Upsert,
    Cancelled,
    Internal,
}

impl fmt::Display for SafeErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SafeErrorCategory::Config => "config_error",
            SafeErrorCategory::Auth => "auth_error",
            SafeErrorCategory::Transient => "transient_network_error",
            SafeErrorCategory::RateLimited => "rate_limited",
            SafeErrorCategory::Parse => "parse_error",
            SafeErrorCategory::Upsert => "upsert_error",
            SafeErrorCategory::Cancelled => "cancelled",
            SafeErrorCategory::Internal => "internal_error",
        };
        write!(f, "{s}")
    }
}

impl SafeErrorCategory {
    /// Whether a failure in this category should consume a retry attempt.
    /// `Config` and `Auth` won't fix themselves on retry; `Parse` usually
    /// won't either since the payload shape is what it is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SafeErrorCategory::Transient | SafeErrorCategory::RateLimited)
    }
}

/// Implemented by domain error types so they can report a safe category and
/// message without leaking internals (credentials, stack frames, row data)
/// into logs a dashboard might render to an untrusted viewer.
pub trait Categorizable: std::error::Error {
    fn category(&self) -> SafeErrorCategory;
    fn safe_message(&self) -> Cow<'static, str>;
}

/// Structured error type for job-engine's own operations (distinct from the
/// domain errors `ingestion-adapters` / `ingestion-jobs` define).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no machine registered for event type {0}")]
    NoMachineForEvent(&'static str),

    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    #[error("failed to enqueue job: {message}")]
    EnqueueFailed { message: String },
}

impl Categorizable for EngineError {
    fn category(&self) -> SafeErrorCategory {
        match self {
            EngineError::Timeout { .. } => SafeErrorCategory::Transient,
            _ => SafeErrorCategory::Internal,
        }
    }

    fn safe_message(&self) -> Cow<'static, str> {
        match self {
            EngineError::Timeout { .. } => "operation timed out".into(),
            _ => "an internal coordination error occurred".into(),
        }
    }
}

/// What actually happened during a batch write.
///
/// Batches are not pretended to be atomic: `C4` commits each batch
/// independently so a 50k-row upsert that fails on batch 30 of 50 has
/// already durably written batches 1-29. Re-running the job is safe because
/// writes are idempotent upserts, not safe because nothing happened.
#[derive(Debug)]
pub enum BatchOutcome {
    Complete { batches: usize, rows: u64 },
    Partial {
        batches_succeeded: usize,
        rows_written: u64,
        failed_at_batch: usize,
        error: anyhow::Error,
    },
}

impl BatchOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, BatchOutcome::Complete { .. })
    }

    pub fn rows_written(&self) -> u64 {
        match self {
            BatchOutcome::Complete { rows, .. } => *rows,
            BatchOutcome::Partial { rows_written, .. } => *rows_written,
        }
    }
}

impl fmt::Display for BatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchOutcome::Complete { batches, rows } => {
                write!(f, "batch complete: {batches} batches, {rows} rows")
            }
            BatchOutcome::Partial {
                batches_succeeded,
                rows_written,
                failed_at_batch,
                error,
            } => write!(
                f,
                "batch partial: {batches_succeeded} batches ({rows_written} rows) before failing at batch {failed_at_batch}: {error}"
            ),
        }
    }
}
