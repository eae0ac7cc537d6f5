//! Durable job claiming interfaces.
//!
//! This module owns interfaces only, not policy: retry backoff, polling
//! cadence and concurrency limits belong to `ingestion-jobs`' `JobRunner`,
//! which implements [`JobStore`] against Postgres using `FOR UPDATE SKIP
//! LOCKED` the way `warehouse`'s storage layer claims work.

use anyhow::Result;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use uuid::Uuid;

use crate::core::{AnyCommand, Command};

/// Claims and updates jobs in persistent storage.
#[async_trait::async_trait]
pub trait JobStore: Send + Sync {
    /// Claim up to `limit` ready jobs for `worker_id`.
    ///
    /// "Ready" is entirely up to the store: `status = pending`, or
    /// `status = failed AND retry_count < max_retries AND next_retry_at <=
    /// now()`, ordered however the store likes (the Python original orders
    /// retries by `created_at desc`).
    async fn claim_ready(&self, worker_id: &str, limit: i64) -> Result<Vec<ClaimedJob>>;

    async fn mark_succeeded(&self, job_id: Uuid, rows_inserted: i64) -> Result<()>;

    /// Record a failure. For `Retryable` failures the store computes the
    /// next backoff and leaves the job eligible for reclaim; for
    /// `NonRetryable` it marks the job dead permanently regardless of
    /// remaining retry budget.
    async fn mark_failed(&self, job_id: Uuid, error: &str, kind: FailureKind) -> Result<()>;

    async fn heartbeat(&self, job_id: Uuid) -> Result<()>;
}

/// Whether a failure should consume a retry attempt or dead-letter outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Transient: network timeout, 5xx, 429, connection reset.
    Retryable,
    /// Permanent: auth failure, malformed config, schema mismatch.
    NonRetryable,
}

/// A job claimed by a worker, ready to be deserialized and run.
#[derive(Debug, Clone)]
pub struct ClaimedJob {
    pub id: Uuid,
    /// Matches `IngestionJob.source` / the command registry's routing key.
    pub job_type: String,
    pub payload: serde_json::Value,
    pub version: i32,
    /// 1-based; first attempt is 1, first retry is 2.
    pub attempt: i32,
}

/// Explicit deserialization failure modes, each mapping to a fixed
/// [`FailureKind`] so the worker never has to guess.
#[derive(Debug, thiserror::Error)]
pub enum DeserializationError {
    #[error("unknown job type: {0}")]
    UnknownJobType(String),
    #[error("unsupported payload version {version} for job type {job_type}")]
    UnsupportedVersion { job_type: String, version: i32 },
    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] anyhow::Error),
}

impl DeserializationError {
    /// All deserialization errors are permanent: the payload won't become
    /// valid by retrying.
    pub fn failure_kind(&self) -> FailureKind {
        FailureKind::NonRetryable
    }
}

type DeserializeFn = Box<dyn Fn(&serde_json::Value) -> Result<Box<dyn AnyCommand>> + Send + Sync>;

struct CommandDeserializer {
    supported_versions: Vec<i32>,
    deserialize: DeserializeFn,
}

/// Maps job-type strings back to the commands that started them, so a
/// worker loop can stay generic over job types.
#[derive(Default)]
pub struct CommandRegistry {
    deserializers: HashMap<&'static str, CommandDeserializer>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command's job type and the payload versions it accepts.
    ///
    /// # Panics
    ///
    /// Panics on a duplicate registration for the same job type; this is a
    /// startup-time wiring error, not a runtime condition.
    pub fn register<C>(&mut self, job_type: &'static str, supported_versions: Vec<i32>)
    where
        C: Command + DeserializeOwned + 'static,
    {
        if self.deserializers.contains_key(job_type) {
            panic!("deserializer already registered for job type: {job_type}");
        }
        let deserialize: DeserializeFn = Box::new(|payload: &serde_json::Value| {
            let command: C = serde_json::from_value(payload.clone())
                .map_err(|e| anyhow::anyhow!("JSON deserialization failed: {e}"))?;
            Ok(Box::new(command) as Box<dyn AnyCommand>)
        });
        self.deserializers.insert(
            job_type,
            CommandDeserializer {
                supported_versions,
                deserialize,
            },
        );
    }

    pub fn deserialize(&self, job: &ClaimedJob) -> Result<Box<dyn AnyCommand>, DeserializationError> {
        let entry = self
            .deserializers
            .get(job.job_type.as_str())
            .ok_or_else(|| DeserializationError::UnknownJobType(job.job_type.clone()))?;
        if !entry.supported_versions.contains(&job.version) {
            return Err(DeserializationError::UnsupportedVersion {
                job_type: job.job_type.clone(),
                version: job.version,
            });
        }
        (entry.deserialize)(&job.payload).map_err(DeserializationError::InvalidPayload)
    }

    pub fn has(&self, job_type: &str) -> bool {
        self.deserializers.contains_key(job_type)
    }

    pub fn len(&self) -> usize {
        self.deserializers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deserializers.is_empty()
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("registered_types", &self.deserializers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct RunEiaIngest {
        dataset: String,
    }

    #[test]
    fn registers_and_deserializes_by_job_type() {
        let mut registry = CommandRegistry::new();
        registry.register::<RunEiaIngest>("ingest:eia", vec![1]);

        let job = ClaimedJob {
            id: Uuid::new_v4(),
            job_type: "ingest:eia".to_string(),
            payload: serde_json::json!({ "dataset": "petroleum" }),
            version: 1,
            attempt: 1,
        };
        let cmd = registry.deserialize(&job).unwrap();
        let cmd = cmd.as_any().downcast_ref::<RunEiaIngest>().unwrap();
        assert_eq!(cmd.dataset, "petroleum");
    }

    #[test]
    fn unknown_job_type_is_non_retryable() {
        let registry = CommandRegistry::new();
        let job = ClaimedJob {
            id: Uuid::new_v4(),
            job_type: "ingest:unregistered".to_string(),
            payload: serde_json::json!({}),
            version: 1,
            attempt: 1,
        };
        let err = registry.deserialize(&job).unwrap_err();
        assert!(matches!(err, DeserializationError::UnknownJobType(_)));
        assert_eq!(err.failure_kind(), FailureKind::NonRetryable);
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let mut registry = CommandRegistry::new();
        registry.register::<RunEiaIngest>("ingest:eia", vec![1, 2]);
        let job = ClaimedJob {
            id: Uuid::new_v4(),
            job_type: "ingest:eia".to_string(),
            payload: serde_json::json!({ "dataset": "petroleum" }),
            version: 99,
            attempt: 1,
        };
        assert!(matches!(
            registry.deserialize(&job),
            Err(DeserializationError::UnsupportedVersion { version: 99, .. })
        ));
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn duplicate_registration_panics() {
        let mut registry = CommandRegistry::new();
        registry.register::<RunEiaIngest>("ingest:eia", vec![1]);
        registry.register::<RunEiaIngest>("ingest:eia", vec![2]);
    }
}
