//! Core vocabulary for the job-engine coordination layer.
//!
//! Events are facts ("row batch committed"), commands are intent ("retry this
//! job"). A [`Machine`](crate::Machine) turns the former into the latter
//! without ever touching IO; something else (the ingestion worker, the
//! dependency resolver) carries the command out and reports back with a new
//! event.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

/// Marker trait for facts flowing through the [`EventBus`](crate::EventBus).
///
/// Blanket-implemented for any `Debug + Clone + Send + Sync + 'static` type,
/// matching the teacher's "domain enums stay plain enums" convention.
pub trait Event: fmt::Debug + Send + Sync + 'static {}

impl<T: fmt::Debug + Send + Sync + 'static> Event for T {}

/// Marker trait for intent emitted by a [`Machine`](crate::Machine).
pub trait Command: fmt::Debug + Send + Sync + 'static {}

impl<T: fmt::Debug + Send + Sync + 'static> Command for T {}

/// Type-erased command, downcastable back to its concrete type.
pub trait AnyCommand: fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

impl<C: Command> AnyCommand for C {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Job specification carried by a command that needs durable execution.
///
/// Mirrors the retry/idempotency fields on `IngestionJob`: a job type string
/// for routing, an idempotency key so re-submitting the same work is a
/// no-op, and a retry ceiling the retry scheduler enforces.
#[derive(Debug, Clone)]
pub struct JobSpec {
    /// Stable routing key, e.g. `"ingest:eia_petroleum"`. Must not change
    /// once jobs referencing it exist in storage.
    pub job_type: &'static str,
    /// Deduplication key. At most one pending/running job per key.
    pub idempotency_key: Option<String>,
    /// Retry ceiling; exceeding this dead-letters the job.
    pub max_retries: i32,
    /// Higher runs sooner.
    pub priority: i32,
    /// Payload schema version.
    pub version: i32,
    /// Parent job, if this spec describes a retry-as-child-job.
    pub parent_job_id: Option<Uuid>,
}

impl JobSpec {
    pub fn new(job_type: &'static str) -> Self {
        Self {
            job_type,
            idempotency_key: None,
            max_retries: 3,
            priority: 0,
            version: 1,
            parent_job_id: None,
        }
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    pub fn with_max_retries(mut self, n: i32) -> Self {
        self.max_retries = n;
        self
    }

    pub fn with_priority(mut self, p: i32) -> Self {
        self.priority = p;
        self
    }

    pub fn with_version(mut self, v: i32) -> Self {
        self.version = v;
        self
    }

    pub fn with_parent_job_id(mut self, id: Uuid) -> Self {
        self.parent_job_id = Some(id);
        self
    }
}

/// How a command should be carried out once a machine emits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Run inline, in the same task that produced the triggering event.
    Inline,
    /// Hand off to the durable job store (see [`crate::job`]).
    Background,
    /// Background, but not eligible to run before a given time
    /// (`next_retry_at` on a retry command).
    Scheduled,
}

/// Correlation id for tracing a chain of events/commands back to the job
/// that started it. `NONE` marks events with no originating job (e.g.
/// schedule ticks).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    pub const NONE: Self = Self(Uuid::nil());

    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn is_none(&self) -> bool {
        self.0.is_nil()
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for CorrelationId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "NONE")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Envelope wrapping an event with correlation metadata for transport on the
/// [`EventBus`](crate::EventBus). Domain event enums stay plain; correlation
/// is bolted on at the transport boundary.
#[derive(Clone)]
pub struct EventEnvelope {
    pub cid: CorrelationId,
    pub type_id: TypeId,
    pub payload: Arc<dyn Any + Send + Sync>,
}

impl EventEnvelope {
    pub fn new<E: Event>(cid: CorrelationId, event: E) -> Self {
        Self {
            cid,
            type_id: TypeId::of::<E>(),
            payload: Arc::new(event),
        }
    }

    pub fn new_random<E: Event>(event: E) -> Self {
        Self::new(CorrelationId::new(), event)
    }

    pub fn downcast_ref<E: Event>(&self) -> Option<&E> {
        self.payload.downcast_ref::<E>()
    }
}

impl fmt::Debug for EventEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEnvelope")
            .field("cid", &self.cid)
            .field("type_id", &self.type_id)
            .finish()
    }
}
