//! Event-driven coordination primitives for the ingestion engine.
//!
//! `job-engine` separates **facts** from **intent**: an [`Event`] describes
//! something that happened (a job succeeded, a batch committed), a
//! [`Command`] describes something that should happen next (submit a
//! dependent job, schedule a retry). A [`Machine`] turns the former into the
//! latter, synchronously and without IO; `ingestion-jobs` wires concrete
//! machines (retry scheduling, dependency resolution) to the [`EventBus`]
//! and to a [`job::JobStore`] backed by Postgres.
//!
//! ```ignore
//! use job_engine::{Event, Command, Machine, EventBus};
//!
//! #[derive(Debug, Clone)]
//! enum JobEvent { Succeeded { job_id: Uuid }, Failed { job_id: Uuid } }
//!
//! #[derive(Debug, Clone)]
//! enum ChainCommand { SubmitJob { job_id: Uuid } }
//!
//! struct DependencyMachine { /* waiting edges */ }
//!
//! impl Machine for DependencyMachine {
//!     type Event = JobEvent;
//!     type Command = ChainCommand;
//!     fn decide(&mut self, event: &JobEvent) -> Vec<ChainCommand> {
//!         // unblock dependents whose ON_SUCCESS/ON_FAILURE condition is met
//!         vec![]
//!     }
//! }
//!
//! let bus = EventBus::new();
//! let mut rx = bus.subscribe();
//! bus.emit(JobEvent::Succeeded { job_id: uuid::Uuid::new_v4() });
//! ```
//!
//! job-engine is not a job queue and does not execute anything itself; it is
//! the decision layer sitting between "a fact arrived" and "here is the
//! intent that follows from it".

mod bus;
mod core;
mod error;
mod machine;

pub mod job;

pub use crate::core::{AnyCommand, Command, CorrelationId, Event, EventEnvelope, ExecutionMode, JobSpec};
pub use crate::error::{BatchOutcome, Categorizable, EngineError, SafeErrorCategory};
pub use bus::EventBus;
pub use job::{ClaimedJob, CommandRegistry, DeserializationError, FailureKind, JobStore};
pub use machine::{Machine, MachineRunner};

pub use async_trait::async_trait;
