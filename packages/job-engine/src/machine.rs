//! The [`Machine`] trait: pure, synchronous decision-making over events.
//!
//! A machine owns no IO. Given an event it may update internal state and
//! return zero or more commands; something downstream (the job runner, the
//! HTTP layer) is responsible for carrying those commands out and feeding
//! the resulting events back in.

use std::any::{Any, TypeId};
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::error;

use crate::core::{AnyCommand, Command, Event};

/// A state machine that interprets events and decides on commands.
///
/// Unlike the single-command-per-event shape this is generalized to
/// `Vec<Command>` because dependency resolution is naturally fan-out: one
/// `JobSucceeded` event can unblock several dependent jobs at once.
pub trait Machine: Send + Sync + 'static {
    type Event: Event;
    type Command: Command;

    /// Decide what, if anything, should happen in response to `event`.
    ///
    /// Called synchronously and serially; no IO, no async.
    fn decide(&mut self, event: &Self::Event) -> Vec<Self::Command>;
}

pub(crate) trait AnyMachine: Send + Sync {
    fn decide_any(&mut self, event: &dyn Any) -> Vec<Box<dyn AnyCommand>>;
}

impl<M: Machine> AnyMachine for M {
    fn decide_any(&mut self, event: &dyn Any) -> Vec<Box<dyn AnyCommand>> {
        let Some(event) = event.downcast_ref::<M::Event>() else {
            return Vec::new();
        };
        self.decide(event)
            .into_iter()
            .map(|cmd| Box::new(cmd) as Box<dyn AnyCommand>)
            .collect()
    }
}

/// Type-erased wrapper letting a runner hold machines with different
/// event/command types in one collection, routing by `TypeId`.
pub struct MachineRunner {
    inner: Box<dyn AnyMachine>,
    event_type: TypeId,
    name: &'static str,
}

impl MachineRunner {
    pub fn new<M: Machine>(machine: M) -> Self {
        Self {
            event_type: TypeId::of::<M::Event>(),
            inner: Box::new(machine),
            name: std::any::type_name::<M>(),
        }
    }

    /// Feed an event through the wrapped machine, catching panics so one
    /// misbehaving machine can't take the whole coordinator down.
    pub fn decide(&mut self, event: &dyn Any) -> Result<Vec<Box<dyn AnyCommand>>, String> {
        match catch_unwind(AssertUnwindSafe(|| self.inner.decide_any(event))) {
            Ok(commands) => Ok(commands),
            Err(panic_info) => {
                let panic_msg = panic_info
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic_info.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(machine = self.name, panic = %panic_msg, "machine panicked in decide()");
                Err(format!("machine '{}' panicked: {}", self.name, panic_msg))
            }
        }
    }

    pub fn handles_event(&self, event: &dyn Any) -> bool {
        (*event).type_id() == self.event_type
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}
