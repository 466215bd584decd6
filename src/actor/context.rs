use crate::actor::{Actor, ActorId};
use crate::error::ASSERTION_FAILED;
use crate::machine::Machine;
use crate::{Event, Result, Runtime, RuntimeExt};
use std::fmt;

/// What a handler can do while it runs: send, create, consult monitors, assert, and halt.
pub struct Context<'a> {
    id: &'a ActorId,
    runtime: &'a dyn Runtime,
    halting: bool,
}

impl<'a> Context<'a> {
    pub(crate) fn new(id: &'a ActorId, runtime: &'a dyn Runtime) -> Self {
        Context {
            id,
            runtime,
            halting: false,
        }
    }

    /// The id of the actor running this handler.
    pub fn id(&self) -> &ActorId {
        self.id
    }

    pub fn runtime(&self) -> &'a dyn Runtime {
        self.runtime
    }

    /// Delivers `event` to the tail of `target`'s mailbox. Sending the empty event fails.
    pub fn send(&self, target: &ActorId, event: Event) -> Result<()> {
        self.runtime.send_event(Some(self.id), target, event)
    }

    pub fn create_actor<A: Actor>(&self, name: &str, actor: A, init: Option<Event>) -> Result<ActorId> {
        self.runtime.create_actor(name, actor, init)
    }

    pub fn create_machine<M: Machine>(&self, name: &str, machine: M, init: Option<Event>) -> Result<ActorId> {
        self.runtime.create_machine(name, machine, init)
    }

    pub fn invoke_monitor(&self, name: &str, event: Event) -> Result<()> {
        self.runtime.invoke_monitor(name, event)
    }

    /// Fails with [`Error::AssertionFailure`](crate::Error::AssertionFailure) unless `predicate`
    /// holds.
    pub fn assert(&self, predicate: bool, message: &str) -> Result<()> {
        self.runtime.assert(predicate, message)
    }

    /// Like [`Context::assert`], with a generic message.
    pub fn assert_holds(&self, predicate: bool) -> Result<()> {
        self.runtime.assert(predicate, ASSERTION_FAILED)
    }

    /// A nondeterministic choice. Under the bug finder the strategy makes it.
    pub fn random_boolean(&self) -> Result<bool> {
        self.runtime.random_boolean()
    }

    pub fn log(&self, args: fmt::Arguments<'_>) {
        self.runtime.log(args)
    }

    /// Halts the actor once the current handler returns. Events already queued are discarded and
    /// later sends are dropped.
    pub fn halt(&mut self) {
        self.halting = true;
    }

    pub(crate) fn is_halting(&self) -> bool {
        self.halting
    }
}
