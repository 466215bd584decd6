//! The [`Runtime`] trait and its two implementations: [`ActorRuntime`] runs actors with real
//! concurrency, while [`BugFindingRuntime`] serializes them under a
//! [`BugFindingScheduler`](crate::testing::BugFindingScheduler) so that interleavings can be
//! explored systematically.

mod actor_runtime;
mod bug_finding;

pub use actor_runtime::*;
pub use bug_finding::*;

use crate::actor::{Actor, ActorBlueprint, ActorId};
use crate::machine::Machine;
use crate::monitor::{Monitor, MonitorBlueprint};
use crate::{Configuration, Event, Result};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Creates actors, routes events, and reports assertion failures. Object safe, so handlers and
/// test entry points can work against `&dyn Runtime`; the generic conveniences live in
/// [`RuntimeExt`].
pub trait Runtime: Send + Sync {
    /// Distinguishes this runtime instance from every other one in the process.
    fn instance(&self) -> u64;

    fn configuration(&self) -> &Configuration;

    /// Creates an actor or machine and starts it. `init`, unless empty, is the first event it
    /// handles (for machines, the event passed to the start state's entry action).
    fn create(&self, name: &str, blueprint: ActorBlueprint, init: Option<Event>) -> Result<ActorId>;

    fn register_monitor_blueprint(&self, name: &str, blueprint: MonitorBlueprint) -> Result<()>;

    /// Enqueues `event` at `target`. `sender` only affects the log line.
    fn send_event(&self, sender: Option<&ActorId>, target: &ActorId, event: Event) -> Result<()>;

    fn invoke_monitor(&self, name: &str, event: Event) -> Result<()>;

    /// Returns [`Error::AssertionFailure`](crate::Error::AssertionFailure) with `message` unless
    /// `predicate` holds.
    fn assert(&self, predicate: bool, message: &str) -> Result<()>;

    fn random_boolean(&self) -> Result<bool>;

    /// Emits a diagnostic line, at `info` when the configuration is verbose and `trace` otherwise.
    fn log(&self, args: fmt::Arguments<'_>);

    /// Blocks until no handler is running and reports the first failure, if any.
    fn wait(&self) -> Result<()>;

    /// The active state of a machine, or `None` for plain actors, halted machines, and unknown ids.
    fn current_state(&self, id: &ActorId) -> Option<String>;

    /// The active state of the monitor registered as `name`. Always `None` on runtimes that do not
    /// run monitors.
    fn monitor_state(&self, name: &str) -> Option<String>;
}

/// Generic helpers available on every [`Runtime`], including `dyn Runtime`.
pub trait RuntimeExt: Runtime {
    fn create_actor<A: Actor>(&self, name: &str, actor: A, init: Option<Event>) -> Result<ActorId> {
        self.create(name, ActorBlueprint::actor(actor), init)
    }

    fn create_machine<M: Machine>(&self, name: &str, machine: M, init: Option<Event>) -> Result<ActorId> {
        self.create(name, ActorBlueprint::machine(machine), init)
    }

    fn register_monitor<M: Monitor>(&self, name: &str, monitor: M) -> Result<()> {
        self.register_monitor_blueprint(name, MonitorBlueprint::new(monitor))
    }

    /// Sends from outside any actor.
    fn send(&self, target: &ActorId, event: Event) -> Result<()> {
        self.send_event(None, target, event)
    }
}

impl<R: Runtime + ?Sized> RuntimeExt for R {}

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(0);

pub(crate) fn next_instance() -> u64 {
    NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed)
}

pub(crate) fn emit(configuration: &Configuration, args: fmt::Arguments<'_>) {
    if configuration.verbosity {
        log::info!("{}", args);
    } else {
        log::trace!("{}", args);
    }
}

/// The checks and log line shared by both runtimes before an event is enqueued.
pub(crate) fn check_send(
    runtime: &dyn Runtime,
    sender: Option<&ActorId>,
    target: &ActorId,
    event: &Event,
) -> Result<()> {
    runtime.assert(!event.is_empty(), "Cannot send a null event.")?;
    runtime.assert(
        target.is_owned_by(runtime),
        &format!("Cannot send to '{}', which belongs to another runtime.", target),
    )?;
    match sender {
        Some(sender) => runtime.log(format_args!(
            "<SendLog> '{}' sent event '{}' to '{}'.",
            sender,
            event.name(),
            target
        )),
        None => runtime.log(format_args!(
            "<SendLog> Event '{}' was sent to '{}'.",
            event.name(),
            target
        )),
    }
    Ok(())
}
