use crate::actor::{ActorBlueprint, ActorId, Launch, Schedulable};
use crate::error::panic_message;
use crate::monitor::{MonitorBehavior, MonitorBlueprint};
use crate::runtime::{check_send, emit, next_instance, Runtime};
use crate::testing::{BugFindingScheduler, SharedStrategy};
use crate::{Configuration, Error, Event, Result};
use crossbeam_utils::sync::WaitGroup;
use dashmap::DashMap;
use nohash_hasher::BuildNoHashHasher;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread;

/// The scheduling id of the thread running the test entry point.
pub const HARNESS: u64 = u64::MAX;

/// A runtime for a single bug-finding iteration. Handlers still get their own threads, but they
/// only make progress while holding the turn handed out by a [`BugFindingScheduler`], and every
/// creation and send is a scheduling point. Monitors are run synchronously.
///
/// The thread that constructs the runtime becomes the harness participant and holds the turn
/// first. It keeps participating until [`Runtime::wait`] is called.
pub struct BugFindingRuntime {
    this: Weak<BugFindingRuntime>,
    instance: u64,
    configuration: Configuration,
    scheduler: BugFindingScheduler,
    next_id: AtomicU64,
    actors: DashMap<u64, Arc<dyn Schedulable>, BuildNoHashHasher<u64>>,
    monitors: Mutex<HashMap<String, Box<dyn MonitorBehavior>, ahash::RandomState>>,
    /// Taken by `wait`, so that threads spawned afterwards are refused.
    threads: Mutex<Option<WaitGroup>>,
    harness_halted: AtomicBool,
}

impl BugFindingRuntime {
    pub fn new(configuration: Configuration, strategy: SharedStrategy) -> Arc<Self> {
        let scheduler = BugFindingScheduler::new(&configuration, strategy);
        scheduler.attach(HARNESS, "Harness");
        Arc::new_cyclic(|this| BugFindingRuntime {
            this: Weak::clone(this),
            instance: next_instance(),
            configuration,
            scheduler,
            next_id: AtomicU64::new(0),
            actors: DashMap::default(),
            monitors: Mutex::new(HashMap::default()),
            threads: Mutex::new(Some(WaitGroup::new())),
            harness_halted: AtomicBool::new(false),
        })
    }

    pub fn scheduler(&self) -> &BugFindingScheduler {
        &self.scheduler
    }

    /// The scheduling decisions made so far.
    pub fn trace(&self) -> Vec<u64> {
        self.scheduler.trace()
    }

    /// The first assertion failure of the iteration.
    pub fn bug(&self) -> Option<String> {
        self.scheduler.bug()
    }

    /// Records how the test entry point ended. A panic counts as a bug; a cancellation does not.
    pub fn finish_harness(&self, outcome: thread::Result<Result<()>>) {
        self.settle("Harness", outcome);
    }

    /// Starts a handler run for `cell` on a new thread and returns once that thread is parked.
    fn run_handler(&self, cell: Arc<dyn Schedulable>, launch: Launch) -> Result<()> {
        let runtime = self.this.upgrade().ok_or(Error::Canceled)?;
        let guard = self.threads.lock().clone().ok_or(Error::Canceled)?;
        let id = cell.id().value();
        self.scheduler.notify_process_created(id, &cell.id().to_string());
        let spawned = thread::Builder::new()
            .name(format!("actor-{}", cell.id()))
            .spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    runtime.scheduler.notify_process_started(id)?;
                    cell.run(&*runtime, launch)
                }));
                runtime.settle(&cell.id().to_string(), outcome);
                runtime.scheduler.notify_process_halted(id);
                drop(guard);
            });
        if let Err(error) = spawned {
            let message = format!("Unable to spawn a thread for '{}': {}", id, error);
            self.scheduler.notify_assertion_failure(&message);
            return Err(Error::Spawn(message));
        }
        self.scheduler.wait_for_process_to_start(id);
        Ok(())
    }

    fn settle(&self, participant: &str, outcome: thread::Result<Result<()>>) {
        let message = match outcome {
            Ok(Ok(())) | Ok(Err(Error::Canceled)) => return,
            Ok(Err(Error::AssertionFailure(message))) | Ok(Err(Error::Spawn(message))) => message,
            Err(panic) => {
                let message = panic_message(&*panic);
                emit(&self.configuration, format_args!("<ErrorLog> {}", message));
                message
            }
        };
        log::debug!("Participant failed. participant={}, error={}", participant, message);
        self.scheduler.notify_assertion_failure(&message);
    }
}

impl Runtime for BugFindingRuntime {
    fn instance(&self) -> u64 {
        self.instance
    }

    fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    fn create(&self, name: &str, blueprint: ActorBlueprint, init: Option<Event>) -> Result<ActorId> {
        self.scheduler.schedule()?;
        let id = ActorId::new(self.next_id.fetch_add(1, Ordering::SeqCst), name, self.instance);
        let kind = blueprint.kind();
        let cell = blueprint.build(id.clone(), self)?;
        self.log(format_args!("<CreateLog> {} '{}' is created.", kind, id));
        self.actors.insert(id.value(), Arc::clone(&cell));
        self.run_handler(cell, Launch::Start(init))?;
        Ok(id)
    }

    fn register_monitor_blueprint(&self, name: &str, blueprint: MonitorBlueprint) -> Result<()> {
        self.scheduler.schedule()?;
        self.assert(
            !self.monitors.lock().contains_key(name),
            &format!("Monitor '{}' is already registered.", name),
        )?;
        self.log(format_args!("<MonitorLog> Monitor '{}' is registered.", name));
        let mut monitor = blueprint.build(name, self)?;
        monitor.start(self)?;
        self.monitors.lock().insert(name.to_owned(), monitor);
        Ok(())
    }

    fn send_event(&self, sender: Option<&ActorId>, target: &ActorId, event: Event) -> Result<()> {
        self.scheduler.schedule()?;
        check_send(self, sender, target, &event)?;
        let cell = match self.actors.get(&target.value()) {
            Some(cell) => Arc::clone(cell.value()),
            None => return Ok(()),
        };
        if cell.enqueue(event, self) {
            self.run_handler(cell, Launch::Resume)?;
        }
        Ok(())
    }

    fn invoke_monitor(&self, name: &str, event: Event) -> Result<()> {
        let mut monitors = self.monitors.lock();
        match monitors.get_mut(name) {
            Some(monitor) => {
                self.log(format_args!(
                    "<MonitorLog> Monitor '{}' is invoked with event '{}'.",
                    name,
                    event.name()
                ));
                monitor.invoke(self, event)
            }
            None => {
                drop(monitors);
                self.assert(false, &format!("<MonitorLog> Invoking unregistered monitor '{}'.", name))
            }
        }
    }

    fn assert(&self, predicate: bool, message: &str) -> Result<()> {
        if predicate {
            return Ok(());
        }
        emit(&self.configuration, format_args!("<ErrorLog> {}", message));
        self.scheduler.notify_assertion_failure(message);
        Err(Error::AssertionFailure(message.to_owned()))
    }

    fn random_boolean(&self) -> Result<bool> {
        self.scheduler.next_boolean_choice()
    }

    fn log(&self, args: fmt::Arguments<'_>) {
        emit(&self.configuration, args)
    }

    /// Halts the harness, then blocks until the iteration has stopped and every handler thread
    /// has exited. Returns the bug found, if any.
    fn wait(&self) -> Result<()> {
        if !self.harness_halted.swap(true, Ordering::SeqCst) {
            self.scheduler.notify_process_halted(HARNESS);
        }
        self.scheduler.wait();
        let threads = self.threads.lock().take();
        if let Some(threads) = threads {
            threads.wait();
        }
        match self.scheduler.bug() {
            Some(message) => Err(Error::AssertionFailure(message)),
            None => Ok(()),
        }
    }

    fn current_state(&self, id: &ActorId) -> Option<String> {
        if !id.is_owned_by(self) {
            return None;
        }
        let cell = self.actors.get(&id.value()).map(|cell| Arc::clone(cell.value()))?;
        cell.current_state()
    }

    fn monitor_state(&self, name: &str) -> Option<String> {
        self.monitors.lock().get(name).and_then(|monitor| monitor.current_state())
    }
}

#[cfg(test)]
mod test {
    use super::HARNESS;
    use crate::testing::{RandomStrategy, SharedStrategy, StopReason};
    use crate::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn runtime(seed: u64) -> Arc<BugFindingRuntime> {
        let strategy: SharedStrategy = Arc::new(Mutex::new(RandomStrategy::new(Some(seed))));
        BugFindingRuntime::new(Configuration::default(), strategy)
    }

    #[derive(Debug)]
    struct Note;

    struct Quiet;
    impl Actor for Quiet {
        fn handle_event(&mut self, _ctx: &mut Context<'_>, _event: Event) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn an_idle_harness_explores_immediately() {
        let runtime = runtime(1);
        assert_eq!(runtime.wait(), Ok(()));
        assert_eq!(runtime.scheduler().stop_reason(), Some(StopReason::FullyExplored));
        assert!(runtime.trace().is_empty());
    }

    #[test]
    fn creation_and_sends_are_scheduling_points() {
        let runtime = runtime(2);
        let quiet = runtime.create_actor("Quiet", Quiet, None).unwrap();
        runtime.send(&quiet, Event::new(Note)).unwrap();
        assert_eq!(runtime.wait(), Ok(()));
        assert!(!runtime.trace().is_empty());
        assert!(runtime.trace().contains(&HARNESS));
    }

    #[test]
    fn failed_assertions_are_bugs() {
        let runtime = runtime(3);
        assert_eq!(
            runtime.assert(false, "nope"),
            Err(Error::AssertionFailure("nope".to_owned())));
        assert_eq!(runtime.wait(), Err(Error::AssertionFailure("nope".to_owned())));
        assert_eq!(runtime.scheduler().stop_reason(), Some(StopReason::BugFound));
    }

    #[test]
    fn operations_after_stopping_are_canceled() {
        let runtime = runtime(4);
        runtime.wait().unwrap();
        assert_eq!(runtime.create_actor("Quiet", Quiet, None).err(), Some(Error::Canceled));
        assert_eq!(runtime.wait(), Ok(()));
    }

    #[derive(Debug)]
    struct Arm;

    /// Moves to `Armed` on `Arm`.
    struct Latch;
    impl Monitor for Latch {
        fn declare(&self, states: &mut MonitorDeclarations<Self>) {
            states.start_state("Open").on_event_goto::<Arm>("Armed");
            states.state("Armed");
        }
    }

    #[test]
    fn monitor_states_are_observable() {
        let runtime = runtime(6);
        runtime.register_monitor("Latch", Latch).unwrap();
        assert_eq!(runtime.monitor_state("Latch"), Some("Open".to_owned()));
        runtime.invoke_monitor("Latch", Event::new(Arm)).unwrap();
        assert_eq!(runtime.monitor_state("Latch"), Some("Armed".to_owned()));
        assert_eq!(runtime.monitor_state("Missing"), None);
        assert_eq!(runtime.wait(), Ok(()));
    }

    #[test]
    fn invoking_an_unregistered_monitor_is_a_bug() {
        let runtime = runtime(5);
        assert!(runtime.invoke_monitor("Missing", Event::new(Note)).is_err());
        assert_eq!(
            runtime.bug(),
            Some("<MonitorLog> Invoking unregistered monitor 'Missing'.".to_owned()));
        assert!(runtime.wait().is_err());
    }
}
