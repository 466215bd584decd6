use crate::actor::{ActorId, Context};
use crate::{Event, Result, Runtime};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};

/// What a cell runs on behalf of an actor. Implemented for plain actors and for state machines.
pub(crate) trait Behavior: Send + 'static {
    /// Runs once before the first event is dequeued.
    fn start(&mut self, ctx: &mut Context<'_>, init: Option<Event>) -> Result<()>;

    /// Picks the next event to handle, if any qualifies.
    fn next_event(&mut self, queue: &mut VecDeque<Event>) -> Option<Event>;

    fn handle(&mut self, ctx: &mut Context<'_>, event: Event) -> Result<()>;

    fn current_state(&self) -> Option<String>;
}

/// How a handler thread enters a cell.
pub(crate) enum Launch {
    /// First run after creation, with the optional initialization event.
    Start(Option<Event>),
    /// Subsequent run to drain newly delivered events.
    Resume,
}

/// The runtime-facing side of a cell, with the behavior type erased.
pub(crate) trait Schedulable: Send + Sync {
    fn id(&self) -> &ActorId;

    /// Appends `event` to the mailbox. Returns `true` when the caller must start a new handler
    /// run because the actor was idle.
    fn enqueue(&self, event: Event, runtime: &dyn Runtime) -> bool;

    /// Runs handlers until the mailbox has nothing eligible, the actor halts, or a handler fails.
    fn run(&self, runtime: &dyn Runtime, launch: Launch) -> Result<()>;

    fn current_state(&self) -> Option<String>;
}

struct Mailbox {
    queue: VecDeque<Event>,
    /// A handler run is in flight. Set by whoever observes the idle to busy transition.
    running: bool,
    /// Terminal. A halted actor drops everything it is sent.
    halted: bool,
}

pub(crate) struct ActorCell<B> {
    id: ActorId,
    mailbox: Mutex<Mailbox>,
    behavior: Mutex<B>,
    /// Last published state name, cleared on halt. Kept apart from `behavior` so reads never wait
    /// on a handler.
    state: Mutex<Option<String>>,
}

impl<B: Behavior> ActorCell<B> {
    /// A new cell counts as running, since the runtime starts its first handler run right away.
    pub(crate) fn new(id: ActorId, behavior: B) -> Self {
        ActorCell {
            id,
            mailbox: Mutex::new(Mailbox {
                queue: VecDeque::new(),
                running: true,
                halted: false,
            }),
            state: Mutex::new(behavior.current_state()),
            behavior: Mutex::new(behavior),
        }
    }

    fn drain(&self, runtime: &dyn Runtime, behavior: &mut B, launch: Launch) -> Result<()> {
        if let Launch::Start(init) = launch {
            let init = init.filter(|event| !event.is_empty());
            let mut ctx = Context::new(&self.id, runtime);
            let result = behavior.start(&mut ctx, init);
            self.publish(behavior);
            result?;
            if ctx.is_halting() {
                self.halt(runtime);
                return Ok(());
            }
        }
        loop {
            let event = {
                let mut mailbox = self.mailbox.lock();
                match behavior.next_event(&mut mailbox.queue) {
                    Some(event) => event,
                    None => {
                        mailbox.running = false;
                        return Ok(());
                    }
                }
            };
            let mut ctx = Context::new(&self.id, runtime);
            let result = behavior.handle(&mut ctx, event);
            self.publish(behavior);
            result?;
            if ctx.is_halting() {
                self.halt(runtime);
                return Ok(());
            }
        }
    }

    fn publish(&self, behavior: &B) {
        *self.state.lock() = behavior.current_state();
    }

    fn halt(&self, runtime: &dyn Runtime) {
        *self.state.lock() = None;
        let mut mailbox = self.mailbox.lock();
        if !mailbox.halted {
            runtime.log(format_args!("<HaltLog> '{}' halted.", self.id));
        }
        mailbox.halted = true;
        mailbox.running = false;
        mailbox.queue.clear();
    }
}

impl<B: Behavior> Schedulable for ActorCell<B> {
    fn id(&self) -> &ActorId {
        &self.id
    }

    fn enqueue(&self, event: Event, runtime: &dyn Runtime) -> bool {
        let mut mailbox = self.mailbox.lock();
        if mailbox.halted {
            log::trace!("Dropped event sent to halted actor. id={}, event={}", self.id, event.name());
            return false;
        }
        runtime.log(format_args!("<EnqueueLog> '{}' enqueued event '{}'.", self.id, event.name()));
        mailbox.queue.push_back(event);
        if mailbox.running {
            false
        } else {
            mailbox.running = true;
            true
        }
    }

    fn run(&self, runtime: &dyn Runtime, launch: Launch) -> Result<()> {
        let mut behavior = self.behavior.lock();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.drain(runtime, &mut behavior, launch)));
        // A failed or panicked task never runs again.
        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => {
                self.halt(runtime);
                Err(error)
            }
            Err(payload) => {
                self.halt(runtime);
                drop(behavior);
                panic::resume_unwind(payload)
            }
        }
    }

    fn current_state(&self) -> Option<String> {
        self.state.lock().clone()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{ActorRuntime, Configuration};

    #[derive(Debug)]
    struct Poke;

    /// Panics on every event it handles.
    struct Explosive;
    impl Behavior for Explosive {
        fn start(&mut self, _ctx: &mut Context<'_>, _init: Option<Event>) -> Result<()> {
            Ok(())
        }

        fn next_event(&mut self, queue: &mut VecDeque<Event>) -> Option<Event> {
            queue.pop_front()
        }

        fn handle(&mut self, _ctx: &mut Context<'_>, _event: Event) -> Result<()> {
            panic!("explosive");
        }

        fn current_state(&self) -> Option<String> {
            Some("Armed".to_owned())
        }
    }

    #[test]
    fn panicking_handlers_halt_the_cell() {
        let runtime = ActorRuntime::new(Configuration::default());
        let cell = ActorCell::new(ActorId::new(0, "Explosive", runtime.instance()), Explosive);
        assert_eq!(cell.current_state(), Some("Armed".to_owned()));
        cell.mailbox.lock().queue.push_back(Event::new(Poke));

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| cell.run(&*runtime, Launch::Start(None))));
        assert!(outcome.is_err());

        for _ in 0..10 {
            assert!(!cell.enqueue(Event::new(Poke), &*runtime));
        }
        let mailbox = cell.mailbox.lock();
        assert!(mailbox.halted);
        assert!(!mailbox.running);
        assert!(mailbox.queue.is_empty());
        drop(mailbox);
        assert_eq!(cell.current_state(), None);
    }
}
