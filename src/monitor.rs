//! Monitors observe a system through events handed to them synchronously with
//! [`Context::invoke_monitor`](crate::Context::invoke_monitor) and assert safety properties over
//! what they have seen. They have a single active state, no mailbox, and no stack. Only the bug
//! finder runs them; the production runtime skips monitor calls.

use crate::error::ASSERTION_FAILED;
use crate::{Error, Event, EventKind, Payload, Result, Runtime};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

/// A specification monitor.
pub trait Monitor: Send + Sized + 'static {
    fn declare(&self, states: &mut MonitorDeclarations<Self>);
}

type EntryHandler<M> = Arc<dyn Fn(&mut M, &mut MonitorContext<'_>) -> Result<()> + Send + Sync>;
type ActionHandler<M> = Arc<dyn Fn(&mut M, &mut MonitorContext<'_>, Event) -> Result<()> + Send + Sync>;

struct MonitorState<M> {
    name: String,
    entry: Option<EntryHandler<M>>,
    exit: Option<EntryHandler<M>>,
    gotos: HashMap<EventKind, String, ahash::RandomState>,
    actions: HashMap<EventKind, ActionHandler<M>, ahash::RandomState>,
}

/// Collects the states of a [`Monitor`].
pub struct MonitorDeclarations<M> {
    states: HashMap<String, MonitorState<M>, ahash::RandomState>,
    start: Option<String>,
    errors: Vec<String>,
}

impl<M: Monitor> MonitorDeclarations<M> {
    pub fn state(&mut self, name: &str) -> MonitorStateBuilder<'_, M> {
        self.declare(name, false)
    }

    pub fn start_state(&mut self, name: &str) -> MonitorStateBuilder<'_, M> {
        self.declare(name, true)
    }

    fn declare(&mut self, name: &str, is_start: bool) -> MonitorStateBuilder<'_, M> {
        if is_start {
            match &self.start {
                Some(start) => self
                    .errors
                    .push(format!("Start state '{}' conflicts with start state '{}'.", name, start)),
                None => self.start = Some(name.to_owned()),
            }
        }
        if self.states.contains_key(name) {
            self.errors.push(format!("State '{}' is declared more than once.", name));
        }
        let state = self.states.entry(name.to_owned()).or_insert_with(|| MonitorState {
            name: name.to_owned(),
            entry: None,
            exit: None,
            gotos: HashMap::default(),
            actions: HashMap::default(),
        });
        MonitorStateBuilder {
            state,
            errors: &mut self.errors,
        }
    }
}

/// Chained declarations for a single monitor state.
pub struct MonitorStateBuilder<'a, M> {
    state: &'a mut MonitorState<M>,
    errors: &'a mut Vec<String>,
}

impl<'a, M: Monitor> MonitorStateBuilder<'a, M> {
    pub fn on_entry<F>(mut self, handler: F) -> Self
    where
        F: Fn(&mut M, &mut MonitorContext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        if self.state.entry.is_some() {
            self.errors
                .push(format!("State '{}' declares more than one entry action.", self.state.name));
        } else {
            self.state.entry = Some(Arc::new(handler));
        }
        self
    }

    pub fn on_exit<F>(mut self, handler: F) -> Self
    where
        F: Fn(&mut M, &mut MonitorContext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        if self.state.exit.is_some() {
            self.errors
                .push(format!("State '{}' declares more than one exit action.", self.state.name));
        } else {
            self.state.exit = Some(Arc::new(handler));
        }
        self
    }

    pub fn on_event_goto<E: Payload>(mut self, target: &str) -> Self {
        if self.check_fresh::<E>() {
            self.state.gotos.insert(EventKind::of::<E>(), target.to_owned());
        }
        self
    }

    pub fn on_event_do<E, F>(mut self, handler: F) -> Self
    where
        E: Payload,
        F: Fn(&mut M, &mut MonitorContext<'_>, Event) -> Result<()> + Send + Sync + 'static,
    {
        if self.check_fresh::<E>() {
            self.state.actions.insert(EventKind::of::<E>(), Arc::new(handler));
        }
        self
    }

    fn check_fresh<E: Payload>(&mut self) -> bool {
        let kind = EventKind::of::<E>();
        if self.state.gotos.contains_key(&kind) || self.state.actions.contains_key(&kind) {
            self.errors.push(format!(
                "State '{}' declares event '{}' more than once.",
                self.state.name,
                kind.name()
            ));
            false
        } else {
            true
        }
    }
}

/// Given to monitor handlers.
pub struct MonitorContext<'a> {
    name: &'a str,
    state: &'a str,
    runtime: &'a dyn Runtime,
    raised: Option<Event>,
}

impl<'a> MonitorContext<'a> {
    /// The name the monitor was registered under.
    pub fn name(&self) -> &str {
        self.name
    }

    pub fn current_state(&self) -> &str {
        self.state
    }

    pub fn assert(&self, predicate: bool, message: &str) -> Result<()> {
        self.runtime.assert(predicate, message)
    }

    pub fn assert_holds(&self, predicate: bool) -> Result<()> {
        self.runtime.assert(predicate, ASSERTION_FAILED)
    }

    /// Handles `event` right after the running handler returns.
    pub fn raise(&mut self, event: Event) -> Result<()> {
        self.runtime.assert(
            !event.is_empty(),
            &format!("Monitor '{}' cannot raise a null event.", self.name),
        )?;
        self.runtime
            .log(format_args!("<RaiseLog> Monitor '{}' raised event '{}'.", self.name, event.name()));
        self.raised = Some(event);
        Ok(())
    }

    pub fn log(&self, args: fmt::Arguments<'_>) {
        self.runtime.log(args)
    }
}

/// The runtime-facing side of a registered monitor.
pub(crate) trait MonitorBehavior: Send {
    fn start(&mut self, runtime: &dyn Runtime) -> Result<()>;
    fn invoke(&mut self, runtime: &dyn Runtime, event: Event) -> Result<()>;
    fn current_state(&self) -> Option<String>;
}

struct MonitorInstance<M> {
    monitor: M,
    name: String,
    states: HashMap<String, Arc<MonitorState<M>>, ahash::RandomState>,
    start: String,
    current: Option<Arc<MonitorState<M>>>,
}

impl<M: Monitor> MonitorInstance<M> {
    fn new(name: &str, monitor: M) -> std::result::Result<Self, String> {
        let mut declarations = MonitorDeclarations {
            states: HashMap::default(),
            start: None,
            errors: Vec::new(),
        };
        monitor.declare(&mut declarations);
        let MonitorDeclarations {
            states,
            start,
            mut errors,
        } = declarations;
        if start.is_none() {
            errors.push("No start state is declared.".to_owned());
        }
        let mut names: Vec<&String> = states.keys().collect();
        names.sort();
        for state in names.into_iter().map(|name| &states[name]) {
            for target in state.gotos.values() {
                if !states.contains_key(target) {
                    errors.push(format!(
                        "State '{}' transitions to undeclared state '{}'.",
                        state.name, target
                    ));
                }
            }
        }
        match start {
            Some(start) if errors.is_empty() => Ok(MonitorInstance {
                monitor,
                name: name.to_owned(),
                states: states.into_iter().map(|(k, v)| (k, Arc::new(v))).collect(),
                start,
                current: None,
            }),
            _ => Err(format!("Monitor '{}' is malformed. {}", name, errors.join(" "))),
        }
    }

    /// Runs one handler and returns whatever it raised.
    fn call(
        &mut self,
        runtime: &dyn Runtime,
        state: &str,
        f: impl FnOnce(&mut M, &mut MonitorContext<'_>) -> Result<()>,
    ) -> Result<Option<Event>> {
        let mut ctx = MonitorContext {
            name: &self.name,
            state,
            runtime,
            raised: None,
        };
        f(&mut self.monitor, &mut ctx)?;
        Ok(ctx.raised)
    }

    fn enter(&mut self, runtime: &dyn Runtime, target: &str) -> Result<Option<Event>> {
        let state = match self.states.get(target) {
            Some(state) => Arc::clone(state),
            None => {
                let message = format!("Monitor '{}' has no state named '{}'.", self.name, target);
                runtime.assert(false, &message)?;
                return Err(Error::AssertionFailure(message));
            }
        };
        runtime.log(format_args!(
            "<MonitorLog> Monitor '{}' enters state '{}'.",
            self.name, state.name
        ));
        self.current = Some(Arc::clone(&state));
        match &state.entry {
            Some(entry) => self.call(runtime, &state.name, |monitor, ctx| entry(monitor, ctx)),
            None => Ok(None),
        }
    }

    fn exit(&mut self, runtime: &dyn Runtime, state: &Arc<MonitorState<M>>) -> Result<Option<Event>> {
        runtime.log(format_args!(
            "<MonitorLog> Monitor '{}' exits state '{}'.",
            self.name, state.name
        ));
        match &state.exit {
            Some(exit) => self.call(runtime, &state.name, |monitor, ctx| exit(monitor, ctx)),
            None => Ok(None),
        }
    }

    /// Handles `event` and then anything raised along the way. A transition can raise twice, from
    /// the exit and then the entry action; both are handled in that order, ahead of anything
    /// still pending.
    fn process(&mut self, runtime: &dyn Runtime, event: Event) -> Result<()> {
        let mut pending = VecDeque::from([event]);
        while let Some(event) = pending.pop_front() {
            let Some(state) = self.current.clone() else {
                return Ok(());
            };
            let kind = event.kind();
            let raised = if let Some(target) = state.gotos.get(&kind) {
                let raised_on_exit = self.exit(runtime, &state)?;
                let raised_on_entry = self.enter(runtime, target)?;
                [raised_on_exit, raised_on_entry]
            } else if let Some(action) = state.actions.get(&kind) {
                [self.call(runtime, &state.name, |monitor, ctx| action(monitor, ctx, event))?, None]
            } else {
                [None, None]
            };
            for event in raised.into_iter().flatten().rev() {
                pending.push_front(event);
            }
        }
        Ok(())
    }
}

impl<M: Monitor> MonitorBehavior for MonitorInstance<M> {
    fn start(&mut self, runtime: &dyn Runtime) -> Result<()> {
        let start = self.start.clone();
        match self.enter(runtime, &start)? {
            Some(raised) => self.process(runtime, raised),
            None => Ok(()),
        }
    }

    fn invoke(&mut self, runtime: &dyn Runtime, event: Event) -> Result<()> {
        self.process(runtime, event)
    }

    fn current_state(&self) -> Option<String> {
        self.current.as_ref().map(|state| state.name.clone())
    }
}

/// A type-erased monitor waiting to be registered, consumed by
/// [`Runtime::register_monitor_blueprint`]. Usually built for you by
/// [`RuntimeExt::register_monitor`](crate::RuntimeExt::register_monitor).
pub struct MonitorBlueprint {
    build: Box<dyn FnOnce(&str) -> std::result::Result<Box<dyn MonitorBehavior>, String> + Send>,
}

impl MonitorBlueprint {
    pub fn new<M: Monitor>(monitor: M) -> Self {
        MonitorBlueprint {
            build: Box::new(move |name: &str| {
                MonitorInstance::new(name, monitor).map(|m| Box::new(m) as Box<dyn MonitorBehavior>)
            }),
        }
    }

    /// Declaration mistakes surface as an assertion failure.
    pub(crate) fn build(self, name: &str, runtime: &dyn Runtime) -> Result<Box<dyn MonitorBehavior>> {
        match (self.build)(name) {
            Ok(monitor) => Ok(monitor),
            Err(message) => {
                runtime.assert(false, &message)?;
                Err(Error::AssertionFailure(message))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{ActorRuntime, Configuration};

    #[derive(Debug)]
    struct Observed(u32);
    #[derive(Debug)]
    struct Reset;
    #[derive(Debug)]
    struct Settled;

    /// Insists that observed values never decrease, until reset.
    #[derive(Default)]
    struct Monotonic {
        last: u32,
        entries: Vec<String>,
    }

    impl Monitor for Monotonic {
        fn declare(&self, states: &mut MonitorDeclarations<Self>) {
            states
                .start_state("Watching")
                .on_entry(|m, ctx| {
                    m.entries.push(ctx.current_state().to_owned());
                    Ok(())
                })
                .on_event_do::<Observed, _>(|m, ctx, event| {
                    let value = event.payload::<Observed>().map(|o| o.0).unwrap_or_default();
                    ctx.assert(value >= m.last, "observed value decreased")?;
                    m.last = value;
                    Ok(())
                })
                .on_event_goto::<Reset>("Resetting");
            states
                .state("Resetting")
                .on_entry(|m, ctx| {
                    m.last = 0;
                    m.entries.push(ctx.current_state().to_owned());
                    ctx.raise(Event::new(Settled))
                })
                .on_event_goto::<Settled>("Watching");
        }
    }

    fn instance() -> MonitorInstance<Monotonic> {
        match MonitorInstance::new("Monotonic", Monotonic::default()) {
            Ok(instance) => instance,
            Err(message) => panic!("{}", message),
        }
    }

    #[test]
    fn actions_see_events_and_assert() {
        let runtime = ActorRuntime::new(Configuration::default());
        let mut monitor = instance();
        monitor.start(&*runtime).unwrap();
        monitor.invoke(&*runtime, Event::new(Observed(1))).unwrap();
        monitor.invoke(&*runtime, Event::new(Observed(3))).unwrap();
        assert_eq!(
            monitor.invoke(&*runtime, Event::new(Observed(2))),
            Err(Error::AssertionFailure("observed value decreased".to_owned())));
    }

    #[test]
    fn gotos_and_raised_events_chain() {
        let runtime = ActorRuntime::new(Configuration::default());
        let mut monitor = instance();
        monitor.start(&*runtime).unwrap();
        monitor.invoke(&*runtime, Event::new(Observed(5))).unwrap();
        monitor.invoke(&*runtime, Event::new(Reset)).unwrap();
        assert_eq!(monitor.current_state(), Some("Watching".to_owned()));
        assert_eq!(monitor.monitor.entries, vec!["Watching", "Resetting", "Watching"]);
        monitor.invoke(&*runtime, Event::new(Observed(1))).unwrap();
    }

    #[test]
    fn unbound_events_are_ignored() {
        let runtime = ActorRuntime::new(Configuration::default());
        let mut monitor = instance();
        monitor.start(&*runtime).unwrap();
        monitor.invoke(&*runtime, Event::new(Settled)).unwrap();
        assert_eq!(monitor.current_state(), Some("Watching".to_owned()));
    }

    #[derive(Debug)]
    struct Advance;
    #[derive(Debug)]
    struct Left;
    #[derive(Debug)]
    struct Entered;

    /// Raises from both the exit and the entry action of one transition.
    #[derive(Default)]
    struct Chatty {
        heard: Vec<String>,
    }

    impl Monitor for Chatty {
        fn declare(&self, states: &mut MonitorDeclarations<Self>) {
            states
                .start_state("First")
                .on_exit(|_, ctx| ctx.raise(Event::new(Left)))
                .on_event_goto::<Advance>("Second");
            states
                .state("Second")
                .on_entry(|_, ctx| ctx.raise(Event::new(Entered)))
                .on_event_do::<Left, _>(|m, _, _| {
                    m.heard.push("left".to_owned());
                    Ok(())
                })
                .on_event_do::<Entered, _>(|m, ctx, _| {
                    m.heard.push("entered".to_owned());
                    ctx.assert_holds(m.heard.len() == 2)
                });
        }
    }

    #[test]
    fn events_raised_on_exit_and_entry_are_both_handled() {
        let runtime = ActorRuntime::new(Configuration::default());
        let mut monitor = match MonitorInstance::new("Chatty", Chatty::default()) {
            Ok(instance) => instance,
            Err(message) => panic!("{}", message),
        };
        monitor.start(&*runtime).unwrap();
        monitor.invoke(&*runtime, Event::new(Advance)).unwrap();
        assert_eq!(monitor.monitor.heard, vec!["left", "entered"]);
        assert_eq!(
            monitor.invoke(&*runtime, Event::new(Entered)),
            Err(Error::AssertionFailure("Detected an assertion failure.".to_owned())));
    }

    struct NoStart;
    impl Monitor for NoStart {
        fn declare(&self, states: &mut MonitorDeclarations<Self>) {
            states.state("Lonely");
        }
    }

    #[test]
    fn monitors_need_a_start_state() {
        let runtime = ActorRuntime::new(Configuration::default());
        assert_eq!(
            MonitorBlueprint::new(NoStart).build("NoStart", &*runtime).err(),
            Some(Error::AssertionFailure(
                "Monitor 'NoStart' is malformed. No start state is declared.".to_owned())));
    }
}
