use crate::machine::{Machine, MachineContext};
use crate::{Event, EventKind, Payload, Result};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub(crate) type EntryHandler<M> =
    Arc<dyn Fn(&mut M, &mut MachineContext<'_, '_>, Option<Event>) -> Result<()> + Send + Sync>;
pub(crate) type ExitHandler<M> = Arc<dyn Fn(&mut M, &mut MachineContext<'_, '_>) -> Result<()> + Send + Sync>;
pub(crate) type ActionHandler<M> =
    Arc<dyn Fn(&mut M, &mut MachineContext<'_, '_>, Event) -> Result<()> + Send + Sync>;

/// One declared state. Each event kind appears in at most one of the five tables.
pub(crate) struct State<M> {
    pub(crate) name: String,
    pub(crate) entry: Option<EntryHandler<M>>,
    pub(crate) exit: Option<ExitHandler<M>>,
    pub(crate) gotos: HashMap<EventKind, String, ahash::RandomState>,
    pub(crate) pushes: HashMap<EventKind, String, ahash::RandomState>,
    pub(crate) actions: HashMap<EventKind, ActionHandler<M>, ahash::RandomState>,
    pub(crate) ignored: HashSet<EventKind, ahash::RandomState>,
    pub(crate) deferred: HashSet<EventKind, ahash::RandomState>,
}

impl<M> State<M> {
    fn new(name: &str) -> Self {
        State {
            name: name.to_owned(),
            entry: None,
            exit: None,
            gotos: HashMap::default(),
            pushes: HashMap::default(),
            actions: HashMap::default(),
            ignored: HashSet::default(),
            deferred: HashSet::default(),
        }
    }

    fn declares(&self, kind: &EventKind) -> bool {
        self.gotos.contains_key(kind)
            || self.pushes.contains_key(kind)
            || self.actions.contains_key(kind)
            || self.ignored.contains(kind)
            || self.deferred.contains(kind)
    }
}

/// Collects the states of a [`Machine`]. Mistakes are recorded rather than raised, and the
/// runtime reports them as an assertion failure when the machine is created.
pub struct StateDeclarations<M> {
    pub(crate) states: HashMap<String, State<M>, ahash::RandomState>,
    pub(crate) start: Option<String>,
    pub(crate) errors: Vec<String>,
}

impl<M: Machine> StateDeclarations<M> {
    pub(crate) fn new() -> Self {
        StateDeclarations {
            states: HashMap::default(),
            start: None,
            errors: Vec::new(),
        }
    }

    /// Declares a state.
    pub fn state(&mut self, name: &str) -> StateBuilder<'_, M> {
        self.declare(name, false)
    }

    /// Declares the state a new machine enters first. Exactly one is required.
    pub fn start_state(&mut self, name: &str) -> StateBuilder<'_, M> {
        self.declare(name, true)
    }

    fn declare(&mut self, name: &str, is_start: bool) -> StateBuilder<'_, M> {
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
        let state = self
            .states
            .entry(name.to_owned())
            .or_insert_with(|| State::new(name));
        StateBuilder {
            state,
            errors: &mut self.errors,
        }
    }

    /// Checks that the declarations form a machine that can start, returning every problem found.
    pub(crate) fn validate(&mut self) {
        if self.start.is_none() {
            self.errors.push("No start state is declared.".to_owned());
        }
        let mut names: Vec<&String> = self.states.keys().collect();
        names.sort();
        for name in names {
            let state = &self.states[name];
            let mut targets: Vec<&String> = state.gotos.values().chain(state.pushes.values()).collect();
            targets.sort();
            for target in targets {
                if !self.states.contains_key(target) {
                    self.errors.push(format!(
                        "State '{}' transitions to undeclared state '{}'.",
                        name, target
                    ));
                }
            }
        }
    }
}

/// Chained declarations for a single state.
pub struct StateBuilder<'a, M> {
    state: &'a mut State<M>,
    errors: &'a mut Vec<String>,
}

impl<'a, M: Machine> StateBuilder<'a, M> {
    /// Runs when the state is entered, with the event that caused the transition if any.
    pub fn on_entry<F>(mut self, handler: F) -> Self
    where
        F: Fn(&mut M, &mut MachineContext<'_, '_>, Option<Event>) -> Result<()> + Send + Sync + 'static,
    {
        if self.state.entry.is_some() {
            self.errors
                .push(format!("State '{}' declares more than one entry action.", self.state.name));
        } else {
            self.state.entry = Some(Arc::new(handler));
        }
        self
    }

    /// Runs when the state is left by a goto transition, a pop, or an unhandled event.
    pub fn on_exit<F>(mut self, handler: F) -> Self
    where
        F: Fn(&mut M, &mut MachineContext<'_, '_>) -> Result<()> + Send + Sync + 'static,
    {
        if self.state.exit.is_some() {
            self.errors
                .push(format!("State '{}' declares more than one exit action.", self.state.name));
        } else {
            self.state.exit = Some(Arc::new(handler));
        }
        self
    }

    /// On an `E` event, exit this state and enter `target` in its place.
    pub fn on_event_goto<E: Payload>(mut self, target: &str) -> Self {
        if self.check_fresh::<E>() {
            self.state.gotos.insert(EventKind::of::<E>(), target.to_owned());
        }
        self
    }

    /// On an `E` event, enter `target` on top of this state. `target` returns here by popping.
    pub fn on_event_push<E: Payload>(mut self, target: &str) -> Self {
        if self.check_fresh::<E>() {
            self.state.pushes.insert(EventKind::of::<E>(), target.to_owned());
        }
        self
    }

    /// On an `E` event, run `handler` and stay. Inherited by states pushed on top of this one.
    pub fn on_event_do<E, F>(mut self, handler: F) -> Self
    where
        E: Payload,
        F: Fn(&mut M, &mut MachineContext<'_, '_>, Event) -> Result<()> + Send + Sync + 'static,
    {
        if self.check_fresh::<E>() {
            self.state.actions.insert(EventKind::of::<E>(), Arc::new(handler));
        }
        self
    }

    /// Drops `E` events while this state is active.
    pub fn ignore<E: Payload>(mut self) -> Self {
        if self.check_fresh::<E>() {
            self.state.ignored.insert(EventKind::of::<E>());
        }
        self
    }

    /// Leaves `E` events in the mailbox until a state that does not defer them is active.
    pub fn defer<E: Payload>(mut self) -> Self {
        if self.check_fresh::<E>() {
            self.state.deferred.insert(EventKind::of::<E>());
        }
        self
    }

    fn check_fresh<E: Payload>(&mut self) -> bool {
        let kind = EventKind::of::<E>();
        if self.state.declares(&kind) {
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
