use crate::actor::{Behavior, Context};
use crate::machine::declaration::{ActionHandler, State, StateDeclarations};
use crate::machine::{Machine, MachineContext};
use crate::{Event, EventKind, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// How the active frame treats an event kind that its state does not bind to a transition.
enum Binding<M> {
    Action(ActionHandler<M>),
    Ignore,
    Defer,
}

impl<M> Clone for Binding<M> {
    fn clone(&self) -> Self {
        match self {
            Binding::Action(action) => Binding::Action(Arc::clone(action)),
            Binding::Ignore => Binding::Ignore,
            Binding::Defer => Binding::Defer,
        }
    }
}

type Bindings<M> = HashMap<EventKind, Binding<M>, ahash::RandomState>;

/// An entry of the state stack. `bindings` is the frame below overlaid with this state's
/// deferred, action, and ignored kinds, minus the kinds this state routes to a transition.
struct Frame<M> {
    state: Arc<State<M>>,
    bindings: Bindings<M>,
}

/// Runs a [`Machine`] inside an actor cell: event selection, transitions, and the state stack.
pub(crate) struct MachineBehavior<M> {
    machine: M,
    states: HashMap<String, Arc<State<M>>, ahash::RandomState>,
    start: String,
    stack: Vec<Frame<M>>,
    raised: Option<Event>,
    pop_requested: bool,
}

impl<M: Machine> MachineBehavior<M> {
    /// Collects and validates the declarations, returning every problem in one message.
    pub(crate) fn new(machine: M) -> std::result::Result<Self, String> {
        let mut declarations = StateDeclarations::new();
        machine.declare(&mut declarations);
        declarations.validate();
        if !declarations.errors.is_empty() {
            return Err(declarations.errors.join(" "));
        }
        let start = declarations
            .start
            .ok_or_else(|| "No start state is declared.".to_owned())?;
        Ok(MachineBehavior {
            machine,
            states: declarations
                .states
                .into_iter()
                .map(|(name, state)| (name, Arc::new(state)))
                .collect(),
            start,
            stack: Vec::new(),
            raised: None,
            pop_requested: false,
        })
    }

    fn state(&self, name: &str) -> Option<Arc<State<M>>> {
        self.states.get(name).cloned()
    }

    fn top(&self) -> Option<Arc<State<M>>> {
        self.stack.last().map(|frame| Arc::clone(&frame.state))
    }

    fn binding(&self, kind: &EventKind) -> Option<&Binding<M>> {
        self.stack.last().and_then(|frame| frame.bindings.get(kind))
    }

    /// Runs `f` against the user machine with a [`MachineContext`] wired to this behavior.
    fn invoke<R>(
        &mut self,
        ctx: &mut Context<'_>,
        f: impl FnOnce(&mut M, &mut MachineContext<'_, '_>) -> Result<R>,
    ) -> Result<R> {
        let MachineBehavior {
            machine,
            states,
            stack,
            raised,
            pop_requested,
            ..
        } = self;
        let is_declared = |name: &str| states.contains_key(name);
        let mut mctx = MachineContext {
            ctx,
            current: stack
                .last()
                .map(|frame| frame.state.name.as_str())
                .unwrap_or_default(),
            depth: stack.len(),
            is_declared: &is_declared,
            raised,
            pop_requested,
        };
        f(machine, &mut mctx)
    }

    fn push_frame(&mut self, state: Arc<State<M>>) {
        let mut bindings = self
            .stack
            .last()
            .map(|frame| frame.bindings.clone())
            .unwrap_or_default();
        for kind in &state.deferred {
            bindings.insert(*kind, Binding::Defer);
        }
        for (kind, action) in &state.actions {
            bindings.insert(*kind, Binding::Action(Arc::clone(action)));
        }
        for kind in &state.ignored {
            bindings.insert(*kind, Binding::Ignore);
        }
        for kind in state.gotos.keys().chain(state.pushes.keys()) {
            bindings.remove(kind);
        }
        self.stack.push(Frame { state, bindings });
    }

    fn enter(&mut self, ctx: &mut Context<'_>, event: Option<Event>) -> Result<()> {
        let Some(state) = self.top() else {
            return Ok(());
        };
        ctx.log(format_args!("<StateLog> Machine '{}' enters state '{}'.", ctx.id(), state.name));
        if let Some(entry) = &state.entry {
            self.invoke(ctx, |machine, mctx| entry(machine, mctx, event))?;
        }
        if std::mem::take(&mut self.pop_requested) {
            self.pop_state(ctx)?;
        }
        Ok(())
    }

    fn exit(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        let Some(state) = self.top() else {
            return Ok(());
        };
        ctx.log(format_args!("<StateLog> Machine '{}' exits state '{}'.", ctx.id(), state.name));
        if let Some(exit) = &state.exit {
            self.invoke(ctx, |machine, mctx| exit(machine, mctx))?;
        }
        // Popping is meaningless while leaving.
        self.pop_requested = false;
        Ok(())
    }

    fn resolve(&self, ctx: &Context<'_>, name: &str) -> Result<Arc<State<M>>> {
        match self.state(name) {
            Some(state) => Ok(state),
            None => {
                let message = format!("Machine '{}' has no state named '{}'.", ctx.id(), name);
                ctx.assert(false, &message)?;
                Err(crate::Error::AssertionFailure(message))
            }
        }
    }

    fn goto_state(&mut self, ctx: &mut Context<'_>, target: &str, event: Option<Event>) -> Result<()> {
        let state = self.resolve(ctx, target)?;
        self.exit(ctx)?;
        self.stack.pop();
        self.push_frame(state);
        self.enter(ctx, event)
    }

    fn push_state(&mut self, ctx: &mut Context<'_>, target: &str, event: Option<Event>) -> Result<()> {
        let state = self.resolve(ctx, target)?;
        self.push_frame(state);
        self.enter(ctx, event)
    }

    fn pop_state(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        self.pop_requested = false;
        ctx.assert(
            self.stack.len() > 1,
            &format!("Machine '{}' popped with no matching push.", ctx.id()),
        )?;
        self.exit(ctx)?;
        if let Some(frame) = self.stack.pop() {
            ctx.log(format_args!("<PopLog> Machine '{}' popped state '{}'.", ctx.id(), frame.state.name));
        }
        Ok(())
    }
}

impl<M: Machine> Behavior for MachineBehavior<M> {
    fn start(&mut self, ctx: &mut Context<'_>, init: Option<Event>) -> Result<()> {
        let start = self.start.clone();
        let state = self.resolve(ctx, &start)?;
        self.push_frame(state);
        self.enter(ctx, init)
    }

    /// The raised event or jump comes first. Then the mailbox, front to back, dropping ignored
    /// kinds and skipping deferred ones. A raised event that is deferred goes back to the front.
    fn next_event(&mut self, queue: &mut VecDeque<Event>) -> Option<Event> {
        if let Some(event) = self.raised.take() {
            if event.jump_target().is_some() {
                return Some(event);
            }
            match self.binding(&event.kind()) {
                Some(Binding::Ignore) => {}
                Some(Binding::Defer) => queue.push_front(event),
                _ => return Some(event),
            }
        }
        let mut index = 0;
        while index < queue.len() {
            match self.binding(&queue[index].kind()) {
                Some(Binding::Ignore) => {
                    queue.remove(index);
                }
                Some(Binding::Defer) => index += 1,
                _ => return queue.remove(index),
            }
        }
        None
    }

    fn handle(&mut self, ctx: &mut Context<'_>, event: Event) -> Result<()> {
        if let Some(target) = event.jump_target() {
            let target = target.to_owned();
            return self.goto_state(ctx, &target, None);
        }
        let kind = event.kind();
        loop {
            let Some(frame) = self.stack.last() else {
                ctx.halt();
                return Ok(());
            };
            let state = Arc::clone(&frame.state);
            let action = match frame.bindings.get(&kind) {
                Some(Binding::Action(action)) => Some(Arc::clone(action)),
                _ => None,
            };

            if let Some(target) = state.gotos.get(&kind) {
                return self.goto_state(ctx, target, Some(event));
            }
            if let Some(target) = state.pushes.get(&kind) {
                return self.push_state(ctx, target, Some(event));
            }
            if let Some(action) = action {
                ctx.log(format_args!(
                    "<ActionLog> Machine '{}' invoked an action in state '{}'.",
                    ctx.id(),
                    state.name
                ));
                self.invoke(ctx, |machine, mctx| action(machine, mctx, event))?;
                if std::mem::take(&mut self.pop_requested) {
                    self.pop_state(ctx)?;
                }
                return Ok(());
            }

            // Unhandled here: leave the state and retry one level down.
            self.exit(ctx)?;
            self.stack.pop();
            match self.stack.last() {
                Some(frame) => ctx.log(format_args!(
                    "<PopLog> Machine '{}' popped with unhandled event '{}' and reentered state '{}'.",
                    ctx.id(),
                    kind.name(),
                    frame.state.name
                )),
                None => {
                    ctx.log(format_args!(
                        "<PopLog> Machine '{}' popped with unhandled event '{}'.",
                        ctx.id(),
                        kind.name()
                    ));
                    ctx.halt();
                    return Ok(());
                }
            }
        }
    }

    fn current_state(&self) -> Option<String> {
        self.stack.last().map(|frame| frame.state.name.clone())
    }
}
