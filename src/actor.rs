//! This module provides the [`Actor`] trait for plain event handlers, the [`Context`] handed to
//! every handler, and [`ActorId`]. State machines build on the same plumbing; see
//! [`Machine`](crate::Machine).
//!
//! ## Example
//!
//! An echo actor replies to whoever names itself in the request.
//!
//! ```
//! use stepwise::*;
//!
//! #[derive(Debug)]
//! struct Request { reply_to: ActorId, value: u32 }
//!
//! #[derive(Debug)]
//! struct Reply(u32);
//!
//! struct Echo;
//! impl Actor for Echo {
//!     fn handle_event(&mut self, ctx: &mut Context<'_>, event: Event) -> Result<()> {
//!         if let Some(request) = event.payload::<Request>() {
//!             ctx.send(&request.reply_to, Event::new(Reply(request.value)))?;
//!         }
//!         Ok(())
//!     }
//! }
//!
//! struct Sink;
//! impl Actor for Sink {
//!     fn handle_event(&mut self, ctx: &mut Context<'_>, event: Event) -> Result<()> {
//!         ctx.assert(event.payload::<Reply>().map(|r| r.0) == Some(7), "unexpected reply")
//!     }
//! }
//!
//! let runtime = ActorRuntime::new(Configuration::default());
//! let echo = runtime.create_actor("Echo", Echo, None).unwrap();
//! let sink = runtime.create_actor("Sink", Sink, None).unwrap();
//! runtime.send(&echo, Event::new(Request { reply_to: sink, value: 7 })).unwrap();
//! runtime.wait().unwrap();
//! ```

mod cell;
mod context;
mod id;

pub(crate) use cell::*;
pub use context::*;
pub use id::*;

use crate::{Event, Result, Runtime};
use std::collections::VecDeque;
use std::sync::Arc;

/// An event handler with private state. A runtime never runs two handlers of the same actor at
/// once, and delivers events from any single sender in the order they were sent.
pub trait Actor: Send + 'static {
    /// Handles one event. The initialization event given at creation, when present, arrives
    /// here before anything else.
    fn handle_event(&mut self, ctx: &mut Context<'_>, event: Event) -> Result<()>;
}

type Build = Box<dyn FnOnce(ActorId, &dyn Runtime) -> Result<Arc<dyn Schedulable>> + Send>;

/// A type-erased recipe for an actor or state machine, consumed by [`Runtime::create`]. Usually
/// built for you by [`RuntimeExt`](crate::RuntimeExt).
pub struct ActorBlueprint {
    pub(crate) kind: &'static str,
    pub(crate) build: Build,
}

impl ActorBlueprint {
    pub fn actor<A: Actor>(actor: A) -> Self {
        ActorBlueprint {
            kind: "Actor",
            build: Box::new(move |id: ActorId, _runtime: &dyn Runtime| {
                Ok(Arc::new(ActorCell::new(id, ActorBehavior(actor))) as Arc<dyn Schedulable>)
            }),
        }
    }

    /// "Actor" or "Machine".
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub(crate) fn build(self, id: ActorId, runtime: &dyn Runtime) -> Result<Arc<dyn Schedulable>> {
        (self.build)(id, runtime)
    }
}

struct ActorBehavior<A>(A);

impl<A: Actor> Behavior for ActorBehavior<A> {
    fn start(&mut self, ctx: &mut Context<'_>, init: Option<Event>) -> Result<()> {
        match init {
            Some(event) => self.0.handle_event(ctx, event),
            None => Ok(()),
        }
    }

    fn next_event(&mut self, queue: &mut VecDeque<Event>) -> Option<Event> {
        queue.pop_front()
    }

    fn handle(&mut self, ctx: &mut Context<'_>, event: Event) -> Result<()> {
        self.0.handle_event(ctx, event)
    }

    fn current_state(&self) -> Option<String> {
        None
    }
}
