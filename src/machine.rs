//! State machines: actors whose behavior is a stack of named states, each binding event kinds to
//! transitions, actions, or mailbox treatment.
//!
//! A [`Machine`] only declares its states; the runtime drives it. Handlers receive the machine
//! itself plus a [`MachineContext`].
//!
//! ```
//! use stepwise::*;
//!
//! #[derive(Debug)]
//! struct Tick;
//!
//! #[derive(Default)]
//! struct Counter { ticks: u32 }
//!
//! impl Machine for Counter {
//!     fn declare(&self, states: &mut StateDeclarations<Self>) {
//!         states.start_state("Counting")
//!             .on_event_do::<Tick, _>(|counter, ctx, _| {
//!                 counter.ticks += 1;
//!                 if counter.ticks == 3 {
//!                     ctx.jump("Done")?;
//!                 }
//!                 Ok(())
//!             });
//!         states.state("Done").ignore::<Tick>();
//!     }
//! }
//!
//! let runtime = ActorRuntime::new(Configuration::default());
//! let counter = runtime.create_machine("Counter", Counter::default(), None).unwrap();
//! for _ in 0..5 {
//!     runtime.send(&counter, Event::new(Tick)).unwrap();
//! }
//! runtime.wait().unwrap();
//! assert_eq!(runtime.current_state(&counter), Some("Done".to_owned()));
//! ```

mod behavior;
mod context;
mod declaration;

pub(crate) use behavior::*;
pub use context::*;
pub use declaration::{StateBuilder, StateDeclarations};

use crate::actor::{ActorBlueprint, ActorCell, ActorId, Schedulable};
use crate::{Error, Result, Runtime};
use std::sync::Arc;

/// A state machine. Implementations declare their states once per instance, before any event is
/// delivered.
pub trait Machine: Send + Sized + 'static {
    fn declare(&self, states: &mut StateDeclarations<Self>);
}

impl ActorBlueprint {
    /// Declaration mistakes surface as an assertion failure when the machine is created.
    pub fn machine<M: Machine>(machine: M) -> Self {
        ActorBlueprint {
            kind: "Machine",
            build: Box::new(move |id: ActorId, runtime: &dyn Runtime| {
                let behavior = match MachineBehavior::new(machine) {
                    Ok(behavior) => behavior,
                    Err(problems) => {
                        let message = format!("Machine '{}' is malformed. {}", id, problems);
                        runtime.assert(false, &message)?;
                        return Err(Error::AssertionFailure(message));
                    }
                };
                Ok(Arc::new(ActorCell::new(id, behavior)) as Arc<dyn Schedulable>)
            }),
        }
    }
}
