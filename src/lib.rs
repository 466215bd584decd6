//! A library for building programs out of actors and state machines, and for finding their
//! concurrency bugs by running them under a controlled scheduler.
//!
//! The same program runs two ways. An [`ActorRuntime`] gives every handler run its own thread and
//! lets them race. A [`BugFindingEngine`](testing::BugFindingEngine) instead runs the program many
//! times, each time on a [`BugFindingRuntime`] that lets one actor run at a time and picks who goes
//! next at every creation and send, so that assertion failures caused by rare interleavings show
//! up quickly and replay from a seed.
//!
//! ```rust
//! use stepwise::*;
//! use stepwise::testing::BugFindingEngine;
//!
//! #[derive(Debug)]
//! struct Add(u32);
//!
//! #[derive(Default)]
//! struct Accumulator { total: u32 }
//!
//! impl Machine for Accumulator {
//!     fn declare(&self, states: &mut StateDeclarations<Self>) {
//!         states.start_state("Summing")
//!             .on_event_do::<Add, _>(|acc, ctx, event| {
//!                 acc.total += event.payload::<Add>().map_or(0, |add| add.0);
//!                 ctx.assert(acc.total <= 3, "total exceeded 3")
//!             });
//!     }
//! }
//!
//! let report = BugFindingEngine::new(
//!     Configuration::default().scheduling_iterations(10).random_seed(7),
//!     |runtime: &dyn Runtime| {
//!         let acc = runtime.create_machine("Accumulator", Accumulator::default(), None)?;
//!         runtime.send(&acc, Event::new(Add(2)))?;
//!         runtime.send(&acc, Event::new(Add(2)))
//!     })
//!     .run();
//! assert_eq!(report.bugs_found, 1);
//! assert_eq!(report.bugs[0].message, "total exceeded 3");
//! ```

mod config;
mod error;
mod event;
mod runtime;

pub mod actor;
pub mod machine;
pub mod monitor;
pub mod report;
pub mod testing;

#[cfg(test)]
mod test_util;

pub use actor::{Actor, ActorBlueprint, ActorId, Context};
pub use config::*;
pub use error::{Error, Result};
pub use event::*;
pub use machine::{Machine, MachineContext, StateBuilder, StateDeclarations};
pub use monitor::{Monitor, MonitorBlueprint, MonitorContext, MonitorDeclarations, MonitorStateBuilder};
pub use runtime::*;
