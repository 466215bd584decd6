//! Systematic testing. A [`BugFindingEngine`] runs a test entry point many times, each time on a
//! fresh [`BugFindingRuntime`](crate::BugFindingRuntime) whose [`BugFindingScheduler`] lets only
//! one actor run at a time and asks an [`ExplorationStrategy`] who goes next. Every iteration
//! therefore explores one interleaving, and a failing one can be replayed from its seed.
//!
//! ```
//! use stepwise::*;
//! use stepwise::testing::BugFindingEngine;
//!
//! #[derive(Debug)]
//! struct Hello;
//!
//! struct Greeter;
//! impl Actor for Greeter {
//!     fn handle_event(&mut self, ctx: &mut Context<'_>, event: Event) -> Result<()> {
//!         ctx.assert(event.is::<Hello>(), "only greetings expected")
//!     }
//! }
//!
//! let report = BugFindingEngine::new(
//!     Configuration::default().scheduling_iterations(3).random_seed(1),
//!     |runtime: &dyn Runtime| {
//!         let greeter = runtime.create_actor("Greeter", Greeter, None)?;
//!         runtime.send(&greeter, Event::new(Hello))
//!     })
//!     .run();
//! assert_eq!(report.bugs_found, 0);
//! assert_eq!(report.iterations, 3);
//! ```

mod actor_info;
mod engine;
mod scheduler;
mod strategy;
mod visitor;

pub use actor_info::ActorInfo;
pub(crate) use actor_info::Turn;
pub use engine::*;
pub use scheduler::*;
pub use strategy::*;
pub use visitor::*;
