use crate::report::{IterationOutcome, IterationReport, Reporter, TestReport};
use crate::testing::{ExplorationStrategy, IterationVisitor, RandomStrategy, SharedStrategy};
use crate::{BugFindingRuntime, Configuration, Error, Result, Runtime, StrategyKind};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Runs a test entry point repeatedly, each time under a fresh [`BugFindingRuntime`], until an
/// iteration finds a bug or the configured number of iterations is exhausted.
pub struct BugFindingEngine<T> {
    configuration: Configuration,
    strategy: SharedStrategy,
    visitor: Option<Box<dyn IterationVisitor>>,
    test: T,
}

impl<T> BugFindingEngine<T>
where
    T: Fn(&dyn Runtime) -> Result<()>,
{
    pub fn new(configuration: Configuration, test: T) -> Self {
        let strategy: SharedStrategy = match configuration.strategy {
            StrategyKind::Random => Arc::new(Mutex::new(RandomStrategy::new(configuration.random_seed))),
        };
        BugFindingEngine {
            configuration,
            strategy,
            visitor: None,
            test,
        }
    }

    /// Overrides the strategy named by the configuration.
    pub fn strategy(self, strategy: impl ExplorationStrategy + 'static) -> Self {
        BugFindingEngine {
            strategy: Arc::new(Mutex::new(strategy)),
            ..self
        }
    }

    /// Receives the report of every iteration as it completes.
    pub fn visitor(self, visitor: impl IterationVisitor + 'static) -> Self {
        BugFindingEngine {
            visitor: Some(Box::new(visitor)),
            ..self
        }
    }

    pub fn run(&self) -> TestReport {
        self.explore(|_| {})
    }

    /// Like [`BugFindingEngine::run`], but also feeds `reporter` along the way.
    pub fn run_and_report(&self, reporter: &mut impl Reporter) -> TestReport {
        let report = self.explore(|iteration| reporter.report_iteration(iteration));
        reporter.report_done(&report);
        report
    }

    fn explore(&self, mut on_iteration: impl FnMut(&IterationReport)) -> TestReport {
        let mut report = TestReport::default();
        let iterations = self.configuration.scheduling_iterations.max(1);
        self.progress(format_args!(
            ". Testing started. strategy={}, iterations={}",
            self.strategy.lock().description(),
            iterations
        ));
        for iteration in 0..iterations {
            if iteration > 0 && !self.strategy.lock().prepare_for_next_iteration() {
                break;
            }
            self.progress(format_args!("... Iteration #{}", iteration + 1));
            let outcome = self.iterate(iteration);
            on_iteration(&outcome);
            if let Some(visitor) = &self.visitor {
                visitor.visit(&outcome);
            }
            report.record(&outcome);
            if let IterationOutcome::BugFound(message) = &outcome.outcome {
                self.progress(format_args!(
                    "..... Iteration #{} triggered bug #{}: {}",
                    iteration + 1,
                    report.bugs_found,
                    message
                ));
                break;
            }
        }
        self.progress(format_args!(
            ". Done. iterations={}, bugs={}",
            report.iterations, report.bugs_found
        ));
        report
    }

    fn iterate(&self, iteration: usize) -> IterationReport {
        let runtime = BugFindingRuntime::new(self.configuration.clone(), Arc::clone(&self.strategy));
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (self.test)(&*runtime)));
        runtime.finish_harness(outcome);
        let outcome = match runtime.wait() {
            Ok(()) => IterationOutcome::FullyExplored,
            Err(Error::AssertionFailure(message)) => IterationOutcome::BugFound(message),
            Err(error) => IterationOutcome::BugFound(error.to_string()),
        };
        let schedule = runtime.trace();
        log::trace!("Iteration finished. iteration={}, steps={}", iteration, schedule.len());
        IterationReport {
            iteration,
            outcome,
            schedule,
        }
    }

    fn progress(&self, args: std::fmt::Arguments<'_>) {
        if self.configuration.tool_verbosity {
            log::info!("{}", args);
        } else {
            log::debug!("{}", args);
        }
    }
}
