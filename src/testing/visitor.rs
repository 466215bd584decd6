use crate::report::IterationReport;
use parking_lot::Mutex;
use std::sync::Arc;

/// A visitor applied to the [`IterationReport`] of every bug-finding iteration.
///
/// Implementations include [`IterationRecorder`] and `impl `[`Fn`]`(&IterationReport)`.
///
/// # Example
///
/// ```
/// # use stepwise::*;
/// # use stepwise::report::IterationReport;
/// # use stepwise::testing::BugFindingEngine;
/// BugFindingEngine::new(Configuration::default(), |_: &dyn Runtime| Ok(()))
///     .visitor(|report: &IterationReport| println!("{:?}", report.outcome))
///     .run();
/// ```
pub trait IterationVisitor {
    fn visit(&self, report: &IterationReport);
}

impl<F> IterationVisitor for F
where
    F: Fn(&IterationReport),
{
    fn visit(&self, report: &IterationReport) {
        self(report)
    }
}

/// An [`IterationVisitor`] that keeps every report.
///
/// # Example
///
/// ```
/// # use stepwise::*;
/// # use stepwise::testing::{BugFindingEngine, IterationRecorder};
/// let (recorder, accessor) = IterationRecorder::new_with_accessor();
/// BugFindingEngine::new(Configuration::default().scheduling_iterations(2), |_: &dyn Runtime| Ok(()))
///     .visitor(recorder)
///     .run();
/// assert_eq!(accessor().len(), 2);
/// ```
pub struct IterationRecorder(Arc<Mutex<Vec<IterationReport>>>);

impl IterationVisitor for IterationRecorder {
    fn visit(&self, report: &IterationReport) {
        self.0.lock().push(report.clone())
    }
}

impl IterationRecorder {
    /// Instantiates an ([`IterationRecorder`], accessor) pair.
    pub fn new_with_accessor() -> (Self, impl Fn() -> Vec<IterationReport>) {
        let recorder = Self(Arc::new(Mutex::new(Vec::new())));
        let accessor = {
            let r = Arc::clone(&recorder.0);
            move || r.lock().clone()
        };
        (recorder, accessor)
    }
}
