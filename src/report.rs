//! Outcomes of bug-finding runs and the ways of reporting them.

use serde::{Deserialize, Serialize};
use std::io::Write;

/// How a single iteration ended.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum IterationOutcome {
    /// Every participant ran out of work without violating an assertion.
    FullyExplored,
    /// An assertion failed with this message.
    BugFound(String),
}

/// Delivered after every iteration.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct IterationReport {
    /// Zero based.
    pub iteration: usize,
    pub outcome: IterationOutcome,
    /// The actor id chosen at each scheduling decision.
    pub schedule: Vec<u64>,
}

/// A bug together with the schedule that led to it.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct BugReport {
    pub iteration: usize,
    pub message: String,
    pub schedule: Vec<u64>,
}

/// The aggregate of a bug-finding run.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct TestReport {
    /// Iterations actually performed.
    pub iterations: usize,
    pub bugs_found: usize,
    /// Iterations that ended because nothing was left to run.
    pub fully_explored: usize,
    pub bugs: Vec<BugReport>,
}

impl TestReport {
    pub(crate) fn record(&mut self, iteration: &IterationReport) {
        self.iterations += 1;
        match &iteration.outcome {
            IterationOutcome::FullyExplored => self.fully_explored += 1,
            IterationOutcome::BugFound(message) => {
                self.bugs_found += 1;
                self.bugs.push(BugReport {
                    iteration: iteration.iteration,
                    message: message.clone(),
                    schedule: iteration.schedule.clone(),
                });
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// A reporter for progress during bug finding.
pub trait Reporter {
    /// Report the end of one iteration.
    fn report_iteration(&mut self, report: &IterationReport);

    /// Report the aggregate at the end of the run.
    fn report_done(&mut self, report: &TestReport);
}

pub struct WriteReporter<'a, W> {
    writer: &'a mut W,
}

impl<'a, W> WriteReporter<'a, W> {
    pub fn new(writer: &'a mut W) -> Self {
        Self { writer }
    }
}

impl<'a, W> Reporter for WriteReporter<'a, W>
where
    W: Write,
{
    fn report_iteration(&mut self, report: &IterationReport) {
        match &report.outcome {
            IterationOutcome::FullyExplored => {
                let _ = writeln!(
                    self.writer,
                    "Iteration {} explored. steps={}",
                    report.iteration,
                    report.schedule.len()
                );
            }
            IterationOutcome::BugFound(message) => {
                let _ = writeln!(
                    self.writer,
                    "Iteration {} found a bug. steps={}, message={}",
                    report.iteration,
                    report.schedule.len(),
                    message
                );
            }
        }
    }

    fn report_done(&mut self, report: &TestReport) {
        let _ = writeln!(
            self.writer,
            "Done. iterations={}, bugs={}, explored={}",
            report.iterations, report.bugs_found, report.fully_explored,
        );
        for bug in &report.bugs {
            let _ = writeln!(
                self.writer,
                "Bug in iteration {}: {} schedule={:?}",
                bug.iteration, bug.message, bug.schedule
            );
        }
    }
}
