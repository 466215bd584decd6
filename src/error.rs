//! Private module for selective re-export.

use std::any::Any;

/// The ways in which an actor task can stop short.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    /// A safety property or a usage rule was violated. In production the failing actor task
    /// ends; under the bug finder the current iteration records a bug and stops.
    #[error("{0}")]
    AssertionFailure(String),

    /// The bug finder ended the iteration while this task was parked or about to run. Never a bug.
    #[error("canceled by the scheduler")]
    Canceled,

    /// The operating system refused to start a handler thread.
    #[error("unable to spawn a handler thread: {0}")]
    Spawn(String),
}

impl Error {
    /// Whether this error only signals that the scheduler ended the iteration.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Error::Canceled)
    }
}

/// The message of an assertion made without one.
pub(crate) const ASSERTION_FAILED: &str = "Detected an assertion failure.";

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        format!("Handler panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("Handler panicked: {}", message)
    } else {
        "Handler panicked.".to_owned()
    }
}
