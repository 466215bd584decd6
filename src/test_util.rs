//! Utilities for tests. The fixtures only use names re-exported at the crate root, so the programs
//! under `demos/` include the same files.

pub mod bounded_async;
pub mod ping_pong;
