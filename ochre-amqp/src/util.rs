//! Common utilities

use crate::channel::ShutdownReason;

/// Outcome of one event-loop step.
#[derive(Debug)]
pub(crate) enum Running {
    Continue,
    /// Stop the event loop with the reason the actor exits with.
    Stop(ShutdownReason),
}
