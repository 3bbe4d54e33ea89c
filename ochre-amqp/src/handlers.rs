//! Registered handler sinks for server-pushed events
//!
//! The channel keeps at most one sink per event kind (returns, confirms,
//! flow). A sink is live as long as its receiving half exists; when a forward
//! fails the slot is cleared and a warning is emitted, once.

use ochre_amqp_types::methods::{BasicAck, BasicNack, BasicReturn, ChannelFlow};
use ochre_amqp_types::Content;
use tokio::sync::mpsc;
use tracing::warn;

/// An unroutable mandatory/immediate message handed back by the broker via
/// `basic.return`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnedMessage {
    /// The `basic.return` method.
    pub ret: BasicReturn,
    /// The returned content.
    pub content: Content,
}

/// A publisher-confirm notification forwarded verbatim to the confirm
/// handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirm {
    /// `basic.ack`
    Ack(BasicAck),
    /// `basic.nack`
    Nack(BasicNack),
}

/// Flow notices are the `channel.flow` method itself.
pub type FlowNotice = ChannelFlow;

/// A single handler registration slot with liveness tracking.
#[derive(Debug)]
pub(crate) struct HandlerSlot<T> {
    sink: Option<mpsc::UnboundedSender<T>>,
    kind: &'static str,
}

impl<T> HandlerSlot<T> {
    pub fn new(kind: &'static str) -> Self {
        Self { sink: None, kind }
    }

    /// Installs a sink. Re-registering replaces the prior one; a dead prior
    /// sink simply stops being targeted.
    pub fn register(&mut self, sink: mpsc::UnboundedSender<T>) {
        self.sink = Some(sink);
    }

    pub fn unregister(&mut self) {
        self.sink = None;
    }

    /// Delivers an event to the registered sink. Events with no live sink are
    /// logged and dropped; a dead sink clears the slot.
    pub fn forward(&mut self, event: T) {
        match &self.sink {
            Some(sink) => {
                if sink.send(event).is_err() {
                    warn!(kind = self.kind, "handler sink is gone, clearing slot");
                    self.sink = None;
                }
            }
            None => warn!(kind = self.kind, "no handler registered, dropping event"),
        }
    }
}
