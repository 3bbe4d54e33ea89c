//! The pluggable consumer strategy
//!
//! The channel does not interpret consumption semantics; it owns a strategy
//! value and threads every consumer-facing event through it. Strategies are
//! constructed by the application and handed to the channel builder; the
//! channel calls [`ConsumerStrategy::terminate`] when its event loop stops.

use ochre_amqp_types::methods::{
    BasicCancel, BasicCancelOk, BasicConsume, BasicConsumeOk, BasicDeliver,
};
use ochre_amqp_types::Content;
use tokio::sync::mpsc;
use tracing::warn;

use crate::channel::ShutdownReason;

/// Callbacks the channel invokes for consumption semantics.
///
/// Each callback receives `&mut self`; the strategy's state is owned by the
/// channel actor and mutated only on its task.
pub trait ConsumerStrategy: Send + 'static {
    /// Message type accepted by [`handle_call`](Self::handle_call).
    type Call: Send;
    /// Reply type produced by [`handle_call`](Self::handle_call).
    type Reply: Send;

    /// A `basic.consume-ok` arrived; `consume` is the request it answers.
    fn handle_consume_ok(&mut self, consume_ok: BasicConsumeOk, consume: BasicConsume);

    /// A `basic.cancel-ok` arrived; `cancel` is the request it answers.
    fn handle_cancel_ok(&mut self, cancel_ok: BasicCancelOk, cancel: BasicCancel);

    /// The server cancelled a consumer (`basic.cancel` push).
    fn handle_cancel(&mut self, cancel: BasicCancel);

    /// A delivery arrived for one of the strategy's consumers.
    fn handle_deliver(&mut self, deliver: BasicDeliver, content: Content);

    /// A synchronous application call forwarded through
    /// `ChannelHandle::call_consumer`.
    fn handle_call(&mut self, msg: Self::Call) -> Self::Reply;

    /// The channel actor is exiting.
    fn terminate(&mut self, reason: &ShutdownReason);
}

/// Consumer events forwarded by [`SinkConsumer`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConsumerMessage {
    /// A consume request was acknowledged.
    ConsumeOk {
        /// The acknowledgement.
        consume_ok: BasicConsumeOk,
        /// The original request.
        consume: BasicConsume,
    },
    /// A cancel request was acknowledged.
    CancelOk {
        /// The acknowledgement.
        cancel_ok: BasicCancelOk,
        /// The original request.
        cancel: BasicCancel,
    },
    /// The server cancelled a consumer.
    Cancel(BasicCancel),
    /// A message was delivered.
    Deliver {
        /// The delivery method.
        deliver: BasicDeliver,
        /// The delivered content.
        content: Content,
    },
}

/// The default strategy: forwards every consumer event to a single mpsc sink.
///
/// `handle_call` accepts a replacement sink, so an application can re-target
/// deliveries without cancelling its consumers.
#[derive(Debug)]
pub struct SinkConsumer {
    sink: mpsc::UnboundedSender<ConsumerMessage>,
}

impl SinkConsumer {
    /// Creates the strategy and the receiving half of its sink.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ConsumerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { sink: tx }, rx)
    }

    fn emit(&mut self, message: ConsumerMessage) {
        if self.sink.send(message).is_err() {
            warn!("consumer sink is gone, dropping event");
        }
    }
}

impl ConsumerStrategy for SinkConsumer {
    type Call = mpsc::UnboundedSender<ConsumerMessage>;
    type Reply = ();

    fn handle_consume_ok(&mut self, consume_ok: BasicConsumeOk, consume: BasicConsume) {
        self.emit(ConsumerMessage::ConsumeOk {
            consume_ok,
            consume,
        });
    }

    fn handle_cancel_ok(&mut self, cancel_ok: BasicCancelOk, cancel: BasicCancel) {
        self.emit(ConsumerMessage::CancelOk { cancel_ok, cancel });
    }

    fn handle_cancel(&mut self, cancel: BasicCancel) {
        self.emit(ConsumerMessage::Cancel(cancel));
    }

    fn handle_deliver(&mut self, deliver: BasicDeliver, content: Content) {
        self.emit(ConsumerMessage::Deliver { deliver, content });
    }

    fn handle_call(&mut self, sink: Self::Call) -> Self::Reply {
        self.sink = sink;
    }

    fn terminate(&mut self, _reason: &ShutdownReason) {}
}
