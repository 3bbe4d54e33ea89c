//! The FIFO queue of pending outbound synchronous requests.
//!
//! AMQP 0.9.1 carries no correlation id. The protocol guarantees in-order
//! synchronous replies per channel, so the head of the queue is always the
//! request the next reply belongs to; everything behind it is waiting for the
//! head to complete.

use std::collections::VecDeque;

use ochre_amqp_types::{Content, Method};
use tokio::sync::oneshot;

use crate::channel::Error;

/// Terminal outcome of an admitted request, delivered through the caller's
/// reply sink.
#[derive(Debug, PartialEq)]
pub enum Reply {
    /// The method was handed to the transport (asynchronous methods).
    Ok,
    /// The correlated server reply (synchronous methods).
    Method {
        /// The reply method.
        method: Method,
        /// Content attached to content-bearing replies.
        content: Option<Content>,
    },
}

/// The reply sink of a waiting caller. `None` marks a cast or an internally
/// generated request; exactly one value is sent to a `Some` sink.
pub(crate) type Responder = oneshot::Sender<Result<Reply, Error>>;

/// One queued outbound request.
#[derive(Debug)]
pub(crate) struct PendingRpc {
    pub responder: Option<Responder>,
    pub method: Method,
    pub content: Option<Content>,
}

/// FIFO of in-flight and queued outbound requests. The head is the only
/// request in flight; the inbound path matches replies against it
/// positionally.
#[derive(Debug, Default)]
pub(crate) struct RpcQueue {
    inner: VecDeque<PendingRpc>,
}

impl RpcQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Appends a request. Returns `true` when the queue was idle, in which
    /// case the caller must start driving it.
    pub fn enqueue(&mut self, rpc: PendingRpc) -> bool {
        let was_idle = self.inner.is_empty();
        self.inner.push_back(rpc);
        was_idle
    }

    /// The request currently in flight.
    pub fn head(&self) -> Option<&PendingRpc> {
        self.inner.front()
    }

    /// Removes and returns the request in flight.
    pub fn pop(&mut self) -> Option<PendingRpc> {
        self.inner.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use ochre_amqp_types::methods::{BasicQos, ChannelOpen, ConfirmSelect};

    use super::*;

    fn pending(method: Method) -> PendingRpc {
        PendingRpc {
            responder: None,
            method,
            content: None,
        }
    }

    #[test]
    fn enqueue_reports_idle_queue_once() {
        let mut queue = RpcQueue::new();
        assert!(queue.enqueue(pending(Method::ChannelOpen(ChannelOpen {}))));
        assert!(!queue.enqueue(pending(Method::BasicQos(BasicQos::default()))));
        assert!(!queue.enqueue(pending(Method::ConfirmSelect(ConfirmSelect::default()))));
    }

    #[test]
    fn head_and_pop_preserve_submission_order() {
        let mut queue = RpcQueue::new();
        queue.enqueue(pending(Method::ChannelOpen(ChannelOpen {})));
        queue.enqueue(pending(Method::BasicQos(BasicQos::default())));

        assert_eq!(
            queue.head().map(|rpc| rpc.method.name()),
            Some("channel.open")
        );
        assert_eq!(queue.pop().map(|rpc| rpc.method.name()), Some("channel.open"));
        assert_eq!(queue.head().map(|rpc| rpc.method.name()), Some("basic.qos"));
        assert_eq!(queue.pop().map(|rpc| rpc.method.name()), Some("basic.qos"));
        assert!(queue.is_empty());
    }
}
