//! The transport facade
//!
//! Two transports present the same "send method, maybe with content"
//! operation: [`Writer`] hands frames to the writer task owned by the
//! connection, [`DirectBroker`] invokes the in-process broker directly.
//! Neither raises the failure to the RPC caller; a send fault leaves the
//! in-flight request unanswered and the actor expects a subsequent
//! `channel_exit` event carrying the cause.

use std::fmt;
use std::sync::Arc;

use ochre_amqp_types::definitions::ChannelId;
use ochre_amqp_types::{AmqpException, Content, Method};
use tokio::sync::mpsc;

/// One method (plus optional content) addressed to a channel, as handed to
/// the writer task.
#[derive(Debug)]
pub struct WriteRequest {
    /// Channel the frame belongs to.
    pub channel: ChannelId,
    /// The method to serialize.
    pub method: Method,
    /// Content for content-bearing methods.
    pub content: Option<Content>,
}

/// Handle to the frame-writer task that owns the socket.
///
/// The writer serializes requests in arrival order; the channel owns the
/// handle exclusively once bound.
#[derive(Debug, Clone)]
pub struct Writer {
    tx: mpsc::UnboundedSender<WriteRequest>,
}

impl Writer {
    /// Wraps the sending half of the writer task's queue.
    pub fn new(tx: mpsc::UnboundedSender<WriteRequest>) -> Self {
        Self { tx }
    }

    fn send(
        &self,
        channel: ChannelId,
        method: Method,
        content: Option<Content>,
    ) -> Result<(), TransportError> {
        self.tx
            .send(WriteRequest {
                channel,
                method,
                content,
            })
            .map_err(|_| TransportError::WriterGone)
    }
}

/// One-shot callback creating the writer for a channel, invoked at the
/// moment the channel issues `channel.open`.
pub type WriterFactory = Box<dyn FnOnce() -> Writer + Send + 'static>;

/// The in-process broker bypass used when broker and client share a runtime.
pub trait DirectBroker: Send + Sync {
    /// Hands a method (plus optional content) to the broker's channel
    /// routine.
    ///
    /// A returned exception is not reported to the caller synchronously; the
    /// broker side is expected to follow up with a `channel_exit` event.
    fn deliver(
        &self,
        channel: ChannelId,
        method: Method,
        content: Option<Content>,
    ) -> Result<(), AmqpException>;
}

/// Error raised inside the transport facade. Never surfaced to RPC callers.
#[derive(Debug, thiserror::Error)]
pub(crate) enum TransportError {
    #[error("channel is not bound to a transport")]
    Unbound,

    #[error("writer task has stopped")]
    WriterGone,

    #[error("direct broker rejected {0}")]
    Broker(AmqpException),
}

/// The transport a channel sends methods through.
pub(crate) enum Transport {
    /// No writer yet; `channel.open` has not been issued.
    Unbound,
    /// Frames go to the connection's writer task.
    Network(Writer),
    /// Methods go straight to the in-process broker.
    Direct(Arc<dyn DirectBroker>),
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Unbound => f.write_str("Transport::Unbound"),
            Transport::Network(_) => f.write_str("Transport::Network"),
            Transport::Direct(_) => f.write_str("Transport::Direct"),
        }
    }
}

impl Transport {
    pub fn send(
        &self,
        channel: ChannelId,
        method: Method,
        content: Option<Content>,
    ) -> Result<(), TransportError> {
        match self {
            Transport::Unbound => Err(TransportError::Unbound),
            Transport::Network(writer) => writer.send(channel, method, content),
            Transport::Direct(broker) => broker
                .deliver(channel, method, content)
                .map_err(TransportError::Broker),
        }
    }
}

#[cfg(test)]
mod tests {
    use ochre_amqp_types::methods::{BasicQos, ChannelOpen};

    use super::*;

    #[test]
    fn unbound_transport_rejects_sends() {
        let transport = Transport::Unbound;
        let result = transport.send(1, Method::ChannelOpen(ChannelOpen {}), None);
        assert!(matches!(result, Err(TransportError::Unbound)));
    }

    #[test]
    fn writer_forwards_requests_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let transport = Transport::Network(Writer::new(tx));

        transport
            .send(7, Method::ChannelOpen(ChannelOpen {}), None)
            .unwrap();
        transport
            .send(7, Method::BasicQos(BasicQos::default()), None)
            .unwrap();

        let first = rx.try_recv().unwrap();
        assert_eq!(first.channel, 7);
        assert_eq!(first.method.name(), "channel.open");
        let second = rx.try_recv().unwrap();
        assert_eq!(second.method.name(), "basic.qos");
    }

    #[test]
    fn dropped_writer_reports_out_of_band() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let transport = Transport::Network(Writer::new(tx));
        let result = transport.send(1, Method::BasicQos(BasicQos::default()), None);
        assert!(matches!(result, Err(TransportError::WriterGone)));
    }
}
