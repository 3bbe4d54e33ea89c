//! Connection-sourced events and the feed the connection drives them through

use ochre_amqp_types::definitions::ChannelId;
use ochre_amqp_types::{AmqpException, Content, Method};
use tokio::sync::{mpsc, oneshot};

use super::error::{Error, ShutdownReason};

/// How the connection wants the channel brought down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseType {
    /// Let in-flight RPCs drain (bounded by the closing timers) before
    /// shutting down.
    Flush,
    /// Shut down immediately.
    Abrupt,
}

/// The reason attached to a `channel_exit` fault event.
#[derive(Debug, Clone, PartialEq)]
pub enum ExitSignal {
    /// A structured protocol error pushed by the broker.
    Amqp(AmqpException),
    /// Anything else: the infrastructure around the channel died.
    Other(String),
}

/// Events the connection actor (or the in-process broker) posts into the
/// channel actor's inbound queue.
#[derive(Debug)]
pub(crate) enum Incoming {
    /// A method decoded off the wire for this channel.
    Method {
        method: Method,
        content: Option<Content>,
    },
    /// The connection actor is closing.
    ConnectionClosing {
        close_type: CloseType,
        reason: ShutdownReason,
    },
    /// Unconditional shutdown with the given reason.
    Shutdown { reason: ShutdownReason },
    /// A collaborator died; `reason` carries the cause.
    ChannelExit {
        channel: ChannelId,
        reason: ExitSignal,
    },
    /// Direct path: the broker pushes a method at the channel.
    SendCommand {
        method: Method,
        content: Option<Content>,
    },
    /// Direct path: like `SendCommand`, but the broker blocks until the
    /// event is accepted. Acked on dequeue, before dispatch.
    SendCommandSync {
        method: Method,
        content: Option<Content>,
        acked: oneshot::Sender<()>,
    },
    /// Direct path: after dispatch, notify the producer that the send
    /// completed.
    SendCommandAndNotify {
        method: Method,
        content: Option<Content>,
        notify: oneshot::Sender<()>,
    },
}

/// The connection actor's half of a channel: posts server-sourced events
/// into the channel actor's inbound queue.
///
/// The queue is unbounded; the actor must always be able to post to itself
/// without blocking, and broker-side backpressure is the writer's concern.
#[derive(Debug, Clone)]
pub struct ChannelFeed {
    pub(crate) tx: mpsc::UnboundedSender<Incoming>,
}

impl ChannelFeed {
    fn post(&self, event: Incoming) -> Result<(), Error> {
        self.tx.send(event).map_err(|_| Error::ChannelStopped)
    }

    /// Delivers a method decoded off the wire.
    pub fn method(&self, method: Method, content: Option<Content>) -> Result<(), Error> {
        self.post(Incoming::Method { method, content })
    }

    /// Signals that the connection is closing.
    pub fn connection_closing(
        &self,
        close_type: CloseType,
        reason: ShutdownReason,
    ) -> Result<(), Error> {
        self.post(Incoming::ConnectionClosing { close_type, reason })
    }

    /// Shuts the channel down unconditionally.
    pub fn shutdown(&self, reason: ShutdownReason) -> Result<(), Error> {
        self.post(Incoming::Shutdown { reason })
    }

    /// Reports that a collaborator of the channel died.
    pub fn channel_exit(&self, channel: ChannelId, reason: ExitSignal) -> Result<(), Error> {
        self.post(Incoming::ChannelExit { channel, reason })
    }

    /// Direct path: pushes a broker method at the channel.
    pub fn send_command(&self, method: Method, content: Option<Content>) -> Result<(), Error> {
        self.post(Incoming::SendCommand { method, content })
    }

    /// Direct path: pushes a broker method and waits until the channel has
    /// accepted it.
    pub async fn send_command_sync(
        &self,
        method: Method,
        content: Option<Content>,
    ) -> Result<(), Error> {
        let (acked, rx) = oneshot::channel();
        self.post(Incoming::SendCommandSync {
            method,
            content,
            acked,
        })?;
        rx.await.map_err(|_| Error::ChannelStopped)
    }

    /// Direct path: pushes a broker method; the returned receiver resolves
    /// once the channel has dispatched it, letting the producer resume.
    pub fn send_command_and_notify(
        &self,
        method: Method,
        content: Option<Content>,
    ) -> Result<oneshot::Receiver<()>, Error> {
        let (notify, rx) = oneshot::channel();
        self.post(Incoming::SendCommandAndNotify {
            method,
            content,
            notify,
        })?;
        Ok(rx)
    }
}
