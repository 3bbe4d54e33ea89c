//! The per-channel actor
//!
//! Each server-side channel is mirrored by one [`ChannelEngine`] task created
//! through the [`Builder`]. The [`ChannelHandle`] is the application surface;
//! the [`ChannelFeed`] is the connection actor's half. All channel state
//! lives in [`Channel`] and is mutated only on the engine task.
//!
//! [`ChannelEngine`]: engine::ChannelEngine

use std::fmt;
use std::time::Duration;

use ochre_amqp_types::definitions::{ChannelId, ReplyCode, REPLY_SUCCESS};
use ochre_amqp_types::methods::ChannelOpen;
use ochre_amqp_types::{Class, Content, Method};
use tokio::sync::{mpsc, oneshot};

use crate::consumer::ConsumerStrategy;
use crate::control::ChannelControl;
use crate::handlers::{Confirm, FlowNotice, HandlerSlot, ReturnedMessage};
use crate::rpc::{Reply, RpcQueue};
use crate::transport::{Transport, WriterFactory};

pub(crate) mod engine;

mod builder;
mod error;
mod frame;

pub use builder::Builder;
pub use error::{Error, ShutdownReason};
pub use frame::{ChannelFeed, CloseType, ExitSignal};

pub(crate) use frame::Incoming;

/// How long a closing connection lets in-flight RPCs drain before giving up.
pub const FLUSH_TIMEOUT: Duration = Duration::from_secs(60);

/// How long a closing connection waits for `channel.close-ok` once the close
/// handshake is under way.
pub const CLOSE_OK_TIMEOUT: Duration = Duration::from_secs(3);

pub(crate) const DEFAULT_CONTROL_BUFFER_SIZE: usize = 128;

/// Where the channel is in its closing lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ClosingState {
    /// Not closing.
    Open,
    /// The application issued `channel.close`; awaiting `close-ok`.
    JustChannel,
    /// The connection is closing and will take the channel down.
    Connection(ShutdownReason),
}

/// All mutable channel state. Owned by the engine task; nothing else writes
/// to any field.
pub(crate) struct Channel<C: ConsumerStrategy> {
    pub number: ChannelId,
    pub transport: Transport,
    /// Consumed when the channel issues `channel.open`.
    pub writer_factory: Option<WriterFactory>,
    pub rpc_queue: RpcQueue,
    pub closing: ClosingState,
    pub return_handler: HandlerSlot<ReturnedMessage>,
    pub confirm_handler: HandlerSlot<Confirm>,
    pub flow_handler: HandlerSlot<FlowNotice>,
    /// 0 while confirms are disabled; the seqno the next publish takes once
    /// `confirm.select` has been sent.
    pub next_pub_seqno: u64,
    /// Mirrors the last `channel.flow` received from the server.
    pub flow_active: bool,
    pub consumer: C,
}

impl<C: ConsumerStrategy> fmt::Debug for Channel<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("number", &self.number)
            .field("transport", &self.transport)
            .field("closing", &self.closing)
            .field("next_pub_seqno", &self.next_pub_seqno)
            .field("flow_active", &self.flow_active)
            .finish()
    }
}

impl<C: ConsumerStrategy> Channel<C> {
    /// Rejects methods an application must not send through `call`/`cast`.
    pub fn validate_outbound(&self, method: &Method) -> Result<(), Error> {
        match method {
            Method::ChannelOpen(_) => Err(Error::OpenForbidden),
            Method::ChannelClose(_) => Err(Error::CloseForbidden),
            _ if method.class() == Class::Connection => Err(Error::ConnectionClassForbidden),
            _ => Ok(()),
        }
    }

    /// The closing/flow admission gate, checked in that order.
    pub fn admit(&self, method: &Method) -> Result<(), Error> {
        if self.closing != ClosingState::Open {
            return Err(Error::Closing);
        }
        if method.has_content() && !self.flow_active {
            return Err(Error::Blocked);
        }
        Ok(())
    }

    /// Publisher-confirm bookkeeping, applied to every admitted method
    /// before it is queued.
    pub fn update_confirm_tracking(&mut self, method: &Method) {
        match method {
            Method::ConfirmSelect(_) => {
                if self.next_pub_seqno == 0 {
                    self.next_pub_seqno = 1;
                }
            }
            Method::BasicPublish(_) => {
                if self.next_pub_seqno > 0 {
                    self.next_pub_seqno += 1;
                }
            }
            _ => {}
        }
    }

    /// Binds the writer right as `channel.open` goes out. The factory is
    /// one-shot; a repeated open leaves the existing writer in place.
    pub fn bind_writer(&mut self) {
        if let Some(factory) = self.writer_factory.take() {
            self.transport = Transport::Network(factory());
        }
    }

    /// `channel.close` is going out; commit to the closing handshake.
    pub fn begin_close(&mut self) {
        if self.closing == ClosingState::Open {
            self.closing = ClosingState::JustChannel;
        }
    }

    /// Once the channel has committed to closing, everything but the close
    /// handshake itself is a late delivery and is discarded.
    pub fn drops_while_closing(&self, method: &Method) -> bool {
        self.closing == ClosingState::JustChannel
            && !matches!(method, Method::ChannelClose(_) | Method::ChannelCloseOk(_))
    }
}

/// The application's handle to a channel actor.
///
/// Synchronous methods sent through [`call`](ChannelHandle::call) suspend the
/// caller until the correlated server reply arrives or the actor exits; no
/// internal timeout applies.
pub struct ChannelHandle<C: ConsumerStrategy> {
    pub(crate) number: ChannelId,
    pub(crate) control: mpsc::Sender<ChannelControl<C>>,
    pub(crate) outcome: Option<oneshot::Receiver<ShutdownReason>>,
}

impl<C: ConsumerStrategy> fmt::Debug for ChannelHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelHandle")
            .field("number", &self.number)
            .finish()
    }
}

impl<C: ConsumerStrategy> Drop for ChannelHandle<C> {
    fn drop(&mut self) {
        let (responder, _) = oneshot::channel();
        let _ = self.control.try_send(ChannelControl::Close {
            code: REPLY_SUCCESS,
            text: "Goodbye".to_string(),
            responder,
        });
    }
}

impl<C: ConsumerStrategy> ChannelHandle<C> {
    /// The channel number assigned at creation.
    pub fn number(&self) -> ChannelId {
        self.number
    }

    /// Checks whether the underlying event loop has stopped.
    pub fn is_closed(&self) -> bool {
        self.control.is_closed()
    }

    async fn send_control(&self, control: ChannelControl<C>) -> Result<(), Error> {
        self.control
            .send(control)
            .await
            .map_err(|_| Error::ChannelStopped)
    }

    async fn rpc(&self, control: ChannelControl<C>, rx: oneshot::Receiver<Result<Reply, Error>>) -> Result<Reply, Error> {
        self.send_control(control).await?;
        rx.await.map_err(|_| Error::ChannelStopped)?
    }

    /// Issues `channel.open` and waits for `channel.open-ok`.
    pub async fn open(&self) -> Result<(), Error> {
        let (responder, rx) = oneshot::channel();
        self.rpc(ChannelControl::Open { responder }, rx).await?;
        Ok(())
    }

    /// Sends a method. For synchronous methods the call suspends until the
    /// correlated reply arrives and returns it; for asynchronous methods it
    /// resolves to [`Reply::Ok`] once the frame has been handed to the
    /// transport.
    pub async fn call(&self, method: Method, content: Option<Content>) -> Result<Reply, Error> {
        let (responder, rx) = oneshot::channel();
        self.rpc(
            ChannelControl::Call {
                method,
                content,
                responder,
            },
            rx,
        )
        .await
    }

    /// Like [`call`](ChannelHandle::call) but never waits for a server
    /// reply; errors are logged by the actor and dropped.
    pub async fn cast(&self, method: Method, content: Option<Content>) -> Result<(), Error> {
        self.send_control(ChannelControl::Cast { method, content })
            .await
    }

    /// Initiates the client-side close handshake and waits for
    /// `channel.close-ok`.
    pub async fn close(&self, code: ReplyCode, text: &str) -> Result<(), Error> {
        let (responder, rx) = oneshot::channel();
        self.rpc(
            ChannelControl::Close {
                code,
                text: text.to_string(),
                responder,
            },
            rx,
        )
        .await?;
        Ok(())
    }

    /// Closes the channel with the success reply code.
    pub async fn close_default(&self) -> Result<(), Error> {
        self.close(REPLY_SUCCESS, "Goodbye").await
    }

    /// The sequence number the next `basic.publish` will take, or 0 while
    /// publisher confirms are disabled.
    pub async fn next_publish_seqno(&self) -> Result<u64, Error> {
        let (responder, rx) = oneshot::channel();
        self.send_control(ChannelControl::NextPublishSeqno { responder })
            .await?;
        rx.await.map_err(|_| Error::ChannelStopped)
    }

    /// Installs the sink receiving `basic.return` messages. At most one sink
    /// is kept; re-registering replaces the prior one.
    pub async fn register_return_handler(
        &self,
        sink: mpsc::UnboundedSender<ReturnedMessage>,
    ) -> Result<(), Error> {
        self.send_control(ChannelControl::RegisterReturnHandler(sink))
            .await
    }

    /// Clears the return handler slot.
    pub async fn unregister_return_handler(&self) -> Result<(), Error> {
        self.send_control(ChannelControl::UnregisterReturnHandler)
            .await
    }

    /// Installs the sink receiving publisher confirms (`basic.ack` /
    /// `basic.nack`).
    pub async fn register_confirm_handler(
        &self,
        sink: mpsc::UnboundedSender<Confirm>,
    ) -> Result<(), Error> {
        self.send_control(ChannelControl::RegisterConfirmHandler(sink))
            .await
    }

    /// Clears the confirm handler slot.
    pub async fn unregister_confirm_handler(&self) -> Result<(), Error> {
        self.send_control(ChannelControl::UnregisterConfirmHandler)
            .await
    }

    /// Installs the sink receiving `channel.flow` notices.
    pub async fn register_flow_handler(
        &self,
        sink: mpsc::UnboundedSender<FlowNotice>,
    ) -> Result<(), Error> {
        self.send_control(ChannelControl::RegisterFlowHandler(sink))
            .await
    }

    /// Clears the flow handler slot.
    pub async fn unregister_flow_handler(&self) -> Result<(), Error> {
        self.send_control(ChannelControl::UnregisterFlowHandler)
            .await
    }

    /// Forwards a synchronous call into the consumer strategy and returns
    /// its reply.
    pub async fn call_consumer(&self, msg: C::Call) -> Result<C::Reply, Error> {
        let (responder, rx) = oneshot::channel();
        self.send_control(ChannelControl::CallConsumer { msg, responder })
            .await?;
        rx.await.map_err(|_| Error::ChannelStopped)
    }

    /// Waits for the actor to exit and returns its (normalized) shutdown
    /// reason. Subsequent calls return
    /// [`ShutdownReason::InfrastructureDied`].
    pub async fn on_close(&mut self) -> ShutdownReason {
        match self.outcome.take() {
            Some(rx) => rx.await.unwrap_or_else(|_| {
                ShutdownReason::InfrastructureDied("channel engine task stopped".to_string())
            }),
            None => ShutdownReason::InfrastructureDied(
                "shutdown outcome already consumed".to_string(),
            ),
        }
    }
}

pub(crate) fn open_method() -> Method {
    Method::ChannelOpen(ChannelOpen {})
}
