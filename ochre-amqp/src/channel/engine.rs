//! The channel event loop
//!
//! All state transitions happen here, in response to events drained from the
//! control and inbound queues in arrival order. The engine is the only
//! writer to every [`Channel`] field.

use ochre_amqp_types::definitions::ReplyCode;
use ochre_amqp_types::methods::{ChannelClose, ChannelCloseOk, ChannelFlowOk, Method};
use ochre_amqp_types::{AmqpException, Class, Content, ProtocolException};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, instrument, trace, warn};

use crate::consumer::ConsumerStrategy;
use crate::control::{ChannelControl, ConnectionControl};
use crate::handlers::{Confirm, ReturnedMessage};
use crate::rpc::{PendingRpc, Reply, Responder};
use crate::util::Running;

use super::error::{Error, ShutdownReason};
use super::frame::{CloseType, ExitSignal, Incoming};
use super::{
    open_method, Channel, ClosingState, CLOSE_OK_TIMEOUT, FLUSH_TIMEOUT,
};

/// A one-shot deadline armed for the closing handshake. Expiration is fatal.
#[derive(Debug)]
struct CloseTimer {
    deadline: Instant,
    reason: ShutdownReason,
}

pub(crate) struct ChannelEngine<C: ConsumerStrategy> {
    pub channel: Channel<C>,
    pub control: mpsc::Receiver<ChannelControl<C>>,
    pub incoming: mpsc::UnboundedReceiver<Incoming>,
    /// Sender half of `incoming`, kept so shutdown events can be posted
    /// behind whatever the mailbox already holds.
    pub feed: mpsc::UnboundedSender<Incoming>,
    /// Sender half of `control`, used by the asynchronous close a soft
    /// server error triggers.
    pub self_control: mpsc::Sender<ChannelControl<C>>,
    pub conn_control: mpsc::Sender<ConnectionControl>,
    close_timer: Option<CloseTimer>,
}

impl<C: ConsumerStrategy> ChannelEngine<C> {
    pub(crate) fn new(
        channel: Channel<C>,
        control: mpsc::Receiver<ChannelControl<C>>,
        incoming: mpsc::UnboundedReceiver<Incoming>,
        feed: mpsc::UnboundedSender<Incoming>,
        self_control: mpsc::Sender<ChannelControl<C>>,
        conn_control: mpsc::Sender<ConnectionControl>,
    ) -> Self {
        Self {
            channel,
            control,
            incoming,
            feed,
            self_control,
            conn_control,
            close_timer: None,
        }
    }

    pub fn spawn(self) -> (JoinHandle<()>, oneshot::Receiver<ShutdownReason>) {
        let (tx, rx) = oneshot::channel();
        let handle = tokio::spawn(self.event_loop(tx));
        (handle, rx)
    }

    #[inline]
    fn on_control(&mut self, control: ChannelControl<C>) -> Running {
        trace!(channel = self.channel.number, control = control.name());
        match control {
            ChannelControl::Open { responder } => self.handle_open(responder),
            ChannelControl::Call {
                method,
                content,
                responder,
            } => self.handle_call(method, content, responder),
            ChannelControl::Cast { method, content } => self.handle_cast(method, content),
            ChannelControl::Close {
                code,
                text,
                responder,
            } => self.handle_close(code, text, responder),
            ChannelControl::NextPublishSeqno { responder } => {
                let _ = responder.send(self.channel.next_pub_seqno);
                Running::Continue
            }
            ChannelControl::RegisterReturnHandler(sink) => {
                self.channel.return_handler.register(sink);
                Running::Continue
            }
            ChannelControl::UnregisterReturnHandler => {
                self.channel.return_handler.unregister();
                Running::Continue
            }
            ChannelControl::RegisterConfirmHandler(sink) => {
                self.channel.confirm_handler.register(sink);
                Running::Continue
            }
            ChannelControl::UnregisterConfirmHandler => {
                self.channel.confirm_handler.unregister();
                Running::Continue
            }
            ChannelControl::RegisterFlowHandler(sink) => {
                self.channel.flow_handler.register(sink);
                Running::Continue
            }
            ChannelControl::UnregisterFlowHandler => {
                self.channel.flow_handler.unregister();
                Running::Continue
            }
            ChannelControl::CallConsumer { msg, responder } => {
                let reply = self.channel.consumer.handle_call(msg);
                let _ = responder.send(reply);
                Running::Continue
            }
        }
    }

    /// The dedicated connection-level opener; skips the misuse validation
    /// that rejects `channel.open` from `call`/`cast`.
    fn handle_open(&mut self, responder: Responder) -> Running {
        let method = open_method();
        if let Err(err) = self.channel.admit(&method) {
            let _ = responder.send(Err(err));
            return Running::Continue;
        }
        self.enqueue_rpc(Some(responder), method, None)
    }

    fn handle_call(
        &mut self,
        method: Method,
        content: Option<Content>,
        responder: Responder,
    ) -> Running {
        if let Err(err) = self
            .channel
            .validate_outbound(&method)
            .and_then(|()| self.channel.admit(&method))
        {
            let _ = responder.send(Err(err));
            return Running::Continue;
        }
        self.channel.update_confirm_tracking(&method);
        self.enqueue_rpc(Some(responder), method, content)
    }

    fn handle_cast(&mut self, method: Method, content: Option<Content>) -> Running {
        if let Err(err) = self
            .channel
            .validate_outbound(&method)
            .and_then(|()| self.channel.admit(&method))
        {
            warn!(
                channel = self.channel.number,
                method = method.name(),
                %err,
                "dropping cast method"
            );
            return Running::Continue;
        }
        self.channel.update_confirm_tracking(&method);
        self.enqueue_rpc(None, method, content)
    }

    fn handle_close(&mut self, code: ReplyCode, text: String, responder: Responder) -> Running {
        if self.channel.closing != ClosingState::Open {
            let _ = responder.send(Err(Error::Closing));
            return Running::Continue;
        }
        let method = Method::ChannelClose(ChannelClose {
            reply_code: code,
            reply_text: text,
            class_id: 0,
            method_id: 0,
        });
        self.enqueue_rpc(Some(responder), method, None)
    }

    /// Appends an admitted request; starts driving if the queue was idle.
    fn enqueue_rpc(
        &mut self,
        responder: Option<Responder>,
        method: Method,
        content: Option<Content>,
    ) -> Running {
        let was_idle = self.channel.rpc_queue.enqueue(PendingRpc {
            responder,
            method,
            content,
        });
        if was_idle {
            self.drive_rpc();
        }
        Running::Continue
    }

    /// Hands queued requests to the transport until a synchronous one is in
    /// flight or the queue empties. Asynchronous requests are acknowledged
    /// and popped as they go out.
    fn drive_rpc(&mut self) {
        while let Some(head) = self.channel.rpc_queue.head() {
            let method = head.method.clone();
            let content = head.content.clone();

            match &method {
                Method::ChannelOpen(_) => self.channel.bind_writer(),
                Method::ChannelClose(_) => self.channel.begin_close(),
                _ => {}
            }

            if let Err(err) =
                self.channel
                    .transport
                    .send(self.channel.number, method.clone(), content)
            {
                // Leave the in-flight request unanswered; the failure is
                // expected to arrive as a channel_exit event.
                error!(
                    channel = self.channel.number,
                    method = method.name(),
                    %err,
                    "transport send failed"
                );
                break;
            }

            if method.is_synchronous() {
                break;
            }

            if let Some(rpc) = self.channel.rpc_queue.pop() {
                if let Some(responder) = rpc.responder {
                    let _ = responder.send(Ok(Reply::Ok));
                }
            }
        }

        if self.channel.rpc_queue.is_empty() {
            if let ClosingState::Connection(reason) = &self.channel.closing {
                // Queued after whatever the mailbox already holds, so
                // already-received events are still dispatched first.
                let reason = ShutdownReason::ConnectionClosing(Box::new(reason.clone()));
                let _ = self.feed.send(Incoming::Shutdown { reason });
            }
        }
    }

    /// Completes the request in flight with a server reply and resumes
    /// driving the queue.
    fn rpc_bottom_half(&mut self, reply: Reply) -> Running {
        match self.channel.rpc_queue.pop() {
            Some(rpc) => {
                if let Some(responder) = rpc.responder {
                    let _ = responder.send(Ok(reply));
                }
                self.drive_rpc();
                Running::Continue
            }
            None => self.server_misbehaved(AmqpException::new(
                ProtocolException::UnexpectedFrame,
                "synchronous reply with no pending request",
            )),
        }
    }

    #[inline]
    fn on_incoming(&mut self, incoming: Incoming) -> Running {
        match incoming {
            Incoming::Method { method, content } => self.on_method(method, content),
            Incoming::ConnectionClosing { close_type, reason } => {
                self.on_connection_closing(close_type, reason)
            }
            Incoming::Shutdown { reason } => Running::Stop(reason),
            Incoming::ChannelExit { channel: _, reason } => self.on_channel_exit(reason),
            Incoming::SendCommand { method, content } => self.on_method(method, content),
            Incoming::SendCommandSync {
                method,
                content,
                acked,
            } => {
                let _ = acked.send(());
                self.on_method(method, content)
            }
            Incoming::SendCommandAndNotify {
                method,
                content,
                notify,
            } => {
                let running = self.on_method(method, content);
                let _ = notify.send(());
                running
            }
        }
    }

    fn on_method(&mut self, method: Method, content: Option<Content>) -> Running {
        if method.class() == Class::Connection {
            // Connection class methods belong on channel 0.
            return self.server_misbehaved(AmqpException::new(
                ProtocolException::CommandInvalid,
                format!(
                    "{} delivered on channel {}",
                    method.name(),
                    self.channel.number
                ),
            ));
        }

        if self.channel.drops_while_closing(&method) {
            trace!(
                channel = self.channel.number,
                method = method.name(),
                "discarding late method, channel is closing"
            );
            return Running::Continue;
        }

        match method {
            Method::ChannelOpenOk(_) => self.rpc_bottom_half(Reply::Ok),

            Method::ChannelClose(close) => {
                if let Err(err) = self.channel.transport.send(
                    self.channel.number,
                    Method::ChannelCloseOk(ChannelCloseOk {}),
                    None,
                ) {
                    warn!(channel = self.channel.number, %err, "failed to answer channel.close");
                }
                Running::Stop(ShutdownReason::ServerInitiatedClose {
                    code: close.reply_code,
                    text: close.reply_text,
                })
            }

            Method::ChannelCloseOk(_) => match self.channel.rpc_queue.pop() {
                Some(rpc) => {
                    if let Some(responder) = rpc.responder {
                        let _ = responder.send(Ok(Reply::Ok));
                    }
                    Running::Stop(ShutdownReason::Normal)
                }
                None => self.server_misbehaved(AmqpException::new(
                    ProtocolException::UnexpectedFrame,
                    "channel.close-ok with no pending request",
                )),
            },

            Method::BasicConsumeOk(consume_ok) => match self.channel.rpc_queue.pop() {
                Some(PendingRpc {
                    responder,
                    method: Method::BasicConsume(consume),
                    ..
                }) => {
                    self.channel
                        .consumer
                        .handle_consume_ok(consume_ok.clone(), consume);
                    if let Some(responder) = responder {
                        let _ = responder.send(Ok(Reply::Method {
                            method: Method::BasicConsumeOk(consume_ok),
                            content: None,
                        }));
                    }
                    self.drive_rpc();
                    Running::Continue
                }
                _ => self.server_misbehaved(AmqpException::new(
                    ProtocolException::UnexpectedFrame,
                    "basic.consume-ok does not answer the pending request",
                )),
            },

            Method::BasicCancelOk(cancel_ok) => match self.channel.rpc_queue.pop() {
                Some(PendingRpc {
                    responder,
                    method: Method::BasicCancel(cancel),
                    ..
                }) => {
                    self.channel
                        .consumer
                        .handle_cancel_ok(cancel_ok.clone(), cancel);
                    if let Some(responder) = responder {
                        let _ = responder.send(Ok(Reply::Method {
                            method: Method::BasicCancelOk(cancel_ok),
                            content: None,
                        }));
                    }
                    self.drive_rpc();
                    Running::Continue
                }
                _ => self.server_misbehaved(AmqpException::new(
                    ProtocolException::UnexpectedFrame,
                    "basic.cancel-ok does not answer the pending request",
                )),
            },

            Method::BasicCancel(cancel) => {
                // Server-pushed cancel; nobody is waiting on a reply.
                self.channel.consumer.handle_cancel(cancel);
                Running::Continue
            }

            Method::BasicDeliver(deliver) => match content {
                Some(content) => {
                    self.channel.consumer.handle_deliver(deliver, content);
                    Running::Continue
                }
                None => self.server_misbehaved(AmqpException::new(
                    ProtocolException::UnexpectedFrame,
                    "basic.deliver without content",
                )),
            },

            Method::BasicReturn(ret) => match content {
                Some(content) => {
                    self.channel
                        .return_handler
                        .forward(ReturnedMessage { ret, content });
                    Running::Continue
                }
                None => self.server_misbehaved(AmqpException::new(
                    ProtocolException::UnexpectedFrame,
                    "basic.return without content",
                )),
            },

            Method::BasicAck(ack) => {
                self.channel.confirm_handler.forward(Confirm::Ack(ack));
                Running::Continue
            }

            Method::BasicNack(nack) => {
                self.channel.confirm_handler.forward(Confirm::Nack(nack));
                Running::Continue
            }

            Method::ChannelFlow(flow) => {
                self.channel.flow_handler.forward(flow);
                self.channel.flow_active = flow.active;
                // The ack is a regular queue entry so it serializes behind
                // any methods already in flight; the queue drains before the
                // server sees the ack.
                self.enqueue_rpc(
                    None,
                    Method::ChannelFlowOk(ChannelFlowOk {
                        active: flow.active,
                    }),
                    None,
                )
            }

            // Everything else is the in-order reply to the request at the
            // head of the queue.
            method => self.rpc_bottom_half(Reply::Method { method, content }),
        }
    }

    fn on_connection_closing(
        &mut self,
        close_type: CloseType,
        reason: ShutdownReason,
    ) -> Running {
        let prev = std::mem::replace(
            &mut self.channel.closing,
            ClosingState::Connection(reason.clone()),
        );
        match (close_type, prev, self.channel.rpc_queue.is_empty()) {
            (CloseType::Flush, ClosingState::Open, false) => {
                self.arm_close_timer(FLUSH_TIMEOUT, ShutdownReason::TimedOutFlushingChannel);
                Running::Continue
            }
            (CloseType::Flush, ClosingState::JustChannel, false) => {
                self.arm_close_timer(CLOSE_OK_TIMEOUT, ShutdownReason::TimedOutWaitingCloseOk);
                Running::Continue
            }
            _ => Running::Stop(ShutdownReason::ConnectionClosing(Box::new(reason))),
        }
    }

    fn on_channel_exit(&mut self, reason: ExitSignal) -> Running {
        match reason {
            ExitSignal::Amqp(exception) if exception.is_hard() => {
                error!(
                    channel = self.channel.number,
                    %exception,
                    "server sent a hard error, the connection must close"
                );
                let code = exception.code();
                Running::Stop(ShutdownReason::ConnectionClosing(Box::new(
                    ShutdownReason::ServerInitiatedHardClose {
                        code,
                        text: exception.explanation,
                    },
                )))
            }
            ExitSignal::Amqp(exception) => {
                error!(
                    channel = self.channel.number,
                    %exception,
                    "server sent a soft error, closing the channel"
                );
                self.spawn_local_close(exception.code(), exception.explanation);
                Running::Continue
            }
            ExitSignal::Other(reason) => Running::Stop(ShutdownReason::InfrastructureDied(reason)),
        }
    }

    fn server_misbehaved(&mut self, exception: AmqpException) -> Running {
        error!(channel = self.channel.number, %exception, "server misbehaved");
        if exception.is_hard() {
            Running::Stop(ShutdownReason::ServerMisbehaved(exception))
        } else {
            let code = exception.code();
            self.spawn_local_close(code, exception.explanation);
            Running::Continue
        }
    }

    /// Performs the closing handshake for a server-originated error. Going
    /// through the control queue instead of calling the close path inline
    /// keeps the event order intact.
    fn spawn_local_close(&self, code: ReplyCode, text: String) {
        let control = self.self_control.clone();
        tokio::spawn(async move {
            let (responder, _rx) = oneshot::channel();
            let _ = control
                .send(ChannelControl::Close {
                    code,
                    text,
                    responder,
                })
                .await;
        });
    }

    fn arm_close_timer(&mut self, timeout: std::time::Duration, reason: ShutdownReason) {
        self.close_timer = Some(CloseTimer {
            deadline: Instant::now() + timeout,
            reason,
        });
    }

    fn on_close_timeout(&mut self) -> Running {
        match self.close_timer.take() {
            Some(timer) => {
                error!(channel = self.channel.number, reason = ?timer.reason, "closing handshake timed out");
                Running::Stop(timer.reason)
            }
            None => Running::Continue,
        }
    }

    #[instrument(name = "Channel::event_loop", skip_all, fields(channel = %self.channel.number))]
    async fn event_loop(mut self, tx: oneshot::Sender<ShutdownReason>) {
        let reason = loop {
            let deadline = self.close_timer.as_ref().map(|timer| timer.deadline);
            let running = tokio::select! {
                _ = sleep_until(deadline.unwrap_or_else(|| Instant::now() + FLUSH_TIMEOUT)),
                    if deadline.is_some() => self.on_close_timeout(),
                control = self.control.recv() => {
                    match control {
                        Some(control) => self.on_control(control),
                        // The engine keeps a sender for the asynchronous
                        // close path, so the queue cannot close under it.
                        None => Running::Continue,
                    }
                },
                incoming = self.incoming.recv() => {
                    match incoming {
                        Some(incoming) => self.on_incoming(incoming),
                        // Same: the engine keeps the feed sender.
                        None => Running::Continue,
                    }
                },
            };

            match running {
                Running::Continue => {}
                Running::Stop(reason) => break reason,
            }
        };

        // Clean shutdown: refuse further events, then let the queues drop.
        self.control.close();
        self.incoming.close();

        let reason = reason.normalize();
        self.channel.consumer.terminate(&reason);
        let _ = self
            .conn_control
            .send(ConnectionControl::DeallocateChannel {
                number: self.channel.number,
                reason: reason.clone(),
            })
            .await;

        debug!("Stopped");
        let _ = tx.send(reason);
    }
}

impl<C: ConsumerStrategy> ChannelControl<C> {
    fn name(&self) -> &'static str {
        match self {
            ChannelControl::Open { .. } => "open",
            ChannelControl::Call { .. } => "call",
            ChannelControl::Cast { .. } => "cast",
            ChannelControl::Close { .. } => "close",
            ChannelControl::NextPublishSeqno { .. } => "next_publish_seqno",
            ChannelControl::RegisterReturnHandler(_) => "register_return_handler",
            ChannelControl::UnregisterReturnHandler => "unregister_return_handler",
            ChannelControl::RegisterConfirmHandler(_) => "register_confirm_handler",
            ChannelControl::UnregisterConfirmHandler => "unregister_confirm_handler",
            ChannelControl::RegisterFlowHandler(_) => "register_flow_handler",
            ChannelControl::UnregisterFlowHandler => "unregister_flow_handler",
            ChannelControl::CallConsumer { .. } => "call_consumer",
        }
    }
}
