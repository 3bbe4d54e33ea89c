//! Controls exchanged between the application, the channel actor and the
//! connection actor

use ochre_amqp_types::definitions::{ChannelId, ReplyCode};
use ochre_amqp_types::{Content, Method};
use tokio::sync::{mpsc, oneshot};

use crate::channel::ShutdownReason;
use crate::consumer::ConsumerStrategy;
use crate::handlers::{Confirm, FlowNotice, ReturnedMessage};
use crate::rpc::Responder;

/// Application-originated events drained by the channel actor.
pub(crate) enum ChannelControl<C: ConsumerStrategy> {
    /// Issue `channel.open`. Only the connection-level opener sends this.
    Open { responder: Responder },
    /// Send a method and correlate its reply.
    Call {
        method: Method,
        content: Option<Content>,
        responder: Responder,
    },
    /// Send a method without waiting for any reply.
    Cast {
        method: Method,
        content: Option<Content>,
    },
    /// Initiate the client-side close handshake.
    Close {
        code: ReplyCode,
        text: String,
        responder: Responder,
    },
    /// Query the sequence number the next `basic.publish` will take.
    NextPublishSeqno { responder: oneshot::Sender<u64> },
    RegisterReturnHandler(mpsc::UnboundedSender<ReturnedMessage>),
    UnregisterReturnHandler,
    RegisterConfirmHandler(mpsc::UnboundedSender<Confirm>),
    UnregisterConfirmHandler,
    RegisterFlowHandler(mpsc::UnboundedSender<FlowNotice>),
    UnregisterFlowHandler,
    /// Forward a synchronous call into the consumer strategy.
    CallConsumer {
        msg: C::Call,
        responder: oneshot::Sender<C::Reply>,
    },
}

/// Requests the channel actor sends up to the connection actor.
#[derive(Debug)]
pub enum ConnectionControl {
    /// The channel's event loop has stopped; the connection releases the
    /// channel number and reacts to the reason (hard closes in particular).
    DeallocateChannel {
        /// The stopped channel.
        number: ChannelId,
        /// Why the channel stopped.
        reason: ShutdownReason,
    },
}
