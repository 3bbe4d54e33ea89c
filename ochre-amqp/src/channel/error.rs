//! Error and shutdown-reason types for channel operations

use ochre_amqp_types::definitions::{ReplyCode, REPLY_SUCCESS};
use ochre_amqp_types::AmqpException;

/// Errors reported synchronously to application callers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// `channel.open` is issued by the connection-level opener when the
    /// channel is created, never through `call`/`cast`.
    #[error("channel.open is issued by the connection-level opener")]
    OpenForbidden,

    /// `channel.close` must go through the dedicated close operation so the
    /// closing state machine is engaged.
    #[error("channel.close must go through ChannelHandle::close")]
    CloseForbidden,

    /// Connection class methods belong to the connection actor.
    #[error("connection class methods are handled by the connection")]
    ConnectionClassForbidden,

    /// The method carries content and the server has paused the channel via
    /// `channel.flow`.
    #[error("channel is blocked by flow control")]
    Blocked,

    /// The channel is closing; no new outbound method is admitted.
    #[error("channel is closing")]
    Closing,

    /// The channel actor has stopped; its shutdown reason carries the cause.
    #[error("channel event loop has stopped")]
    ChannelStopped,
}

/// The structured reason a channel actor exits with, observable through
/// [`ChannelHandle::on_close`](crate::channel::ChannelHandle::on_close) and
/// the connection's deallocation notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Clean exit: local close completed, or a normalized graceful reason.
    Normal,

    /// The server closed the channel with `channel.close`.
    ServerInitiatedClose {
        /// Reply code from the server.
        code: ReplyCode,
        /// Reply text from the server.
        text: String,
    },

    /// A hard protocol error forced the connection closed.
    ServerInitiatedHardClose {
        /// Reply code of the hard error.
        code: ReplyCode,
        /// Explanation of the hard error.
        text: String,
    },

    /// The connection is closing and took the channel down with it.
    ConnectionClosing(Box<ShutdownReason>),

    /// The server sent a method that is invalid on this channel.
    ServerMisbehaved(AmqpException),

    /// The transport or another collaborator died for a non-protocol reason.
    InfrastructureDied(String),

    /// The RPC queue did not drain within the closing budget.
    TimedOutFlushingChannel,

    /// `channel.close-ok` did not arrive within the closing budget.
    TimedOutWaitingCloseOk,
}

impl ShutdownReason {
    /// Whether the reason normalizes to a clean exit.
    ///
    /// Only close-reply shaped reasons with the success code and a
    /// connection closing for a normal reason count; a hard close that
    /// happens to carry code 200 does not.
    pub fn is_normal(&self) -> bool {
        match self {
            ShutdownReason::Normal => true,
            ShutdownReason::ServerInitiatedClose { code, .. } => *code == REPLY_SUCCESS,
            ShutdownReason::ConnectionClosing(inner) => {
                matches!(**inner, ShutdownReason::Normal)
            }
            _ => false,
        }
    }

    /// Collapses graceful reasons to [`ShutdownReason::Normal`]; every other
    /// reason propagates verbatim so supervisors observe the cause.
    pub(crate) fn normalize(self) -> Self {
        if self.is_normal() {
            ShutdownReason::Normal
        } else {
            self
        }
    }
}
