use std::fmt::{self, Debug, Display};

use super::ReplyCode;

/// Protocol exceptions defined by the 0.9.1 specification.
///
/// Soft exceptions close the channel they occurred on; hard exceptions
/// mandate closing the whole connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolException {
    /// The client attempted to transfer content larger than the server could
    /// accept.
    ContentTooLarge,

    /// An immediate message could not be delivered to any consumer.
    NoConsumers,

    /// The client attempted to work with a server entity to which it has no
    /// access due to security settings.
    AccessRefused,

    /// The client attempted to work with a server entity that does not exist.
    NotFound,

    /// The client attempted to work with a server entity to which it has no
    /// access because another client is working with it.
    ResourceLocked,

    /// The client requested a method that was not allowed because some
    /// precondition failed.
    PreconditionFailed,

    /// An operator intervened to close the connection.
    ConnectionForced,

    /// The client tried to work with an unknown virtual host.
    InvalidPath,

    /// The sender sent a malformed frame.
    FrameError,

    /// The sender sent a frame that contained illegal values for one or more
    /// fields.
    SyntaxError,

    /// The client sent an invalid sequence of frames, attempting to perform
    /// an operation that was considered invalid.
    CommandInvalid,

    /// The client attempted to work with a channel that had not been
    /// correctly opened.
    ChannelError,

    /// The peer sent a frame that was not expected, usually in the context of
    /// a content header and body.
    UnexpectedFrame,

    /// The server could not complete the method because it lacked sufficient
    /// resources.
    ResourceError,

    /// The client tried to work with some entity in a manner that is
    /// prohibited by the server, due to security settings or by some other
    /// criteria.
    NotAllowed,

    /// The client tried to use functionality that is not implemented in the
    /// server.
    NotImplemented,

    /// The server could not complete the method because of an internal error.
    InternalError,
}

impl ProtocolException {
    /// The reply code assigned to the exception by the specification.
    pub fn code(&self) -> ReplyCode {
        match self {
            ProtocolException::ContentTooLarge => 311,
            ProtocolException::NoConsumers => 313,
            ProtocolException::ConnectionForced => 320,
            ProtocolException::InvalidPath => 402,
            ProtocolException::AccessRefused => 403,
            ProtocolException::NotFound => 404,
            ProtocolException::ResourceLocked => 405,
            ProtocolException::PreconditionFailed => 406,
            ProtocolException::FrameError => 501,
            ProtocolException::SyntaxError => 502,
            ProtocolException::CommandInvalid => 503,
            ProtocolException::ChannelError => 504,
            ProtocolException::UnexpectedFrame => 505,
            ProtocolException::ResourceError => 506,
            ProtocolException::NotAllowed => 530,
            ProtocolException::NotImplemented => 540,
            ProtocolException::InternalError => 541,
        }
    }

    /// Whether the exception mandates closing the connection rather than just
    /// the channel.
    pub fn is_hard(&self) -> bool {
        match self {
            ProtocolException::ContentTooLarge
            | ProtocolException::NoConsumers
            | ProtocolException::AccessRefused
            | ProtocolException::NotFound
            | ProtocolException::ResourceLocked
            | ProtocolException::PreconditionFailed => false,

            ProtocolException::ConnectionForced
            | ProtocolException::InvalidPath
            | ProtocolException::FrameError
            | ProtocolException::SyntaxError
            | ProtocolException::CommandInvalid
            | ProtocolException::ChannelError
            | ProtocolException::UnexpectedFrame
            | ProtocolException::ResourceError
            | ProtocolException::NotAllowed
            | ProtocolException::NotImplemented
            | ProtocolException::InternalError => true,
        }
    }

    /// The constant name used by the specification.
    pub fn name(&self) -> &'static str {
        match self {
            ProtocolException::ContentTooLarge => "CONTENT_TOO_LARGE",
            ProtocolException::NoConsumers => "NO_CONSUMERS",
            ProtocolException::ConnectionForced => "CONNECTION_FORCED",
            ProtocolException::InvalidPath => "INVALID_PATH",
            ProtocolException::AccessRefused => "ACCESS_REFUSED",
            ProtocolException::NotFound => "NOT_FOUND",
            ProtocolException::ResourceLocked => "RESOURCE_LOCKED",
            ProtocolException::PreconditionFailed => "PRECONDITION_FAILED",
            ProtocolException::FrameError => "FRAME_ERROR",
            ProtocolException::SyntaxError => "SYNTAX_ERROR",
            ProtocolException::CommandInvalid => "COMMAND_INVALID",
            ProtocolException::ChannelError => "CHANNEL_ERROR",
            ProtocolException::UnexpectedFrame => "UNEXPECTED_FRAME",
            ProtocolException::ResourceError => "RESOURCE_ERROR",
            ProtocolException::NotAllowed => "NOT_ALLOWED",
            ProtocolException::NotImplemented => "NOT_IMPLEMENTED",
            ProtocolException::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl Display for ProtocolException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::error::Error for ProtocolException {}

impl TryFrom<ReplyCode> for ProtocolException {
    type Error = ReplyCode;

    fn try_from(code: ReplyCode) -> Result<Self, ReplyCode> {
        let exception = match code {
            311 => ProtocolException::ContentTooLarge,
            313 => ProtocolException::NoConsumers,
            320 => ProtocolException::ConnectionForced,
            402 => ProtocolException::InvalidPath,
            403 => ProtocolException::AccessRefused,
            404 => ProtocolException::NotFound,
            405 => ProtocolException::ResourceLocked,
            406 => ProtocolException::PreconditionFailed,
            501 => ProtocolException::FrameError,
            502 => ProtocolException::SyntaxError,
            503 => ProtocolException::CommandInvalid,
            504 => ProtocolException::ChannelError,
            505 => ProtocolException::UnexpectedFrame,
            506 => ProtocolException::ResourceError,
            530 => ProtocolException::NotAllowed,
            540 => ProtocolException::NotImplemented,
            541 => ProtocolException::InternalError,
            _ => return Err(code),
        };
        Ok(exception)
    }
}

/// A protocol exception together with the explanation the peer attached to
/// it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{exception}: {explanation}")]
pub struct AmqpException {
    /// The exception from the specification table.
    pub exception: ProtocolException,
    /// Human readable explanation reported alongside the reply code.
    pub explanation: String,
}

impl AmqpException {
    /// Creates an exception with an explanation.
    pub fn new(exception: ProtocolException, explanation: impl Into<String>) -> Self {
        Self {
            exception,
            explanation: explanation.into(),
        }
    }

    /// The reply code of the underlying exception.
    pub fn code(&self) -> ReplyCode {
        self.exception.code()
    }

    /// Whether the underlying exception is a hard error.
    pub fn is_hard(&self) -> bool {
        self.exception.is_hard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_round_trips_through_try_from() {
        for exception in [
            ProtocolException::ContentTooLarge,
            ProtocolException::NoConsumers,
            ProtocolException::ConnectionForced,
            ProtocolException::InvalidPath,
            ProtocolException::AccessRefused,
            ProtocolException::NotFound,
            ProtocolException::ResourceLocked,
            ProtocolException::PreconditionFailed,
            ProtocolException::FrameError,
            ProtocolException::SyntaxError,
            ProtocolException::CommandInvalid,
            ProtocolException::ChannelError,
            ProtocolException::UnexpectedFrame,
            ProtocolException::ResourceError,
            ProtocolException::NotAllowed,
            ProtocolException::NotImplemented,
            ProtocolException::InternalError,
        ] {
            assert_eq!(ProtocolException::try_from(exception.code()), Ok(exception));
        }
    }

    #[test]
    fn channel_exceptions_are_soft() {
        assert!(!ProtocolException::NotFound.is_hard());
        assert!(!ProtocolException::PreconditionFailed.is_hard());
        assert!(!ProtocolException::AccessRefused.is_hard());
    }

    #[test]
    fn connection_exceptions_are_hard() {
        assert!(ProtocolException::FrameError.is_hard());
        assert!(ProtocolException::CommandInvalid.is_hard());
        assert!(ProtocolException::InternalError.is_hard());
    }

    #[test]
    fn unknown_code_is_rejected() {
        assert_eq!(ProtocolException::try_from(999), Err(999));
    }
}
