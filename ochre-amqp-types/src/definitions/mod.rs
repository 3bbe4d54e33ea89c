//! Protocol constants and definitions

mod exception;

pub use exception::{AmqpException, ProtocolException};

/// AMQP reply code carried by `close` and `return` methods.
pub type ReplyCode = u16;

/// Identifier of a method class (`connection` = 10, `channel` = 20, ...).
pub type ClassId = u16;

/// Identifier of a method within its class.
pub type MethodId = u16;

/// Channel number a frame is addressed to. Channel 0 is reserved for
/// connection class methods.
pub type ChannelId = u16;

/// Server-assigned tag identifying a delivery on a channel.
pub type DeliveryTag = u64;

/// Reply code indicating successful completion of a method.
pub const REPLY_SUCCESS: ReplyCode = 200;
