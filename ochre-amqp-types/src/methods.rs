//! The AMQP 0.9.1 method universe
//!
//! Every method the client works with is a variant of [`Method`]. The enum
//! replaces dynamic per-method dispatch with pattern matching; the pure
//! classification surface ([`Method::class`], [`Method::is_synchronous`],
//! [`Method::has_content`]) drives the channel's RPC engine.

use crate::content::FieldTable;
use crate::definitions::{ClassId, DeliveryTag, MethodId, ReplyCode};

/// The class a method belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    /// Connection negotiation and lifecycle, always on channel 0.
    Connection,
    /// Channel lifecycle and flow control.
    Channel,
    /// Exchange management.
    Exchange,
    /// Queue management.
    Queue,
    /// Message transfer.
    Basic,
    /// Publisher confirms extension.
    Confirm,
}

impl Class {
    /// The numeric class id from the specification.
    pub fn id(&self) -> ClassId {
        match self {
            Class::Connection => 10,
            Class::Channel => 20,
            Class::Exchange => 40,
            Class::Queue => 50,
            Class::Basic => 60,
            Class::Confirm => 85,
        }
    }

    /// The class name from the specification.
    pub fn name(&self) -> &'static str {
        match self {
            Class::Connection => "connection",
            Class::Channel => "channel",
            Class::Exchange => "exchange",
            Class::Queue => "queue",
            Class::Basic => "basic",
            Class::Confirm => "confirm",
        }
    }
}

/// `connection.start`
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionStart {
    /// Protocol major version.
    pub version_major: u8,
    /// Protocol minor version.
    pub version_minor: u8,
    /// Server properties table.
    pub server_properties: FieldTable,
    /// Space separated list of security mechanisms.
    pub mechanisms: String,
    /// Space separated list of message locales.
    pub locales: String,
}

/// `connection.close`
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionClose {
    /// Reply code of the condition that triggered the close.
    pub reply_code: ReplyCode,
    /// Human readable reason.
    pub reply_text: String,
    /// Class id of the method that caused the exception, or 0.
    pub class_id: ClassId,
    /// Method id of the method that caused the exception, or 0.
    pub method_id: MethodId,
}

/// `connection.close-ok`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectionCloseOk {}

/// `channel.open`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelOpen {}

/// `channel.open-ok`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelOpenOk {}

/// `channel.flow`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelFlow {
    /// `true` re-enables content emission, `false` pauses it.
    pub active: bool,
}

/// `channel.flow-ok`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelFlowOk {
    /// Echo of the flow state the peer confirmed.
    pub active: bool,
}

/// `channel.close`
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelClose {
    /// Reply code of the condition that triggered the close.
    pub reply_code: ReplyCode,
    /// Human readable reason.
    pub reply_text: String,
    /// Class id of the method that caused the exception, or 0.
    pub class_id: ClassId,
    /// Method id of the method that caused the exception, or 0.
    pub method_id: MethodId,
}

/// `channel.close-ok`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelCloseOk {}

/// `exchange.declare`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExchangeDeclare {
    /// Exchange name.
    pub exchange: String,
    /// Exchange type, e.g. `direct`, `topic`, `fanout`.
    pub kind: String,
    /// Do not create, only assert existence.
    pub passive: bool,
    /// Survive server restarts.
    pub durable: bool,
    /// Delete when no longer used.
    pub auto_delete: bool,
    /// Not directly publishable by clients.
    pub internal: bool,
    /// Do not send a declare-ok reply.
    pub nowait: bool,
    /// Implementation specific arguments.
    pub arguments: FieldTable,
}

/// `exchange.declare-ok`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExchangeDeclareOk {}

/// `queue.declare`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueueDeclare {
    /// Queue name; empty asks the server to generate one.
    pub queue: String,
    /// Do not create, only assert existence.
    pub passive: bool,
    /// Survive server restarts.
    pub durable: bool,
    /// Only accessible by the declaring connection.
    pub exclusive: bool,
    /// Delete when no longer used.
    pub auto_delete: bool,
    /// Do not send a declare-ok reply.
    pub nowait: bool,
    /// Implementation specific arguments.
    pub arguments: FieldTable,
}

/// `queue.declare-ok`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueueDeclareOk {
    /// The (possibly server generated) queue name.
    pub queue: String,
    /// Number of messages in the queue.
    pub message_count: u32,
    /// Number of active consumers.
    pub consumer_count: u32,
}

/// `basic.qos`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BasicQos {
    /// Prefetch window in octets, 0 means no limit.
    pub prefetch_size: u32,
    /// Prefetch window in messages, 0 means no limit.
    pub prefetch_count: u16,
    /// Apply to the whole connection rather than this channel.
    pub global: bool,
}

/// `basic.qos-ok`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BasicQosOk {}

/// `basic.consume`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BasicConsume {
    /// Queue to consume from.
    pub queue: String,
    /// Consumer identity; empty asks the server to generate one.
    pub consumer_tag: String,
    /// Do not deliver messages published on this connection.
    pub no_local: bool,
    /// The server does not expect acknowledgements.
    pub no_ack: bool,
    /// Request exclusive access to the queue.
    pub exclusive: bool,
    /// Do not send a consume-ok reply.
    pub nowait: bool,
    /// Implementation specific arguments.
    pub arguments: FieldTable,
}

/// `basic.consume-ok`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BasicConsumeOk {
    /// The (possibly server generated) consumer tag.
    pub consumer_tag: String,
}

/// `basic.cancel`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BasicCancel {
    /// Consumer to cancel.
    pub consumer_tag: String,
    /// Do not send a cancel-ok reply.
    pub nowait: bool,
}

/// `basic.cancel-ok`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BasicCancelOk {
    /// The cancelled consumer tag.
    pub consumer_tag: String,
}

/// `basic.publish`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BasicPublish {
    /// Exchange to publish to; empty is the default exchange.
    pub exchange: String,
    /// Routing key.
    pub routing_key: String,
    /// Return the message if it cannot be routed to a queue.
    pub mandatory: bool,
    /// Return the message if it cannot be delivered immediately.
    pub immediate: bool,
}

/// `basic.return`
#[derive(Debug, Clone, PartialEq)]
pub struct BasicReturn {
    /// Reply code of the condition that caused the return.
    pub reply_code: ReplyCode,
    /// Human readable reason.
    pub reply_text: String,
    /// Exchange the message was originally published to.
    pub exchange: String,
    /// Routing key the message was originally published with.
    pub routing_key: String,
}

/// `basic.deliver`
#[derive(Debug, Clone, PartialEq)]
pub struct BasicDeliver {
    /// Consumer the delivery is for.
    pub consumer_tag: String,
    /// Server-assigned delivery tag.
    pub delivery_tag: DeliveryTag,
    /// The message may have been delivered before.
    pub redelivered: bool,
    /// Exchange the message was originally published to.
    pub exchange: String,
    /// Routing key the message was originally published with.
    pub routing_key: String,
}

/// `basic.get`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BasicGet {
    /// Queue to fetch from.
    pub queue: String,
    /// The server does not expect an acknowledgement.
    pub no_ack: bool,
}

/// `basic.get-ok`
#[derive(Debug, Clone, PartialEq)]
pub struct BasicGetOk {
    /// Server-assigned delivery tag.
    pub delivery_tag: DeliveryTag,
    /// The message may have been delivered before.
    pub redelivered: bool,
    /// Exchange the message was originally published to.
    pub exchange: String,
    /// Routing key the message was originally published with.
    pub routing_key: String,
    /// Number of messages remaining in the queue.
    pub message_count: u32,
}

/// `basic.get-empty`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BasicGetEmpty {}

/// `basic.ack`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BasicAck {
    /// Delivery being acknowledged.
    pub delivery_tag: DeliveryTag,
    /// Acknowledge all deliveries up to and including `delivery_tag`.
    pub multiple: bool,
}

/// `basic.nack`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BasicNack {
    /// Delivery being rejected.
    pub delivery_tag: DeliveryTag,
    /// Reject all deliveries up to and including `delivery_tag`.
    pub multiple: bool,
    /// Ask the server to requeue rather than discard.
    pub requeue: bool,
}

/// `basic.recover`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BasicRecover {
    /// Requeue unacknowledged deliveries instead of redelivering them to the
    /// original recipient.
    pub requeue: bool,
}

/// `basic.recover-ok`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BasicRecoverOk {}

/// `confirm.select`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfirmSelect {
    /// Do not send a select-ok reply.
    pub nowait: bool,
}

/// `confirm.select-ok`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfirmSelectOk {}

/// A decoded AMQP 0.9.1 method.
#[derive(Debug, Clone, PartialEq)]
pub enum Method {
    /// `connection.start`
    ConnectionStart(ConnectionStart),
    /// `connection.close`
    ConnectionClose(ConnectionClose),
    /// `connection.close-ok`
    ConnectionCloseOk(ConnectionCloseOk),
    /// `channel.open`
    ChannelOpen(ChannelOpen),
    /// `channel.open-ok`
    ChannelOpenOk(ChannelOpenOk),
    /// `channel.flow`
    ChannelFlow(ChannelFlow),
    /// `channel.flow-ok`
    ChannelFlowOk(ChannelFlowOk),
    /// `channel.close`
    ChannelClose(ChannelClose),
    /// `channel.close-ok`
    ChannelCloseOk(ChannelCloseOk),
    /// `exchange.declare`
    ExchangeDeclare(ExchangeDeclare),
    /// `exchange.declare-ok`
    ExchangeDeclareOk(ExchangeDeclareOk),
    /// `queue.declare`
    QueueDeclare(QueueDeclare),
    /// `queue.declare-ok`
    QueueDeclareOk(QueueDeclareOk),
    /// `basic.qos`
    BasicQos(BasicQos),
    /// `basic.qos-ok`
    BasicQosOk(BasicQosOk),
    /// `basic.consume`
    BasicConsume(BasicConsume),
    /// `basic.consume-ok`
    BasicConsumeOk(BasicConsumeOk),
    /// `basic.cancel`
    BasicCancel(BasicCancel),
    /// `basic.cancel-ok`
    BasicCancelOk(BasicCancelOk),
    /// `basic.publish`
    BasicPublish(BasicPublish),
    /// `basic.return`
    BasicReturn(BasicReturn),
    /// `basic.deliver`
    BasicDeliver(BasicDeliver),
    /// `basic.get`
    BasicGet(BasicGet),
    /// `basic.get-ok`
    BasicGetOk(BasicGetOk),
    /// `basic.get-empty`
    BasicGetEmpty(BasicGetEmpty),
    /// `basic.ack`
    BasicAck(BasicAck),
    /// `basic.nack`
    BasicNack(BasicNack),
    /// `basic.recover`
    BasicRecover(BasicRecover),
    /// `basic.recover-ok`
    BasicRecoverOk(BasicRecoverOk),
    /// `confirm.select`
    ConfirmSelect(ConfirmSelect),
    /// `confirm.select-ok`
    ConfirmSelectOk(ConfirmSelectOk),
}

impl Method {
    /// The class the method belongs to.
    pub fn class(&self) -> Class {
        match self {
            Method::ConnectionStart(_)
            | Method::ConnectionClose(_)
            | Method::ConnectionCloseOk(_) => Class::Connection,

            Method::ChannelOpen(_)
            | Method::ChannelOpenOk(_)
            | Method::ChannelFlow(_)
            | Method::ChannelFlowOk(_)
            | Method::ChannelClose(_)
            | Method::ChannelCloseOk(_) => Class::Channel,

            Method::ExchangeDeclare(_) | Method::ExchangeDeclareOk(_) => Class::Exchange,

            Method::QueueDeclare(_) | Method::QueueDeclareOk(_) => Class::Queue,

            Method::BasicQos(_)
            | Method::BasicQosOk(_)
            | Method::BasicConsume(_)
            | Method::BasicConsumeOk(_)
            | Method::BasicCancel(_)
            | Method::BasicCancelOk(_)
            | Method::BasicPublish(_)
            | Method::BasicReturn(_)
            | Method::BasicDeliver(_)
            | Method::BasicGet(_)
            | Method::BasicGetOk(_)
            | Method::BasicGetEmpty(_)
            | Method::BasicAck(_)
            | Method::BasicNack(_)
            | Method::BasicRecover(_)
            | Method::BasicRecoverOk(_) => Class::Basic,

            Method::ConfirmSelect(_) | Method::ConfirmSelectOk(_) => Class::Confirm,
        }
    }

    /// Whether the method is a synchronous request, i.e. the protocol
    /// contract requires a matching reply on the same channel before another
    /// synchronous request can be correlated.
    ///
    /// Reply methods and asynchronous methods return `false`.
    pub fn is_synchronous(&self) -> bool {
        matches!(
            self,
            Method::ConnectionStart(_)
                | Method::ConnectionClose(_)
                | Method::ChannelOpen(_)
                | Method::ChannelFlow(_)
                | Method::ChannelClose(_)
                | Method::ExchangeDeclare(_)
                | Method::QueueDeclare(_)
                | Method::BasicQos(_)
                | Method::BasicConsume(_)
                | Method::BasicCancel(_)
                | Method::BasicGet(_)
                | Method::BasicRecover(_)
                | Method::ConfirmSelect(_)
        )
    }

    /// Whether the method carries content (a properties header and payload).
    pub fn has_content(&self) -> bool {
        matches!(
            self,
            Method::BasicPublish(_)
                | Method::BasicReturn(_)
                | Method::BasicDeliver(_)
                | Method::BasicGetOk(_)
        )
    }

    /// The `(class_id, method_id)` pair from the specification, used when
    /// reporting the offending method in `close` replies.
    pub fn ids(&self) -> (ClassId, MethodId) {
        match self {
            Method::ConnectionStart(_) => (10, 10),
            Method::ConnectionClose(_) => (10, 50),
            Method::ConnectionCloseOk(_) => (10, 51),
            Method::ChannelOpen(_) => (20, 10),
            Method::ChannelOpenOk(_) => (20, 11),
            Method::ChannelFlow(_) => (20, 20),
            Method::ChannelFlowOk(_) => (20, 21),
            Method::ChannelClose(_) => (20, 40),
            Method::ChannelCloseOk(_) => (20, 41),
            Method::ExchangeDeclare(_) => (40, 10),
            Method::ExchangeDeclareOk(_) => (40, 11),
            Method::QueueDeclare(_) => (50, 10),
            Method::QueueDeclareOk(_) => (50, 11),
            Method::BasicQos(_) => (60, 10),
            Method::BasicQosOk(_) => (60, 11),
            Method::BasicConsume(_) => (60, 20),
            Method::BasicConsumeOk(_) => (60, 21),
            Method::BasicCancel(_) => (60, 30),
            Method::BasicCancelOk(_) => (60, 31),
            Method::BasicPublish(_) => (60, 40),
            Method::BasicReturn(_) => (60, 50),
            Method::BasicDeliver(_) => (60, 60),
            Method::BasicGet(_) => (60, 70),
            Method::BasicGetOk(_) => (60, 71),
            Method::BasicGetEmpty(_) => (60, 72),
            Method::BasicAck(_) => (60, 80),
            Method::BasicNack(_) => (60, 120),
            Method::BasicRecover(_) => (60, 110),
            Method::BasicRecoverOk(_) => (60, 111),
            Method::ConfirmSelect(_) => (85, 10),
            Method::ConfirmSelectOk(_) => (85, 11),
        }
    }

    /// The `class.method` name from the specification.
    pub fn name(&self) -> &'static str {
        match self {
            Method::ConnectionStart(_) => "connection.start",
            Method::ConnectionClose(_) => "connection.close",
            Method::ConnectionCloseOk(_) => "connection.close-ok",
            Method::ChannelOpen(_) => "channel.open",
            Method::ChannelOpenOk(_) => "channel.open-ok",
            Method::ChannelFlow(_) => "channel.flow",
            Method::ChannelFlowOk(_) => "channel.flow-ok",
            Method::ChannelClose(_) => "channel.close",
            Method::ChannelCloseOk(_) => "channel.close-ok",
            Method::ExchangeDeclare(_) => "exchange.declare",
            Method::ExchangeDeclareOk(_) => "exchange.declare-ok",
            Method::QueueDeclare(_) => "queue.declare",
            Method::QueueDeclareOk(_) => "queue.declare-ok",
            Method::BasicQos(_) => "basic.qos",
            Method::BasicQosOk(_) => "basic.qos-ok",
            Method::BasicConsume(_) => "basic.consume",
            Method::BasicConsumeOk(_) => "basic.consume-ok",
            Method::BasicCancel(_) => "basic.cancel",
            Method::BasicCancelOk(_) => "basic.cancel-ok",
            Method::BasicPublish(_) => "basic.publish",
            Method::BasicReturn(_) => "basic.return",
            Method::BasicDeliver(_) => "basic.deliver",
            Method::BasicGet(_) => "basic.get",
            Method::BasicGetOk(_) => "basic.get-ok",
            Method::BasicGetEmpty(_) => "basic.get-empty",
            Method::BasicAck(_) => "basic.ack",
            Method::BasicNack(_) => "basic.nack",
            Method::BasicRecover(_) => "basic.recover",
            Method::BasicRecoverOk(_) => "basic.recover-ok",
            Method::ConfirmSelect(_) => "confirm.select",
            Method::ConfirmSelectOk(_) => "confirm.select-ok",
        }
    }
}
