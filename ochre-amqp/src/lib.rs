#![deny(missing_docs, missing_debug_implementations)]

//! Client-side AMQP 0.9.1 channel built on tokio.
//!
//! Each server-side channel is represented by one independent channel actor:
//! a tokio task owning all channel state and driving it from a single inbound
//! event stream. The actor serializes synchronous method exchanges through a
//! FIFO RPC queue (AMQP 0.9.1 has no correlation id; replies are matched to
//! requests positionally), dispatches server-pushed events to a pluggable
//! consumer strategy and to registered handler sinks, and enforces the
//! flow-control and closing-state admission rules on outbound methods.
//!
//! The connection actor, the frame writer and the in-process broker are
//! external collaborators reached only through their interfaces
//! ([`ConnectionControl`], [`transport::Writer`], [`transport::DirectBroker`]).
//!
//! # Opening a channel
//!
//! ```rust,ignore
//! use ochre_amqp::channel::Builder;
//! use ochre_amqp::consumer::SinkConsumer;
//! use ochre_amqp_types::methods::{ExchangeDeclare, Method};
//!
//! let (consumer, _events) = SinkConsumer::new();
//! let (mut channel, feed) = Builder::new(1, consumer)
//!     .network(writer_factory)
//!     .spawn();
//!
//! channel.open().await?;
//! channel
//!     .call(
//!         Method::ExchangeDeclare(ExchangeDeclare {
//!             exchange: "events".into(),
//!             kind: "topic".into(),
//!             ..Default::default()
//!         }),
//!         None,
//!     )
//!     .await?;
//! ```

pub(crate) mod control;
pub(crate) mod util;

pub mod channel;
pub mod consumer;
pub mod handlers;
pub mod transport;

pub(crate) mod rpc;

pub mod types {
    //! Re-exporting `ochre-amqp-types`
    pub use ochre_amqp_types::*;
}

pub use channel::{Builder, ChannelFeed, ChannelHandle, Error, ShutdownReason};
pub use control::ConnectionControl;
pub use rpc::Reply;

/// The body of a content frame.
pub type Payload = bytes::Bytes;
