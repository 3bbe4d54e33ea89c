#![deny(missing_docs, missing_debug_implementations)]

//! Data types for the AMQP 0.9.1 protocol.
//!
//! This crate defines the method universe shared by the client crates: the
//! [`Method`](methods::Method) sum type with one variant per protocol method,
//! the pure classification surface (class, synchronous flag, content flag),
//! the protocol constants and the channel/connection exception table, and the
//! content model attached to content-bearing methods.
//!
//! Framing and wire encoding are intentionally not part of this crate; the
//! types here describe methods as already-decoded values.

pub mod content;
pub mod definitions;
pub mod methods;

pub use content::{BasicProperties, Content, FieldTable, FieldValue};
pub use definitions::{AmqpException, ProtocolException, ReplyCode};
pub use methods::{Class, Method};

/// The body of a content frame.
pub type Payload = bytes::Bytes;
