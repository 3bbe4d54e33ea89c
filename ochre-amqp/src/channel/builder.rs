//! Channel builder
//!
//! The connection actor creates one builder per channel it allocates, picks
//! the transport mode, and spawns the engine. The returned
//! [`ChannelHandle`] goes to the application; the [`ChannelFeed`] stays with
//! the connection, which posts every server-sourced event through it.

use std::fmt;
use std::sync::Arc;

use ochre_amqp_types::definitions::ChannelId;
use tokio::sync::mpsc;

use crate::consumer::ConsumerStrategy;
use crate::control::ConnectionControl;
use crate::handlers::HandlerSlot;
use crate::rpc::RpcQueue;
use crate::transport::{DirectBroker, Transport, Writer, WriterFactory};

use super::engine::ChannelEngine;
use super::{Channel, ChannelFeed, ChannelHandle, ClosingState, DEFAULT_CONTROL_BUFFER_SIZE};

enum Mode {
    /// No transport picked yet; sends fail until one is.
    Unset,
    /// Frames go to a writer created lazily when `channel.open` is issued.
    Network(WriterFactory),
    /// Methods go straight to the in-process broker.
    Direct(Arc<dyn DirectBroker>),
}

/// Builder for a channel actor.
pub struct Builder<C: ConsumerStrategy> {
    number: ChannelId,
    consumer: C,
    mode: Mode,
    conn_control: Option<mpsc::Sender<ConnectionControl>>,
    control_buffer_size: usize,
}

impl<C: ConsumerStrategy> fmt::Debug for Builder<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("number", &self.number)
            .field("control_buffer_size", &self.control_buffer_size)
            .finish()
    }
}

impl<C: ConsumerStrategy> Builder<C> {
    /// Creates a builder for the given channel number and consumer strategy.
    pub fn new(number: ChannelId, consumer: C) -> Self {
        Self {
            number,
            consumer,
            mode: Mode::Unset,
            conn_control: None,
            control_buffer_size: DEFAULT_CONTROL_BUFFER_SIZE,
        }
    }

    /// Uses the network transport. The factory runs exactly once, at the
    /// moment the channel issues `channel.open`; the writer it creates lives
    /// and dies with the channel.
    pub fn network(mut self, factory: impl FnOnce() -> Writer + Send + 'static) -> Self {
        self.mode = Mode::Network(Box::new(factory));
        self
    }

    /// Uses the in-process broker bypass; the transport is bound from the
    /// start and no writer is created.
    pub fn direct(mut self, broker: Arc<dyn DirectBroker>) -> Self {
        self.mode = Mode::Direct(broker);
        self
    }

    /// Where the channel reports its termination. Without one, the
    /// deallocation notice is dropped.
    pub fn conn_control(mut self, tx: mpsc::Sender<ConnectionControl>) -> Self {
        self.conn_control = Some(tx);
        self
    }

    /// Buffer size of the application control queue.
    pub fn control_buffer_size(mut self, size: usize) -> Self {
        self.control_buffer_size = size;
        self
    }

    /// Spawns the channel engine.
    pub fn spawn(self) -> (ChannelHandle<C>, ChannelFeed) {
        let (control_tx, control_rx) = mpsc::channel(self.control_buffer_size);
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        let conn_control = self.conn_control.unwrap_or_else(|| {
            // Nobody listening; termination notices go nowhere.
            let (tx, _rx) = mpsc::channel(1);
            tx
        });

        let (transport, writer_factory) = match self.mode {
            Mode::Unset => (Transport::Unbound, None),
            Mode::Network(factory) => (Transport::Unbound, Some(factory)),
            Mode::Direct(broker) => (Transport::Direct(broker), None),
        };

        let channel = Channel {
            number: self.number,
            transport,
            writer_factory,
            rpc_queue: RpcQueue::new(),
            closing: ClosingState::Open,
            return_handler: HandlerSlot::new("return"),
            confirm_handler: HandlerSlot::new("confirm"),
            flow_handler: HandlerSlot::new("flow"),
            next_pub_seqno: 0,
            flow_active: true,
            consumer: self.consumer,
        };

        let engine = ChannelEngine::new(
            channel,
            control_rx,
            incoming_rx,
            incoming_tx.clone(),
            control_tx.clone(),
            conn_control,
        );
        let (_task, outcome) = engine.spawn();

        let handle = ChannelHandle {
            number: self.number,
            control: control_tx,
            outcome: Some(outcome),
        };
        let feed = ChannelFeed { tx: incoming_tx };
        (handle, feed)
    }
}
