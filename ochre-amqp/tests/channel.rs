//! Round-trip tests driving the channel actor against a scripted peer: the
//! test plays both the application (through the handle) and the connection
//! actor (through the feed and the writer queue).

use std::sync::{Arc, Mutex};
use std::time::Duration;

use ochre_amqp::channel::{Builder, ChannelFeed, ChannelHandle, CloseType, ExitSignal};
use ochre_amqp::consumer::{ConsumerMessage, SinkConsumer};
use ochre_amqp::handlers::Confirm;
use ochre_amqp::transport::{DirectBroker, WriteRequest, Writer};
use ochre_amqp::{Error, Reply, ShutdownReason};
use ochre_amqp_types::definitions::ChannelId;
use ochre_amqp_types::methods::{
    BasicAck, BasicCancel, BasicConsume, BasicConsumeOk, BasicDeliver, BasicPublish, BasicQos,
    BasicQosOk, ChannelClose, ChannelCloseOk, ChannelFlow, ChannelOpen, ChannelOpenOk,
    ConfirmSelect, ConfirmSelectOk, ConnectionClose, ConnectionCloseOk, ExchangeDeclare,
    ExchangeDeclareOk, QueueDeclare, QueueDeclareOk,
};
use ochre_amqp_types::{AmqpException, Content, Method, ProtocolException};
use tokio::sync::mpsc;
use tokio::time::timeout;

type Wire = mpsc::UnboundedReceiver<WriteRequest>;

fn spawn_network_channel() -> (
    ChannelHandle<SinkConsumer>,
    ChannelFeed,
    Wire,
    mpsc::UnboundedReceiver<ConsumerMessage>,
) {
    let (consumer, events) = SinkConsumer::new();
    let (wire_tx, wire_rx) = mpsc::unbounded_channel();
    let writer = Writer::new(wire_tx);
    let (handle, feed) = Builder::new(1, consumer).network(move || writer).spawn();
    (handle, feed, wire_rx, events)
}

async fn expect_frame(wire: &mut Wire) -> WriteRequest {
    timeout(Duration::from_secs(5), wire.recv())
        .await
        .expect("timed out waiting for a frame")
        .expect("writer queue closed")
}

async fn open(handle: &ChannelHandle<SinkConsumer>, feed: &ChannelFeed, wire: &mut Wire) {
    let (result, ()) = tokio::join!(handle.open(), async {
        let frame = expect_frame(wire).await;
        assert_eq!(frame.method.name(), "channel.open");
        feed.method(Method::ChannelOpenOk(ChannelOpenOk {}), None)
            .unwrap();
    });
    result.expect("open failed");
}

fn publish() -> Method {
    Method::BasicPublish(BasicPublish {
        routing_key: "key".into(),
        ..Default::default()
    })
}

fn deliver(tag: u64) -> Method {
    Method::BasicDeliver(BasicDeliver {
        consumer_tag: "amq.ctag-1".into(),
        delivery_tag: tag,
        redelivered: false,
        exchange: String::new(),
        routing_key: "key".into(),
    })
}

#[tokio::test]
async fn open_handshake_completes() {
    let (handle, feed, mut wire, _events) = spawn_network_channel();

    let (result, ()) = tokio::join!(handle.open(), async {
        let frame = expect_frame(&mut wire).await;
        assert_eq!(frame.channel, 1);
        assert_eq!(frame.method, Method::ChannelOpen(ChannelOpen {}));
        assert!(frame.content.is_none());
        feed.method(Method::ChannelOpenOk(ChannelOpenOk {}), None)
            .unwrap();
    });
    result.unwrap();
}

#[tokio::test]
async fn publisher_confirms_track_seqno_and_reach_handler() {
    let (handle, feed, mut wire, _events) = spawn_network_channel();
    open(&handle, &feed, &mut wire).await;

    let (confirm_tx, mut confirms) = mpsc::unbounded_channel();
    handle.register_confirm_handler(confirm_tx).await.unwrap();

    // Confirms disabled: the counter stays at zero through publishes.
    assert_eq!(handle.next_publish_seqno().await.unwrap(), 0);

    let (reply, ()) = tokio::join!(
        handle.call(Method::ConfirmSelect(ConfirmSelect::default()), None),
        async {
            let frame = expect_frame(&mut wire).await;
            assert_eq!(frame.method.name(), "confirm.select");
            feed.method(Method::ConfirmSelectOk(ConfirmSelectOk {}), None)
                .unwrap();
        }
    );
    assert_eq!(
        reply.unwrap(),
        Reply::Method {
            method: Method::ConfirmSelectOk(ConfirmSelectOk {}),
            content: None,
        }
    );
    assert_eq!(handle.next_publish_seqno().await.unwrap(), 1);

    for body in ["m1", "m2", "m3"] {
        handle
            .cast(publish(), Some(Content::new(body.as_bytes().to_vec())))
            .await
            .unwrap();
    }
    assert_eq!(handle.next_publish_seqno().await.unwrap(), 4);

    for body in ["m1", "m2", "m3"] {
        let frame = expect_frame(&mut wire).await;
        assert_eq!(frame.method.name(), "basic.publish");
        assert_eq!(&frame.content.unwrap().payload[..], body.as_bytes());
    }

    let ack = BasicAck {
        delivery_tag: 2,
        multiple: true,
    };
    feed.method(Method::BasicAck(ack), None).unwrap();
    let confirm = timeout(Duration::from_secs(5), confirms.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(confirm, Confirm::Ack(ack));
}

#[tokio::test]
async fn flow_throttle_blocks_content_methods_only() {
    let (handle, feed, mut wire, _events) = spawn_network_channel();
    open(&handle, &feed, &mut wire).await;

    let (flow_tx, mut flow_notices) = mpsc::unbounded_channel();
    handle.register_flow_handler(flow_tx).await.unwrap();
    // Roundtrip so the registration is in effect before the server event.
    let _ = handle.next_publish_seqno().await.unwrap();

    feed.method(Method::ChannelFlow(ChannelFlow { active: false }), None)
        .unwrap();

    // The actor acks with flow-ok and the handler sees the notice.
    let frame = expect_frame(&mut wire).await;
    assert_eq!(frame.method.name(), "channel.flow-ok");
    let notice = timeout(Duration::from_secs(5), flow_notices.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(!notice.active);

    // Content-bearing methods bounce, everything else still goes through.
    let blocked = handle
        .call(publish(), Some(Content::new(b"m".to_vec())))
        .await;
    assert_eq!(blocked, Err(Error::Blocked));

    let (reply, ()) = tokio::join!(
        handle.call(Method::BasicQos(BasicQos::default()), None),
        async {
            let frame = expect_frame(&mut wire).await;
            assert_eq!(frame.method.name(), "basic.qos");
            feed.method(Method::BasicQosOk(BasicQosOk {}), None).unwrap();
        }
    );
    assert_eq!(
        reply.unwrap(),
        Reply::Method {
            method: Method::BasicQosOk(BasicQosOk {}),
            content: None,
        }
    );

    feed.method(Method::ChannelFlow(ChannelFlow { active: true }), None)
        .unwrap();
    let frame = expect_frame(&mut wire).await;
    assert_eq!(frame.method.name(), "channel.flow-ok");

    handle
        .cast(publish(), Some(Content::new(b"m".to_vec())))
        .await
        .unwrap();
    let frame = expect_frame(&mut wire).await;
    assert_eq!(frame.method.name(), "basic.publish");
}

#[tokio::test]
async fn server_initiated_close_answers_and_fails_pending_rpc() {
    let (mut handle, feed, mut wire, _events) = spawn_network_channel();
    open(&handle, &feed, &mut wire).await;

    let declare = handle.call(
        Method::ExchangeDeclare(ExchangeDeclare {
            exchange: "missing".into(),
            kind: "topic".into(),
            passive: true,
            ..Default::default()
        }),
        None,
    );
    let script = async {
        let frame = expect_frame(&mut wire).await;
        assert_eq!(frame.method.name(), "exchange.declare");
        feed.method(
            Method::ChannelClose(ChannelClose {
                reply_code: 404,
                reply_text: "NOT_FOUND".into(),
                class_id: 40,
                method_id: 10,
            }),
            None,
        )
        .unwrap();
        let frame = expect_frame(&mut wire).await;
        assert_eq!(frame.method, Method::ChannelCloseOk(ChannelCloseOk {}));
    };
    let (declare_result, ()) = tokio::join!(declare, script);

    // The pending caller never sees a normal reply.
    assert_eq!(declare_result, Err(Error::ChannelStopped));
    assert_eq!(
        handle.on_close().await,
        ShutdownReason::ServerInitiatedClose {
            code: 404,
            text: "NOT_FOUND".into(),
        }
    );
}

#[tokio::test]
async fn local_close_discards_late_deliveries() {
    let (mut handle, feed, mut wire, mut events) = spawn_network_channel();
    open(&handle, &feed, &mut wire).await;

    let close = handle.close(200, "Goodbye");
    let script = async {
        let frame = expect_frame(&mut wire).await;
        match &frame.method {
            Method::ChannelClose(close) => {
                assert_eq!(close.reply_code, 200);
                assert_eq!(close.reply_text, "Goodbye");
            }
            other => panic!("expected channel.close, got {}", other.name()),
        }
        // A delivery racing the close handshake is silently discarded.
        feed.method(deliver(1), Some(Content::new(b"late".to_vec())))
            .unwrap();
        feed.method(Method::ChannelCloseOk(ChannelCloseOk {}), None)
            .unwrap();
    };
    let (close_result, ()) = tokio::join!(close, script);

    close_result.unwrap();
    assert_eq!(handle.on_close().await, ShutdownReason::Normal);
    assert!(events.try_recv().is_err(), "consumer saw a late delivery");
}

#[tokio::test]
async fn connection_closing_flush_drains_rpc_queue() {
    let (mut handle, feed, mut wire, _events) = spawn_network_channel();
    open(&handle, &feed, &mut wire).await;

    let declare = handle.call(
        Method::ExchangeDeclare(ExchangeDeclare {
            exchange: "events".into(),
            kind: "topic".into(),
            ..Default::default()
        }),
        None,
    );
    let queue_declare = handle.call(
        Method::QueueDeclare(QueueDeclare {
            queue: "inbox".into(),
            ..Default::default()
        }),
        None,
    );
    let qos = handle.call(Method::BasicQos(BasicQos::default()), None);

    let script = async {
        let frame = expect_frame(&mut wire).await;
        assert_eq!(frame.method.name(), "exchange.declare");

        feed.connection_closing(CloseType::Flush, ShutdownReason::Normal)
            .unwrap();

        feed.method(Method::ExchangeDeclareOk(ExchangeDeclareOk {}), None)
            .unwrap();
        let frame = expect_frame(&mut wire).await;
        assert_eq!(frame.method.name(), "queue.declare");
        feed.method(
            Method::QueueDeclareOk(QueueDeclareOk {
                queue: "inbox".into(),
                message_count: 0,
                consumer_count: 0,
            }),
            None,
        )
        .unwrap();
        let frame = expect_frame(&mut wire).await;
        assert_eq!(frame.method.name(), "basic.qos");
        feed.method(Method::BasicQosOk(BasicQosOk {}), None).unwrap();
    };

    let (declare_result, queue_result, qos_result, ()) =
        tokio::join!(declare, queue_declare, qos, script);

    // Every already-queued request drains to completion.
    assert!(matches!(declare_result, Ok(Reply::Method { .. })));
    assert!(matches!(queue_result, Ok(Reply::Method { .. })));
    assert!(matches!(qos_result, Ok(Reply::Method { .. })));

    // {connection_closing, normal} normalizes to a clean exit.
    assert_eq!(handle.on_close().await, ShutdownReason::Normal);
}

#[tokio::test(start_paused = true)]
async fn connection_closing_flush_times_out() {
    let (mut handle, feed, mut wire, _events) = spawn_network_channel();
    open(&handle, &feed, &mut wire).await;

    let declare = handle.call(
        Method::ExchangeDeclare(ExchangeDeclare::default()),
        None,
    );
    let script = async {
        let frame = expect_frame(&mut wire).await;
        assert_eq!(frame.method.name(), "exchange.declare");

        feed.connection_closing(CloseType::Flush, ShutdownReason::Normal)
            .unwrap();
        // Barrier: acked once everything before it has been drained, so the
        // closing state is in effect.
        feed.send_command_sync(
            Method::BasicCancel(BasicCancel {
                consumer_tag: "amq.ctag-1".into(),
                nowait: true,
            }),
            None,
        )
        .await
        .unwrap();

        // New work is refused while the queue flushes.
        let refused = handle.call(Method::BasicQos(BasicQos::default()), None).await;
        assert_eq!(refused, Err(Error::Closing));

        // The reply never comes; the flush budget expires.
    };
    let (declare_result, ()) = tokio::join!(declare, script);

    assert_eq!(declare_result, Err(Error::ChannelStopped));
    assert_eq!(
        handle.on_close().await,
        ShutdownReason::TimedOutFlushingChannel
    );
}

#[tokio::test]
async fn application_misuse_is_rejected_without_state_change() {
    let (handle, _feed, mut wire, _events) = spawn_network_channel();

    assert_eq!(
        handle.call(Method::ChannelOpen(ChannelOpen {}), None).await,
        Err(Error::OpenForbidden)
    );
    assert_eq!(
        handle
            .call(
                Method::ChannelClose(ChannelClose {
                    reply_code: 200,
                    reply_text: String::new(),
                    class_id: 0,
                    method_id: 0,
                }),
                None,
            )
            .await,
        Err(Error::CloseForbidden)
    );
    assert_eq!(
        handle
            .call(
                Method::ConnectionClose(ConnectionClose {
                    reply_code: 200,
                    reply_text: String::new(),
                    class_id: 0,
                    method_id: 0,
                }),
                None,
            )
            .await,
        Err(Error::ConnectionClassForbidden)
    );

    // Casts of the same methods are dropped with a warning.
    handle.cast(Method::ChannelOpen(ChannelOpen {}), None).await.unwrap();

    // Nothing reached the transport and no state moved.
    assert_eq!(handle.next_publish_seqno().await.unwrap(), 0);
    assert!(wire.try_recv().is_err());
}

#[tokio::test]
async fn mixed_sync_and_async_methods_preserve_submission_order() {
    let (handle, feed, mut wire, _events) = spawn_network_channel();
    open(&handle, &feed, &mut wire).await;

    let declare = handle.call(
        Method::ExchangeDeclare(ExchangeDeclare {
            exchange: "events".into(),
            kind: "fanout".into(),
            ..Default::default()
        }),
        None,
    );
    let script = async {
        let frame = expect_frame(&mut wire).await;
        assert_eq!(frame.method.name(), "exchange.declare");

        handle
            .cast(publish(), Some(Content::new(b"m1".to_vec())))
            .await
            .unwrap();
        handle
            .cast(publish(), Some(Content::new(b"m2".to_vec())))
            .await
            .unwrap();

        // Control roundtrip: both casts are queued behind the in-flight
        // declare, nothing further on the wire yet.
        let _ = handle.next_publish_seqno().await.unwrap();
        assert!(wire.try_recv().is_err());

        feed.method(Method::ExchangeDeclareOk(ExchangeDeclareOk {}), None)
            .unwrap();

        let (qos_result, ()) = tokio::join!(
            handle.call(Method::BasicQos(BasicQos::default()), None),
            async {
                for expected in ["m1", "m2"] {
                    let frame = expect_frame(&mut wire).await;
                    assert_eq!(frame.method.name(), "basic.publish");
                    assert_eq!(&frame.content.unwrap().payload[..], expected.as_bytes());
                }
                let frame = expect_frame(&mut wire).await;
                assert_eq!(frame.method.name(), "basic.qos");
                feed.method(Method::BasicQosOk(BasicQosOk {}), None).unwrap();
            }
        );
        assert!(matches!(qos_result, Ok(Reply::Method { .. })));
    };
    let (declare_result, ()) = tokio::join!(declare, script);
    assert!(matches!(declare_result, Ok(Reply::Method { .. })));
}

#[tokio::test]
async fn consume_handshake_and_server_pushes_reach_strategy() {
    let (handle, feed, mut wire, mut events) = spawn_network_channel();
    open(&handle, &feed, &mut wire).await;

    let consume = Method::BasicConsume(BasicConsume {
        queue: "inbox".into(),
        ..Default::default()
    });
    let (reply, ()) = tokio::join!(handle.call(consume, None), async {
        let frame = expect_frame(&mut wire).await;
        assert_eq!(frame.method.name(), "basic.consume");
        feed.method(
            Method::BasicConsumeOk(BasicConsumeOk {
                consumer_tag: "amq.ctag-1".into(),
            }),
            None,
        )
        .unwrap();
    });
    assert_eq!(
        reply.unwrap(),
        Reply::Method {
            method: Method::BasicConsumeOk(BasicConsumeOk {
                consumer_tag: "amq.ctag-1".into(),
            }),
            content: None,
        }
    );
    match timeout(Duration::from_secs(5), events.recv()).await.unwrap() {
        Some(ConsumerMessage::ConsumeOk { consume_ok, consume }) => {
            assert_eq!(consume_ok.consumer_tag, "amq.ctag-1");
            assert_eq!(consume.queue, "inbox");
        }
        other => panic!("unexpected consumer event: {other:?}"),
    }

    feed.method(deliver(1), Some(Content::new(b"payload".to_vec())))
        .unwrap();
    match timeout(Duration::from_secs(5), events.recv()).await.unwrap() {
        Some(ConsumerMessage::Deliver { deliver, content }) => {
            assert_eq!(deliver.delivery_tag, 1);
            assert_eq!(&content.payload[..], b"payload");
        }
        other => panic!("unexpected consumer event: {other:?}"),
    }

    // Server-pushed cancel has no waiter to answer.
    feed.method(
        Method::BasicCancel(BasicCancel {
            consumer_tag: "amq.ctag-1".into(),
            nowait: true,
        }),
        None,
    )
    .unwrap();
    match timeout(Duration::from_secs(5), events.recv()).await.unwrap() {
        Some(ConsumerMessage::Cancel(cancel)) => {
            assert_eq!(cancel.consumer_tag, "amq.ctag-1");
        }
        other => panic!("unexpected consumer event: {other:?}"),
    }
}

#[tokio::test]
async fn return_handler_registration_is_last_write_wins() {
    let (handle, feed, mut wire, _events) = spawn_network_channel();
    open(&handle, &feed, &mut wire).await;

    let (first_tx, mut first_rx) = mpsc::unbounded_channel();
    let (second_tx, mut second_rx) = mpsc::unbounded_channel();
    handle.register_return_handler(first_tx).await.unwrap();
    handle.register_return_handler(second_tx).await.unwrap();
    // Roundtrip so the registrations are in effect before the server event.
    let _ = handle.next_publish_seqno().await.unwrap();

    let ret = Method::BasicReturn(ochre_amqp_types::methods::BasicReturn {
        reply_code: 312,
        reply_text: "NO_ROUTE".into(),
        exchange: "events".into(),
        routing_key: "nowhere".into(),
    });
    feed.method(ret, Some(Content::new(b"unrouted".to_vec())))
        .unwrap();

    let returned = timeout(Duration::from_secs(5), second_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(returned.ret.reply_text, "NO_ROUTE");
    assert_eq!(&returned.content.payload[..], b"unrouted");
    assert!(first_rx.try_recv().is_err());

    // Unregistered: the next return is logged and dropped.
    handle.unregister_return_handler().await.unwrap();
    let _ = handle.next_publish_seqno().await.unwrap();
    feed.method(
        Method::BasicReturn(ochre_amqp_types::methods::BasicReturn {
            reply_code: 312,
            reply_text: "NO_ROUTE".into(),
            exchange: "events".into(),
            routing_key: "nowhere".into(),
        }),
        Some(Content::default()),
    )
    .unwrap();
    feed.send_command_sync(
        Method::BasicCancel(BasicCancel {
            consumer_tag: "amq.ctag-1".into(),
            nowait: true,
        }),
        None,
    )
    .await
    .unwrap();
    assert!(second_rx.try_recv().is_err());
}

#[tokio::test]
async fn connection_class_method_on_channel_is_misbehavior() {
    let (mut handle, feed, _wire, _events) = spawn_network_channel();

    feed.method(Method::ConnectionCloseOk(ConnectionCloseOk {}), None)
        .unwrap();

    match handle.on_close().await {
        ShutdownReason::ServerMisbehaved(exception) => {
            assert_eq!(exception.exception, ProtocolException::CommandInvalid);
        }
        other => panic!("unexpected shutdown reason: {other:?}"),
    }
}

#[tokio::test]
async fn hard_exit_signal_closes_the_connection() {
    let (mut handle, feed, _wire, _events) = spawn_network_channel();

    feed.channel_exit(
        1,
        ExitSignal::Amqp(AmqpException::new(
            ProtocolException::FrameError,
            "bad frame",
        )),
    )
    .unwrap();

    assert_eq!(
        handle.on_close().await,
        ShutdownReason::ConnectionClosing(Box::new(ShutdownReason::ServerInitiatedHardClose {
            code: 501,
            text: "bad frame".into(),
        }))
    );
}

#[tokio::test]
async fn soft_exit_signal_runs_the_close_handshake() {
    let (mut handle, feed, mut wire, _events) = spawn_network_channel();
    open(&handle, &feed, &mut wire).await;

    feed.channel_exit(
        1,
        ExitSignal::Amqp(AmqpException::new(
            ProtocolException::NotFound,
            "no exchange 'missing' in vhost '/'",
        )),
    )
    .unwrap();

    // The actor closes itself, carrying the mapped exception.
    let frame = expect_frame(&mut wire).await;
    match &frame.method {
        Method::ChannelClose(close) => {
            assert_eq!(close.reply_code, 404);
            assert_eq!(close.reply_text, "no exchange 'missing' in vhost '/'");
        }
        other => panic!("expected channel.close, got {}", other.name()),
    }
    feed.method(Method::ChannelCloseOk(ChannelCloseOk {}), None)
        .unwrap();

    assert_eq!(handle.on_close().await, ShutdownReason::Normal);
}

#[tokio::test]
async fn infrastructure_failure_propagates() {
    let (mut handle, feed, _wire, _events) = spawn_network_channel();

    feed.channel_exit(1, ExitSignal::Other("writer crashed".into()))
        .unwrap();

    assert_eq!(
        handle.on_close().await,
        ShutdownReason::InfrastructureDied("writer crashed".into())
    );
}

#[derive(Debug, Default)]
struct RecordingBroker {
    seen: Mutex<Vec<String>>,
}

impl DirectBroker for RecordingBroker {
    fn deliver(
        &self,
        _channel: ChannelId,
        method: Method,
        _content: Option<Content>,
    ) -> Result<(), AmqpException> {
        self.seen.lock().unwrap().push(method.name().to_string());
        Ok(())
    }
}

#[tokio::test]
async fn direct_transport_and_broker_push_paths() {
    let broker = Arc::new(RecordingBroker::default());
    let (consumer, mut events) = SinkConsumer::new();
    let (handle, feed) = Builder::new(7, consumer).direct(broker.clone()).spawn();

    let (result, ()) = tokio::join!(handle.open(), async {
        feed.method(Method::ChannelOpenOk(ChannelOpenOk {}), None)
            .unwrap();
    });
    result.unwrap();
    assert_eq!(broker.seen.lock().unwrap().as_slice(), ["channel.open"]);

    // Broker pushing at the channel, acked on acceptance.
    feed.send_command_sync(
        Method::BasicCancel(BasicCancel {
            consumer_tag: "amq.ctag-d".into(),
            nowait: true,
        }),
        None,
    )
    .await
    .unwrap();
    match timeout(Duration::from_secs(5), events.recv()).await.unwrap() {
        Some(ConsumerMessage::Cancel(cancel)) => {
            assert_eq!(cancel.consumer_tag, "amq.ctag-d");
        }
        other => panic!("unexpected consumer event: {other:?}"),
    }

    // Producer is notified once the delivery has been dispatched.
    let notified = feed
        .send_command_and_notify(deliver(3), Some(Content::new(b"direct".to_vec())))
        .unwrap();
    notified.await.unwrap();
    match events.try_recv() {
        Ok(ConsumerMessage::Deliver { deliver, content }) => {
            assert_eq!(deliver.delivery_tag, 3);
            assert_eq!(&content.payload[..], b"direct");
        }
        other => panic!("unexpected consumer event: {other:?}"),
    }
}

#[tokio::test]
async fn call_consumer_swaps_the_delivery_sink() {
    let (handle, feed, mut wire, _old_events) = spawn_network_channel();
    open(&handle, &feed, &mut wire).await;

    let (new_tx, mut new_events) = mpsc::unbounded_channel();
    handle.call_consumer(new_tx).await.unwrap();

    feed.method(deliver(9), Some(Content::new(b"rerouted".to_vec())))
        .unwrap();
    match timeout(Duration::from_secs(5), new_events.recv())
        .await
        .unwrap()
    {
        Some(ConsumerMessage::Deliver { deliver, .. }) => {
            assert_eq!(deliver.delivery_tag, 9);
        }
        other => panic!("unexpected consumer event: {other:?}"),
    }
}
