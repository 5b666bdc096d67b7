//! # Live Stream Flows
//!
//! Producer → mediator → subscribers, across `shared-bus` and
//! `bn-01-live-stream`:
//!
//! 1. Fan-out: every subscriber registered beforehand sees every batch once,
//!    in publish order
//! 2. Pacing: a stalled subscriber does not hold back the others until the
//!    ring is a full lap ahead of it
//! 3. Live consumers: join at a block boundary, leave when the producer
//!    goes quiet

#[cfg(test)]
mod tests {
    use super::super::wait_until;
    use block_node_telemetry::BlockNodeMetrics;
    use bn_01_live_stream::{
        BatchEvent, BlockBoundarySender, ChannelResponseSender, ConsumerConfig,
        LiveStreamMediator, LivenessCheckedHandler,
    };
    use parking_lot::{Condvar, Mutex};
    use shared_bus::test_utils::{ManualClock, RecordingHandler};
    use shared_bus::{
        BlockNodeEventHandler, HandlerError, MediatorConfig, Publisher, SubscriptionHandler,
    };
    use shared_types::{BlockHeader, BlockItem, BlockItemBatch, ServiceStatus};
    use std::sync::Arc;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(10);

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    fn mediator(ring_buffer_size: usize) -> (Arc<LiveStreamMediator>, BlockNodeMetrics) {
        let metrics = BlockNodeMetrics::new().unwrap();
        let mediator = LiveStreamMediator::new(
            MediatorConfig::new(ring_buffer_size).unwrap(),
            Arc::new(ServiceStatus::new()),
            metrics.channel(),
        );
        (Arc::new(mediator), metrics)
    }

    fn header_batch(number: u64) -> BatchEvent {
        Arc::new(BlockItemBatch::new(vec![
            BlockItem::BlockHeader(BlockHeader::new(number)),
            BlockItem::EventHeader(number.to_be_bytes().to_vec()),
        ]))
    }

    fn body_batch(tag: u8) -> BatchEvent {
        Arc::new(BlockItemBatch::new(vec![BlockItem::StateChanges(vec![tag])]))
    }

    /// Blocks inside `on_event` until opened.
    #[derive(Default)]
    struct GatedHandler {
        open: Mutex<bool>,
        opened: Condvar,
        seen: Mutex<Vec<u64>>,
    }

    impl GatedHandler {
        fn open(&self) {
            *self.open.lock() = true;
            self.opened.notify_all();
        }
    }

    impl BlockNodeEventHandler<BatchEvent> for GatedHandler {
        fn on_event(&self, _: &BatchEvent, sequence: u64, _: bool) -> Result<(), HandlerError> {
            let mut open = self.open.lock();
            while !*open {
                self.opened.wait(&mut open);
            }
            self.seen.lock().push(sequence);
            Ok(())
        }
    }

    // =========================================================================
    // FAN-OUT
    // =========================================================================

    #[test]
    fn test_three_subscribers_receive_three_batches_in_order() {
        let (mediator, metrics) = mediator(8);
        let subscribers: Vec<_> = (0..3)
            .map(|_| Arc::new(RecordingHandler::<BatchEvent>::new()))
            .collect();
        for subscriber in &subscribers {
            mediator.subscribe(subscriber.clone()).unwrap();
        }

        let batches = vec![header_batch(1), body_batch(1), body_batch(2)];
        for batch in &batches {
            mediator.publish(batch.clone()).unwrap();
        }

        for subscriber in &subscribers {
            assert!(subscriber.wait_for(3, WAIT));
            assert_eq!(subscriber.events(), batches);
            let sequences: Vec<u64> = subscriber.deliveries().iter().map(|d| d.sequence).collect();
            assert_eq!(sequences, vec![0, 1, 2]);
        }
        assert_eq!(metrics.channel().subscribers.get(), 3);
        assert_eq!(metrics.channel().items_ingested.get(), 4);
    }

    #[test]
    fn test_double_subscribe_delivers_once() {
        let (mediator, metrics) = mediator(8);
        let subscriber = Arc::new(RecordingHandler::<BatchEvent>::new());
        mediator.subscribe(subscriber.clone()).unwrap();
        mediator.subscribe(subscriber.clone()).unwrap();

        mediator.publish(header_batch(1)).unwrap();
        mediator.publish(body_batch(1)).unwrap();

        assert!(subscriber.wait_for(2, WAIT));
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(subscriber.len(), 2);
        assert_eq!(metrics.channel().subscribers.get(), 1);
    }

    #[test]
    fn test_failing_subscriber_is_isolated() {
        let (mediator, _) = mediator(8);
        let failing = Arc::new(RecordingHandler::<BatchEvent>::new().failing_at(1));
        let healthy = Arc::new(RecordingHandler::<BatchEvent>::new());
        mediator.subscribe(failing.clone()).unwrap();
        mediator.subscribe(healthy.clone()).unwrap();

        for tag in 0..4 {
            mediator.publish(body_batch(tag)).unwrap();
        }

        assert!(healthy.wait_for(4, WAIT));
        assert!(wait_until(|| !mediator.is_subscribed(failing.as_ref())));
        assert!(mediator.status().is_accepting());
    }

    // =========================================================================
    // PACING
    // =========================================================================

    #[test]
    fn test_stalled_subscriber_does_not_hold_back_others_within_a_lap() {
        let (mediator, _) = mediator(4);
        let stalled = Arc::new(GatedHandler::default());
        let fast = Arc::new(RecordingHandler::<BatchEvent>::new());
        mediator.subscribe(stalled.clone()).unwrap();
        mediator.subscribe(fast.clone()).unwrap();

        for tag in 0..4 {
            mediator.publish(body_batch(tag)).unwrap();
        }
        assert!(fast.wait_for(4, WAIT));
        assert!(stalled.seen.lock().is_empty());
        assert_eq!(mediator.remaining_capacity(), 0);

        stalled.open();
        assert!(wait_until(|| stalled.seen.lock().len() == 4));
        assert_eq!(*stalled.seen.lock(), vec![0, 1, 2, 3]);
        assert!(wait_until(|| mediator.remaining_capacity() == 4));
    }

    #[test]
    fn test_publisher_waits_for_slowest_subscriber() {
        let (mediator, _) = mediator(2);
        let stalled = Arc::new(GatedHandler::default());
        mediator.subscribe(stalled.clone()).unwrap();

        mediator.publish(body_batch(0)).unwrap();
        mediator.publish(body_batch(1)).unwrap();

        let producer = {
            let mediator = mediator.clone();
            std::thread::spawn(move || mediator.publish(body_batch(2)))
        };
        std::thread::sleep(Duration::from_millis(50));
        assert!(!producer.is_finished());

        stalled.open();
        producer.join().unwrap().unwrap();
        assert!(wait_until(|| stalled.seen.lock().len() == 3));
    }

    // =========================================================================
    // LIVE CONSUMERS
    // =========================================================================

    #[test]
    fn test_live_consumer_joins_at_block_boundary() {
        let (mediator, _) = mediator(16);
        let subscriptions: Arc<dyn SubscriptionHandler<BatchEvent>> = mediator.clone();
        let (sender, mut receiver) = ChannelResponseSender::channel(16);
        let consumer = LivenessCheckedHandler::subscribe_to(
            &subscriptions,
            BlockBoundarySender::new(sender),
            Arc::new(shared_types::SystemClock::new()),
            ConsumerConfig::default(),
        )
        .unwrap();

        let mid_block = body_batch(7);
        let opening = header_batch(2);
        let body = body_batch(8);
        for batch in [mid_block, opening.clone(), body.clone()] {
            mediator.publish(batch).unwrap();
        }

        assert!(wait_until(|| consumer.sender().is_started()));
        let mut received = Vec::new();
        assert!(wait_until(|| {
            while let Ok(batch) = receiver.try_recv() {
                received.push(batch);
            }
            received.len() == 2
        }));
        assert_eq!(received, vec![opening, body]);
    }

    #[test]
    fn test_quiet_producer_evicts_live_consumer() {
        let (mediator, _) = mediator(16);
        let subscriptions: Arc<dyn SubscriptionHandler<BatchEvent>> = mediator.clone();
        let clock = Arc::new(ManualClock::new(0));
        let (sender, mut receiver) = ChannelResponseSender::channel(16);
        let consumer = LivenessCheckedHandler::subscribe_to(
            &subscriptions,
            sender,
            clock.clone(),
            ConsumerConfig::new(50).unwrap(),
        )
        .unwrap();

        mediator.publish(header_batch(1)).unwrap();
        assert!(wait_until(|| receiver.try_recv().is_ok()));

        clock.advance(51);
        mediator.publish(body_batch(1)).unwrap();

        assert!(!mediator.is_subscribed(consumer.as_ref()));
        assert_eq!(mediator.subscriber_count(), 0);
    }
}
