//! # Live Consumer
//!
//! A live consumer is a generic liveness-checked wrapper around a
//! kind-specific [`ResponseSender`]. On every event it checks producer
//! liveness: if the gap since the previous event exceeds the configured
//! threshold the consumer unsubscribes itself instead of forwarding,
//! otherwise it refreshes the window and forwards.

use crate::domain::config::ConsumerConfig;
use crate::ports::outbound::ResponseSender;
use crate::BatchEvent;
use shared_bus::{BlockNodeEventHandler, HandlerError, LivenessCalculator, SubscriptionHandler};
use shared_types::Clock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

pub struct LivenessCheckedHandler<S> {
    sender: S,
    liveness: LivenessCalculator,
    permitted: AtomicBool,
    subscriptions: Weak<dyn SubscriptionHandler<BatchEvent>>,
}

impl<S: ResponseSender + 'static> LivenessCheckedHandler<S> {
    pub fn new(
        sender: S,
        clock: Arc<dyn Clock>,
        config: ConsumerConfig,
        subscriptions: Weak<dyn SubscriptionHandler<BatchEvent>>,
    ) -> Self {
        Self {
            sender,
            liveness: LivenessCalculator::new(clock, config.timeout_threshold_millis()),
            permitted: AtomicBool::new(true),
            subscriptions,
        }
    }

    /// Build the handler and subscribe it.
    pub fn subscribe_to(
        subscriptions: &Arc<dyn SubscriptionHandler<BatchEvent>>,
        sender: S,
        clock: Arc<dyn Clock>,
        config: ConsumerConfig,
    ) -> Result<Arc<Self>, shared_bus::SubscribeError> {
        let handler = Arc::new(Self::new(
            sender,
            clock,
            config,
            Arc::downgrade(subscriptions),
        ));
        subscriptions.subscribe(handler.clone())?;
        Ok(handler)
    }

    /// False once the consumer cancelled or closed its stream.
    pub fn is_permitted(&self) -> bool {
        self.permitted.load(Ordering::Acquire)
    }

    pub fn sender(&self) -> &S {
        &self.sender
    }
}

impl<S: ResponseSender + 'static> BlockNodeEventHandler<BatchEvent> for LivenessCheckedHandler<S> {
    fn on_event(&self, batch: &BatchEvent, sequence: u64, _: bool) -> Result<(), HandlerError> {
        if !self.is_permitted() {
            return Ok(());
        }

        if self.liveness.is_timeout_expired() {
            debug!(sequence, "Producer liveness window elapsed, unsubscribing live consumer");
            self.unsubscribe();
            return Ok(());
        }

        self.liveness.refresh();
        self.sender.send(batch).map_err(|e| {
            warn!(sequence, error = %e, "Live consumer send failed");
            self.permitted.store(false, Ordering::Release);
            HandlerError::from(e)
        })
    }

    fn is_timeout_expired(&self) -> bool {
        self.liveness.is_timeout_expired()
    }

    /// The downstream consumer cancelled or closed: stop sending and leave
    /// the channel.
    fn unsubscribe(&self) {
        self.permitted.store(false, Ordering::Release);
        if let Some(subscriptions) = self.subscriptions.upgrade() {
            subscriptions.unsubscribe(self);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::SinkError;
    use crate::service::LiveStreamMediator;
    use block_node_telemetry::BlockNodeMetrics;
    use parking_lot::Mutex;
    use shared_bus::test_utils::ManualClock;
    use shared_bus::{MediatorConfig, Publisher};
    use shared_types::{BlockHeader, BlockItem, BlockItemBatch, ServiceStatus};
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct Collect {
        sent: Mutex<Vec<BatchEvent>>,
        closed: AtomicBool,
    }

    impl ResponseSender for Arc<Collect> {
        fn send(&self, batch: &BatchEvent) -> Result<(), SinkError> {
            if self.closed.load(Ordering::SeqCst) {
                return Err(SinkError::Closed);
            }
            self.sent.lock().push(batch.clone());
            Ok(())
        }
    }

    fn setup() -> (Arc<dyn SubscriptionHandler<BatchEvent>>, Arc<LiveStreamMediator>) {
        let metrics = BlockNodeMetrics::new().unwrap();
        let mediator = Arc::new(LiveStreamMediator::new(
            MediatorConfig::new(8).unwrap(),
            Arc::new(ServiceStatus::new()),
            metrics.channel(),
        ));
        let subscriptions: Arc<dyn SubscriptionHandler<BatchEvent>> = mediator.clone();
        (subscriptions, mediator)
    }

    fn batch() -> BatchEvent {
        Arc::new(BlockItemBatch::new(vec![BlockItem::BlockHeader(
            BlockHeader::new(1),
        )]))
    }

    fn wait_until(condition: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() {
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        true
    }

    #[test]
    fn test_forwards_while_producer_is_live() {
        let (subscriptions, _mediator) = setup();
        let clock = Arc::new(ManualClock::new(0));
        let sink = Arc::new(Collect::default());
        let handler = LivenessCheckedHandler::new(
            sink.clone(),
            clock.clone(),
            ConsumerConfig::new(50).unwrap(),
            Arc::downgrade(&subscriptions),
        );

        clock.set(30);
        handler.on_event(&batch(), 0, true).unwrap();
        clock.set(70);
        handler.on_event(&batch(), 1, true).unwrap();

        assert_eq!(sink.sent.lock().len(), 2);
        assert!(!handler.is_timeout_expired());
    }

    #[test]
    fn test_unsubscribes_when_producer_went_quiet() {
        let (subscriptions, mediator) = setup();
        let clock = Arc::new(ManualClock::new(0));
        let sink = Arc::new(Collect::default());
        let handler = LivenessCheckedHandler::subscribe_to(
            &subscriptions,
            sink.clone(),
            clock.clone(),
            ConsumerConfig::new(50).unwrap(),
        )
        .unwrap();
        assert!(mediator.is_subscribed(handler.as_ref()));

        clock.set(51);
        handler.on_event(&batch(), 0, true).unwrap();

        assert!(sink.sent.lock().is_empty());
        assert!(!handler.is_permitted());
        assert!(!mediator.is_subscribed(handler.as_ref()));
    }

    #[test]
    fn test_closed_sink_gets_consumer_unsubscribed() {
        let (subscriptions, mediator) = setup();
        let sink = Arc::new(Collect::default());
        sink.closed.store(true, Ordering::SeqCst);
        let handler = LivenessCheckedHandler::subscribe_to(
            &subscriptions,
            sink.clone(),
            Arc::new(shared_types::SystemClock::new()),
            ConsumerConfig::default(),
        )
        .unwrap();

        mediator.publish(batch()).unwrap();

        assert!(wait_until(|| !mediator.is_subscribed(handler.as_ref())));
        assert!(!handler.is_permitted());
    }

    #[test]
    fn test_nothing_sent_after_unsubscribe() {
        let (subscriptions, _mediator) = setup();
        let sink = Arc::new(Collect::default());
        let handler = LivenessCheckedHandler::new(
            sink.clone(),
            Arc::new(ManualClock::new(0)),
            ConsumerConfig::default(),
            Arc::downgrade(&subscriptions),
        );

        handler.unsubscribe();
        handler.on_event(&batch(), 0, true).unwrap();
        assert!(sink.sent.lock().is_empty());
    }
}
