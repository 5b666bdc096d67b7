//! # Stream Verification Handler
//!
//! The privileged subscriber feeding the verification service. Unlike a live
//! consumer, a failure here is not isolated: once the stream cannot be
//! verified nothing downstream may trust it, so a protocol violation stops
//! the shared status and halts the whole mediator.

use crate::domain::errors::VerificationError;
use crate::service::BlockVerificationService;
use block_node_telemetry::VerificationMetrics;
use bn_01_live_stream::{BatchEvent, Notifiable};
use parking_lot::Mutex;
use shared_bus::{BlockNodeEventHandler, HandlerError, SubscribeError, SubscriptionHandler};
use shared_types::ServiceStatus;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use tracing::{error, trace};

pub struct StreamVerificationHandler {
    service: Mutex<BlockVerificationService>,
    status: Arc<ServiceStatus>,
    metrics: VerificationMetrics,
    subscriptions: Weak<dyn SubscriptionHandler<BatchEvent>>,
    notifier: Weak<dyn Notifiable>,
}

impl StreamVerificationHandler {
    pub fn new(
        service: BlockVerificationService,
        status: Arc<ServiceStatus>,
        metrics: VerificationMetrics,
        subscriptions: Weak<dyn SubscriptionHandler<BatchEvent>>,
        notifier: Weak<dyn Notifiable>,
    ) -> Self {
        Self {
            service: Mutex::new(service),
            status,
            metrics,
            subscriptions,
            notifier,
        }
    }

    /// Build the handler against a mediator and subscribe it.
    pub fn subscribe_to<M>(
        mediator: &Arc<M>,
        service: BlockVerificationService,
        status: Arc<ServiceStatus>,
        metrics: VerificationMetrics,
    ) -> Result<Arc<Self>, SubscribeError>
    where
        M: SubscriptionHandler<BatchEvent> + Notifiable + 'static,
    {
        let subscriptions: Arc<dyn SubscriptionHandler<BatchEvent>> = mediator.clone();
        let notifier: Arc<dyn Notifiable> = mediator.clone();
        let handler = Arc::new(Self::new(
            service,
            status,
            metrics,
            Arc::downgrade(&subscriptions),
            Arc::downgrade(&notifier),
        ));
        subscriptions.subscribe(handler.clone())?;
        Ok(handler)
    }

    /// Run `f` against the service, e.g. to inspect the current session.
    pub fn with_service<R>(&self, f: impl FnOnce(&BlockVerificationService) -> R) -> R {
        f(&self.service.lock())
    }

    fn escalate(&self, error: &VerificationError) {
        self.status.stop_accepting(&error.to_string());
        self.unsubscribe();
        if let Some(notifier) = self.notifier.upgrade() {
            notifier.notify_unrecoverable_error();
        }
    }
}

impl BlockNodeEventHandler<BatchEvent> for StreamVerificationHandler {
    fn on_event(&self, batch: &BatchEvent, sequence: u64, _: bool) -> Result<(), HandlerError> {
        if !self.status.is_accepting() {
            error!(sequence, "Service is not accepting, dropping batch from verification");
            return Ok(());
        }

        trace!(sequence, items = batch.len(), "Verifying batch");
        // A panic here must halt the stream like any other feed failure,
        // not merely drop this subscriber.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.service.lock().on_block_items_received(batch)
        }))
        .unwrap_or_else(|payload| Err(VerificationError::FeedPanicked(panic_message(&*payload))));
        if let Err(e) = outcome {
            if e.is_protocol_violation() {
                self.metrics.verification_errors.inc();
            }
            error!(sequence, error = %e, "Verification feed failed, halting the stream");
            self.escalate(&e);
        }
        Ok(())
    }

    fn unsubscribe(&self) {
        if let Some(subscriptions) = self.subscriptions.upgrade() {
            subscriptions.unsubscribe(self);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::{BlockVerificationSessionType, VerificationConfig};
    use crate::service::factory::BlockVerificationSessionFactory;
    use crate::test_utils::{block_batches, StubSignatureVerifier};
    use block_node_telemetry::BlockNodeMetrics;
    use bn_01_live_stream::LiveStreamMediator;
    use shared_bus::test_utils::RecordingHandler;
    use shared_bus::{MediatorConfig, PublishError, Publisher};
    use shared_types::BlockItemBatch;
    use std::time::{Duration, Instant};

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

    fn setup() -> (Arc<LiveStreamMediator>, Arc<StreamVerificationHandler>, BlockNodeMetrics) {
        setup_with(StubSignatureVerifier::accepting())
    }

    fn setup_with(
        verifier: StubSignatureVerifier,
    ) -> (Arc<LiveStreamMediator>, Arc<StreamVerificationHandler>, BlockNodeMetrics) {
        let metrics = BlockNodeMetrics::new().unwrap();
        let status = Arc::new(ServiceStatus::new());
        let mediator = Arc::new(LiveStreamMediator::new(
            MediatorConfig::new(16).unwrap(),
            status.clone(),
            metrics.channel(),
        ));
        let factory = BlockVerificationSessionFactory::new(
            VerificationConfig::default().with_session_type(BlockVerificationSessionType::Sync),
            status.clone(),
            Arc::new(verifier),
            Arc::new(rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap()),
            metrics.verification(),
        );
        let handler = StreamVerificationHandler::subscribe_to(
            &mediator,
            BlockVerificationService::new(factory),
            status,
            metrics.verification(),
        )
        .unwrap();
        (mediator, handler, metrics)
    }

    #[test]
    fn test_verifies_published_blocks() {
        let (mediator, _handler, metrics) = setup();
        for batch in block_batches(1, 3, 4) {
            mediator.publish(batch).unwrap();
        }

        assert!(wait_until(|| metrics.verification().blocks_verified.get() == 1));
        assert!(mediator.status().is_accepting());
    }

    #[test]
    fn test_empty_batch_halts_the_stream() {
        let (mediator, handler, metrics) = setup();
        let bystander = Arc::new(RecordingHandler::<BatchEvent>::new());
        mediator.subscribe(bystander.clone()).unwrap();

        mediator
            .publish(Arc::new(BlockItemBatch::new(Vec::new())))
            .unwrap();

        assert!(wait_until(|| !mediator.status().is_accepting()));
        assert!(wait_until(|| mediator.subscriber_count() == 0));
        assert!(!mediator.is_subscribed(handler.as_ref()));
        assert_eq!(metrics.verification().verification_errors.get(), 1);
        assert_eq!(metrics.channel().producers_halted.get(), 1);
        assert!(matches!(
            mediator.publish(block_batches(2, 1, 1).remove(0)),
            Err(PublishError::NotAccepting(_))
        ));
    }

    #[test]
    fn test_panicking_feed_halts_the_stream() {
        let (mediator, handler, metrics) = setup_with(StubSignatureVerifier::panicking());
        let bystander = Arc::new(RecordingHandler::<BatchEvent>::new());
        mediator.subscribe(bystander.clone()).unwrap();

        for batch in block_batches(1, 1, 2) {
            mediator.publish(batch).unwrap();
        }

        assert!(wait_until(|| !mediator.status().is_accepting()));
        assert!(wait_until(|| mediator.subscriber_count() == 0));
        assert!(!mediator.is_subscribed(handler.as_ref()));
        assert_eq!(metrics.channel().producers_halted.get(), 1);
        assert_eq!(metrics.verification().verification_errors.get(), 0);
        assert!(mediator
            .status()
            .stop_reason()
            .is_some_and(|reason| reason.contains("panicked")));
    }

    #[test]
    fn test_drops_batches_once_stopped() {
        let (mediator, handler, _) = setup();
        mediator.status().stop_accepting("storage failed");

        let batch = block_batches(1, 1, 1).remove(0);
        handler.on_event(&batch, 0, true).unwrap();

        assert!(handler.with_service(|service| service.current_session().is_none()));
    }
}
