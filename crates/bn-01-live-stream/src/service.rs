//! # Live Stream Mediator
//!
//! The producer-facing front of the ring-buffer channel.
//!
//! - Publications are refused once the shared `ServiceStatus` stopped
//!   accepting.
//! - Every publication first sweeps out subscribers whose liveness window
//!   elapsed.
//! - An unrecoverable-error notification halts the stream globally.

use crate::ports::inbound::Notifiable;
use crate::BatchEvent;
use block_node_telemetry::ChannelMetrics;
use shared_bus::{
    BlockNodeEventHandler, MediatorConfig, PublishError, Publisher, RingBufferChannel,
    SubscribeError, SubscriptionHandler,
};
use shared_types::ServiceStatus;
use std::sync::Arc;
use tracing::{debug, error};

const UNRECOVERABLE_ERROR_REASON: &str = "unrecoverable error reported by a privileged subscriber";

pub struct LiveStreamMediator {
    channel: RingBufferChannel<BatchEvent>,
    status: Arc<ServiceStatus>,
    metrics: ChannelMetrics,
}

impl LiveStreamMediator {
    pub fn new(config: MediatorConfig, status: Arc<ServiceStatus>, metrics: ChannelMetrics) -> Self {
        Self {
            channel: RingBufferChannel::new(config, metrics.clone()),
            status,
            metrics,
        }
    }

    /// The status shared with the verification engine.
    #[must_use]
    pub fn status(&self) -> &Arc<ServiceStatus> {
        &self.status
    }

    #[must_use]
    pub fn remaining_capacity(&self) -> usize {
        self.channel.remaining_capacity()
    }
}

impl Publisher<BatchEvent> for LiveStreamMediator {
    fn publish(&self, batch: BatchEvent) -> Result<(), PublishError> {
        if !self.status.is_accepting() {
            let reason = self
                .status
                .stop_reason()
                .unwrap_or_else(|| "service stopped".to_string());
            debug!(items = batch.len(), %reason, "Publication refused");
            return Err(PublishError::NotAccepting(reason));
        }

        self.channel.unsubscribe_all_expired();
        self.channel.publish(batch)
    }
}

impl SubscriptionHandler<BatchEvent> for LiveStreamMediator {
    fn subscribe(
        &self,
        handler: Arc<dyn BlockNodeEventHandler<BatchEvent>>,
    ) -> Result<(), SubscribeError> {
        self.channel.subscribe(handler)
    }

    fn unsubscribe(&self, handler: &dyn BlockNodeEventHandler<BatchEvent>) {
        self.channel.unsubscribe(handler);
    }

    fn is_subscribed(&self, handler: &dyn BlockNodeEventHandler<BatchEvent>) -> bool {
        self.channel.is_subscribed(handler)
    }

    fn unsubscribe_all_expired(&self) -> usize {
        self.channel.unsubscribe_all_expired()
    }

    fn unsubscribe_all(&self) {
        self.channel.unsubscribe_all();
    }

    fn subscriber_count(&self) -> usize {
        self.channel.subscriber_count()
    }
}

impl Notifiable for LiveStreamMediator {
    fn notify_unrecoverable_error(&self) {
        self.status.stop_accepting(UNRECOVERABLE_ERROR_REASON);
        self.metrics.producers_halted.inc();
        error!(
            subscribers = self.channel.subscriber_count(),
            "Unrecoverable error, halting live stream"
        );
        self.channel.unsubscribe_all();
    }
}
