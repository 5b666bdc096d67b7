//! # Block Node
//!
//! Owns the mediator and wires the verification feed onto it.
//!
//! ```text
//! producer ──publish──▶ LiveStreamMediator ──▶ StreamVerificationHandler ──▶ sessions
//!                               │
//!                               └──────────▶ live consumers ──▶ downstream sinks
//! ```

use super::config::BlockNodeConfig;
use anyhow::{Context, Result};
use block_node_telemetry::BlockNodeMetrics;
use bn_01_live_stream::{
    BatchEvent, BlockBoundarySender, ChannelResponseSender, LiveStreamMediator,
    LivenessCheckedHandler,
};
use bn_02_block_verification::{
    BlockVerificationService, BlockVerificationSessionFactory, DummySignatureVerifier,
    Ed25519SignatureVerifier, SignatureVerifier, StreamVerificationHandler,
};
use shared_bus::{PublishError, Publisher, SubscriptionHandler};
use shared_types::{Clock, ServiceStatus, SystemClock};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

/// Live consumer forwarding into a tokio channel from the next block on.
pub type LiveConsumer = LivenessCheckedHandler<BlockBoundarySender<ChannelResponseSender>>;

pub struct BlockNode {
    config: BlockNodeConfig,
    status: Arc<ServiceStatus>,
    mediator: Arc<LiveStreamMediator>,
    verification: Option<Arc<StreamVerificationHandler>>,
    clock: Arc<dyn Clock>,
}

impl BlockNode {
    /// Wire the node against the process-wide metrics.
    pub fn start(config: BlockNodeConfig) -> Result<Self> {
        Self::start_with_metrics(config, &block_node_telemetry::METRICS)
    }

    /// Wire the node against `metrics`.
    pub fn start_with_metrics(config: BlockNodeConfig, metrics: &BlockNodeMetrics) -> Result<Self> {
        let status = Arc::new(ServiceStatus::new());
        let mediator = Arc::new(LiveStreamMediator::new(
            config.mediator,
            status.clone(),
            metrics.channel(),
        ));

        let verification = if config.verification.enabled {
            Some(Self::subscribe_verification(&config, &status, &mediator, metrics)?)
        } else {
            info!("Block verification disabled");
            None
        };

        info!(
            ring_buffer_size = config.mediator.ring_buffer_size(),
            consumer_timeout_ms = config.consumer.timeout_threshold_millis(),
            verification = config.verification.enabled,
            session_type = %config.verification.session_type,
            "Block node started"
        );

        Ok(Self {
            config,
            status,
            mediator,
            verification,
            clock: Arc::new(SystemClock::new()),
        })
    }

    fn subscribe_verification(
        config: &BlockNodeConfig,
        status: &Arc<ServiceStatus>,
        mediator: &Arc<LiveStreamMediator>,
        metrics: &BlockNodeMetrics,
    ) -> Result<Arc<StreamVerificationHandler>> {
        let signature_verifier: Arc<dyn SignatureVerifier> = match &config.ledger_public_key {
            Some(key) => Arc::new(
                Ed25519SignatureVerifier::from_hex(key).context("Invalid BN_LEDGER_PUBLIC_KEY")?,
            ),
            None => Arc::new(DummySignatureVerifier),
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.verifier_threads)
            .thread_name(|index| format!("bn-hash-{index}"))
            .build()
            .context("Failed to build the hashing pool")?;

        let factory = BlockVerificationSessionFactory::new(
            config.verification.clone(),
            status.clone(),
            signature_verifier,
            Arc::new(pool),
            metrics.verification(),
        );

        let handler = StreamVerificationHandler::subscribe_to(
            mediator,
            BlockVerificationService::new(factory),
            status.clone(),
            metrics.verification(),
        )
        .context("Failed to subscribe the verification feed")?;
        Ok(handler)
    }

    /// Hand one producer batch to every subscriber.
    pub fn publish(&self, batch: BatchEvent) -> Result<(), PublishError> {
        self.mediator.publish(batch)
    }

    /// Subscribe a live consumer; batches arrive on the returned receiver
    /// starting with the next block header.
    pub fn subscribe_live_consumer(
        &self,
        buffer: usize,
    ) -> Result<(Arc<LiveConsumer>, mpsc::Receiver<BatchEvent>)> {
        let (sender, receiver) = ChannelResponseSender::channel(buffer);
        let subscriptions: Arc<dyn SubscriptionHandler<BatchEvent>> = self.mediator.clone();
        let consumer = LivenessCheckedHandler::subscribe_to(
            &subscriptions,
            BlockBoundarySender::new(sender),
            self.clock.clone(),
            self.config.consumer,
        )
        .context("Failed to subscribe live consumer")?;
        Ok((consumer, receiver))
    }

    pub fn config(&self) -> &BlockNodeConfig {
        &self.config
    }

    pub fn status(&self) -> &Arc<ServiceStatus> {
        &self.status
    }

    pub fn mediator(&self) -> &Arc<LiveStreamMediator> {
        &self.mediator
    }

    /// The verification feed, when verification is enabled.
    pub fn verification(&self) -> Option<&Arc<StreamVerificationHandler>> {
        self.verification.as_ref()
    }

    /// Stop accepting publications and release every subscriber.
    pub fn shutdown(&self) {
        self.status.stop_accepting("shutdown requested");
        self.mediator.unsubscribe_all();
        info!("Block node stopped");
    }
}
