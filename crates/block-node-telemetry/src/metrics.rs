//! Prometheus metrics for the block node.
//!
//! All metrics follow the naming convention: `bn_<component>_<metric>_<unit>`
//!
//! Every [`BlockNodeMetrics`] owns its collectors and its own `Registry`, so
//! tests can build isolated instances. The process-wide instance is [`METRICS`].
//!
//! The mediator and the verification engine only see the slices they update:
//! [`ChannelMetrics`] and [`VerificationMetrics`].

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry,
    TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Process-wide metrics, registered in their own registry.
    pub static ref METRICS: BlockNodeMetrics =
        BlockNodeMetrics::new().expect("metric creation failed");
}

/// Metrics updated by the ring-buffer mediator.
#[derive(Clone)]
pub struct ChannelMetrics {
    /// Block items published into the ring buffer
    pub items_ingested: IntCounter,
    /// Currently registered subscribers
    pub subscribers: IntGauge,
    /// Free ring slots relative to the slowest subscriber
    pub remaining_capacity: IntGauge,
    /// Global halts after an unrecoverable subscriber error
    pub producers_halted: IntCounter,
}

impl Default for ChannelMetrics {
    fn default() -> Self {
        METRICS.channel()
    }
}

/// Metrics updated by verification sessions.
#[derive(Clone)]
pub struct VerificationMetrics {
    /// Block headers seen by the verification service
    pub blocks_received: IntCounter,
    /// Blocks whose hash and signature checked out
    pub blocks_verified: IntCounter,
    /// Blocks with a bad hash or signature, or a broken previous-hash link
    pub blocks_failed: IntCounter,
    /// Sessions that could not complete verification
    pub verification_errors: IntCounter,
    /// Time from session creation to result
    pub verification_latency: Histogram,
}

impl Default for VerificationMetrics {
    fn default() -> Self {
        METRICS.verification()
    }
}

/// Owner of every block node collector.
#[derive(Clone)]
pub struct BlockNodeMetrics {
    registry: Registry,
    channel: ChannelMetrics,
    verification: VerificationMetrics,
}

impl BlockNodeMetrics {
    /// Create and register a fresh set of collectors.
    pub fn new() -> Result<Self, TelemetryError> {
        let registry = Registry::new();

        let channel = ChannelMetrics {
            items_ingested: IntCounter::new(
                "bn_mediator_items_ingested_total",
                "Total block items published to the live stream",
            )
            .map_err(init_error)?,
            subscribers: IntGauge::new(
                "bn_mediator_subscribers",
                "Number of subscribers currently registered",
            )
            .map_err(init_error)?,
            remaining_capacity: IntGauge::new(
                "bn_mediator_remaining_capacity",
                "Free ring buffer slots relative to the slowest subscriber",
            )
            .map_err(init_error)?,
            producers_halted: IntCounter::new(
                "bn_mediator_producers_halted_total",
                "Times the live stream stopped accepting after an unrecoverable error",
            )
            .map_err(init_error)?,
        };

        let buckets = exponential_buckets(0.0001, 2.0, 16).map_err(init_error)?;
        let verification = VerificationMetrics {
            blocks_received: IntCounter::new(
                "bn_verification_blocks_received_total",
                "Total block headers received for verification",
            )
            .map_err(init_error)?,
            blocks_verified: IntCounter::new(
                "bn_verification_blocks_verified_total",
                "Total blocks verified",
            )
            .map_err(init_error)?,
            blocks_failed: IntCounter::new(
                "bn_verification_blocks_failed_total",
                "Total blocks that failed hash, signature or linkage checks",
            )
            .map_err(init_error)?,
            verification_errors: IntCounter::new(
                "bn_verification_errors_total",
                "Total verification sessions that ended in an error",
            )
            .map_err(init_error)?,
            verification_latency: Histogram::with_opts(
                HistogramOpts::new(
                    "bn_verification_latency_seconds",
                    "Time from the block header to the verification result",
                )
                .buckets(buckets),
            )
            .map_err(init_error)?,
        };

        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            // Mediator
            Box::new(channel.items_ingested.clone()),
            Box::new(channel.subscribers.clone()),
            Box::new(channel.remaining_capacity.clone()),
            Box::new(channel.producers_halted.clone()),
            // Verification
            Box::new(verification.blocks_received.clone()),
            Box::new(verification.blocks_verified.clone()),
            Box::new(verification.blocks_failed.clone()),
            Box::new(verification.verification_errors.clone()),
            Box::new(verification.verification_latency.clone()),
        ];

        for collector in collectors {
            registry.register(collector).map_err(init_error)?;
        }

        Ok(Self {
            registry,
            channel,
            verification,
        })
    }

    /// Handles for the ring-buffer mediator.
    pub fn channel(&self) -> ChannelMetrics {
        self.channel.clone()
    }

    /// Handles for the verification engine.
    pub fn verification(&self) -> VerificationMetrics {
        self.verification.clone()
    }

    /// Encode all metrics as Prometheus text format.
    pub fn encode(&self) -> Result<String, TelemetryError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(init_error)?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
    }
}

fn init_error(e: prometheus::Error) -> TelemetryError {
    TelemetryError::MetricsInit(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instances_are_isolated() {
        let a = BlockNodeMetrics::new().unwrap();
        let b = BlockNodeMetrics::new().unwrap();

        a.channel().items_ingested.inc_by(5);
        assert_eq!(a.channel().items_ingested.get(), 5);
        assert_eq!(b.channel().items_ingested.get(), 0);
    }

    #[test]
    fn test_slices_share_collectors() {
        let metrics = BlockNodeMetrics::new().unwrap();
        let first = metrics.verification();
        let second = metrics.verification();

        first.blocks_verified.inc();
        assert_eq!(second.blocks_verified.get(), 1);
    }

    #[test]
    fn test_encode_contains_metric_names() {
        let metrics = BlockNodeMetrics::new().unwrap();
        metrics.channel().subscribers.set(3);
        metrics.verification().verification_latency.observe(0.01);

        let text = metrics.encode().unwrap();
        assert!(text.contains("bn_mediator_subscribers 3"));
        assert!(text.contains("bn_verification_latency_seconds"));
    }

    #[test]
    fn test_global_metrics_available() {
        let channel = ChannelMetrics::default();
        channel.remaining_capacity.set(16);
        assert_eq!(METRICS.channel().remaining_capacity.get(), 16);
    }
}
