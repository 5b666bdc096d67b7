//! # Outbound Ports
//!
//! Where a live consumer delivers batches.

use crate::domain::errors::SinkError;
use crate::BatchEvent;

/// Kind-specific delivery of batches to one downstream consumer.
///
/// Called from the consumer's consumption thread, so implementations may
/// block (backpressure from a slow consumer flows back into the ring).
pub trait ResponseSender: Send + Sync {
    fn send(&self, batch: &BatchEvent) -> Result<(), SinkError>;
}
