//! # Response Senders

use crate::domain::errors::SinkError;
use crate::ports::outbound::ResponseSender;
use crate::BatchEvent;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Delivers batches into a bounded tokio channel read by the downstream
/// connection task.
///
/// Blocks the consumption thread while the channel is full.
#[derive(Debug, Clone)]
pub struct ChannelResponseSender {
    sender: mpsc::Sender<BatchEvent>,
}

impl ChannelResponseSender {
    pub fn new(sender: mpsc::Sender<BatchEvent>) -> Self {
        Self { sender }
    }

    /// A sender plus the receiving end for the downstream task.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<BatchEvent>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        (Self::new(sender), receiver)
    }
}

impl ResponseSender for ChannelResponseSender {
    fn send(&self, batch: &BatchEvent) -> Result<(), SinkError> {
        self.sender
            .blocking_send(batch.clone())
            .map_err(|_| SinkError::Closed)
    }
}

/// Holds back everything until the first batch that opens a block, so a
/// consumer joining mid-block never sees a partial block.
#[derive(Debug)]
pub struct BlockBoundarySender<S> {
    inner: S,
    started: AtomicBool,
}

impl<S: ResponseSender> BlockBoundarySender<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            started: AtomicBool::new(false),
        }
    }

    /// Whether a block header has been seen yet.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }
}

impl<S: ResponseSender> ResponseSender for BlockBoundarySender<S> {
    fn send(&self, batch: &BatchEvent) -> Result<(), SinkError> {
        if !self.is_started() {
            let Some(header) = batch.block_header() else {
                trace!(items = batch.len(), "Skipping batch before first block header");
                return Ok(());
            };
            debug!(block_number = header.number, "Live stream starts at block");
            self.started.store(true, Ordering::Release);
        }
        self.inner.send(batch)
    }
}
