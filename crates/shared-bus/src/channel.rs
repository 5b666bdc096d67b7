//! # Ring-Buffer Channel
//!
//! Single producer, multiple consumers. Each subscriber gets a dedicated
//! consumption thread pinned to its own cursor; a slow subscriber only ever
//! slows the producer, through slot gating, never another subscriber.
//!
//! ## Failure isolation
//!
//! A handler that returns an error or panics is logged and unsubscribed on
//! its own thread. The producer and the other subscribers carry on.

use crate::errors::{PublishError, SubscribeError};
use crate::handler::{BlockNodeEventHandler, HandlerKey};
use crate::ring_buffer::{RingBuffer, Sequence, STALL_CHECK_INTERVAL};
use crate::MediatorConfig;
use block_node_telemetry::ChannelMetrics;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info, trace, warn};

/// Events that can be counted for the `items_ingested` metric.
pub trait ItemCount {
    fn item_count(&self) -> usize;
}

impl<T: ItemCount + ?Sized> ItemCount for Arc<T> {
    fn item_count(&self) -> usize {
        (**self).item_count()
    }
}

impl ItemCount for shared_types::BlockItemBatch {
    fn item_count(&self) -> usize {
        self.len()
    }
}

/// Producer side of the channel.
pub trait Publisher<T>: Send + Sync {
    /// Publish one event to every current subscriber.
    ///
    /// May block while the slowest subscriber is a full buffer behind.
    fn publish(&self, event: T) -> Result<(), PublishError>;
}

/// Subscriber registry of the channel.
pub trait SubscriptionHandler<T>: Send + Sync {
    /// Register a handler. Subscribing an already registered handler is a
    /// no-op.
    fn subscribe(&self, handler: Arc<dyn BlockNodeEventHandler<T>>) -> Result<(), SubscribeError>;

    /// Stop delivering to `handler`. Safe to call from inside the handler's
    /// own `on_event`.
    fn unsubscribe(&self, handler: &dyn BlockNodeEventHandler<T>);

    fn is_subscribed(&self, handler: &dyn BlockNodeEventHandler<T>) -> bool;

    /// Unsubscribe every handler whose liveness window elapsed. Returns how
    /// many were removed.
    fn unsubscribe_all_expired(&self) -> usize;

    fn unsubscribe_all(&self);

    fn subscriber_count(&self) -> usize;
}

struct Subscriber<T> {
    id: u64,
    handler: Arc<dyn BlockNodeEventHandler<T>>,
    sequence: Arc<Sequence>,
    halted: Arc<AtomicBool>,
}

struct Shared<T> {
    ring: RingBuffer<T>,
    subscribers: RwLock<HashMap<HandlerKey, Subscriber<T>>>,
    metrics: ChannelMetrics,
    next_subscriber_id: AtomicU64,
}

impl<T: Clone + Send + Sync + 'static> Shared<T> {
    /// Remove `key`, but only if it still belongs to the subscriber owning
    /// `halted` (the handler may have been re-subscribed in between).
    fn remove(&self, key: HandlerKey, halted: Option<&Arc<AtomicBool>>) -> bool {
        let removed = {
            let mut subscribers = self.subscribers.write();
            let owned = match (subscribers.get(&key), halted) {
                (Some(entry), Some(halted)) => Arc::ptr_eq(&entry.halted, halted),
                (Some(_), None) => true,
                (None, _) => false,
            };
            if owned {
                subscribers.remove(&key)
            } else {
                None
            }
        };

        let Some(subscriber) = removed else {
            return false;
        };

        subscriber.halted.store(true, Ordering::SeqCst);
        self.ring.remove_gating_sequence(&subscriber.sequence);
        self.metrics
            .subscribers
            .set(self.subscribers.read().len() as i64);
        debug!(subscriber = subscriber.id, "Subscriber removed");
        true
    }

    fn remove_expired(&self) -> usize {
        let expired: Vec<(HandlerKey, u64)> = self
            .subscribers
            .read()
            .iter()
            .filter(|(_, s)| s.handler.is_timeout_expired())
            .map(|(key, s)| (*key, s.id))
            .collect();

        let mut removed = 0;
        for (key, id) in expired {
            if self.remove(key, None) {
                info!(subscriber = id, "Unsubscribed expired subscriber");
                removed += 1;
            }
        }
        removed
    }
}

/// Ring-buffer backed [`Publisher`] and [`SubscriptionHandler`].
///
/// Dropping the channel unsubscribes everyone, which stops every
/// consumption thread.
pub struct RingBufferChannel<T: Clone + Send + Sync + 'static> {
    shared: Arc<Shared<T>>,
}

impl<T: Clone + Send + Sync + 'static> RingBufferChannel<T> {
    pub fn new(config: MediatorConfig, metrics: ChannelMetrics) -> Self {
        let ring = RingBuffer::new(config.ring_buffer_size());
        metrics.remaining_capacity.set(ring.capacity() as i64);
        metrics.subscribers.set(0);

        info!(
            ring_buffer_size = ring.capacity(),
            "Ring buffer channel created"
        );

        Self {
            shared: Arc::new(Shared {
                ring,
                subscribers: RwLock::new(HashMap::new()),
                metrics,
                next_subscriber_id: AtomicU64::new(0),
            }),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.ring.capacity()
    }

    #[must_use]
    pub fn remaining_capacity(&self) -> usize {
        self.shared.ring.remaining_capacity()
    }

    /// Total events published so far.
    #[must_use]
    pub fn published(&self) -> u64 {
        self.shared.ring.cursor()
    }
}

impl<T> Publisher<T> for RingBufferChannel<T>
where
    T: ItemCount + Clone + Send + Sync + 'static,
{
    fn publish(&self, event: T) -> Result<(), PublishError> {
        let items = event.item_count();
        // A consumer stuck downstream stops refreshing its liveness window;
        // sweeping while blocked keeps it from stalling the writer forever.
        let shared = &self.shared;
        let sequence = shared
            .ring
            .publish_or_stall(event, STALL_CHECK_INTERVAL, || {
                if shared.remove_expired() > 0 {
                    warn!("Evicted expired subscribers blocking the producer");
                }
            });

        let metrics = &self.shared.metrics;
        metrics.items_ingested.inc_by(items as u64);
        metrics
            .remaining_capacity
            .set(self.shared.ring.remaining_capacity() as i64);

        trace!(sequence, items, "Event published");
        Ok(())
    }
}

impl<T: Clone + Send + Sync + 'static> SubscriptionHandler<T> for RingBufferChannel<T> {
    fn subscribe(&self, handler: Arc<dyn BlockNodeEventHandler<T>>) -> Result<(), SubscribeError> {
        let key = HandlerKey::of(handler.as_ref());
        let mut subscribers = self.shared.subscribers.write();
        if subscribers.contains_key(&key) {
            debug!("Handler already subscribed");
            return Ok(());
        }

        let id = self.shared.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        let sequence = self.shared.ring.add_gating_sequence();
        let halted = Arc::new(AtomicBool::new(false));

        let consumer = Consumer {
            id,
            key,
            handler: handler.clone(),
            sequence: sequence.clone(),
            halted: halted.clone(),
            shared: self.shared.clone(),
        };

        if let Err(e) = thread::Builder::new()
            .name(format!("bn-consumer-{id}"))
            .spawn(move || consumer.run())
        {
            self.shared.ring.remove_gating_sequence(&sequence);
            error!(subscriber = id, error = %e, "Failed to start consumer thread");
            return Err(SubscribeError::Spawn(e.to_string()));
        }

        subscribers.insert(
            key,
            Subscriber {
                id,
                handler,
                sequence: sequence.clone(),
                halted,
            },
        );
        self.shared.metrics.subscribers.set(subscribers.len() as i64);

        info!(
            subscriber = id,
            start_sequence = sequence.get(),
            subscribers = subscribers.len(),
            "Subscriber registered"
        );
        Ok(())
    }

    fn unsubscribe(&self, handler: &dyn BlockNodeEventHandler<T>) {
        if !self.shared.remove(HandlerKey::of(handler), None) {
            debug!("Unsubscribe of a handler that is not subscribed");
        }
    }

    fn is_subscribed(&self, handler: &dyn BlockNodeEventHandler<T>) -> bool {
        self.shared
            .subscribers
            .read()
            .contains_key(&HandlerKey::of(handler))
    }

    fn unsubscribe_all_expired(&self) -> usize {
        self.shared.remove_expired()
    }

    fn unsubscribe_all(&self) {
        let keys: Vec<HandlerKey> = self.shared.subscribers.read().keys().copied().collect();
        let count = keys.len();
        for key in keys {
            self.shared.remove(key, None);
        }
        if count > 0 {
            info!(subscribers = count, "Unsubscribed all subscribers");
        }
    }

    fn subscriber_count(&self) -> usize {
        self.shared.subscribers.read().len()
    }
}

impl<T: Clone + Send + Sync + 'static> Drop for RingBufferChannel<T> {
    fn drop(&mut self) {
        self.unsubscribe_all();
    }
}

/// The consumption loop of one subscriber.
struct Consumer<T> {
    id: u64,
    key: HandlerKey,
    handler: Arc<dyn BlockNodeEventHandler<T>>,
    sequence: Arc<Sequence>,
    halted: Arc<AtomicBool>,
    shared: Arc<Shared<T>>,
}

impl<T: Clone + Send + Sync + 'static> Consumer<T> {
    fn run(self) {
        let mut next = self.sequence.get();
        debug!(subscriber = self.id, start_sequence = next, "Consumer started");

        'consume: while let Some(available) = self.shared.ring.wait_for(next, &self.halted) {
            while next < available {
                let Some(event) = self.shared.ring.get(next) else {
                    error!(subscriber = self.id, sequence = next, "Empty ring slot");
                    break 'consume;
                };
                // A halted consumer no longer gates the writer, so the slot
                // may already hold a newer event.
                if self.halted.load(Ordering::SeqCst) {
                    break 'consume;
                }

                let end_of_batch = next + 1 == available;
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    self.handler.on_event(&event, next, end_of_batch)
                }));

                match outcome {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        warn!(
                            subscriber = self.id,
                            sequence = next,
                            error = %e,
                            "Subscriber failed, unsubscribing"
                        );
                        self.shared.remove(self.key, Some(&self.halted));
                        break 'consume;
                    }
                    Err(_) => {
                        error!(
                            subscriber = self.id,
                            sequence = next,
                            "Subscriber panicked, unsubscribing"
                        );
                        self.shared.remove(self.key, Some(&self.halted));
                        break 'consume;
                    }
                }

                next += 1;
                self.sequence.set(next);
            }
            self.shared.ring.signal_freed();
        }

        debug!(subscriber = self.id, next_sequence = next, "Consumer stopped");
    }
}
