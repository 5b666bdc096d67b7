//! # Subscriber Handler Contract
//!
//! Every subscriber of the ring-buffer channel implements
//! [`BlockNodeEventHandler`]. Live consumers, the verification feed and test
//! stubs are all variants of this one interface.

use crate::errors::HandlerError;

/// A registered, independently paced consumer of published events.
///
/// `on_event` is called on the subscriber's dedicated consumption thread, in
/// publish order, once per event. Returning an error (or panicking) gets the
/// handler unsubscribed; other subscribers are not affected.
pub trait BlockNodeEventHandler<T>: Send + Sync {
    /// Process one published event.
    ///
    /// `end_of_batch` is true for the last event currently available to this
    /// subscriber.
    fn on_event(&self, event: &T, sequence: u64, end_of_batch: bool) -> Result<(), HandlerError>;

    /// Whether the handler's liveness window has elapsed.
    fn is_timeout_expired(&self) -> bool {
        false
    }

    /// Remove this handler from whatever it is subscribed to.
    fn unsubscribe(&self) {}
}

/// Identity of a subscribed handler: the address of the shared handler value.
///
/// Obtained both from an `Arc<dyn BlockNodeEventHandler<T>>` and from a plain
/// `&self` inside the handler, so a handler can unsubscribe itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerKey(usize);

impl HandlerKey {
    pub fn of<T>(handler: &dyn BlockNodeEventHandler<T>) -> Self {
        Self(handler as *const dyn BlockNodeEventHandler<T> as *const () as usize)
    }
}
