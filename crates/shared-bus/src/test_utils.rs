//! Test doubles shared by the block node crates.

use crate::errors::HandlerError;
use crate::handler::BlockNodeEventHandler;
use parking_lot::{Condvar, Mutex};
use shared_types::Clock;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Clock that only moves when told to.
///
/// A scripted clock returns its readings in order and then keeps returning
/// the last one.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
    script: Mutex<VecDeque<u64>>,
}

impl ManualClock {
    pub fn new(start_millis: u64) -> Self {
        Self {
            now: AtomicU64::new(start_millis),
            script: Mutex::new(VecDeque::new()),
        }
    }

    pub fn scripted(readings: Vec<u64>) -> Self {
        let start = readings.first().copied().unwrap_or_default();
        Self {
            now: AtomicU64::new(start),
            script: Mutex::new(readings.into()),
        }
    }

    pub fn set(&self, millis: u64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn millis(&self) -> u64 {
        if let Some(next) = self.script.lock().pop_front() {
            self.now.store(next, Ordering::SeqCst);
        }
        self.now.load(Ordering::SeqCst)
    }
}

/// One delivery observed by a [`RecordingHandler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery<T> {
    pub event: T,
    pub sequence: u64,
    pub end_of_batch: bool,
}

/// Handler that records every delivery.
///
/// Can be told to fail, panic, or report its liveness window as expired.
pub struct RecordingHandler<T> {
    deliveries: Mutex<Vec<Delivery<T>>>,
    delivered: Condvar,
    fail_at: Mutex<Option<usize>>,
    panic_at: Mutex<Option<usize>>,
    expired: AtomicBool,
    unsubscribe_calls: AtomicUsize,
}

impl<T: Clone> RecordingHandler<T> {
    pub fn new() -> Self {
        Self {
            deliveries: Mutex::new(Vec::new()),
            delivered: Condvar::new(),
            fail_at: Mutex::new(None),
            panic_at: Mutex::new(None),
            expired: AtomicBool::new(false),
            unsubscribe_calls: AtomicUsize::new(0),
        }
    }

    /// Return an error for the `n`th delivery (zero based) and after.
    pub fn failing_at(self, n: usize) -> Self {
        *self.fail_at.lock() = Some(n);
        self
    }

    /// Panic on the `n`th delivery (zero based).
    pub fn panicking_at(self, n: usize) -> Self {
        *self.panic_at.lock() = Some(n);
        self
    }

    pub fn set_expired(&self, expired: bool) {
        self.expired.store(expired, Ordering::SeqCst);
    }

    pub fn deliveries(&self) -> Vec<Delivery<T>> {
        self.deliveries.lock().clone()
    }

    pub fn events(&self) -> Vec<T> {
        self.deliveries.lock().iter().map(|d| d.event.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.deliveries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn unsubscribe_calls(&self) -> usize {
        self.unsubscribe_calls.load(Ordering::SeqCst)
    }

    /// Block until at least `count` deliveries were recorded.
    pub fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut deliveries = self.deliveries.lock();
        while deliveries.len() < count {
            if self.delivered.wait_until(&mut deliveries, deadline).timed_out() {
                return deliveries.len() >= count;
            }
        }
        true
    }
}

impl<T: Clone> Default for RecordingHandler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync> BlockNodeEventHandler<T> for RecordingHandler<T> {
    fn on_event(&self, event: &T, sequence: u64, end_of_batch: bool) -> Result<(), HandlerError> {
        let index = self.deliveries.lock().len();
        if *self.panic_at.lock() == Some(index) {
            panic!("recording handler told to panic at delivery {index}");
        }
        if self.fail_at.lock().is_some_and(|n| index >= n) {
            return Err(HandlerError::Failed(format!("told to fail at {index}")));
        }

        self.deliveries.lock().push(Delivery {
            event: event.clone(),
            sequence,
            end_of_batch,
        });
        self.delivered.notify_all();
        Ok(())
    }

    fn is_timeout_expired(&self) -> bool {
        self.expired.load(Ordering::SeqCst)
    }

    fn unsubscribe(&self) {
        self.unsubscribe_calls.fetch_add(1, Ordering::SeqCst);
    }
}
