//! # Ring Buffer
//!
//! Fixed-size slot array with a single write cursor and a set of gating
//! sequences, one per consumer.
//!
//! ```text
//!            min gating                 cursor
//!                 │                        │
//!   ┌────┬────┬───▼┬────┬────┬────┬────┬───▼┬────┐
//!   │ .. │    │ s5 │ s6 │ s7 │ s8 │ s9 │    │    │   slot = seq & mask
//!   └────┴────┴────┴────┴────┴────┴────┴────┴────┘
//!                 └──── readable ───────┘
//! ```
//!
//! A slot is reused only once every gating sequence has moved past it, so
//! the writer blocks while the slowest consumer is a full lap behind.

use parking_lot::{Condvar, Mutex, MutexGuard, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How long a blocked writer waits before re-checking for stalled consumers.
pub const STALL_CHECK_INTERVAL: Duration = Duration::from_millis(25);

/// A consumer's read position: the next sequence it will consume.
#[derive(Debug)]
pub struct Sequence {
    value: AtomicU64,
}

impl Sequence {
    pub fn new(initial: u64) -> Self {
        Self {
            value: AtomicU64::new(initial),
        }
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Acquire)
    }

    pub fn set(&self, value: u64) {
        self.value.store(value, Ordering::Release);
    }
}

pub struct RingBuffer<T> {
    slots: Box<[RwLock<Option<T>>]>,
    mask: u64,
    capacity: u64,
    /// Number of published entries, i.e. the next sequence to write.
    cursor: AtomicU64,
    gating: RwLock<Vec<Arc<Sequence>>>,
    /// Serializes writers.
    claim: Mutex<()>,
    signal: Mutex<()>,
    available: Condvar,
    freed: Condvar,
}

impl<T: Clone> RingBuffer<T> {
    /// `capacity` must be a power of two; `MediatorConfig` guarantees it.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1).next_power_of_two();
        let slots = (0..capacity).map(|_| RwLock::new(None)).collect();
        Self {
            slots,
            mask: capacity as u64 - 1,
            capacity: capacity as u64,
            cursor: AtomicU64::new(0),
            gating: RwLock::new(Vec::new()),
            claim: Mutex::new(()),
            signal: Mutex::new(()),
            available: Condvar::new(),
            freed: Condvar::new(),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    /// The next sequence to be written.
    pub fn cursor(&self) -> u64 {
        self.cursor.load(Ordering::Acquire)
    }

    /// Register a consumer starting at the current cursor.
    pub fn add_gating_sequence(&self) -> Arc<Sequence> {
        let _signal = self.signal.lock();
        let sequence = Arc::new(Sequence::new(self.cursor()));
        self.gating.write().push(sequence.clone());
        sequence
    }

    /// Stop a consumer from gating the writer and wake a blocked writer.
    pub fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) {
        self.gating.write().retain(|s| !Arc::ptr_eq(s, sequence));
        self.wake_all();
    }

    fn min_gating(&self, default: u64) -> u64 {
        self.gating
            .read()
            .iter()
            .map(|s| s.get())
            .min()
            .unwrap_or(default)
    }

    /// Slots the writer can fill before it has to wait.
    pub fn remaining_capacity(&self) -> usize {
        let cursor = self.cursor();
        let in_flight = cursor.saturating_sub(self.min_gating(cursor));
        self.capacity.saturating_sub(in_flight) as usize
    }

    /// Write `value` into the next slot and make it visible to consumers.
    ///
    /// Blocks while the slowest consumer is a full lap behind. Returns the
    /// sequence the value was written at.
    pub fn publish(&self, value: T) -> u64 {
        self.publish_or_stall(value, STALL_CHECK_INTERVAL, || {})
    }

    /// Like [`publish`](Self::publish), but runs `on_stall` every `interval`
    /// the writer spends waiting for a slot. `on_stall` runs without the
    /// ring's signal lock held, so it may remove gating sequences.
    pub fn publish_or_stall(
        &self,
        value: T,
        interval: Duration,
        mut on_stall: impl FnMut(),
    ) -> u64 {
        let _claim = self.claim.lock();
        let sequence = self.cursor.load(Ordering::Acquire);

        {
            let mut signal = self.signal.lock();
            while sequence >= self.min_gating(sequence) + self.capacity {
                if self.freed.wait_for(&mut signal, interval).timed_out() {
                    MutexGuard::unlocked(&mut signal, &mut on_stall);
                }
            }
        }

        *self.slots[(sequence & self.mask) as usize].write() = Some(value);

        let _signal = self.signal.lock();
        self.cursor.store(sequence + 1, Ordering::Release);
        self.available.notify_all();
        sequence
    }

    /// Block until the cursor has moved past `next` or `halted` is set.
    ///
    /// Returns the cursor, or `None` when halted.
    pub fn wait_for(&self, next: u64, halted: &AtomicBool) -> Option<u64> {
        let mut signal = self.signal.lock();
        loop {
            if halted.load(Ordering::SeqCst) {
                return None;
            }
            let cursor = self.cursor.load(Ordering::Acquire);
            if cursor > next {
                return Some(cursor);
            }
            self.available.wait(&mut signal);
        }
    }

    /// Read the value at `sequence`. Only valid while the caller's gating
    /// sequence is at or below `sequence`.
    pub fn get(&self, sequence: u64) -> Option<T> {
        self.slots[(sequence & self.mask) as usize].read().clone()
    }

    /// Tell a blocked writer that a consumer advanced.
    pub fn signal_freed(&self) {
        let _signal = self.signal.lock();
        self.freed.notify_all();
    }

    /// Wake every waiter on both sides.
    pub fn wake_all(&self) {
        let _signal = self.signal.lock();
        self.available.notify_all();
        self.freed.notify_all();
    }
}
