//! # Service Status
//!
//! Process-wide "accepting new work" flag.
//!
//! Injected into the publish path, the verification handler and the session
//! factory. Once stopped it stays stopped: trust in the live stream is void
//! after verification or persistence failed, so there is no way back to
//! accepting without a restart.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error};

/// Shared accepting/not-accepting state of the block node.
#[derive(Debug)]
pub struct ServiceStatus {
    accepting: AtomicBool,
    stop_reason: Mutex<Option<String>>,
}

impl ServiceStatus {
    /// A status that is accepting work.
    pub fn new() -> Self {
        Self {
            accepting: AtomicBool::new(true),
            stop_reason: Mutex::new(None),
        }
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    /// Stop accepting new work.
    ///
    /// Returns `true` for the call that actually flipped the flag; the first
    /// reason is the one retained.
    pub fn stop_accepting(&self, reason: &str) -> bool {
        let flipped = self
            .accepting
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();

        if flipped {
            *self.stop_reason.lock() = Some(reason.to_string());
            error!(reason, "Block node stopped accepting new work");
        } else {
            debug!(reason, "Block node already stopped accepting new work");
        }
        flipped
    }

    /// Why the node stopped accepting, if it did.
    pub fn stop_reason(&self) -> Option<String> {
        self.stop_reason.lock().clone()
    }
}

impl Default for ServiceStatus {
    fn default() -> Self {
        Self::new()
    }
}
