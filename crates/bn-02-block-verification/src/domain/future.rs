//! # Verification Result Future
//!
//! Completion handle of one session. Cloneable; every clone observes the same
//! single outcome. Blocking callers use [`VerificationResultFuture::wait`],
//! async callers [`VerificationResultFuture::wait_async`], and continuations
//! registered with [`VerificationResultFuture::then_accept`] run on the thread
//! that completes the session.

use crate::domain::entities::VerificationResult;
use crate::domain::errors::VerificationError;
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Either a finished verification or the reason it could not run.
pub type VerificationOutcome = Result<VerificationResult, VerificationError>;

type Callback = Box<dyn FnOnce(&VerificationOutcome) + Send>;

#[derive(Default)]
struct State {
    outcome: Option<VerificationOutcome>,
    callbacks: Vec<Callback>,
}

#[derive(Default)]
struct Inner {
    state: Mutex<State>,
    ready: Condvar,
    notify: Notify,
}

#[derive(Clone, Default)]
pub struct VerificationResultFuture {
    inner: Arc<Inner>,
}

impl VerificationResultFuture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the outcome. Only the first call wins; returns whether this call
    /// completed the future.
    pub(crate) fn complete(&self, outcome: VerificationOutcome) -> bool {
        let callbacks = {
            let mut state = self.inner.state.lock();
            if state.outcome.is_some() {
                return false;
            }
            state.outcome = Some(outcome.clone());
            std::mem::take(&mut state.callbacks)
        };

        self.inner.ready.notify_all();
        self.inner.notify.notify_waiters();
        for callback in callbacks {
            callback(&outcome);
        }
        true
    }

    pub fn is_done(&self) -> bool {
        self.inner.state.lock().outcome.is_some()
    }

    /// The outcome, if already completed.
    pub fn try_result(&self) -> Option<VerificationOutcome> {
        self.inner.state.lock().outcome.clone()
    }

    /// Block the current thread until completion.
    pub fn wait(&self) -> VerificationOutcome {
        let mut state = self.inner.state.lock();
        loop {
            if let Some(outcome) = &state.outcome {
                return outcome.clone();
            }
            self.inner.ready.wait(&mut state);
        }
    }

    /// Like [`wait`](Self::wait), giving up after `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<VerificationOutcome> {
        let mut state = self.inner.state.lock();
        if state.outcome.is_none() {
            self.inner.ready.wait_while_for(&mut state, |s| s.outcome.is_none(), timeout);
        }
        state.outcome.clone()
    }

    /// Await completion without blocking a runtime thread.
    pub async fn wait_async(&self) -> VerificationOutcome {
        loop {
            let mut notified = std::pin::pin!(self.inner.notify.notified());
            notified.as_mut().enable();
            if let Some(outcome) = self.try_result() {
                return outcome;
            }
            notified.await;
        }
    }

    /// Run `callback` with the outcome, now if already completed.
    pub fn on_complete(&self, callback: impl FnOnce(&VerificationOutcome) + Send + 'static) {
        let outcome = {
            let mut state = self.inner.state.lock();
            match &state.outcome {
                Some(outcome) => outcome.clone(),
                None => {
                    state.callbacks.push(Box::new(callback));
                    return;
                }
            }
        };
        callback(&outcome);
    }

    /// Run `callback` only if the session completes with a result.
    pub fn then_accept(&self, callback: impl FnOnce(&VerificationResult) + Send + 'static) {
        self.on_complete(move |outcome| {
            if let Ok(result) = outcome {
                callback(result);
            }
        });
    }
}

impl fmt::Debug for VerificationResultFuture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationResultFuture")
            .field("done", &self.is_done())
            .finish()
    }
}
