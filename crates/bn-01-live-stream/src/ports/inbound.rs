//! # Inbound Ports

/// Receiver of unrecoverable-error escalations.
///
/// Called by a privileged subscriber whose failure voids trust in the whole
/// stream (verification or persistence).
pub trait Notifiable: Send + Sync {
    /// Stop accepting publications and drop every subscriber.
    fn notify_unrecoverable_error(&self);
}
