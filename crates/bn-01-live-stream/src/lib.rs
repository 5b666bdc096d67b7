//! # Live Stream Subsystem (BN-01)
//!
//! Publishes producer batches into the ring-buffer channel and hands them to
//! live consumers.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): consumer configuration, sink errors
//! - **Ports Layer** (`ports/`): `Notifiable` (inbound), `ResponseSender` (outbound)
//! - **Adapters** (`adapters/`): the liveness-checked live consumer and its senders
//! - **Service Layer** (`service.rs`): `LiveStreamMediator`
//!
//! ## Global halt
//!
//! An unrecoverable error in a privileged subscriber (the verification feed)
//! reaches the mediator through [`Notifiable::notify_unrecoverable_error`]:
//! the shared `ServiceStatus` stops accepting, every subscriber is dropped and
//! further publications fail with `PublishError::NotAccepting`.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

use shared_types::BlockItemBatch;
use std::sync::Arc;

/// Unit of publication on the live stream.
pub type BatchEvent = Arc<BlockItemBatch>;

// Re-export public API
pub use adapters::consumer::LivenessCheckedHandler;
pub use adapters::senders::{BlockBoundarySender, ChannelResponseSender};
pub use domain::config::{ConsumerConfig, DEFAULT_CONSUMER_TIMEOUT_MILLIS};
pub use domain::errors::SinkError;
pub use ports::inbound::Notifiable;
pub use ports::outbound::ResponseSender;
pub use service::LiveStreamMediator;
