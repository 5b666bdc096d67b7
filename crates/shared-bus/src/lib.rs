//! # Shared Bus - Ring-Buffer Mediator
//!
//! Fans the block item stream out from one producer to a dynamically
//! changing set of subscribers.
//!
//! ## Architecture
//!
//! ```text
//!                    publish()
//!   ┌──────────┐ ─────────────────┐
//!   │ Producer │                  ▼
//!   └──────────┘        ┌───────────────────┐
//!                       │    Ring Buffer    │   write cursor + gating
//!                       └───────────────────┘
//!                        │        │        │
//!                        ▼        ▼        ▼     one thread per subscriber
//!                   ┌────────┐┌────────┐┌────────┐
//!                   │ live   ││ live   ││ verify │
//!                   └────────┘└────────┘└────────┘
//! ```
//!
//! - Per-subscriber delivery order equals publish order.
//! - New subscribers start at the current write position (no replay).
//! - A slot is reused only after every subscriber cursor passed it, so the
//!   producer may block on the slowest subscriber.
//! - A failing or panicking subscriber is unsubscribed; nobody else notices.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod channel;
pub mod config;
pub mod errors;
pub mod handler;
pub mod liveness;
pub mod ring_buffer;
pub mod test_utils;

// Re-export main types
pub use channel::{ItemCount, Publisher, RingBufferChannel, SubscriptionHandler};
pub use config::{validate_ring_buffer_size, MediatorConfig, DEFAULT_RING_BUFFER_SIZE};
pub use errors::{HandlerError, PublishError, SubscribeError};
pub use handler::{BlockNodeEventHandler, HandlerKey};
pub use liveness::LivenessCalculator;
pub use shared_types::ConfigError;
