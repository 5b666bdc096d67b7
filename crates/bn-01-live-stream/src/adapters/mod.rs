//! # Adapters
//!
//! - `consumer`: the live-consumer subscriber (liveness wrapper)
//! - `senders`: `ResponseSender` implementations

pub mod consumer;
pub mod senders;
