//! # Error Types
//!
//! Errors raised by the channel and its subscribers.

use thiserror::Error;

/// Errors from `Publisher::publish`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PublishError {
    /// The node stopped accepting publications.
    #[error("Not accepting publications: {0}")]
    NotAccepting(String),
}

/// Errors from `SubscriptionHandler::subscribe`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubscribeError {
    /// The consumption thread could not be started.
    #[error("Failed to start consumer thread: {0}")]
    Spawn(String),
}

/// Errors returned by a handler's `on_event`.
///
/// Any of these gets the handler unsubscribed. Only the verification feed
/// escalates further.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HandlerError {
    /// The downstream sink went away.
    #[error("Downstream sink closed")]
    SinkClosed,

    /// The stream violated the block framing the handler relies on.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// Any other processing failure.
    #[error("Handler failed: {0}")]
    Failed(String),
}
