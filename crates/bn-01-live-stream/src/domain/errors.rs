//! # Sink Errors

use shared_bus::HandlerError;
use thiserror::Error;

/// Errors from sending to a downstream consumer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SinkError {
    /// The downstream consumer went away.
    #[error("Downstream consumer closed the stream")]
    Closed,

    /// The response could not be delivered.
    #[error("Failed to send response: {0}")]
    SendFailed(String),
}

impl From<SinkError> for HandlerError {
    fn from(err: SinkError) -> Self {
        match err {
            SinkError::Closed => HandlerError::SinkClosed,
            SinkError::SendFailed(reason) => HandlerError::Failed(reason),
        }
    }
}
