//! # Error Types
//!
//! Errors shared across crates.

use thiserror::Error;

/// Block item encoding failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EncodingError {
    /// Item could not be serialized.
    #[error("Failed to encode block item: {0}")]
    Encode(String),

    /// Bytes are not a valid block item.
    #[error("Failed to decode block item: {0}")]
    Decode(String),
}

/// Configuration errors. Raised at startup; never recovered from.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Ring buffer size is zero or negative.
    #[error("Ring buffer size must be greater than 0, got {0}")]
    NonPositiveRingBufferSize(i64),

    /// Ring buffer size is not a power of two.
    #[error("Ring buffer size must be a power of two, got {0}")]
    RingBufferSizeNotPowerOfTwo(i64),

    /// A value that must be strictly positive was not.
    #[error("{name} must be greater than 0, got {value}")]
    NonPositive { name: &'static str, value: i64 },

    /// Value could not be parsed.
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}
