//! Mediator configuration.

use shared_types::ConfigError;

/// Default number of ring buffer slots.
pub const DEFAULT_RING_BUFFER_SIZE: usize = 1024;

/// Validate a ring buffer size as read from configuration.
///
/// The size must be positive and a power of two.
pub fn validate_ring_buffer_size(size: i64) -> Result<usize, ConfigError> {
    if size <= 0 {
        return Err(ConfigError::NonPositiveRingBufferSize(size));
    }
    let size_usize =
        usize::try_from(size).map_err(|_| ConfigError::RingBufferSizeNotPowerOfTwo(size))?;
    if !size_usize.is_power_of_two() {
        return Err(ConfigError::RingBufferSizeNotPowerOfTwo(size));
    }
    Ok(size_usize)
}

/// Ring-buffer mediator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediatorConfig {
    ring_buffer_size: usize,
}

impl MediatorConfig {
    /// Create a validated configuration.
    pub fn new(ring_buffer_size: usize) -> Result<Self, ConfigError> {
        let as_i64 = i64::try_from(ring_buffer_size).map_err(|_| ConfigError::InvalidValue {
            name: "ring_buffer_size",
            value: ring_buffer_size.to_string(),
        })?;
        Ok(Self {
            ring_buffer_size: validate_ring_buffer_size(as_i64)?,
        })
    }

    #[must_use]
    pub fn ring_buffer_size(&self) -> usize {
        self.ring_buffer_size
    }
}

impl Default for MediatorConfig {
    fn default() -> Self {
        Self {
            ring_buffer_size: DEFAULT_RING_BUFFER_SIZE,
        }
    }
}
