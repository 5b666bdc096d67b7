//! # Verification Configuration

use shared_types::ConfigError;
use std::fmt;
use std::str::FromStr;

/// Default number of node hashes combined per parallel batch.
pub const DEFAULT_HASH_COMBINE_BATCH_SIZE: usize = 32;

/// How a session schedules its work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockVerificationSessionType {
    /// Process each batch on the caller's thread with sequential hashers.
    Sync,
    /// Process batches on a dedicated per-session worker with parallel hashers.
    #[default]
    Async,
}

impl FromStr for BlockVerificationSessionType {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sync" => Ok(Self::Sync),
            "async" => Ok(Self::Async),
            _ => Err(ConfigError::InvalidValue {
                name: "verification session type",
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for BlockVerificationSessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync => f.write_str("sync"),
            Self::Async => f.write_str("async"),
        }
    }
}

/// Block verification settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationConfig {
    /// Subscribe the verification feed at all.
    pub enabled: bool,
    pub session_type: BlockVerificationSessionType,
    hash_combine_batch_size: usize,
    /// Attach full Merkle trees to every result.
    pub merkle_diagnostics: bool,
}

impl VerificationConfig {
    /// Validated configuration; the batch size must be positive.
    pub fn new(
        enabled: bool,
        session_type: BlockVerificationSessionType,
        hash_combine_batch_size: usize,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            enabled,
            session_type,
            hash_combine_batch_size: validate_batch_size(hash_combine_batch_size)?,
            merkle_diagnostics: false,
        })
    }

    #[must_use]
    pub fn with_session_type(mut self, session_type: BlockVerificationSessionType) -> Self {
        self.session_type = session_type;
        self
    }

    pub fn with_hash_combine_batch_size(mut self, size: usize) -> Result<Self, ConfigError> {
        self.hash_combine_batch_size = validate_batch_size(size)?;
        Ok(self)
    }

    #[must_use]
    pub fn with_merkle_diagnostics(mut self, enabled: bool) -> Self {
        self.merkle_diagnostics = enabled;
        self
    }

    #[must_use]
    pub fn hash_combine_batch_size(&self) -> usize {
        self.hash_combine_batch_size
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            session_type: BlockVerificationSessionType::Async,
            hash_combine_batch_size: DEFAULT_HASH_COMBINE_BATCH_SIZE,
            merkle_diagnostics: false,
        }
    }
}

fn validate_batch_size(size: usize) -> Result<usize, ConfigError> {
    if size == 0 {
        return Err(ConfigError::NonPositive {
            name: "hash combine batch size",
            value: 0,
        });
    }
    Ok(size)
}
