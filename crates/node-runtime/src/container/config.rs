//! # Node Configuration
//!
//! Unified configuration for the mediator, live consumers and verification,
//! loaded from `BN_*` environment variables. Every unset variable keeps its
//! default; every malformed one fails startup.

use bn_01_live_stream::ConsumerConfig;
use bn_02_block_verification::{BlockVerificationSessionType, VerificationConfig};
use shared_bus::{validate_ring_buffer_size, MediatorConfig};
use shared_types::ConfigError;

/// Complete node configuration.
#[derive(Debug, Clone)]
pub struct BlockNodeConfig {
    pub mediator: MediatorConfig,
    pub consumer: ConsumerConfig,
    pub verification: VerificationConfig,
    /// Threads of the shared hash-combining pool.
    pub verifier_threads: usize,
    /// Hex-encoded Ed25519 ledger key; unset accepts every signature.
    pub ledger_public_key: Option<String>,
}

impl Default for BlockNodeConfig {
    fn default() -> Self {
        Self {
            mediator: MediatorConfig::default(),
            consumer: ConsumerConfig::default(),
            verification: VerificationConfig::default(),
            verifier_threads: num_cpus::get(),
            ledger_public_key: None,
        }
    }
}

impl BlockNodeConfig {
    /// Load configuration from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `BN_RING_BUFFER_SIZE`: ring slots, positive power of two (default: 1024)
    /// - `BN_CONSUMER_TIMEOUT_MS`: live consumer liveness window (default: 1500)
    /// - `BN_VERIFICATION_ENABLED`: subscribe the verification feed (default: true)
    /// - `BN_VERIFICATION_SESSION_TYPE`: `sync` or `async` (default: async)
    /// - `BN_HASH_COMBINE_BATCH_SIZE`: parallel hashing batch (default: 32)
    /// - `BN_MERKLE_DIAGNOSTICS`: attach full trees to results (default: false)
    /// - `BN_VERIFIER_THREADS`: hashing pool threads (default: CPU count)
    /// - `BN_LEDGER_PUBLIC_KEY`: hex Ed25519 key checking block signatures
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup` instead of the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(value) = var("BN_RING_BUFFER_SIZE") {
            let size = parse_i64("ring buffer size", &value)?;
            config.mediator = MediatorConfig::new(validate_ring_buffer_size(size)?)?;
        }

        if let Some(value) = var("BN_CONSUMER_TIMEOUT_MS") {
            let millis = parse_i64("consumer timeout", &value)?;
            let millis = u64::try_from(millis).map_err(|_| ConfigError::NonPositive {
                name: "consumer timeout",
                value: millis,
            })?;
            config.consumer = ConsumerConfig::new(millis)?;
        }

        if let Some(value) = var("BN_VERIFICATION_ENABLED") {
            config.verification.enabled = parse_bool("verification enabled", &value)?;
        }

        if let Some(value) = var("BN_VERIFICATION_SESSION_TYPE") {
            config.verification.session_type = value.parse::<BlockVerificationSessionType>()?;
        }

        if let Some(value) = var("BN_HASH_COMBINE_BATCH_SIZE") {
            let size = parse_positive("hash combine batch size", &value)?;
            config.verification = config.verification.with_hash_combine_batch_size(size)?;
        }

        if let Some(value) = var("BN_MERKLE_DIAGNOSTICS") {
            config.verification.merkle_diagnostics = parse_bool("merkle diagnostics", &value)?;
        }

        if let Some(value) = var("BN_VERIFIER_THREADS") {
            config.verifier_threads = parse_positive("verifier threads", &value)?;
        }

        config.ledger_public_key = var("BN_LEDGER_PUBLIC_KEY");

        Ok(config)
    }
}

fn parse_i64(name: &'static str, value: &str) -> Result<i64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name,
        value: value.to_string(),
    })
}

fn parse_positive(name: &'static str, value: &str) -> Result<usize, ConfigError> {
    let parsed = parse_i64(name, value)?;
    if parsed <= 0 {
        return Err(ConfigError::NonPositive {
            name,
            value: parsed,
        });
    }
    usize::try_from(parsed).map_err(|_| ConfigError::InvalidValue {
        name,
        value: value.to_string(),
    })
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name,
            value: value.to_string(),
        }),
    }
}
