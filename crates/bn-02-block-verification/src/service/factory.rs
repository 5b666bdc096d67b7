//! # Session Factory

use super::session::{BlockVerificationSession, SessionContext, SessionCore};
use crate::adapters::item_hasher::Sha384ItemHasher;
use crate::domain::config::{BlockVerificationSessionType, VerificationConfig};
use crate::domain::errors::VerificationError;
use crate::domain::hasher::{ParallelTreeHasher, SequentialTreeHasher, StreamingTreeHasher};
use crate::ports::outbound::{ItemHasher, SignatureVerifier};
use block_node_telemetry::VerificationMetrics;
use shared_types::{BlockHeader, ServiceStatus};
use std::sync::Arc;
use tracing::debug;

/// Creates one session per block header, with the strategy chosen by
/// [`VerificationConfig::session_type`].
pub struct BlockVerificationSessionFactory {
    config: VerificationConfig,
    status: Arc<ServiceStatus>,
    pool: Arc<rayon::ThreadPool>,
    context: SessionContext,
}

impl BlockVerificationSessionFactory {
    pub fn new(
        config: VerificationConfig,
        status: Arc<ServiceStatus>,
        signature_verifier: Arc<dyn SignatureVerifier>,
        pool: Arc<rayon::ThreadPool>,
        metrics: VerificationMetrics,
    ) -> Self {
        let context = SessionContext {
            item_hasher: Arc::new(Sha384ItemHasher),
            signature_verifier,
            metrics,
            merkle_diagnostics: config.merkle_diagnostics,
        };
        Self {
            config,
            status,
            pool,
            context,
        }
    }

    /// Replace the leaf hashing of block items.
    #[must_use]
    pub fn with_item_hasher(mut self, item_hasher: Arc<dyn ItemHasher>) -> Self {
        self.context.item_hasher = item_hasher;
        self
    }

    pub fn config(&self) -> &VerificationConfig {
        &self.config
    }

    pub fn metrics(&self) -> &VerificationMetrics {
        &self.context.metrics
    }

    pub fn create_session(
        &self,
        header: &BlockHeader,
    ) -> Result<BlockVerificationSession, VerificationError> {
        if !self.status.is_accepting() {
            return Err(VerificationError::NotAccepting);
        }

        debug!(
            block_number = header.number,
            session_type = %self.config.session_type,
            "Creating verification session"
        );

        match self.config.session_type {
            BlockVerificationSessionType::Sync => Ok(BlockVerificationSession::inline(
                self.core(header, || Box::new(SequentialTreeHasher::new())),
            )),
            BlockVerificationSessionType::Async => {
                let batch_size = self.config.hash_combine_batch_size();
                BlockVerificationSession::dedicated(self.core(header, || {
                    Box::new(ParallelTreeHasher::new(self.pool.clone(), batch_size))
                }))
            }
        }
    }

    fn core(
        &self,
        header: &BlockHeader,
        hasher: impl Fn() -> Box<dyn StreamingTreeHasher>,
    ) -> SessionCore {
        SessionCore::new(header.number, hasher(), hasher(), self.context.clone())
    }
}
