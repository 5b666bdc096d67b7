//! # Service Layer
//!
//! - `session`: per-block state machine and its two scheduling strategies
//! - `factory`: picks the strategy and injects shared collaborators
//! - [`BlockVerificationService`]: splits the item stream into sessions

pub mod factory;
pub mod session;

use crate::domain::errors::VerificationError;
use bn_01_live_stream::BatchEvent;
use factory::BlockVerificationSessionFactory;
use session::BlockVerificationSession;
use shared_types::hash_hex;
use tracing::{debug, warn};

/// Opens a session on every block header and feeds it until the next one.
///
/// On each new header the previous session's block hash is checked against
/// the header's claimed previous block hash once that session completes.
pub struct BlockVerificationService {
    factory: BlockVerificationSessionFactory,
    current: Option<BlockVerificationSession>,
}

impl BlockVerificationService {
    pub fn new(factory: BlockVerificationSessionFactory) -> Self {
        Self {
            factory,
            current: None,
        }
    }

    /// Session of the block currently streaming, if a header was seen.
    pub fn current_session(&self) -> Option<&BlockVerificationSession> {
        self.current.as_ref()
    }

    /// Route one batch.
    ///
    /// Only protocol violations (an empty batch) and failures to open a
    /// session are returned; verification errors fail their own session.
    pub fn on_block_items_received(&mut self, batch: &BatchEvent) -> Result<(), VerificationError> {
        if batch.is_empty() {
            return Err(VerificationError::EmptyBatch);
        }

        if let Some(header) = batch.block_header() {
            let metrics = self.factory.metrics();
            metrics.blocks_received.inc();

            match &self.current {
                Some(previous) => {
                    let claimed = header.previous_block_hash;
                    let block_number = header.number;
                    let blocks_failed = metrics.blocks_failed.clone();
                    previous.result().then_accept(move |result| {
                        if result.block_hash != claimed {
                            warn!(
                                block_number,
                                previous_block_number = result.block_number,
                                claimed = %hash_hex(&claimed),
                                computed = %hash_hex(&result.block_hash),
                                "Previous block hash mismatch"
                            );
                            blocks_failed.inc();
                        }
                    });
                }
                None => debug!(
                    block_number = header.number,
                    "No previous session to check block linkage against"
                ),
            }

            let session = self.factory.create_session(header)?;
            // Session failures are recorded and logged on its result future.
            let _ = self.current.insert(session).append_block_items(batch);
            return Ok(());
        }

        match &self.current {
            Some(session) => {
                let _ = session.append_block_items(batch);
            }
            None => warn!(
                items = batch.len(),
                "Received block items before the first block header, ignoring"
            ),
        }
        Ok(())
    }
}
