//! # Block Verification Session
//!
//! One session per block. [`SessionCore`] is the state machine: it routes
//! leaf hashes into the input and output trees and finalizes on the block
//! proof. [`BlockVerificationSession`] decides where the core runs:
//!
//! - **Inline** (sync): on the caller's thread, errors are also returned.
//! - **Dedicated worker** (async): on a thread owned by the session, fed in
//!   submission order through a queue; `append_block_items` returns at once.
//!
//! ```text
//! RUNNING ──proof, signature ok──▶ VERIFIED
//!    │    ──proof, signature bad─▶ INVALID_HASH_OR_SIGNATURE
//!    │    ──hash/signature error─▶ ERROR
//!    └────dropped while running──▶ ERROR (abandoned)
//! ```

use crate::domain::config::BlockVerificationSessionType;
use crate::domain::entities::{BlockVerificationStatus, LeafTree, VerificationResult};
use crate::domain::errors::VerificationError;
use crate::domain::future::VerificationResultFuture;
use crate::domain::hasher::StreamingTreeHasher;
use crate::domain::hashing::block_hash;
use crate::domain::merkle::{tree_levels, BlockMerkleTreeInfo};
use crate::ports::outbound::{ItemHasher, SignatureVerifier};
use block_node_telemetry::VerificationMetrics;
use bn_01_live_stream::BatchEvent;
use parking_lot::Mutex;
use shared_types::{hash_hex, BlockItemBatch, BlockProof, Hash};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Collaborators shared by every session of a factory.
#[derive(Clone)]
pub(crate) struct SessionContext {
    pub item_hasher: Arc<dyn ItemHasher>,
    pub signature_verifier: Arc<dyn SignatureVerifier>,
    pub metrics: VerificationMetrics,
    pub merkle_diagnostics: bool,
}

#[derive(Default)]
struct LeafRecord {
    input: Vec<Hash>,
    output: Vec<Hash>,
}

pub(crate) struct SessionCore {
    block_number: u64,
    input: Box<dyn StreamingTreeHasher>,
    output: Box<dyn StreamingTreeHasher>,
    context: SessionContext,
    leaves: Option<LeafRecord>,
    started: Instant,
    running: Arc<AtomicBool>,
    result: VerificationResultFuture,
}

impl SessionCore {
    pub(crate) fn new(
        block_number: u64,
        input: Box<dyn StreamingTreeHasher>,
        output: Box<dyn StreamingTreeHasher>,
        context: SessionContext,
    ) -> Self {
        let leaves = context.merkle_diagnostics.then(LeafRecord::default);
        Self {
            block_number,
            input,
            output,
            context,
            leaves,
            started: Instant::now(),
            running: Arc::new(AtomicBool::new(true)),
            result: VerificationResultFuture::new(),
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Process one batch. A failure has already been recorded on the result
    /// future when it is returned.
    fn handle(&mut self, batch: &BlockItemBatch) -> Result<(), VerificationError> {
        if !self.is_running() {
            warn!(
                block_number = self.block_number,
                items = batch.len(),
                "Session is not running, ignoring block items"
            );
            return Ok(());
        }

        self.process(batch).inspect_err(|e| self.fail(e.clone()))
    }

    fn process(&mut self, batch: &BlockItemBatch) -> Result<(), VerificationError> {
        for item in batch.items() {
            let Some(tree) = LeafTree::for_kind(item.kind()) else {
                continue;
            };
            let leaf = self.context.item_hasher.leaf_hash(item)?;
            match tree {
                LeafTree::Input => self.input.add_leaf(&leaf)?,
                LeafTree::Output => self.output.add_leaf(&leaf)?,
            }
            if let Some(record) = &mut self.leaves {
                match tree {
                    LeafTree::Input => record.input.push(leaf),
                    LeafTree::Output => record.output.push(leaf),
                }
            }
        }

        if let Some(proof) = batch.block_proof() {
            self.finalize(proof)?;
        }
        Ok(())
    }

    fn finalize(&mut self, proof: &BlockProof) -> Result<(), VerificationError> {
        let input_root = self.input.root_hash()?;
        let output_root = self.output.root_hash()?;
        let block_hash = block_hash(&input_root, &output_root, proof);

        let verified = self
            .context
            .signature_verifier
            .verify(&block_hash, &proof.block_signature)?;

        let metrics = &self.context.metrics;
        let status = if verified {
            metrics
                .verification_latency
                .observe(self.started.elapsed().as_secs_f64());
            metrics.blocks_verified.inc();
            BlockVerificationStatus::Verified
        } else {
            metrics.blocks_failed.inc();
            BlockVerificationStatus::InvalidHashOrSignature
        };

        let merkle_tree_info = self.leaves.take().map(|record| BlockMerkleTreeInfo {
            input_tree: tree_levels(&record.input),
            output_tree: tree_levels(&record.output),
            previous_block_root_hash: proof.previous_block_root_hash,
            start_of_block_state_root_hash: proof.start_of_block_state_root_hash,
            block_hash,
        });

        info!(
            block_number = self.block_number,
            block_hash = %hash_hex(&block_hash),
            input_leaves = self.input.leaf_count(),
            output_leaves = self.output.leaf_count(),
            %status,
            "Block verification finished"
        );

        self.running.store(false, Ordering::Release);
        self.result.complete(Ok(VerificationResult {
            block_number: self.block_number,
            block_hash,
            status,
            merkle_tree_info,
        }));
        Ok(())
    }

    fn fail(&mut self, error: VerificationError) {
        self.running.store(false, Ordering::Release);
        self.context.metrics.verification_errors.inc();
        warn!(
            block_number = self.block_number,
            error = %error,
            "Block verification failed"
        );
        self.result.complete(Err(error));
    }
}

impl Drop for SessionCore {
    fn drop(&mut self) {
        if self.running.swap(false, Ordering::AcqRel) {
            debug!(
                block_number = self.block_number,
                "Session dropped before its block proof"
            );
            self.result.complete(Err(VerificationError::SessionAbandoned {
                block_number: self.block_number,
            }));
        }
    }
}

enum Strategy {
    Inline(Mutex<SessionCore>),
    DedicatedWorker(mpsc::Sender<BatchEvent>),
}

/// Verification of one block, driven by `append_block_items`.
pub struct BlockVerificationSession {
    block_number: u64,
    session_type: BlockVerificationSessionType,
    running: Arc<AtomicBool>,
    result: VerificationResultFuture,
    strategy: Strategy,
}

impl BlockVerificationSession {
    pub(crate) fn inline(core: SessionCore) -> Self {
        Self {
            block_number: core.block_number,
            session_type: BlockVerificationSessionType::Sync,
            running: core.running.clone(),
            result: core.result.clone(),
            strategy: Strategy::Inline(Mutex::new(core)),
        }
    }

    pub(crate) fn dedicated(core: SessionCore) -> Result<Self, VerificationError> {
        let block_number = core.block_number;
        let running = core.running.clone();
        let result = core.result.clone();
        let (queue, batches) = mpsc::channel();

        thread::Builder::new()
            .name(format!("bn-verify-{block_number}"))
            .spawn(move || run_worker(core, batches))
            .map_err(|e| VerificationError::WorkerUnavailable {
                block_number,
                reason: e.to_string(),
            })?;

        Ok(Self {
            block_number,
            session_type: BlockVerificationSessionType::Async,
            running,
            result,
            strategy: Strategy::DedicatedWorker(queue),
        })
    }

    /// Feed the next batch of this block.
    ///
    /// Ignored with a warning once the session finished. The inline strategy
    /// returns processing errors; the worker strategy reports them only
    /// through the result future.
    pub fn append_block_items(&self, batch: &BatchEvent) -> Result<(), VerificationError> {
        if !self.is_running() {
            warn!(
                block_number = self.block_number,
                items = batch.len(),
                "Session is not running, ignoring block items"
            );
            return Ok(());
        }

        match &self.strategy {
            Strategy::Inline(core) => core.lock().handle(batch),
            Strategy::DedicatedWorker(queue) => {
                if queue.send(batch.clone()).is_err() {
                    debug!(
                        block_number = self.block_number,
                        "Verification worker already finished"
                    );
                }
                Ok(())
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn block_number(&self) -> u64 {
        self.block_number
    }

    pub fn session_type(&self) -> BlockVerificationSessionType {
        self.session_type
    }

    /// Completion handle; clone it to outlive the session.
    pub fn result(&self) -> &VerificationResultFuture {
        &self.result
    }
}

fn run_worker(mut core: SessionCore, batches: mpsc::Receiver<BatchEvent>) {
    debug!(block_number = core.block_number, "Verification worker started");
    for batch in batches {
        // Failures are recorded on the result future by the core.
        let _ = core.handle(&batch);
        if !core.is_running() {
            break;
        }
    }
    debug!(block_number = core.block_number, "Verification worker stopped");
}
