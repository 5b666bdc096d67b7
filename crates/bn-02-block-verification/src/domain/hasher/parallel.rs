//! # Parallel Tree Hasher
//!
//! Builds the tree level by level. Each level collects pending node hashes
//! into batches of `batch_size`; a full batch is combined pairwise into the
//! next level's nodes. Large batches run on the shared rayon pool, small ones
//! inline. Results are consumed strictly in dispatch order, so the next level
//! receives its nodes left to right whatever order the tasks finish in.
//!
//! Full batches are always even, so padding only happens while flushing the
//! last partial batch of a level in `root_hash`.

use super::StreamingTreeHasher;
use crate::domain::errors::HasherError;
use crate::domain::hashing::{combine, empty_hash, leaf_from_slice, root_height};
use shared_types::Hash;
use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use tracing::trace;

/// Batches smaller than this are combined on the calling thread.
pub const MIN_TO_SCHEDULE: usize = 16;

/// Combined output of one dispatched batch.
enum InFlight {
    Done(Vec<Hash>),
    Scheduled(Receiver<Vec<Hash>>),
}

#[derive(Default)]
struct Level {
    pending: Vec<Hash>,
    in_flight: VecDeque<InFlight>,
}

pub struct ParallelTreeHasher {
    pool: Arc<rayon::ThreadPool>,
    batch_size: usize,
    levels: Vec<Level>,
    leaf_count: u64,
    root: Option<Hash>,
}

impl ParallelTreeHasher {
    /// `batch_size` is rounded up to the next even number (minimum 2).
    pub fn new(pool: Arc<rayon::ThreadPool>, batch_size: usize) -> Self {
        let batch_size = batch_size.max(2);
        Self {
            pool,
            batch_size: batch_size + batch_size % 2,
            levels: vec![Level::default()],
            leaf_count: 0,
            root: None,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn level_mut(&mut self, level: usize) -> &mut Level {
        if level >= self.levels.len() {
            self.levels.resize_with(level + 1, Level::default);
        }
        &mut self.levels[level]
    }

    fn push(&mut self, level: usize, hash: Hash) {
        let batch_size = self.batch_size;
        let slot = self.level_mut(level);
        slot.pending.push(hash);
        if slot.pending.len() >= batch_size {
            self.dispatch(level);
        }
    }

    fn dispatch(&mut self, level: usize) {
        let batch = std::mem::take(&mut self.level_mut(level).pending);
        if batch.is_empty() {
            return;
        }

        let job = if batch.len() < MIN_TO_SCHEDULE {
            InFlight::Done(combine_pairs(&batch, level))
        } else {
            let (tx, rx) = mpsc::channel();
            self.pool.spawn(move || {
                // The receiver is gone only if the hasher was dropped.
                let _ = tx.send(combine_pairs(&batch, level));
            });
            trace!(level, "Scheduled combine batch");
            InFlight::Scheduled(rx)
        };
        self.levels[level].in_flight.push_back(job);
    }

    /// Feed finished batches of `level` into the level above, in dispatch
    /// order. Without `block`, stops at the first unfinished task.
    fn collect(&mut self, level: usize, block: bool) -> Result<(), HasherError> {
        while let Some(job) = self.levels[level].in_flight.pop_front() {
            let combined = match job {
                InFlight::Done(hashes) => hashes,
                InFlight::Scheduled(rx) if block => rx
                    .recv()
                    .map_err(|_| HasherError::CombineTaskFailed { level })?,
                InFlight::Scheduled(rx) => match rx.try_recv() {
                    Ok(hashes) => hashes,
                    Err(TryRecvError::Empty) => {
                        self.levels[level]
                            .in_flight
                            .push_front(InFlight::Scheduled(rx));
                        return Ok(());
                    }
                    Err(TryRecvError::Disconnected) => {
                        return Err(HasherError::CombineTaskFailed { level })
                    }
                },
            };
            for hash in combined {
                self.push(level + 1, hash);
            }
        }
        Ok(())
    }

    fn collect_ready(&mut self) -> Result<(), HasherError> {
        let mut level = 0;
        while level < self.levels.len() {
            self.collect(level, false)?;
            level += 1;
        }
        Ok(())
    }

    /// Flush every level bottom-up, waiting on outstanding tasks.
    fn final_combination(&mut self) -> Result<Hash, HasherError> {
        if self.leaf_count == 0 {
            return Ok(empty_hash(0));
        }

        let height = root_height(self.leaf_count);
        for level in 0..height {
            self.collect(level, true)?;
            self.dispatch(level);
            self.collect(level, true)?;
        }

        let top = self.level_mut(height);
        match top.pending.as_slice() {
            [root] => Ok(*root),
            _ => Err(HasherError::CombineTaskFailed { level: height }),
        }
    }
}

impl StreamingTreeHasher for ParallelTreeHasher {
    fn add_leaf(&mut self, leaf: &[u8]) -> Result<(), HasherError> {
        if self.root.is_some() {
            return Err(HasherError::RootAlreadyRequested);
        }
        let leaf = leaf_from_slice(leaf).ok_or_else(|| HasherError::invalid_leaf(leaf.len()))?;

        self.leaf_count += 1;
        self.push(0, leaf);
        self.collect_ready()
    }

    fn root_hash(&mut self) -> Result<Hash, HasherError> {
        if let Some(root) = self.root {
            return Ok(root);
        }
        let root = self.final_combination()?;
        self.root = Some(root);
        Ok(root)
    }

    fn leaf_count(&self) -> u64 {
        self.leaf_count
    }
}

/// Combine neighbours pairwise; an odd last node pairs with the empty subtree
/// of its level.
fn combine_pairs(hashes: &[Hash], level: usize) -> Vec<Hash> {
    hashes
        .chunks(2)
        .map(|pair| {
            let right = pair.get(1).copied().unwrap_or_else(|| empty_hash(level));
            combine(&pair[0], &right)
        })
        .collect()
}
