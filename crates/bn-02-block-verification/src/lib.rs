//! # Block Verification Subsystem (BN-02)
//!
//! Verifies every block of the live stream as it goes by.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): SHA-384 tree hashing, results, configuration
//! - **Ports Layer** (`ports/`): `SignatureVerifier`, `ItemHasher` (outbound)
//! - **Adapters** (`adapters/`): the verification feed handler, signature verifiers
//! - **Service Layer** (`service/`): sessions, their factory and `BlockVerificationService`
//!
//! ## Block hash
//!
//! Every item between the header and the proof is a leaf of one of two
//! padded SHA-384 Merkle trees: header and event items go to the input tree,
//! results, outputs and state changes to the output tree. The proof closes
//! the block:
//!
//! ```text
//! block_hash = combine(
//!     combine(previous_block_root_hash, input_root),
//!     combine(output_root, start_of_block_state_root_hash),
//! )
//! ```
//!
//! and its signature must verify against that hash.
//!
//! ## Failure isolation
//!
//! A hashing or signature error fails only its block's result future. An
//! empty batch means the feed itself is broken: the handler stops the shared
//! `ServiceStatus` and halts the mediator.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;
pub mod test_utils;

// Re-export public API
pub use adapters::handler::StreamVerificationHandler;
pub use adapters::item_hasher::Sha384ItemHasher;
pub use adapters::signature::{DummySignatureVerifier, Ed25519SignatureVerifier};
pub use domain::config::{
    BlockVerificationSessionType, VerificationConfig, DEFAULT_HASH_COMBINE_BATCH_SIZE,
};
pub use domain::entities::{BlockVerificationStatus, LeafTree, VerificationResult};
pub use domain::errors::{HasherError, SignatureError, VerificationError};
pub use domain::future::{VerificationOutcome, VerificationResultFuture};
pub use domain::hasher::{ParallelTreeHasher, SequentialTreeHasher, StreamingTreeHasher};
pub use domain::hashing::{block_hash, combine, sha384, EMPTY_HASHES};
pub use domain::merkle::{tree_levels, BlockMerkleTreeInfo};
pub use ports::outbound::{ItemHasher, SignatureVerifier};
pub use service::factory::BlockVerificationSessionFactory;
pub use service::session::BlockVerificationSession;
pub use service::BlockVerificationService;
