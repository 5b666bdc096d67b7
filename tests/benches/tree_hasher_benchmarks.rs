//! # Streaming Tree Hasher Benchmarks
//!
//! | Hasher | Concern |
//! |--------|---------|
//! | Sequential | Per-leaf cost of the carry-ripple fold |
//! | Parallel | Batch size vs. pool scheduling overhead |
//! | Ed25519 | Proof signature check per block |

use bn_02_block_verification::{
    sha384, Ed25519SignatureVerifier, ParallelTreeHasher, SequentialTreeHasher,
    SignatureVerifier, StreamingTreeHasher,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ed25519_dalek::{Signer, SigningKey};
use rand::Rng;
use shared_types::Hash;
use std::sync::Arc;
use std::time::Duration;

const LEAF_COUNTS: [usize; 3] = [1_000, 10_000, 100_000];

fn random_leaves(count: usize) -> Vec<Hash> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| {
            let mut seed = [0u8; 32];
            rng.fill(&mut seed);
            sha384(&seed)
        })
        .collect()
}

fn fold(hasher: &mut dyn StreamingTreeHasher, leaves: &[Hash]) -> Hash {
    for leaf in leaves {
        hasher.add_leaf(leaf).unwrap();
    }
    hasher.root_hash().unwrap()
}

// ============================================================================
// Sequential
// ============================================================================

fn bench_sequential_hasher(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree-hasher-sequential");
    group.measurement_time(Duration::from_secs(10));

    for count in LEAF_COUNTS {
        let leaves = random_leaves(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &leaves, |b, leaves| {
            b.iter(|| black_box(fold(&mut SequentialTreeHasher::new(), leaves)))
        });
    }

    group.finish();
}

// ============================================================================
// Parallel
// ============================================================================

fn bench_parallel_hasher(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree-hasher-parallel");
    group.measurement_time(Duration::from_secs(10));

    let pool = Arc::new(
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads())
            .build()
            .unwrap(),
    );

    for count in LEAF_COUNTS {
        let leaves = random_leaves(count);
        group.throughput(Throughput::Elements(count as u64));

        for batch_size in [16, 32, 256] {
            group.bench_with_input(
                BenchmarkId::new(format!("batch-{batch_size}"), count),
                &leaves,
                |b, leaves| {
                    b.iter(|| {
                        let mut hasher = ParallelTreeHasher::new(pool.clone(), batch_size);
                        black_box(fold(&mut hasher, leaves))
                    })
                },
            );
        }
    }

    group.finish();
}

fn num_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

// ============================================================================
// Proof signature
// ============================================================================

fn bench_proof_signature(c: &mut Criterion) {
    let mut group = c.benchmark_group("proof-signature");

    let key = SigningKey::from_bytes(&[3u8; 32]);
    let verifier = Ed25519SignatureVerifier::new(key.verifying_key());
    let block_hash = sha384(b"block");
    let signature = key.sign(&block_hash).to_bytes();

    group.bench_function("ed25519_verify", |b| {
        b.iter(|| black_box(verifier.verify(&block_hash, &signature).unwrap()))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_sequential_hasher,
    bench_parallel_hasher,
    bench_proof_signature,
);

criterion_main!(benches);
