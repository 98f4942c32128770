//! # Settlement Core Benchmarks
//!
//! | Crate | Operation | Expected cost |
//! |-------|-----------|---------------|
//! | sc-01 Compound Merkle Path | proof → path | O(height) |
//! | sc-02 Dependency Ordering | ancestors-first sort | O(V + E) |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sc_01_compound_merkle_path::ToCompoundMerklePath;
use sc_02_dependency_ordering::sort_ancestors_first;
use shared_types::{MerkleProof, Transaction, TransactionInput};
use std::time::Duration;

// ============================================================================
// SC-01: Compound Merkle Path
// ============================================================================

fn bench_compound_merkle_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("sc-01-compound-merkle-path");

    for height in [8usize, 16, 24, 32] {
        let nodes: Vec<String> = (0..height).map(|i| format!("{i:064x}")).collect();
        let index = (1u64 << (height - 1)) + 3;
        let proof = MerkleProof::new(format!("{:064x}", u64::MAX), index, nodes);

        group.bench_with_input(BenchmarkId::new("from_proof", height), &proof, |b, proof| {
            b.iter(|| black_box(proof.to_compound_merkle_path()))
        });
    }

    group.finish();
}

// ============================================================================
// SC-02: Dependency Ordering
// ============================================================================

/// `chains` independent spend chains of `depth` transactions, interleaved
/// newest first so every child precedes its parent.
fn interleaved_chains(chains: usize, depth: usize) -> Vec<Transaction> {
    let mut batch = Vec::with_capacity(chains * depth);
    for level in (0..depth).rev() {
        for chain in 0..chains {
            let mut tx = Transaction::new(format!("c{chain}-{level}"), "");
            if level > 0 {
                tx.inputs
                    .push(TransactionInput::new(format!("c{chain}-{}", level - 1), 0));
            }
            batch.push(tx);
        }
    }
    batch
}

fn bench_dependency_ordering(c: &mut Criterion) {
    let mut group = c.benchmark_group("sc-02-dependency-ordering");
    group.measurement_time(Duration::from_secs(5));

    for size in [100usize, 1_000, 10_000] {
        let batch = interleaved_chains(size / 10, 10);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("sort_ancestors_first", size), &batch, |b, batch| {
            b.iter(|| black_box(sort_ancestors_first(batch.clone())))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compound_merkle_path, bench_dependency_ordering);
criterion_main!(benches);
