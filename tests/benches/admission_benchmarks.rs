//! # Admission Benchmarks
//!
//! | Path | Measures |
//! |------|----------|
//! | Batch ingestion | Parse, dedup, validate and commit per batch size |
//! | Rejection path | Batches of semantically invalid blobs |
//! | Notarization | Single-flight request admission |

use criterion::{
    black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput,
};
use nc_06_tx_admission::test_utils::{TestNode, TxBuilder};
use nc_06_tx_admission::{AdmissionConfig, IngestFlags, TxAdmissionApi};
use std::time::Duration;

fn flags() -> IngestFlags {
    IngestFlags {
        suppress_relay: true,
        ..IngestFlags::default()
    }
}

fn bench_batch_ingestion(c: &mut Criterion) {
    let mut group = c.benchmark_group("nc-06-ingestion");
    group.measurement_time(Duration::from_secs(10));

    for size in [1usize, 16, 128, 512] {
        let blobs: Vec<Vec<u8>> = (0..size as u64).map(|n| TxBuilder::new(n).blob()).collect();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("admit", size), &blobs, |b, blobs| {
            b.iter_batched(
                TestNode::new,
                |node| black_box(node.service.handle_incoming_txs(blobs, flags())),
                BatchSize::PerIteration,
            )
        });
    }

    let bad: Vec<Vec<u8>> = (0..128u64)
        .map(|n| TxBuilder::new(n).offsets(vec![4, 4, 4]).blob())
        .collect();
    group.throughput(Throughput::Elements(bad.len() as u64));
    group.bench_function("reject_128", |b| {
        b.iter_batched(
            TestNode::new,
            |node| black_box(node.service.handle_incoming_txs(&bad, flags())),
            BatchSize::PerIteration,
        )
    });

    group.finish();
}

fn bench_notarization(c: &mut Criterion) {
    let mut group = c.benchmark_group("nc-06-notarization");
    let config = AdmissionConfig {
        signer_slots: 13,
        ..nc_06_tx_admission::test_utils::test_config()
    };
    let slots = format!("07{}", "-1".repeat(12));
    let blob = TxBuilder::notarization_request(1, &slots, 1, 7).blob();

    group.bench_function("submit", |b| {
        b.iter_batched(
            || TestNode::with_config(config.clone()),
            |node| black_box(node.service.handle_notarization_request(&blob, 0)),
            BatchSize::PerIteration,
        )
    });
    group.finish();
}

criterion_group!(benches, bench_batch_ingestion, bench_notarization);
criterion_main!(benches);
