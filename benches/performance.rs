//! Performance benchmarks for the pending queue.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use greenfinch_profiles::mutation::{append_action, set_action};
use greenfinch_profiles::{
    ChannelDispatcher, Client, ClientConfig, FileQueueStorage, MemoryQueueStorage, PendingQueue,
};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

/// Benchmark merging repeated `$set` calls into one slot
fn bench_enqueue_merge(c: &mut Criterion) {
    let queue = PendingQueue::open(Box::new(MemoryQueueStorage::new())).unwrap();

    c.bench_function("enqueue_merge", |b| {
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            let record = set_action((format!("key_{}", i % 64), json!(i)));
            black_box(queue.enqueue(&record).unwrap());
        });
    });
}

/// Benchmark enqueue against the file-backed queue (one save per call)
fn bench_enqueue_durable(c: &mut Criterion) {
    let mut group = c.benchmark_group("enqueue_durable");

    for buffered in [0usize, 100, 1000] {
        group.bench_with_input(
            BenchmarkId::new("buffered_appends", buffered),
            &buffered,
            |b, &buffered| {
                let dir = TempDir::new().unwrap();
                let queue =
                    PendingQueue::open(Box::new(FileQueueStorage::open(dir.path()).unwrap()))
                        .unwrap();
                for i in 0..buffered {
                    queue.enqueue(&append_action(("events", i))).unwrap();
                }

                b.iter(|| {
                    black_box(queue.enqueue(&set_action(("Plan", "gold"))).unwrap());
                });
            },
        );
    }

    group.finish();
}

/// Benchmark identify draining a full queue into the dispatcher
fn bench_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("drain");

    for appends in [10usize, 100, 500] {
        group.bench_with_input(BenchmarkId::new("appends", appends), &appends, |b, &n| {
            b.iter_batched(
                || {
                    let (dispatcher, receiver) = ChannelDispatcher::bounded(n + 8, false);
                    let client = Client::new(ClientConfig::default(), Arc::new(dispatcher)).unwrap();
                    client.people().set(("Plan", "gold"), None).unwrap();
                    for i in 0..n {
                        client.people().append(("events", i), None).unwrap();
                    }
                    (client, receiver)
                },
                |(client, receiver)| {
                    black_box(client.identify("user-42"));
                    black_box(receiver.try_iter().count());
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_enqueue_merge, bench_enqueue_durable, bench_drain);
criterion_main!(benches);
