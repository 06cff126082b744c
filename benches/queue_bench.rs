// Measures producer push throughput on the bounded sample queue (C1) under
// an empty and a nearly-full consumer, the two regimes the vendor callback
// thread actually sees.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use bic_bridge_engine::queue::stream;

fn bench_queue_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_push");

    group.bench_function(BenchmarkId::new("drained", "cap_1000"), |b| {
        let (tx, rx) = stream::<u64>("bench", 1000);
        let consumer = std::thread::spawn(move || {
            let mut n = 0u64;
            while rx.pop().is_some() {
                n += 1;
                if n == u64::MAX {
                    break;
                }
            }
        });

        b.iter(|| {
            for i in 0..500u64 {
                black_box(tx.push(i));
            }
        });

        drop(tx);
        let _ = consumer.join();
    });

    group.bench_function(BenchmarkId::new("full", "cap_8"), |b| {
        let (tx, _rx) = stream::<u64>("bench-full", 8);
        for i in 0..8u64 {
            let _ = tx.push(i);
        }

        b.iter(|| {
            for i in 0..500u64 {
                black_box(tx.push(i));
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_queue_push);
criterion_main!(benches);
