// Measures throughput of the full C3 DSP chain (DC blocker -> Hampel ->
// band-pass IIR -> phase estimate) per sample and per 100-sample batch, the
// two call shapes the ingest orchestrator actually drives.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use bic_bridge_engine::dsp::DspChain;

const IIR_B: [f64; 5] = [9.447e-4, 0.0, -1.889e-3, 0.0, 9.447e-4];
const IIR_A: [f64; 5] = [1.0, -3.8610, 5.6398, -3.6932, 0.9150];

fn bench_dsp_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp_chain");

    group.bench_function(BenchmarkId::new("single_sample", "20hz_sine"), |b| {
        let mut chain = DspChain::new(IIR_B, IIR_A, 0.001);
        let mut counter = 0u32;
        b.iter(|| {
            let t = counter as f64 * 0.001;
            let value = 100.0 * (2.0 * std::f64::consts::PI * 20.0 * t).sin();
            let out = chain.process(value, false, counter);
            counter = counter.wrapping_add(1);
            black_box(out);
        });
    });

    group.bench_function(BenchmarkId::new("batch", "100_samples"), |b| {
        let mut chain = DspChain::new(IIR_B, IIR_A, 0.001);
        let mut counter = 0u32;
        b.iter(|| {
            for _ in 0..100u32 {
                let t = counter as f64 * 0.001;
                let value = 100.0 * (2.0 * std::f64::consts::PI * 20.0 * t).sin();
                let out = chain.process(value, false, counter);
                counter = counter.wrapping_add(1);
                black_box(out);
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_dsp_chain);
criterion_main!(benches);
