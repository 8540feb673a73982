//! Criterion benchmarks for the streaming resampler
//!
//! Run with: cargo bench -p cadencia-core
#![allow(missing_docs)]

use cadencia_core::{Quality, Resampler, ResamplerConfig};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

const BLOCK_SIZES: &[usize] = &[1024, 4096];

fn generate_test_signal(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| (std::f64::consts::TAU * 440.0 * i as f64 / 48000.0).sin() * 0.5)
        .collect()
}

fn bench_conversion(c: &mut Criterion, name: &str, factor: f64, quality: Quality) {
    let mut group = c.benchmark_group(name);
    let config = ResamplerConfig {
        quality,
        ..ResamplerConfig::default()
    };

    for &block_size in BLOCK_SIZES {
        let input = generate_test_signal(block_size);
        group.bench_with_input(
            BenchmarkId::new("process", block_size),
            &block_size,
            |b, _| {
                let mut rate = Resampler::new(factor, &config).expect("valid config");
                let mut out = vec![0.0f64; 4 * block_size];
                b.iter(|| {
                    rate.input(black_box(&input));
                    rate.process();
                    loop {
                        let n = rate.output(&mut out);
                        if n == 0 {
                            break;
                        }
                        black_box(&out[..n]);
                    }
                });
            },
        );
    }

    group.finish();
}

fn bench_44k_to_48k(c: &mut Criterion) {
    bench_conversion(c, "44k1_to_48k_high", 44100.0 / 48000.0, Quality::High);
}

fn bench_48k_to_44k(c: &mut Criterion) {
    bench_conversion(c, "48k_to_44k1_very", 48000.0 / 44100.0, Quality::Very);
}

fn bench_halve_medium(c: &mut Criterion) {
    bench_conversion(c, "halve_medium", 2.0, Quality::Medium);
}

fn bench_quick(c: &mut Criterion) {
    bench_conversion(c, "quick_cubic", 2.0, Quality::Quick);
}

fn bench_init(c: &mut Criterion) {
    let config = ResamplerConfig::default();
    c.bench_function("init_high_44k1_to_48k", |b| {
        b.iter(|| black_box(Resampler::new(44100.0 / 48000.0, &config).expect("valid config")));
    });
}

criterion_group!(
    benches,
    bench_44k_to_48k,
    bench_48k_to_44k,
    bench_halve_medium,
    bench_quick,
    bench_init
);
criterion_main!(benches);
