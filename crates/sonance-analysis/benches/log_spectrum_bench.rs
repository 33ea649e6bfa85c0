//! Criterion benchmarks for log-spectrum rebinning
//!
//! Run with: cargo bench -p sonance-analysis

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sonance_analysis::LogRebinner;
use sonance_core::SpectrumFrame;

const SAMPLE_RATE: f32 = 48000.0;

/// Pseudo-random magnitudes in `[0, 1)`
fn generate_spectrum(size: usize) -> Vec<f32> {
    let mut state = 0x12345678u32;
    (0..size)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 8) as f32 / (1u32 << 24) as f32
        })
        .collect()
}

// ============================================================================
// Single channel
// ============================================================================

fn bench_rebin(c: &mut Criterion) {
    let mut group = c.benchmark_group("LogRebin");

    for &size in &[256, 1024, 2048, 4096, 8192] {
        let rebinner = LogRebinner::new(SAMPLE_RATE, size, 20.0, 20000.0);
        let input = generate_spectrum(size);

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(rebinner.rebin(black_box(&input))))
        });
    }

    group.finish();
}

fn bench_rebin_into(c: &mut Criterion) {
    let mut group = c.benchmark_group("LogRebin_Into");

    for &size in &[1024, 2048, 4096] {
        let rebinner = LogRebinner::new(SAMPLE_RATE, size, 20.0, 20000.0);
        let input = generate_spectrum(size);
        let mut output = vec![0.0; size];

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                rebinner.rebin_into(black_box(&input), &mut output);
                black_box(output[size - 1])
            })
        });
    }

    group.finish();
}

// ============================================================================
// Whole frames
// ============================================================================

fn bench_rebin_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("LogRebin_Frame");
    let size = 2048;
    let rebinner = LogRebinner::new(SAMPLE_RATE, size, 20.0, 20000.0);

    for &channels in &[1, 2, 6, 8] {
        let Ok(frame) = SpectrumFrame::new(vec![generate_spectrum(size); channels]) else {
            continue;
        };

        group.bench_with_input(
            BenchmarkId::from_parameter(channels),
            &channels,
            |b, _| b.iter(|| black_box(rebinner.rebin_frame(black_box(&frame)))),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_rebin, bench_rebin_into, bench_rebin_frame);

criterion_main!(benches);
