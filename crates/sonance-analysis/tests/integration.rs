//! Integration tests for sonance-analysis.
//!
//! Spectra are either synthesised with rustfft or pushed through the
//! in-process engine's FFT unit, then rebinned for display.

use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::FftPlanner;
use rustfft::num_complex::Complex;
use sonance_analysis::LogRebinner;
use sonance_core::{DecodingError, Error, System};
use sonance_core::mock::MockEngine;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const SAMPLE_RATE: f32 = 48_000.0;

/// Magnitudes of the first `bins` bins of a `2 * bins` point transform, so
/// the result spans 0 Hz to Nyquist the way an engine FFT unit reports it.
fn linear_spectrum(signal: &[f32], bins: usize) -> Vec<f32> {
    let size = 2 * bins;
    let mut buffer: Vec<Complex<f32>> = signal
        .iter()
        .take(size)
        .map(|&s| Complex::new(s, 0.0))
        .collect();
    buffer.resize(size, Complex::new(0.0, 0.0));
    FftPlanner::new().plan_fft_forward(size).process(&mut buffer);
    buffer[..bins]
        .iter()
        .map(|c| c.norm() / bins as f32)
        .collect()
}

fn sine(freq_hz: f32, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| (2.0 * PI * freq_hz * i as f32 / SAMPLE_RATE).sin())
        .collect()
}

fn argmax(values: &[f32]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f32::MIN), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
        .0
}

// ---------------------------------------------------------------------------
// Synthesised spectra
// ---------------------------------------------------------------------------

#[test]
fn sine_peak_lands_in_its_band() {
    let bins = 2048;
    let rebinner = LogRebinner::new(SAMPLE_RATE, bins, 20.0, 20_000.0);
    // Centred on linear bin 86 so the energy does not straddle two bins.
    let freq = 86.0 * rebinner.base_resolution();
    let linear = linear_spectrum(&sine(freq, 2 * bins), bins);
    let tone_bin = argmax(&linear);
    assert_eq!(tone_bin, 86);

    let log = rebinner.rebin(&linear);
    let band = argmax(&log);
    let (start, end) = rebinner.bin_range(band, bins).unwrap();
    assert!(
        (start..=end).contains(&tone_bin),
        "band {band} covers {start}..={end}, tone at {tone_bin}"
    );
    assert_eq!(log[band], linear[tone_bin]);
}

#[test]
fn spike_shows_up_in_every_band_covering_it() {
    let bins = 2048;
    let rebinner = LogRebinner::new(SAMPLE_RATE, bins, 20.0, 20_000.0);
    for spike in [1, 2, 43, 95, 154, 213] {
        let mut linear = vec![0.0; bins];
        linear[spike] = 1.0;
        let log = rebinner.rebin(&linear);
        for (k, &value) in log.iter().enumerate() {
            let (start, end) = rebinner.bin_range(k, bins).unwrap();
            let expected = if (start..=end).contains(&spike) { 1.0 } else { 0.0 };
            assert_eq!(value, expected, "band {k} for spike at {spike}");
        }
    }
}

#[test]
fn rebinning_is_repeatable() {
    let bins = 1024;
    let rebinner = LogRebinner::new(SAMPLE_RATE, bins, 20.0, 20_000.0);
    let linear = linear_spectrum(&sine(440.0, 2 * bins), bins);
    let first = rebinner.rebin(&linear);
    let mut second = vec![1.0; bins];
    rebinner.rebin_into(&linear, &mut second);
    assert_eq!(first, second);
}

// ---------------------------------------------------------------------------
// Engine FFT unit
// ---------------------------------------------------------------------------

#[test]
fn from_fft_reads_unit_settings() {
    let engine = Arc::new(MockEngine::new());
    let system = System::builder(engine).build().unwrap();
    let fft = system.create_fft().unwrap();

    let defaults = LogRebinner::from_fft(&fft, SAMPLE_RATE).unwrap();
    assert_eq!(defaults.window_size(), 2048);
    assert_eq!(defaults.min_freq(), 0.0);
    assert_eq!(defaults.max_freq(), 22_000.0);

    fft.set_window_size(1024).unwrap();
    fft.set_band_start_freq(20.0).unwrap();
    fft.set_band_stop_freq(20_000.0).unwrap();
    assert_eq!(
        LogRebinner::from_fft(&fft, SAMPLE_RATE).unwrap(),
        LogRebinner::new(SAMPLE_RATE, 1024, 20.0, 20_000.0)
    );
}

#[test]
fn engine_frame_rebins_per_channel() {
    let engine = Arc::new(MockEngine::new());
    let system = System::builder(engine.clone()).build().unwrap();
    let fft = system.create_fft().unwrap();
    fft.set_window_size(8).unwrap();
    fft.set_band_start_freq(20.0).unwrap();
    fft.set_band_stop_freq(20_000.0).unwrap();

    let left = [0.0f32, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    let right = [0.5f32, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
    engine.set_spectrum(fft.raw(), &[&left, &right]);

    let rebinner =
        LogRebinner::from_fft(&fft, system.sample_rate().unwrap() as f32).unwrap();
    let view = rebinner.rebin_frame(&fft.spectrum().unwrap());
    assert_eq!(view.num_channels(), 2);
    assert_eq!(view.channel(0), Some(&rebinner.rebin(&left)[..]));
    assert_eq!(view.channel(1), Some(&rebinner.rebin(&right)[..]));
    assert_eq!(view.peak_band(0), Some(7));
}

#[test]
fn negative_window_is_rejected() {
    let engine = Arc::new(MockEngine::new());
    let system = System::builder(engine).build().unwrap();
    let fft = system.create_fft().unwrap();
    fft.set_window_size(-1).unwrap();

    let err = LogRebinner::from_fft(&fft, SAMPLE_RATE).unwrap_err();
    assert!(matches!(
        err,
        Error::Decoding(DecodingError::NegativeDimension { value: -1, .. })
    ));
}
