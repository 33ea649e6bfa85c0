//! Log-frequency rebinning of linear magnitude spectra.
//!
//! An FFT unit reports `N` bins spread evenly from 0 Hz to Nyquist. For
//! display, [`LogRebinner`] maps them onto `N` bands spaced evenly in
//! `log2(f + 1)` between a minimum and maximum frequency. Each band takes the
//! **maximum** of the linear bins it covers, so narrow peaks survive the
//! remap.
//!
//! # Resolution escalation
//!
//! The Hz-per-bin figure used to locate linear bins starts at
//! `(sample_rate / 2) / window_size` and doubles when the output index reaches
//! each entry of [`RESOLUTION_BREAKPOINTS`]. The doubling is cumulative, so
//! with the default breakpoints bands `100..1600` use twice the base
//! resolution, `1600..1950` four times and everything from `1950` up eight
//! times.
//!
//! # Example
//!
//! ```rust
//! use sonance_analysis::LogRebinner;
//!
//! let rebinner = LogRebinner::new(48_000.0, 2048, 20.0, 20_000.0);
//! assert_eq!(rebinner.bin_range(0, 2048), Some((1, 1)));
//! assert_eq!(rebinner.bin_range(2047, 2048), Some((212, 213)));
//!
//! let silence = vec![0.0; 2048];
//! assert!(rebinner.rebin(&silence).iter().all(|&v| v == 0.0));
//! ```

use sonance_core::{DecodingError, FftDsp, SpectrumFrame};

/// Output indices at which the running resolution doubles.
pub const RESOLUTION_BREAKPOINTS: [usize; 3] = [100, 1600, 1950];

/// Remaps linear spectra onto log-spaced bands.
///
/// Stateless between calls: the same input always produces the same output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogRebinner {
    sample_rate: f32,
    window_size: usize,
    min_freq: f32,
    max_freq: f32,
}

impl LogRebinner {
    /// Creates a rebinner for spectra from a `window_size` transform at
    /// `sample_rate`, spreading output bands over `[min_freq, max_freq]` Hz.
    pub fn new(sample_rate: f32, window_size: usize, min_freq: f32, max_freq: f32) -> Self {
        Self {
            sample_rate,
            window_size,
            min_freq,
            max_freq,
        }
    }

    /// Reads window size and band range from a live FFT unit.
    pub fn from_fft(fft: &FftDsp, sample_rate: f32) -> sonance_core::Result<Self> {
        let size = fft.window_size()?;
        let window_size = usize::try_from(size).map_err(|_| DecodingError::NegativeDimension {
            what: "FFT window size",
            value: size,
        })?;
        Ok(Self::new(
            sample_rate,
            window_size,
            fft.band_start_freq()?,
            fft.band_stop_freq()?,
        ))
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Transform length.
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Lowest band edge in Hz.
    pub fn min_freq(&self) -> f32 {
        self.min_freq
    }

    /// Highest band edge in Hz.
    pub fn max_freq(&self) -> f32 {
        self.max_freq
    }

    /// Hz per linear bin before any escalation.
    pub fn base_resolution(&self) -> f32 {
        self.sample_rate / 2.0 / self.window_size as f32
    }

    /// Hz per linear bin used for output band `k`.
    pub fn resolution_at(&self, k: usize) -> f32 {
        RESOLUTION_BREAKPOINTS
            .iter()
            .filter(|&&breakpoint| breakpoint <= k)
            .fold(self.base_resolution(), |res, _| res * 2.0)
    }

    /// Start and end frequency in Hz of output band `k` out of `n`.
    pub fn band_edges(&self, k: usize, n: usize) -> (f32, f32) {
        let log_min = log2(self.min_freq + 1.0);
        let log_max = log2(self.max_freq + 1.0);
        let span = log_max - log_min;
        let start = log_min + span * (k as f32 / n as f32);
        let end = log_min + span * ((k + 1) as f32 / n as f32);
        (exp2(start), exp2(end))
    }

    /// Inclusive range of linear bins that feed output band `k` out of `n`.
    ///
    /// Returns `None` when `k` is not a band of an `n`-bin spectrum.
    pub fn bin_range(&self, k: usize, n: usize) -> Option<(usize, usize)> {
        if k >= n {
            return None;
        }
        Some(self.clamped_range(k, n, self.resolution_at(k)))
    }

    /// Rebins one channel into a new vector of the same length.
    pub fn rebin(&self, input: &[f32]) -> Vec<f32> {
        let mut output = vec![0.0; input.len()];
        self.rebin_into(input, &mut output);
        output
    }

    /// Rebins one channel into `output` without allocating.
    ///
    /// # Panics
    ///
    /// Panics if `output` and `input` differ in length.
    pub fn rebin_into(&self, input: &[f32], output: &mut [f32]) {
        assert_eq!(
            input.len(),
            output.len(),
            "log spectrum must match its source length"
        );
        let n = input.len();
        let mut resolution = self.base_resolution();
        for (k, out) in output.iter_mut().enumerate() {
            if RESOLUTION_BREAKPOINTS.contains(&k) {
                resolution *= 2.0;
            }
            let (start, end) = self.clamped_range(k, n, resolution);
            *out = input
                .get(start..=end)
                .unwrap_or_default()
                .iter()
                .fold(0.0, |max, &v| if v > max { v } else { max });
        }
    }

    /// Rebins every channel of an analyser frame.
    pub fn rebin_frame(&self, frame: &SpectrumFrame) -> LogSpectrum {
        let channels = frame
            .channels()
            .iter()
            .map(|channel| self.rebin(channel))
            .collect();
        LogSpectrum {
            length: frame.length(),
            channels,
            rebinner: *self,
        }
    }

    fn clamped_range(&self, k: usize, n: usize, resolution: f32) -> (usize, usize) {
        let (start_hz, end_hz) = self.band_edges(k, n);
        let last = n - 1;
        // Float to int casts saturate: negatives and NaN land on 0.
        let start = ((start_hz / resolution).floor() as usize).min(last);
        let end = ((end_hz / resolution).floor() as usize).min(last);
        (start, end)
    }
}

fn log2(x: f32) -> f32 {
    f64::from(x).log2() as f32
}

fn exp2(x: f32) -> f32 {
    f64::from(x).exp2() as f32
}

/// Per-channel log-frequency view of a [`SpectrumFrame`].
///
/// Every channel has the length of the frame it was computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct LogSpectrum {
    length: usize,
    channels: Vec<Vec<f32>>,
    rebinner: LogRebinner,
}

impl LogSpectrum {
    /// Bands per channel.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Number of channels.
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Bands of one channel.
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// All channels.
    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Consumes the view, returning the channel bands.
    pub fn into_channels(self) -> Vec<Vec<f32>> {
        self.channels
    }

    /// The rebinner that produced this view.
    pub fn rebinner(&self) -> &LogRebinner {
        &self.rebinner
    }

    /// Geometric centre of band `k` in Hz.
    pub fn band_center(&self, k: usize) -> f32 {
        let (start, end) = self.rebinner.band_edges(k, self.length);
        (start * end).sqrt()
    }

    /// Index of the loudest band of `channel`, first one on ties.
    pub fn peak_band(&self, channel: usize) -> Option<usize> {
        let bands = self.channel(channel)?;
        bands
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f32)>, (k, &v)| match best {
                Some((_, max)) if max >= v => best,
                _ => Some((k, v)),
            })
            .map(|(k, _)| k)
    }

    /// Bands in dB relative to full scale, floored at -200 dB.
    pub fn to_db(&self) -> Vec<Vec<f32>> {
        self.channels
            .iter()
            .map(|bands| bands.iter().map(|&v| 20.0 * v.max(1e-10).log10()).collect())
            .collect()
    }
}
