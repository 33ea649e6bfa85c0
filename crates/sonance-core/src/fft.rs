//! Typed access to the built-in FFT analyser.
//!
//! The analyser is an ordinary [`Dsp`](crate::dsp::Dsp) of type
//! [`DspType::Fft`](crate::flags::DspType::Fft) whose parameters sit at fixed
//! indices. [`FftDsp`] names them and decodes the spectrum record:
//!
//! ```rust
//! use std::sync::Arc;
//! use sonance_core::mock::MockEngine;
//! use sonance_core::System;
//!
//! let engine = Arc::new(MockEngine::new());
//! let system = System::builder(engine.clone()).build()?;
//! let fft = system.create_fft()?;
//! fft.set_window_size(1024)?;
//!
//! engine.set_spectrum(fft.raw(), &[&[0.0, 0.5, 1.0, 0.5]]);
//! let frame = fft.spectrum()?;
//! assert_eq!(frame.num_channels(), 1);
//! assert_eq!(frame.channel(0), Some(&[0.0, 0.5, 1.0, 0.5][..]));
//! # Ok::<(), sonance_core::Error>(())
//! ```

use crate::dsp::typed_dsp;
use crate::error::{DecodingError, Result};
use crate::spectrum::SpectrumFrame;

/// Parameter indices of the FFT unit.
pub mod param {
    /// Window size, a power of two in 128..=16384. Int.
    pub const WINDOW_SIZE: i32 = 0;
    /// Window shape. Int.
    pub const WINDOW: i32 = 1;
    /// Lower edge of the analysed band in Hz. Float.
    pub const BAND_START_FREQ: i32 = 2;
    /// Upper edge of the analysed band in Hz. Float.
    pub const BAND_STOP_FREQ: i32 = 3;
    /// Spectrum record. Data, read-only.
    pub const SPECTRUM_DATA: i32 = 4;
    /// RMS of the analysed block. Float, read-only.
    pub const RMS: i32 = 5;
    /// Spectral centroid in Hz. Float, read-only.
    pub const SPECTRAL_CENTROID: i32 = 6;
    /// Analyse every block instead of accumulating. Bool.
    pub const IMMEDIATE_MODE: i32 = 7;
    /// Channel downmix before analysis. Int.
    pub const DOWNMIX: i32 = 8;
    /// Single channel to analyse, or -1 for all. Int.
    pub const CHANNEL: i32 = 9;
}

/// Window applied before the transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FftWindow {
    /// No shaping.
    Rect,
    /// Triangle.
    Triangle,
    /// Hamming (engine default).
    #[default]
    Hamming,
    /// Hann.
    Hanning,
    /// Blackman.
    Blackman,
    /// Blackman-Harris.
    BlackmanHarris,
}

impl FftWindow {
    /// Native value.
    pub const fn code(self) -> i32 {
        match self {
            Self::Rect => 0,
            Self::Triangle => 1,
            Self::Hamming => 2,
            Self::Hanning => 3,
            Self::Blackman => 4,
            Self::BlackmanHarris => 5,
        }
    }

    /// Decodes a native value.
    pub const fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            0 => Self::Rect,
            1 => Self::Triangle,
            2 => Self::Hamming,
            3 => Self::Hanning,
            4 => Self::Blackman,
            5 => Self::BlackmanHarris,
            _ => return None,
        })
    }
}

/// Channel downmix applied before analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FftDownmix {
    /// Analyse each channel.
    #[default]
    None,
    /// Sum to mono first.
    Mono,
}

impl FftDownmix {
    /// Native value.
    pub const fn code(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Mono => 1,
        }
    }

    /// Decodes a native value.
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::Mono),
            _ => None,
        }
    }
}

typed_dsp!(
    /// A [`Dsp`](crate::dsp::Dsp) known to be an FFT analyser.
    FftDsp, Fft
);

impl FftDsp {
    /// Transform length.
    pub fn window_size(&self) -> Result<i32> {
        self.dsp.parameter_int(param::WINDOW_SIZE)
    }

    /// Sets the transform length.
    pub fn set_window_size(&self, size: i32) -> Result<()> {
        self.dsp.set_parameter_int(param::WINDOW_SIZE, size)
    }

    /// Window shape.
    pub fn window(&self) -> Result<FftWindow> {
        let code = self.dsp.parameter_int(param::WINDOW)?;
        Ok(FftWindow::from_code(code).ok_or(DecodingError::UnknownParameterValue {
            parameter: "FFT window",
            value: code,
        })?)
    }

    /// Sets the window shape.
    pub fn set_window(&self, window: FftWindow) -> Result<()> {
        self.dsp.set_parameter_int(param::WINDOW, window.code())
    }

    /// Lower band edge in Hz.
    pub fn band_start_freq(&self) -> Result<f32> {
        self.dsp.parameter_float(param::BAND_START_FREQ)
    }

    /// Sets the lower band edge.
    pub fn set_band_start_freq(&self, hz: f32) -> Result<()> {
        self.dsp.set_parameter_float(param::BAND_START_FREQ, hz)
    }

    /// Upper band edge in Hz.
    pub fn band_stop_freq(&self) -> Result<f32> {
        self.dsp.parameter_float(param::BAND_STOP_FREQ)
    }

    /// Sets the upper band edge.
    pub fn set_band_stop_freq(&self, hz: f32) -> Result<()> {
        self.dsp.set_parameter_float(param::BAND_STOP_FREQ, hz)
    }

    /// Latest magnitude spectrum, copied out of engine memory.
    pub fn spectrum(&self) -> Result<SpectrumFrame> {
        let (data, length) = self.dsp.parameter_record(param::SPECTRUM_DATA)?;
        Ok(SpectrumFrame::decode(self.dsp.handle().api(), data, length)?)
    }

    /// RMS level of the last analysed block.
    pub fn rms(&self) -> Result<f32> {
        self.dsp.parameter_float(param::RMS)
    }

    /// Spectral centroid of the last analysed block, in Hz.
    pub fn spectral_centroid(&self) -> Result<f32> {
        self.dsp.parameter_float(param::SPECTRAL_CENTROID)
    }

    /// Whether every block is analysed on its own.
    pub fn immediate_mode(&self) -> Result<bool> {
        self.dsp.parameter_bool(param::IMMEDIATE_MODE)
    }

    /// Switches immediate mode.
    pub fn set_immediate_mode(&self, immediate: bool) -> Result<()> {
        self.dsp.set_parameter_bool(param::IMMEDIATE_MODE, immediate)
    }

    /// Downmix applied before analysis.
    pub fn downmix(&self) -> Result<FftDownmix> {
        let code = self.dsp.parameter_int(param::DOWNMIX)?;
        Ok(FftDownmix::from_code(code).ok_or(DecodingError::UnknownParameterValue {
            parameter: "FFT downmix",
            value: code,
        })?)
    }

    /// Sets the downmix.
    pub fn set_downmix(&self, downmix: FftDownmix) -> Result<()> {
        self.dsp.set_parameter_int(param::DOWNMIX, downmix.code())
    }

    /// Analysed channel; `None` when all channels are analysed.
    pub fn channel(&self) -> Result<Option<i32>> {
        let channel = self.dsp.parameter_int(param::CHANNEL)?;
        Ok((channel >= 0).then_some(channel))
    }

    /// Restricts analysis to one channel, or all with `None`.
    pub fn set_channel(&self, channel: Option<i32>) -> Result<()> {
        self.dsp.set_parameter_int(param::CHANNEL, channel.unwrap_or(-1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ArgumentError, Error};
    use crate::flags::DspType;
    use crate::mock::MockEngine;
    use crate::param::ParameterKind;
    use crate::system::System;
    use std::sync::Arc;

    fn setup() -> (Arc<MockEngine>, System, FftDsp) {
        let engine = Arc::new(MockEngine::new());
        let system = System::builder(engine.clone()).build().unwrap();
        let fft = system.create_fft().unwrap();
        (engine, system, fft)
    }

    #[test]
    fn engine_defaults() {
        let (_engine, _system, fft) = setup();
        assert_eq!(fft.dsp_type().unwrap(), DspType::Fft);
        assert_eq!(fft.window_size().unwrap(), 2048);
        assert_eq!(fft.window().unwrap(), FftWindow::Hamming);
        assert_eq!(fft.band_start_freq().unwrap(), 0.0);
        assert_eq!(fft.band_stop_freq().unwrap(), 22_000.0);
        assert!(!fft.immediate_mode().unwrap());
        assert_eq!(fft.downmix().unwrap(), FftDownmix::None);
        assert_eq!(fft.channel().unwrap(), None);
    }

    #[test]
    fn settings_round_trip() {
        let (_engine, _system, fft) = setup();
        fft.set_window_size(4096).unwrap();
        fft.set_window(FftWindow::BlackmanHarris).unwrap();
        fft.set_band_start_freq(20.0).unwrap();
        fft.set_band_stop_freq(20_000.0).unwrap();
        fft.set_immediate_mode(true).unwrap();
        fft.set_downmix(FftDownmix::Mono).unwrap();
        fft.set_channel(Some(1)).unwrap();

        assert_eq!(fft.window_size().unwrap(), 4096);
        assert_eq!(fft.window().unwrap(), FftWindow::BlackmanHarris);
        assert_eq!(fft.band_start_freq().unwrap(), 20.0);
        assert_eq!(fft.band_stop_freq().unwrap(), 20_000.0);
        assert!(fft.immediate_mode().unwrap());
        assert_eq!(fft.downmix().unwrap(), FftDownmix::Mono);
        assert_eq!(fft.channel().unwrap(), Some(1));
    }

    #[test]
    fn unknown_window_value() {
        let (_engine, _system, fft) = setup();
        fft.set_parameter_int(param::WINDOW, 17).unwrap();
        assert_eq!(
            fft.window().unwrap_err(),
            Error::Decoding(DecodingError::UnknownParameterValue {
                parameter: "FFT window",
                value: 17
            })
        );
    }

    #[test]
    fn spectrum_decodes() {
        let (engine, _system, fft) = setup();
        let left = [0.0f32, 1.0, 0.5, 0.25];
        let right = [0.1f32, 0.2, 0.3, 0.4];
        engine.set_spectrum(fft.raw(), &[&left, &right]);
        let frame = fft.spectrum().unwrap();
        assert_eq!(frame.length(), 4);
        assert_eq!(frame.channel(0), Some(&left[..]));
        assert_eq!(frame.channel(1), Some(&right[..]));
    }

    #[test]
    fn silent_spectrum_is_empty() {
        let (_engine, _system, fft) = setup();
        let frame = fft.spectrum().unwrap();
        assert_eq!(frame.num_channels(), 0);
        assert_eq!(frame.length(), 0);
    }

    #[test]
    fn descriptors_are_exposed() {
        let (_engine, _system, fft) = setup();
        assert_eq!(fft.num_parameters().unwrap(), 10);
        let window = fft.parameter_info(param::WINDOW_SIZE).unwrap();
        assert!(matches!(window.kind, ParameterKind::Int { default: 2048, .. }));
        let data = fft.parameter_info(param::SPECTRUM_DATA).unwrap();
        assert!(matches!(data.kind, ParameterKind::Data { .. }));
    }

    #[test]
    fn typed_wrapper_checks_type() {
        let (_engine, system, fft) = setup();
        let untyped = fft.into_dsp();
        let fft = FftDsp::from_dsp(untyped).unwrap();
        assert!(fft.is_owned());

        let echo = system.create_dsp_by_type(DspType::Echo).unwrap();
        assert_eq!(
            FftDsp::from_dsp(echo).unwrap_err(),
            Error::Argument(ArgumentError::WrongDspType {
                expected: DspType::Fft,
                actual: DspType::Echo
            })
        );
    }
}
