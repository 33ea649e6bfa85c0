//! Five-band parametric equalizer.
//!
//! Bands are addressed by index `0..NUM_BANDS` (A to E). Each band has a
//! filter type, a frequency, a Q and a gain; the parameters of band `n`
//! sit at `4n..4n + 4`.

use crate::dsp::typed_dsp;
use crate::error::{ArgumentError, DecodingError, Result};

/// Number of bands.
pub const NUM_BANDS: usize = 5;

/// Parameter indices of the multiband EQ unit.
pub mod param {
    /// Band A filter type. Int.
    pub const A_FILTER: i32 = 0;
    /// Band A frequency in Hz. Float.
    pub const A_FREQUENCY: i32 = 1;
    /// Band A quality factor. Float.
    pub const A_Q: i32 = 2;
    /// Band A gain in dB. Float.
    pub const A_GAIN: i32 = 3;
    /// Band B filter type. Int.
    pub const B_FILTER: i32 = 4;
    /// Band B frequency in Hz. Float.
    pub const B_FREQUENCY: i32 = 5;
    /// Band B quality factor. Float.
    pub const B_Q: i32 = 6;
    /// Band B gain in dB. Float.
    pub const B_GAIN: i32 = 7;
    /// Band C filter type. Int.
    pub const C_FILTER: i32 = 8;
    /// Band C frequency in Hz. Float.
    pub const C_FREQUENCY: i32 = 9;
    /// Band C quality factor. Float.
    pub const C_Q: i32 = 10;
    /// Band C gain in dB. Float.
    pub const C_GAIN: i32 = 11;
    /// Band D filter type. Int.
    pub const D_FILTER: i32 = 12;
    /// Band D frequency in Hz. Float.
    pub const D_FREQUENCY: i32 = 13;
    /// Band D quality factor. Float.
    pub const D_Q: i32 = 14;
    /// Band D gain in dB. Float.
    pub const D_GAIN: i32 = 15;
    /// Band E filter type. Int.
    pub const E_FILTER: i32 = 16;
    /// Band E frequency in Hz. Float.
    pub const E_FREQUENCY: i32 = 17;
    /// Band E quality factor. Float.
    pub const E_Q: i32 = 18;
    /// Band E gain in dB. Float.
    pub const E_GAIN: i32 = 19;

    pub(super) const FILTER: [i32; super::NUM_BANDS] = [A_FILTER, B_FILTER, C_FILTER, D_FILTER, E_FILTER];
    pub(super) const FREQUENCY: [i32; super::NUM_BANDS] =
        [A_FREQUENCY, B_FREQUENCY, C_FREQUENCY, D_FREQUENCY, E_FREQUENCY];
    pub(super) const Q: [i32; super::NUM_BANDS] = [A_Q, B_Q, C_Q, D_Q, E_Q];
    pub(super) const GAIN: [i32; super::NUM_BANDS] = [A_GAIN, B_GAIN, C_GAIN, D_GAIN, E_GAIN];
}

/// Response of one band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EqFilter {
    /// Band bypassed.
    #[default]
    Disabled,
    /// 12 dB/oct lowpass.
    Lowpass12Db,
    /// 24 dB/oct lowpass.
    Lowpass24Db,
    /// 48 dB/oct lowpass.
    Lowpass48Db,
    /// 12 dB/oct highpass.
    Highpass12Db,
    /// 24 dB/oct highpass.
    Highpass24Db,
    /// 48 dB/oct highpass.
    Highpass48Db,
    /// Low shelf.
    LowShelf,
    /// High shelf.
    HighShelf,
    /// Bell.
    Peaking,
    /// Bandpass.
    Bandpass,
    /// Notch.
    Notch,
    /// Allpass.
    AllPass,
    /// 6 dB/oct lowpass.
    Lowpass6Db,
    /// 6 dB/oct highpass.
    Highpass6Db,
}

impl EqFilter {
    /// Native value.
    pub const fn code(self) -> i32 {
        match self {
            Self::Disabled => 0,
            Self::Lowpass12Db => 1,
            Self::Lowpass24Db => 2,
            Self::Lowpass48Db => 3,
            Self::Highpass12Db => 4,
            Self::Highpass24Db => 5,
            Self::Highpass48Db => 6,
            Self::LowShelf => 7,
            Self::HighShelf => 8,
            Self::Peaking => 9,
            Self::Bandpass => 10,
            Self::Notch => 11,
            Self::AllPass => 12,
            Self::Lowpass6Db => 13,
            Self::Highpass6Db => 14,
        }
    }

    /// Decodes a native value.
    pub const fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            0 => Self::Disabled,
            1 => Self::Lowpass12Db,
            2 => Self::Lowpass24Db,
            3 => Self::Lowpass48Db,
            4 => Self::Highpass12Db,
            5 => Self::Highpass24Db,
            6 => Self::Highpass48Db,
            7 => Self::LowShelf,
            8 => Self::HighShelf,
            9 => Self::Peaking,
            10 => Self::Bandpass,
            11 => Self::Notch,
            12 => Self::AllPass,
            13 => Self::Lowpass6Db,
            14 => Self::Highpass6Db,
            _ => return None,
        })
    }
}

typed_dsp!(
    /// A [`Dsp`](crate::dsp::Dsp) known to be a five-band equalizer.
    MultibandEq, MultibandEq
);

/// Parameter index for `band` in `table`, rejecting bands past the last.
fn band_param(table: &[i32; NUM_BANDS], band: usize) -> Result<i32> {
    table.get(band).copied().ok_or_else(|| {
        ArgumentError::BandIndex {
            band,
            bands: NUM_BANDS,
        }
        .into()
    })
}

impl MultibandEq {
    /// Filter type of `band`.
    pub fn filter(&self, band: usize) -> Result<EqFilter> {
        let code = self.dsp.parameter_int(band_param(&param::FILTER, band)?)?;
        Ok(EqFilter::from_code(code).ok_or(DecodingError::UnknownParameterValue {
            parameter: "EQ filter",
            value: code,
        })?)
    }

    /// Sets the filter type of `band`.
    pub fn set_filter(&self, band: usize, filter: EqFilter) -> Result<()> {
        self.dsp
            .set_parameter_int(band_param(&param::FILTER, band)?, filter.code())
    }

    /// Centre or corner frequency of `band` in Hz.
    pub fn frequency(&self, band: usize) -> Result<f32> {
        self.dsp.parameter_float(band_param(&param::FREQUENCY, band)?)
    }

    /// Sets the frequency of `band`.
    pub fn set_frequency(&self, band: usize, hz: f32) -> Result<()> {
        self.dsp
            .set_parameter_float(band_param(&param::FREQUENCY, band)?, hz)
    }

    /// Quality factor of `band`.
    pub fn q(&self, band: usize) -> Result<f32> {
        self.dsp.parameter_float(band_param(&param::Q, band)?)
    }

    /// Sets the quality factor of `band`.
    pub fn set_q(&self, band: usize, q: f32) -> Result<()> {
        self.dsp.set_parameter_float(band_param(&param::Q, band)?, q)
    }

    /// Gain of `band` in dB. Only shelf and peaking filters use it.
    pub fn gain(&self, band: usize) -> Result<f32> {
        self.dsp.parameter_float(band_param(&param::GAIN, band)?)
    }

    /// Sets the gain of `band`.
    pub fn set_gain(&self, band: usize, db: f32) -> Result<()> {
        self.dsp
            .set_parameter_float(band_param(&param::GAIN, band)?, db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::flags::DspType;
    use crate::mock::MockEngine;
    use crate::system::System;
    use std::sync::Arc;

    fn setup() -> (Arc<MockEngine>, System, MultibandEq) {
        let engine = Arc::new(MockEngine::new());
        let system = System::builder(engine.clone()).build().unwrap();
        let eq = system.create_multiband_eq().unwrap();
        (engine, system, eq)
    }

    #[test]
    fn engine_defaults() {
        let (_engine, _system, eq) = setup();
        assert_eq!(eq.dsp_type().unwrap(), DspType::MultibandEq);
        assert_eq!(eq.num_parameters().unwrap(), 20);
        assert_eq!(eq.filter(0).unwrap(), EqFilter::Lowpass12Db);
        for band in 1..NUM_BANDS {
            assert_eq!(eq.filter(band).unwrap(), EqFilter::Disabled);
        }
        assert_eq!(eq.frequency(2).unwrap(), 8000.0);
        assert_eq!(eq.q(3).unwrap(), 0.707);
        assert_eq!(eq.gain(4).unwrap(), 0.0);
    }

    #[test]
    fn bands_round_trip_independently() {
        let (_engine, _system, eq) = setup();
        for band in 0..NUM_BANDS {
            let n = band as f32;
            eq.set_filter(band, EqFilter::Peaking).unwrap();
            eq.set_frequency(band, 100.0 * (n + 1.0)).unwrap();
            eq.set_q(band, 0.5 + n).unwrap();
            eq.set_gain(band, -3.0 * n).unwrap();
        }
        for band in 0..NUM_BANDS {
            let n = band as f32;
            assert_eq!(eq.filter(band).unwrap(), EqFilter::Peaking);
            assert_eq!(eq.frequency(band).unwrap(), 100.0 * (n + 1.0));
            assert_eq!(eq.q(band).unwrap(), 0.5 + n);
            assert_eq!(eq.gain(band).unwrap(), -3.0 * n);
        }
        assert_eq!(eq.parameter_float(param::C_FREQUENCY).unwrap(), 300.0);
        assert_eq!(eq.parameter_float(param::E_GAIN).unwrap(), -12.0);
    }

    #[test]
    fn band_past_the_last_is_rejected_locally() {
        let (engine, _system, eq) = setup();
        let before = engine.call_count("DSP_SetParameterFloat");
        let expected = Error::Argument(ArgumentError::BandIndex { band: 5, bands: 5 });
        assert_eq!(eq.set_gain(5, 1.0).unwrap_err(), expected);
        assert_eq!(eq.frequency(5).unwrap_err(), expected);
        assert_eq!(
            eq.set_filter(usize::MAX, EqFilter::Notch).unwrap_err(),
            Error::Argument(ArgumentError::BandIndex {
                band: usize::MAX,
                bands: 5
            })
        );
        assert_eq!(engine.call_count("DSP_SetParameterFloat"), before);
    }

    #[test]
    fn unknown_filter_value() {
        let (_engine, _system, eq) = setup();
        eq.set_parameter_int(param::B_FILTER, 42).unwrap();
        assert_eq!(
            eq.filter(1).unwrap_err(),
            Error::Decoding(DecodingError::UnknownParameterValue {
                parameter: "EQ filter",
                value: 42
            })
        );
    }

    #[test]
    fn filter_codes_are_stable() {
        for code in 0..15 {
            assert_eq!(EqFilter::from_code(code).unwrap().code(), code);
        }
        assert_eq!(EqFilter::from_code(15), None);
        assert_eq!(EqFilter::Peaking.code(), 9);
    }
}
