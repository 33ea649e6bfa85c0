//! Downward compressor.

use crate::dsp::typed_dsp;
use crate::error::Result;

/// Parameter indices of the compressor unit.
pub mod param {
    /// Threshold in dB, -60..=0. Float.
    pub const THRESHOLD: i32 = 0;
    /// Compression ratio, 1..=50. Float.
    pub const RATIO: i32 = 1;
    /// Attack in ms, 0.1..=500. Float.
    pub const ATTACK: i32 = 2;
    /// Release in ms, 10..=5000. Float.
    pub const RELEASE: i32 = 3;
    /// Makeup gain in dB, -30..=30. Float.
    pub const GAIN_MAKEUP: i32 = 4;
    /// Side-chain settings. Data.
    pub const USE_SIDECHAIN: i32 = 5;
    /// Detect on the loudest channel for all channels. Bool.
    pub const LINKED: i32 = 6;
}

typed_dsp!(
    /// A [`Dsp`](crate::dsp::Dsp) known to be a compressor.
    Compressor, Compressor
);

impl Compressor {
    /// Threshold in dB.
    pub fn threshold(&self) -> Result<f32> {
        self.dsp.parameter_float(param::THRESHOLD)
    }

    /// Sets the threshold.
    pub fn set_threshold(&self, db: f32) -> Result<()> {
        self.dsp.set_parameter_float(param::THRESHOLD, db)
    }

    /// Compression ratio.
    pub fn ratio(&self) -> Result<f32> {
        self.dsp.parameter_float(param::RATIO)
    }

    /// Sets the compression ratio.
    pub fn set_ratio(&self, ratio: f32) -> Result<()> {
        self.dsp.set_parameter_float(param::RATIO, ratio)
    }

    /// Attack time in ms.
    pub fn attack(&self) -> Result<f32> {
        self.dsp.parameter_float(param::ATTACK)
    }

    /// Sets the attack time.
    pub fn set_attack(&self, ms: f32) -> Result<()> {
        self.dsp.set_parameter_float(param::ATTACK, ms)
    }

    /// Release time in ms.
    pub fn release(&self) -> Result<f32> {
        self.dsp.parameter_float(param::RELEASE)
    }

    /// Sets the release time.
    pub fn set_release(&self, ms: f32) -> Result<()> {
        self.dsp.set_parameter_float(param::RELEASE, ms)
    }

    /// Makeup gain in dB.
    pub fn gain_makeup(&self) -> Result<f32> {
        self.dsp.parameter_float(param::GAIN_MAKEUP)
    }

    /// Sets the makeup gain.
    pub fn set_gain_makeup(&self, db: f32) -> Result<()> {
        self.dsp.set_parameter_float(param::GAIN_MAKEUP, db)
    }

    /// Whether detection is linked across channels.
    pub fn linked(&self) -> Result<bool> {
        self.dsp.parameter_bool(param::LINKED)
    }

    /// Links or unlinks channel detection.
    pub fn set_linked(&self, linked: bool) -> Result<()> {
        self.dsp.set_parameter_bool(param::LINKED, linked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ArgumentError, Error};
    use crate::flags::DspType;
    use crate::mock::MockEngine;
    use crate::system::System;
    use std::sync::Arc;

    fn setup() -> (System, Compressor) {
        let system = System::builder(Arc::new(MockEngine::new())).build().unwrap();
        let comp = system.create_compressor().unwrap();
        (system, comp)
    }

    #[test]
    fn engine_defaults() {
        let (_system, comp) = setup();
        assert_eq!(comp.num_parameters().unwrap(), 7);
        assert_eq!(comp.threshold().unwrap(), 0.0);
        assert_eq!(comp.ratio().unwrap(), 2.5);
        assert_eq!(comp.attack().unwrap(), 20.0);
        assert_eq!(comp.release().unwrap(), 100.0);
        assert_eq!(comp.gain_makeup().unwrap(), 0.0);
        assert!(comp.linked().unwrap());
    }

    #[test]
    fn settings_round_trip() {
        let (_system, comp) = setup();
        comp.set_threshold(-24.0).unwrap();
        comp.set_ratio(4.0).unwrap();
        comp.set_attack(0.1).unwrap();
        comp.set_release(5000.0).unwrap();
        comp.set_gain_makeup(6.0).unwrap();
        comp.set_linked(false).unwrap();

        assert_eq!(comp.threshold().unwrap(), -24.0);
        assert_eq!(comp.ratio().unwrap(), 4.0);
        assert_eq!(comp.attack().unwrap(), 0.1);
        assert_eq!(comp.release().unwrap(), 5000.0);
        assert_eq!(comp.gain_makeup().unwrap(), 6.0);
        assert!(!comp.linked().unwrap());
    }

    #[test]
    fn typed_wrapper_checks_type() {
        let (system, comp) = setup();
        let comp = Compressor::from_dsp(comp.into_dsp()).unwrap();
        assert_eq!(comp.dsp_type().unwrap(), Compressor::DSP_TYPE);

        let chorus = system.create_dsp_by_type(DspType::Chorus).unwrap();
        assert_eq!(
            Compressor::from_dsp(chorus).unwrap_err(),
            Error::Argument(ArgumentError::WrongDspType {
                expected: DspType::Compressor,
                actual: DspType::Chorus
            })
        );
    }
}
