//! Three-band (DJ style) equalizer.

use crate::dsp::typed_dsp;
use crate::error::{DecodingError, Result};

/// Parameter indices of the three-band EQ unit.
pub mod param {
    /// Low band gain in dB, -80..=10. Float.
    pub const LOW_GAIN: i32 = 0;
    /// Mid band gain in dB, -80..=10. Float.
    pub const MID_GAIN: i32 = 1;
    /// High band gain in dB, -80..=10. Float.
    pub const HIGH_GAIN: i32 = 2;
    /// Low/mid crossover in Hz. Float.
    pub const LOW_CROSSOVER: i32 = 3;
    /// Mid/high crossover in Hz. Float.
    pub const HIGH_CROSSOVER: i32 = 4;
    /// Crossover slope. Int.
    pub const CROSSOVER_SLOPE: i32 = 5;
}

/// Steepness of both crossovers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CrossoverSlope {
    /// 12 dB/oct.
    Db12,
    /// 24 dB/oct (engine default).
    #[default]
    Db24,
    /// 48 dB/oct.
    Db48,
}

impl CrossoverSlope {
    /// Native value.
    pub const fn code(self) -> i32 {
        match self {
            Self::Db12 => 0,
            Self::Db24 => 1,
            Self::Db48 => 2,
        }
    }

    /// Decodes a native value.
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Db12),
            1 => Some(Self::Db24),
            2 => Some(Self::Db48),
            _ => None,
        }
    }
}

typed_dsp!(
    /// A [`Dsp`](crate::dsp::Dsp) known to be a three-band equalizer.
    ThreeEq, ThreeEq
);

impl ThreeEq {
    /// Low band gain in dB.
    pub fn low_gain(&self) -> Result<f32> {
        self.dsp.parameter_float(param::LOW_GAIN)
    }

    /// Sets the low band gain.
    pub fn set_low_gain(&self, db: f32) -> Result<()> {
        self.dsp.set_parameter_float(param::LOW_GAIN, db)
    }

    /// Mid band gain in dB.
    pub fn mid_gain(&self) -> Result<f32> {
        self.dsp.parameter_float(param::MID_GAIN)
    }

    /// Sets the mid band gain.
    pub fn set_mid_gain(&self, db: f32) -> Result<()> {
        self.dsp.set_parameter_float(param::MID_GAIN, db)
    }

    /// High band gain in dB.
    pub fn high_gain(&self) -> Result<f32> {
        self.dsp.parameter_float(param::HIGH_GAIN)
    }

    /// Sets the high band gain.
    pub fn set_high_gain(&self, db: f32) -> Result<()> {
        self.dsp.set_parameter_float(param::HIGH_GAIN, db)
    }

    /// Low/mid crossover in Hz.
    pub fn low_crossover(&self) -> Result<f32> {
        self.dsp.parameter_float(param::LOW_CROSSOVER)
    }

    /// Sets the low/mid crossover.
    pub fn set_low_crossover(&self, hz: f32) -> Result<()> {
        self.dsp.set_parameter_float(param::LOW_CROSSOVER, hz)
    }

    /// Mid/high crossover in Hz.
    pub fn high_crossover(&self) -> Result<f32> {
        self.dsp.parameter_float(param::HIGH_CROSSOVER)
    }

    /// Sets the mid/high crossover.
    pub fn set_high_crossover(&self, hz: f32) -> Result<()> {
        self.dsp.set_parameter_float(param::HIGH_CROSSOVER, hz)
    }

    /// Crossover steepness.
    pub fn crossover_slope(&self) -> Result<CrossoverSlope> {
        let code = self.dsp.parameter_int(param::CROSSOVER_SLOPE)?;
        Ok(CrossoverSlope::from_code(code).ok_or(DecodingError::UnknownParameterValue {
            parameter: "crossover slope",
            value: code,
        })?)
    }

    /// Sets the crossover steepness.
    pub fn set_crossover_slope(&self, slope: CrossoverSlope) -> Result<()> {
        self.dsp
            .set_parameter_int(param::CROSSOVER_SLOPE, slope.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::mock::MockEngine;
    use crate::system::System;
    use std::sync::Arc;

    fn setup() -> (System, ThreeEq) {
        let system = System::builder(Arc::new(MockEngine::new())).build().unwrap();
        let eq = system.create_three_eq().unwrap();
        (system, eq)
    }

    #[test]
    fn engine_defaults() {
        let (_system, eq) = setup();
        assert_eq!(eq.num_parameters().unwrap(), 6);
        assert_eq!(eq.low_gain().unwrap(), 0.0);
        assert_eq!(eq.low_crossover().unwrap(), 400.0);
        assert_eq!(eq.high_crossover().unwrap(), 4000.0);
        assert_eq!(eq.crossover_slope().unwrap(), CrossoverSlope::Db24);
    }

    #[test]
    fn settings_round_trip() {
        let (_system, eq) = setup();
        eq.set_low_gain(-80.0).unwrap();
        eq.set_mid_gain(-6.5).unwrap();
        eq.set_high_gain(10.0).unwrap();
        eq.set_low_crossover(250.0).unwrap();
        eq.set_high_crossover(6000.0).unwrap();
        eq.set_crossover_slope(CrossoverSlope::Db48).unwrap();

        assert_eq!(eq.low_gain().unwrap(), -80.0);
        assert_eq!(eq.mid_gain().unwrap(), -6.5);
        assert_eq!(eq.high_gain().unwrap(), 10.0);
        assert_eq!(eq.low_crossover().unwrap(), 250.0);
        assert_eq!(eq.high_crossover().unwrap(), 6000.0);
        assert_eq!(eq.crossover_slope().unwrap(), CrossoverSlope::Db48);
    }

    #[test]
    fn unknown_slope_value() {
        let (_system, eq) = setup();
        eq.set_parameter_int(param::CROSSOVER_SLOPE, 3).unwrap();
        assert_eq!(
            eq.crossover_slope().unwrap_err(),
            Error::Decoding(DecodingError::UnknownParameterValue {
                parameter: "crossover slope",
                value: 3
            })
        );
    }
}
