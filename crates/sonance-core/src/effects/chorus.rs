//! Chorus.

use crate::dsp::typed_dsp;
use crate::error::Result;

/// Parameter indices of the chorus unit.
pub mod param {
    /// Wet/dry mix in percent, 0..=100. Float.
    pub const MIX: i32 = 0;
    /// Modulation rate in Hz, 0..=20. Float.
    pub const RATE: i32 = 1;
    /// Modulation depth in ms, 0..=100. Float.
    pub const DEPTH: i32 = 2;
}

typed_dsp!(
    /// A [`Dsp`](crate::dsp::Dsp) known to be a chorus.
    Chorus, Chorus
);

impl Chorus {
    /// Wet/dry mix in percent.
    pub fn mix(&self) -> Result<f32> {
        self.dsp.parameter_float(param::MIX)
    }

    /// Sets the wet/dry mix.
    pub fn set_mix(&self, percent: f32) -> Result<()> {
        self.dsp.set_parameter_float(param::MIX, percent)
    }

    /// Modulation rate in Hz.
    pub fn rate(&self) -> Result<f32> {
        self.dsp.parameter_float(param::RATE)
    }

    /// Sets the modulation rate.
    pub fn set_rate(&self, hz: f32) -> Result<()> {
        self.dsp.set_parameter_float(param::RATE, hz)
    }

    /// Modulation depth in ms.
    pub fn depth(&self) -> Result<f32> {
        self.dsp.parameter_float(param::DEPTH)
    }

    /// Sets the modulation depth.
    pub fn set_depth(&self, ms: f32) -> Result<()> {
        self.dsp.set_parameter_float(param::DEPTH, ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockEngine;
    use crate::param::ParameterKind;
    use crate::system::System;
    use std::sync::Arc;

    #[test]
    fn settings_round_trip() {
        let system = System::builder(Arc::new(MockEngine::new())).build().unwrap();
        let chorus = system.create_chorus().unwrap();
        assert_eq!(chorus.mix().unwrap(), 50.0);
        assert_eq!(chorus.rate().unwrap(), 0.8);
        assert_eq!(chorus.depth().unwrap(), 3.0);

        chorus.set_mix(100.0).unwrap();
        chorus.set_rate(20.0).unwrap();
        chorus.set_depth(0.0).unwrap();
        assert_eq!(chorus.mix().unwrap(), 100.0);
        assert_eq!(chorus.rate().unwrap(), 20.0);
        assert_eq!(chorus.depth().unwrap(), 0.0);

        let rate = chorus.parameter_info(param::RATE).unwrap();
        assert_eq!(rate.label, "Hz");
        assert!(matches!(rate.kind, ParameterKind::Float { max, .. } if max == 20.0));
    }
}
