//! DSP units and their parameters.
//!
//! A [`Dsp`] is a node in the engine's signal graph. Nodes are wired with
//! [`Dsp::add_input`], which yields the [`DspConnection`] edge, and carry an
//! indexed list of typed parameters described by
//! [`ParameterDescriptor`](crate::param::ParameterDescriptor).

use crate::dsp_connection::DspConnection;
use crate::error::{DecodingError, Result};
use crate::flags::{DspConnectionType, DspType, SpeakerMode};
use crate::handle::native_object;
use crate::native::{RawHandle, RawPtr};
use crate::param::{ParameterDescriptor, RawParameterDesc};
use crate::spectrum::MeteringInfo;
use crate::system::System;

native_object!(
    /// A signal-processing node.
    ///
    /// Owned when created with [`System::create_dsp_by_type`]; units reached
    /// through a channel chain or a connection are borrowed.
    Dsp, Dsp
);

/// Wet/dry levels of a unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WetDryMix {
    /// Wet level before processing.
    pub prewet: f32,
    /// Wet level after processing.
    pub postwet: f32,
    /// Dry (unprocessed) level.
    pub dry: f32,
}

impl Default for WetDryMix {
    fn default() -> Self {
        Self {
            prewet: 1.0,
            postwet: 1.0,
            dry: 0.0,
        }
    }
}

/// Which sides of a unit are metered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MeteringEnabled {
    /// Input metering.
    pub input: bool,
    /// Output metering.
    pub output: bool,
}

/// Signal format a unit processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelFormat {
    /// Speaker bit mask; 0 for the default mask.
    pub channel_mask: u32,
    /// Channel count.
    pub num_channels: i32,
    /// Speaker layout.
    pub speaker_mode: SpeakerMode,
}

impl Dsp {
    /// Releases the unit. It must not be connected or attached to a channel.
    pub fn close(self) -> Result<()> {
        self.handle.release()?;
        Ok(())
    }

    /// `false` once the unit has been released.
    pub fn is_valid(&self) -> Result<bool> {
        let mut dsp_type = 0;
        Ok(self
            .handle
            .api()
            .dsp_get_type(self.raw(), &mut dsp_type)
            .liveness(|| "DSP_GetType".into())?)
    }

    // ── Graph ──

    /// Feeds `input` into this unit.
    pub fn add_input(&self, input: &Dsp, connection_type: DspConnectionType) -> Result<DspConnection> {
        let mut connection = RawHandle::NULL;
        self.handle
            .api()
            .dsp_add_input(self.raw(), input.raw(), connection_type.code(), &mut connection)
            .check("DSP_AddInput")?;
        Ok(DspConnection::borrowed(self.handle.ctx(), connection))
    }

    /// Input unit at `index` and the edge that carries it.
    pub fn input(&self, index: i32) -> Result<(Dsp, DspConnection)> {
        let (mut dsp, mut connection) = (RawHandle::NULL, RawHandle::NULL);
        self.handle
            .api()
            .dsp_get_input(self.raw(), index, &mut dsp, &mut connection)
            .check("DSP_GetInput")?;
        Ok((
            Dsp::borrowed(self.handle.ctx(), dsp),
            DspConnection::borrowed(self.handle.ctx(), connection),
        ))
    }

    /// Output unit at `index` and the edge that carries it.
    pub fn output(&self, index: i32) -> Result<(Dsp, DspConnection)> {
        let (mut dsp, mut connection) = (RawHandle::NULL, RawHandle::NULL);
        self.handle
            .api()
            .dsp_get_output(self.raw(), index, &mut dsp, &mut connection)
            .check("DSP_GetOutput")?;
        Ok((
            Dsp::borrowed(self.handle.ctx(), dsp),
            DspConnection::borrowed(self.handle.ctx(), connection),
        ))
    }

    /// Number of inputs.
    pub fn num_inputs(&self) -> Result<i32> {
        let mut count = 0;
        self.handle
            .api()
            .dsp_get_num_inputs(self.raw(), &mut count)
            .check("DSP_GetNumInputs")?;
        Ok(count)
    }

    /// Number of outputs.
    pub fn num_outputs(&self) -> Result<i32> {
        let mut count = 0;
        self.handle
            .api()
            .dsp_get_num_outputs(self.raw(), &mut count)
            .check("DSP_GetNumOutputs")?;
        Ok(count)
    }

    /// Removes all input and/or output edges.
    pub fn disconnect_all(&self, inputs: bool, outputs: bool) -> Result<()> {
        self.handle
            .api()
            .dsp_disconnect_all(self.raw(), inputs, outputs)
            .check("DSP_DisconnectAll")?;
        Ok(())
    }

    /// Removes the edge to `target`, or the specific `connection` when
    /// several exist. `None` for both disconnects everything.
    pub fn disconnect_from(
        &self,
        target: Option<&Dsp>,
        connection: Option<&DspConnection>,
    ) -> Result<()> {
        self.handle
            .api()
            .dsp_disconnect_from(
                self.raw(),
                target.map_or(RawHandle::NULL, Dsp::raw),
                connection.map_or(RawHandle::NULL, DspConnection::raw),
            )
            .check("DSP_DisconnectFrom")?;
        Ok(())
    }

    // ── Parameters ──

    /// Number of parameters the unit exposes.
    pub fn num_parameters(&self) -> Result<i32> {
        let mut count = 0;
        self.handle
            .api()
            .dsp_get_num_parameters(self.raw(), &mut count)
            .check("DSP_GetNumParameters")?;
        Ok(count)
    }

    /// Decoded descriptor of parameter `index`.
    pub fn parameter_info(&self, index: i32) -> Result<ParameterDescriptor> {
        let mut raw = RawParameterDesc::default();
        self.handle
            .api()
            .dsp_get_parameter_info(self.raw(), index, &mut raw)
            .check("DSP_GetParameterInfo")?;
        Ok(ParameterDescriptor::decode(&raw)?)
    }

    /// Value of a float parameter.
    pub fn parameter_float(&self, index: i32) -> Result<f32> {
        let mut value = 0.0;
        self.handle
            .api()
            .dsp_get_parameter_float(self.raw(), index, &mut value)
            .check("DSP_GetParameterFloat")?;
        Ok(value)
    }

    /// Sets a float parameter.
    pub fn set_parameter_float(&self, index: i32, value: f32) -> Result<()> {
        self.handle
            .api()
            .dsp_set_parameter_float(self.raw(), index, value)
            .check("DSP_SetParameterFloat")?;
        Ok(())
    }

    /// Value of an integer parameter.
    pub fn parameter_int(&self, index: i32) -> Result<i32> {
        let mut value = 0;
        self.handle
            .api()
            .dsp_get_parameter_int(self.raw(), index, &mut value)
            .check("DSP_GetParameterInt")?;
        Ok(value)
    }

    /// Sets an integer parameter.
    pub fn set_parameter_int(&self, index: i32, value: i32) -> Result<()> {
        self.handle
            .api()
            .dsp_set_parameter_int(self.raw(), index, value)
            .check("DSP_SetParameterInt")?;
        Ok(())
    }

    /// Value of a boolean parameter.
    pub fn parameter_bool(&self, index: i32) -> Result<bool> {
        let mut value = false;
        self.handle
            .api()
            .dsp_get_parameter_bool(self.raw(), index, &mut value)
            .check("DSP_GetParameterBool")?;
        Ok(value)
    }

    /// Sets a boolean parameter.
    pub fn set_parameter_bool(&self, index: i32, value: bool) -> Result<()> {
        self.handle
            .api()
            .dsp_set_parameter_bool(self.raw(), index, value)
            .check("DSP_SetParameterBool")?;
        Ok(())
    }

    /// Address and byte length of a data parameter, still in engine memory.
    pub(crate) fn parameter_record(&self, index: i32) -> Result<(RawPtr, usize)> {
        let (mut data, mut length) = (RawPtr::NULL, 0u32);
        self.handle
            .api()
            .dsp_get_parameter_data(self.raw(), index, &mut data, &mut length)
            .check("DSP_GetParameterData")?;
        Ok((data, length as usize))
    }

    /// Copy of a data parameter's bytes.
    pub fn parameter_data(&self, index: i32) -> Result<Vec<u8>> {
        let (data, length) = self.parameter_record(index)?;
        if length == 0 {
            return Ok(Vec::new());
        }
        if data.is_null() {
            return Err(DecodingError::NullPayload {
                what: "parameter data",
            }
            .into());
        }
        let mut bytes = vec![0u8; length];
        if !self.handle.api().read_memory(data, &mut bytes) {
            return Err(DecodingError::UnreadableMemory(data.0).into());
        }
        Ok(bytes)
    }

    /// Copies `data` into a data parameter.
    pub fn set_parameter_data(&self, index: i32, data: &[u8]) -> Result<()> {
        self.handle
            .api()
            .dsp_set_parameter_data(self.raw(), index, data)
            .check("DSP_SetParameterData")?;
        Ok(())
    }

    // ── State ──

    /// `true` when the unit is processing.
    pub fn active(&self) -> Result<bool> {
        let mut active = false;
        self.handle
            .api()
            .dsp_get_active(self.raw(), &mut active)
            .check("DSP_GetActive")?;
        Ok(active)
    }

    /// Enables or disables processing.
    pub fn set_active(&self, active: bool) -> Result<()> {
        self.handle
            .api()
            .dsp_set_active(self.raw(), active)
            .check("DSP_SetActive")?;
        Ok(())
    }

    /// `true` when input passes through unprocessed.
    pub fn bypass(&self) -> Result<bool> {
        let mut bypass = false;
        self.handle
            .api()
            .dsp_get_bypass(self.raw(), &mut bypass)
            .check("DSP_GetBypass")?;
        Ok(bypass)
    }

    /// Sets the bypass state.
    pub fn set_bypass(&self, bypass: bool) -> Result<()> {
        self.handle
            .api()
            .dsp_set_bypass(self.raw(), bypass)
            .check("DSP_SetBypass")?;
        Ok(())
    }

    /// Current wet/dry levels.
    pub fn wet_dry_mix(&self) -> Result<WetDryMix> {
        let mut mix = WetDryMix::default();
        self.handle
            .api()
            .dsp_get_wet_dry_mix(self.raw(), &mut mix.prewet, &mut mix.postwet, &mut mix.dry)
            .check("DSP_GetWetDryMix")?;
        Ok(mix)
    }

    /// Sets wet/dry levels.
    pub fn set_wet_dry_mix(&self, mix: WetDryMix) -> Result<()> {
        self.handle
            .api()
            .dsp_set_wet_dry_mix(self.raw(), mix.prewet, mix.postwet, mix.dry)
            .check("DSP_SetWetDryMix")?;
        Ok(())
    }

    /// `true` when the unit has no audible input.
    pub fn is_idle(&self) -> Result<bool> {
        let mut idle = false;
        self.handle
            .api()
            .dsp_get_idle(self.raw(), &mut idle)
            .check("DSP_GetIdle")?;
        Ok(idle)
    }

    /// Clears internal buffers and state.
    pub fn reset(&self) -> Result<()> {
        self.handle.api().dsp_reset(self.raw()).check("DSP_Reset")?;
        Ok(())
    }

    /// Built-in type of the unit.
    pub fn dsp_type(&self) -> Result<DspType> {
        let mut code = 0;
        self.handle
            .api()
            .dsp_get_type(self.raw(), &mut code)
            .check("DSP_GetType")?;
        Ok(DspType::from_code(code)?)
    }

    // ── Metering ──

    /// Which sides are metered.
    pub fn metering_enabled(&self) -> Result<MeteringEnabled> {
        let mut enabled = MeteringEnabled::default();
        self.handle
            .api()
            .dsp_get_metering_enabled(self.raw(), &mut enabled.input, &mut enabled.output)
            .check("DSP_GetMeteringEnabled")?;
        Ok(enabled)
    }

    /// Enables input and/or output metering.
    pub fn set_metering_enabled(&self, enabled: MeteringEnabled) -> Result<()> {
        self.handle
            .api()
            .dsp_set_metering_enabled(self.raw(), enabled.input, enabled.output)
            .check("DSP_SetMeteringEnabled")?;
        Ok(())
    }

    /// Latest input and output levels.
    pub fn metering_info(&self) -> Result<(MeteringInfo, MeteringInfo)> {
        let (mut input, mut output) = (MeteringInfo::default(), MeteringInfo::default());
        self.handle
            .api()
            .dsp_get_metering_info(self.raw(), Some(&mut input), Some(&mut output))
            .check("DSP_GetMeteringInfo")?;
        Ok((input, output))
    }

    /// Latest input levels only.
    pub fn input_metering(&self) -> Result<MeteringInfo> {
        let mut input = MeteringInfo::default();
        self.handle
            .api()
            .dsp_get_metering_info(self.raw(), Some(&mut input), None)
            .check("DSP_GetMeteringInfo")?;
        Ok(input)
    }

    /// Latest output levels only.
    pub fn output_metering(&self) -> Result<MeteringInfo> {
        let mut output = MeteringInfo::default();
        self.handle
            .api()
            .dsp_get_metering_info(self.raw(), None, Some(&mut output))
            .check("DSP_GetMeteringInfo")?;
        Ok(output)
    }

    // ── Format ──

    /// Signal format the unit processes.
    pub fn channel_format(&self) -> Result<ChannelFormat> {
        let (mut channel_mask, mut num_channels, mut speaker_mode) = (0, 0, 0);
        self.handle
            .api()
            .dsp_get_channel_format(
                self.raw(),
                &mut channel_mask,
                &mut num_channels,
                &mut speaker_mode,
            )
            .check("DSP_GetChannelFormat")?;
        Ok(ChannelFormat {
            channel_mask,
            num_channels,
            speaker_mode: SpeakerMode::from_code(speaker_mode)
                .ok_or(DecodingError::UnknownSpeakerMode(speaker_mode))?,
        })
    }

    /// Forces the unit's signal format.
    pub fn set_channel_format(&self, format: ChannelFormat) -> Result<()> {
        self.handle
            .api()
            .dsp_set_channel_format(
                self.raw(),
                format.channel_mask,
                format.num_channels,
                format.speaker_mode.code(),
            )
            .check("DSP_SetChannelFormat")?;
        Ok(())
    }

    /// The owning system (borrowed).
    pub fn system(&self) -> Result<System> {
        let mut system = RawHandle::NULL;
        self.handle
            .api()
            .dsp_get_system(self.raw(), &mut system)
            .check("DSP_GetSystemObject")?;
        Ok(System::borrowed(self.handle.ctx(), system))
    }
}

/// Declares a wrapper around a [`Dsp`] of one built-in type.
///
/// The wrapper derefs to [`Dsp`] for the untyped operations and converts
/// back with `into_dsp` or `From`.
macro_rules! typed_dsp {
    ($(#[$meta:meta])* $name:ident, $dsp_type:ident) => {
        $(#[$meta])*
        #[derive(Debug, PartialEq, Eq)]
        pub struct $name {
            dsp: $crate::dsp::Dsp,
        }

        impl $name {
            /// Engine type of the wrapped unit.
            pub const DSP_TYPE: $crate::flags::DspType = $crate::flags::DspType::$dsp_type;

            /// Wraps a unit freshly created with [`Self::DSP_TYPE`].
            pub(crate) fn from_dsp_unchecked(dsp: $crate::dsp::Dsp) -> Self {
                Self { dsp }
            }

            /// Wraps `dsp` after checking its type with the engine.
            pub fn from_dsp(dsp: $crate::dsp::Dsp) -> $crate::error::Result<Self> {
                let actual = dsp.dsp_type()?;
                if actual != Self::DSP_TYPE {
                    return Err($crate::error::ArgumentError::WrongDspType {
                        expected: Self::DSP_TYPE,
                        actual,
                    }
                    .into());
                }
                Ok(Self { dsp })
            }

            /// Unwraps the untyped unit.
            pub fn into_dsp(self) -> $crate::dsp::Dsp {
                self.dsp
            }
        }

        impl std::ops::Deref for $name {
            type Target = $crate::dsp::Dsp;

            fn deref(&self) -> &$crate::dsp::Dsp {
                &self.dsp
            }
        }

        impl From<$name> for $crate::dsp::Dsp {
            fn from(typed: $name) -> Self {
                typed.dsp
            }
        }
    };
}

pub(crate) use typed_dsp;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel_control::ChannelControl;
    use crate::error::Error;
    use crate::flags::Mode;
    use crate::handle::Reclaimer;
    use crate::mock::MockEngine;
    use crate::param::ParameterKind;
    use crate::status::Status;
    use std::sync::Arc;

    fn setup() -> (Arc<MockEngine>, System) {
        let engine = Arc::new(MockEngine::new());
        let (reclaimer, _queue) = Reclaimer::manual();
        let system = System::builder(engine.clone())
            .reclaimer(reclaimer)
            .build()
            .unwrap();
        (engine, system)
    }

    #[test]
    fn graph_wiring() {
        let (_engine, system) = setup();
        let mixer = system.create_dsp_by_type(DspType::Mixer).unwrap();
        let echo = system.create_dsp_by_type(DspType::Echo).unwrap();
        let connection = mixer.add_input(&echo, DspConnectionType::Standard).unwrap();

        assert_eq!(mixer.num_inputs().unwrap(), 1);
        assert_eq!(echo.num_outputs().unwrap(), 1);
        let (input, via) = mixer.input(0).unwrap();
        assert_eq!(input.raw(), echo.raw());
        assert!(!input.is_owned());
        assert_eq!(via.raw(), connection.raw());
        let (output, _) = echo.output(0).unwrap();
        assert_eq!(output.raw(), mixer.raw());

        mixer.disconnect_from(Some(&echo), None).unwrap();
        assert_eq!(mixer.num_inputs().unwrap(), 0);
        assert_eq!(echo.num_outputs().unwrap(), 0);
    }

    #[test]
    fn disconnect_all_inputs() {
        let (_engine, system) = setup();
        let mixer = system.create_dsp_by_type(DspType::Mixer).unwrap();
        let a = system.create_dsp_by_type(DspType::Lowpass).unwrap();
        let b = system.create_dsp_by_type(DspType::Highpass).unwrap();
        mixer.add_input(&a, DspConnectionType::Standard).unwrap();
        mixer.add_input(&b, DspConnectionType::Sidechain).unwrap();
        assert_eq!(mixer.num_inputs().unwrap(), 2);
        mixer.disconnect_all(true, false).unwrap();
        assert_eq!(mixer.num_inputs().unwrap(), 0);
    }

    #[test]
    fn parameter_values_round_trip() {
        let (_engine, system) = setup();
        let dsp = system.create_dsp_by_type(DspType::Echo).unwrap();
        dsp.set_parameter_float(0, 250.0).unwrap();
        assert_eq!(dsp.parameter_float(0).unwrap(), 250.0);
        dsp.set_parameter_int(1, 7).unwrap();
        assert_eq!(dsp.parameter_int(1).unwrap(), 7);
        dsp.set_parameter_bool(2, true).unwrap();
        assert!(dsp.parameter_bool(2).unwrap());
    }

    #[test]
    fn parameter_data_round_trip() {
        let (_engine, system) = setup();
        let dsp = system.create_dsp_by_type(DspType::ConvolutionReverb).unwrap();
        assert!(dsp.parameter_data(0).unwrap().is_empty());
        dsp.set_parameter_data(0, &[1, 2, 3, 4]).unwrap();
        assert_eq!(dsp.parameter_data(0).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn descriptors_decode_by_tag() {
        let (engine, system) = setup();
        let dsp = system.create_dsp_by_type(DspType::Lowpass).unwrap();
        engine.set_parameter_descriptor(
            dsp.raw(),
            0,
            RawParameterDesc::float("Cutoff", "Hz", "Cutoff frequency", 10.0, 22_000.0, 5000.0),
        );
        assert_eq!(dsp.num_parameters().unwrap(), 1);
        let desc = dsp.parameter_info(0).unwrap();
        assert_eq!(desc.name, "Cutoff");
        assert!(matches!(desc.kind, ParameterKind::Float { max, .. } if max == 22_000.0));

        let mut bogus = RawParameterDesc::bool("Broken", "", "", false);
        bogus.type_tag = 9;
        engine.set_parameter_descriptor(dsp.raw(), 1, bogus);
        assert_eq!(
            dsp.parameter_info(1).unwrap_err(),
            Error::Decoding(DecodingError::UnknownParameterType(9))
        );
    }

    #[test]
    fn state_round_trip() {
        let (_engine, system) = setup();
        let dsp = system.create_dsp_by_type(DspType::Chorus).unwrap();
        assert_eq!(dsp.dsp_type().unwrap(), DspType::Chorus);
        dsp.set_active(true).unwrap();
        assert!(dsp.active().unwrap());
        dsp.set_bypass(true).unwrap();
        assert!(dsp.bypass().unwrap());
        let mix = WetDryMix {
            prewet: 0.5,
            postwet: 0.75,
            dry: 0.25,
        };
        dsp.set_wet_dry_mix(mix).unwrap();
        assert_eq!(dsp.wet_dry_mix().unwrap(), mix);
        assert!(dsp.is_idle().unwrap());
        dsp.reset().unwrap();

        let format = ChannelFormat {
            channel_mask: 0,
            num_channels: 6,
            speaker_mode: SpeakerMode::FivePointOne,
        };
        dsp.set_channel_format(format).unwrap();
        assert_eq!(dsp.channel_format().unwrap(), format);
    }

    #[test]
    fn metering() {
        let (_engine, system) = setup();
        let dsp = system.create_dsp_by_type(DspType::Limiter).unwrap();
        assert_eq!(dsp.metering_enabled().unwrap(), MeteringEnabled::default());
        let both = MeteringEnabled {
            input: true,
            output: true,
        };
        dsp.set_metering_enabled(both).unwrap();
        assert_eq!(dsp.metering_enabled().unwrap(), both);
        let (input, output) = dsp.metering_info().unwrap();
        assert_eq!(input.peaks().len(), output.peaks().len());
        assert_eq!(dsp.output_metering().unwrap(), output);
    }

    #[test]
    fn in_use_unit_cannot_close() {
        let (engine, system) = setup();
        let sound = system.create_sound("a.wav", Mode::DEFAULT).unwrap();
        let channel = system.play_sound(&sound, None, false).unwrap();
        let dsp = system.create_dsp_by_type(DspType::Echo).unwrap();
        channel.add_dsp(0, &dsp).unwrap();
        let err = dsp.close().unwrap_err();
        assert_eq!(err.status(), Some(Status::ERR_DSP_INUSE));
        assert_eq!(engine.call_count("DSP_Release"), 1);
    }

    #[test]
    fn released_unit_is_stale() {
        let (_engine, system) = setup();
        let dsp = system.create_dsp_by_type(DspType::Delay).unwrap();
        let view = dsp.to_borrowed();
        dsp.close().unwrap();
        assert!(!view.is_valid().unwrap());
        assert_eq!(view.system().unwrap_err().status(), Some(Status::ERR_INVALID_HANDLE));
    }
}
