//! Operations shared by [`Channel`](crate::Channel) and
//! [`ChannelGroup`](crate::ChannelGroup).
//!
//! The engine exposes one function family under two prefixes (`Channel_*` and
//! `ChannelGroup_*`). [`ChannelControl`] is that family as a capability trait;
//! every method is provided and dispatches on the implementor's
//! [`ControlKind`].

use std::sync::Arc;

use crate::callback::{CallbackAdapter, ControlKind, Dispatcher};
use crate::dsp::Dsp;
use crate::error::{ArgumentError, Result};
use crate::flags::Mode;
use crate::mix_matrix::{MixMatrix, read_matrix, read_matrix_size, write_matrix};
use crate::native::{NativeApi, NativeCallback, RawHandle};
use crate::spectrum::MAX_CHANNELS;
use crate::system::System;

/// Chain index of the head DSP (closest to the output).
pub const DSP_INDEX_HEAD: i32 = -1;
/// Chain index of the built-in fader.
pub const DSP_INDEX_FADER: i32 = -2;
/// Chain index of the tail DSP (closest to the input).
pub const DSP_INDEX_TAIL: i32 = -3;

/// Current and parent DSP clocks, in output samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DspClock {
    /// This control's clock.
    pub clock: u64,
    /// The parent group's clock.
    pub parent_clock: u64,
}

/// Sample-accurate start/stop window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Delay {
    /// Parent clock at which playback starts (0 = immediately).
    pub start: u64,
    /// Parent clock at which playback stops (0 = never).
    pub end: u64,
    /// Stop (rather than pause) at `end`.
    pub stop_channels: bool,
}

/// One volume breakpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadePoint {
    /// Parent DSP clock.
    pub clock: u64,
    /// Volume reached at `clock`.
    pub volume: f32,
}

pub(crate) mod sealed {
    use crate::handle::NativeHandle;

    pub trait Sealed {
        fn control(&self) -> &NativeHandle;
    }
}

/// Volume, routing, DSP chain and scheduling controls of a channel or
/// channel group.
pub trait ChannelControl: sealed::Sealed {
    /// Typed dispatcher accepted by [`set_callback`](Self::set_callback).
    type Callbacks: ?Sized + Dispatcher + 'static;

    /// Which function family this control uses.
    fn control_kind(&self) -> ControlKind {
        <Self::Callbacks as Dispatcher>::KIND
    }

    /// `true` while audible or virtual.
    fn is_playing(&self) -> Result<bool> {
        let (api, kind, raw) = parts(self);
        let mut playing = false;
        api.control_is_playing(kind, raw, &mut playing)
            .check_with(|| kind.primitive("IsPlaying"))?;
        Ok(playing)
    }

    /// `false` once the engine has reclaimed the object (finished or stolen
    /// channel, released group).
    fn is_valid(&self) -> Result<bool> {
        let (api, kind, raw) = parts(self);
        let mut playing = false;
        Ok(api
            .control_is_playing(kind, raw, &mut playing)
            .liveness(|| kind.primitive("IsPlaying"))?)
    }

    /// Stops playback.
    fn stop(&self) -> Result<()> {
        let (api, kind, raw) = parts(self);
        api.control_stop(kind, raw)
            .check_with(|| kind.primitive("Stop"))?;
        Ok(())
    }

    /// Stops playback; `false` if the object was already gone.
    fn try_stop(&self) -> Result<bool> {
        let (api, kind, raw) = parts(self);
        Ok(api
            .control_stop(kind, raw)
            .liveness(|| kind.primitive("Stop"))?)
    }

    /// Pause state.
    fn paused(&self) -> Result<bool> {
        let (api, kind, raw) = parts(self);
        let mut paused = false;
        api.control_get_paused(kind, raw, &mut paused)
            .check_with(|| kind.primitive("GetPaused"))?;
        Ok(paused)
    }

    /// Pauses or resumes.
    fn set_paused(&self, paused: bool) -> Result<()> {
        let (api, kind, raw) = parts(self);
        api.control_set_paused(kind, raw, paused)
            .check_with(|| kind.primitive("SetPaused"))?;
        Ok(())
    }

    /// Linear volume.
    fn volume(&self) -> Result<f32> {
        let (api, kind, raw) = parts(self);
        let mut volume = 0.0;
        api.control_get_volume(kind, raw, &mut volume)
            .check_with(|| kind.primitive("GetVolume"))?;
        Ok(volume)
    }

    /// Sets the linear volume (1.0 = unity).
    fn set_volume(&self, volume: f32) -> Result<()> {
        let (api, kind, raw) = parts(self);
        api.control_set_volume(kind, raw, volume)
            .check_with(|| kind.primitive("SetVolume"))?;
        Ok(())
    }

    /// Whether volume changes are ramped.
    fn volume_ramp(&self) -> Result<bool> {
        let (api, kind, raw) = parts(self);
        let mut ramp = false;
        api.control_get_volume_ramp(kind, raw, &mut ramp)
            .check_with(|| kind.primitive("GetVolumeRamp"))?;
        Ok(ramp)
    }

    /// Enables or disables volume ramping.
    fn set_volume_ramp(&self, ramp: bool) -> Result<()> {
        let (api, kind, raw) = parts(self);
        api.control_set_volume_ramp(kind, raw, ramp)
            .check_with(|| kind.primitive("SetVolumeRamp"))?;
        Ok(())
    }

    /// Relative pitch (1.0 = original).
    fn pitch(&self) -> Result<f32> {
        let (api, kind, raw) = parts(self);
        let mut pitch = 0.0;
        api.control_get_pitch(kind, raw, &mut pitch)
            .check_with(|| kind.primitive("GetPitch"))?;
        Ok(pitch)
    }

    /// Sets the relative pitch.
    fn set_pitch(&self, pitch: f32) -> Result<()> {
        let (api, kind, raw) = parts(self);
        api.control_set_pitch(kind, raw, pitch)
            .check_with(|| kind.primitive("SetPitch"))?;
        Ok(())
    }

    /// Mute state.
    fn mute(&self) -> Result<bool> {
        let (api, kind, raw) = parts(self);
        let mut mute = false;
        api.control_get_mute(kind, raw, &mut mute)
            .check_with(|| kind.primitive("GetMute"))?;
        Ok(mute)
    }

    /// Mutes or unmutes without touching the volume.
    fn set_mute(&self, mute: bool) -> Result<()> {
        let (api, kind, raw) = parts(self);
        api.control_set_mute(kind, raw, mute)
            .check_with(|| kind.primitive("SetMute"))?;
        Ok(())
    }

    /// Playback mode flags.
    fn mode(&self) -> Result<Mode> {
        let (api, kind, raw) = parts(self);
        let mut mode = Mode::DEFAULT;
        api.control_get_mode(kind, raw, &mut mode)
            .check_with(|| kind.primitive("GetMode"))?;
        Ok(mode)
    }

    /// Changes playback mode flags.
    fn set_mode(&self, mode: Mode) -> Result<()> {
        let (api, kind, raw) = parts(self);
        api.control_set_mode(kind, raw, mode)
            .check_with(|| kind.primitive("SetMode"))?;
        Ok(())
    }

    /// Combined volume after every attenuation stage.
    fn audibility(&self) -> Result<f32> {
        let (api, kind, raw) = parts(self);
        let mut audibility = 0.0;
        api.control_get_audibility(kind, raw, &mut audibility)
            .check_with(|| kind.primitive("GetAudibility"))?;
        Ok(audibility)
    }

    /// Stereo pan, -1.0 (left) to 1.0 (right).
    fn set_pan(&self, pan: f32) -> Result<()> {
        let (api, kind, raw) = parts(self);
        api.control_set_pan(kind, raw, pan)
            .check_with(|| kind.primitive("SetPan"))?;
        Ok(())
    }

    /// Per-input-channel levels. At most 32 values.
    fn set_mix_levels_input(&self, levels: &[f32]) -> Result<()> {
        if levels.len() > MAX_CHANNELS {
            return Err(ArgumentError::TooManyLevels {
                max: MAX_CHANNELS,
                actual: levels.len(),
            }
            .into());
        }
        let (api, kind, raw) = parts(self);
        api.control_set_mix_levels_input(kind, raw, levels)
            .check_with(|| kind.primitive("SetMixLevelsInput"))?;
        Ok(())
    }

    /// Output speaker levels in FL, FR, C, LFE, SL, SR, BL, BR order.
    fn set_mix_levels_output(&self, levels: [f32; 8]) -> Result<()> {
        let (api, kind, raw) = parts(self);
        api.control_set_mix_levels_output(kind, raw, levels)
            .check_with(|| kind.primitive("SetMixLevelsOutput"))?;
        Ok(())
    }

    /// `(out, in)` dimensions of the current mix matrix.
    fn mix_matrix_size(&self) -> Result<(usize, usize)> {
        let (api, kind, raw) = parts(self);
        read_matrix_size(
            || kind.primitive("GetMixMatrix"),
            |buf, out, inp, hop| api.control_get_mix_matrix(kind, raw, buf, out, inp, hop),
        )
    }

    /// Current mix matrix; empty when none is set.
    fn mix_matrix(&self) -> Result<MixMatrix> {
        let (api, kind, raw) = parts(self);
        read_matrix(
            || kind.primitive("GetMixMatrix"),
            |buf, out, inp, hop| api.control_get_mix_matrix(kind, raw, buf, out, inp, hop),
        )
    }

    /// Replaces the mix matrix. Empty matrices are rejected locally.
    fn set_mix_matrix(&self, matrix: &MixMatrix) -> Result<()> {
        let (api, kind, raw) = parts(self);
        write_matrix(
            || kind.primitive("SetMixMatrix"),
            matrix,
            |data, out, inp, hop| api.control_set_mix_matrix(kind, raw, data, out, inp, hop),
        )
    }

    /// Inserts `dsp` into the chain at `index` (or one of the `DSP_INDEX_*`
    /// positions).
    fn add_dsp(&self, index: i32, dsp: &Dsp) -> Result<()> {
        let (api, kind, raw) = parts(self);
        api.control_add_dsp(kind, raw, index, dsp.raw())
            .check_with(|| kind.primitive("AddDSP"))?;
        Ok(())
    }

    /// Removes `dsp` from the chain.
    fn remove_dsp(&self, dsp: &Dsp) -> Result<()> {
        let (api, kind, raw) = parts(self);
        api.control_remove_dsp(kind, raw, dsp.raw())
            .check_with(|| kind.primitive("RemoveDSP"))?;
        Ok(())
    }

    /// Units in the chain, including the fader.
    fn num_dsps(&self) -> Result<i32> {
        let (api, kind, raw) = parts(self);
        let mut count = 0;
        api.control_get_num_dsps(kind, raw, &mut count)
            .check_with(|| kind.primitive("GetNumDSPs"))?;
        Ok(count)
    }

    /// Unit at `index` in the chain.
    fn dsp(&self, index: i32) -> Result<Dsp> {
        let (api, kind, raw) = parts(self);
        let mut dsp = RawHandle::NULL;
        api.control_get_dsp(kind, raw, index, &mut dsp)
            .check_with(|| kind.primitive("GetDSP"))?;
        Ok(Dsp::borrowed(self.control().ctx(), dsp))
    }

    /// Unit closest to the output.
    fn head_dsp(&self) -> Result<Dsp> {
        self.dsp(DSP_INDEX_HEAD)
    }

    /// The built-in volume/pan unit.
    fn fader_dsp(&self) -> Result<Dsp> {
        self.dsp(DSP_INDEX_FADER)
    }

    /// Unit closest to the input.
    fn tail_dsp(&self) -> Result<Dsp> {
        self.dsp(DSP_INDEX_TAIL)
    }

    /// Moves `dsp` to `index` within the chain.
    fn set_dsp_index(&self, dsp: &Dsp, index: i32) -> Result<()> {
        let (api, kind, raw) = parts(self);
        api.control_set_dsp_index(kind, raw, dsp.raw(), index)
            .check_with(|| kind.primitive("SetDSPIndex"))?;
        Ok(())
    }

    /// Position of `dsp` within the chain.
    fn dsp_index(&self, dsp: &Dsp) -> Result<i32> {
        let (api, kind, raw) = parts(self);
        let mut index = 0;
        api.control_get_dsp_index(kind, raw, dsp.raw(), &mut index)
            .check_with(|| kind.primitive("GetDSPIndex"))?;
        Ok(index)
    }

    /// DSP clocks of this control and its parent.
    fn dsp_clock(&self) -> Result<DspClock> {
        let (api, kind, raw) = parts(self);
        let mut clock = DspClock::default();
        api.control_get_dsp_clock(kind, raw, &mut clock.clock, &mut clock.parent_clock)
            .check_with(|| kind.primitive("GetDSPClock"))?;
        Ok(clock)
    }

    /// Schedules start and stop on the parent clock.
    fn set_delay(&self, delay: Delay) -> Result<()> {
        let (api, kind, raw) = parts(self);
        api.control_set_delay(kind, raw, delay.start, delay.end, delay.stop_channels)
            .check_with(|| kind.primitive("SetDelay"))?;
        Ok(())
    }

    /// Current start/stop schedule.
    fn delay(&self) -> Result<Delay> {
        let (api, kind, raw) = parts(self);
        let mut delay = Delay::default();
        api.control_get_delay(
            kind,
            raw,
            &mut delay.start,
            &mut delay.end,
            &mut delay.stop_channels,
        )
        .check_with(|| kind.primitive("GetDelay"))?;
        Ok(delay)
    }

    /// Adds a volume breakpoint at `clock`.
    fn add_fade_point(&self, clock: u64, volume: f32) -> Result<()> {
        let (api, kind, raw) = parts(self);
        api.control_add_fade_point(kind, raw, clock, volume)
            .check_with(|| kind.primitive("AddFadePoint"))?;
        Ok(())
    }

    /// Ramps from the current volume to `volume` at `clock`, replacing any
    /// fade points in between.
    fn set_fade_point_ramp(&self, clock: u64, volume: f32) -> Result<()> {
        let (api, kind, raw) = parts(self);
        api.control_set_fade_point_ramp(kind, raw, clock, volume)
            .check_with(|| kind.primitive("SetFadePointRamp"))?;
        Ok(())
    }

    /// Removes breakpoints in `start..=end`.
    fn remove_fade_points(&self, start: u64, end: u64) -> Result<()> {
        let (api, kind, raw) = parts(self);
        api.control_remove_fade_points(kind, raw, start, end)
            .check_with(|| kind.primitive("RemoveFadePoints"))?;
        Ok(())
    }

    /// Number of stored breakpoints.
    fn fade_point_count(&self) -> Result<usize> {
        let (api, kind, raw) = parts(self);
        let mut count = 0;
        api.control_get_fade_points(kind, raw, &mut count, None, None)
            .check_with(|| kind.primitive("GetFadePoints"))?;
        Ok(count as usize)
    }

    /// All breakpoints, ordered by clock.
    fn fade_points(&self) -> Result<Vec<FadePoint>> {
        let (api, kind, raw) = parts(self);
        let mut count = 0;
        api.control_get_fade_points(kind, raw, &mut count, None, None)
            .check_with(|| kind.primitive("GetFadePoints"))?;
        if count == 0 {
            return Ok(Vec::new());
        }
        let mut clocks = vec![0u64; count as usize];
        let mut volumes = vec![0.0f32; count as usize];
        api.control_get_fade_points(
            kind,
            raw,
            &mut count,
            Some(clocks.as_mut_slice()),
            Some(volumes.as_mut_slice()),
        )
        .check_with(|| kind.primitive("GetFadePoints"))?;
        Ok(clocks
            .into_iter()
            .zip(volumes)
            .take(count as usize)
            .map(|(clock, volume)| FadePoint { clock, volume })
            .collect())
    }

    /// Routes this control's notifications to `adapter`; `None` detaches.
    fn set_callback(
        &self,
        adapter: Option<&Arc<CallbackAdapter<Self::Callbacks>>>,
    ) -> Result<()> {
        let (api, kind, raw) = parts(self);
        let callback = adapter.map(|a| Arc::clone(a) as Arc<dyn NativeCallback>);
        api.control_set_callback(kind, raw, callback)
            .check_with(|| kind.primitive("SetCallback"))?;
        Ok(())
    }

    /// The owning system (borrowed).
    fn system(&self) -> Result<System> {
        let (api, kind, raw) = parts(self);
        let mut system = RawHandle::NULL;
        api.control_get_system(kind, raw, &mut system)
            .check_with(|| kind.primitive("GetSystemObject"))?;
        Ok(System::borrowed(self.control().ctx(), system))
    }
}

fn parts<C: ChannelControl + ?Sized>(control: &C) -> (&dyn NativeApi, ControlKind, RawHandle) {
    let handle = control.control();
    (handle.api(), control.control_kind(), handle.raw())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::flags::DspType;
    use crate::mock::MockEngine;
    use crate::status::Status;

    fn setup() -> (Arc<MockEngine>, System) {
        let engine = Arc::new(MockEngine::new());
        let system = System::builder(engine.clone()).build().unwrap();
        (engine, system)
    }

    #[test]
    fn chain_positions() {
        let (_engine, system) = setup();
        let group = system.create_channel_group("fx").unwrap();
        let fader = group.fader_dsp().unwrap();
        assert_eq!(fader.dsp_type().unwrap(), DspType::Fader);
        assert_eq!(group.num_dsps().unwrap(), 1);

        let echo = system.create_dsp_by_type(DspType::Echo).unwrap();
        let lowpass = system.create_dsp_by_type(DspType::Lowpass).unwrap();
        group.add_dsp(DSP_INDEX_HEAD, &echo).unwrap();
        group.add_dsp(DSP_INDEX_TAIL, &lowpass).unwrap();
        assert_eq!(group.head_dsp().unwrap().raw(), echo.raw());
        assert_eq!(group.tail_dsp().unwrap().raw(), lowpass.raw());
        assert_eq!(group.dsp_index(&fader).unwrap(), 1);

        group.set_dsp_index(&lowpass, 0).unwrap();
        assert_eq!(group.dsp_index(&lowpass).unwrap(), 0);
        assert_eq!(group.dsp(1).unwrap().raw(), echo.raw());

        group.remove_dsp(&echo).unwrap();
        group.remove_dsp(&lowpass).unwrap();
        assert_eq!(group.num_dsps().unwrap(), 1);
        assert_eq!(
            group.dsp_index(&echo).unwrap_err().status(),
            Some(Status::ERR_DSP_NOTFOUND)
        );
    }

    #[test]
    fn fade_points_are_ordered() {
        let (_engine, system) = setup();
        let sound = system.create_sound("swell.wav", Mode::DEFAULT).unwrap();
        let channel = system.play_sound(&sound, None, true).unwrap();
        assert!(channel.fade_points().unwrap().is_empty());

        channel.add_fade_point(4096, 0.0).unwrap();
        channel.add_fade_point(1024, 1.0).unwrap();
        assert_eq!(channel.fade_point_count().unwrap(), 2);
        assert_eq!(
            channel.fade_points().unwrap(),
            vec![
                FadePoint { clock: 1024, volume: 1.0 },
                FadePoint { clock: 4096, volume: 0.0 },
            ]
        );

        channel.remove_fade_points(0, 2048).unwrap();
        assert_eq!(channel.fade_point_count().unwrap(), 1);
    }

    #[test]
    fn fade_ramp_starts_at_current_clock() {
        let (_engine, system) = setup();
        let group = system.create_channel_group("ramp").unwrap();
        system.update().unwrap();
        let now = group.dsp_clock().unwrap().clock;
        assert!(now > 0);

        group.set_volume(0.8).unwrap();
        group.set_fade_point_ramp(now + 48_000, 0.0).unwrap();
        let points = group.fade_points().unwrap();
        assert_eq!(points.first(), Some(&FadePoint { clock: now, volume: 0.8 }));
        assert_eq!(points.last(), Some(&FadePoint { clock: now + 48_000, volume: 0.0 }));
    }

    #[test]
    fn delay_round_trip() {
        let (_engine, system) = setup();
        let group = system.create_channel_group("delayed").unwrap();
        assert_eq!(group.delay().unwrap(), Delay::default());
        let delay = Delay {
            start: 48_000,
            end: 96_000,
            stop_channels: true,
        };
        group.set_delay(delay).unwrap();
        assert_eq!(group.delay().unwrap(), delay);
    }

    #[test]
    fn too_many_input_levels() {
        let (engine, system) = setup();
        let group = system.create_channel_group("levels").unwrap();
        let err = group.set_mix_levels_input(&[0.5; 33]).unwrap_err();
        assert_eq!(
            err,
            Error::Argument(ArgumentError::TooManyLevels { max: 32, actual: 33 })
        );
        assert_eq!(engine.call_count("ChannelGroup_SetMixLevelsInput"), 0);
        group.set_mix_levels_input(&[0.5; 32]).unwrap();
    }

    #[test]
    fn audibility_follows_mute() {
        let (_engine, system) = setup();
        let sound = system.create_sound("hum.wav", Mode::DEFAULT).unwrap();
        let channel = system.play_sound(&sound, None, false).unwrap();
        channel.set_volume(0.5).unwrap();
        assert_eq!(channel.audibility().unwrap(), 0.5);
        channel.set_mute(true).unwrap();
        assert!(channel.mute().unwrap());
        assert_eq!(channel.audibility().unwrap(), 0.0);
        assert_eq!(channel.volume().unwrap(), 0.5);
    }

    #[test]
    fn owning_system_is_borrowed() {
        let (_engine, system) = setup();
        let group = system.create_channel_group("owner").unwrap();
        let owner = ChannelControl::system(&group).unwrap();
        assert_eq!(owner.raw(), system.raw());
        assert!(!owner.is_owned());
    }
}
