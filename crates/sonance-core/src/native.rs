//! The foreign boundary.
//!
//! [`NativeApi`] is the fixed catalogue of engine entry points. Every method
//! mirrors one native function: plain arguments in, out-parameters as `&mut`,
//! and the engine's integer [`Status`] returned unchecked. The safe wrappers in
//! this crate check that status immediately after each call.
//!
//! Channel and channel-group operations share one set of methods, selected by
//! a [`ControlKind`] argument, because the engine exposes the same function
//! family under two prefixes.
//!
//! An implementation backed by the real shared library forwards each method to
//! its `extern "C"` counterpart. [`MockEngine`](crate::mock::MockEngine) is an
//! in-process implementation for tests and headless tools.

use std::fmt;
use std::sync::Arc;

use crate::callback::ControlKind;
use crate::error::{self, DecodingError};
use crate::flags::{InitFlags, Mode, TimeUnit};
use crate::param::RawParameterDesc;
use crate::spectrum::MeteringInfo;
use crate::status::Status;
use crate::tag::RawTag;

/// Header version passed to `System_Create`.
pub const HEADER_VERSION: u32 = 0x0002_0300;

/// Opaque identity of a native object. Zero is the null handle.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct RawHandle(pub usize);

impl RawHandle {
    /// The null handle.
    pub const NULL: Self = Self(0);

    /// `true` for the null handle.
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Address of engine-owned memory. Only readable through
/// [`NativeApi::read_memory`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RawPtr(pub usize);

impl RawPtr {
    /// The null pointer.
    pub const NULL: Self = Self(0);

    /// `true` for the null pointer.
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Pointer `bytes` past this one.
    #[inline]
    pub const fn offset(self, bytes: usize) -> Self {
        Self(self.0.wrapping_add(bytes))
    }
}

impl fmt::Debug for RawPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Generic notification entry point the engine calls for channel and
/// channel-group events.
///
/// `data1`/`data2` are untyped payload words whose meaning depends on
/// `callback_type`. An `Err` return is an internal-consistency failure; a
/// native trampoline treats it as fatal.
pub trait NativeCallback: Send + Sync {
    /// Handles one notification.
    fn invoke(
        &self,
        control: RawHandle,
        control_type: i32,
        callback_type: i32,
        data1: RawPtr,
        data2: RawPtr,
    ) -> error::Result<Status>;
}

/// The native engine's entry points.
///
/// Names follow `<object>_<operation>`. The engine reports a reclaimed object
/// with [`Status::ERR_INVALID_HANDLE`] (or [`Status::ERR_CHANNEL_STOLEN`] for
/// channels reused by another sound).
#[allow(clippy::too_many_arguments)]
pub trait NativeApi: Send + Sync {
    // ── Memory ──

    /// Copies `out.len()` bytes of engine memory starting at `ptr`. Returns
    /// `false` if the range is not readable.
    fn read_memory(&self, ptr: RawPtr, out: &mut [u8]) -> bool;

    // ── System lifecycle ──

    /// `System_Create`.
    fn system_create(&self, system: &mut RawHandle, header_version: u32) -> Status;
    /// `System_Init`.
    fn system_init(&self, system: RawHandle, max_channels: i32, flags: InitFlags) -> Status;
    /// `System_Close`.
    fn system_close(&self, system: RawHandle) -> Status;
    /// `System_Release`.
    fn system_release(&self, system: RawHandle) -> Status;
    /// `System_Update`.
    fn system_update(&self, system: RawHandle) -> Status;
    /// `System_MixerSuspend`.
    fn system_mixer_suspend(&self, system: RawHandle) -> Status;
    /// `System_MixerResume`.
    fn system_mixer_resume(&self, system: RawHandle) -> Status;

    // ── System configuration ──

    /// `System_GetSoftwareChannels`.
    fn system_get_software_channels(&self, system: RawHandle, channels: &mut i32) -> Status;
    /// `System_SetSoftwareChannels`.
    fn system_set_software_channels(&self, system: RawHandle, channels: i32) -> Status;
    /// `System_GetSoftwareFormat`.
    fn system_get_software_format(
        &self,
        system: RawHandle,
        sample_rate: &mut i32,
        speaker_mode: &mut i32,
        raw_speakers: &mut i32,
    ) -> Status;
    /// `System_SetSoftwareFormat`.
    fn system_set_software_format(
        &self,
        system: RawHandle,
        sample_rate: i32,
        speaker_mode: i32,
        raw_speakers: i32,
    ) -> Status;
    /// `System_GetDSPBufferSize`.
    fn system_get_dsp_buffer_size(&self, system: RawHandle, length: &mut u32, count: &mut i32)
    -> Status;
    /// `System_SetDSPBufferSize`.
    fn system_set_dsp_buffer_size(&self, system: RawHandle, length: u32, count: i32) -> Status;
    /// `System_GetStreamBufferSize`.
    fn system_get_stream_buffer_size(
        &self,
        system: RawHandle,
        size: &mut u32,
        unit: &mut TimeUnit,
    ) -> Status;
    /// `System_SetStreamBufferSize`.
    fn system_set_stream_buffer_size(&self, system: RawHandle, size: u32, unit: TimeUnit) -> Status;
    /// `System_GetNetworkTimeout`.
    fn system_get_network_timeout(&self, system: RawHandle, timeout_ms: &mut i32) -> Status;
    /// `System_SetNetworkTimeout`.
    fn system_set_network_timeout(&self, system: RawHandle, timeout_ms: i32) -> Status;
    /// `System_GetNetworkProxy`.
    fn system_get_network_proxy(&self, system: RawHandle, proxy: &mut String) -> Status;
    /// `System_SetNetworkProxy`.
    fn system_set_network_proxy(&self, system: RawHandle, proxy: &str) -> Status;

    // ── System information ──

    /// `System_GetVersion`.
    fn system_get_version(&self, system: RawHandle, version: &mut u32, build: &mut u32) -> Status;
    /// `System_GetChannelsPlaying`.
    fn system_get_channels_playing(
        &self,
        system: RawHandle,
        channels: &mut i32,
        real_channels: &mut i32,
    ) -> Status;

    // ── System object creation ──

    /// `System_CreateSound`.
    fn system_create_sound(
        &self,
        system: RawHandle,
        name: &str,
        mode: Mode,
        sound: &mut RawHandle,
    ) -> Status;
    /// `System_CreateStream`.
    fn system_create_stream(
        &self,
        system: RawHandle,
        name: &str,
        mode: Mode,
        sound: &mut RawHandle,
    ) -> Status;
    /// `System_CreateDSPByType`.
    fn system_create_dsp_by_type(&self, system: RawHandle, dsp_type: i32, dsp: &mut RawHandle)
    -> Status;
    /// `System_CreateChannelGroup`.
    fn system_create_channel_group(
        &self,
        system: RawHandle,
        name: &str,
        group: &mut RawHandle,
    ) -> Status;
    /// `System_CreateSoundGroup`.
    fn system_create_sound_group(
        &self,
        system: RawHandle,
        name: &str,
        group: &mut RawHandle,
    ) -> Status;
    /// `System_PlaySound`. A null `group` plays on the master group.
    fn system_play_sound(
        &self,
        system: RawHandle,
        sound: RawHandle,
        group: RawHandle,
        paused: bool,
        channel: &mut RawHandle,
    ) -> Status;
    /// `System_PlayDSP`.
    fn system_play_dsp(
        &self,
        system: RawHandle,
        dsp: RawHandle,
        group: RawHandle,
        paused: bool,
        channel: &mut RawHandle,
    ) -> Status;
    /// `System_GetChannel`.
    fn system_get_channel(&self, system: RawHandle, id: i32, channel: &mut RawHandle) -> Status;
    /// `System_GetMasterChannelGroup`.
    fn system_get_master_channel_group(&self, system: RawHandle, group: &mut RawHandle) -> Status;
    /// `System_GetMasterSoundGroup`.
    fn system_get_master_sound_group(&self, system: RawHandle, group: &mut RawHandle) -> Status;
    /// `System_LockDSP`.
    fn system_lock_dsp(&self, system: RawHandle) -> Status;
    /// `System_UnlockDSP`.
    fn system_unlock_dsp(&self, system: RawHandle) -> Status;

    // ── Sound ──

    /// `Sound_Release`.
    fn sound_release(&self, sound: RawHandle) -> Status;
    /// `Sound_GetSystemObject`.
    fn sound_get_system(&self, sound: RawHandle, system: &mut RawHandle) -> Status;
    /// `Sound_GetName`.
    fn sound_get_name(&self, sound: RawHandle, name: &mut String) -> Status;
    /// `Sound_GetLength`.
    fn sound_get_length(&self, sound: RawHandle, length: &mut u32, unit: TimeUnit) -> Status;
    /// `Sound_GetFormat`.
    fn sound_get_format(
        &self,
        sound: RawHandle,
        sound_type: &mut i32,
        format: &mut i32,
        channels: &mut i32,
        bits: &mut i32,
    ) -> Status;
    /// `Sound_GetMode`.
    fn sound_get_mode(&self, sound: RawHandle, mode: &mut Mode) -> Status;
    /// `Sound_SetMode`.
    fn sound_set_mode(&self, sound: RawHandle, mode: Mode) -> Status;
    /// `Sound_GetLoopCount`.
    fn sound_get_loop_count(&self, sound: RawHandle, count: &mut i32) -> Status;
    /// `Sound_SetLoopCount`.
    fn sound_set_loop_count(&self, sound: RawHandle, count: i32) -> Status;
    /// `Sound_GetLoopPoints`.
    fn sound_get_loop_points(
        &self,
        sound: RawHandle,
        start: &mut u32,
        start_unit: TimeUnit,
        end: &mut u32,
        end_unit: TimeUnit,
    ) -> Status;
    /// `Sound_SetLoopPoints`.
    fn sound_set_loop_points(
        &self,
        sound: RawHandle,
        start: u32,
        start_unit: TimeUnit,
        end: u32,
        end_unit: TimeUnit,
    ) -> Status;
    /// `Sound_GetDefaults`.
    fn sound_get_defaults(&self, sound: RawHandle, frequency: &mut f32, priority: &mut i32)
    -> Status;
    /// `Sound_SetDefaults`.
    fn sound_set_defaults(&self, sound: RawHandle, frequency: f32, priority: i32) -> Status;
    /// `Sound_GetNumSubSounds`.
    fn sound_get_num_sub_sounds(&self, sound: RawHandle, count: &mut i32) -> Status;
    /// `Sound_GetSubSound`.
    fn sound_get_sub_sound(&self, sound: RawHandle, index: i32, sub: &mut RawHandle) -> Status;
    /// `Sound_GetSubSoundParent`.
    fn sound_get_sub_sound_parent(&self, sound: RawHandle, parent: &mut RawHandle) -> Status;
    /// `Sound_GetSoundGroup`.
    fn sound_get_sound_group(&self, sound: RawHandle, group: &mut RawHandle) -> Status;
    /// `Sound_SetSoundGroup`.
    fn sound_set_sound_group(&self, sound: RawHandle, group: RawHandle) -> Status;
    /// `Sound_GetNumTags`.
    fn sound_get_num_tags(&self, sound: RawHandle, stored: &mut i32, updated: &mut i32)
    -> Status;
    /// `Sound_GetTag`. `name` of `None` indexes over all tags.
    fn sound_get_tag(
        &self,
        sound: RawHandle,
        name: Option<&str>,
        index: i32,
        tag: &mut RawTag,
    ) -> Status;

    // ── ChannelControl (Channel_* / ChannelGroup_*) ──

    /// `IsPlaying`.
    fn control_is_playing(&self, kind: ControlKind, control: RawHandle, playing: &mut bool)
    -> Status;
    /// `Stop`.
    fn control_stop(&self, kind: ControlKind, control: RawHandle) -> Status;
    /// `GetPaused`.
    fn control_get_paused(&self, kind: ControlKind, control: RawHandle, paused: &mut bool)
    -> Status;
    /// `SetPaused`.
    fn control_set_paused(&self, kind: ControlKind, control: RawHandle, paused: bool) -> Status;
    /// `GetVolume`.
    fn control_get_volume(&self, kind: ControlKind, control: RawHandle, volume: &mut f32)
    -> Status;
    /// `SetVolume`.
    fn control_set_volume(&self, kind: ControlKind, control: RawHandle, volume: f32) -> Status;
    /// `GetVolumeRamp`.
    fn control_get_volume_ramp(&self, kind: ControlKind, control: RawHandle, ramp: &mut bool)
    -> Status;
    /// `SetVolumeRamp`.
    fn control_set_volume_ramp(&self, kind: ControlKind, control: RawHandle, ramp: bool) -> Status;
    /// `GetPitch`.
    fn control_get_pitch(&self, kind: ControlKind, control: RawHandle, pitch: &mut f32) -> Status;
    /// `SetPitch`.
    fn control_set_pitch(&self, kind: ControlKind, control: RawHandle, pitch: f32) -> Status;
    /// `GetMute`.
    fn control_get_mute(&self, kind: ControlKind, control: RawHandle, mute: &mut bool) -> Status;
    /// `SetMute`.
    fn control_set_mute(&self, kind: ControlKind, control: RawHandle, mute: bool) -> Status;
    /// `GetMode`.
    fn control_get_mode(&self, kind: ControlKind, control: RawHandle, mode: &mut Mode) -> Status;
    /// `SetMode`.
    fn control_set_mode(&self, kind: ControlKind, control: RawHandle, mode: Mode) -> Status;
    /// `GetAudibility`.
    fn control_get_audibility(
        &self,
        kind: ControlKind,
        control: RawHandle,
        audibility: &mut f32,
    ) -> Status;
    /// `SetPan`.
    fn control_set_pan(&self, kind: ControlKind, control: RawHandle, pan: f32) -> Status;
    /// `SetMixLevelsInput`.
    fn control_set_mix_levels_input(
        &self,
        kind: ControlKind,
        control: RawHandle,
        levels: &[f32],
    ) -> Status;
    /// `SetMixLevelsOutput` (FL, FR, C, LFE, SL, SR, BL, BR).
    fn control_set_mix_levels_output(
        &self,
        kind: ControlKind,
        control: RawHandle,
        levels: [f32; 8],
    ) -> Status;
    /// `GetMixMatrix`. With `matrix == None` only the dimensions are written.
    fn control_get_mix_matrix(
        &self,
        kind: ControlKind,
        control: RawHandle,
        matrix: Option<&mut [f32]>,
        out_channels: &mut i32,
        in_channels: &mut i32,
        in_hop: i32,
    ) -> Status;
    /// `SetMixMatrix`.
    fn control_set_mix_matrix(
        &self,
        kind: ControlKind,
        control: RawHandle,
        matrix: &[f32],
        out_channels: i32,
        in_channels: i32,
        in_hop: i32,
    ) -> Status;
    /// `AddDSP`.
    fn control_add_dsp(
        &self,
        kind: ControlKind,
        control: RawHandle,
        index: i32,
        dsp: RawHandle,
    ) -> Status;
    /// `RemoveDSP`.
    fn control_remove_dsp(&self, kind: ControlKind, control: RawHandle, dsp: RawHandle) -> Status;
    /// `GetNumDSPs`.
    fn control_get_num_dsps(&self, kind: ControlKind, control: RawHandle, count: &mut i32)
    -> Status;
    /// `GetDSP`. Negative indices select the head/fader/tail positions.
    fn control_get_dsp(
        &self,
        kind: ControlKind,
        control: RawHandle,
        index: i32,
        dsp: &mut RawHandle,
    ) -> Status;
    /// `SetDSPIndex`.
    fn control_set_dsp_index(
        &self,
        kind: ControlKind,
        control: RawHandle,
        dsp: RawHandle,
        index: i32,
    ) -> Status;
    /// `GetDSPIndex`.
    fn control_get_dsp_index(
        &self,
        kind: ControlKind,
        control: RawHandle,
        dsp: RawHandle,
        index: &mut i32,
    ) -> Status;
    /// `GetDSPClock`.
    fn control_get_dsp_clock(
        &self,
        kind: ControlKind,
        control: RawHandle,
        clock: &mut u64,
        parent_clock: &mut u64,
    ) -> Status;
    /// `SetDelay`.
    fn control_set_delay(
        &self,
        kind: ControlKind,
        control: RawHandle,
        start: u64,
        end: u64,
        stop_channels: bool,
    ) -> Status;
    /// `GetDelay`.
    fn control_get_delay(
        &self,
        kind: ControlKind,
        control: RawHandle,
        start: &mut u64,
        end: &mut u64,
        stop_channels: &mut bool,
    ) -> Status;
    /// `AddFadePoint`.
    fn control_add_fade_point(
        &self,
        kind: ControlKind,
        control: RawHandle,
        clock: u64,
        volume: f32,
    ) -> Status;
    /// `SetFadePointRamp`.
    fn control_set_fade_point_ramp(
        &self,
        kind: ControlKind,
        control: RawHandle,
        clock: u64,
        volume: f32,
    ) -> Status;
    /// `RemoveFadePoints`.
    fn control_remove_fade_points(
        &self,
        kind: ControlKind,
        control: RawHandle,
        start: u64,
        end: u64,
    ) -> Status;
    /// `GetFadePoints`. With both buffers `None` only `count` is written;
    /// otherwise at most `*count` points are copied.
    fn control_get_fade_points(
        &self,
        kind: ControlKind,
        control: RawHandle,
        count: &mut u32,
        clocks: Option<&mut [u64]>,
        volumes: Option<&mut [f32]>,
    ) -> Status;
    /// `SetCallback`. `None` clears the callback.
    fn control_set_callback(
        &self,
        kind: ControlKind,
        control: RawHandle,
        callback: Option<Arc<dyn NativeCallback>>,
    ) -> Status;
    /// `GetSystemObject`.
    fn control_get_system(
        &self,
        kind: ControlKind,
        control: RawHandle,
        system: &mut RawHandle,
    ) -> Status;

    // ── Channel ──

    /// `Channel_GetFrequency`.
    fn channel_get_frequency(&self, channel: RawHandle, frequency: &mut f32) -> Status;
    /// `Channel_SetFrequency`.
    fn channel_set_frequency(&self, channel: RawHandle, frequency: f32) -> Status;
    /// `Channel_GetPriority`.
    fn channel_get_priority(&self, channel: RawHandle, priority: &mut i32) -> Status;
    /// `Channel_SetPriority`.
    fn channel_set_priority(&self, channel: RawHandle, priority: i32) -> Status;
    /// `Channel_GetPosition`.
    fn channel_get_position(&self, channel: RawHandle, position: &mut u32, unit: TimeUnit)
    -> Status;
    /// `Channel_SetPosition`.
    fn channel_set_position(&self, channel: RawHandle, position: u32, unit: TimeUnit) -> Status;
    /// `Channel_GetChannelGroup`.
    fn channel_get_channel_group(&self, channel: RawHandle, group: &mut RawHandle) -> Status;
    /// `Channel_SetChannelGroup`.
    fn channel_set_channel_group(&self, channel: RawHandle, group: RawHandle) -> Status;
    /// `Channel_GetLoopCount`.
    fn channel_get_loop_count(&self, channel: RawHandle, count: &mut i32) -> Status;
    /// `Channel_SetLoopCount`.
    fn channel_set_loop_count(&self, channel: RawHandle, count: i32) -> Status;
    /// `Channel_GetLoopPoints`.
    fn channel_get_loop_points(
        &self,
        channel: RawHandle,
        start: &mut u32,
        start_unit: TimeUnit,
        end: &mut u32,
        end_unit: TimeUnit,
    ) -> Status;
    /// `Channel_SetLoopPoints`.
    fn channel_set_loop_points(
        &self,
        channel: RawHandle,
        start: u32,
        start_unit: TimeUnit,
        end: u32,
        end_unit: TimeUnit,
    ) -> Status;
    /// `Channel_IsVirtual`.
    fn channel_is_virtual(&self, channel: RawHandle, is_virtual: &mut bool) -> Status;
    /// `Channel_GetCurrentSound`.
    fn channel_get_current_sound(&self, channel: RawHandle, sound: &mut RawHandle) -> Status;
    /// `Channel_GetIndex`.
    fn channel_get_index(&self, channel: RawHandle, index: &mut i32) -> Status;

    // ── ChannelGroup ──

    /// `ChannelGroup_Release`.
    fn channel_group_release(&self, group: RawHandle) -> Status;
    /// `ChannelGroup_AddGroup`.
    fn channel_group_add_group(
        &self,
        group: RawHandle,
        child: RawHandle,
        propagate_dsp_clock: bool,
        connection: &mut RawHandle,
    ) -> Status;
    /// `ChannelGroup_GetNumGroups`.
    fn channel_group_get_num_groups(&self, group: RawHandle, count: &mut i32) -> Status;
    /// `ChannelGroup_GetGroup`.
    fn channel_group_get_group(&self, group: RawHandle, index: i32, child: &mut RawHandle)
    -> Status;
    /// `ChannelGroup_GetParentGroup`.
    fn channel_group_get_parent_group(&self, group: RawHandle, parent: &mut RawHandle) -> Status;
    /// `ChannelGroup_GetNumChannels`.
    fn channel_group_get_num_channels(&self, group: RawHandle, count: &mut i32) -> Status;
    /// `ChannelGroup_GetChannel`.
    fn channel_group_get_channel(
        &self,
        group: RawHandle,
        index: i32,
        channel: &mut RawHandle,
    ) -> Status;
    /// `ChannelGroup_GetName`.
    fn channel_group_get_name(&self, group: RawHandle, name: &mut String) -> Status;

    // ── DSP ──

    /// `DSP_Release`.
    fn dsp_release(&self, dsp: RawHandle) -> Status;
    /// `DSP_GetSystemObject`.
    fn dsp_get_system(&self, dsp: RawHandle, system: &mut RawHandle) -> Status;
    /// `DSP_AddInput`.
    fn dsp_add_input(
        &self,
        dsp: RawHandle,
        input: RawHandle,
        connection_type: i32,
        connection: &mut RawHandle,
    ) -> Status;
    /// `DSP_GetInput`.
    fn dsp_get_input(
        &self,
        dsp: RawHandle,
        index: i32,
        input: &mut RawHandle,
        connection: &mut RawHandle,
    ) -> Status;
    /// `DSP_GetOutput`.
    fn dsp_get_output(
        &self,
        dsp: RawHandle,
        index: i32,
        output: &mut RawHandle,
        connection: &mut RawHandle,
    ) -> Status;
    /// `DSP_GetNumInputs`.
    fn dsp_get_num_inputs(&self, dsp: RawHandle, count: &mut i32) -> Status;
    /// `DSP_GetNumOutputs`.
    fn dsp_get_num_outputs(&self, dsp: RawHandle, count: &mut i32) -> Status;
    /// `DSP_DisconnectAll`.
    fn dsp_disconnect_all(&self, dsp: RawHandle, inputs: bool, outputs: bool) -> Status;
    /// `DSP_DisconnectFrom`. Null `target` disconnects everything.
    fn dsp_disconnect_from(&self, dsp: RawHandle, target: RawHandle, connection: RawHandle)
    -> Status;
    /// `DSP_GetNumParameters`.
    fn dsp_get_num_parameters(&self, dsp: RawHandle, count: &mut i32) -> Status;
    /// `DSP_GetParameterInfo`.
    fn dsp_get_parameter_info(
        &self,
        dsp: RawHandle,
        index: i32,
        desc: &mut RawParameterDesc,
    ) -> Status;
    /// `DSP_SetParameterFloat`.
    fn dsp_set_parameter_float(&self, dsp: RawHandle, index: i32, value: f32) -> Status;
    /// `DSP_GetParameterFloat`.
    fn dsp_get_parameter_float(&self, dsp: RawHandle, index: i32, value: &mut f32) -> Status;
    /// `DSP_SetParameterInt`.
    fn dsp_set_parameter_int(&self, dsp: RawHandle, index: i32, value: i32) -> Status;
    /// `DSP_GetParameterInt`.
    fn dsp_get_parameter_int(&self, dsp: RawHandle, index: i32, value: &mut i32) -> Status;
    /// `DSP_SetParameterBool`.
    fn dsp_set_parameter_bool(&self, dsp: RawHandle, index: i32, value: bool) -> Status;
    /// `DSP_GetParameterBool`.
    fn dsp_get_parameter_bool(&self, dsp: RawHandle, index: i32, value: &mut bool) -> Status;
    /// `DSP_SetParameterData`.
    fn dsp_set_parameter_data(&self, dsp: RawHandle, index: i32, data: &[u8]) -> Status;
    /// `DSP_GetParameterData`.
    fn dsp_get_parameter_data(
        &self,
        dsp: RawHandle,
        index: i32,
        data: &mut RawPtr,
        length: &mut u32,
    ) -> Status;
    /// `DSP_GetActive`.
    fn dsp_get_active(&self, dsp: RawHandle, active: &mut bool) -> Status;
    /// `DSP_SetActive`.
    fn dsp_set_active(&self, dsp: RawHandle, active: bool) -> Status;
    /// `DSP_GetBypass`.
    fn dsp_get_bypass(&self, dsp: RawHandle, bypass: &mut bool) -> Status;
    /// `DSP_SetBypass`.
    fn dsp_set_bypass(&self, dsp: RawHandle, bypass: bool) -> Status;
    /// `DSP_GetWetDryMix`.
    fn dsp_get_wet_dry_mix(
        &self,
        dsp: RawHandle,
        prewet: &mut f32,
        postwet: &mut f32,
        dry: &mut f32,
    ) -> Status;
    /// `DSP_SetWetDryMix`.
    fn dsp_set_wet_dry_mix(&self, dsp: RawHandle, prewet: f32, postwet: f32, dry: f32) -> Status;
    /// `DSP_GetIdle`.
    fn dsp_get_idle(&self, dsp: RawHandle, idle: &mut bool) -> Status;
    /// `DSP_Reset`.
    fn dsp_reset(&self, dsp: RawHandle) -> Status;
    /// `DSP_GetType`.
    fn dsp_get_type(&self, dsp: RawHandle, dsp_type: &mut i32) -> Status;
    /// `DSP_GetMeteringEnabled`.
    fn dsp_get_metering_enabled(&self, dsp: RawHandle, input: &mut bool, output: &mut bool)
    -> Status;
    /// `DSP_SetMeteringEnabled`.
    fn dsp_set_metering_enabled(&self, dsp: RawHandle, input: bool, output: bool) -> Status;
    /// `DSP_GetMeteringInfo`.
    fn dsp_get_metering_info(
        &self,
        dsp: RawHandle,
        input: Option<&mut MeteringInfo>,
        output: Option<&mut MeteringInfo>,
    ) -> Status;
    /// `DSP_GetChannelFormat`.
    fn dsp_get_channel_format(
        &self,
        dsp: RawHandle,
        channel_mask: &mut u32,
        num_channels: &mut i32,
        speaker_mode: &mut i32,
    ) -> Status;
    /// `DSP_SetChannelFormat`.
    fn dsp_set_channel_format(
        &self,
        dsp: RawHandle,
        channel_mask: u32,
        num_channels: i32,
        speaker_mode: i32,
    ) -> Status;

    // ── DSPConnection ──

    /// `DSPConnection_GetMix`.
    fn connection_get_mix(&self, connection: RawHandle, volume: &mut f32) -> Status;
    /// `DSPConnection_SetMix`.
    fn connection_set_mix(&self, connection: RawHandle, volume: f32) -> Status;
    /// `DSPConnection_GetMixMatrix`.
    fn connection_get_mix_matrix(
        &self,
        connection: RawHandle,
        matrix: Option<&mut [f32]>,
        out_channels: &mut i32,
        in_channels: &mut i32,
        in_hop: i32,
    ) -> Status;
    /// `DSPConnection_SetMixMatrix`.
    fn connection_set_mix_matrix(
        &self,
        connection: RawHandle,
        matrix: &[f32],
        out_channels: i32,
        in_channels: i32,
        in_hop: i32,
    ) -> Status;
    /// `DSPConnection_GetInput`.
    fn connection_get_input(&self, connection: RawHandle, dsp: &mut RawHandle) -> Status;
    /// `DSPConnection_GetOutput`.
    fn connection_get_output(&self, connection: RawHandle, dsp: &mut RawHandle) -> Status;
    /// `DSPConnection_GetType`.
    fn connection_get_type(&self, connection: RawHandle, connection_type: &mut i32) -> Status;

    // ── SoundGroup ──

    /// `SoundGroup_Release`.
    fn sound_group_release(&self, group: RawHandle) -> Status;
    /// `SoundGroup_GetMaxAudible`.
    fn sound_group_get_max_audible(&self, group: RawHandle, max: &mut i32) -> Status;
    /// `SoundGroup_SetMaxAudible`.
    fn sound_group_set_max_audible(&self, group: RawHandle, max: i32) -> Status;
    /// `SoundGroup_GetMaxAudibleBehavior`.
    fn sound_group_get_max_audible_behavior(&self, group: RawHandle, behavior: &mut i32)
    -> Status;
    /// `SoundGroup_SetMaxAudibleBehavior`.
    fn sound_group_set_max_audible_behavior(&self, group: RawHandle, behavior: i32) -> Status;
    /// `SoundGroup_GetMuteFadeSpeed`.
    fn sound_group_get_mute_fade_speed(&self, group: RawHandle, speed: &mut f32) -> Status;
    /// `SoundGroup_SetMuteFadeSpeed`.
    fn sound_group_set_mute_fade_speed(&self, group: RawHandle, speed: f32) -> Status;
    /// `SoundGroup_GetVolume`.
    fn sound_group_get_volume(&self, group: RawHandle, volume: &mut f32) -> Status;
    /// `SoundGroup_SetVolume`.
    fn sound_group_set_volume(&self, group: RawHandle, volume: f32) -> Status;
    /// `SoundGroup_GetNumSounds`.
    fn sound_group_get_num_sounds(&self, group: RawHandle, count: &mut i32) -> Status;
    /// `SoundGroup_GetSound`.
    fn sound_group_get_sound(&self, group: RawHandle, index: i32, sound: &mut RawHandle)
    -> Status;
    /// `SoundGroup_GetNumPlaying`.
    fn sound_group_get_num_playing(&self, group: RawHandle, count: &mut i32) -> Status;
    /// `SoundGroup_Stop`.
    fn sound_group_stop(&self, group: RawHandle) -> Status;
    /// `SoundGroup_GetName`.
    fn sound_group_get_name(&self, group: RawHandle, name: &mut String) -> Status;
}

/// Reads one native-endian `f32` from engine memory.
pub fn read_f32(api: &dyn NativeApi, ptr: RawPtr, what: &'static str) -> Result<f32, DecodingError> {
    if ptr.is_null() {
        return Err(DecodingError::NullPayload { what });
    }
    let mut bytes = [0u8; 4];
    if !api.read_memory(ptr, &mut bytes) {
        return Err(DecodingError::UnreadableMemory(ptr.0));
    }
    Ok(f32::from_ne_bytes(bytes))
}

/// Reads `out.len()` consecutive native-endian `f32`s from engine memory.
pub fn read_f32_slice(
    api: &dyn NativeApi,
    ptr: RawPtr,
    out: &mut [f32],
    what: &'static str,
) -> Result<(), DecodingError> {
    if out.is_empty() {
        return Ok(());
    }
    if ptr.is_null() {
        return Err(DecodingError::NullPayload { what });
    }
    let mut bytes = vec![0u8; out.len() * 4];
    if !api.read_memory(ptr, &mut bytes) {
        return Err(DecodingError::UnreadableMemory(ptr.0));
    }
    for (value, chunk) in out.iter_mut().zip(bytes.chunks_exact(4)) {
        *value = f32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    Ok(())
}

/// Copies `len` bytes out of engine memory. A zero length never dereferences
/// `ptr`.
pub fn read_bytes(
    api: &dyn NativeApi,
    ptr: RawPtr,
    len: usize,
    what: &'static str,
) -> Result<Vec<u8>, DecodingError> {
    if len == 0 {
        return Ok(Vec::new());
    }
    if ptr.is_null() {
        return Err(DecodingError::NullPayload { what });
    }
    let mut bytes = vec![0u8; len];
    if !api.read_memory(ptr, &mut bytes) {
        return Err(DecodingError::UnreadableMemory(ptr.0));
    }
    Ok(bytes)
}

/// Rejects strings the engine cannot receive as null-terminated text.
pub(crate) fn check_c_str(s: &str) -> Result<(), crate::error::ArgumentError> {
    if s.as_bytes().contains(&0) {
        Err(crate::error::ArgumentError::InteriorNul)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockEngine;

    #[test]
    fn null_handles() {
        assert!(RawHandle::NULL.is_null());
        assert!(!RawHandle(7).is_null());
        assert_eq!(format!("{:?}", RawHandle(255)), "0xff");
    }

    #[test]
    fn read_f32_rejects_null() {
        let mock = MockEngine::new();
        let err = read_f32(&mock, RawPtr::NULL, "direct occlusion").unwrap_err();
        assert_eq!(
            err,
            DecodingError::NullPayload {
                what: "direct occlusion"
            }
        );
    }

    #[test]
    fn read_f32_from_engine_memory() {
        let mock = MockEngine::new();
        let ptr = mock.alloc_f32(&[0.25, -3.5]);
        assert_eq!(read_f32(&mock, ptr, "value").unwrap(), 0.25);
        let mut out = [0.0; 2];
        read_f32_slice(&mock, ptr, &mut out, "values").unwrap();
        assert_eq!(out, [0.25, -3.5]);
    }

    #[test]
    fn read_f32_unmapped() {
        let mock = MockEngine::new();
        assert_eq!(
            read_f32(&mock, RawPtr(0x10), "value").unwrap_err(),
            DecodingError::UnreadableMemory(0x10)
        );
    }

    #[test]
    fn read_bytes_of_zero_length_skips_the_pointer() {
        let mock = MockEngine::new();
        assert!(read_bytes(&mock, RawPtr::NULL, 0, "tag").unwrap().is_empty());
        let ptr = mock.alloc_bytes(b"abc");
        assert_eq!(read_bytes(&mock, ptr, 3, "tag").unwrap(), b"abc");
        assert_eq!(
            read_bytes(&mock, RawPtr::NULL, 1, "tag").unwrap_err(),
            DecodingError::NullPayload { what: "tag" }
        );
    }

    #[test]
    fn interior_nul_rejected() {
        assert!(check_c_str("drums.wav").is_ok());
        assert!(check_c_str("dr\0ums").is_err());
    }
}
