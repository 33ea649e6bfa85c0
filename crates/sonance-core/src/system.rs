//! The root mixing context.
//!
//! A [`System`] owns the engine instance every other object hangs off. It is
//! built with [`System::builder`]:
//!
//! ```rust
//! use std::sync::Arc;
//! use sonance_core::config::EngineConfig;
//! use sonance_core::mock::MockEngine;
//! use sonance_core::System;
//!
//! let engine = Arc::new(MockEngine::new());
//! let system = System::builder(engine)
//!     .config(EngineConfig::new(64).with_sample_rate(44_100))
//!     .build()?;
//! assert_eq!(system.sample_rate()?, 44_100);
//! system.close()?;
//! # Ok::<(), sonance_core::Error>(())
//! ```
//!
//! Creation and final release of the engine instance run inside one
//! process-wide critical section, because the engine does not tolerate
//! concurrent `System_Create`/`System_Release` calls.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::channel::Channel;
use crate::channel_group::ChannelGroup;
use crate::config::EngineConfig;
use crate::dsp::Dsp;
use crate::effects::{Chorus, Compressor, MultibandEq, ThreeEq};
use crate::error::{DecodingError, EngineError, Result};
use crate::fft::FftDsp;
use crate::flags::{DspType, Mode, SpeakerMode, TimeUnit};
use crate::handle::{Context, Reclaimer, native_object};
use crate::native::{HEADER_VERSION, NativeApi, RawHandle, check_c_str};
use crate::sound::Sound;
use crate::sound_group::SoundGroup;

/// Serializes `System_Create` and `System_Release`.
static ENGINE_LIFECYCLE: Mutex<()> = Mutex::new(());

/// Release primitive for systems: close, then release under the lifecycle
/// lock.
pub(crate) fn release_system(
    api: &dyn NativeApi,
    raw: RawHandle,
) -> std::result::Result<(), EngineError> {
    api.system_close(raw).check("System_Close")?;
    {
        let _guard = ENGINE_LIFECYCLE.lock();
        api.system_release(raw).check("System_Release")?;
    }
    tracing::info!(handle = ?raw, "system released");
    Ok(())
}

/// Software mixer output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoftwareFormat {
    /// Mixer rate in Hz.
    pub sample_rate: i32,
    /// Speaker layout.
    pub speaker_mode: SpeakerMode,
    /// Speaker count for [`SpeakerMode::Raw`].
    pub raw_speakers: i32,
}

/// Engine library version as reported at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineVersion {
    /// Packed `0xMMMMmmpp` version.
    pub version: u32,
    /// Build number.
    pub build: u32,
}

impl EngineVersion {
    /// `true` when the runtime matches the header version these bindings
    /// were written against (major and minor).
    pub fn is_compatible(&self) -> bool {
        self.version >> 8 == HEADER_VERSION >> 8
    }
}

impl fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:x}.{:02x}.{:02x} (build {})",
            self.version >> 16,
            (self.version >> 8) & 0xff,
            self.version & 0xff,
            self.build
        )
    }
}

/// Voice counts from `System_GetChannelsPlaying`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelsPlaying {
    /// Playing channels, real and virtual.
    pub channels: i32,
    /// Channels actually mixed.
    pub real_channels: i32,
}

/// Builds and initializes a [`System`].
pub struct SystemBuilder {
    api: Arc<dyn NativeApi>,
    config: EngineConfig,
    reclaimer: Option<Reclaimer>,
}

impl SystemBuilder {
    /// Replaces the configuration applied during creation.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Reclaimer used for handles dropped without `close()`. Defaults to
    /// [`Reclaimer::global`].
    pub fn reclaimer(mut self, reclaimer: Reclaimer) -> Self {
        self.reclaimer = Some(reclaimer);
        self
    }

    /// Creates the engine instance, applies the pre-init settings and
    /// initializes it.
    ///
    /// If anything after `System_Create` fails the instance is released
    /// before the error is returned.
    pub fn build(self) -> Result<System> {
        self.config.validate()?;
        let reclaimer = self.reclaimer.unwrap_or_else(Reclaimer::global);
        let ctx = Context::new(self.api, reclaimer);

        let mut raw = RawHandle::NULL;
        {
            let _guard = ENGINE_LIFECYCLE.lock();
            ctx.api
                .system_create(&mut raw, HEADER_VERSION)
                .check("System_Create")?;
        }
        let system = System::owned(&ctx, raw);

        if let Err(e) = system.initialize(&self.config) {
            if let Err(release) = system.handle.release() {
                tracing::error!(error = %release, "failed to release system after init failure");
            }
            return Err(e);
        }

        tracing::info!(
            handle = ?raw,
            max_channels = self.config.max_channels,
            "system initialized"
        );
        Ok(system)
    }
}

impl fmt::Debug for SystemBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemBuilder")
            .field("config", &self.config)
            .field("reclaimer", &self.reclaimer)
            .finish_non_exhaustive()
    }
}

native_object!(
    /// The root engine instance.
    ///
    /// Owned when built, borrowed when obtained from another object's
    /// `system()` query. Objects created from a system should be closed before
    /// it; the engine reclaims them anyway when the system goes.
    System, System
);

impl System {
    /// Starts building a system on `api`.
    pub fn builder(api: Arc<dyn NativeApi>) -> SystemBuilder {
        SystemBuilder {
            api,
            config: EngineConfig::default(),
            reclaimer: None,
        }
    }

    fn api(&self) -> &dyn NativeApi {
        self.handle.api()
    }

    fn ctx(&self) -> &Arc<Context> {
        self.handle.ctx()
    }

    fn initialize(&self, config: &EngineConfig) -> Result<()> {
        if let Some(rate) = config.sample_rate {
            self.set_sample_rate(to_i32(rate))?;
        }
        if let Some(mode) = config.speaker_mode {
            let mut format = self.software_format()?;
            format.speaker_mode = mode;
            self.set_software_format(format)?;
        }
        if let Some(buffer) = config.dsp_buffer {
            self.set_dsp_buffer_size(buffer.length, buffer.count)?;
        }
        if let Some(channels) = config.software_channels {
            self.set_software_channels(to_i32(channels))?;
        }
        if let Some(stream) = config.stream_buffer {
            self.set_stream_buffer_size(stream.size, stream.unit)?;
        }

        self.api()
            .system_init(self.raw(), to_i32(config.max_channels), config.init_flags)
            .check("System_Init")?;

        if let Some(timeout) = config.network_timeout_ms {
            self.set_network_timeout(Duration::from_millis(u64::from(timeout)))?;
        }
        if let Some(proxy) = &config.network_proxy {
            self.set_network_proxy(proxy)?;
        }
        Ok(())
    }

    /// Closes and releases the engine instance.
    pub fn close(self) -> Result<()> {
        self.handle.release()?;
        Ok(())
    }

    /// `false` once the instance has been released.
    pub fn is_valid(&self) -> Result<bool> {
        let (mut version, mut build) = (0, 0);
        Ok(self
            .api()
            .system_get_version(self.raw(), &mut version, &mut build)
            .liveness(|| "System_GetVersion".into())?)
    }

    /// Runs one engine tick. Call once per frame.
    pub fn update(&self) -> Result<()> {
        self.api().system_update(self.raw()).check("System_Update")?;
        Ok(())
    }

    /// Suspends mixing (e.g. when the app is backgrounded).
    pub fn mixer_suspend(&self) -> Result<()> {
        self.api()
            .system_mixer_suspend(self.raw())
            .check("System_MixerSuspend")?;
        Ok(())
    }

    /// Resumes mixing after [`mixer_suspend`](Self::mixer_suspend).
    pub fn mixer_resume(&self) -> Result<()> {
        self.api()
            .system_mixer_resume(self.raw())
            .check("System_MixerResume")?;
        Ok(())
    }

    // ── Configuration ──

    /// Maximum number of software-mixed voices.
    pub fn software_channels(&self) -> Result<i32> {
        let mut channels = 0;
        self.api()
            .system_get_software_channels(self.raw(), &mut channels)
            .check("System_GetSoftwareChannels")?;
        Ok(channels)
    }

    /// Sets the software voice count. Only valid before init.
    pub fn set_software_channels(&self, channels: i32) -> Result<()> {
        self.api()
            .system_set_software_channels(self.raw(), channels)
            .check("System_SetSoftwareChannels")?;
        Ok(())
    }

    /// Mixer output format.
    pub fn software_format(&self) -> Result<SoftwareFormat> {
        let (mut sample_rate, mut speaker_mode, mut raw_speakers) = (0, 0, 0);
        self.api()
            .system_get_software_format(
                self.raw(),
                &mut sample_rate,
                &mut speaker_mode,
                &mut raw_speakers,
            )
            .check("System_GetSoftwareFormat")?;
        Ok(SoftwareFormat {
            sample_rate,
            speaker_mode: SpeakerMode::from_code(speaker_mode)
                .ok_or(DecodingError::UnknownSpeakerMode(speaker_mode))?,
            raw_speakers,
        })
    }

    /// Sets the mixer output format. Only valid before init.
    pub fn set_software_format(&self, format: SoftwareFormat) -> Result<()> {
        self.api()
            .system_set_software_format(
                self.raw(),
                format.sample_rate,
                format.speaker_mode.code(),
                format.raw_speakers,
            )
            .check("System_SetSoftwareFormat")?;
        Ok(())
    }

    /// Mixer sample rate in Hz.
    pub fn sample_rate(&self) -> Result<i32> {
        Ok(self.software_format()?.sample_rate)
    }

    /// Changes only the mixer rate, keeping the speaker layout.
    pub fn set_sample_rate(&self, sample_rate: i32) -> Result<()> {
        let format = self.software_format()?;
        self.set_software_format(SoftwareFormat {
            sample_rate,
            ..format
        })
    }

    /// Mixer block length and block count.
    pub fn dsp_buffer_size(&self) -> Result<(u32, i32)> {
        let (mut length, mut count) = (0, 0);
        self.api()
            .system_get_dsp_buffer_size(self.raw(), &mut length, &mut count)
            .check("System_GetDSPBufferSize")?;
        Ok((length, count))
    }

    /// Sets the mixer block layout. Only valid before init.
    pub fn set_dsp_buffer_size(&self, length: u32, count: i32) -> Result<()> {
        self.api()
            .system_set_dsp_buffer_size(self.raw(), length, count)
            .check("System_SetDSPBufferSize")?;
        Ok(())
    }

    /// Default file buffer for streams.
    pub fn stream_buffer_size(&self) -> Result<(u32, TimeUnit)> {
        let (mut size, mut unit) = (0, TimeUnit::default());
        self.api()
            .system_get_stream_buffer_size(self.raw(), &mut size, &mut unit)
            .check("System_GetStreamBufferSize")?;
        Ok((size, unit))
    }

    /// Sets the default file buffer for streams opened afterwards.
    pub fn set_stream_buffer_size(&self, size: u32, unit: TimeUnit) -> Result<()> {
        self.api()
            .system_set_stream_buffer_size(self.raw(), size, unit)
            .check("System_SetStreamBufferSize")?;
        Ok(())
    }

    /// Timeout for network stream reads.
    pub fn network_timeout(&self) -> Result<Duration> {
        let mut timeout_ms = 0;
        self.api()
            .system_get_network_timeout(self.raw(), &mut timeout_ms)
            .check("System_GetNetworkTimeout")?;
        Ok(Duration::from_millis(u64::try_from(timeout_ms).unwrap_or(0)))
    }

    /// Sets the network read timeout. Saturates at `i32::MAX` milliseconds.
    pub fn set_network_timeout(&self, timeout: Duration) -> Result<()> {
        let timeout_ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        self.api()
            .system_set_network_timeout(self.raw(), timeout_ms)
            .check("System_SetNetworkTimeout")?;
        Ok(())
    }

    /// Proxy used for network streams; empty when none is set.
    pub fn network_proxy(&self) -> Result<String> {
        let mut proxy = String::new();
        self.api()
            .system_get_network_proxy(self.raw(), &mut proxy)
            .check("System_GetNetworkProxy")?;
        Ok(proxy)
    }

    /// Sets the proxy (`host:port`) for network streams.
    pub fn set_network_proxy(&self, proxy: &str) -> Result<()> {
        check_c_str(proxy)?;
        self.api()
            .system_set_network_proxy(self.raw(), proxy)
            .check("System_SetNetworkProxy")?;
        Ok(())
    }

    // ── Information ──

    /// Runtime library version.
    pub fn version(&self) -> Result<EngineVersion> {
        let (mut version, mut build) = (0, 0);
        self.api()
            .system_get_version(self.raw(), &mut version, &mut build)
            .check("System_GetVersion")?;
        Ok(EngineVersion { version, build })
    }

    /// Number of playing voices.
    pub fn channels_playing(&self) -> Result<ChannelsPlaying> {
        let mut playing = ChannelsPlaying::default();
        self.api()
            .system_get_channels_playing(
                self.raw(),
                &mut playing.channels,
                &mut playing.real_channels,
            )
            .check("System_GetChannelsPlaying")?;
        Ok(playing)
    }

    // ── Object creation ──

    /// Loads a sound. Use [`Mode::CREATE_STREAM`] or
    /// [`create_stream`](Self::create_stream) for long files.
    pub fn create_sound(&self, name: &str, mode: Mode) -> Result<Sound> {
        check_c_str(name)?;
        let mut raw = RawHandle::NULL;
        self.api()
            .system_create_sound(self.raw(), name, mode, &mut raw)
            .check("System_CreateSound")?;
        Ok(Sound::owned(self.ctx(), raw))
    }

    /// Opens a sound for streaming.
    pub fn create_stream(&self, name: &str, mode: Mode) -> Result<Sound> {
        check_c_str(name)?;
        let mut raw = RawHandle::NULL;
        self.api()
            .system_create_stream(self.raw(), name, mode, &mut raw)
            .check("System_CreateStream")?;
        Ok(Sound::owned(self.ctx(), raw))
    }

    /// Creates a built-in DSP unit.
    pub fn create_dsp_by_type(&self, dsp_type: DspType) -> Result<Dsp> {
        let mut raw = RawHandle::NULL;
        self.api()
            .system_create_dsp_by_type(self.raw(), dsp_type.code(), &mut raw)
            .check("System_CreateDSPByType")?;
        Ok(Dsp::owned(self.ctx(), raw))
    }

    /// Creates an FFT analyser unit.
    pub fn create_fft(&self) -> Result<FftDsp> {
        Ok(FftDsp::from_dsp_unchecked(self.create_dsp_by_type(FftDsp::DSP_TYPE)?))
    }

    /// Creates a five-band equalizer unit.
    pub fn create_multiband_eq(&self) -> Result<MultibandEq> {
        Ok(MultibandEq::from_dsp_unchecked(
            self.create_dsp_by_type(MultibandEq::DSP_TYPE)?,
        ))
    }

    /// Creates a three-band equalizer unit.
    pub fn create_three_eq(&self) -> Result<ThreeEq> {
        Ok(ThreeEq::from_dsp_unchecked(self.create_dsp_by_type(ThreeEq::DSP_TYPE)?))
    }

    /// Creates a compressor unit.
    pub fn create_compressor(&self) -> Result<Compressor> {
        Ok(Compressor::from_dsp_unchecked(
            self.create_dsp_by_type(Compressor::DSP_TYPE)?,
        ))
    }

    /// Creates a chorus unit.
    pub fn create_chorus(&self) -> Result<Chorus> {
        Ok(Chorus::from_dsp_unchecked(self.create_dsp_by_type(Chorus::DSP_TYPE)?))
    }

    /// Creates a named submix bus, routed into the master group.
    pub fn create_channel_group(&self, name: &str) -> Result<ChannelGroup> {
        check_c_str(name)?;
        let mut raw = RawHandle::NULL;
        self.api()
            .system_create_channel_group(self.raw(), name, &mut raw)
            .check("System_CreateChannelGroup")?;
        Ok(ChannelGroup::owned(self.ctx(), raw))
    }

    /// Creates a named sound group.
    pub fn create_sound_group(&self, name: &str) -> Result<SoundGroup> {
        check_c_str(name)?;
        let mut raw = RawHandle::NULL;
        self.api()
            .system_create_sound_group(self.raw(), name, &mut raw)
            .check("System_CreateSoundGroup")?;
        Ok(SoundGroup::owned(self.ctx(), raw))
    }

    /// Plays `sound` on a free channel, routed into `group` (master when
    /// `None`). The channel belongs to the engine.
    pub fn play_sound(
        &self,
        sound: &Sound,
        group: Option<&ChannelGroup>,
        paused: bool,
    ) -> Result<Channel> {
        let mut raw = RawHandle::NULL;
        self.api()
            .system_play_sound(
                self.raw(),
                sound.raw(),
                group.map_or(RawHandle::NULL, ChannelGroup::raw),
                paused,
                &mut raw,
            )
            .check("System_PlaySound")?;
        Ok(Channel::borrowed(self.ctx(), raw))
    }

    /// Plays a DSP unit as a channel source.
    pub fn play_dsp(
        &self,
        dsp: &Dsp,
        group: Option<&ChannelGroup>,
        paused: bool,
    ) -> Result<Channel> {
        let mut raw = RawHandle::NULL;
        self.api()
            .system_play_dsp(
                self.raw(),
                dsp.raw(),
                group.map_or(RawHandle::NULL, ChannelGroup::raw),
                paused,
                &mut raw,
            )
            .check("System_PlayDSP")?;
        Ok(Channel::borrowed(self.ctx(), raw))
    }

    /// Channel by index into the virtual voice pool.
    pub fn channel(&self, id: i32) -> Result<Channel> {
        let mut raw = RawHandle::NULL;
        self.api()
            .system_get_channel(self.raw(), id, &mut raw)
            .check("System_GetChannel")?;
        Ok(Channel::borrowed(self.ctx(), raw))
    }

    /// The final submix bus everything routes into.
    pub fn master_channel_group(&self) -> Result<ChannelGroup> {
        let mut raw = RawHandle::NULL;
        self.api()
            .system_get_master_channel_group(self.raw(), &mut raw)
            .check("System_GetMasterChannelGroup")?;
        Ok(ChannelGroup::borrowed(self.ctx(), raw))
    }

    /// The default sound group.
    pub fn master_sound_group(&self) -> Result<SoundGroup> {
        let mut raw = RawHandle::NULL;
        self.api()
            .system_get_master_sound_group(self.raw(), &mut raw)
            .check("System_GetMasterSoundGroup")?;
        Ok(SoundGroup::borrowed(self.ctx(), raw))
    }

    /// Blocks the mixer so several graph edits land in one block.
    pub fn lock_dsp(&self) -> Result<()> {
        self.api()
            .system_lock_dsp(self.raw())
            .check("System_LockDSP")?;
        Ok(())
    }

    /// Releases [`lock_dsp`](Self::lock_dsp).
    pub fn unlock_dsp(&self) -> Result<()> {
        self.api()
            .system_unlock_dsp(self.raw())
            .check("System_UnlockDSP")?;
        Ok(())
    }

    /// Runs `edit` between [`lock_dsp`](Self::lock_dsp) and
    /// [`unlock_dsp`](Self::unlock_dsp). The lock is released even if `edit`
    /// fails.
    pub fn with_dsp_locked<T>(&self, edit: impl FnOnce() -> Result<T>) -> Result<T> {
        self.lock_dsp()?;
        let result = edit();
        let unlocked = self.unlock_dsp();
        let value = result?;
        unlocked?;
        Ok(value)
    }
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::error::{ArgumentError, Error};
    use crate::flags::InitFlags;
    use crate::mock::MockEngine;
    use crate::status::Status;

    fn build(engine: &Arc<MockEngine>) -> System {
        let (reclaimer, _queue) = Reclaimer::manual();
        System::builder(engine.clone())
            .reclaimer(reclaimer)
            .build()
            .unwrap()
    }

    #[test]
    fn build_creates_then_inits() {
        let engine = Arc::new(MockEngine::new());
        let system = build(&engine);
        assert_eq!(engine.call_count("System_Create"), 1);
        assert_eq!(engine.call_count("System_Init"), 1);
        assert!(system.is_owned());
        assert!(system.is_valid().unwrap());
    }

    #[test]
    fn config_is_applied_before_init() {
        let engine = Arc::new(MockEngine::new());
        let config = EngineConfig::new(48)
            .with_init_flags(InitFlags::PROFILE_ENABLE)
            .with_sample_rate(44_100)
            .with_dsp_buffer(256, 4);
        let system = System::builder(engine.clone())
            .config(config)
            .build()
            .unwrap();
        assert_eq!(system.sample_rate().unwrap(), 44_100);
        assert_eq!(system.dsp_buffer_size().unwrap(), (256, 4));
        assert_eq!(engine.init_args(system.raw()), Some((48, InitFlags::PROFILE_ENABLE)));
    }

    #[test]
    fn set_sample_rate_keeps_speaker_mode() {
        let engine = Arc::new(MockEngine::new());
        let system = build(&engine);
        let before = system.software_format().unwrap();
        system.set_sample_rate(96_000).unwrap();
        let after = system.software_format().unwrap();
        assert_eq!(after.sample_rate, 96_000);
        assert_eq!(after.speaker_mode, before.speaker_mode);
        assert_eq!(after.raw_speakers, before.raw_speakers);
    }

    #[test]
    fn init_failure_releases_instance() {
        let engine = Arc::new(MockEngine::new());
        engine.fail_next("System_Init", Status::ERR_OUTPUT_INIT);
        let err = System::builder(engine.clone()).build().unwrap_err();
        assert_eq!(err.status(), Some(Status::ERR_OUTPUT_INIT));
        assert_eq!(engine.call_count("System_Close"), 1);
        assert_eq!(engine.call_count("System_Release"), 1);
    }

    #[test]
    fn invalid_config_never_reaches_engine() {
        let engine = Arc::new(MockEngine::new());
        let err = System::builder(engine.clone())
            .config(EngineConfig::new(0))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Argument(ArgumentError::InvalidConfig { field: "max_channels", .. })
        ));
        assert_eq!(engine.call_count("System_Create"), 0);
    }

    #[test]
    fn close_runs_close_then_release() {
        let engine = Arc::new(MockEngine::new());
        let system = build(&engine);
        system.close().unwrap();
        assert_eq!(engine.call_count("System_Close"), 1);
        assert_eq!(engine.call_count("System_Release"), 1);
        assert_eq!(engine.live_objects(), 0);
    }

    #[test]
    fn network_settings() {
        let engine = Arc::new(MockEngine::new());
        let system = build(&engine);
        system.set_network_timeout(Duration::from_millis(1500)).unwrap();
        assert_eq!(system.network_timeout().unwrap(), Duration::from_millis(1500));
        system.set_network_proxy("proxy:8080").unwrap();
        assert_eq!(system.network_proxy().unwrap(), "proxy:8080");
        assert!(matches!(
            system.set_network_proxy("bad\0proxy"),
            Err(Error::Argument(ArgumentError::InteriorNul))
        ));
    }

    #[test]
    fn version_display() {
        let version = EngineVersion {
            version: 0x0002_0312,
            build: 7,
        };
        assert_eq!(version.to_string(), "2.03.12 (build 7)");
        assert!(version.is_compatible());
        assert!(
            !EngineVersion {
                version: 0x0002_0200,
                build: 0
            }
            .is_compatible()
        );
    }

    #[test]
    fn queries_return_borrowed_handles() {
        let engine = Arc::new(MockEngine::new());
        let system = build(&engine);
        let master = system.master_channel_group().unwrap();
        assert!(!master.is_owned());
        let sounds = system.master_sound_group().unwrap();
        assert!(!sounds.is_owned());
        let group = system.create_channel_group("music").unwrap();
        assert!(group.is_owned());
    }

    #[test]
    fn dsp_lock_is_released_on_error() {
        let engine = Arc::new(MockEngine::new());
        let system = build(&engine);
        let result: Result<()> = system.with_dsp_locked(|| {
            Err(EngineError::new("DSP_AddInput", Status::ERR_DSP_CONNECTION).into())
        });
        assert!(result.is_err());
        assert_eq!(engine.call_count("System_LockDSP"), 1);
        assert_eq!(engine.call_count("System_UnlockDSP"), 1);
    }

    #[test]
    fn play_sound_on_group() {
        let engine = Arc::new(MockEngine::new());
        let system = build(&engine);
        let sound = system.create_sound("loop.ogg", Mode::LOOP_NORMAL).unwrap();
        let group = system.create_channel_group("sfx").unwrap();
        let channel = system.play_sound(&sound, Some(&group), true).unwrap();
        assert!(!channel.is_owned());
        assert_eq!(
            system.channels_playing().unwrap(),
            ChannelsPlaying {
                channels: 1,
                real_channels: 1
            }
        );
    }
}
