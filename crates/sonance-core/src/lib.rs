//! Sonance Core - handle-safe object model over a native audio engine
//!
//! The engine hands out opaque integer handles for systems, sounds, channels,
//! buses, DSP units and the connections between them. This crate wraps each
//! handle in a typed object whose lifetime rules match the engine's:
//! creation results own their handle and release it exactly once, while
//! query results borrow a handle the engine keeps alive.
//!
//! # Core Abstractions
//!
//! ## Lifecycle
//!
//! - [`NativeHandle`] - one native identity plus its single-fire release token
//! - [`Reclaimer`] / [`ReclaimQueue`] - where releases of dropped wrappers run
//! - [`Status`] - the engine's result codes, checked after every native call
//!
//! ## Object Model
//!
//! - [`System`] - engine instance and factory for everything else
//! - [`Sound`], [`SoundGroup`] - loaded audio and audibility limits
//! - [`Channel`], [`ChannelGroup`] - playing voices and submix buses, sharing
//!   the [`ChannelControl`] operations
//! - [`Dsp`], [`DspConnection`], [`FftDsp`] - the processing graph
//! - [`MultibandEq`], [`ThreeEq`], [`Compressor`], [`Chorus`] - typed built-in
//!   effect units
//!
//! ## Native Data
//!
//! - [`MixMatrix`] - row-major speaker matrices, read in two phases
//! - [`ParameterDescriptor`] - decoded DSP parameter metadata
//! - [`SpectrumFrame`], [`MeteringInfo`] - analyser and meter records
//! - [`Tag`] - sound metadata, decoded by its data-type discriminant
//! - [`ChannelCallbacks`], [`ChannelGroupCallbacks`] - typed notification
//!   dispatch from the engine's generic callback
//!
//! ## Engine Boundary
//!
//! - [`NativeApi`] - the catalogue of native entry points
//! - [`mock::MockEngine`] - an in-process engine for tests and headless tools
//! - [`config::EngineConfig`] - TOML-loadable settings applied before init
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use sonance_core::mock::MockEngine;
//! use sonance_core::{ChannelControl, DspType, Mode, System};
//!
//! let engine = Arc::new(MockEngine::new());
//! let system = System::builder(engine).build()?;
//!
//! let music = system.create_channel_group("music")?;
//! let sound = system.create_sound("theme.ogg", Mode::LOOP_NORMAL)?;
//! let channel = system.play_sound(&sound, Some(&music), false)?;
//! channel.set_volume(0.5)?;
//!
//! let echo = system.create_dsp_by_type(DspType::Echo)?;
//! music.add_dsp(0, &echo)?;
//! assert_eq!(music.num_dsps()?, 2);
//! music.remove_dsp(&echo)?;
//! # Ok::<(), sonance_core::Error>(())
//! ```
//!
//! # Design Principles
//!
//! - **Checked boundary**: every native status is turned into a typed error
//!   naming the primitive that produced it
//! - **Single release**: owned handles release once, explicitly or on drop
//! - **Stale is not fatal**: a handle the engine reclaimed reads as
//!   "not valid" rather than an error
//! - **Callback-safe drops**: releases can be deferred off the engine's
//!   callback thread

pub mod callback;
pub mod channel;
pub mod channel_control;
pub mod channel_group;
pub mod config;
pub mod dsp;
pub mod dsp_connection;
pub mod effects;
pub mod error;
pub mod fft;
pub mod flags;
pub mod handle;
pub mod mix_matrix;
pub mod mock;
pub mod native;
pub mod param;
pub mod sound;
pub mod sound_group;
pub mod spectrum;
pub mod status;
pub mod system;
pub mod tag;

// Re-export main types at crate root
pub use callback::{
    CallbackAdapter, CallbackEvent, CallbackType, ChannelCallback, ChannelCallbacks,
    ChannelGroupCallback, ChannelGroupCallbacks, ControlKind,
};
pub use channel::Channel;
pub use channel_control::{
    ChannelControl, DSP_INDEX_FADER, DSP_INDEX_HEAD, DSP_INDEX_TAIL, Delay, DspClock, FadePoint,
};
pub use channel_group::ChannelGroup;
pub use config::{ConfigError, EngineConfig};
pub use dsp::{ChannelFormat, Dsp, MeteringEnabled, WetDryMix};
pub use dsp_connection::DspConnection;
pub use effects::{Chorus, Compressor, CrossoverSlope, EqFilter, MultibandEq, ThreeEq};
pub use error::{ArgumentError, DecodingError, EngineError, Error, Result};
pub use fft::{FftDownmix, FftDsp, FftWindow};
pub use flags::{
    DspConnectionType, DspType, InitFlags, LoopPoints, Mode, SoundFormat, SpeakerMode, TagDataType,
    TagType, TimeUnit,
};
pub use handle::{NativeHandle, ObjectKind, Ownership, ReclaimQueue, Reclaimer, ReleaseToken};
pub use mix_matrix::MixMatrix;
pub use native::{HEADER_VERSION, NativeApi, NativeCallback, RawHandle, RawPtr};
pub use param::{ParameterDescriptor, ParameterKind, ParameterType, RawParameterDesc};
pub use sound::{Sound, SoundDefaults};
pub use sound_group::{MaxAudibleBehavior, SoundGroup};
pub use spectrum::{MeteringInfo, SpectrumFrame};
pub use status::Status;
pub use system::{ChannelsPlaying, EngineVersion, SoftwareFormat, System, SystemBuilder};
pub use tag::{RawTag, Tag, TagCount, TagData};
