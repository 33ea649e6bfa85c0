//! Bit flags and closed enumerations shared with the engine.
//!
//! Flag sets are `u32` newtypes with associated constants, combined with
//! [`union`](Mode::union) and tested with [`contains`](Mode::contains).
//! Enumerations carry their native integer code; decoding an unknown code is a
//! [`DecodingError`].

use serde::{Deserialize, Serialize};

use crate::error::DecodingError;

macro_rules! bit_flags {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            /// Raw bit pattern.
            #[inline]
            pub const fn bits(self) -> u32 {
                self.0
            }

            /// `true` when every bit of `other` is set in `self`.
            #[inline]
            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            /// Bitwise OR.
            #[inline]
            pub const fn union(self, other: Self) -> Self {
                Self(self.0 | other.0)
            }

            /// `self` with the bits of `other` cleared.
            #[inline]
            pub const fn difference(self, other: Self) -> Self {
                Self(self.0 & !other.0)
            }
        }

        impl std::ops::BitOr for $name {
            type Output = Self;

            fn bitor(self, rhs: Self) -> Self {
                self.union(rhs)
            }
        }
    };
}

bit_flags!(
    /// Sound and channel behaviour flags (`FMOD_MODE`).
    ///
    /// ```rust
    /// use sonance_core::Mode;
    ///
    /// let mode = Mode::LOOP_NORMAL | Mode::CREATE_STREAM;
    /// assert!(mode.contains(Mode::CREATE_STREAM));
    /// ```
    Mode
);

impl Mode {
    /// Engine defaults: `LOOP_OFF | 2D | 3D_WORLDRELATIVE | 3D_INVERSEROLLOFF`.
    pub const DEFAULT: Self = Self(0x0000_0000);
    /// Play once.
    pub const LOOP_OFF: Self = Self(0x0000_0001);
    /// Loop forward.
    pub const LOOP_NORMAL: Self = Self(0x0000_0002);
    /// Loop back and forth.
    pub const LOOP_BIDI: Self = Self(0x0000_0004);
    /// Ignore 3D processing.
    pub const TWO_D: Self = Self(0x0000_0008);
    /// Enable 3D processing.
    pub const THREE_D: Self = Self(0x0000_0010);
    /// Decode in realtime while playing.
    pub const CREATE_STREAM: Self = Self(0x0000_0080);
    /// Decompress fully into memory at load time.
    pub const CREATE_SAMPLE: Self = Self(0x0000_0100);
    /// Keep compressed in memory and decode on the fly.
    pub const CREATE_COMPRESSED_SAMPLE: Self = Self(0x0000_0200);
    /// User-created sound.
    pub const OPEN_USER: Self = Self(0x0000_0400);
    /// Name is a pointer to memory holding the file.
    pub const OPEN_MEMORY: Self = Self(0x0000_0800);
    /// Raw PCM, format from the create info.
    pub const OPEN_RAW: Self = Self(0x0000_1000);
    /// Open only, no decoder setup.
    pub const OPEN_ONLY: Self = Self(0x0000_2000);
    /// Scan for accurate length.
    pub const ACCURATE_TIME: Self = Self(0x0000_4000);
    /// Full MPEG scan for seeking.
    pub const MPEG_SEARCH: Self = Self(0x0000_8000);
    /// Load in the background.
    pub const NONBLOCKING: Self = Self(0x0001_0000);
    /// Only one instance may play at a time.
    pub const UNIQUE: Self = Self(0x0002_0000);
    /// Skip tag parsing.
    pub const IGNORE_TAGS: Self = Self(0x0200_0000);
    /// Reduced memory footprint.
    pub const LOW_MEM: Self = Self(0x0800_0000);
    /// Memory is used in place (no copy).
    pub const OPEN_MEMORY_POINT: Self = Self(0x1000_0000);
    /// Virtual voices restart from the beginning when becoming real.
    pub const VIRTUAL_PLAY_FROM_START: Self = Self(0x8000_0000);
}

bit_flags!(
    /// System initialization flags (`FMOD_INITFLAGS`).
    InitFlags
);

impl InitFlags {
    /// No special behaviour.
    pub const NORMAL: Self = Self(0x0000_0000);
    /// Streams are updated from `System::update` instead of a thread.
    pub const STREAM_FROM_UPDATE: Self = Self(0x0000_0001);
    /// Mixing happens in `System::update`.
    pub const MIX_FROM_UPDATE: Self = Self(0x0000_0002);
    /// Right-handed 3D coordinates.
    pub const RIGHT_HANDED_3D: Self = Self(0x0000_0004);
    /// Soft clip the master output.
    pub const CLIP_OUTPUT: Self = Self(0x0000_0008);
    /// Enables the per-channel lowpass.
    pub const CHANNEL_LOWPASS: Self = Self(0x0000_0100);
    /// Enables distance filtering.
    pub const CHANNEL_DISTANCE_FILTER: Self = Self(0x0000_0200);
    /// Enables the profiler connection.
    pub const PROFILE_ENABLE: Self = Self(0x0001_0000);
    /// Zero-volume channels go virtual.
    pub const VOL0_BECOMES_VIRTUAL: Self = Self(0x0002_0000);
    /// Closest polygon wins for geometry occlusion.
    pub const GEOMETRY_USE_CLOSEST: Self = Self(0x0004_0000);
    /// Prefer Dolby Pro Logic II downmix.
    pub const PREFER_DOLBY_DOWNMIX: Self = Self(0x0008_0000);
    /// The caller serializes all API access.
    pub const THREAD_UNSAFE: Self = Self(0x0010_0000);
    /// Meter every DSP in the profiler.
    pub const PROFILE_METER_ALL: Self = Self(0x0020_0000);
    /// Track memory per object.
    pub const MEMORY_TRACKING: Self = Self(0x0040_0000);
}

bit_flags!(
    /// Units for positions and lengths (`FMOD_TIMEUNIT`).
    TimeUnit
);

impl TimeUnit {
    /// Milliseconds.
    pub const MS: Self = Self(0x0000_0001);
    /// PCM samples.
    pub const PCM: Self = Self(0x0000_0002);
    /// Bytes of decoded PCM.
    pub const PCM_BYTES: Self = Self(0x0000_0004);
    /// Raw bytes of the compressed file.
    pub const RAW_BYTES: Self = Self(0x0000_0008);
    /// Fractions of one PCM sample.
    pub const PCM_FRACTION: Self = Self(0x0000_0010);
    /// Tracker module order.
    pub const MOD_ORDER: Self = Self(0x0000_0100);
    /// Tracker module row.
    pub const MOD_ROW: Self = Self(0x0000_0200);
    /// Tracker module pattern.
    pub const MOD_PATTERN: Self = Self(0x0000_0400);
}

macro_rules! native_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $err:ident {
            $($(#[$vmeta:meta])* $variant:ident = $code:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Native integer code.
            pub const fn code(self) -> i32 {
                match self {
                    $(Self::$variant => $code),+
                }
            }

            /// Decodes a native integer code.
            pub fn from_code(code: i32) -> Result<Self, DecodingError> {
                match code {
                    $($code => Ok(Self::$variant),)+
                    other => Err(DecodingError::$err(other)),
                }
            }
        }
    };
}

native_enum!(
    /// Built-in DSP unit types (`FMOD_DSP_TYPE`).
    DspType, UnknownDspType {
        /// Plugin or user DSP of unknown type.
        Unknown = 0,
        /// Mixes its inputs.
        Mixer = 1,
        /// Tone generator.
        Oscillator = 2,
        /// Resonant lowpass.
        Lowpass = 3,
        /// Impulse Tracker lowpass.
        ItLowpass = 4,
        /// Resonant highpass.
        Highpass = 5,
        /// Echo / delay line.
        Echo = 6,
        /// Volume and pan (one per channel control).
        Fader = 7,
        /// Flange.
        Flange = 8,
        /// Distortion.
        Distortion = 9,
        /// Normalizer.
        Normalize = 10,
        /// Peak limiter.
        Limiter = 11,
        /// Parametric EQ band.
        ParamEq = 12,
        /// Pitch shifter.
        PitchShift = 13,
        /// Chorus.
        Chorus = 14,
        /// Impulse Tracker echo.
        ItEcho = 15,
        /// Compressor.
        Compressor = 16,
        /// I3DL2 reverb.
        SfxReverb = 17,
        /// Simple lowpass.
        LowpassSimple = 18,
        /// Per-channel delay.
        Delay = 19,
        /// Tremolo.
        Tremolo = 20,
        /// Send to a return.
        Send = 21,
        /// Return bus.
        Return = 22,
        /// Simple highpass.
        HighpassSimple = 23,
        /// Panner.
        Pan = 24,
        /// Three-band EQ.
        ThreeEq = 25,
        /// Spectrum analyser.
        Fft = 26,
        /// Loudness meter.
        LoudnessMeter = 27,
        /// Convolution reverb.
        ConvolutionReverb = 28,
        /// Channel remix.
        ChannelMix = 29,
        /// Transceiver.
        Transceiver = 30,
        /// Object panner.
        ObjectPan = 31,
        /// Multiband EQ.
        MultibandEq = 32,
        /// Multiband dynamics.
        MultibandDynamics = 33,
    }
);

native_enum!(
    /// How a DSP input connection carries signal (`FMOD_DSPCONNECTION_TYPE`).
    DspConnectionType, UnknownConnectionType {
        /// Audible signal path.
        Standard = 0,
        /// Side-chain input, not audible.
        Sidechain = 1,
        /// Executed but not audible.
        Send = 2,
        /// Send combined with side-chain.
        SendSidechain = 3,
        /// Pre-allocated, mixing disabled until used.
        Preallocated = 4,
    }
);

native_enum!(
    /// Metadata format a tag came from (`FMOD_TAGTYPE`).
    TagType, UnknownTagType {
        /// Unrecognised source.
        Unknown = 0,
        /// ID3v1.
        Id3v1 = 1,
        /// ID3v2.
        Id3v2 = 2,
        /// Vorbis comment.
        VorbisComment = 3,
        /// SHOUTcast stream metadata.
        Shoutcast = 4,
        /// Icecast stream metadata.
        Icecast = 5,
        /// ASF/WMA attribute.
        Asf = 6,
        /// MIDI text event.
        Midi = 7,
        /// Playlist entry.
        Playlist = 8,
        /// Engine-generated (e.g. sample rate change).
        Fmod = 9,
        /// User-supplied.
        User = 10,
    }
);

native_enum!(
    /// How a tag's payload bytes are laid out (`FMOD_TAGDATATYPE`).
    TagDataType, UnknownTagDataType {
        /// Opaque bytes.
        Binary = 0,
        /// Signed integer of 1, 2, 4 or 8 bytes.
        Int = 1,
        /// Float of 4 or 8 bytes.
        Float = 2,
        /// 8-bit text.
        String = 3,
        /// Little-endian UTF-16 text.
        StringUtf16 = 4,
        /// Big-endian UTF-16 text.
        StringUtf16Be = 5,
        /// UTF-8 text.
        StringUtf8 = 6,
    }
);

/// Speaker layouts (`FMOD_SPEAKERMODE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerMode {
    /// Platform default.
    #[default]
    Default,
    /// No speaker mapping.
    Raw,
    /// One channel.
    Mono,
    /// Two channels.
    Stereo,
    /// Four channels.
    Quad,
    /// Five channels.
    Surround,
    /// 5.1.
    FivePointOne,
    /// 7.1.
    SevenPointOne,
    /// 7.1.4.
    SevenPointOnePointFour,
}

impl SpeakerMode {
    /// Native integer code.
    pub const fn code(self) -> i32 {
        match self {
            Self::Default => 0,
            Self::Raw => 1,
            Self::Mono => 2,
            Self::Stereo => 3,
            Self::Quad => 4,
            Self::Surround => 5,
            Self::FivePointOne => 6,
            Self::SevenPointOne => 7,
            Self::SevenPointOnePointFour => 8,
        }
    }

    /// Decodes a native code; unknown codes map to `None`.
    pub const fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            0 => Self::Default,
            1 => Self::Raw,
            2 => Self::Mono,
            3 => Self::Stereo,
            4 => Self::Quad,
            5 => Self::Surround,
            6 => Self::FivePointOne,
            7 => Self::SevenPointOne,
            8 => Self::SevenPointOnePointFour,
            _ => return None,
        })
    }
}

/// Loop region endpoints with their units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopPoints {
    /// Loop start offset.
    pub start: u32,
    /// Unit of `start`.
    pub start_unit: TimeUnit,
    /// Loop end offset (inclusive).
    pub end: u32,
    /// Unit of `end`.
    pub end_unit: TimeUnit,
}

impl LoopPoints {
    /// Both endpoints in the same unit.
    pub const fn new(start: u32, end: u32, unit: TimeUnit) -> Self {
        Self {
            start,
            start_unit: unit,
            end,
            end_unit: unit,
        }
    }
}

/// Audio data format of a sound, as reported by `Sound::format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoundFormat {
    /// Container type code (`FMOD_SOUND_TYPE`).
    pub sound_type: i32,
    /// Sample format code (`FMOD_SOUND_FORMAT`).
    pub format: i32,
    /// Channel count.
    pub channels: i32,
    /// Bits per sample.
    pub bits: i32,
}
