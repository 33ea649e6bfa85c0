//! Engine result codes.
//!
//! Every foreign entry point returns one integer from a closed set: `OK` plus
//! 81 named errors. [`Status`] wraps that integer and knows its short name and
//! description, which is what [`EngineError`](crate::EngineError) reports.
//!
//! Two codes are special: [`Status::ERR_INVALID_HANDLE`] and
//! [`Status::ERR_CHANNEL_STOLEN`] mean the engine has already reclaimed the
//! object behind a handle. Liveness queries and `try_` operations turn these
//! into `false` instead of an error (see [`Status::is_stale`]).

use std::borrow::Cow;
use std::fmt;

use crate::error::EngineError;

/// Integer result code returned by every native entry point.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Status(pub i32);

/// (short name, description) indexed by code.
static TABLE: [(&str, &str); 82] = [
    ("OK", "No error."),
    (
        "BADCOMMAND",
        "Tried to call a function on a data type that does not allow this type of functionality (ie calling Sound::lock on a streaming sound).",
    ),
    ("CHANNEL_ALLOC", "Error trying to allocate a channel."),
    (
        "CHANNEL_STOLEN",
        "The specified channel has been reused to play another sound.",
    ),
    ("DMA", "DMA Failure.  See debug output for more information."),
    (
        "DSP_CONNECTION",
        "DSP connection error.  Connection possibly caused a cyclic dependency or connected dsps with incompatible buffer counts.",
    ),
    (
        "DSP_DONTPROCESS",
        "DSP return code from a DSP process query callback.  Tells mixer not to call the process callback and therefore not consume CPU.  Use this to optimize the DSP graph.",
    ),
    (
        "DSP_FORMAT",
        "DSP Format error.  A DSP unit may have attempted to connect to this network with the wrong format, or a matrix may have been set with the wrong size if the target unit has a specified channel map.",
    ),
    (
        "DSP_INUSE",
        "DSP is already in the mixer's DSP network. It must be removed before being reinserted or released.",
    ),
    (
        "DSP_NOTFOUND",
        "DSP connection error.  Couldn't find the DSP unit specified.",
    ),
    (
        "DSP_RESERVED",
        "DSP operation error.  Cannot perform operation on this DSP as it is reserved by the system.",
    ),
    (
        "DSP_SILENCE",
        "DSP return code from a DSP process query callback.  Tells mixer silence would be produced from read, so go idle and not consume CPU.  Use this to optimize the DSP graph.",
    ),
    (
        "DSP_TYPE",
        "DSP operation cannot be performed on a DSP of this type.",
    ),
    ("FILE_BAD", "Error loading file."),
    (
        "FILE_COULDNOTSEEK",
        "Couldn't perform seek operation.  This is a limitation of the medium (ie netstreams) or the file format.",
    ),
    ("FILE_DISKEJECTED", "Media was ejected while reading."),
    (
        "FILE_EOF",
        "End of file unexpectedly reached while trying to read essential data (truncated?).",
    ),
    (
        "FILE_ENDOFDATA",
        "End of current chunk reached while trying to read data.",
    ),
    ("FILE_NOTFOUND", "File not found."),
    ("FORMAT", "Unsupported file or audio format."),
    (
        "HEADER_MISMATCH",
        "There is a version mismatch between the FMOD header and either the FMOD Studio library or the FMOD Low Level library.",
    ),
    (
        "HTTP",
        "A HTTP error occurred. This is a catch-all for HTTP errors not listed elsewhere.",
    ),
    (
        "HTTP_ACCESS",
        "The specified resource requires authentication or is forbidden.",
    ),
    (
        "HTTP_PROXY_AUTH",
        "Proxy authentication is required to access the specified resource.",
    ),
    ("HTTP_SERVER_ERROR", "A HTTP server error occurred."),
    ("HTTP_TIMEOUT", "The HTTP request timed out."),
    (
        "INITIALIZATION",
        "FMOD was not initialized correctly to support this function.",
    ),
    ("INITIALIZED", "Cannot call this command after System::init."),
    (
        "INTERNAL",
        "An error occured in the FMOD system. Use the logging version of FMOD for more information.",
    ),
    (
        "INVALID_FLOAT",
        "Value passed in was a NaN, Inf or denormalized float.",
    ),
    ("INVALID_HANDLE", "An invalid object handle was used."),
    (
        "INVALID_PARAM",
        "An invalid parameter was passed to this function.",
    ),
    (
        "INVALID_POSITION",
        "An invalid seek position was passed to this function.",
    ),
    (
        "INVALID_SPEAKER",
        "An invalid speaker was passed to this function based on the current speaker mode.",
    ),
    (
        "INVALID_SYNCPOINT",
        "The syncpoint did not come from this sound handle.",
    ),
    (
        "INVALID_THREAD",
        "Tried to call a function on a thread that is not supported.",
    ),
    (
        "INVALID_VECTOR",
        "The vectors passed in are not unit length, or perpendicular.",
    ),
    (
        "MAXAUDIBLE",
        "Reached maximum audible playback count for this sound's soundgroup.",
    ),
    ("MEMORY", "Not enough memory or resources."),
    (
        "MEMORY_CANTPOINT",
        "Can't use FMOD_OPENMEMORY_POINT on non PCM source data, or non mp3/xma/adpcm data if FMOD_CREATECOMPRESSEDSAMPLE was used.",
    ),
    (
        "NEEDS3D",
        "Tried to call a command on a 2d sound when the command was meant for 3d sound.",
    ),
    (
        "NEEDSHARDWARE",
        "Tried to use a feature that requires hardware support.",
    ),
    ("NET_CONNECT", "Couldn't connect to the specified host."),
    (
        "NET_SOCKET_ERROR",
        "A socket error occurred.  This is a catch-all for socket-related errors not listed elsewhere.",
    ),
    ("NET_URL", "The specified URL couldn't be resolved."),
    (
        "NET_WOULD_BLOCK",
        "Operation on a non-blocking socket could not complete immediately.",
    ),
    (
        "NOTREADY",
        "Operation could not be performed because specified sound/DSP connection is not ready.",
    ),
    (
        "OUTPUT_ALLOCATED",
        "Error initializing output device, but more specifically, the output device is already in use and cannot be reused.",
    ),
    ("OUTPUT_CREATEBUFFER", "Error creating hardware sound buffer."),
    (
        "OUTPUT_DRIVERCALL",
        "A call to a standard soundcard driver failed, which could possibly mean a bug in the driver or resources were missing or exhausted.",
    ),
    (
        "OUTPUT_FORMAT",
        "Soundcard does not support the specified format.",
    ),
    ("OUTPUT_INIT", "Error initializing output device."),
    (
        "OUTPUT_NODRIVERS",
        "The output device has no drivers installed.  If pre-init, FMOD_OUTPUT_NOSOUND is selected as the output mode.  If post-init, the function just fails.",
    ),
    ("PLUGIN", "An unspecified error has been returned from a plugin."),
    (
        "PLUGIN_MISSING",
        "A requested output, dsp unit type or codec was not available.",
    ),
    (
        "PLUGIN_RESOURCE",
        "A resource that the plugin requires cannot be allocated or found. (ie the DLS file for MIDI playback)",
    ),
    (
        "PLUGIN_VERSION",
        "A plugin was built with an unsupported SDK version.",
    ),
    (
        "RECORD",
        "An error occurred trying to initialize the recording device.",
    ),
    (
        "REVERB_CHANNELGROUP",
        "Reverb properties cannot be set on this channel because a parent channelgroup owns the reverb connection.",
    ),
    (
        "REVERB_INSTANCE",
        "Specified instance in FMOD_REVERB_PROPERTIES couldn't be set. Most likely because it is an invalid instance number or the reverb doesn't exist.",
    ),
    (
        "SUBSOUNDS",
        "The error occurred because the sound referenced contains subsounds when it shouldn't have, or it doesn't contain subsounds when it should have.  The operation may also not be able to be performed on a parent sound.",
    ),
    (
        "SUBSOUND_ALLOCATED",
        "This subsound is already being used by another sound, you cannot have more than one parent to a sound.  Null out the other parent's entry first.",
    ),
    (
        "SUBSOUND_CANTMOVE",
        "Shared subsounds cannot be replaced or moved from their parent stream, such as when the parent stream is an FSB file.",
    ),
    (
        "TAGNOTFOUND",
        "The specified tag could not be found or there are no tags.",
    ),
    (
        "TOOMANYCHANNELS",
        "The sound created exceeds the allowable input channel count.  This can be increased using the 'maxinputchannels' parameter in System::setSoftwareFormat.",
    ),
    (
        "TRUNCATED",
        "The retrieved string is too long to fit in the supplied buffer and has been truncated.",
    ),
    (
        "UNIMPLEMENTED",
        "Something in FMOD hasn't been implemented when it should be. Contact support.",
    ),
    (
        "UNINITIALIZED",
        "This command failed because System::init or System::setDriver was not called.",
    ),
    (
        "UNSUPPORTED",
        "A command issued was not supported by this object.  Possibly a plugin without certain callbacks specified.",
    ),
    (
        "VERSION",
        "The version number of this file format is not supported.",
    ),
    (
        "EVENT_ALREADY_LOADED",
        "The specified bank has already been loaded.",
    ),
    (
        "EVENT_LIVEUPDATE_BUSY",
        "The live update connection failed due to the game already being connected.",
    ),
    (
        "EVENT_LIVEUPDATE_MISMATCH",
        "The live update connection failed due to the game data being out of sync with the tool.",
    ),
    (
        "EVENT_LIVEUPDATE_TIMEOUT",
        "The live update connection timed out.",
    ),
    (
        "EVENT_NOTFOUND",
        "The requested event, parameter, bus or vca could not be found.",
    ),
    (
        "STUDIO_UNINITIALIZED",
        "The Studio::System object is not yet initialized.",
    ),
    (
        "STUDIO_NOT_LOADED",
        "The specified resource is not loaded, so it can't be unloaded.",
    ),
    (
        "INVALID_STRING",
        "An invalid string was passed to this function.",
    ),
    ("ALREADY_LOCKED", "The specified resource is already locked."),
    (
        "NOT_LOCKED",
        "The specified resource is not locked, so it can't be unlocked.",
    ),
    (
        "RECORD_DISCONNECTED",
        "The specified recording driver has been disconnected.",
    ),
    (
        "TOOMANYSAMPLES",
        "The length provided exceeds the allowable limit.",
    ),
];

impl Status {
    /// No error.
    pub const OK: Self = Self(0);
    /// Unsupported functionality for this data type.
    pub const ERR_BADCOMMAND: Self = Self(1);
    /// A channel could not be allocated.
    pub const ERR_CHANNEL_ALLOC: Self = Self(2);
    /// The channel was reused to play another sound.
    pub const ERR_CHANNEL_STOLEN: Self = Self(3);
    /// DSP connection would form a cycle or mismatch buffer counts.
    pub const ERR_DSP_CONNECTION: Self = Self(5);
    /// DSP format or matrix size mismatch.
    pub const ERR_DSP_FORMAT: Self = Self(7);
    /// DSP is still connected in the mixer network.
    pub const ERR_DSP_INUSE: Self = Self(8);
    /// DSP unit not found.
    pub const ERR_DSP_NOTFOUND: Self = Self(9);
    /// DSP is reserved by the system.
    pub const ERR_DSP_RESERVED: Self = Self(10);
    /// Operation not possible on this DSP type.
    pub const ERR_DSP_TYPE: Self = Self(12);
    /// File not found.
    pub const ERR_FILE_NOTFOUND: Self = Self(18);
    /// Unsupported file or audio format.
    pub const ERR_FORMAT: Self = Self(19);
    /// Header and library versions differ.
    pub const ERR_HEADER_MISMATCH: Self = Self(20);
    /// Engine not initialized for this function.
    pub const ERR_INITIALIZATION: Self = Self(26);
    /// Command only valid before init.
    pub const ERR_INITIALIZED: Self = Self(27);
    /// Internal engine error.
    pub const ERR_INTERNAL: Self = Self(28);
    /// NaN, Inf or denormal passed in.
    pub const ERR_INVALID_FLOAT: Self = Self(29);
    /// The handle does not refer to a live object.
    pub const ERR_INVALID_HANDLE: Self = Self(30);
    /// An invalid parameter was passed.
    pub const ERR_INVALID_PARAM: Self = Self(31);
    /// An invalid seek position was passed.
    pub const ERR_INVALID_POSITION: Self = Self(32);
    /// Called from an unsupported thread.
    pub const ERR_INVALID_THREAD: Self = Self(35);
    /// Not enough memory or resources.
    pub const ERR_MEMORY: Self = Self(38);
    /// Sound or connection not ready.
    pub const ERR_NOTREADY: Self = Self(46);
    /// Output device initialization failed.
    pub const ERR_OUTPUT_INIT: Self = Self(51);
    /// Requested plugin or codec not available.
    pub const ERR_PLUGIN_MISSING: Self = Self(54);
    /// Sound has (or lacks) subsounds.
    pub const ERR_SUBSOUNDS: Self = Self(60);
    /// No tag matched the name and index.
    pub const ERR_TAGNOTFOUND: Self = Self(63);
    /// Returned string was truncated.
    pub const ERR_TRUNCATED: Self = Self(65);
    /// Not implemented by the engine.
    pub const ERR_UNIMPLEMENTED: Self = Self(66);
    /// Engine not initialized yet.
    pub const ERR_UNINITIALIZED: Self = Self(67);
    /// Command not supported by this object.
    pub const ERR_UNSUPPORTED: Self = Self(68);
    /// Invalid string passed.
    pub const ERR_INVALID_STRING: Self = Self(77);
    /// Resource already locked.
    pub const ERR_ALREADY_LOCKED: Self = Self(78);
    /// Resource not locked.
    pub const ERR_NOT_LOCKED: Self = Self(79);
    /// Length exceeds the allowable limit.
    pub const ERR_TOOMANYSAMPLES: Self = Self(81);

    /// Numeric code.
    #[inline]
    pub const fn code(self) -> i32 {
        self.0
    }

    /// `true` for [`Status::OK`].
    #[inline]
    pub const fn is_ok(self) -> bool {
        self.0 == 0
    }

    /// `true` when the status means the object behind the handle was reclaimed.
    #[inline]
    pub const fn is_stale(self) -> bool {
        self.0 == Self::ERR_INVALID_HANDLE.0 || self.0 == Self::ERR_CHANNEL_STOLEN.0
    }

    /// Short name (`"INVALID_HANDLE"`), or `"UNKNOWN"` outside the known range.
    pub fn name(self) -> &'static str {
        self.entry().map_or("UNKNOWN", |(name, _)| name)
    }

    /// Human-readable description, or `"Unknown error."`.
    pub fn description(self) -> &'static str {
        self.entry().map_or("Unknown error.", |(_, desc)| desc)
    }

    fn entry(self) -> Option<(&'static str, &'static str)> {
        usize::try_from(self.0)
            .ok()
            .and_then(|i| TABLE.get(i))
            .copied()
    }

    /// Turns a non-OK status into an [`EngineError`] naming `primitive`.
    #[inline]
    pub fn check(self, primitive: &'static str) -> Result<(), EngineError> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(EngineError::new(primitive, self))
        }
    }

    /// Like [`check`](Self::check), building the primitive name only on failure.
    #[inline]
    pub fn check_with(
        self,
        primitive: impl FnOnce() -> Cow<'static, str>,
    ) -> Result<(), EngineError> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(EngineError::new(primitive(), self))
        }
    }

    /// Liveness classification: OK → `true`, stale → `false`, anything else
    /// is an error.
    pub fn liveness(self, primitive: impl FnOnce() -> Cow<'static, str>) -> Result<bool, EngineError> {
        if self.is_ok() {
            Ok(true)
        } else if self.is_stale() {
            Ok(false)
        } else {
            Err(EngineError::new(primitive(), self))
        }
    }
}

impl fmt::Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Status({} {})", self.0, self.name())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_line_up_with_codes() {
        assert_eq!(Status::OK.name(), "OK");
        assert_eq!(Status::ERR_CHANNEL_STOLEN.name(), "CHANNEL_STOLEN");
        assert_eq!(Status::ERR_INVALID_HANDLE.name(), "INVALID_HANDLE");
        assert_eq!(Status::ERR_INITIALIZED.name(), "INITIALIZED");
        assert_eq!(Status::ERR_UNSUPPORTED.name(), "UNSUPPORTED");
        assert_eq!(Status::ERR_TOOMANYSAMPLES.name(), "TOOMANYSAMPLES");
        assert_eq!(Status::ERR_FILE_NOTFOUND.description(), "File not found.");
    }

    #[test]
    fn out_of_range_codes_are_unknown() {
        assert_eq!(Status(82).name(), "UNKNOWN");
        assert_eq!(Status(-1).name(), "UNKNOWN");
        assert_eq!(Status(-1).description(), "Unknown error.");
    }

    #[test]
    fn stale_codes() {
        assert!(Status::ERR_INVALID_HANDLE.is_stale());
        assert!(Status::ERR_CHANNEL_STOLEN.is_stale());
        assert!(!Status::ERR_INVALID_PARAM.is_stale());
        assert!(!Status::OK.is_stale());
    }

    #[test]
    fn liveness_classification() {
        let name = || Cow::Borrowed("Channel_IsPlaying");
        assert_eq!(Status::OK.liveness(name).unwrap(), true);
        assert_eq!(Status::ERR_INVALID_HANDLE.liveness(name).unwrap(), false);
        assert_eq!(Status::ERR_CHANNEL_STOLEN.liveness(name).unwrap(), false);
        let err = Status::ERR_INTERNAL.liveness(name).unwrap_err();
        assert_eq!(err.status(), Status::ERR_INTERNAL);
        assert_eq!(err.primitive(), "Channel_IsPlaying");
    }

    #[test]
    fn check_reports_primitive() {
        assert!(Status::OK.check("Sound_Release").is_ok());
        let err = Status::ERR_MEMORY.check("Sound_Release").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Sound_Release: MEMORY (38): Not enough memory or resources."
        );
    }
}
