//! Error taxonomy for engine calls.
//!
//! - [`EngineError`]: a native entry point returned a non-OK [`Status`].
//! - [`ArgumentError`]: a precondition failed before any native call was made.
//! - [`DecodingError`]: a fixed-shape record or tag coming back from the engine
//!   did not match any known shape.
//! - [`Error::ControlTypeMismatch`]: a callback adapter was invoked for the
//!   wrong kind of object. This is an internal-consistency failure and must
//!   never be swallowed.
//!
//! Stale handles are not errors: liveness queries and `try_` operations report
//! them as `false`.

use std::borrow::Cow;

use thiserror::Error;

use crate::callback::{CallbackType, ControlKind};
use crate::flags::{DspType, TagDataType};
use crate::status::Status;

/// A native entry point returned something other than `OK`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{primitive}: {} ({}): {}", status.name(), status.code(), status.description())]
pub struct EngineError {
    primitive: Cow<'static, str>,
    status: Status,
}

impl EngineError {
    /// Creates an error for `primitive` failing with `status`.
    pub fn new(primitive: impl Into<Cow<'static, str>>, status: Status) -> Self {
        Self {
            primitive: primitive.into(),
            status,
        }
    }

    /// Name of the failing entry point, e.g. `"Sound_Release"`.
    pub fn primitive(&self) -> &str {
        &self.primitive
    }

    /// The status the engine returned.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Numeric code of the status.
    pub fn code(&self) -> i32 {
        self.status.code()
    }
}

/// A caller-supplied argument was rejected before reaching the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    /// A mix matrix must have at least one row and one column.
    #[error("mix matrix must not be empty")]
    EmptyMatrix,

    /// Mix matrix rows must all have the same length.
    #[error("mix matrix row {row} has {actual} columns, expected {expected}")]
    RaggedMatrix {
        /// Index of the offending row.
        row: usize,
        /// Column count of row 0.
        expected: usize,
        /// Column count of the offending row.
        actual: usize,
    },

    /// A flat buffer does not hold `out * in` values.
    #[error("flat matrix has {actual} values, expected {expected}")]
    FlatLength {
        /// `out * in`.
        expected: usize,
        /// Length of the buffer.
        actual: usize,
    },

    /// More levels than the engine accepts in one call.
    #[error("too many levels: {actual} (max {max})")]
    TooManyLevels {
        /// Maximum accepted count.
        max: usize,
        /// Count that was passed.
        actual: usize,
    },

    /// Strings passed to the engine are null-terminated.
    #[error("string contains an interior NUL byte")]
    InteriorNul,

    /// A typed wrapper was requested for a unit of another type.
    #[error("expected a {expected:?} unit, got {actual:?}")]
    WrongDspType {
        /// Type the wrapper requires.
        expected: DspType,
        /// Type the unit reports.
        actual: DspType,
    },

    /// A band index past the last band of a multiband unit.
    #[error("band {band} out of range ({bands} bands)")]
    BandIndex {
        /// Index that was passed.
        band: usize,
        /// Number of bands the unit has.
        bands: usize,
    },

    /// An engine configuration field is out of range.
    #[error("invalid '{field}': {reason}")]
    InvalidConfig {
        /// Name of the offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

/// A record or tag read from the engine does not match a known shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodingError {
    /// Parameter descriptor type tag outside Float/Int/Bool/Data.
    #[error("unknown parameter type tag {0}")]
    UnknownParameterType(i32),

    /// Callback event tag outside END/VIRTUALVOICE/SYNCPOINT/OCCLUSION.
    #[error("unknown callback type {0}")]
    UnknownCallbackType(i32),

    /// Control type tag outside CHANNEL/CHANNELGROUP.
    #[error("unknown control type {0}")]
    UnknownControlType(i32),

    /// A valid event delivered to a kind that never receives it.
    #[error("{callback:?} callback is not delivered to a {kind:?}")]
    UnexpectedCallback {
        /// Adapter kind.
        kind: ControlKind,
        /// Event that arrived.
        callback: CallbackType,
    },

    /// DSP type code not in the catalogue.
    #[error("unknown DSP type {0}")]
    UnknownDspType(i32),

    /// Speaker mode code not in the catalogue.
    #[error("unknown speaker mode {0}")]
    UnknownSpeakerMode(i32),

    /// An enumerated parameter held a value outside its range.
    #[error("parameter '{parameter}' has unknown value {value}")]
    UnknownParameterValue {
        /// Parameter name.
        parameter: &'static str,
        /// Value read back.
        value: i32,
    },

    /// Tag source code not in the catalogue.
    #[error("unknown tag type {0}")]
    UnknownTagType(i32),

    /// Tag payload layout code not in the catalogue.
    #[error("unknown tag data type {0}")]
    UnknownTagDataType(i32),

    /// A numeric tag payload whose size fits no integer or float width.
    #[error("{data_type:?} tag payload of {size} bytes")]
    TagSize {
        /// Layout the tag declared.
        data_type: TagDataType,
        /// Payload length in bytes.
        size: usize,
    },

    /// DSP connection type code not in the catalogue.
    #[error("unknown DSP connection type {0}")]
    UnknownConnectionType(i32),

    /// A fixed-size record had the wrong byte length.
    #[error("{record} record is {actual} bytes, expected {expected}")]
    RecordSize {
        /// Record name.
        record: &'static str,
        /// Expected size in bytes.
        expected: usize,
        /// Size that was delivered.
        actual: usize,
    },

    /// A payload pointer the event shape requires was null.
    #[error("null {what} pointer")]
    NullPayload {
        /// What the pointer was supposed to hold.
        what: &'static str,
    },

    /// More channels than a record can carry.
    #[error("{actual} channels exceeds the maximum of {max}")]
    ChannelCount {
        /// Maximum channel count.
        max: usize,
        /// Count that was reported.
        actual: i32,
    },

    /// The engine reported a negative size.
    #[error("negative {what}: {value}")]
    NegativeDimension {
        /// Which dimension.
        what: &'static str,
        /// Reported value.
        value: i32,
    },

    /// A pointer handed back by the engine could not be read.
    #[error("unreadable engine memory at {0:#x}")]
    UnreadableMemory(usize),
}

/// Errors from engine bindings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A native call failed.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// An argument was rejected locally.
    #[error("invalid argument: {0}")]
    Argument(#[from] ArgumentError),

    /// Data from the engine could not be decoded.
    #[error("decoding error: {0}")]
    Decoding(#[from] DecodingError),

    /// A callback adapter received an event for a different object kind.
    #[error("callback for {actual:?} delivered to a {expected:?} adapter")]
    ControlTypeMismatch {
        /// Kind the adapter serves.
        expected: ControlKind,
        /// Kind the engine reported.
        actual: ControlKind,
    },
}

impl Error {
    /// The engine status, when this is an [`Error::Engine`].
    pub fn status(&self) -> Option<Status> {
        match self {
            Error::Engine(e) => Some(e.status()),
            _ => None,
        }
    }
}

/// Convenience result type for engine bindings.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_error_display() {
        let err = EngineError::new("System_Init", Status::ERR_OUTPUT_INIT);
        assert_eq!(
            err.to_string(),
            "System_Init: OUTPUT_INIT (51): Error initializing output device."
        );
        assert_eq!(err.code(), 51);
        assert_eq!(err.primitive(), "System_Init");
    }

    #[test]
    fn engine_error_is_transparent() {
        let err: Error = EngineError::new("Sound_Release", Status::ERR_INTERNAL).into();
        assert!(err.to_string().starts_with("Sound_Release: INTERNAL (28)"));
        assert_eq!(err.status(), Some(Status::ERR_INTERNAL));
    }

    #[test]
    fn argument_error_display() {
        let err: Error = ArgumentError::RaggedMatrix {
            row: 2,
            expected: 4,
            actual: 3,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "invalid argument: mix matrix row 2 has 3 columns, expected 4"
        );
        assert_eq!(err.status(), None);
    }

    #[test]
    fn decoding_error_display() {
        let err: Error = DecodingError::UnknownParameterType(7).into();
        assert_eq!(err.to_string(), "decoding error: unknown parameter type tag 7");
    }

    #[test]
    fn control_mismatch_display() {
        let err = Error::ControlTypeMismatch {
            expected: ControlKind::Channel,
            actual: ControlKind::ChannelGroup,
        };
        assert_eq!(
            err.to_string(),
            "callback for ChannelGroup delivered to a Channel adapter"
        );
    }
}
