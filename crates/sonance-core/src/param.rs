//! DSP parameter descriptors.
//!
//! The engine describes each DSP parameter with a fixed-size record: a type
//! tag, 16-byte name and label buffers, a description string and a 16-byte
//! payload union. The payload is only meaningful for the shape the tag names,
//! so [`ParameterDescriptor::decode`] reads the tag first and interprets the
//! payload under exactly one of four layouts (native endian):
//!
//! | Tag | Shape | Layout |
//! |-----|-------|--------|
//! | 0 | Float | `f32` min, max, default at 0 / 4 / 8 |
//! | 1 | Int   | `i32` min, max, default at 0 / 4 / 8 |
//! | 2 | Bool  | one byte at 0, non-zero = `true` |
//! | 3 | Data  | `i32` length at 0, pointer-sized address after it at pointer alignment |
//!
//! Any other tag is a [`DecodingError::UnknownParameterType`].

use std::mem;

use crate::error::DecodingError;
use crate::native::RawPtr;

/// Length of the fixed name and label buffers, including the terminator.
pub const PARAMETER_NAME_LEN: usize = 16;

/// Size of the payload union.
pub const PARAMETER_PAYLOAD_LEN: usize = 16;

const DATA_POINTER_OFFSET: usize = if mem::align_of::<usize>() > 4 {
    mem::align_of::<usize>()
} else {
    4
};

/// Parameter descriptor exactly as the engine lays it out.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawParameterDesc {
    /// Shape discriminant.
    pub type_tag: i32,
    /// Null-terminated short name.
    pub name: [u8; PARAMETER_NAME_LEN],
    /// Null-terminated unit label.
    pub label: [u8; PARAMETER_NAME_LEN],
    /// Null-terminated description.
    pub description: Vec<u8>,
    /// Payload union; valid only for the tagged shape.
    pub payload: [u8; PARAMETER_PAYLOAD_LEN],
}

impl RawParameterDesc {
    fn header(type_tag: i32, name: &str, label: &str, description: &str) -> Self {
        let mut description = description.as_bytes().to_vec();
        description.push(0);
        Self {
            type_tag,
            name: fixed_text(name),
            label: fixed_text(label),
            description,
            payload: [0; PARAMETER_PAYLOAD_LEN],
        }
    }

    /// Float parameter record.
    pub fn float(name: &str, label: &str, description: &str, min: f32, max: f32, default: f32) -> Self {
        let mut raw = Self::header(ParameterType::Float.code(), name, label, description);
        raw.payload[0..4].copy_from_slice(&min.to_ne_bytes());
        raw.payload[4..8].copy_from_slice(&max.to_ne_bytes());
        raw.payload[8..12].copy_from_slice(&default.to_ne_bytes());
        raw
    }

    /// Integer parameter record.
    pub fn int(name: &str, label: &str, description: &str, min: i32, max: i32, default: i32) -> Self {
        let mut raw = Self::header(ParameterType::Int.code(), name, label, description);
        raw.payload[0..4].copy_from_slice(&min.to_ne_bytes());
        raw.payload[4..8].copy_from_slice(&max.to_ne_bytes());
        raw.payload[8..12].copy_from_slice(&default.to_ne_bytes());
        raw
    }

    /// Boolean parameter record.
    pub fn bool(name: &str, label: &str, description: &str, default: bool) -> Self {
        let mut raw = Self::header(ParameterType::Bool.code(), name, label, description);
        raw.payload[0] = u8::from(default);
        raw
    }

    /// Data parameter record.
    pub fn data(name: &str, label: &str, description: &str, length: i32, data: RawPtr) -> Self {
        let mut raw = Self::header(ParameterType::Data.code(), name, label, description);
        raw.payload[0..4].copy_from_slice(&length.to_ne_bytes());
        let end = DATA_POINTER_OFFSET + mem::size_of::<usize>();
        raw.payload[DATA_POINTER_OFFSET..end].copy_from_slice(&data.0.to_ne_bytes());
        raw
    }

    fn f32_at(&self, offset: usize) -> f32 {
        f32::from_ne_bytes(self.word_at(offset))
    }

    fn i32_at(&self, offset: usize) -> i32 {
        i32::from_ne_bytes(self.word_at(offset))
    }

    fn word_at(&self, offset: usize) -> [u8; 4] {
        let mut word = [0u8; 4];
        word.copy_from_slice(&self.payload[offset..offset + 4]);
        word
    }

    fn pointer_at(&self, offset: usize) -> RawPtr {
        let mut word = [0u8; mem::size_of::<usize>()];
        word.copy_from_slice(&self.payload[offset..offset + mem::size_of::<usize>()]);
        RawPtr(usize::from_ne_bytes(word))
    }
}

/// Copies `text` into a fixed buffer, truncating to leave room for the
/// terminator.
fn fixed_text(text: &str) -> [u8; PARAMETER_NAME_LEN] {
    let mut buf = [0u8; PARAMETER_NAME_LEN];
    let len = text.len().min(PARAMETER_NAME_LEN - 1);
    buf[..len].copy_from_slice(&text.as_bytes()[..len]);
    buf
}

/// Decodes null-terminated bytes; invalid UTF-8 is replaced.
pub(crate) fn c_text(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// The four parameter shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterType {
    /// Continuous value.
    Float,
    /// Integer value.
    Int,
    /// On/off switch.
    Bool,
    /// Opaque binary blob.
    Data,
}

impl ParameterType {
    /// Native tag.
    pub const fn code(self) -> i32 {
        match self {
            Self::Float => 0,
            Self::Int => 1,
            Self::Bool => 2,
            Self::Data => 3,
        }
    }

    /// Decodes a native tag.
    pub fn from_code(code: i32) -> Result<Self, DecodingError> {
        match code {
            0 => Ok(Self::Float),
            1 => Ok(Self::Int),
            2 => Ok(Self::Bool),
            3 => Ok(Self::Data),
            other => Err(DecodingError::UnknownParameterType(other)),
        }
    }
}

/// Shape-specific part of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParameterKind {
    /// Float range and default.
    Float {
        /// Minimum value.
        min: f32,
        /// Maximum value.
        max: f32,
        /// Default value.
        default: f32,
    },
    /// Integer range and default.
    Int {
        /// Minimum value.
        min: i32,
        /// Maximum value.
        max: i32,
        /// Default value.
        default: i32,
    },
    /// Boolean default.
    Bool {
        /// Default value.
        default: bool,
    },
    /// Binary blob.
    Data {
        /// Length in bytes.
        length: usize,
        /// Engine-owned address.
        data: RawPtr,
    },
}

impl ParameterKind {
    /// The tag of this shape.
    pub const fn parameter_type(&self) -> ParameterType {
        match self {
            Self::Float { .. } => ParameterType::Float,
            Self::Int { .. } => ParameterType::Int,
            Self::Bool { .. } => ParameterType::Bool,
            Self::Data { .. } => ParameterType::Data,
        }
    }
}

/// Decoded description of one DSP parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescriptor {
    /// Short name, e.g. `"Window size"`.
    pub name: String,
    /// Unit label, e.g. `"Hz"`.
    pub label: String,
    /// Long description.
    pub description: String,
    /// Shape and payload.
    pub kind: ParameterKind,
}

impl ParameterDescriptor {
    /// Decodes a raw record, dispatching on its tag.
    pub fn decode(raw: &RawParameterDesc) -> Result<Self, DecodingError> {
        let kind = match ParameterType::from_code(raw.type_tag)? {
            ParameterType::Float => ParameterKind::Float {
                min: raw.f32_at(0),
                max: raw.f32_at(4),
                default: raw.f32_at(8),
            },
            ParameterType::Int => ParameterKind::Int {
                min: raw.i32_at(0),
                max: raw.i32_at(4),
                default: raw.i32_at(8),
            },
            ParameterType::Bool => ParameterKind::Bool {
                default: raw.payload[0] != 0,
            },
            ParameterType::Data => {
                let length = raw.i32_at(0);
                ParameterKind::Data {
                    length: usize::try_from(length).map_err(|_| {
                        DecodingError::NegativeDimension {
                            what: "data parameter length",
                            value: length,
                        }
                    })?,
                    data: raw.pointer_at(DATA_POINTER_OFFSET),
                }
            }
        };
        Ok(Self {
            name: c_text(&raw.name),
            label: c_text(&raw.label),
            description: c_text(&raw.description),
            kind,
        })
    }

    /// The tag of this descriptor.
    pub fn parameter_type(&self) -> ParameterType {
        self.kind.parameter_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_descriptor() {
        let raw = RawParameterDesc::float("Cutoff", "Hz", "Filter cutoff", 10.0, 22000.0, 5000.0);
        let desc = ParameterDescriptor::decode(&raw).unwrap();
        assert_eq!(desc.name, "Cutoff");
        assert_eq!(desc.label, "Hz");
        assert_eq!(desc.description, "Filter cutoff");
        assert_eq!(
            desc.kind,
            ParameterKind::Float {
                min: 10.0,
                max: 22000.0,
                default: 5000.0
            }
        );
        assert_eq!(desc.parameter_type(), ParameterType::Float);
    }

    #[test]
    fn int_descriptor() {
        let raw = RawParameterDesc::int("Window", "", "", 128, 16384, 2048);
        let desc = ParameterDescriptor::decode(&raw).unwrap();
        assert_eq!(
            desc.kind,
            ParameterKind::Int {
                min: 128,
                max: 16384,
                default: 2048
            }
        );
    }

    #[test]
    fn bool_descriptor_reads_one_byte() {
        let mut raw = RawParameterDesc::bool("Downmix", "", "", true);
        // Bytes past the first belong to no shape and must be ignored.
        raw.payload[1..].fill(0xff);
        let desc = ParameterDescriptor::decode(&raw).unwrap();
        assert_eq!(desc.kind, ParameterKind::Bool { default: true });

        let raw = RawParameterDesc::bool("Downmix", "", "", false);
        assert_eq!(
            ParameterDescriptor::decode(&raw).unwrap().kind,
            ParameterKind::Bool { default: false }
        );
    }

    #[test]
    fn data_descriptor() {
        let raw = RawParameterDesc::data("Spectrum", "", "", 264, RawPtr(0xdead_beef));
        let desc = ParameterDescriptor::decode(&raw).unwrap();
        assert_eq!(
            desc.kind,
            ParameterKind::Data {
                length: 264,
                data: RawPtr(0xdead_beef)
            }
        );
    }

    #[test]
    fn negative_data_length_rejected() {
        let raw = RawParameterDesc::data("Blob", "", "", -1, RawPtr::NULL);
        assert!(matches!(
            ParameterDescriptor::decode(&raw),
            Err(DecodingError::NegativeDimension { value: -1, .. })
        ));
    }

    #[test]
    fn unknown_tag_rejected() {
        let mut raw = RawParameterDesc::float("X", "", "", 0.0, 1.0, 0.5);
        raw.type_tag = 4;
        assert_eq!(
            ParameterDescriptor::decode(&raw).unwrap_err(),
            DecodingError::UnknownParameterType(4)
        );
        raw.type_tag = -1;
        assert!(ParameterDescriptor::decode(&raw).is_err());
    }

    #[test]
    fn names_are_truncated_and_terminated() {
        let raw = RawParameterDesc::bool("A very long parameter name", "", "", false);
        assert_eq!(raw.name[PARAMETER_NAME_LEN - 1], 0);
        let desc = ParameterDescriptor::decode(&raw).unwrap();
        assert_eq!(desc.name, "A very long par");
    }

    #[test]
    fn unterminated_and_invalid_text() {
        let mut raw = RawParameterDesc::bool("", "", "", false);
        raw.name = *b"0123456789abcdef";
        raw.label[..3].copy_from_slice(&[b'd', 0xff, b'B']);
        let desc = ParameterDescriptor::decode(&raw).unwrap();
        assert_eq!(desc.name, "0123456789abcdef");
        assert_eq!(desc.label, "d\u{fffd}B");
    }
}
