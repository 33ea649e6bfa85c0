//! Sound metadata tags.
//!
//! A tag is a name plus a payload whose layout is given by a data-type
//! discriminant. [`TagData::decode`] reads the discriminant first and then
//! interprets the bytes under exactly one shape:
//!
//! | Data type | Shape | Accepted sizes |
//! |-----------|-------|----------------|
//! | Int | signed native-endian integer | 1, 2, 4, 8 |
//! | Float | native-endian float | 4, 8 |
//! | String / StringUtf8 | text up to the first NUL | any |
//! | StringUtf16 / StringUtf16Be | UTF-16 text up to the first NUL unit | any |
//! | Binary | raw bytes | any |
//!
//! Numeric payloads of any other size are a [`DecodingError::TagSize`].

use crate::error::DecodingError;
use crate::flags::{TagDataType, TagType};
use crate::native::{self, NativeApi, RawPtr};

/// Tag record exactly as the engine fills it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawTag {
    /// Source format code.
    pub tag_type: i32,
    /// Payload layout code.
    pub data_type: i32,
    /// Tag name.
    pub name: String,
    /// Payload address; may be null when `data_len` is zero.
    pub data: RawPtr,
    /// Payload length in bytes.
    pub data_len: u32,
    /// Set when the tag changed since it was last read.
    pub updated: bool,
}

/// Decoded tag payload.
#[derive(Debug, Clone, PartialEq)]
pub enum TagData {
    /// Integer payload, sign-extended.
    Int(i64),
    /// Float payload, widened.
    Float(f64),
    /// Text payload of any encoding.
    Text(String),
    /// Opaque payload.
    Binary(Vec<u8>),
}

impl TagData {
    /// Interprets `bytes` under the layout `data_type` names.
    pub fn decode(data_type: TagDataType, bytes: &[u8]) -> Result<Self, DecodingError> {
        let size_error = || DecodingError::TagSize {
            data_type,
            size: bytes.len(),
        };
        match data_type {
            TagDataType::Int => match *bytes {
                [a] => Ok(Self::Int(i64::from(i8::from_ne_bytes([a])))),
                [a, b] => Ok(Self::Int(i64::from(i16::from_ne_bytes([a, b])))),
                [a, b, c, d] => Ok(Self::Int(i64::from(i32::from_ne_bytes([a, b, c, d])))),
                [a, b, c, d, e, f, g, h] => {
                    Ok(Self::Int(i64::from_ne_bytes([a, b, c, d, e, f, g, h])))
                }
                _ => Err(size_error()),
            },
            TagDataType::Float => match *bytes {
                [a, b, c, d] => Ok(Self::Float(f64::from(f32::from_ne_bytes([a, b, c, d])))),
                [a, b, c, d, e, f, g, h] => {
                    Ok(Self::Float(f64::from_ne_bytes([a, b, c, d, e, f, g, h])))
                }
                _ => Err(size_error()),
            },
            TagDataType::String | TagDataType::StringUtf8 => {
                let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
                Ok(Self::Text(String::from_utf8_lossy(&bytes[..end]).into_owned()))
            }
            TagDataType::StringUtf16 => Ok(Self::Text(utf16(bytes, u16::from_le_bytes))),
            TagDataType::StringUtf16Be => Ok(Self::Text(utf16(bytes, u16::from_be_bytes))),
            TagDataType::Binary => Ok(Self::Binary(bytes.to_vec())),
        }
    }

    /// The integer payload, if this is one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// The float payload, if this is one.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// The text payload, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The raw payload, if this is binary.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Binary(b) => Some(b),
            _ => None,
        }
    }
}

fn utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .take_while(|&u| u != 0)
        .collect();
    String::from_utf16_lossy(&units)
}

/// One decoded metadata tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    /// Format the tag came from.
    pub tag_type: TagType,
    /// Tag name, e.g. `"TITLE"`.
    pub name: String,
    /// Decoded payload.
    pub data: TagData,
    /// Whether the tag changed since it was last read.
    pub updated: bool,
}

impl Tag {
    /// Decodes a raw record, copying its payload out of engine memory.
    pub fn decode(api: &dyn NativeApi, raw: &RawTag) -> Result<Self, DecodingError> {
        let tag_type = TagType::from_code(raw.tag_type)?;
        let data_type = TagDataType::from_code(raw.data_type)?;
        let bytes = native::read_bytes(api, raw.data, raw.data_len as usize, "tag data")?;
        Ok(Self {
            tag_type,
            name: raw.name.clone(),
            data: TagData::decode(data_type, &bytes)?,
            updated: raw.updated,
        })
    }
}

/// Tag counts reported by a sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TagCount {
    /// Tags currently held.
    pub stored: i32,
    /// Tags changed since they were last read.
    pub updated: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockEngine;

    #[test]
    fn integers_sign_extend() {
        assert_eq!(
            TagData::decode(TagDataType::Int, &[0xff]).unwrap(),
            TagData::Int(-1)
        );
        assert_eq!(
            TagData::decode(TagDataType::Int, &(-300i16).to_ne_bytes()).unwrap(),
            TagData::Int(-300)
        );
        assert_eq!(
            TagData::decode(TagDataType::Int, &70_000i32.to_ne_bytes()).unwrap(),
            TagData::Int(70_000)
        );
        assert_eq!(
            TagData::decode(TagDataType::Int, &i64::MIN.to_ne_bytes()).unwrap(),
            TagData::Int(i64::MIN)
        );
    }

    #[test]
    fn odd_numeric_sizes_rejected() {
        assert_eq!(
            TagData::decode(TagDataType::Int, &[1, 2, 3]).unwrap_err(),
            DecodingError::TagSize {
                data_type: TagDataType::Int,
                size: 3
            }
        );
        assert_eq!(
            TagData::decode(TagDataType::Float, &[0, 0]).unwrap_err(),
            DecodingError::TagSize {
                data_type: TagDataType::Float,
                size: 2
            }
        );
        assert!(TagData::decode(TagDataType::Int, &[]).is_err());
    }

    #[test]
    fn floats_widen() {
        let data = TagData::decode(TagDataType::Float, &1.5f32.to_ne_bytes()).unwrap();
        assert_eq!(data.as_float(), Some(1.5));
        let data = TagData::decode(TagDataType::Float, &(-0.125f64).to_ne_bytes()).unwrap();
        assert_eq!(data, TagData::Float(-0.125));
    }

    #[test]
    fn text_stops_at_nul() {
        let data = TagData::decode(TagDataType::StringUtf8, "Größe\0junk".as_bytes()).unwrap();
        assert_eq!(data.as_str(), Some("Größe"));
        let data = TagData::decode(TagDataType::String, b"Artist").unwrap();
        assert_eq!(data.as_str(), Some("Artist"));
    }

    #[test]
    fn utf16_either_endianness() {
        let le: Vec<u8> = "hé"
            .encode_utf16()
            .flat_map(u16::to_le_bytes)
            .chain([0, 0, 0x41, 0])
            .collect();
        assert_eq!(
            TagData::decode(TagDataType::StringUtf16, &le).unwrap(),
            TagData::Text("hé".into())
        );
        let be: Vec<u8> = "hé".encode_utf16().flat_map(u16::to_be_bytes).collect();
        assert_eq!(
            TagData::decode(TagDataType::StringUtf16Be, &be).unwrap(),
            TagData::Text("hé".into())
        );
    }

    #[test]
    fn binary_is_verbatim() {
        let data = TagData::decode(TagDataType::Binary, &[0, 1, 0, 2]).unwrap();
        assert_eq!(data.as_bytes(), Some(&[0u8, 1, 0, 2][..]));
        assert_eq!(data.as_int(), None);
    }

    #[test]
    fn raw_record_with_unknown_data_type() {
        let mock = MockEngine::new();
        let raw = RawTag {
            tag_type: TagType::User.code(),
            data_type: 9,
            name: "X".into(),
            ..RawTag::default()
        };
        assert_eq!(
            Tag::decode(&mock, &raw).unwrap_err(),
            DecodingError::UnknownTagDataType(9)
        );
    }

    #[test]
    fn raw_record_reads_engine_memory() {
        let mock = MockEngine::new();
        let payload = 44_100i32.to_ne_bytes();
        let raw = RawTag {
            tag_type: TagType::Fmod.code(),
            data_type: TagDataType::Int.code(),
            name: "Sample Rate Change".into(),
            data: mock.alloc_bytes(&payload),
            data_len: 4,
            updated: true,
        };
        let tag = Tag::decode(&mock, &raw).unwrap();
        assert_eq!(tag.tag_type, TagType::Fmod);
        assert_eq!(tag.data, TagData::Int(44_100));
        assert!(tag.updated);
    }
}
