//! Lead-byte assignments.
//!
//! Every encoded value starts with a single byte:
//!
//! ```text
//! 0x00 ..= 0xEF   zig-zag encoded integer in [-120, 119], no payload
//! 0xF0 NULL       0xF6 OBJECT   varint count, (key, value)*
//! 0xF1 TRUE       0xF7 ARRAY    varint length, value*
//! 0xF2 FALSE      0xF8 INTEGER  zig-zag varint32
//! 0xF3 {}         0xF9 LONG     zig-zag varint64
//! 0xF4 []         0xFA FLOAT    f32 LE
//! 0xF5 ""         0xFB DOUBLE   f64 LE
//!                 0xFC STRING      varint length, UTF-8
//!                 0xFD STRING_ADD  varint length, UTF-8, appended to dictionary
//!                 0xFE STRING_GET  varint dictionary index
//!                 0xFF BINARY      varint length, raw bytes
//! ```

use crate::varint::SInt;

/// Largest lead byte that carries an inline zig-zag integer.
pub const MAX_INLINE: u8 = 0xEF;

/// Smallest integer that fits in the inline range.
pub const INLINE_MIN: i64 = -120;

/// Largest integer that fits in the inline range.
pub const INLINE_MAX: i64 = 119;

/// Type marker occupying the upper sixteen lead-byte values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Tag {
    Null = 0xF0,
    True = 0xF1,
    False = 0xF2,
    EmptyObject = 0xF3,
    EmptyArray = 0xF4,
    EmptyString = 0xF5,
    Object = 0xF6,
    Array = 0xF7,
    Integer = 0xF8,
    Long = 0xF9,
    Float = 0xFA,
    Double = 0xFB,
    String = 0xFC,
    StringAdd = 0xFD,
    StringGet = 0xFE,
    Binary = 0xFF,
}

impl Tag {
    /// Returns the wire byte for this tag.
    pub fn byte(self) -> u8 {
        self as u8
    }

    /// Returns the conventional upper-case name of this tag.
    pub fn name(self) -> &'static str {
        match self {
            Tag::Null => "NULL",
            Tag::True => "TRUE",
            Tag::False => "FALSE",
            Tag::EmptyObject => "EOBJECT",
            Tag::EmptyArray => "EARRAY",
            Tag::EmptyString => "ESTRING",
            Tag::Object => "OBJECT",
            Tag::Array => "ARRAY",
            Tag::Integer => "INTEGER",
            Tag::Long => "LONG",
            Tag::Float => "FLOAT",
            Tag::Double => "DOUBLE",
            Tag::String => "STRING",
            Tag::StringAdd => "STRING_ADD",
            Tag::StringGet => "STRING_GET",
            Tag::Binary => "BINARY",
        }
    }
}

impl TryFrom<u8> for Tag {
    /// Bytes in the inline range are returned unchanged.
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0xF0 => Ok(Tag::Null),
            0xF1 => Ok(Tag::True),
            0xF2 => Ok(Tag::False),
            0xF3 => Ok(Tag::EmptyObject),
            0xF4 => Ok(Tag::EmptyArray),
            0xF5 => Ok(Tag::EmptyString),
            0xF6 => Ok(Tag::Object),
            0xF7 => Ok(Tag::Array),
            0xF8 => Ok(Tag::Integer),
            0xF9 => Ok(Tag::Long),
            0xFA => Ok(Tag::Float),
            0xFB => Ok(Tag::Double),
            0xFC => Ok(Tag::String),
            0xFD => Ok(Tag::StringAdd),
            0xFE => Ok(Tag::StringGet),
            0xFF => Ok(Tag::Binary),
            other => Err(other),
        }
    }
}

/// Returns the single lead byte for `value` if it lies in the inline range.
pub fn inline_byte(value: i64) -> Option<u8> {
    let zz = value.as_zigzag();
    if zz <= MAX_INLINE as u64 {
        Some(zz as u8)
    } else {
        None
    }
}

/// Decodes an inline lead byte back into its integer.
pub fn inline_value(byte: u8) -> i64 {
    i64::un_zigzag(byte as u64)
}
