//! Annotated listing of encoded messages.
//!
//! Walks the wire grammar without building values and without touching any
//! encoder or decoder state. Dictionary references are resolved against a
//! private copy of the supplied dictionary, which learns `STRING_ADD` entries
//! as they appear.

use crate::buffer::{ByteBuffer, ByteOrder};
use crate::error::CodecError;
use crate::tag::{self, Tag, MAX_INLINE};
use std::fmt;

const BINARY_PREVIEW: usize = 16;

/// One element of the listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// Offset of the lead byte.
    pub offset: usize,
    /// Nesting level, 0 for top-level values.
    pub depth: usize,
    /// `None` for inline integers.
    pub tag: Option<Tag>,
    /// Whether this element is an object key.
    pub key: bool,
    pub detail: String,
}

impl Line {
    /// Tag name, or `INT` for inline integers.
    pub fn name(&self) -> &'static str {
        self.tag.map(Tag::name).unwrap_or("INT")
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06x}  {:indent$}", self.offset, "", indent = self.depth * 2)?;
        if self.key {
            write!(f, "key ")?;
        }
        write!(f, "{}", self.name())?;
        if !self.detail.is_empty() {
            write!(f, " {}", self.detail)?;
        }
        Ok(())
    }
}

/// Lists every value in `bytes`, which may hold several concatenated messages.
///
/// Containers nested deeper than `max_depth` fail as they would in a decoder.
pub fn dump(
    bytes: &[u8],
    dictionary: &[String],
    max_depth: usize,
) -> Result<Vec<Line>, CodecError> {
    let mut buf = ByteBuffer::wrap(bytes);
    let mut le = buf.scoped(ByteOrder::Little);
    let mut inspector = Inspector {
        dict: dictionary.to_vec(),
        lines: Vec::new(),
        max_depth,
    };
    while le.remaining() > 0 {
        inspector.value(&mut le, 0)?;
    }
    Ok(inspector.lines)
}

struct Inspector {
    dict: Vec<String>,
    lines: Vec<Line>,
    max_depth: usize,
}

impl Inspector {
    fn push(&mut self, offset: usize, depth: usize, tag: Option<Tag>, key: bool, detail: String) {
        self.lines.push(Line {
            offset,
            depth,
            tag,
            key,
            detail,
        });
    }

    fn value(&mut self, buf: &mut ByteBuffer, depth: usize) -> Result<(), CodecError> {
        let offset = buf.offset();
        let byte = buf.read_u8()?;
        if byte <= MAX_INLINE {
            let n = tag::inline_value(byte);
            self.push(offset, depth, None, false, n.to_string());
            return Ok(());
        }
        let tag = Tag::try_from(byte).map_err(|tag| CodecError::MalformedTag { tag, offset })?;

        let detail = match tag {
            Tag::Null
            | Tag::True
            | Tag::False
            | Tag::EmptyObject
            | Tag::EmptyArray
            | Tag::EmptyString => String::new(),
            Tag::Object => {
                self.enter(depth)?;
                let count = buf.read_varint32()?;
                self.push(offset, depth, Some(tag), false, format!("count={}", count));
                for _ in 0..count {
                    self.key(buf, depth + 1)?;
                    self.value(buf, depth + 1)?;
                }
                return Ok(());
            }
            Tag::Array => {
                self.enter(depth)?;
                let len = buf.read_varint32()?;
                self.push(offset, depth, Some(tag), false, format!("len={}", len));
                for _ in 0..len {
                    self.value(buf, depth + 1)?;
                }
                return Ok(());
            }
            Tag::Integer => buf.read_zigzag32()?.to_string(),
            Tag::Long => buf.read_zigzag64()?.to_string(),
            Tag::Float => buf.read_f32()?.to_string(),
            Tag::Double => buf.read_f64()?.to_string(),
            Tag::String | Tag::StringAdd | Tag::StringGet => self.string(tag, buf)?,
            Tag::Binary => {
                let len = buf.read_varint32()? as usize;
                let data = buf.read_bytes(len)?;
                let preview = hex::encode(&data[..len.min(BINARY_PREVIEW)]);
                if len > BINARY_PREVIEW {
                    format!("len={} {}..", len, preview)
                } else {
                    format!("len={} {}", len, preview)
                }
            }
        };
        self.push(offset, depth, Some(tag), false, detail);
        Ok(())
    }

    /// A container at listing depth `depth` sits at nesting level `depth + 1`.
    fn enter(&self, depth: usize) -> Result<(), CodecError> {
        if depth + 1 > self.max_depth {
            return Err(CodecError::DepthLimitExceeded {
                max: self.max_depth,
            });
        }
        Ok(())
    }

    fn key(&mut self, buf: &mut ByteBuffer, depth: usize) -> Result<(), CodecError> {
        let offset = buf.offset();
        let byte = buf.read_u8()?;
        let tag = match Tag::try_from(byte) {
            Ok(tag @ (Tag::EmptyString | Tag::String | Tag::StringAdd | Tag::StringGet)) => tag,
            _ => return Err(CodecError::MalformedTag { tag: byte, offset }),
        };
        let detail = match tag {
            Tag::EmptyString => String::new(),
            _ => self.string(tag, buf)?,
        };
        self.push(offset, depth, Some(tag), true, detail);
        Ok(())
    }

    fn string(&mut self, tag: Tag, buf: &mut ByteBuffer) -> Result<String, CodecError> {
        match tag {
            Tag::StringGet => {
                let offset = buf.offset();
                let index = buf.read_varint32()?;
                let s = self.dict.get(index as usize).ok_or(
                    CodecError::DictionaryIndexOutOfRange {
                        index,
                        len: self.dict.len(),
                        offset,
                    },
                )?;
                Ok(format!("#{} {:?}", index, s))
            }
            Tag::StringAdd => {
                let s = buf.read_vstring()?;
                let detail = format!("{:?} -> #{}", s, self.dict.len());
                self.dict.push(s);
                Ok(detail)
            }
            _ => Ok(format!("{:?}", buf.read_vstring()?)),
        }
    }
}
