//! Value tree to PSON bytes.

use crate::buffer::{ByteBuffer, ByteOrder};
use crate::config::{Mode, Options};
use crate::dictionary::EncoderDictionary;
use crate::error::CodecError;
use crate::tag::{self, Tag};
use crate::value::{float_as_i64, Object, Value};
use bytes::Bytes;

/// Encodes values, maintaining the string-to-index side of the dictionary.
#[derive(Debug, Clone)]
pub struct Encoder {
    dict: EncoderDictionary,
    mode: Mode,
    options: Options,
}

impl Encoder {
    /// Creates an encoder seeded with `dictionary`.
    pub fn new<I, S>(dictionary: I, mode: Mode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_options(dictionary, mode, Options::default())
    }

    pub fn with_options<I, S>(dictionary: I, mode: Mode, options: Options) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dict: EncoderDictionary::new(dictionary),
            mode,
            options,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Current dictionary entries in index order.
    pub fn dictionary(&self) -> &[String] {
        self.dict.entries()
    }

    /// Encodes `value` into a fresh buffer.
    pub fn encode(&mut self, value: &Value) -> Result<Bytes, CodecError> {
        let mut buf = ByteBuffer::new();
        self.encode_into(value, &mut buf)?;
        Ok(buf.freeze())
    }

    /// Appends the encoding of `value` to `buf`.
    ///
    /// On error nothing is appended and the dictionary is left as it was.
    pub fn encode_into(&mut self, value: &Value, buf: &mut ByteBuffer) -> Result<(), CodecError> {
        let checkpoint = self.dict.len();
        let start = buf.len();

        let mut le = buf.scoped(ByteOrder::Little);
        let result = self.encode_value(value, &mut le, false, 0);
        if let Err(e) = &result {
            tracing::debug!(
                "encode failed, dropping {} new dictionary entries: {}",
                self.dict.len() - checkpoint,
                e
            );
            self.dict.truncate(checkpoint);
            le.truncate(start);
        }
        result
    }

    fn encode_value(
        &mut self,
        value: &Value,
        buf: &mut ByteBuffer,
        frozen: bool,
        depth: usize,
    ) -> Result<(), CodecError> {
        match value {
            Value::Undefined | Value::Null => buf.write_u8(Tag::Null.byte()),
            Value::Bool(true) => buf.write_u8(Tag::True.byte()),
            Value::Bool(false) => buf.write_u8(Tag::False.byte()),
            Value::Integer(n) => write_integer(*n, buf),
            Value::Float(f) => match float_as_i64(*f) {
                Some(n) => write_integer(n, buf),
                None => write_float(*f, buf),
            },
            Value::String(s) => self.write_string(s, buf, frozen, false)?,
            Value::Binary(bytes) => {
                buf.write_u8(Tag::Binary.byte());
                buf.write_vbytes(bytes)?;
            }
            Value::Array(items) => {
                if items.is_empty() {
                    buf.write_u8(Tag::EmptyArray.byte());
                    return Ok(());
                }
                let depth = self.enter(depth)?;
                buf.write_u8(Tag::Array.byte());
                buf.write_varint32(wire_len(items.len())?);
                for item in items {
                    self.encode_value(item, buf, frozen, depth)?;
                }
            }
            Value::Object(obj) => self.write_object(obj, buf, frozen, depth)?,
        }
        Ok(())
    }

    fn write_object(
        &mut self,
        obj: &Object,
        buf: &mut ByteBuffer,
        frozen: bool,
        depth: usize,
    ) -> Result<(), CodecError> {
        let count = obj.defined_len();
        if count == 0 {
            buf.write_u8(Tag::EmptyObject.byte());
            return Ok(());
        }
        let depth = self.enter(depth)?;
        let frozen = frozen || obj.is_frozen();

        buf.write_u8(Tag::Object.byte());
        buf.write_varint32(wire_len(count)?);
        for (key, value) in obj.iter() {
            if value.is_undefined() {
                continue;
            }
            self.write_string(key, buf, frozen, true)?;
            self.encode_value(value, buf, frozen, depth)?;
        }
        Ok(())
    }

    fn write_string(
        &mut self,
        s: &str,
        buf: &mut ByteBuffer,
        frozen: bool,
        is_key: bool,
    ) -> Result<(), CodecError> {
        if s.is_empty() {
            buf.write_u8(Tag::EmptyString.byte());
            return Ok(());
        }

        if let Some(index) = self.dict.get(s) {
            buf.write_u8(Tag::StringGet.byte());
            buf.write_varint32(index);
            return Ok(());
        }

        let intern =
            self.mode.is_progressive() && !frozen && (is_key || self.options.intern_values);
        if intern {
            self.dict.insert(s)?;
            buf.write_u8(Tag::StringAdd.byte());
        } else {
            buf.write_u8(Tag::String.byte());
        }
        buf.write_vbytes(s.as_bytes())
    }

    fn enter(&self, depth: usize) -> Result<usize, CodecError> {
        let depth = depth + 1;
        if depth > self.options.max_depth {
            return Err(CodecError::DepthLimitExceeded {
                max: self.options.max_depth,
            });
        }
        Ok(depth)
    }
}

fn wire_len(len: usize) -> Result<u32, CodecError> {
    u32::try_from(len).map_err(|_| CodecError::LengthTooLarge { len })
}

fn write_integer(n: i64, buf: &mut ByteBuffer) {
    if let Some(byte) = tag::inline_byte(n) {
        buf.write_u8(byte);
    } else if let Ok(small) = i32::try_from(n) {
        buf.write_u8(Tag::Integer.byte());
        buf.write_zigzag32(small);
    } else {
        buf.write_u8(Tag::Long.byte());
        buf.write_zigzag64(n);
    }
}

/// FLOAT when narrowing to f32 and back reproduces the exact bits, else DOUBLE.
fn write_float(f: f64, buf: &mut ByteBuffer) {
    let narrowed = f as f32;
    if (narrowed as f64).to_bits() == f.to_bits() {
        buf.write_u8(Tag::Float.byte());
        buf.write_f32(narrowed);
    } else {
        buf.write_u8(Tag::Double.byte());
        buf.write_f64(f);
    }
}
